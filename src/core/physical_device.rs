//! Physical device selection.

use std::ffi::CStr;

use anyhow::Result;
use ash::vk;

use crate::{Error, Instance, Surface};
use crate::util::string::wrap_c_str;

/// Queue family indices selected on a physical device. The graphics and present
/// families are often the same family, but the swapchain handles the case where
/// they differ.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct QueueFamilies {
    /// Family used for graphics and transfer work.
    pub graphics: u32,
    /// Family used for presentation.
    pub present: u32,
}

impl QueueFamilies {
    /// True if graphics and presentation share one queue family, which allows
    /// exclusive sharing mode on swapchain images.
    pub fn is_unified(&self) -> bool {
        self.graphics == self.present
    }
}

/// A physical device abstracts away an actual device, like a graphics card or integrated graphics card.
#[derive(Default, Debug)]
pub struct PhysicalDevice {
    /// Handle to the [`VkPhysicalDevice`](vk::PhysicalDevice).
    handle: vk::PhysicalDevice,
    /// [`VkPhysicalDeviceProperties`](vk::PhysicalDeviceProperties) structure with properties of this physical device.
    properties: vk::PhysicalDeviceProperties,
    /// [`VkPhysicalDeviceMemoryProperties`](vk::PhysicalDeviceMemoryProperties) structure with memory properties of the
    /// physical device, such as available memory types and heaps.
    memory_properties: vk::PhysicalDeviceMemoryProperties,
    /// List of [`VkQueueFamilyProperties`](vk::QueueFamilyProperties) with properties of each queue family on the device.
    queue_families: Vec<vk::QueueFamilyProperties>,
    /// Selected queue family indices.
    families: QueueFamilies,
}

impl PhysicalDevice {
    /// Selects a physical device. A device is suitable if it has a graphics queue
    /// family, supports the swapchain extension, and (when a surface is given) can
    /// present to that surface. Discrete GPUs are preferred over integrated ones.
    pub fn select(instance: &Instance, surface: Option<&Surface>) -> Result<Self> {
        let devices = unsafe { instance.enumerate_physical_devices()? };
        if devices.is_empty() {
            return Err(anyhow::Error::from(Error::NoGPU));
        }

        let mut suitable = devices
            .iter()
            .filter_map(|&handle| -> Option<PhysicalDevice> {
                let properties = unsafe { instance.get_physical_device_properties(handle) };
                let queue_families =
                    unsafe { instance.get_physical_device_queue_family_properties(handle) };

                if surface.is_some() && !supports_swapchain_extension(instance, handle) {
                    return None;
                }
                let families = find_queue_families(handle, &queue_families, surface)?;

                Some(PhysicalDevice {
                    handle,
                    properties,
                    memory_properties: unsafe {
                        instance.get_physical_device_memory_properties(handle)
                    },
                    queue_families,
                    families,
                })
            })
            .collect::<Vec<_>>();

        // Prefer discrete GPUs, but accept anything that made it through selection.
        suitable.sort_by_key(|device| {
            match device.properties.device_type {
                vk::PhysicalDeviceType::DISCRETE_GPU => 0,
                vk::PhysicalDeviceType::INTEGRATED_GPU => 1,
                _ => 2,
            }
        });

        let device = suitable.into_iter().next().ok_or(Error::NoGPU)?;
        info!(
            "Selected physical device {:?} (graphics family {}, present family {})",
            unsafe { CStr::from_ptr(device.properties.device_name.as_ptr()) },
            device.families.graphics,
            device.families.present,
        );
        Ok(device)
    }

    /// Get unsafe access to the underlying `VkPhysicalDevice` handle.
    /// # Safety
    /// Any vulkan calls that mutate the physical device may put the system in an undefined state.
    pub unsafe fn handle(&self) -> vk::PhysicalDevice {
        self.handle
    }

    /// Get the properties of this physical device
    pub fn properties(&self) -> &vk::PhysicalDeviceProperties {
        &self.properties
    }

    /// Get the memory properties of this physical device
    pub fn memory_properties(&self) -> &vk::PhysicalDeviceMemoryProperties {
        &self.memory_properties
    }

    /// Get the queue family properties of this physical device
    pub fn queue_families(&self) -> &[vk::QueueFamilyProperties] {
        self.queue_families.as_slice()
    }

    /// Get the selected queue family indices.
    pub fn families(&self) -> QueueFamilies {
        self.families
    }
}

fn supports_swapchain_extension(instance: &Instance, device: vk::PhysicalDevice) -> bool {
    let extensions = match unsafe { instance.enumerate_device_extension_properties(device) } {
        Ok(extensions) => extensions,
        Err(_) => return false,
    };
    let swapchain = ash::extensions::khr::Swapchain::name()
        .to_string_lossy()
        .into_owned();
    extensions.iter().any(|ext| {
        // SAFETY: Extension names returned by the Vulkan API are valid C strings.
        unsafe { wrap_c_str(ext.extension_name.as_ptr()) == swapchain }
    })
}

fn find_queue_families(
    device: vk::PhysicalDevice,
    families: &[vk::QueueFamilyProperties],
    surface: Option<&Surface>,
) -> Option<QueueFamilies> {
    let graphics = families
        .iter()
        .position(|family| family.queue_flags.contains(vk::QueueFlags::GRAPHICS))?
        as u32;

    let present = match surface {
        None => graphics,
        Some(surface) => {
            // Prefer a unified family so resources can stay exclusively owned.
            let can_present = |index: u32| unsafe {
                surface
                    .get_physical_device_surface_support(device, index, surface.handle())
                    .unwrap_or(false)
            };
            if can_present(graphics) {
                graphics
            } else {
                (0..families.len() as u32).find(|&index| can_present(index))?
            }
        }
    };

    Some(QueueFamilies {
        graphics,
        present,
    })
}
