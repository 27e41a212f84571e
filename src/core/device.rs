use std::collections::BTreeSet;
use std::ffi::CString;
use std::ops::Deref;
use std::sync::Arc;

use anyhow::Result;
use ash::vk;

use crate::{AppSettings, Error, Instance, PhysicalDevice};
use crate::core::physical_device::QueueFamilies;
use crate::util::string::unwrap_to_raw_strings;

#[derive(Derivative)]
#[derivative(Debug)]
struct DeviceInner {
    #[derivative(Debug = "ignore")]
    handle: ash::Device,
    properties: vk::PhysicalDeviceProperties,
    families: QueueFamilies,
    graphics_queue: vk::Queue,
    present_queue: vk::Queue,
}

/// Wrapper around a `VkDevice`. The device provides access to almost the entire
/// Vulkan API. Internal state is wrapped in an `Arc<DeviceInner>`, so this is safe
/// to clone.
#[derive(Debug, Clone)]
pub struct Device {
    inner: Arc<DeviceInner>,
}

impl Device {
    /// Create a new Vulkan device. This is the main interface point with the Vulkan API.
    pub fn new(
        instance: &Instance,
        physical_device: &PhysicalDevice,
        settings: &AppSettings,
    ) -> Result<Self> {
        let families = physical_device.families();
        let unique_families: BTreeSet<u32> =
            [families.graphics, families.present].into_iter().collect();

        let priority = 1.0f32;
        let queue_create_infos = unique_families
            .iter()
            .map(|&family| vk::DeviceQueueCreateInfo {
                queue_family_index: family,
                queue_count: 1,
                p_queue_priorities: &priority,
                ..Default::default()
            })
            .collect::<Vec<_>>();

        let mut extension_names: Vec<CString> = Vec::new();
        if settings.surface_settings.is_some() {
            extension_names.push(CString::from(ash::extensions::khr::Swapchain::name()));
        }

        info!("Enabled device extensions:");
        for ext in &extension_names {
            info!("{:?}", ext);
        }

        let features = vk::PhysicalDeviceFeatures {
            sampler_anisotropy: vk::TRUE,
            ..Default::default()
        };

        let extension_names_raw = unwrap_to_raw_strings(extension_names.as_slice());
        let info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(queue_create_infos.as_slice())
            .enabled_extension_names(extension_names_raw.as_slice())
            .enabled_features(&features)
            .build();

        let handle = unsafe { instance.create_device(physical_device.handle(), &info, None)? };
        let graphics_queue = unsafe { handle.get_device_queue(families.graphics, 0) };
        let present_queue = unsafe { handle.get_device_queue(families.present, 0) };

        let inner = DeviceInner {
            handle,
            properties: *physical_device.properties(),
            families,
            graphics_queue,
            present_queue,
        };

        Ok(Device {
            inner: Arc::new(inner),
        })
    }

    /// Wait for the device to be completely idle. This is a heavy synchronization
    /// measure: use it on exit, before a swapchain rebuild, or before destructively
    /// updating resources a previous frame may still read.
    pub fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.inner
                .handle
                .device_wait_idle()
                .map_err(Error::from)?
        };
        Ok(())
    }

    /// Get unsafe access to the underlying VkDevice handle
    /// # Safety
    /// * The caller should not call `vkDestroyDevice` on this.
    /// * This handle is valid as long as there is a copy of `self` alive.
    pub unsafe fn handle(&self) -> ash::Device {
        self.inner.handle.clone()
    }

    /// Get the device properties
    pub fn properties(&self) -> &vk::PhysicalDeviceProperties {
        &self.inner.properties
    }

    /// Get the selected queue family indices.
    pub fn queue_families(&self) -> QueueFamilies {
        self.inner.families
    }

    /// The queue used for graphics and transfer submissions.
    pub fn graphics_queue(&self) -> vk::Queue {
        self.inner.graphics_queue
    }

    /// The queue used for presentation. May be the same queue as the graphics queue.
    pub fn present_queue(&self) -> vk::Queue {
        self.inner.present_queue
    }

    /// True if graphics and presentation use a single queue family, and thus the
    /// sharing mode for swapchain images is always EXCLUSIVE.
    pub fn is_single_queue(&self) -> bool {
        self.inner.families.is_unified()
    }
}

impl Deref for Device {
    type Target = ash::Device;

    fn deref(&self) -> &Self::Target {
        &self.inner.handle
    }
}

impl Drop for DeviceInner {
    fn drop(&mut self) {
        unsafe {
            self.handle.destroy_device(None);
        }
    }
}
