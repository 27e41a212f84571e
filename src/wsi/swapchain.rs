//! The swapchain and everything recreated alongside it.
//!
//! A [`Swapchain`] owns the presentable image chain, a view per image, one shared
//! depth buffer, and one framebuffer per image. All of it is torn down and rebuilt
//! together by [`Swapchain::recreate`] when the window is resized or acquisition
//! reports the chain out of date. The counts of images, views and framebuffers are
//! always equal and correspond by index.
//!
//! Format, present mode, extent and image count selection are plain functions over
//! the queried surface data, so their edge cases (clamping, fallbacks) are testable
//! without a device.

use anyhow::Result;
use ash::vk;

use crate::{
    Allocator, DefaultAllocator, Device, Error, Image, ImageCreateInfo, ImageView, Instance,
    PhysicalDevice, RenderPass, Surface, SurfaceSettings,
};
use crate::wsi::window::WindowSize;

/// Candidate depth formats, in preference order.
const DEPTH_FORMAT_CANDIDATES: [vk::Format; 3] = [
    vk::Format::D32_SFLOAT,
    vk::Format::D32_SFLOAT_S8_UINT,
    vk::Format::D24_UNORM_S8_UINT,
];

/// A swapchain image together with its view.
#[derive(Debug)]
pub(crate) struct SwapchainImage {
    #[allow(dead_code)]
    pub image: Image,
    pub view: ImageView,
}

// Everything that is rebuilt wholesale on a resize.
struct ChainResources<A: Allocator> {
    handle: vk::SwapchainKHR,
    images: Vec<SwapchainImage>,
    extent: vk::Extent2D,
    depth_image: Image<A>,
    depth_view: ImageView,
    framebuffers: Vec<vk::Framebuffer>,
}

/// A swapchain is an abstraction of a presentation system. It handles buffering,
/// VSync, and acquiring images to render and present frames to.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Swapchain<A: Allocator = DefaultAllocator> {
    #[derivative(Debug = "ignore")]
    device: Device,
    /// Handle to the [`VkSwapchainKHR`](vk::SwapchainKHR) object.
    handle: vk::SwapchainKHR,
    /// Swapchain images to present to.
    images: Vec<SwapchainImage>,
    /// Swapchain image format.
    format: vk::SurfaceFormatKHR,
    /// Present mode. The only mode that is required by the spec to always be supported is `FIFO`.
    present_mode: vk::PresentModeKHR,
    /// Size of the swapchain images. This is effectively the window render area.
    extent: vk::Extent2D,
    /// The depth buffer shared by every framebuffer. Held only for lifetime: the
    /// framebuffers reference its view.
    #[allow(dead_code)]
    depth_image: Image<A>,
    #[allow(dead_code)]
    depth_view: ImageView,
    /// One framebuffer per swapchain image, combining its color view with the depth view.
    framebuffers: Vec<vk::Framebuffer>,
    /// Vulkan extension functions operating on the swapchain.
    #[derivative(Debug = "ignore")]
    functions: ash::extensions::khr::Swapchain,
}

impl<A: Allocator> Swapchain<A> {
    /// Create a new swapchain with framebuffers for `render_pass`.
    pub fn new(
        instance: &Instance,
        device: Device,
        allocator: &mut A,
        settings: &SurfaceSettings,
        surface: &Surface,
        render_pass: &RenderPass,
    ) -> Result<Self> {
        let functions = ash::extensions::khr::Swapchain::new(instance, &device);
        let format = choose_surface_format(settings.surface_format, surface.formats())?;
        let present_mode = choose_present_mode(settings.present_mode, surface.present_modes());

        let resources = build_chain(
            &device,
            &functions,
            allocator,
            format,
            present_mode,
            surface,
            render_pass,
            settings.window.width(),
            settings.window.height(),
            vk::SwapchainKHR::null(),
        )?;

        info!(
            "Created swapchain at {}x{} ({} images, {:?}, {:?})",
            resources.extent.width,
            resources.extent.height,
            resources.images.len(),
            format.format,
            present_mode,
        );

        Ok(Swapchain {
            device,
            handle: resources.handle,
            images: resources.images,
            format,
            present_mode,
            extent: resources.extent,
            depth_image: resources.depth_image,
            depth_view: resources.depth_view,
            framebuffers: resources.framebuffers,
            functions,
        })
    }

    /// Tear down and rebuild the swapchain, depth buffer and framebuffers against
    /// the surface's current capabilities. Waits for the device to be idle first so
    /// no in-flight frame still references the resources being destroyed.
    ///
    /// Repeated recreation at an unchanged extent yields an identical configuration:
    /// same format, same image count, same framebuffer count.
    pub fn recreate(
        &mut self,
        allocator: &mut A,
        physical_device: &PhysicalDevice,
        surface: &mut Surface,
        render_pass: &RenderPass,
        window: &dyn WindowSize,
    ) -> Result<()> {
        self.device.wait_idle()?;
        surface.query_details(physical_device)?;

        let old_handle = self.handle;
        self.destroy_framebuffers();
        self.images.clear();

        let resources = build_chain(
            &self.device,
            &self.functions,
            allocator,
            self.format,
            self.present_mode,
            surface,
            render_pass,
            window.width(),
            window.height(),
            old_handle,
        )?;

        self.handle = resources.handle;
        self.images = resources.images;
        self.extent = resources.extent;
        self.depth_image = resources.depth_image;
        self.depth_view = resources.depth_view;
        self.framebuffers = resources.framebuffers;

        // The new chain has taken over; the retired handle can go now since the
        // device is idle.
        unsafe {
            self.functions.destroy_swapchain(old_handle, None);
        }
        info!(
            "Recreated swapchain at {}x{} ({} images)",
            self.extent.width,
            self.extent.height,
            self.images.len()
        );
        Ok(())
    }

    fn destroy_framebuffers(&mut self) {
        for framebuffer in self.framebuffers.drain(..) {
            unsafe {
                self.device.destroy_framebuffer(framebuffer, None);
            }
        }
    }

    /// Acquire the next presentable image, to be signaled on `semaphore`.
    /// Returns the image index and the suboptimal flag. The raw result is passed
    /// through so the frame manager can map out-of-date to a resize request.
    pub(crate) unsafe fn acquire_next_image(
        &self,
        semaphore: vk::Semaphore,
    ) -> std::result::Result<(u32, bool), vk::Result> {
        self.functions
            .acquire_next_image(self.handle, u64::MAX, semaphore, vk::Fence::null())
    }

    /// Present `image_index` on `queue` after `wait_semaphore` signals.
    pub(crate) unsafe fn present(
        &self,
        queue: vk::Queue,
        image_index: u32,
        wait_semaphore: vk::Semaphore,
    ) -> std::result::Result<bool, vk::Result> {
        let info = vk::PresentInfoKHR {
            s_type: vk::StructureType::PRESENT_INFO_KHR,
            p_next: std::ptr::null(),
            wait_semaphore_count: 1,
            p_wait_semaphores: &wait_semaphore,
            swapchain_count: 1,
            p_swapchains: &self.handle,
            p_image_indices: &image_index,
            p_results: std::ptr::null_mut(),
        };
        self.functions.queue_present(queue, &info)
    }

    /// The view of swapchain image `index`.
    /// The returned view stays alive as long as any clone of it does, even across
    /// a [`Swapchain::recreate`].
    pub fn image_view(&self, index: u32) -> ImageView {
        self.images[index as usize].view.clone()
    }

    /// The framebuffer for swapchain image `index`.
    /// # Safety
    /// The handle is invalidated by [`Swapchain::recreate`] and on drop.
    pub unsafe fn framebuffer(&self, index: u32) -> vk::Framebuffer {
        self.framebuffers[index as usize]
    }

    /// Number of images in the chain.
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// The chosen surface format.
    pub fn format(&self) -> vk::SurfaceFormatKHR {
        self.format
    }

    /// The chosen present mode.
    pub fn present_mode(&self) -> vk::PresentModeKHR {
        self.present_mode
    }

    /// The current swapchain extent.
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// Get unsafe access to the underlying `VkSwapchainKHR` handle.
    /// # Safety
    /// Any vulkan calls on this handle may put the system in an undefined state.
    pub unsafe fn handle(&self) -> vk::SwapchainKHR {
        self.handle
    }
}

impl<A: Allocator> Drop for Swapchain<A> {
    fn drop(&mut self) {
        self.destroy_framebuffers();
        // The image view handles must go before the swapchain that owns the images.
        self.images.clear();
        #[cfg(feature = "log-objects")]
        trace!("Destroying VkSwapchainKHR {:p}", self.handle);
        unsafe {
            self.functions.destroy_swapchain(self.handle, None);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn build_chain<A: Allocator>(
    device: &Device,
    functions: &ash::extensions::khr::Swapchain,
    allocator: &mut A,
    format: vk::SurfaceFormatKHR,
    present_mode: vk::PresentModeKHR,
    surface: &Surface,
    render_pass: &RenderPass,
    window_width: u32,
    window_height: u32,
    old_swapchain: vk::SwapchainKHR,
) -> Result<ChainResources<A>> {
    let capabilities = surface.capabilities();
    let extent = choose_extent(capabilities, window_width, window_height);
    let image_count = choose_image_count(capabilities);

    let families = device.queue_families();
    let family_indices = [families.graphics, families.present];
    let mut info = vk::SwapchainCreateInfoKHR::builder()
        .surface(unsafe { surface.handle() })
        .min_image_count(image_count)
        .image_format(format.format)
        .image_color_space(format.color_space)
        .image_extent(extent)
        .image_array_layers(1)
        .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
        .pre_transform(capabilities.current_transform)
        .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
        .present_mode(present_mode)
        .clipped(true)
        .old_swapchain(old_swapchain);
    info = if families.is_unified() {
        info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
    } else {
        // Images are touched by both the graphics and present families.
        info.image_sharing_mode(vk::SharingMode::CONCURRENT)
            .queue_family_indices(&family_indices)
    };

    let handle = unsafe {
        functions
            .create_swapchain(&info, None)
            .map_err(|_| Error::SwapchainError("Swapchain creation failed"))?
    };
    #[cfg(feature = "log-objects")]
    trace!("Created new VkSwapchainKHR {handle:p}");

    let images = unsafe { functions.get_swapchain_images(handle)? }
        .iter()
        .map(|&image| -> Result<SwapchainImage> {
            let image = Image::new_managed(device.clone(), image, format.format, extent, 1);
            let view = image.whole_view(vk::ImageAspectFlags::COLOR)?;
            Ok(SwapchainImage {
                image,
                view,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let depth_image = Image::new(
        device.clone(),
        allocator,
        ImageCreateInfo {
            width: extent.width,
            height: extent.height,
            usage: vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
            format: render_pass.depth_format(),
            layers: 1,
        },
    )?;
    let depth_view = depth_image.whole_view(vk::ImageAspectFlags::DEPTH)?;

    let framebuffers = images
        .iter()
        .map(|image| -> Result<vk::Framebuffer> {
            let attachments = unsafe { [image.view.handle(), depth_view.handle()] };
            let info = vk::FramebufferCreateInfo::builder()
                .render_pass(unsafe { render_pass.handle() })
                .attachments(&attachments)
                .width(extent.width)
                .height(extent.height)
                .layers(1)
                .build();
            Ok(unsafe { device.create_framebuffer(&info, None)? })
        })
        .collect::<Result<Vec<_>>>()?;

    debug_assert!(
        images.len() == framebuffers.len(),
        "image and framebuffer counts must correspond by index"
    );

    Ok(ChainResources {
        handle,
        images,
        extent,
        depth_image,
        depth_view,
        framebuffers,
    })
}

/// Select a surface format: the preferred one when reported by the surface, else
/// 32-bit BGRA sRGB when reported, else the first reported format.
pub fn choose_surface_format(
    preferred: Option<vk::SurfaceFormatKHR>,
    available: &[vk::SurfaceFormatKHR],
) -> Result<vk::SurfaceFormatKHR> {
    const FALLBACK_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
        format: vk::Format::B8G8R8A8_SRGB,
        color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
    };

    if let Some(preferred) = preferred {
        if available.contains(&preferred) {
            return Ok(preferred);
        }
    }
    if available.contains(&FALLBACK_FORMAT) {
        return Ok(FALLBACK_FORMAT);
    }
    available
        .first()
        .copied()
        .ok_or_else(|| anyhow::Error::from(Error::NoSurfaceFormat))
}

/// Select a present mode: the preferred one when available, else mailbox when
/// available, else FIFO, which the Vulkan spec guarantees.
pub fn choose_present_mode(
    preferred: Option<vk::PresentModeKHR>,
    available: &[vk::PresentModeKHR],
) -> vk::PresentModeKHR {
    if let Some(mode) = preferred {
        if available.contains(&mode) {
            return mode;
        }
    }
    if available.contains(&vk::PresentModeKHR::MAILBOX) {
        return vk::PresentModeKHR::MAILBOX;
    }
    vk::PresentModeKHR::FIFO
}

/// Select the swapchain extent. When the surface reports a fixed current extent,
/// that is used; otherwise the window size is clamped to the surface's bounds.
pub fn choose_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    window_width: u32,
    window_height: u32,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }
    vk::Extent2D {
        width: window_width.clamp(
            capabilities.min_image_extent.width,
            capabilities.max_image_extent.width,
        ),
        height: window_height.clamp(
            capabilities.min_image_extent.height,
            capabilities.max_image_extent.height,
        ),
    }
}

/// Select the image count: one more than the minimum so acquisition rarely has to
/// wait for the driver, clamped to the maximum when the surface reports one
/// (zero means unbounded).
pub fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let mut count = capabilities.min_image_count + 1;
    if capabilities.max_image_count != 0 {
        count = count.min(capabilities.max_image_count);
    }
    count
}

/// Probe `candidates` and return the first format whose optimal-tiling features
/// contain `features`. `query` looks up the format properties, which keeps the
/// selection itself free of device access.
pub fn select_supported_format(
    candidates: &[vk::Format],
    features: vk::FormatFeatureFlags,
    mut query: impl FnMut(vk::Format) -> vk::FormatProperties,
) -> Option<vk::Format> {
    candidates
        .iter()
        .copied()
        .find(|&format| query(format).optimal_tiling_features.contains(features))
}

/// Find a depth format supported by the physical device, probing 32-bit float
/// depth first, then the float+stencil and 24-bit+stencil combinations.
pub fn find_depth_format(
    instance: &Instance,
    physical_device: &PhysicalDevice,
) -> Result<vk::Format> {
    select_supported_format(
        &DEPTH_FORMAT_CANDIDATES,
        vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
        |format| unsafe {
            instance.get_physical_device_format_properties(physical_device.handle(), format)
        },
    )
    .ok_or_else(|| anyhow::Error::from(Error::NoDepthFormat))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capabilities(
        min: (u32, u32),
        max: (u32, u32),
        current: Option<(u32, u32)>,
        min_images: u32,
        max_images: u32,
    ) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: min_images,
            max_image_count: max_images,
            current_extent: match current {
                Some((w, h)) => vk::Extent2D {
                    width: w,
                    height: h,
                },
                None => vk::Extent2D {
                    width: u32::MAX,
                    height: u32::MAX,
                },
            },
            min_image_extent: vk::Extent2D {
                width: min.0,
                height: min.1,
            },
            max_image_extent: vk::Extent2D {
                width: max.0,
                height: max.1,
            },
            ..Default::default()
        }
    }

    #[test]
    fn extent_within_bounds_is_unchanged() {
        let caps = capabilities((1, 1), (4096, 4096), None, 2, 0);
        let extent = choose_extent(&caps, 800, 600);
        assert_eq!((extent.width, extent.height), (800, 600));
    }

    #[test]
    fn oversized_extent_is_clamped_to_surface_max() {
        let caps = capabilities((1, 1), (4096, 4096), None, 2, 0);
        let extent = choose_extent(&caps, 8000, 6000);
        assert_eq!((extent.width, extent.height), (4096, 4096));
    }

    #[test]
    fn fixed_current_extent_wins_over_window_size() {
        let caps = capabilities((1, 1), (4096, 4096), Some((1280, 720)), 2, 0);
        let extent = choose_extent(&caps, 800, 600);
        assert_eq!((extent.width, extent.height), (1280, 720));
    }

    #[test]
    fn image_count_is_min_plus_one() {
        let caps = capabilities((1, 1), (4096, 4096), None, 2, 0);
        assert_eq!(choose_image_count(&caps), 3);
    }

    #[test]
    fn image_count_respects_bounded_maximum() {
        let caps = capabilities((1, 1), (4096, 4096), None, 3, 3);
        assert_eq!(choose_image_count(&caps), 3);
    }

    #[test]
    fn bgra_srgb_is_preferred_fallback() {
        let available = [
            vk::SurfaceFormatKHR {
                format: vk::Format::R8G8B8A8_UNORM,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
            vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_SRGB,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
        ];
        let format = choose_surface_format(None, &available).unwrap();
        assert_eq!(format.format, vk::Format::B8G8R8A8_SRGB);
    }

    #[test]
    fn first_format_is_used_when_bgra_srgb_is_missing() {
        let available = [vk::SurfaceFormatKHR {
            format: vk::Format::R8G8B8A8_UNORM,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        }];
        let format = choose_surface_format(None, &available).unwrap();
        assert_eq!(format.format, vk::Format::R8G8B8A8_UNORM);
    }

    #[test]
    fn empty_format_list_is_an_error() {
        assert!(choose_surface_format(None, &[]).is_err());
    }

    #[test]
    fn mailbox_is_chosen_when_available() {
        let available = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX];
        assert_eq!(
            choose_present_mode(None, &available),
            vk::PresentModeKHR::MAILBOX
        );
    }

    #[test]
    fn preferred_present_mode_wins_when_available() {
        let available = [
            vk::PresentModeKHR::FIFO,
            vk::PresentModeKHR::MAILBOX,
            vk::PresentModeKHR::IMMEDIATE,
        ];
        assert_eq!(
            choose_present_mode(Some(vk::PresentModeKHR::IMMEDIATE), &available),
            vk::PresentModeKHR::IMMEDIATE
        );
    }

    #[test]
    fn fifo_is_the_final_fallback() {
        let available = [vk::PresentModeKHR::FIFO];
        assert_eq!(
            choose_present_mode(Some(vk::PresentModeKHR::IMMEDIATE), &available),
            vk::PresentModeKHR::FIFO
        );
    }

    #[test]
    fn depth_format_probing_takes_first_supported_candidate() {
        let supported = |format: vk::Format| vk::FormatProperties {
            optimal_tiling_features: if format == vk::Format::D24_UNORM_S8_UINT {
                vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT
            } else {
                vk::FormatFeatureFlags::empty()
            },
            ..Default::default()
        };
        let format = select_supported_format(
            &DEPTH_FORMAT_CANDIDATES,
            vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
            supported,
        );
        assert_eq!(format, Some(vk::Format::D24_UNORM_S8_UINT));
    }

    #[test]
    fn depth_format_probing_can_fail() {
        let format = select_supported_format(
            &DEPTH_FORMAT_CANDIDATES,
            vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
            |_| Default::default(),
        );
        assert_eq!(format, None);
    }
}
