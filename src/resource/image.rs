//! Provides utilities to manage [`VkImage`](vk::Image) and [`VkImageView`](vk::ImageView) objects.
//!
//! Images are managed through the [`Image`] struct. These images are usually backed by a
//! memory allocation, except when they are swapchain images managed by the OS.
//!
//! Using [`Image::whole_view`] you can create an [`ImageView`] that covers the entire image.
//! Note that [`ImageView`] is in fact an `Arc<ImgView>`, so it stays valid while any clone
//! of it is alive; this is what keeps swapchain rebuilds from invalidating views a frame
//! still references.
//!
//! Layout transitions are restricted to the pairs this library actually performs during
//! texture upload; see [`barrier_masks`].

use std::ops::Deref;
use std::sync::Arc;

use anyhow::Result;
use ash::vk;

use crate::{Allocation, Allocator, DefaultAllocator, Device, Error, MemoryType};

/// Abstraction over a [`VkImage`](vk::Image). Stores information about size, format, etc.
/// Additionally couples the image data together with a memory allocation.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Image<A: Allocator = DefaultAllocator> {
    /// Reference to the [`VkDevice`](vk::Device).
    #[derivative(Debug = "ignore")]
    device: Device,
    /// [`VkImage`](vk::Image) handle.
    handle: vk::Image,
    /// GPU memory allocation. If this is None, then the image is not owned by our system
    /// (for example a swapchain image) and should not be destroyed.
    #[derivative(Debug = "ignore")]
    memory: Option<A::Allocation>,
    /// Image format
    format: vk::Format,
    /// Size of the image in pixels.
    size: vk::Extent2D,
    /// Number of array layers.
    layers: u32,
}

unsafe impl<A: Allocator> Send for Image<A> {}

unsafe impl<A: Allocator> Sync for Image<A> {}

/// Abstraction over a [`VkImageView`](vk::ImageView). Most functions operating on images
/// will expect these instead of raw owning [`Image`] structs.
#[derive(Derivative)]
#[derivative(Debug, Hash, PartialEq, Eq)]
pub struct ImgView {
    #[derivative(Debug = "ignore")]
    #[derivative(Hash = "ignore")]
    #[derivative(PartialEq = "ignore")]
    device: Device,
    /// [`VkImageView`](vk::ImageView) handle
    handle: vk::ImageView,
    /// Reference to the [`VkImage`](vk::Image).
    image: vk::Image,
    format: vk::Format,
    aspect: vk::ImageAspectFlags,
    size: vk::Extent2D,
    layer_count: u32,
}

/// Reference-counted version of [`ImgView`].
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct ImageView(pub Arc<ImgView>);

impl Deref for ImageView {
    type Target = Arc<ImgView>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

unsafe impl Send for ImageView {}

unsafe impl Sync for ImageView {}

/// Settings that describe how an image should be created
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub struct ImageCreateInfo {
    /// Width in pixels of the image
    pub width: u32,
    /// Height in pixels of the image
    pub height: u32,
    /// Image usage flags
    pub usage: vk::ImageUsageFlags,
    /// Pixel format of the image
    pub format: vk::Format,
    /// Number of array layers. Set to 1 for non-array textures.
    pub layers: u32,
}

/// Pipeline stages and access masks describing one supported layout transition.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BarrierMasks {
    /// Accesses that must have completed before the transition.
    pub src_access: vk::AccessFlags,
    /// Accesses that wait for the transition.
    pub dst_access: vk::AccessFlags,
    /// Pipeline stage the barrier waits on.
    pub src_stage: vk::PipelineStageFlags,
    /// Pipeline stage that waits on the barrier.
    pub dst_stage: vk::PipelineStageFlags,
}

/// Look up the barrier masks for an image layout transition.
///
/// Only the two transitions of the staged texture upload protocol are defined:
/// undefined to transfer-dst, and transfer-dst to shader-read-only. Anything else
/// fails with [`Error::UnsupportedTransition`]: asking for it is a programming
/// error, not a runtime condition.
pub fn barrier_masks(
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
) -> Result<BarrierMasks, Error> {
    match (old_layout, new_layout) {
        (vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL) => Ok(BarrierMasks {
            src_access: vk::AccessFlags::empty(),
            dst_access: vk::AccessFlags::TRANSFER_WRITE,
            src_stage: vk::PipelineStageFlags::TOP_OF_PIPE,
            dst_stage: vk::PipelineStageFlags::TRANSFER,
        }),
        (vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL) => {
            Ok(BarrierMasks {
                src_access: vk::AccessFlags::TRANSFER_WRITE,
                dst_access: vk::AccessFlags::SHADER_READ,
                src_stage: vk::PipelineStageFlags::TRANSFER,
                dst_stage: vk::PipelineStageFlags::FRAGMENT_SHADER,
            })
        }
        (old, new) => Err(Error::UnsupportedTransition(old, new)),
    }
}

impl<A: Allocator> Image<A> {
    /// Create a new 2D [`VkImage`](vk::Image) with optimal tiling and allocate
    /// device-local memory for it.
    pub fn new(device: Device, alloc: &mut A, info: ImageCreateInfo) -> Result<Self> {
        let extent = vk::Extent3D {
            width: info.width,
            height: info.height,
            depth: 1,
        };
        let handle = unsafe {
            device.create_image(
                &vk::ImageCreateInfo {
                    s_type: vk::StructureType::IMAGE_CREATE_INFO,
                    p_next: std::ptr::null(),
                    flags: Default::default(),
                    image_type: vk::ImageType::TYPE_2D,
                    format: info.format,
                    extent,
                    mip_levels: 1,
                    array_layers: info.layers,
                    samples: vk::SampleCountFlags::TYPE_1,
                    tiling: vk::ImageTiling::OPTIMAL,
                    usage: info.usage,
                    sharing_mode: vk::SharingMode::EXCLUSIVE,
                    queue_family_index_count: 0,
                    p_queue_family_indices: std::ptr::null(),
                    initial_layout: vk::ImageLayout::UNDEFINED,
                },
                None,
            )?
        };
        #[cfg(feature = "log-objects")]
        trace!("Created new VkImage {handle:p}");

        let requirements = unsafe { device.get_image_memory_requirements(handle) };
        let memory = alloc.allocate("image", &requirements, MemoryType::GpuOnly)?;
        unsafe {
            device.bind_image_memory(handle, memory.memory(), memory.offset())?;
        }

        Ok(Self {
            device,
            handle,
            format: info.format,
            size: vk::Extent2D {
                width: info.width,
                height: info.height,
            },
            layers: info.layers,
            memory: Some(memory),
        })
    }

    /// Wrap an image whose memory is managed externally, such as a swapchain image.
    /// The handle is not destroyed on drop.
    pub(crate) fn new_managed(
        device: Device,
        handle: vk::Image,
        format: vk::Format,
        size: vk::Extent2D,
        layers: u32,
    ) -> Self {
        Self {
            device,
            handle,
            memory: None,
            format,
            size,
            layers,
        }
    }

    /// Construct a trivial [`ImageView`] viewing the whole image.
    /// * `aspect` - The image aspect flags that will be used to create the image view
    /// # Lifetime
    /// The returned [`ImageView`] is valid as long as `self` is valid.
    pub fn whole_view(&self, aspect: vk::ImageAspectFlags) -> Result<ImageView> {
        let view_type = if self.layers > 1 {
            vk::ImageViewType::TYPE_2D_ARRAY
        } else {
            vk::ImageViewType::TYPE_2D
        };
        let info = vk::ImageViewCreateInfo {
            s_type: vk::StructureType::IMAGE_VIEW_CREATE_INFO,
            p_next: std::ptr::null(),
            flags: Default::default(),
            image: self.handle,
            view_type,
            format: self.format,
            components: vk::ComponentMapping::default(),
            subresource_range: vk::ImageSubresourceRange {
                aspect_mask: aspect,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: self.layers,
            },
        };

        let view_handle = unsafe { self.device.create_image_view(&info, None)? };
        #[cfg(feature = "log-objects")]
        trace!("Created new VkImageView {view_handle:p}");
        Ok(ImageView(Arc::new(ImgView {
            device: self.device.clone(),
            handle: view_handle,
            image: self.handle,
            format: self.format,
            aspect,
            size: self.size,
            layer_count: self.layers,
        })))
    }

    /// Whether this image resource is owned by the application or an external manager
    /// (such as the swapchain).
    pub fn is_owned(&self) -> bool {
        self.memory.is_some()
    }

    /// Get unsafe access to the underlying `VkImage` handle.
    /// # Safety
    /// Any vulkan calls that mutate this image's state may put the system into an undefined state.
    pub unsafe fn handle(&self) -> vk::Image {
        self.handle
    }

    /// Get the image format
    pub fn format(&self) -> vk::Format {
        self.format
    }

    /// Get the image size
    pub fn size(&self) -> vk::Extent2D {
        self.size
    }

    /// Get the image width
    pub fn width(&self) -> u32 {
        self.size.width
    }

    /// Get the image height
    pub fn height(&self) -> u32 {
        self.size.height
    }

    /// Get the number of layers in the image
    pub fn layers(&self) -> u32 {
        self.layers
    }
}

impl<A: Allocator> Drop for Image<A> {
    fn drop(&mut self) {
        #[cfg(feature = "log-objects")]
        trace!("Destroying VkImage {:p}", self.handle);
        if self.is_owned() {
            unsafe {
                self.device.destroy_image(self.handle, None);
            }
        }
    }
}

impl ImgView {
    /// The subresource range of the original image that this image view covers.
    pub fn subresource_range(&self) -> vk::ImageSubresourceRange {
        vk::ImageSubresourceRange {
            aspect_mask: self.aspect,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: self.layer_count,
        }
    }

    /// Get unsafe access to the underlying `VkImageView` handle.
    /// # Safety
    /// Any vulkan calls that mutate this image view's state may put the system in an undefined state.
    pub unsafe fn handle(&self) -> vk::ImageView {
        self.handle
    }

    /// Get unsafe access to the underlying `VkImage` handle.
    /// # Safety
    /// Any vulkan calls that mutate this image's state may put the system in an undefined state.
    pub unsafe fn image(&self) -> vk::Image {
        self.image
    }

    /// Get the image format
    pub fn format(&self) -> vk::Format {
        self.format
    }

    /// Get the image aspect that this view was built from
    pub fn aspect(&self) -> vk::ImageAspectFlags {
        self.aspect
    }

    /// Get the image size
    pub fn size(&self) -> vk::Extent2D {
        self.size
    }

    /// Get the number of layers this view covers
    pub fn layer_count(&self) -> u32 {
        self.layer_count
    }
}

impl Drop for ImgView {
    fn drop(&mut self) {
        #[cfg(feature = "log-objects")]
        trace!("Destroying VkImageView {:p}", self.handle);
        unsafe {
            self.device.destroy_image_view(self.handle, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_transitions_are_supported() {
        let to_transfer = barrier_masks(
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        )
        .unwrap();
        assert_eq!(to_transfer.dst_access, vk::AccessFlags::TRANSFER_WRITE);
        assert_eq!(to_transfer.src_stage, vk::PipelineStageFlags::TOP_OF_PIPE);

        let to_sampled = barrier_masks(
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        )
        .unwrap();
        assert_eq!(to_sampled.src_access, vk::AccessFlags::TRANSFER_WRITE);
        assert_eq!(to_sampled.dst_stage, vk::PipelineStageFlags::FRAGMENT_SHADER);
    }

    #[test]
    fn skipping_transfer_dst_is_rejected() {
        let result = barrier_masks(
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        );
        assert!(matches!(
            result,
            Err(Error::UnsupportedTransition(
                vk::ImageLayout::UNDEFINED,
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL
            ))
        ));
    }

    #[test]
    fn reverse_transition_is_rejected() {
        assert!(barrier_masks(
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageLayout::UNDEFINED
        )
        .is_err());
    }
}
