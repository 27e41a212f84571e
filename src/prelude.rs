//! Re-exports of the types needed by a typical application.

pub use ash::vk;

pub use crate::allocator::default_allocator::DefaultAllocator;
pub use crate::allocator::memory_type::MemoryType;
pub use crate::allocator::traits::{Allocation, Allocator};

pub use crate::core::app_info::{AppBuilder, AppSettings, SurfaceSettings};
pub use crate::core::context::Context;
pub use crate::core::debug::DebugMessenger;
pub use crate::core::device::Device;
pub use crate::core::error::Error;
pub use crate::core::init::initialize;
pub use crate::core::instance::Instance;
pub use crate::core::physical_device::{PhysicalDevice, QueueFamilies};

pub use crate::asset::{load_spirv, load_texture, TextureData};
pub use crate::model::{DrawCall, Model};
pub use crate::pass::RenderPass;
pub use crate::pipeline::shader::ShaderModule;
pub use crate::pipeline::vertex_input::{VertexAttribute, VertexBinding, VertexInput};
pub use crate::pipeline::{DescriptorBinding, DescriptorSetLayout, GraphicsPipeline};
pub use crate::resource::buffer::{Buffer, BufferView};
pub use crate::resource::image::{barrier_masks, BarrierMasks, Image, ImageCreateInfo, ImageView, ImgView};
pub use crate::resource::registry::{Key, Registry};
pub use crate::sampler::Sampler;
pub use crate::sync::fence::Fence;
pub use crate::sync::semaphore::Semaphore;
pub use crate::transfer::{CommandPool, OneShotCommands, TransferContext};
pub use crate::uniform::UniformBuffer;
pub use crate::upload::{
    layer_copy_regions, staged_buffer_upload, staged_buffer_upload_sized,
    staged_image_array_upload, staged_image_upload,
};
pub use crate::wsi::frame::{AcquiredImage, FrameManager};
pub use crate::wsi::surface::Surface;
pub use crate::wsi::swapchain::{
    choose_extent, choose_image_count, choose_present_mode, choose_surface_format,
    find_depth_format, select_supported_format, Swapchain,
};
pub use crate::wsi::window::{Window, WindowSize};
