//! Small Vulkan rendering scaffold
//!
//! Deimos wraps the pieces every Vulkan renderer starts from: device bring-up,
//! GPU memory with staged uploads, a swapchain that survives resizes, and the
//! frames-in-flight synchronization protocol that lets the CPU record ahead of
//! the GPU without corrupting resources still being read. On top sit a few small
//! abstractions (buffers, images, instanced models, per-frame uniform buffers)
//! for drawing textured, instanced geometry in a window.
//!
//! # Example
//!
//! Initialization goes through an [`AppSettings`] structure and yields a single
//! [`Context`] owning everything created from the instance down.
//! ```no_run
//! use deimos::prelude::*;
//! # use winit::window::WindowBuilder;
//! # use winit::event_loop::EventLoopBuilder;
//! # fn main() -> anyhow::Result<()> {
//! let event_loop = EventLoopBuilder::new().build();
//! let window = WindowBuilder::new()
//!     .with_title("deimos demo")
//!     .build(&event_loop)?;
//!
//! let settings = AppBuilder::new()
//!     .name("deimos demo")
//!     .version((0, 1, 0))
//!     .validation(true)
//!     .window(&window)
//!     .present_mode(vk::PresentModeKHR::MAILBOX)
//!     .build();
//! let mut ctx = deimos::initialize(&settings)?;
//!
//! // Pick formats, build the render pass, swapchain and frame manager.
//! let depth_format = find_depth_format(&ctx.instance, &ctx.physical_device)?;
//! let surface = ctx.surface.as_ref().unwrap();
//! let color_format = choose_surface_format(None, surface.formats())?;
//! let render_pass = RenderPass::new(ctx.device.clone(), color_format.format, depth_format)?;
//! let swapchain = Swapchain::new(
//!     &ctx.instance,
//!     ctx.device.clone(),
//!     &mut ctx.allocator,
//!     settings.surface_settings.as_ref().unwrap(),
//!     surface,
//!     &render_pass,
//! )?;
//! let frames = FrameManager::new(ctx.device.clone(), ctx.frames_in_flight)?;
//! # Ok(())
//! # }
//! ```
//!
//! Per-frame flow: wait on the slot fence, acquire, record, submit, present,
//! advance; see [`FrameManager`] for the loop skeleton and
//! [`Swapchain::recreate`] for resize recovery.
//!
//! For further reading, check out the following modules:
//! - [`resource`] for buffers, images and the resource registry.
//! - [`upload`] for staged uploads to device-local memory.
//! - [`transfer`] for blocking one-shot transfer commands.
//! - [`wsi`] for the surface, swapchain and frame synchronization.
//! - [`model`] for drawable instanced models.
//! - [`pipeline`] for shader modules and minimal pipeline assembly.
//! - [`allocator`] for GPU memory allocation.

#[macro_use]
extern crate derivative;
#[macro_use]
extern crate log;

pub mod prelude;
pub use crate::prelude::*;

pub mod allocator;
pub mod asset;
pub mod core;
pub mod model;
pub mod pass;
pub mod pipeline;
pub mod resource;
pub mod sampler;
pub mod sync;
pub mod transfer;
pub mod uniform;
pub mod upload;
pub mod util;
pub mod wsi;
