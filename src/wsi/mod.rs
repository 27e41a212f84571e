//! Window system integration: the surface, the swapchain with its depth buffer and
//! framebuffers, and the frame synchronization driving the render loop.

pub mod frame;
pub mod surface;
pub mod swapchain;
pub mod window;
