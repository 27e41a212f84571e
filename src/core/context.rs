//! The top-level context owning all device bring-up state.
//!
//! Every subordinate object (buffers, swapchain, frame manager, models) is
//! created from a `&Context` and holds at most cheap clones of the device and
//! allocator. The context is created once at startup through
//! [`initialize`](crate::core::init::initialize) and torn down once at shutdown;
//! there is no global state.

use anyhow::Result;

use crate::{
    DebugMessenger, DefaultAllocator, Device, Instance, PhysicalDevice, Surface, TransferContext,
};

/// Owns the Vulkan instance, device and everything created directly from them.
///
/// Field order is teardown order: the transfer context and allocator go before
/// the device, the device before the instance. Dropping the context while any
/// GPU work is outstanding is a caller error; [`Context::wait_idle`] is the
/// intended last call before shutdown.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Context {
    /// One-shot transfer command context on the graphics queue.
    pub transfer: TransferContext,
    /// The GPU memory allocator.
    pub allocator: DefaultAllocator,
    /// Window surface, if this is not a headless context.
    pub surface: Option<Surface>,
    /// The logical device.
    pub device: Device,
    /// The selected physical device.
    pub physical_device: PhysicalDevice,
    /// Validation layer messenger, present when validation was requested.
    pub debug_messenger: Option<DebugMessenger>,
    /// The Vulkan instance.
    pub instance: Instance,
    /// Number of frames the CPU may record ahead of the GPU.
    pub frames_in_flight: usize,
}

impl Context {
    /// Wait for all GPU work to complete. Call before dropping the context.
    pub fn wait_idle(&self) -> Result<()> {
        self.device.wait_idle()
    }
}
