//! Exposes methods to make initialization of the library easier without losing flexibility.

use anyhow::Result;

use crate::{
    AppSettings, Context, DebugMessenger, DefaultAllocator, Device, Instance, PhysicalDevice,
    Surface, TransferContext,
};

/// Initialize the library: create the instance, select a physical device, create
/// the logical device, allocator and transfer context, and bundle everything into
/// a [`Context`].
///
/// Initialization errors are not retried; they propagate to the caller, which is
/// expected to terminate with a diagnostic.
pub fn initialize(settings: &AppSettings) -> Result<Context> {
    let instance = Instance::new(settings)?;

    let debug_messenger = if settings.enable_validation {
        Some(DebugMessenger::new(&instance)?)
    } else {
        None
    };

    let mut surface = settings
        .surface_settings
        .as_ref()
        .map(|surface_settings| Surface::new(&instance, surface_settings.window))
        .transpose()?;

    let physical_device = PhysicalDevice::select(&instance, surface.as_ref())?;
    if let Some(surface) = surface.as_mut() {
        surface.query_details(&physical_device)?;
    }

    let device = Device::new(&instance, &physical_device, settings)?;
    let allocator = DefaultAllocator::new(&instance, &device, &physical_device)?;
    let transfer = TransferContext::new(device.clone())?;

    info!(
        "Initialized context for `{}` ({} frames in flight)",
        settings.name, settings.frames_in_flight
    );

    Ok(Context {
        transfer,
        allocator,
        surface,
        device,
        physical_device,
        debug_messenger,
        instance,
        frames_in_flight: settings.frames_in_flight,
    })
}
