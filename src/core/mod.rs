//! Core Vulkan bring-up: instance, physical device selection, logical device,
//! the owning [`Context`](context::Context) and the crate error type.

pub mod app_info;
pub mod context;
pub mod debug;
pub mod device;
pub mod error;
pub mod init;
pub mod instance;
pub mod physical_device;
