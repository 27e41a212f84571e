//! Exposes the deimos error type

use std::ffi::NulError;
use std::sync::PoisonError;

use ash;
use gpu_allocator::AllocationError;
use thiserror::Error;

/// Error type that deimos can return.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to load the Vulkan library.
    #[error("Failed to load Vulkan.")]
    LoadFailed(ash::LoadingError),
    /// Could not convert rust string to C-String because it has null bytes
    #[error("Invalid C string")]
    InvalidString(NulError),
    /// Generic Vulkan error type.
    #[error("Vulkan error: `{0}`")]
    VkError(ash::vk::Result),
    /// The device was lost. There is no recovery from this, the process must exit.
    #[error("Vulkan device lost.")]
    DeviceLost,
    /// No suitable GPU found.
    #[error("No physical device found matching requirements.")]
    NoGPU,
    /// No supported surface formats found.
    #[error("No supported surface formats found.")]
    NoSurfaceFormat,
    /// None of the candidate depth formats is supported with the required tiling and usage.
    #[error("No supported depth format found.")]
    NoDepthFormat,
    /// Vulkan allocation error.
    #[error("Vulkan allocation error: `{0}`")]
    AllocationError(AllocationError),
    /// Swapchain creation or query failed for a reason other than an ordinary resize.
    #[error("Swapchain error: `{0}`")]
    SwapchainError(&'static str),
    /// A write was issued that exceeds the capacity of the target region.
    #[error("Write of {requested} bytes exceeds region capacity of {capacity} bytes.")]
    SizeMismatch {
        /// Number of bytes the caller tried to write.
        requested: u64,
        /// Capacity of the region in bytes.
        capacity: u64,
    },
    /// An image layout transition pair that is not in the supported set.
    #[error("Unsupported image layout transition {0:?} -> {1:?}.")]
    UnsupportedTransition(ash::vk::ImageLayout, ash::vk::ImageLayout),
    /// A texture file could not be read or decoded.
    #[error("Failed to load image `{path}`: {source}")]
    ImageLoadError {
        /// Path of the file that failed to load.
        path: String,
        #[source]
        source: image::ImageError,
    },
    /// A shader byte-code file could not be read.
    #[error("Failed to load shader `{path}`: {source}")]
    ShaderLoadError {
        /// Path of the file that failed to load.
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// Buffer view out of range of original buffer
    #[error("Buffer view is not a valid range in the parent buffer.")]
    BufferViewOutOfRange,
    /// Mappable buffer expected
    #[error("Requested mappable buffer, but buffer does not have a memory map")]
    UnmappableBuffer,
    /// Poisoned mutex
    #[error("Poisoned mutex")]
    PoisonError,
    /// Uncategorized error.
    #[error("Uncategorized error: `{0}`")]
    Uncategorized(&'static str),
}

impl From<ash::LoadingError> for Error {
    fn from(value: ash::LoadingError) -> Self {
        Error::LoadFailed(value)
    }
}

impl From<NulError> for Error {
    fn from(value: NulError) -> Self {
        Error::InvalidString(value)
    }
}

impl From<ash::vk::Result> for Error {
    fn from(value: ash::vk::Result) -> Self {
        match value {
            ash::vk::Result::ERROR_DEVICE_LOST => Error::DeviceLost,
            err => Error::VkError(err),
        }
    }
}

impl From<AllocationError> for Error {
    fn from(value: AllocationError) -> Self {
        Error::AllocationError(value)
    }
}

impl<T> From<PoisonError<T>> for Error {
    fn from(_: PoisonError<T>) -> Self {
        Error::PoisonError
    }
}
