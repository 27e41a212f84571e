//! GPU resources backed by device memory.
//!
//! [`Buffer`](buffer::Buffer) and [`Image`](image::Image) own one allocation each.
//! Host-visible regions stay mapped for their entire lifetime; device-local regions
//! are filled through the staged upload path in [`upload`](crate::upload).
//! [`Registry`](registry::Registry) offers index-stable storage for long-lived
//! resources owned at the application level.

pub mod buffer;
pub mod image;
pub mod registry;
