//! Synchronization primitives.
//!
//! [`Fence`](fence::Fence) covers CPU-GPU synchronization,
//! [`Semaphore`](semaphore::Semaphore) covers GPU-GPU synchronization.
//! The per-frame wiring of both lives in [`FrameManager`](crate::FrameManager).

pub mod fence;
pub mod semaphore;
