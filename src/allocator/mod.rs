//! The allocator module exposes a couple of ways to interface with GPU memory.
//!
//! Every resource that owns device memory is parameterized on an [`Allocator`],
//! defaulting to [`DefaultAllocator`], which is backed by the `gpu_allocator`
//! crate. Where an allocation should live is expressed with [`MemoryType`];
//! host-visible allocations are persistently mapped for their entire lifetime.

pub mod default_allocator;
pub mod memory_type;
pub mod traits;
