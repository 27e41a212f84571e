use std::ffi::c_void;
use std::ptr::NonNull;

use anyhow::Result;
use ash::vk;

use crate::allocator::memory_type::MemoryType;

/// To supply custom allocators to the library, implement this trait.
pub trait Allocator: Clone + Send + Sync {
    /// The allocation type of this allocator.
    type Allocation: Allocation;

    /// Allocate raw memory of a specific memory type. The given name is used for
    /// internal tracking and debug logging.
    fn allocate(
        &mut self,
        name: &str,
        requirements: &vk::MemoryRequirements,
        ty: MemoryType,
    ) -> Result<Self::Allocation>;

    /// Free a previously allocated block of memory.
    fn free(&mut self, allocation: Self::Allocation) -> Result<()>;
}

/// Represents an allocation obtained from an [`Allocator`].
pub trait Allocation: Default {
    /// Access the underlying [`VkDeviceMemory`](vk::DeviceMemory).
    /// # Safety
    /// Should always be used together with [`Allocation::offset()`], as allocators are
    /// allowed to subdivide one device memory block into multiple allocations.
    unsafe fn memory(&self) -> vk::DeviceMemory;

    /// The offset of this allocation inside the `VkDeviceMemory` block.
    fn offset(&self) -> vk::DeviceSize;

    /// A persistently mapped pointer to the allocation, if it lives in
    /// host-visible memory. The pointer is valid for the allocation's entire
    /// lifetime. Returns `None` for device-local memory.
    fn mapped_ptr(&self) -> Option<NonNull<c_void>>;
}
