use anyhow::Result;
use ash::vk;
use ash::vk::Handle;

use deimos::prelude::*;

mod framework;

#[test]
pub fn basic_allocator_usage() -> Result<()> {
    let Some(context) = framework::make_context() else {
        return Ok(());
    };
    let mut allocator = context.allocator.clone();
    let allocation = allocator.allocate(
        "allocation",
        &vk::MemoryRequirements {
            size: 1024,
            alignment: 1,
            // Assume all memory types are valid for this allocation
            memory_type_bits: 0xFFFFFFFF,
        },
        MemoryType::GpuOnly,
    )?;
    assert_ne!(
        unsafe { allocation.memory().as_raw() },
        0,
        "VkDeviceMemory used for allocation should not be null"
    );
    // Also try explicitly freeing the allocation
    allocator.free(allocation)?;
    Ok(())
}

#[test]
pub fn cpu_to_gpu_is_mappable() -> Result<()> {
    let Some(context) = framework::make_context() else {
        return Ok(());
    };
    let mut allocator = context.allocator.clone();
    let allocation = allocator.allocate(
        "allocation",
        &vk::MemoryRequirements {
            size: 1024,
            alignment: 1,
            memory_type_bits: 0xFFFFFFFF,
        },
        MemoryType::CpuToGpu,
    )?;
    assert!(
        allocation.mapped_ptr().is_some(),
        "Memory allocated with CpuToGpu should be mappable"
    );
    Ok(())
}
