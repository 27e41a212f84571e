use anyhow::Result;
use ash::vk;
use ash::vk::Handle;

use deimos::prelude::*;

mod framework;

#[test]
pub fn alloc_buffer() -> Result<()> {
    let Some(mut context) = framework::make_context() else {
        return Ok(());
    };

    const ALLOC_SIZE: u64 = 1024;

    let buffer = Buffer::new(
        context.device.clone(),
        &mut context.allocator,
        ALLOC_SIZE,
        vk::BufferUsageFlags::TRANSFER_DST,
        MemoryType::GpuOnly,
    )?;

    assert_ne!(
        unsafe { buffer.handle().as_raw() },
        0,
        "Buffer handle should not be null."
    );
    assert_eq!(buffer.size(), ALLOC_SIZE);
    assert!(
        !buffer.is_mapped(),
        "Device-local buffer should not expose a host pointer."
    );
    Ok(())
}

#[test]
pub fn write_round_trips_through_the_mapped_pointer() -> Result<()> {
    let Some(mut context) = framework::make_context() else {
        return Ok(());
    };

    let payload: Vec<u8> = (0..=255).collect();
    let mut buffer = Buffer::new(
        context.device.clone(),
        &mut context.allocator,
        payload.len() as u64,
        vk::BufferUsageFlags::TRANSFER_SRC,
        MemoryType::CpuToGpu,
    )?;
    assert!(buffer.is_mapped());

    buffer.write(payload.as_slice())?;
    let mut view = buffer.view_full();
    let readback: &[u8] = view.mapped_slice()?;
    assert_eq!(readback, payload.as_slice());
    Ok(())
}

#[test]
pub fn oversized_write_fails_without_touching_the_buffer() -> Result<()> {
    let Some(mut context) = framework::make_context() else {
        return Ok(());
    };

    let mut buffer = Buffer::new(
        context.device.clone(),
        &mut context.allocator,
        16u64,
        vk::BufferUsageFlags::TRANSFER_SRC,
        MemoryType::CpuToGpu,
    )?;
    buffer.write(&[7u8; 16])?;

    let err = buffer.write(&[0u8; 17]).unwrap_err();
    let err = err.downcast::<Error>()?;
    assert!(matches!(
        err,
        Error::SizeMismatch {
            requested: 17,
            capacity: 16,
        }
    ));

    // The failed write must not have modified anything.
    let mut view = buffer.view_full();
    assert_eq!(view.mapped_slice::<u8>()?, &[7u8; 16]);
    Ok(())
}

#[test]
pub fn view_out_of_range_is_rejected() -> Result<()> {
    let Some(mut context) = framework::make_context() else {
        return Ok(());
    };

    let buffer = Buffer::new(
        context.device.clone(),
        &mut context.allocator,
        64u64,
        vk::BufferUsageFlags::TRANSFER_SRC,
        MemoryType::CpuToGpu,
    )?;
    assert!(buffer.view(0u64, 64u64).is_ok());
    assert!(buffer.view(32u64, 33u64).is_err());
    Ok(())
}
