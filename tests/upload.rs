use anyhow::Result;
use ash::vk;

use deimos::prelude::*;

mod framework;

/// Copy a device-local buffer back into host-readable memory.
fn read_back(context: &mut Context, buffer: &Buffer, size: u64) -> Result<Vec<u8>> {
    let readback = Buffer::new(
        context.device.clone(),
        &mut context.allocator,
        size.max(1),
        vk::BufferUsageFlags::TRANSFER_DST,
        MemoryType::GpuToCpu,
    )?;
    context
        .transfer
        .begin_one_shot()?
        .copy_buffer(&buffer.view(0u64, size)?, &readback.view(0u64, size)?)?
        .submit()?;
    let mut view = readback.view_full();
    Ok(view.mapped_slice::<u8>()?[..size as usize].to_vec())
}

#[test]
pub fn staged_upload_reaches_device_local_memory_intact() -> Result<()> {
    let Some(mut context) = framework::make_context() else {
        return Ok(());
    };

    let payload: Vec<u8> = (0u8..=255).cycle().take(1024).collect();
    let buffer = staged_buffer_upload(
        context.device.clone(),
        &mut context.allocator,
        &context.transfer,
        payload.as_slice(),
        vk::BufferUsageFlags::VERTEX_BUFFER | vk::BufferUsageFlags::TRANSFER_SRC,
    )?;
    assert!(!buffer.is_mapped());

    let contents = read_back(&mut context, &buffer, payload.len() as u64)?;
    assert_eq!(contents, payload);
    Ok(())
}

#[test]
pub fn partial_payload_fills_prefix_of_sized_buffer() -> Result<()> {
    let Some(mut context) = framework::make_context() else {
        return Ok(());
    };

    let payload = [11u8, 22, 33];
    let buffer = staged_buffer_upload_sized(
        context.device.clone(),
        &mut context.allocator,
        &context.transfer,
        &payload,
        16,
        vk::BufferUsageFlags::TRANSFER_SRC,
    )?;
    assert_eq!(buffer.size(), 16);

    let contents = read_back(&mut context, &buffer, 3)?;
    assert_eq!(contents, payload);
    Ok(())
}

#[test]
pub fn empty_payload_upload_is_valid() -> Result<()> {
    let Some(mut context) = framework::make_context() else {
        return Ok(());
    };

    let buffer = staged_buffer_upload_sized(
        context.device.clone(),
        &mut context.allocator,
        &context.transfer,
        &[] as &[u32],
        4,
        vk::BufferUsageFlags::TRANSFER_SRC,
    )?;
    assert_eq!(buffer.size(), 16);
    Ok(())
}

#[test]
pub fn oversized_payload_is_rejected() -> Result<()> {
    let Some(mut context) = framework::make_context() else {
        return Ok(());
    };

    let result = staged_buffer_upload_sized(
        context.device.clone(),
        &mut context.allocator,
        &context.transfer,
        &[0u32; 8],
        4,
        vk::BufferUsageFlags::TRANSFER_SRC,
    );
    let err = result.unwrap_err().downcast::<Error>()?;
    assert!(matches!(err, Error::SizeMismatch { .. }));
    Ok(())
}

#[test]
pub fn image_upload_runs_the_three_step_protocol() -> Result<()> {
    let Some(mut context) = framework::make_context() else {
        return Ok(());
    };

    let pixels = vec![128u8; 8 * 8 * 4];
    let image = staged_image_upload(
        context.device.clone(),
        &mut context.allocator,
        &context.transfer,
        &pixels,
        8,
        8,
    )?;
    assert_eq!(image.width(), 8);
    assert_eq!(image.layers(), 1);
    assert_eq!(image.format(), vk::Format::R8G8B8A8_SRGB);
    let _view = image.whole_view(vk::ImageAspectFlags::COLOR)?;
    Ok(())
}

#[test]
pub fn atlas_upload_creates_one_layer_per_region() -> Result<()> {
    let Some(mut context) = framework::make_context() else {
        return Ok(());
    };

    // A 32x32 atlas holding four 16x16 tiles, one per array layer.
    let pixels = vec![200u8; 32 * 32 * 4];
    let image = staged_image_array_upload(
        context.device.clone(),
        &mut context.allocator,
        &context.transfer,
        &pixels,
        vk::Extent2D {
            width: 32,
            height: 32,
        },
        vk::Extent2D {
            width: 16,
            height: 16,
        },
        &[
            vk::Offset2D { x: 0, y: 0 },
            vk::Offset2D { x: 16, y: 0 },
            vk::Offset2D { x: 0, y: 16 },
            vk::Offset2D { x: 16, y: 16 },
        ],
    )?;
    assert_eq!(image.layers(), 4);
    assert_eq!(image.width(), 16);
    Ok(())
}

#[test]
pub fn mismatched_pixel_count_is_rejected() -> Result<()> {
    let Some(mut context) = framework::make_context() else {
        return Ok(());
    };

    let pixels = vec![0u8; 10];
    let result = staged_image_upload(
        context.device.clone(),
        &mut context.allocator,
        &context.transfer,
        &pixels,
        8,
        8,
    );
    let err = result.unwrap_err().downcast::<Error>()?;
    assert!(matches!(err, Error::SizeMismatch { .. }));
    Ok(())
}
