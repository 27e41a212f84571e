//! Staged uploads to device-local memory.
//!
//! Device-local storage is fast for the GPU but not host-visible, so static data
//! takes a two-step path: write into a host-visible staging buffer, then record a
//! one-shot copy into the device-local destination. The copy cost is paid once at
//! resource-creation time. The staging buffer is dropped as soon as the blocking
//! transfer completes.
//!
//! Image uploads additionally sandwich the copy between the two supported layout
//! transitions: undefined to transfer-dst before, transfer-dst to shader-read-only
//! after. Array textures may source every layer from a distinct rectangle of one
//! larger source image (a texture atlas); see [`layer_copy_regions`].

use anyhow::Result;
use ash::vk;

use crate::{Allocator, Buffer, Device, Error, Image, ImageCreateInfo, MemoryType, TransferContext};

const BYTES_PER_PIXEL: u64 = 4;

/// Perform a staged upload to a new device-local buffer sized exactly for `data`.
pub fn staged_buffer_upload<T: Copy, A: Allocator>(
    device: Device,
    allocator: &mut A,
    transfer: &TransferContext,
    data: &[T],
    usage: vk::BufferUsageFlags,
) -> Result<Buffer<A>> {
    staged_buffer_upload_sized(device, allocator, transfer, data, data.len(), usage)
}

/// Perform a staged upload to a new device-local buffer sized for `capacity`
/// elements, of which the first `data.len()` are initialized. Used by mutable
/// models that rewrite geometry in place later.
/// # Errors
/// Fails with [`Error::SizeMismatch`] if `data` holds more than `capacity` elements.
pub fn staged_buffer_upload_sized<T: Copy, A: Allocator>(
    device: Device,
    allocator: &mut A,
    transfer: &TransferContext,
    data: &[T],
    capacity: usize,
    usage: vk::BufferUsageFlags,
) -> Result<Buffer<A>> {
    let byte_capacity = (capacity.max(1) * std::mem::size_of::<T>()) as vk::DeviceSize;

    let mut staging = Buffer::new(
        device.clone(),
        allocator,
        byte_capacity,
        vk::BufferUsageFlags::TRANSFER_SRC,
        MemoryType::CpuToGpu,
    )?;
    staging.write(data)?;

    let buffer = Buffer::new_device_local(
        device,
        allocator,
        byte_capacity,
        usage | vk::BufferUsageFlags::TRANSFER_DST,
    )?;

    transfer
        .begin_one_shot()?
        .copy_buffer(&staging.view_full(), &buffer.view_full())?
        .submit()?;

    // The transfer has completed; the staging buffer dies here.
    drop(staging);
    Ok(buffer)
}

/// Build one [`vk::BufferImageCopy`] per destination array layer, where layer `i`
/// sources the `layer_extent`-sized rectangle at `origins[i]` inside a source image
/// of `source_width` by `source_height` pixels.
///
/// The source rows are addressed through `buffer_row_length`, so layers can sit
/// anywhere in a larger atlas without repacking pixel data on the CPU.
pub fn layer_copy_regions(
    source_width: u32,
    source_height: u32,
    layer_extent: vk::Extent2D,
    origins: &[vk::Offset2D],
) -> Vec<vk::BufferImageCopy> {
    origins
        .iter()
        .enumerate()
        .map(|(layer, origin)| vk::BufferImageCopy {
            buffer_offset: (origin.y as u64 * source_width as u64 + origin.x as u64)
                * BYTES_PER_PIXEL,
            buffer_row_length: source_width,
            buffer_image_height: source_height,
            image_subresource: vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: 0,
                base_array_layer: layer as u32,
                layer_count: 1,
            },
            image_offset: vk::Offset3D {
                x: 0,
                y: 0,
                z: 0,
            },
            image_extent: vk::Extent3D {
                width: layer_extent.width,
                height: layer_extent.height,
                depth: 1,
            },
        })
        .collect()
}

/// Upload RGBA8 pixel data into a new device-local, shader-sampled 2D image.
/// # Errors
/// Fails with [`Error::SizeMismatch`] if `pixels` is not exactly `width * height`
/// RGBA8 texels.
pub fn staged_image_upload<A: Allocator>(
    device: Device,
    allocator: &mut A,
    transfer: &TransferContext,
    pixels: &[u8],
    width: u32,
    height: u32,
) -> Result<Image<A>> {
    let extent = vk::Extent2D {
        width,
        height,
    };
    staged_image_array_upload(
        device,
        allocator,
        transfer,
        pixels,
        extent,
        extent,
        &[vk::Offset2D {
            x: 0,
            y: 0,
        }],
    )
}

/// Upload RGBA8 pixel data into a new device-local, shader-sampled 2D array image
/// with one layer per entry of `origins`, each sourcing a `layer_extent`-sized
/// rectangle of the source image.
/// # Errors
/// * Fails with [`Error::SizeMismatch`] if `pixels` does not match `source_extent`.
/// * Fails with [`Error::Uncategorized`] if `origins` is empty or a source
///   rectangle falls outside the source image.
pub fn staged_image_array_upload<A: Allocator>(
    device: Device,
    allocator: &mut A,
    transfer: &TransferContext,
    pixels: &[u8],
    source_extent: vk::Extent2D,
    layer_extent: vk::Extent2D,
    origins: &[vk::Offset2D],
) -> Result<Image<A>> {
    let expected = source_extent.width as u64 * source_extent.height as u64 * BYTES_PER_PIXEL;
    if pixels.len() as u64 != expected {
        return Err(Error::SizeMismatch {
            requested: pixels.len() as u64,
            capacity: expected,
        }
        .into());
    }
    if origins.is_empty() {
        return Err(Error::Uncategorized("Image upload needs at least one layer").into());
    }
    for origin in origins {
        if origin.x < 0
            || origin.y < 0
            || origin.x as u32 + layer_extent.width > source_extent.width
            || origin.y as u32 + layer_extent.height > source_extent.height
        {
            return Err(Error::Uncategorized("Layer source rectangle outside source image").into());
        }
    }

    let mut staging = Buffer::new(
        device.clone(),
        allocator,
        pixels.len() as vk::DeviceSize,
        vk::BufferUsageFlags::TRANSFER_SRC,
        MemoryType::CpuToGpu,
    )?;
    staging.write(pixels)?;

    let image = Image::new(
        device,
        allocator,
        ImageCreateInfo {
            width: layer_extent.width,
            height: layer_extent.height,
            usage: vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED,
            format: vk::Format::R8G8B8A8_SRGB,
            layers: origins.len() as u32,
        },
    )?;

    let regions = layer_copy_regions(
        source_extent.width,
        source_extent.height,
        layer_extent,
        origins,
    );

    transfer
        .begin_one_shot()?
        .transition_image_layout(
            &image,
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        )?
        .copy_buffer_to_image(&staging.view_full(), &image, &regions)?
        .transition_image_layout(
            &image,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        )?
        .submit()?;

    drop(staging);
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_image_region() {
        let regions = layer_copy_regions(
            64,
            32,
            vk::Extent2D {
                width: 64,
                height: 32,
            },
            &[vk::Offset2D {
                x: 0,
                y: 0,
            }],
        );
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].buffer_offset, 0);
        assert_eq!(regions[0].buffer_row_length, 64);
        assert_eq!(regions[0].image_extent.width, 64);
        assert_eq!(regions[0].image_subresource.base_array_layer, 0);
    }

    #[test]
    fn atlas_layers_address_distinct_rectangles() {
        // A 2x2 atlas of 16x16 tiles inside a 32x32 source image.
        let tile = vk::Extent2D {
            width: 16,
            height: 16,
        };
        let origins = [
            vk::Offset2D { x: 0, y: 0 },
            vk::Offset2D { x: 16, y: 0 },
            vk::Offset2D { x: 0, y: 16 },
            vk::Offset2D { x: 16, y: 16 },
        ];
        let regions = layer_copy_regions(32, 32, tile, &origins);
        assert_eq!(regions.len(), 4);
        // Each layer indexes its own slice of the destination array.
        for (i, region) in regions.iter().enumerate() {
            assert_eq!(region.image_subresource.base_array_layer, i as u32);
            assert_eq!(region.image_subresource.layer_count, 1);
            assert_eq!(region.buffer_row_length, 32);
        }
        // Offsets walk the atlas in RGBA8 bytes.
        assert_eq!(regions[0].buffer_offset, 0);
        assert_eq!(regions[1].buffer_offset, 16 * 4);
        assert_eq!(regions[2].buffer_offset, 16 * 32 * 4);
        assert_eq!(regions[3].buffer_offset, (16 * 32 + 16) * 4);
    }
}
