//! Wrappers for `VkBuffer` objects.
//!
//! This module exposes two types: [`Buffer`] and [`BufferView`]. A [`BufferView`]
//! does not own a vulkan resource, so it can be freely copied around as long as the
//! owning [`Buffer`] lives.
//!
//! Buffers allocated with [`MemoryType::CpuToGpu`] are persistently mapped; use
//! [`Buffer::write`] for a length-checked upload or [`BufferView::mapped_slice`] for
//! direct access. Device-local buffers have no host pointer and are filled through
//! a staged upload (see the [`upload`](crate::upload) module).
//!
//! # Example
//!
//! ```no_run
//! # use deimos::prelude::*;
//! # fn example(device: Device, mut alloc: DefaultAllocator) -> anyhow::Result<()> {
//! // Allocate a 16 byte uniform buffer in mappable memory.
//! let mut buf = Buffer::new(device.clone(),
//!                           &mut alloc,
//!                           16 as vk::DeviceSize,
//!                           vk::BufferUsageFlags::UNIFORM_BUFFER,
//!                           MemoryType::CpuToGpu)?;
//! // Write some arbitrary data. This fails if the data does not fit.
//! let data = [1.0f32, 0.0, 1.0, 1.0];
//! buf.write(&data)?;
//! # Ok(())
//! # }
//! ```

use std::ffi::c_void;
use std::ptr::NonNull;

use anyhow::Result;
use ash::vk;

use crate::{Allocation, Allocator, DefaultAllocator, Device, Error, MemoryType};

/// Wrapper around a [`VkBuffer`](vk::Buffer) and the memory allocation backing it.
///
/// Destruction happens on drop. The caller must guarantee that no outstanding GPU
/// command references the buffer at that point; the type does no reference counting.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Buffer<A: Allocator = DefaultAllocator> {
    #[derivative(Debug = "ignore")]
    device: Device,
    #[derivative(Debug = "ignore")]
    #[allow(dead_code)]
    memory: A::Allocation,
    pointer: Option<NonNull<c_void>>,
    handle: vk::Buffer,
    size: vk::DeviceSize,
}

// SAFETY: The unsafe part of this is the mapped pointer, but this is a pointer to GPU memory
// so its value is not dropped when sending this to a different thread.
unsafe impl<A: Allocator> Send for Buffer<A> {}

/// View into a specific offset and range of a [`Buffer`].
/// Care should be taken with the lifetime of this, as there is no checking that the buffer
/// is not dropped while using this.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BufferView {
    pub(crate) handle: vk::Buffer,
    pub(crate) pointer: Option<NonNull<c_void>>,
    pub(crate) offset: vk::DeviceSize,
    pub(crate) size: vk::DeviceSize,
}

// SAFETY: See the Send impl for Buffer.
unsafe impl Send for BufferView {}

/// Checks that a write of `requested` bytes fits a region of `capacity` bytes.
/// Factored out so the contract is testable without a device.
pub(crate) fn ensure_write_fits(requested: u64, capacity: u64) -> Result<(), Error> {
    if requested > capacity {
        Err(Error::SizeMismatch {
            requested,
            capacity,
        })
    } else {
        Ok(())
    }
}

impl<A: Allocator> Buffer<A> {
    /// Allocate a new buffer with a specific size, at a specific memory location.
    /// All usage flags must be given.
    pub fn new(
        device: Device,
        allocator: &mut A,
        size: impl Into<vk::DeviceSize>,
        usage: vk::BufferUsageFlags,
        location: MemoryType,
    ) -> Result<Self> {
        let size = size.into();
        let handle = unsafe {
            device.create_buffer(
                &vk::BufferCreateInfo {
                    s_type: vk::StructureType::BUFFER_CREATE_INFO,
                    p_next: std::ptr::null(),
                    flags: vk::BufferCreateFlags::empty(),
                    size,
                    usage,
                    // Buffers are only ever touched from the graphics queue.
                    sharing_mode: vk::SharingMode::EXCLUSIVE,
                    queue_family_index_count: 0,
                    p_queue_family_indices: std::ptr::null(),
                },
                None,
            )?
        };
        #[cfg(feature = "log-objects")]
        trace!("Created new VkBuffer {handle:p} (size = {size} bytes)");

        let requirements = unsafe { device.get_buffer_memory_requirements(handle) };
        let memory = allocator.allocate("buffer", &requirements, location)?;

        unsafe { device.bind_buffer_memory(handle, memory.memory(), memory.offset())? };

        Ok(Self {
            device,
            pointer: memory.mapped_ptr(),
            memory,
            handle,
            size,
        })
    }

    /// Allocate a new buffer with device local memory (VRAM). This is usually the correct
    /// memory location for most buffers.
    pub fn new_device_local(
        device: Device,
        allocator: &mut A,
        size: impl Into<vk::DeviceSize>,
        usage: vk::BufferUsageFlags,
    ) -> Result<Self> {
        Self::new(device, allocator, size, usage, MemoryType::GpuOnly)
    }

    /// Copy `data` into the buffer through its mapped pointer.
    /// # Errors
    /// * Fails with [`Error::UnmappableBuffer`] if the buffer is not host-visible.
    /// * Fails with [`Error::SizeMismatch`] if `data` is larger than the buffer;
    ///   nothing is written in that case.
    pub fn write<T: Copy>(&mut self, data: &[T]) -> Result<()> {
        let byte_size = std::mem::size_of_val(data) as u64;
        ensure_write_fits(byte_size, self.size)?;
        let pointer = self.pointer.ok_or(Error::UnmappableBuffer)?;
        unsafe {
            std::ptr::copy_nonoverlapping(
                data.as_ptr() as *const u8,
                pointer.cast::<u8>().as_ptr(),
                byte_size as usize,
            );
        }
        Ok(())
    }

    /// Creates a view into an offset and size of the buffer.
    /// # Lifetime
    /// This view is valid as long as the buffer is valid.
    /// # Errors
    /// Fails if `offset + size > self.size`.
    pub fn view(
        &self,
        offset: impl Into<vk::DeviceSize>,
        size: impl Into<vk::DeviceSize>,
    ) -> Result<BufferView> {
        let offset = offset.into();
        let size = size.into();
        if offset + size > self.size {
            Err(anyhow::Error::from(Error::BufferViewOutOfRange))
        } else {
            Ok(BufferView {
                handle: self.handle,
                offset,
                pointer: unsafe {
                    self.pointer
                        .map(|p| NonNull::new(p.as_ptr().offset(offset as isize)).unwrap())
                },
                size,
            })
        }
    }

    /// Creates a view of the entire buffer.
    /// # Lifetime
    /// This view is valid as long as the buffer is valid.
    pub fn view_full(&self) -> BufferView {
        BufferView {
            handle: self.handle,
            pointer: self.pointer,
            offset: 0,
            size: self.size,
        }
    }

    /// True if this buffer has a mapped pointer and thus can directly be written to.
    pub fn is_mapped(&self) -> bool {
        self.pointer.is_some()
    }

    /// Obtain a handle to the raw vulkan buffer object.
    /// # Safety
    /// * The caller must make sure to not use this handle after `self` is dropped.
    /// * The caller must not call `vkDestroyBuffer` on this handle.
    pub unsafe fn handle(&self) -> vk::Buffer {
        self.handle
    }

    /// Get the size of this buffer
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }
}

impl<A: Allocator> Drop for Buffer<A> {
    fn drop(&mut self) {
        #[cfg(feature = "log-objects")]
        trace!("Destroying VkBuffer {:p}", self.handle);
        unsafe {
            self.device.destroy_buffer(self.handle, None);
        }
    }
}

impl BufferView {
    /// Obtain a slice to the mapped memory of this buffer.
    /// # Errors
    /// Fails if this buffer is not mappable (not `HOST_VISIBLE`).
    pub fn mapped_slice<T>(&mut self) -> Result<&mut [T]> {
        if let Some(pointer) = self.pointer {
            Ok(unsafe {
                std::slice::from_raw_parts_mut(
                    pointer.cast::<T>().as_ptr(),
                    self.size as usize / std::mem::size_of::<T>(),
                )
            })
        } else {
            Err(anyhow::Error::from(Error::UnmappableBuffer))
        }
    }

    /// Obtain a handle to the raw vulkan buffer object.
    /// # Safety
    /// * The caller must make sure to not use this handle after the owning buffer is dropped.
    /// * The caller must not call `vkDestroyBuffer` on this handle.
    pub unsafe fn handle(&self) -> vk::Buffer {
        self.handle
    }

    /// Get the offset of this buffer view into the owning buffer
    pub fn offset(&self) -> vk::DeviceSize {
        self.offset
    }

    /// Get the size of this buffer view.
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_within_capacity_is_accepted() {
        assert!(ensure_write_fits(0, 64).is_ok());
        assert!(ensure_write_fits(64, 64).is_ok());
    }

    #[test]
    fn oversized_write_reports_both_sizes() {
        let err = ensure_write_fits(65, 64).unwrap_err();
        match err {
            Error::SizeMismatch {
                requested,
                capacity,
            } => {
                assert_eq!(requested, 65);
                assert_eq!(capacity, 64);
            }
            other => panic!("expected SizeMismatch, got {other:?}"),
        }
    }
}
