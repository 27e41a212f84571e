//! Per-frame uniform buffers.
//!
//! One host-visible, persistently mapped buffer per frame in flight. Writing goes
//! to the slot of the frame being recorded, so frames still executing on the GPU
//! keep reading their own unchanged copy.

use std::marker::PhantomData;

use anyhow::Result;
use ash::vk;

use crate::{Allocator, Buffer, DefaultAllocator, Device, MemoryType};

/// A set of `frames_in_flight` mapped uniform buffers holding one `T` each.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct UniformBuffer<T: Copy, A: Allocator = DefaultAllocator> {
    buffers: Vec<Buffer<A>>,
    #[derivative(Debug = "ignore")]
    _marker: PhantomData<T>,
}

impl<T: Copy, A: Allocator> UniformBuffer<T, A> {
    /// Allocate one mapped uniform buffer per frame in flight.
    pub fn new(device: Device, allocator: &mut A, frames_in_flight: usize) -> Result<Self> {
        let buffers = (0..frames_in_flight)
            .map(|_| {
                Buffer::new(
                    device.clone(),
                    allocator,
                    std::mem::size_of::<T>() as vk::DeviceSize,
                    vk::BufferUsageFlags::UNIFORM_BUFFER,
                    MemoryType::CpuToGpu,
                )
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(UniformBuffer {
            buffers,
            _marker: PhantomData,
        })
    }

    /// Write `data` into the buffer for frame slot `frame_index`. Only this slot
    /// is touched; other frames in flight keep their previous contents.
    pub fn write(&mut self, frame_index: usize, data: &T) -> Result<()> {
        self.buffers[frame_index].write(std::slice::from_ref(data))
    }

    /// The buffer for frame slot `frame_index`, for descriptor binding.
    /// # Safety
    /// The handle must not outlive `self`.
    pub unsafe fn buffer_handle(&self, frame_index: usize) -> vk::Buffer {
        self.buffers[frame_index].handle()
    }

    /// The byte size of one slot.
    pub fn slot_size(&self) -> vk::DeviceSize {
        std::mem::size_of::<T>() as vk::DeviceSize
    }

    /// The number of frame slots.
    pub fn slot_count(&self) -> usize {
        self.buffers.len()
    }
}
