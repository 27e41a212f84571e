//! One-shot transfer commands.
//!
//! The [`TransferContext`] issues transient command buffers for upload, copy and
//! layout-transition work. Submission is intentionally synchronous: a dedicated
//! fence is waited on before the call returns and the command buffer is freed.
//! This trades throughput for simplicity, which is the right trade for setup-time
//! transfers; it is not meant for per-frame streaming.
//!
//! # Example
//!
//! ```no_run
//! # use deimos::prelude::*;
//! # fn example(transfer: &TransferContext, src: BufferView, dst: BufferView) -> anyhow::Result<()> {
//! transfer.begin_one_shot()?
//!     .copy_buffer(&src, &dst)?
//!     .submit()?;
//! // The copy has fully completed here; `src`'s buffer may be destroyed.
//! # Ok(())
//! # }
//! ```

use anyhow::Result;
use ash::vk;

use crate::{Allocator, BufferView, Device, Error, Fence, Image};
use crate::resource::image::barrier_masks;
use crate::resource::buffer::ensure_write_fits;

/// Wrapper around a [`VkCommandPool`](vk::CommandPool).
#[derive(Derivative)]
#[derivative(Debug)]
pub struct CommandPool {
    #[derivative(Debug = "ignore")]
    device: Device,
    pub(crate) handle: vk::CommandPool,
}

impl CommandPool {
    /// Create a new command pool over the given queue family.
    pub fn new(device: Device, family: u32, flags: vk::CommandPoolCreateFlags) -> Result<Self> {
        let handle = unsafe {
            device.create_command_pool(
                &vk::CommandPoolCreateInfo::builder()
                    .queue_family_index(family)
                    .flags(flags),
                None,
            )?
        };
        #[cfg(feature = "log-objects")]
        trace!("Created new VkCommandPool {handle:p}");

        Ok(CommandPool {
            device,
            handle,
        })
    }

    /// Get unsafe access to the underlying `VkCommandPool` handle.
    /// # Safety
    /// * The caller must not destroy this handle or free its command buffers.
    pub unsafe fn handle(&self) -> vk::CommandPool {
        self.handle
    }
}

impl Drop for CommandPool {
    fn drop(&mut self) {
        #[cfg(feature = "log-objects")]
        trace!("Destroying VkCommandPool {:p}", self.handle);
        unsafe {
            self.device.destroy_command_pool(self.handle, None);
        }
    }
}

/// Issues one-off command buffers on the graphics queue for setup-time transfers.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct TransferContext {
    #[derivative(Debug = "ignore")]
    device: Device,
    pool: CommandPool,
}

impl TransferContext {
    /// Create a transfer context with a transient command pool on the graphics queue family.
    pub fn new(device: Device) -> Result<Self> {
        let pool = CommandPool::new(
            device.clone(),
            device.queue_families().graphics,
            vk::CommandPoolCreateFlags::TRANSIENT,
        )?;
        Ok(TransferContext {
            device,
            pool,
        })
    }

    /// Allocate and begin recording a transient command buffer.
    /// Call [`OneShotCommands::submit`] to execute it; submission blocks until
    /// the GPU has finished.
    pub fn begin_one_shot(&self) -> Result<OneShotCommands<'_>> {
        let info = vk::CommandBufferAllocateInfo {
            s_type: vk::StructureType::COMMAND_BUFFER_ALLOCATE_INFO,
            p_next: std::ptr::null(),
            command_pool: self.pool.handle,
            level: vk::CommandBufferLevel::PRIMARY,
            command_buffer_count: 1,
        };
        let handle = unsafe { self.device.allocate_command_buffers(&info)? }
            .into_iter()
            .next()
            .ok_or(Error::Uncategorized("Command buffer allocation returned nothing"))?;

        unsafe {
            self.device.begin_command_buffer(
                handle,
                &vk::CommandBufferBeginInfo::builder()
                    .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT),
            )?;
        }

        Ok(OneShotCommands {
            transfer: self,
            handle: Some(handle),
        })
    }
}

/// A transient command buffer in the recording state. Recording methods chain by
/// value; [`submit`](OneShotCommands::submit) ends recording, submits, and blocks
/// until completion. Dropping without submitting discards the recorded commands.
#[derive(Debug)]
pub struct OneShotCommands<'t> {
    transfer: &'t TransferContext,
    handle: Option<vk::CommandBuffer>,
}

impl OneShotCommands<'_> {
    fn cmd(&self) -> vk::CommandBuffer {
        // Only None after submit() or drop, neither of which can be observed here.
        self.handle.unwrap()
    }

    /// Record a copy of the whole source view into the destination view.
    /// # Errors
    /// Fails with [`Error::SizeMismatch`] if the source is larger than the destination.
    /// A zero-sized source records nothing.
    pub fn copy_buffer(self, src: &BufferView, dst: &BufferView) -> Result<Self> {
        ensure_write_fits(src.size(), dst.size())?;
        if src.size() == 0 {
            return Ok(self);
        }

        let copy = vk::BufferCopy {
            src_offset: src.offset(),
            dst_offset: dst.offset(),
            size: src.size(),
        };

        unsafe {
            self.transfer.device.cmd_copy_buffer(
                self.cmd(),
                src.handle(),
                dst.handle(),
                std::slice::from_ref(&copy),
            );
        }

        Ok(self)
    }

    /// Record a buffer-to-image copy for the given regions. The image must be in
    /// the transfer-destination layout.
    pub fn copy_buffer_to_image<A: Allocator>(
        self,
        src: &BufferView,
        dst: &Image<A>,
        regions: &[vk::BufferImageCopy],
    ) -> Result<Self> {
        unsafe {
            self.transfer.device.cmd_copy_buffer_to_image(
                self.cmd(),
                src.handle(),
                dst.handle(),
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                regions,
            );
        }
        Ok(self)
    }

    /// Record an image layout transition over all layers of the image.
    /// # Errors
    /// Fails with [`Error::UnsupportedTransition`] for any pair other than
    /// undefined to transfer-dst and transfer-dst to shader-read-only.
    pub fn transition_image_layout<A: Allocator>(
        self,
        image: &Image<A>,
        old_layout: vk::ImageLayout,
        new_layout: vk::ImageLayout,
    ) -> Result<Self> {
        let masks = barrier_masks(old_layout, new_layout)?;

        let barrier = vk::ImageMemoryBarrier {
            s_type: vk::StructureType::IMAGE_MEMORY_BARRIER,
            p_next: std::ptr::null(),
            src_access_mask: masks.src_access,
            dst_access_mask: masks.dst_access,
            old_layout,
            new_layout,
            src_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
            dst_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
            image: unsafe { image.handle() },
            subresource_range: vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: image.layers(),
            },
        };

        unsafe {
            self.transfer.device.cmd_pipeline_barrier(
                self.cmd(),
                masks.src_stage,
                masks.dst_stage,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                std::slice::from_ref(&barrier),
            );
        }
        Ok(self)
    }

    /// End recording, submit to the graphics queue, and block until execution
    /// completes. The transient command buffer is freed afterwards.
    pub fn submit(mut self) -> Result<()> {
        let device = &self.transfer.device;
        let handle = self.handle.take().unwrap();
        unsafe { device.end_command_buffer(handle)? };

        let fence = Fence::new(device.clone(), false)?;
        let info = vk::SubmitInfo {
            s_type: vk::StructureType::SUBMIT_INFO,
            p_next: std::ptr::null(),
            wait_semaphore_count: 0,
            p_wait_semaphores: std::ptr::null(),
            p_wait_dst_stage_mask: std::ptr::null(),
            command_buffer_count: 1,
            p_command_buffers: &handle,
            signal_semaphore_count: 0,
            p_signal_semaphores: std::ptr::null(),
        };

        unsafe {
            device
                .queue_submit(
                    device.graphics_queue(),
                    std::slice::from_ref(&info),
                    fence.handle(),
                )
                .map_err(Error::from)?;
        }
        fence.wait()?;

        unsafe {
            device.free_command_buffers(self.transfer.pool.handle, std::slice::from_ref(&handle));
        }
        Ok(())
    }
}

impl Drop for OneShotCommands<'_> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            unsafe {
                self.transfer
                    .device
                    .free_command_buffers(self.transfer.pool.handle, std::slice::from_ref(&handle));
            }
        }
    }
}
