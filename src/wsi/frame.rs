//! Contains all the logic responsible for managing presentation and frame synchronization.
//!
//! The [`FrameManager`] owns N sets of synchronization primitives and command
//! buffers for N frames in flight. Each frame slot cycles through
//! `Idle -> Submitted -> (fence signaled) -> Idle`:
//!
//! 1. [`wait_for_frame`](FrameManager::wait_for_frame) blocks on the slot's fence,
//!    so at most N command buffers are ever outstanding. This is the backpressure
//!    that keeps the CPU from racing ahead of the GPU.
//! 2. [`acquire_image`](FrameManager::acquire_image) asks the swapchain for an
//!    image; the GPU signals the slot's image-available semaphore when it is ready.
//! 3. [`begin_frame`](FrameManager::begin_frame) resets the fence and command
//!    buffer and starts recording.
//! 4. [`submit`](FrameManager::submit) waits GPU-side on image-available and
//!    signals render-finished plus the in-flight fence.
//! 5. [`present`](FrameManager::present) waits GPU-side on render-finished.
//! 6. [`next_frame`](FrameManager::next_frame) advances the slot index modulo N.
//!
//! GPU-side ordering between acquire, draw and present runs purely on the
//! semaphore chain; the fence is the only CPU-side wait.
//!
//! # Example
//!
//! ```no_run
//! # use deimos::prelude::*;
//! # fn frame(frames: &mut FrameManager, swapchain: &mut Swapchain, ) -> anyhow::Result<()> {
//! frames.wait_for_frame()?;
//! let acquired = frames.acquire_image(swapchain)?;
//! if acquired.resize_required {
//!     // Recreate the swapchain, then try again next frame.
//!     return Ok(());
//! }
//! frames.begin_frame()?;
//! // record draw commands on frames.command_buffer() here
//! frames.end_frame()?;
//! frames.submit()?;
//! if frames.present(swapchain)? {
//!     // Out of date or suboptimal; recreate at the next opportunity.
//! }
//! frames.next_frame();
//! # Ok(())
//! # }
//! ```

use anyhow::Result;
use ash::vk;

use crate::{Allocator, CommandPool, Device, Error, Fence, Semaphore, Swapchain};

/// Information stored for each in-flight frame.
#[derive(Derivative)]
#[derivative(Debug)]
struct PerFrame {
    /// Command buffer recorded for this slot. Reset and re-recorded once the fence signals.
    command_buffer: vk::CommandBuffer,
    /// Signaled by the GPU when a swapchain image is ready.
    image_available: Semaphore,
    /// Signaled by the GPU when all commands for a frame have been processed.
    /// We wait on this before presenting.
    render_finished: Semaphore,
    /// Signaled when this slot's submission has fully executed. Created signaled so
    /// the first wait on a fresh slot does not block.
    in_flight: Fence,
}

/// Result of acquiring a swapchain image.
#[derive(Debug, Copy, Clone)]
pub struct AcquiredImage {
    /// Index of the acquired swapchain image.
    pub index: u32,
    /// The swapchain must be recreated before this image can be used.
    pub resize_required: bool,
}

/// Advance a frame slot index, wrapping at `frames_in_flight`.
pub(crate) fn next_frame_index(current: usize, frames_in_flight: usize) -> usize {
    (current + 1) % frames_in_flight
}

/// Responsible for presentation and frame-frame synchronization.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct FrameManager {
    #[derivative(Debug = "ignore")]
    device: Device,
    pool: CommandPool,
    per_frame: Vec<PerFrame>,
    current_frame: usize,
    current_image: u32,
    /// Set when presentation reported a suboptimal swapchain; cleared on recreation.
    needs_recreate: bool,
}

impl FrameManager {
    /// Initialize the frame manager with `frames_in_flight` frame slots.
    /// A count of zero is treated as one.
    pub fn new(device: Device, frames_in_flight: usize) -> Result<Self> {
        let frames_in_flight = frames_in_flight.max(1);
        let pool = CommandPool::new(
            device.clone(),
            device.queue_families().graphics,
            vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
        )?;

        let info = vk::CommandBufferAllocateInfo {
            s_type: vk::StructureType::COMMAND_BUFFER_ALLOCATE_INFO,
            p_next: std::ptr::null(),
            command_pool: unsafe { pool.handle() },
            level: vk::CommandBufferLevel::PRIMARY,
            command_buffer_count: frames_in_flight as u32,
        };
        let command_buffers = unsafe { device.allocate_command_buffers(&info)? };

        let per_frame = command_buffers
            .into_iter()
            .map(|command_buffer| -> Result<PerFrame> {
                Ok(PerFrame {
                    command_buffer,
                    image_available: Semaphore::new(device.clone())?,
                    render_finished: Semaphore::new(device.clone())?,
                    in_flight: Fence::new(device.clone(), true)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        info!("Created frame manager with {frames_in_flight} frames in flight");

        Ok(FrameManager {
            device,
            pool,
            per_frame,
            current_frame: 0,
            current_image: 0,
            needs_recreate: false,
        })
    }

    /// Block until the previous submission on the current slot has fully executed.
    /// Must be called before touching this slot's command buffer. The wait is
    /// unbounded; a lost device surfaces as [`Error::DeviceLost`](crate::Error).
    pub fn wait_for_frame(&self) -> Result<()> {
        self.per_frame[self.current_frame].in_flight.wait()
    }

    /// Acquire the next swapchain image. The GPU signals the current slot's
    /// image-available semaphore once the image is actually free.
    ///
    /// An out-of-date swapchain is reported through
    /// [`AcquiredImage::resize_required`], not as an error; a suboptimal chain is
    /// accepted for this frame but flagged for recreation. Anything else is fatal.
    pub fn acquire_image<A: Allocator>(&mut self, swapchain: &Swapchain<A>) -> Result<AcquiredImage> {
        let frame = &self.per_frame[self.current_frame];
        let result =
            unsafe { swapchain.acquire_next_image(frame.image_available.handle()) };

        match result {
            Ok((index, suboptimal)) => {
                self.current_image = index;
                if suboptimal {
                    self.needs_recreate = true;
                }
                Ok(AcquiredImage {
                    index,
                    resize_required: false,
                })
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquiredImage {
                index: 0,
                resize_required: true,
            }),
            Err(err) => Err(Error::from(err).into()),
        }
    }

    /// Reset the current slot's fence and command buffer and begin recording.
    /// Only call after [`wait_for_frame`](FrameManager::wait_for_frame) has returned.
    pub fn begin_frame(&self) -> Result<()> {
        let frame = &self.per_frame[self.current_frame];
        frame.in_flight.reset()?;
        unsafe {
            self.device.reset_command_buffer(
                frame.command_buffer,
                vk::CommandBufferResetFlags::empty(),
            )?;
            self.device.begin_command_buffer(
                frame.command_buffer,
                &vk::CommandBufferBeginInfo::default(),
            )?;
        }
        Ok(())
    }

    /// End recording on the current slot's command buffer.
    pub fn end_frame(&self) -> Result<()> {
        unsafe {
            self.device
                .end_command_buffer(self.per_frame[self.current_frame].command_buffer)?;
        }
        Ok(())
    }

    /// Submit the current slot's command buffer to the graphics queue.
    ///
    /// The submission waits for the image-available semaphore at the
    /// color-attachment-output and early-fragment-test stages (matching the render
    /// pass dependency), and signals the render-finished semaphore and the
    /// in-flight fence.
    pub fn submit(&self) -> Result<()> {
        let frame = &self.per_frame[self.current_frame];

        let wait_semaphores = [unsafe { frame.image_available.handle() }];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
            | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS];
        let signal_semaphores = [unsafe { frame.render_finished.handle() }];
        let command_buffers = [frame.command_buffer];

        let info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores)
            .build();

        unsafe {
            self.device
                .queue_submit(
                    self.device.graphics_queue(),
                    std::slice::from_ref(&info),
                    frame.in_flight.handle(),
                )
                .map_err(Error::from)?;
        }
        Ok(())
    }

    /// Present the acquired image, waiting GPU-side on the render-finished
    /// semaphore. Returns true if the swapchain should be recreated (out of date,
    /// suboptimal, or flagged earlier by acquisition).
    pub fn present<A: Allocator>(&mut self, swapchain: &Swapchain<A>) -> Result<bool> {
        let frame = &self.per_frame[self.current_frame];
        let result = unsafe {
            swapchain.present(
                self.device.present_queue(),
                self.current_image,
                frame.render_finished.handle(),
            )
        };

        match result {
            Ok(suboptimal) => Ok(suboptimal || self.needs_recreate),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(true),
            Err(err) => Err(Error::from(err).into()),
        }
    }

    /// Advance to the next frame slot, wrapping at the number of frames in flight.
    pub fn next_frame(&mut self) {
        self.current_frame = next_frame_index(self.current_frame, self.per_frame.len());
    }

    /// Clear the pending-recreation flag. Call after the swapchain has been rebuilt.
    pub fn swapchain_recreated(&mut self) {
        self.needs_recreate = false;
    }

    /// Block until every in-flight frame has completed.
    pub fn wait_all(&self) -> Result<()> {
        let fences = self
            .per_frame
            .iter()
            .map(|frame| unsafe { frame.in_flight.handle() })
            .collect::<Vec<_>>();
        unsafe {
            self.device
                .wait_for_fences(&fences, true, u64::MAX)
                .map_err(Error::from)?;
        }
        Ok(())
    }

    /// The command buffer of the current frame slot. Valid to record between
    /// [`begin_frame`](FrameManager::begin_frame) and [`end_frame`](FrameManager::end_frame).
    pub fn command_buffer(&self) -> vk::CommandBuffer {
        self.per_frame[self.current_frame].command_buffer
    }

    /// Index of the current frame slot, in `0..frames_in_flight`.
    pub fn current_frame_index(&self) -> usize {
        self.current_frame
    }

    /// Index of the currently acquired swapchain image.
    pub fn image_index(&self) -> u32 {
        self.current_image
    }

    /// The number of frames in flight.
    pub fn frames_in_flight(&self) -> usize {
        self.per_frame.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_index_advances_modulo_n() {
        let mut index = 0;
        index = next_frame_index(index, 2);
        assert_eq!(index, 1);
        index = next_frame_index(index, 2);
        assert_eq!(index, 0);
    }

    #[test]
    fn every_slot_is_visited_once_per_cycle() {
        for n in 1..=4usize {
            let mut index = 0;
            let mut visited = vec![false; n];
            for _ in 0..n {
                visited[index] = true;
                index = next_frame_index(index, n);
            }
            assert!(visited.iter().all(|&v| v), "cycle of length {n} skipped a slot");
            // After a full cycle the index is back at the start, so slot reuse
            // always goes through the oldest submission first.
            assert_eq!(index, 0);
        }
    }
}
