use anyhow::Result;
use ash::vk;

use deimos::prelude::*;

mod framework;

#[test]
pub fn frame_slots_cycle_modulo_n() -> Result<()> {
    let Some(context) = framework::make_context() else {
        return Ok(());
    };

    let mut frames = FrameManager::new(context.device.clone(), 2)?;
    assert_eq!(frames.frames_in_flight(), 2);
    assert_eq!(frames.current_frame_index(), 0);
    frames.next_frame();
    assert_eq!(frames.current_frame_index(), 1);
    frames.next_frame();
    assert_eq!(frames.current_frame_index(), 0);
    Ok(())
}

#[test]
pub fn fresh_slots_do_not_block() -> Result<()> {
    let Some(context) = framework::make_context() else {
        return Ok(());
    };

    // In-flight fences start signaled, so waiting on a slot that has never been
    // submitted returns immediately instead of deadlocking the first frame.
    let mut frames = FrameManager::new(context.device.clone(), 3)?;
    for _ in 0..3 {
        frames.wait_for_frame()?;
        frames.next_frame();
    }
    frames.wait_all()?;
    Ok(())
}

#[test]
pub fn empty_frame_records_and_submits() -> Result<()> {
    let Some(context) = framework::make_context() else {
        return Ok(());
    };

    let frames = FrameManager::new(context.device.clone(), 2)?;

    // One full slot cycle without a swapchain: wait, record nothing, submit with
    // no semaphores involved is not possible through submit() (it waits on the
    // acquire semaphore), so drive the command buffer directly and wait the slot.
    frames.wait_for_frame()?;
    frames.begin_frame()?;
    frames.end_frame()?;

    let command_buffers = [frames.command_buffer()];
    let info = vk::SubmitInfo::builder()
        .command_buffers(&command_buffers)
        .build();
    unsafe {
        context.device.queue_submit(
            context.device.graphics_queue(),
            std::slice::from_ref(&info),
            vk::Fence::null(),
        )?;
    }
    context.wait_idle()?;
    Ok(())
}

#[test]
pub fn zero_frames_in_flight_is_clamped_to_one() -> Result<()> {
    let Some(context) = framework::make_context() else {
        return Ok(());
    };

    let frames = FrameManager::new(context.device.clone(), 0)?;
    assert_eq!(frames.frames_in_flight(), 1);
    Ok(())
}
