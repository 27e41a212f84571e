//! Wrapper around a [`VkFence`](vk::Fence), used for CPU-GPU synchronization.

use std::slice;

use anyhow::Result;
use ash::vk;

use crate::{Device, Error};

/// Wrapper around a [`VkFence`](vk::Fence) object. Fences are used for CPU-GPU sync.
///
/// All waits are unbounded: they block until the fence signals or the device is
/// lost, in which case [`Error::DeviceLost`] is returned.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Fence {
    #[derivative(Debug = "ignore")]
    device: Device,
    handle: vk::Fence,
}

impl Fence {
    /// Create a new fence, possibly in the signaled status.
    pub fn new(device: Device, signaled: bool) -> Result<Self> {
        let info = vk::FenceCreateInfo {
            s_type: vk::StructureType::FENCE_CREATE_INFO,
            p_next: std::ptr::null(),
            flags: if signaled {
                vk::FenceCreateFlags::SIGNALED
            } else {
                vk::FenceCreateFlags::empty()
            },
        };
        let handle = unsafe { device.create_fence(&info, None).map_err(Error::from)? };
        #[cfg(feature = "log-objects")]
        trace!("Created new VkFence {handle:p}");
        Ok(Fence {
            device,
            handle,
        })
    }

    /// Block until the fence is signaled. There is no timeout; a lost device is
    /// reported as [`Error::DeviceLost`].
    pub fn wait(&self) -> Result<()> {
        unsafe {
            self.device
                .wait_for_fences(slice::from_ref(&self.handle), true, u64::MAX)
                .map_err(Error::from)?
        };
        Ok(())
    }

    /// Reset the fence to the unsignaled status.
    pub fn reset(&self) -> Result<()> {
        unsafe {
            self.device
                .reset_fences(slice::from_ref(&self.handle))
                .map_err(Error::from)?
        };
        Ok(())
    }

    /// Get unsafe access to the underlying `VkFence` handle.
    /// # Safety
    /// * The caller must not destroy this handle, and must not use it after `self` is dropped.
    pub unsafe fn handle(&self) -> vk::Fence {
        self.handle
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        #[cfg(feature = "log-objects")]
        trace!("Destroying VkFence {:p}", self.handle);
        unsafe {
            self.device.destroy_fence(self.handle, None);
        }
    }
}
