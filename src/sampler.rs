//! Texture samplers.

use anyhow::Result;
use ash::vk;

use crate::{Device, Error};

/// Wrapper around a [`VkSampler`](vk::Sampler).
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Sampler {
    #[derivative(Debug = "ignore")]
    device: Device,
    handle: vk::Sampler,
}

impl Sampler {
    /// Create a linearly filtered, repeating sampler with anisotropy set to the
    /// device's reported maximum. This covers every texture in the scaffold.
    pub fn new_linear(device: Device) -> Result<Self> {
        let max_anisotropy = device.properties().limits.max_sampler_anisotropy;
        let info = vk::SamplerCreateInfo::builder()
            .mag_filter(vk::Filter::LINEAR)
            .min_filter(vk::Filter::LINEAR)
            .address_mode_u(vk::SamplerAddressMode::REPEAT)
            .address_mode_v(vk::SamplerAddressMode::REPEAT)
            .address_mode_w(vk::SamplerAddressMode::REPEAT)
            .anisotropy_enable(true)
            .max_anisotropy(max_anisotropy)
            .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
            .unnormalized_coordinates(false)
            .compare_enable(false)
            .compare_op(vk::CompareOp::ALWAYS)
            .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
            .build();

        let handle = unsafe { device.create_sampler(&info, None).map_err(Error::from)? };
        #[cfg(feature = "log-objects")]
        trace!("Created new VkSampler {handle:p}");
        Ok(Sampler {
            device,
            handle,
        })
    }

    /// Get unsafe access to the underlying `VkSampler` handle.
    /// # Safety
    /// * The caller must not destroy this handle, and must not use it after `self` is dropped.
    pub unsafe fn handle(&self) -> vk::Sampler {
        self.handle
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        #[cfg(feature = "log-objects")]
        trace!("Destroying VkSampler {:p}", self.handle);
        unsafe {
            self.device.destroy_sampler(self.handle, None);
        }
    }
}
