//! Shader module wrapper. Byte code is opaque to this library; compile shaders
//! offline and load them with [`asset::load_spirv`](crate::asset::load_spirv).

use anyhow::Result;
use ash::vk;

use crate::{Device, Error};

/// Wrapper around a [`VkShaderModule`](vk::ShaderModule).
#[derive(Derivative)]
#[derivative(Debug)]
pub struct ShaderModule {
    #[derivative(Debug = "ignore")]
    device: Device,
    handle: vk::ShaderModule,
}

impl ShaderModule {
    /// Create a shader module from SPIR-V byte code.
    pub fn new(device: Device, code: &[u32]) -> Result<Self> {
        let info = vk::ShaderModuleCreateInfo::builder().code(code).build();
        let handle = unsafe { device.create_shader_module(&info, None).map_err(Error::from)? };
        #[cfg(feature = "log-objects")]
        trace!("Created new VkShaderModule {handle:p}");
        Ok(ShaderModule {
            device,
            handle,
        })
    }

    /// Get unsafe access to the underlying `VkShaderModule` handle.
    /// # Safety
    /// * The caller must not destroy this handle, and must not use it after `self` is dropped.
    pub unsafe fn handle(&self) -> vk::ShaderModule {
        self.handle
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        #[cfg(feature = "log-objects")]
        trace!("Destroying VkShaderModule {:p}", self.handle);
        unsafe {
            self.device.destroy_shader_module(self.handle, None);
        }
    }
}
