//! Graphics pipeline scaffolding.
//!
//! Shader byte code is opaque ([`ShaderModule`](shader::ShaderModule)), vertex
//! layout and descriptor bindings are plain data ([`VertexInput`](vertex_input::VertexInput),
//! [`DescriptorBinding`]), and [`GraphicsPipeline`] assembles one fixed-function
//! configuration around them: dynamic viewport and scissor, depth test enabled,
//! one color attachment. Anything fancier belongs to the application.

pub mod shader;
pub mod vertex_input;

use anyhow::Result;
use ash::vk;

use crate::{Device, Error, RenderPass};
use self::shader::ShaderModule;
use self::vertex_input::VertexInput;

const SHADER_ENTRY: &[u8] = b"main\0";

/// One descriptor binding in a set layout. Passed as an ordered slice, not as a
/// setup callback.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DescriptorBinding {
    /// Binding number inside the set.
    pub binding: u32,
    /// Descriptor type at this binding.
    pub ty: vk::DescriptorType,
    /// Number of descriptors (1 unless this is an array binding).
    pub count: u32,
    /// Shader stages that access this binding.
    pub stages: vk::ShaderStageFlags,
}

/// Wrapper around a [`VkDescriptorSetLayout`](vk::DescriptorSetLayout) created from
/// a [`DescriptorBinding`] slice.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct DescriptorSetLayout {
    #[derivative(Debug = "ignore")]
    device: Device,
    handle: vk::DescriptorSetLayout,
}

impl DescriptorSetLayout {
    /// Create a descriptor set layout from an ordered binding list.
    pub fn new(device: Device, bindings: &[DescriptorBinding]) -> Result<Self> {
        let vk_bindings = bindings
            .iter()
            .map(|binding| vk::DescriptorSetLayoutBinding {
                binding: binding.binding,
                descriptor_type: binding.ty,
                descriptor_count: binding.count,
                stage_flags: binding.stages,
                p_immutable_samplers: std::ptr::null(),
            })
            .collect::<Vec<_>>();

        let info = vk::DescriptorSetLayoutCreateInfo::builder()
            .bindings(&vk_bindings)
            .build();
        let handle = unsafe {
            device
                .create_descriptor_set_layout(&info, None)
                .map_err(Error::from)?
        };
        Ok(DescriptorSetLayout {
            device,
            handle,
        })
    }

    /// Get unsafe access to the underlying `VkDescriptorSetLayout` handle.
    /// # Safety
    /// * The caller must not destroy this handle, and must not use it after `self` is dropped.
    pub unsafe fn handle(&self) -> vk::DescriptorSetLayout {
        self.handle
    }
}

impl Drop for DescriptorSetLayout {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_set_layout(self.handle, None);
        }
    }
}

/// A graphics pipeline together with its pipeline layout.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct GraphicsPipeline {
    #[derivative(Debug = "ignore")]
    device: Device,
    handle: vk::Pipeline,
    layout: vk::PipelineLayout,
}

impl GraphicsPipeline {
    /// Build a graphics pipeline for `render_pass` from a vertex and fragment
    /// shader, a vertex layout and descriptor set layouts. Viewport and scissor are
    /// dynamic state, set by [`RenderPass::begin`].
    pub fn new(
        device: Device,
        vertex_shader: &ShaderModule,
        fragment_shader: &ShaderModule,
        vertex_input: &VertexInput,
        set_layouts: &[&DescriptorSetLayout],
        render_pass: &RenderPass,
    ) -> Result<Self> {
        let entry = unsafe { std::ffi::CStr::from_bytes_with_nul_unchecked(SHADER_ENTRY) };
        let stages = [
            vk::PipelineShaderStageCreateInfo::builder()
                .stage(vk::ShaderStageFlags::VERTEX)
                .module(unsafe { vertex_shader.handle() })
                .name(entry)
                .build(),
            vk::PipelineShaderStageCreateInfo::builder()
                .stage(vk::ShaderStageFlags::FRAGMENT)
                .module(unsafe { fragment_shader.handle() })
                .name(entry)
                .build(),
        ];

        let bindings = vertex_input.binding_descriptions();
        let attributes = vertex_input.attribute_descriptions();
        let vertex_state = vk::PipelineVertexInputStateCreateInfo::builder()
            .vertex_binding_descriptions(&bindings)
            .vertex_attribute_descriptions(&attributes)
            .build();

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::builder()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
            .build();

        // Actual viewport and scissor are dynamic.
        let viewport_state = vk::PipelineViewportStateCreateInfo::builder()
            .viewport_count(1)
            .scissor_count(1)
            .build();

        let rasterization = vk::PipelineRasterizationStateCreateInfo::builder()
            .polygon_mode(vk::PolygonMode::FILL)
            .cull_mode(vk::CullModeFlags::BACK)
            .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
            .line_width(1.0)
            .build();

        let multisample = vk::PipelineMultisampleStateCreateInfo::builder()
            .rasterization_samples(vk::SampleCountFlags::TYPE_1)
            .build();

        let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::builder()
            .depth_test_enable(true)
            .depth_write_enable(true)
            .depth_compare_op(vk::CompareOp::LESS)
            .build();

        let blend_attachment = vk::PipelineColorBlendAttachmentState {
            blend_enable: vk::FALSE,
            color_write_mask: vk::ColorComponentFlags::RGBA,
            ..Default::default()
        };
        let color_blend = vk::PipelineColorBlendStateCreateInfo::builder()
            .attachments(std::slice::from_ref(&blend_attachment))
            .build();

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::builder()
            .dynamic_states(&dynamic_states)
            .build();

        let raw_set_layouts = set_layouts
            .iter()
            .map(|layout| unsafe { layout.handle() })
            .collect::<Vec<_>>();
        let layout_info = vk::PipelineLayoutCreateInfo::builder()
            .set_layouts(&raw_set_layouts)
            .build();
        let layout = unsafe {
            device
                .create_pipeline_layout(&layout_info, None)
                .map_err(Error::from)?
        };

        let info = vk::GraphicsPipelineCreateInfo::builder()
            .stages(&stages)
            .vertex_input_state(&vertex_state)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization)
            .multisample_state(&multisample)
            .depth_stencil_state(&depth_stencil)
            .color_blend_state(&color_blend)
            .dynamic_state(&dynamic_state)
            .layout(layout)
            .render_pass(unsafe { render_pass.handle() })
            .subpass(0)
            .build();

        let handle = unsafe {
            device
                .create_graphics_pipelines(vk::PipelineCache::null(), &[info], None)
                .map_err(|(_, err)| Error::from(err))?
        }
        .into_iter()
        .next()
        .ok_or(Error::Uncategorized("Pipeline creation returned nothing"))?;
        #[cfg(feature = "log-objects")]
        trace!("Created new VkPipeline {handle:p}");

        Ok(GraphicsPipeline {
            device,
            handle,
            layout,
        })
    }

    /// Bind this pipeline on a command buffer.
    pub fn bind(&self, cmd: vk::CommandBuffer) {
        unsafe {
            self.device
                .cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, self.handle);
        }
    }

    /// Get unsafe access to the underlying `VkPipeline` handle.
    /// # Safety
    /// * The caller must not destroy this handle, and must not use it after `self` is dropped.
    pub unsafe fn handle(&self) -> vk::Pipeline {
        self.handle
    }

    /// Get unsafe access to the pipeline layout.
    /// # Safety
    /// * The caller must not destroy this handle, and must not use it after `self` is dropped.
    pub unsafe fn layout(&self) -> vk::PipelineLayout {
        self.layout
    }
}

impl Drop for GraphicsPipeline {
    fn drop(&mut self) {
        #[cfg(feature = "log-objects")]
        trace!("Destroying VkPipeline {:p}", self.handle);
        unsafe {
            self.device.destroy_pipeline(self.handle, None);
            self.device.destroy_pipeline_layout(self.layout, None);
        }
    }
}
