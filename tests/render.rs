use anyhow::Result;
use ash::vk;
use ash::vk::Handle;

use deimos::prelude::*;

mod framework;

#[test]
pub fn render_pass_uses_probed_depth_format() -> Result<()> {
    let Some(context) = framework::make_context() else {
        return Ok(());
    };

    let depth_format = find_depth_format(&context.instance, &context.physical_device)?;
    let render_pass = RenderPass::new(
        context.device.clone(),
        vk::Format::B8G8R8A8_SRGB,
        depth_format,
    )?;
    assert_eq!(render_pass.color_format(), vk::Format::B8G8R8A8_SRGB);
    assert_eq!(render_pass.depth_format(), depth_format);
    assert_ne!(unsafe { render_pass.handle().as_raw() }, 0);
    Ok(())
}

#[test]
pub fn depth_image_supports_a_depth_view() -> Result<()> {
    let Some(mut context) = framework::make_context() else {
        return Ok(());
    };

    let depth_format = find_depth_format(&context.instance, &context.physical_device)?;
    let image = Image::new(
        context.device.clone(),
        &mut context.allocator,
        ImageCreateInfo {
            width: 640,
            height: 480,
            usage: vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
            format: depth_format,
            layers: 1,
        },
    )?;
    assert!(image.is_owned());

    let view = image.whole_view(vk::ImageAspectFlags::DEPTH)?;
    assert_eq!(view.format(), depth_format);
    assert_eq!(view.size().width, 640);
    Ok(())
}

#[test]
pub fn sampler_creation_respects_device_limits() -> Result<()> {
    let Some(context) = framework::make_context() else {
        return Ok(());
    };

    let sampler = Sampler::new_linear(context.device.clone())?;
    assert_ne!(unsafe { sampler.handle().as_raw() }, 0);
    Ok(())
}

#[test]
pub fn uniform_buffer_has_one_mapped_slot_per_frame() -> Result<()> {
    let Some(mut context) = framework::make_context() else {
        return Ok(());
    };

    #[repr(C)]
    #[derive(Copy, Clone)]
    struct CameraData {
        view_proj: [[f32; 4]; 4],
    }

    let mut ubo: UniformBuffer<CameraData> = UniformBuffer::new(
        context.device.clone(),
        &mut context.allocator,
        context.frames_in_flight,
    )?;
    assert_eq!(ubo.slot_count(), context.frames_in_flight);
    assert_eq!(ubo.slot_size(), std::mem::size_of::<CameraData>() as u64);

    let data = CameraData {
        view_proj: [[1.0, 0.0, 0.0, 0.0]; 4],
    };
    for frame in 0..ubo.slot_count() {
        ubo.write(frame, &data)?;
        assert_ne!(unsafe { ubo.buffer_handle(frame).as_raw() }, 0);
    }
    Ok(())
}

#[test]
pub fn descriptor_layout_from_binding_list() -> Result<()> {
    let Some(context) = framework::make_context() else {
        return Ok(());
    };

    let layout = DescriptorSetLayout::new(
        context.device.clone(),
        &[
            DescriptorBinding {
                binding: 0,
                ty: vk::DescriptorType::UNIFORM_BUFFER,
                count: 1,
                stages: vk::ShaderStageFlags::VERTEX,
            },
            DescriptorBinding {
                binding: 1,
                ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                count: 1,
                stages: vk::ShaderStageFlags::FRAGMENT,
            },
        ],
    )?;
    assert_ne!(unsafe { layout.handle().as_raw() }, 0);
    Ok(())
}
