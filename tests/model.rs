use anyhow::Result;

use deimos::prelude::*;

mod framework;

#[repr(C)]
#[derive(Copy, Clone)]
struct Vertex {
    position: glam::Vec3,
    uv: glam::Vec2,
}

#[repr(C)]
#[derive(Copy, Clone)]
struct InstanceData {
    offset: glam::Vec3,
}

fn quad() -> (Vec<Vertex>, Vec<u16>) {
    let vertices = [
        glam::vec3(-0.5, -0.5, 0.0),
        glam::vec3(0.5, -0.5, 0.0),
        glam::vec3(0.5, 0.5, 0.0),
        glam::vec3(-0.5, 0.5, 0.0),
    ]
    .iter()
    .map(|&position| Vertex {
        position,
        uv: glam::vec2(position.x + 0.5, position.y + 0.5),
    })
    .collect();
    (vertices, vec![0, 1, 2, 2, 3, 0])
}

#[test]
pub fn static_quad_with_three_instances_issues_one_draw() -> Result<()> {
    let Some(mut context) = framework::make_context() else {
        return Ok(());
    };

    let (vertices, indices) = quad();
    let mut model: Model<Vertex, InstanceData> = Model::new_static(
        context.device.clone(),
        &mut context.allocator,
        &context.transfer,
        &vertices,
        &indices,
        3,
    )?;

    // Fresh models have zero live instances and draw nothing.
    assert_eq!(model.draw_call(), None);

    let instances = [
        InstanceData { offset: glam::vec3(0.0, 0.0, 0.0) },
        InstanceData { offset: glam::vec3(1.0, 0.0, 0.0) },
        InstanceData { offset: glam::vec3(2.0, 0.0, 0.0) },
    ];
    model.update_instances(&context.transfer, &instances)?;

    let call = model.draw_call().expect("three instances should draw");
    assert_eq!(call.index_count, 6);
    assert_eq!(call.instance_count, 3);
    Ok(())
}

#[test]
pub fn static_model_ignores_geometry_updates() -> Result<()> {
    let Some(mut context) = framework::make_context() else {
        return Ok(());
    };

    let (vertices, indices) = quad();
    let mut model: Model<Vertex, InstanceData> = Model::new_static(
        context.device.clone(),
        &mut context.allocator,
        &context.transfer,
        &vertices,
        &indices,
        1,
    )?;
    assert!(!model.is_mutable());

    // Geometry updates on a static model are a no-op, not an error.
    model.update(&context.transfer, &vertices[..3], &indices[..3])?;
    assert_eq!(model.index_count(), 6);
    Ok(())
}

#[test]
pub fn mutable_model_rewrites_geometry_in_place() -> Result<()> {
    let Some(mut context) = framework::make_context() else {
        return Ok(());
    };

    let (vertices, indices) = quad();
    let mut model: Model<Vertex, InstanceData> = Model::new_mutable(
        context.device.clone(),
        &mut context.allocator,
        &context.transfer,
        &vertices[..3],
        &indices[..3],
        4,
        6,
        1,
    )?;
    assert!(model.is_mutable());
    assert_eq!(model.index_count(), 3);

    // No draw has been submitted, so the device is trivially idle here.
    context.wait_idle()?;
    model.update(&context.transfer, &vertices, &indices)?;
    assert_eq!(model.index_count(), 6);
    Ok(())
}

#[test]
pub fn geometry_beyond_capacity_is_rejected() -> Result<()> {
    let Some(mut context) = framework::make_context() else {
        return Ok(());
    };

    let (vertices, indices) = quad();
    let mut model: Model<Vertex, InstanceData> = Model::new_mutable(
        context.device.clone(),
        &mut context.allocator,
        &context.transfer,
        &vertices[..3],
        &indices[..3],
        3,
        3,
        1,
    )?;

    context.wait_idle()?;
    let err = model
        .update(&context.transfer, &vertices, &indices)
        .unwrap_err()
        .downcast::<Error>()?;
    assert!(matches!(err, Error::SizeMismatch { .. }));
    Ok(())
}

#[test]
pub fn too_many_instances_are_rejected_and_count_is_unchanged() -> Result<()> {
    let Some(mut context) = framework::make_context() else {
        return Ok(());
    };

    let (vertices, indices) = quad();
    let mut model: Model<Vertex, InstanceData> = Model::new_static(
        context.device.clone(),
        &mut context.allocator,
        &context.transfer,
        &vertices,
        &indices,
        2,
    )?;

    let instances = [
        InstanceData { offset: glam::Vec3::ZERO },
        InstanceData { offset: glam::Vec3::ONE },
        InstanceData { offset: glam::Vec3::X },
    ];
    let err = model
        .update_instances(&context.transfer, &instances)
        .unwrap_err()
        .downcast::<Error>()?;
    assert!(matches!(err, Error::SizeMismatch { .. }));
    assert_eq!(model.instance_count(), 0);
    assert_eq!(model.draw_call(), None);
    Ok(())
}

#[test]
pub fn instance_updates_work_on_static_models() -> Result<()> {
    let Some(mut context) = framework::make_context() else {
        return Ok(());
    };

    let (vertices, indices) = quad();
    let mut model: Model<Vertex, InstanceData> = Model::new_static(
        context.device.clone(),
        &mut context.allocator,
        &context.transfer,
        &vertices,
        &indices,
        2,
    )?;

    model.update_instances(
        &context.transfer,
        &[InstanceData { offset: glam::Vec3::ZERO }],
    )?;
    assert_eq!(model.instance_count(), 1);

    // Clearing the instances also clears the draw.
    model.update_instances(&context.transfer, &[])?;
    assert_eq!(model.instance_count(), 0);
    assert_eq!(model.draw_call(), None);
    Ok(())
}
