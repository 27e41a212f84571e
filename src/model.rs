//! Instanced, indexed models.
//!
//! A [`Model`] owns a device-local vertex and index buffer plus an instance buffer
//! with its staging counterpart. "Mutable" and "static" are a capability flag on
//! this one type, not separate types: a mutable model additionally keeps staging
//! buffers for its geometry so [`Model::update`] can rewrite vertices and indices
//! in place, up to the capacity given at creation.
//!
//! Drawing binds the vertex buffer at input binding 0 and, when at least one
//! instance is live, the instance buffer at binding 1, then issues a single
//! indexed-instanced draw. A model with zero live instances draws nothing.

use std::marker::PhantomData;

use anyhow::Result;
use ash::vk;

use crate::{
    Allocator, Buffer, DefaultAllocator, Device, Error, MemoryType, TransferContext,
};
use crate::upload::staged_buffer_upload_sized;

/// The parameters of one indexed-instanced draw.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DrawCall {
    /// Number of indices to draw.
    pub index_count: u32,
    /// Number of instances to draw. Always at least 1.
    pub instance_count: u32,
}

/// The draw a model with the given counts issues: `None` when no instances are
/// live, one indexed-instanced call otherwise.
pub fn draw_call(index_count: u32, instance_count: u32) -> Option<DrawCall> {
    if instance_count < 1 {
        return None;
    }
    Some(DrawCall {
        index_count,
        instance_count,
    })
}

// Staging buffers retained by mutable models for geometry rewrites.
#[derive(Derivative)]
#[derivative(Debug)]
struct GeometryStaging<A: Allocator> {
    vertices: Buffer<A>,
    indices: Buffer<A>,
}

/// A drawable model: vertex/index geometry plus per-instance data of type `T`.
///
/// All buffers are exclusively owned by the model. Dropping it releases them; the
/// caller must guarantee no in-flight draw still references them, usually with a
/// fence wait or [`Device::wait_idle`].
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Model<V: Copy, T: Copy, A: Allocator = DefaultAllocator> {
    #[derivative(Debug = "ignore")]
    device: Device,
    vertex_buffer: Buffer<A>,
    index_buffer: Buffer<A>,
    instance_buffer: Buffer<A>,
    instance_staging: Buffer<A>,
    /// Present only on mutable models.
    geometry_staging: Option<GeometryStaging<A>>,
    index_count: u32,
    instance_count: u32,
    max_instances: usize,
    #[derivative(Debug = "ignore")]
    _marker: PhantomData<(V, T)>,
}

impl<V: Copy, T: Copy, A: Allocator> Model<V, T, A> {
    /// Create a model whose geometry is uploaded once and immutable thereafter.
    /// Instance buffers are sized for `max_instances`, with zero live instances
    /// until [`Model::update_instances`] is called.
    pub fn new_static(
        device: Device,
        allocator: &mut A,
        transfer: &TransferContext,
        vertices: &[V],
        indices: &[u16],
        max_instances: usize,
    ) -> Result<Self> {
        Self::create(
            device, allocator, transfer, vertices, indices, None, max_instances,
        )
    }

    /// Create a model whose geometry can be rewritten later, up to `max_vertices`
    /// and `max_indices`. The staging buffers for geometry are retained so
    /// [`Model::update`] never reallocates.
    pub fn new_mutable(
        device: Device,
        allocator: &mut A,
        transfer: &TransferContext,
        vertices: &[V],
        indices: &[u16],
        max_vertices: usize,
        max_indices: usize,
        max_instances: usize,
    ) -> Result<Self> {
        Self::create(
            device,
            allocator,
            transfer,
            vertices,
            indices,
            Some((max_vertices, max_indices)),
            max_instances,
        )
    }

    fn create(
        device: Device,
        allocator: &mut A,
        transfer: &TransferContext,
        vertices: &[V],
        indices: &[u16],
        geometry_capacity: Option<(usize, usize)>,
        max_instances: usize,
    ) -> Result<Self> {
        let (max_vertices, max_indices) =
            geometry_capacity.unwrap_or((vertices.len(), indices.len()));

        let vertex_buffer = staged_buffer_upload_sized(
            device.clone(),
            allocator,
            transfer,
            vertices,
            max_vertices,
            vk::BufferUsageFlags::VERTEX_BUFFER,
        )?;
        let index_buffer = staged_buffer_upload_sized(
            device.clone(),
            allocator,
            transfer,
            indices,
            max_indices,
            vk::BufferUsageFlags::INDEX_BUFFER,
        )?;

        let instance_byte_size =
            (max_instances.max(1) * std::mem::size_of::<T>()) as vk::DeviceSize;
        let instance_staging = Buffer::new(
            device.clone(),
            allocator,
            instance_byte_size,
            vk::BufferUsageFlags::TRANSFER_SRC,
            MemoryType::CpuToGpu,
        )?;
        let instance_buffer = Buffer::new_device_local(
            device.clone(),
            allocator,
            instance_byte_size,
            vk::BufferUsageFlags::VERTEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST,
        )?;

        let geometry_staging = geometry_capacity
            .map(|(max_vertices, max_indices)| -> Result<GeometryStaging<A>> {
                Ok(GeometryStaging {
                    vertices: Buffer::new(
                        device.clone(),
                        allocator,
                        (max_vertices.max(1) * std::mem::size_of::<V>()) as vk::DeviceSize,
                        vk::BufferUsageFlags::TRANSFER_SRC,
                        MemoryType::CpuToGpu,
                    )?,
                    indices: Buffer::new(
                        device.clone(),
                        allocator,
                        (max_indices.max(1) * std::mem::size_of::<u16>()) as vk::DeviceSize,
                        vk::BufferUsageFlags::TRANSFER_SRC,
                        MemoryType::CpuToGpu,
                    )?,
                })
            })
            .transpose()?;

        Ok(Model {
            device,
            vertex_buffer,
            index_buffer,
            instance_buffer,
            instance_staging,
            geometry_staging,
            index_count: indices.len() as u32,
            instance_count: 0,
            max_instances,
            _marker: PhantomData,
        })
    }

    /// Rewrite the model's geometry. A no-op on models created with
    /// [`Model::new_static`].
    ///
    /// The caller must ensure no in-flight draw still reads the old contents,
    /// with a fence wait or [`Device::wait_idle`], before calling this.
    /// # Errors
    /// Fails with [`Error::SizeMismatch`](crate::Error) when the new geometry
    /// exceeds the capacity given at creation.
    pub fn update(
        &mut self,
        transfer: &TransferContext,
        vertices: &[V],
        indices: &[u16],
    ) -> Result<()> {
        let Some(staging) = self.geometry_staging.as_mut() else {
            return Ok(());
        };

        staging.vertices.write(vertices)?;
        staging.indices.write(indices)?;

        let vertex_bytes = std::mem::size_of_val(vertices) as vk::DeviceSize;
        let index_bytes = std::mem::size_of_val(indices) as vk::DeviceSize;
        transfer
            .begin_one_shot()?
            .copy_buffer(
                &staging.vertices.view(0u64, vertex_bytes)?,
                &self.vertex_buffer.view(0u64, vertex_bytes)?,
            )?
            .copy_buffer(
                &staging.indices.view(0u64, index_bytes)?,
                &self.index_buffer.view(0u64, index_bytes)?,
            )?
            .submit()?;

        self.index_count = indices.len() as u32;
        Ok(())
    }

    /// Replace the live instance data. Permitted on every model, regardless of the
    /// mutability of its geometry.
    /// # Errors
    /// Fails with [`Error::SizeMismatch`](crate::Error) when more than
    /// `max_instances` records are passed; the live count is unchanged in that case.
    pub fn update_instances(&mut self, transfer: &TransferContext, instances: &[T]) -> Result<()> {
        if instances.len() > self.max_instances {
            return Err(Error::SizeMismatch {
                requested: std::mem::size_of_val(instances) as u64,
                capacity: (self.max_instances * std::mem::size_of::<T>()) as u64,
            }
            .into());
        }

        self.instance_staging.write(instances)?;
        let byte_size = std::mem::size_of_val(instances) as vk::DeviceSize;
        transfer
            .begin_one_shot()?
            .copy_buffer(
                &self.instance_staging.view(0u64, byte_size)?,
                &self.instance_buffer.view(0u64, byte_size)?,
            )?
            .submit()?;

        self.instance_count = instances.len() as u32;
        Ok(())
    }

    /// The draw this model would issue: `None` when no instances are live, one
    /// indexed-instanced call otherwise.
    pub fn draw_call(&self) -> Option<DrawCall> {
        draw_call(self.index_count, self.instance_count)
    }

    /// Record this model's draw: vertex buffer at binding 0, instance buffer at
    /// binding 1, u16 indices, one `vkCmdDrawIndexed`. Records nothing when the
    /// live instance count is zero.
    pub fn draw(&self, cmd: vk::CommandBuffer) {
        let Some(call) = self.draw_call() else {
            return;
        };

        unsafe {
            let offsets = [0 as vk::DeviceSize];
            self.device
                .cmd_bind_vertex_buffers(cmd, 0, &[self.vertex_buffer.handle()], &offsets);
            self.device
                .cmd_bind_vertex_buffers(cmd, 1, &[self.instance_buffer.handle()], &offsets);
            self.device.cmd_bind_index_buffer(
                cmd,
                self.index_buffer.handle(),
                0,
                vk::IndexType::UINT16,
            );
            self.device
                .cmd_draw_indexed(cmd, call.index_count, call.instance_count, 0, 0, 0);
        }
    }

    /// True if [`Model::update`] can rewrite this model's geometry.
    pub fn is_mutable(&self) -> bool {
        self.geometry_staging.is_some()
    }

    /// Number of indices drawn per instance.
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Number of live instances.
    pub fn instance_count(&self) -> u32 {
        self.instance_count
    }

    /// Maximum number of instances this model can hold.
    pub fn max_instances(&self) -> usize {
        self.max_instances
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_instances_draw_nothing() {
        assert_eq!(draw_call(6, 0), None);
    }

    #[test]
    fn quad_with_three_instances_is_one_call() {
        // 4 vertices / 6 indices / 3 instances: exactly one indexed-instanced
        // draw with indexCount 6 and instanceCount 3.
        let call = draw_call(6, 3).unwrap();
        assert_eq!(call.index_count, 6);
        assert_eq!(call.instance_count, 3);
    }
}
