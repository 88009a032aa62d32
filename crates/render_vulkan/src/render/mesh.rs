//! Static meshes and the component that draws them

use std::any::Any;
use std::rc::Rc;

use ash::vk;
use bytemuck::{Pod, Zeroable};

use crate::ecs::{Component, Transform};
use crate::render::shader::Shader;
use crate::render::vertex::Vertex;
use crate::render::vulkan::{Buffer, DescriptorManager, UniformBuffer, VulkanContext, VulkanError, VulkanResult};
use crate::render::DrawContext;

/// Indexed triangle list in CPU memory
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    /// Mesh name, used in logs
    pub name: String,
    /// Vertex data
    pub vertices: Vec<Vertex>,
    /// Triangle indices into `vertices`
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Create a mesh
    pub fn new(name: impl Into<String>, vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self {
            name: name.into(),
            vertices,
            indices,
        }
    }

    /// Unit quad in the XY plane facing +Z, one colour per corner
    pub fn quad(name: impl Into<String>) -> Self {
        let normal = [0.0, 0.0, 1.0];
        Self::new(
            name,
            vec![
                Vertex::new([-0.5, -0.5, 0.0], [1.0, 0.0, 0.0], normal, [0.0, 0.0]),
                Vertex::new([0.5, -0.5, 0.0], [0.0, 1.0, 0.0], normal, [1.0, 0.0]),
                Vertex::new([0.5, 0.5, 0.0], [0.0, 0.0, 1.0], normal, [1.0, 1.0]),
                Vertex::new([-0.5, 0.5, 0.0], [1.0, 1.0, 0.0], normal, [0.0, 1.0]),
            ],
            vec![0, 1, 2, 2, 3, 0],
        )
    }

    /// Number of indices
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    /// Check the mesh can be uploaded and drawn
    pub fn validate(&self) -> Result<(), String> {
        if self.vertices.is_empty() || self.indices.is_empty() {
            return Err(format!("Mesh '{}' has no geometry", self.name));
        }
        if self.indices.len() % 3 != 0 {
            return Err(format!(
                "Mesh '{}' has {} indices, not a whole number of triangles",
                self.name,
                self.indices.len()
            ));
        }
        if let Some(&index) = self.indices.iter().find(|&&i| i as usize >= self.vertices.len()) {
            return Err(format!(
                "Mesh '{}' index {index} is out of range for {} vertices",
                self.name,
                self.vertices.len()
            ));
        }
        Ok(())
    }
}

/// Per-object uniform block at binding 0
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DefaultMatrixBuffer {
    /// Column-major object-to-world matrix
    pub world_matrix: [[f32; 4]; 4],
}

// SAFETY: repr(C), only f32, no padding
unsafe impl Pod for DefaultMatrixBuffer {}
unsafe impl Zeroable for DefaultMatrixBuffer {}

/// Draws a [`Mesh`] with a [`Shader`]
///
/// Geometry lives in device-local buffers. The world matrix is written each
/// frame into a uniform buffer owned by the current frame slot, so a slot
/// never overwrites data the GPU may still be reading for another.
pub struct MeshRenderer {
    descriptors: DescriptorManager,
    first_set: usize,
    uniform_buffers: Vec<UniformBuffer<DefaultMatrixBuffer>>,
    index_buffer: Buffer,
    vertex_buffer: Buffer,
    mesh: Mesh,
    shader: Rc<Shader>,
}

impl MeshRenderer {
    /// Upload `mesh` and allocate one uniform buffer and descriptor set per frame slot
    pub fn new(context: &VulkanContext, shader: Rc<Shader>, mesh: Mesh, frames_in_flight: usize) -> VulkanResult<Self> {
        mesh.validate()
            .map_err(|reason| VulkanError::InvalidOperation { reason })?;

        let vertex_buffer = Buffer::device_local_with_data(
            context,
            vk::BufferUsageFlags::VERTEX_BUFFER,
            bytemuck::cast_slice(&mesh.vertices),
        )?;
        let index_buffer = Buffer::device_local_with_data(
            context,
            vk::BufferUsageFlags::INDEX_BUFFER,
            bytemuck::cast_slice(&mesh.indices),
        )?;

        let uniform_buffers = (0..frames_in_flight)
            .map(|_| UniformBuffer::new(context))
            .collect::<VulkanResult<Vec<_>>>()?;

        let mut descriptors = DescriptorManager::for_uniform_buffers(context.device(), frames_in_flight as u32)?;
        let first_set = descriptors.allocate(shader.descriptor_set_layout(), frames_in_flight)?;
        let buffer_ranges: Vec<(vk::Buffer, vk::DeviceSize)> =
            uniform_buffers.iter().map(|ubo| (ubo.handle(), ubo.size())).collect();
        descriptors.write_uniform_buffers(first_set, 0, &buffer_ranges)?;

        log::debug!(
            "Mesh '{}' uploaded: {} vertices, {} indices",
            mesh.name,
            mesh.vertices.len(),
            mesh.indices.len()
        );

        Ok(Self {
            descriptors,
            first_set,
            uniform_buffers,
            index_buffer,
            vertex_buffer,
            mesh,
            shader,
        })
    }

    /// The mesh being drawn
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// The shader drawing it
    pub fn shader(&self) -> &Rc<Shader> {
        &self.shader
    }
}

impl Component for MeshRenderer {
    fn render(&mut self, ctx: &DrawContext, transform: &mut Transform) -> VulkanResult<()> {
        let (Some(uniform_buffer), Some(descriptor_set)) = (
            self.uniform_buffers.get(ctx.frame_slot),
            self.descriptors.set(self.first_set + ctx.frame_slot),
        ) else {
            return Err(VulkanError::InvalidOperation {
                reason: format!(
                    "Mesh '{}' has no resources for frame slot {}",
                    self.mesh.name, ctx.frame_slot
                ),
            });
        };

        uniform_buffer.update(&DefaultMatrixBuffer {
            world_matrix: transform.world_matrix().into(),
        })?;

        let device = ctx.device;
        let command_buffer = ctx.command_buffer;
        unsafe {
            device.cmd_bind_pipeline(command_buffer, vk::PipelineBindPoint::GRAPHICS, self.shader.pipeline());
            device.cmd_set_viewport(command_buffer, 0, &[ctx.viewport()]);
            device.cmd_set_scissor(command_buffer, 0, &[ctx.scissor()]);
            device.cmd_bind_vertex_buffers(command_buffer, 0, &[self.vertex_buffer.handle()], &[0]);
            device.cmd_bind_index_buffer(command_buffer, self.index_buffer.handle(), 0, vk::IndexType::UINT32);
            device.cmd_bind_descriptor_sets(
                command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                self.shader.pipeline_layout(),
                0,
                &[descriptor_set],
                &[],
            );
            device.cmd_draw_indexed(command_buffer, self.mesh.index_count(), 1, 0, 0, 0);
        }

        Ok(())
    }

    fn cleanup(&mut self) {
        log::debug!("Releasing mesh '{}'", self.mesh.name);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_quad_geometry() {
        let quad = Mesh::quad("quad");

        assert_eq!(quad.vertices.len(), 4);
        assert_eq!(quad.indices, vec![0, 1, 2, 2, 3, 0]);
        assert_eq!(quad.index_count(), 6);
        assert_eq!(quad.vertices[0].color, [1.0, 0.0, 0.0]);
        assert_eq!(quad.vertices[3].color, [1.0, 1.0, 0.0]);
        assert!(quad.vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
        assert!(quad.validate().is_ok());
    }

    #[test]
    fn test_quad_winding_is_clockwise_in_framebuffer_space() {
        // Vulkan's framebuffer y points down, so a positive cross product in
        // raw clip coordinates is clockwise on screen
        let quad = Mesh::quad("quad");
        for triangle in quad.indices.chunks(3) {
            let [a, b, c] = [0, 1, 2].map(|i| quad.vertices[triangle[i] as usize].position);
            let cross = (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0]);
            assert!(cross > 0.0);
        }
    }

    #[test]
    fn test_validate_rejects_bad_meshes() {
        let vertex = Vertex::default();

        assert!(Mesh::new("empty", Vec::new(), Vec::new()).validate().is_err());
        assert!(Mesh::new("partial", vec![vertex; 3], vec![0, 1]).validate().is_err());
        assert!(Mesh::new("range", vec![vertex; 3], vec![0, 1, 3]).validate().is_err());
        assert!(Mesh::new("ok", vec![vertex; 3], vec![0, 1, 2]).validate().is_ok());
    }

    #[test]
    fn test_matrix_buffer_layout() {
        assert_eq!(std::mem::size_of::<DefaultMatrixBuffer>(), 64);

        let mut transform = Transform::default();
        transform.set_position(crate::foundation::math::Vec3::new(1.0, 2.0, 3.0));
        let buffer = DefaultMatrixBuffer {
            world_matrix: transform.world_matrix().into(),
        };

        // Column-major: translation is the fourth column
        assert_relative_eq!(buffer.world_matrix[3][0], 1.0);
        assert_relative_eq!(buffer.world_matrix[3][1], 2.0);
        assert_relative_eq!(buffer.world_matrix[3][2], 3.0);
        assert_relative_eq!(buffer.world_matrix[3][3], 1.0);
    }
}
