use std::ops::Range;

use id_arena::Id;
use wgpu::util::DeviceExt;

use crate::{
    model::{Model, Vertex},
    rendering::instance::{InstanceBuffer, Instances},
};

pub type RenderModelId = Id<RenderModel>;

/// Where one glTF primitive lives inside the model's shared buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimitiveRange {
    pub indices: Range<u32>,
    pub base_vertex: i32,
}

/// Concatenates every primitive of a model so the whole mesh needs a single
/// vertex and index buffer binding.
pub fn pack_primitives(model: &Model) -> (Vec<Vertex>, Vec<u32>, Vec<PrimitiveRange>) {
    let mut vertices = Vec::new();
    let mut indices = Vec::new();
    let mut ranges = Vec::with_capacity(model.primitives.len());

    for primitive in &model.primitives {
        let first_index = indices.len() as u32;
        let base_vertex = vertices.len() as i32;

        vertices.extend_from_slice(&primitive.vertices);
        indices.extend_from_slice(&primitive.indices);

        ranges.push(PrimitiveRange {
            indices: first_index..indices.len() as u32,
            base_vertex,
        });
    }

    (vertices, indices, ranges)
}

pub struct RenderModel {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    ranges: Vec<PrimitiveRange>,
    pub instances: Instances,
    instance_buffer: InstanceBuffer,
}

impl RenderModel {
    pub fn from_model(device: &wgpu::Device, model: &Model) -> Self {
        let (vertices, indices, ranges) = pack_primitives(model);

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("Vertices ({})", model.name)),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("Indices ({})", model.name)),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        RenderModel {
            vertex_buffer,
            index_buffer,
            ranges,
            instances: Instances::new(),
            instance_buffer: InstanceBuffer::new(device, &model.name),
        }
    }
}

pub fn render_model_instances(
    render_pass: &mut wgpu::RenderPass,
    queue: &wgpu::Queue,
    render_model: &RenderModel,
) {
    render_model
        .instances
        .write_to_buffer(queue, &render_model.instance_buffer);

    render_pass.set_vertex_buffer(0, render_model.vertex_buffer.slice(..));
    render_model.instance_buffer.bind(render_pass);
    render_pass.set_index_buffer(render_model.index_buffer.slice(..), wgpu::IndexFormat::Uint32);

    let instance_count = render_model.instances.len() as u32;
    for range in &render_model.ranges {
        render_pass.draw_indexed(range.indices.clone(), range.base_vertex, 0..instance_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{fixtures::TRIANGLE_GLTF, GltfImport};

    #[test]
    fn primitives_are_packed_back_to_back() {
        let import = GltfImport::from_slice(TRIANGLE_GLTF.as_bytes()).unwrap();
        let mesh = import.document.meshes().next().unwrap();
        let mut model = Model::from_gltf("Walls", mesh, &import.buffers).unwrap();

        // Same triangle twice, as if the mesh had two materials.
        let second = model.primitives[0].clone();
        model.primitives.push(second);

        let (vertices, indices, ranges) = pack_primitives(&model);

        assert_eq!(vertices.len(), 6);
        assert_eq!(indices, [0, 1, 2, 0, 1, 2]);
        assert_eq!(
            ranges,
            [
                PrimitiveRange { indices: 0..3, base_vertex: 0 },
                PrimitiveRange { indices: 3..6, base_vertex: 3 },
            ]
        );
    }
}
