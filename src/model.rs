use std::mem::offset_of;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use gltf::buffer;
use itertools::Either;

use crate::assets::AssetError;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Vertex {
    position: Vec3,
    normal: Vec3,
    albedo: [f32; 4],
}

#[derive(Clone)]
pub struct ModelPrimitive {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

pub struct Model {
    pub name: String,
    pub primitives: Vec<ModelPrimitive>,
}

pub type Buffers<'a> = &'a [buffer::Data];

impl Model {
    pub fn from_gltf(
        name: impl Into<String>,
        mesh: gltf::Mesh,
        buffers: Buffers,
    ) -> Result<Model, AssetError> {
        let mut model = Model {
            name: name.into(),
            primitives: Vec::new(),
        };

        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::warn!(
                    "Skipping {:?} primitive {} of {}",
                    primitive.mode(),
                    primitive.index(),
                    model.name
                );
                continue;
            }

            let reader = primitive
                .reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));

            let positions = reader
                .read_positions()
                .ok_or_else(|| AssetError::MissingAttribute {
                    mesh: model.name.clone(),
                    attribute: "POSITION",
                })?;

            // Flat albedo from the material; textures are not sampled.
            let albedo = primitive.material().pbr_metallic_roughness().base_color_factor();

            let normals = match reader.read_normals() {
                Some(normals) => Either::Left(normals.map(Vec3::from)),
                None => Either::Right(std::iter::repeat(Vec3::Y)),
            };

            let vertices = positions
                .zip(normals)
                .map(|(position, normal)| Vertex {
                    position: Vec3::from(position),
                    normal,
                    albedo,
                })
                .collect::<Vec<Vertex>>();

            let indices = match reader.read_indices() {
                Some(indices) => indices.into_u32().collect::<Vec<u32>>(),
                None => (0..vertices.len() as u32).collect(),
            };

            model.primitives.push(ModelPrimitive {
                vertices,
                indices,
            });
        }

        if model.primitives.is_empty() {
            return Err(AssetError::EmptyMesh(model.name));
        }

        Ok(model)
    }
}

pub const RENDER_MODEL_VBL: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
    array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
    step_mode: wgpu::VertexStepMode::Vertex,
    attributes: &[
        wgpu::VertexAttribute {
            offset: offset_of!(Vertex, position) as wgpu::BufferAddress,
            shader_location: 0,
            format: wgpu::VertexFormat::Float32x3,
        },
        wgpu::VertexAttribute {
            offset: offset_of!(Vertex, normal) as wgpu::BufferAddress,
            shader_location: 1,
            format: wgpu::VertexFormat::Float32x3,
        },
        wgpu::VertexAttribute {
            offset: offset_of!(Vertex, albedo) as wgpu::BufferAddress,
            shader_location: 2,
            format: wgpu::VertexFormat::Float32x4,
        },
    ],
};

/// Per-object data streamed to the instance vertex buffer every frame.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Instance {
    pub model: Mat4,
    pub normal: Mat4,
}

impl Instance {
    pub fn descriptor() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 8] = wgpu::vertex_attr_array![
            5 => Float32x4,
            6 => Float32x4,
            7 => Float32x4,
            8 => Float32x4,
            9 => Float32x4,
            10 => Float32x4,
            11 => Float32x4,
            12 => Float32x4
        ];

        wgpu::VertexBufferLayout {
            array_stride: size_of::<Instance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &ATTRIBUTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{fixtures::TRIANGLE_GLTF, GltfImport};

    #[test]
    fn reads_triangle_with_default_material() {
        let import = GltfImport::from_slice(TRIANGLE_GLTF.as_bytes()).unwrap();
        let mesh = import.document.meshes().next().unwrap();

        let model = Model::from_gltf("Walls", mesh, &import.buffers).unwrap();

        assert_eq!(model.primitives.len(), 1);
        let primitive = &model.primitives[0];
        assert_eq!(primitive.indices, [0, 1, 2]);
        assert_eq!(primitive.vertices.len(), 3);
        assert_eq!(primitive.vertices[1].position, Vec3::X);
        assert_eq!(primitive.vertices[1].normal, Vec3::Z);
        assert_eq!(primitive.vertices[1].albedo, [1.0; 4]);
    }

    #[test]
    fn instance_layout_covers_two_matrices() {
        let layout = Instance::descriptor();
        assert_eq!(layout.array_stride, 128);
        assert_eq!(layout.attributes.len(), 8);
    }
}
