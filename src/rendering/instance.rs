use id_arena::Arena;
use wgpu::BufferUsages;

use crate::{model::Instance, rendering::render_model::RenderModel, scene_graph::Scene};

pub struct Instances {
    instances: Vec<Instance>,
}

impl Instances {
    pub fn new() -> Self {
        Self {
            instances: Vec::new(),
        }
    }

    pub fn add(&mut self, instance: Instance) {
        self.instances.push(instance);
    }

    pub fn clear(&mut self) {
        self.instances.clear();
    }

    /// Instances past the buffer capacity are dropped.
    pub fn write_to_buffer(&self, queue: &wgpu::Queue, instance_buffer: &InstanceBuffer) {
        queue.write_buffer(
            instance_buffer.buffer(),
            0,
            bytemuck::cast_slice(&self.instances[..self.len()]),
        );
    }

    pub fn should_render(&self) -> bool {
        !self.instances.is_empty()
    }

    pub fn len(&self) -> usize {
        self.instances.len().min(InstanceBuffer::MAX_INSTANCES as usize)
    }
}

pub struct InstanceBuffer(wgpu::Buffer);

impl InstanceBuffer {
    pub const MAX_INSTANCES: u64 = 128;

    pub fn new(device: &wgpu::Device, name: &str) -> Self {
        let label = format!("Instance buffer ({})", name);

        Self(device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&label),
            size: std::mem::size_of::<Instance>() as u64 * Self::MAX_INSTANCES,
            usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }))
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.0
    }

    pub fn bind(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_vertex_buffer(1, self.buffer().slice(..));
    }
}

/// Rebuilds each render model's instance list from the scene's world matrices.
pub fn gather_instances(scene: &Scene, render_models: &mut Arena<RenderModel>) {
    for (_, render_model) in render_models.iter_mut() {
        render_model.instances.clear();
    }

    for (model_id, object) in scene.drawable_objects() {
        let Some(render_model_id) = scene.models.get(model_id).and_then(|m| m.render_model) else {
            continue;
        };

        if let Some(render_model) = render_models.get_mut(render_model_id) {
            render_model.instances.add(Instance {
                model: *object.transform.get_world_matrix(),
                normal: *object.transform.get_normal_matrix(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Mat4;

    use super::*;

    #[test]
    fn len_is_capped_at_buffer_capacity() {
        let mut instances = Instances::new();
        assert!(!instances.should_render());

        for _ in 0..InstanceBuffer::MAX_INSTANCES + 10 {
            instances.add(Instance {
                model: Mat4::IDENTITY,
                normal: Mat4::IDENTITY,
            });
        }

        assert!(instances.should_render());
        assert_eq!(instances.len(), InstanceBuffer::MAX_INSTANCES as usize);

        instances.clear();
        assert_eq!(instances.len(), 0);
    }
}
