use glam::{Mat4, Quat, Vec3};
use id_arena::Arena;
use std::collections::HashMap;

use crate::assets::AssetError;
use crate::model::{Buffers, Model};
use crate::scene_graph::object3d::{Object3D, ObjectId};
use crate::scene_graph::scene_model::{SceneModel, SceneModelId};
use crate::scene_graph::transform::Transform;

pub struct Scene {
    pub objects: Arena<Object3D>,
    pub models: Arena<SceneModel>,
    gltf_mesh_to_model: HashMap<usize, SceneModelId>,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            objects: Arena::new(),
            models: Arena::new(),
            gltf_mesh_to_model: HashMap::new(),
        }
    }

    pub fn add_object(&mut self, object: Object3D) -> ObjectId {
        self.objects.alloc(object)
    }

    pub fn get_object(&self, id: ObjectId) -> Option<&Object3D> {
        self.objects.get(id)
    }

    pub fn add_model(&mut self, model: SceneModel) -> SceneModelId {
        self.models.alloc(model)
    }

    /// Adds every node of a glTF scene and returns the root objects in
    /// document order.
    pub fn spawn_gltf_scene(
        &mut self,
        buffers: Buffers,
        scene: &gltf::Scene,
    ) -> Result<Vec<ObjectId>, AssetError> {
        // Mesh indices are per document.
        self.gltf_mesh_to_model.clear();

        scene
            .nodes()
            .map(|node| self.spawn_gltf_node(buffers, &node, None))
            .collect()
    }

    fn spawn_gltf_node(
        &mut self,
        buffers: Buffers,
        node: &gltf::Node,
        parent: Option<ObjectId>,
    ) -> Result<ObjectId, AssetError> {
        let node_name = node.name().unwrap_or("Unnamed").to_string();
        let mut object = Object3D::named(node_name.clone());
        let (translation, rotation, scale) = node.transform().decomposed();

        // Uniform scale only
        object.transform.set_transform(
            translation.into(),
            Quat::from_array(rotation),
            scale[0],
        );

        if let Some(mesh) = node.mesh() {
            let mesh_index = mesh.index();

            let model_id = match self.gltf_mesh_to_model.get(&mesh_index).copied() {
                Some(model_id) => model_id,
                None => {
                    let mesh_name = mesh
                        .name()
                        .map(String::from)
                        .unwrap_or_else(|| format!("{} (Mesh)", node_name));

                    let model = Model::from_gltf(mesh_name, mesh, buffers)?;
                    let model_id = self.add_model(SceneModel::new(model));
                    self.gltf_mesh_to_model.insert(mesh_index, model_id);

                    model_id
                }
            };

            object.model_id = Some(model_id);
        }

        let object_id = self.add_object(object);

        if let Some(parent_id) = parent {
            self.set_object_parent(object_id, Some(parent_id));
        }

        for child in node.children() {
            self.spawn_gltf_node(buffers, &child, Some(object_id))?;
        }

        Ok(object_id)
    }

    fn update_transforms(&self) {
        let root_objects = self
            .objects
            .iter()
            .filter(|(_, object)| object.parent_id.is_none())
            .map(|(id, _)| id);

        for root_id in root_objects {
            self.update_object_transform_recursive(root_id, Mat4::IDENTITY, false);
        }
    }

    fn update_object_transform_recursive(
        &self,
        object_id: ObjectId,
        parent_world_matrix: Mat4,
        parent_changed: bool,
    ) {
        let Some(object) = self.objects.get(object_id) else {
            return;
        };

        let changed = parent_changed || object.transform.is_world_dirty();
        if changed {
            let local_matrix = *object.transform.get_local_matrix();
            object
                .transform
                .set_world_matrix(parent_world_matrix * local_matrix);
        }

        let world_matrix = *object.transform.get_world_matrix();
        for &child_id in &object.child_ids {
            self.update_object_transform_recursive(child_id, world_matrix, changed);
        }
    }

    pub fn set_object_parent(&mut self, child_id: ObjectId, new_parent_id: Option<ObjectId>) {
        if let Some(old_parent_id) = self.objects.get(child_id).and_then(|c| c.parent_id) {
            if let Some(old_parent) = self.objects.get_mut(old_parent_id) {
                old_parent.child_ids.retain(|&id| id != child_id);
            }
        }

        if let Some(child) = self.objects.get_mut(child_id) {
            child.parent_id = new_parent_id;
            child.transform.invalidate_world();
        }

        if let Some(new_parent) = new_parent_id.and_then(|id| self.objects.get_mut(id)) {
            new_parent.child_ids.push(child_id);
        }
    }

    pub fn set_object_transform(
        &mut self,
        object_id: ObjectId,
        translation: Vec3,
        rotation: Quat,
        scale: f32,
    ) {
        if let Some(object) = self.objects.get_mut(object_id) {
            object.transform.set_transform(translation, rotation, scale);
        }
    }

    pub fn get_object_transform(&self, object_id: ObjectId) -> Option<&Transform> {
        self.get_object(object_id).map(|object| &object.transform)
    }

    /// Objects that reference a model, with the model they draw.
    pub fn drawable_objects(&self) -> impl Iterator<Item = (SceneModelId, &Object3D)> {
        self.objects
            .iter()
            .filter_map(|(_, object)| object.model_id.map(|model_id| (model_id, object)))
    }

    pub fn late_update(&mut self) {
        self.update_transforms();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{fixtures::TRIANGLE_GLTF, GltfImport};

    #[test]
    fn spawns_nodes_with_shared_mesh() {
        let import = GltfImport::from_slice(TRIANGLE_GLTF.as_bytes()).unwrap();
        let mut scene = Scene::new();
        let gltf_scene = import.document.scenes().next().unwrap();

        let roots = scene.spawn_gltf_scene(&import.buffers, &gltf_scene).unwrap();

        assert_eq!(roots.len(), 1);
        assert_eq!(scene.objects.len(), 2);
        assert_eq!(scene.models.len(), 1);

        let house = scene.get_object(roots[0]).unwrap();
        assert_eq!(house.name, "House");
        assert_eq!(house.child_ids.len(), 1);
        let chimney = scene.get_object(house.child_ids[0]).unwrap();
        assert_eq!(chimney.name, "Chimney");
        assert_eq!(chimney.parent_id, Some(roots[0]));
    }

    #[test]
    fn child_world_matrix_includes_parent() {
        let import = GltfImport::from_slice(TRIANGLE_GLTF.as_bytes()).unwrap();
        let mut scene = Scene::new();
        let gltf_scene = import.document.scenes().next().unwrap();
        let roots = scene.spawn_gltf_scene(&import.buffers, &gltf_scene).unwrap();

        scene.late_update();

        let chimney = scene.get_object(roots[0]).unwrap().child_ids[0];
        let world = *scene.get_object_transform(chimney).unwrap().get_world_matrix();
        assert_eq!(world.transform_point3(Vec3::ZERO), Vec3::new(1.0, 5.0, 0.0));
    }

    #[test]
    fn moving_parent_moves_children() {
        let mut scene = Scene::new();
        let parent = scene.add_object(Object3D::named("parent"));
        let child = scene.add_object(Object3D::named("child"));
        scene.set_object_parent(child, Some(parent));
        scene.late_update();

        scene.set_object_transform(parent, Vec3::X, Quat::IDENTITY, 1.0);
        scene.late_update();

        let world = *scene.get_object_transform(child).unwrap().get_world_matrix();
        assert_eq!(world.transform_point3(Vec3::ZERO), Vec3::X);
    }

    #[test]
    fn drawable_objects_skip_empty_nodes() {
        let import = GltfImport::from_slice(TRIANGLE_GLTF.as_bytes()).unwrap();
        let mut scene = Scene::new();
        scene.add_object(Object3D::named("empty"));
        let gltf_scene = import.document.scenes().next().unwrap();
        scene.spawn_gltf_scene(&import.buffers, &gltf_scene).unwrap();

        assert_eq!(scene.drawable_objects().count(), 2);
    }
}
