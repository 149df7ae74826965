use std::path::Path;

use crate::{
    animation::{FrameClock, HousePlacement, Pose},
    assets::{AssetError, AssetLoader, GltfImport, ModelSlot},
    camera::Camera,
    config::ViewerConfig,
    lights::Lights,
    orbit::OrbitControls,
    scene_graph::{ObjectId, Scene},
};

pub struct DemoState {
    pub camera: Camera,
    pub orbit: OrbitControls,
    pub lights: Lights,
    pub scene: Scene,
    pub clock: FrameClock,
    pub house: ModelSlot<ObjectId>,
    pub placement: HousePlacement,
    loader: Option<AssetLoader>,
}

impl DemoState {
    pub fn new(config: &ViewerConfig) -> Self {
        let (width, height) = config.window_size;
        let camera = Camera::new(
            config.camera.eye,
            config.camera.target,
            config.camera.fov_y_degrees,
            width as f32 / height as f32,
            config.camera.near,
            config.camera.far,
        );

        Self {
            camera,
            orbit: OrbitControls::default(),
            lights: Lights::default(),
            scene: Scene::new(),
            clock: FrameClock::new(config.step_increment),
            house: ModelSlot::Loading,
            placement: config.placement,
            loader: None,
        }
    }

    /// Starts importing the house model in the background.
    pub fn start_loading(&mut self, path: &Path) {
        match AssetLoader::spawn(path) {
            Ok(loader) => self.loader = Some(loader),
            Err(error) => self.finish_loading(Err(error)),
        }
    }

    /// Runs one animation step: pick up a finished model, advance the clock,
    /// pose the house if present, and propagate transforms.
    pub fn update(&mut self) {
        self.poll_assets();

        let step = self.clock.tick();

        if let Some(&house) = self.house.loaded() {
            Pose::at(step).apply(&mut self.scene, house, &self.placement);
        }

        self.scene.late_update();
    }

    fn poll_assets(&mut self) {
        let Some(loader) = self.loader.as_ref() else {
            return;
        };
        let Some(result) = loader.poll() else {
            return;
        };

        log::debug!("Asset loader finished {}", loader.path().display());

        self.loader = None;
        self.finish_loading(result);
    }

    /// Moves the model slot out of `Loading`. Later results are ignored.
    pub fn finish_loading(&mut self, result: Result<GltfImport, AssetError>) {
        if !matches!(self.house, ModelSlot::Loading) {
            log::warn!("Ignoring model result, slot is already {}", self.house.status());
            return;
        }

        let outcome = result.and_then(|import| self.add_house(&import));
        self.house = match outcome {
            Ok(house) => ModelSlot::Loaded(house),
            Err(error) => {
                log::error!("Model failed to load: {error}");
                ModelSlot::Failed(error.to_string())
            }
        };
    }

    fn add_house(&mut self, import: &GltfImport) -> Result<ObjectId, AssetError> {
        let gltf_scene = import.first_scene()?;
        let roots = self.scene.spawn_gltf_scene(&import.buffers, &gltf_scene)?;
        let house = *roots
            .first()
            .ok_or_else(|| AssetError::EmptyScene(import.path.clone()))?;

        let placement = self.placement;
        self.scene.set_object_transform(
            house,
            placement.position,
            Pose::at(0.0).rotation(&placement),
            placement.scale,
        );

        let root_name = self
            .scene
            .get_object(house)
            .map_or("<unnamed>", |object| object.name.as_str());

        log::info!(
            "Loaded {} (root {root_name}) with {} objects and {} meshes",
            import.path.display(),
            self.scene.objects.len(),
            self.scene.models.len()
        );

        Ok(house)
    }
}
