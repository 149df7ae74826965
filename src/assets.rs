use std::{
    path::{Path, PathBuf},
    sync::mpsc::{self, Receiver, TryRecvError},
    thread,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to import {path}: {source}")]
    Import {
        path: PathBuf,
        #[source]
        source: gltf::Error,
    },
    #[error("failed to parse glTF data: {0}")]
    Parse(#[from] gltf::Error),
    #[error("{0} contains no scenes")]
    NoScene(PathBuf),
    #[error("the first scene of {0} has no root nodes")]
    EmptyScene(PathBuf),
    #[error("mesh {mesh} has no {attribute} attribute")]
    MissingAttribute {
        mesh: String,
        attribute: &'static str,
    },
    #[error("mesh {0} has no triangle primitives")]
    EmptyMesh(String),
    #[error("failed to start the asset loader thread: {0}")]
    Worker(#[source] std::io::Error),
    #[error("the asset loader thread exited without a result")]
    WorkerGone,
}

/// A parsed glTF document together with its resolved buffers.
pub struct GltfImport {
    pub path: PathBuf,
    pub document: gltf::Document,
    pub buffers: Vec<gltf::buffer::Data>,
}

impl GltfImport {
    pub fn from_path(path: &Path) -> Result<Self, AssetError> {
        let (document, buffers, _images) =
            gltf::import(path).map_err(|source| AssetError::Import {
                path: path.to_owned(),
                source,
            })?;

        Ok(Self {
            path: path.to_owned(),
            document,
            buffers,
        })
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, AssetError> {
        let (document, buffers, _images) = gltf::import_slice(bytes)?;

        Ok(Self {
            path: PathBuf::from("<memory>"),
            document,
            buffers,
        })
    }

    pub fn first_scene(&self) -> Result<gltf::Scene<'_>, AssetError> {
        self.document
            .default_scene()
            .or_else(|| self.document.scenes().next())
            .ok_or_else(|| AssetError::NoScene(self.path.clone()))
    }
}

/// Progress of the single model this viewer animates.
#[derive(Debug)]
pub enum ModelSlot<T> {
    Loading,
    Loaded(T),
    Failed(String),
}

impl<T> ModelSlot<T> {
    pub fn loaded(&self) -> Option<&T> {
        match self {
            ModelSlot::Loaded(value) => Some(value),
            _ => None,
        }
    }

    pub fn status(&self) -> &str {
        match self {
            ModelSlot::Loading => "loading",
            ModelSlot::Loaded(_) => "loaded",
            ModelSlot::Failed(_) => "failed",
        }
    }
}

// Imports a glTF file on a worker thread. The result is handed back exactly
// once and picked up by polling from the event loop.
pub struct AssetLoader {
    path: PathBuf,
    receiver: Receiver<Result<GltfImport, AssetError>>,
}

impl AssetLoader {
    pub fn spawn(path: impl Into<PathBuf>) -> Result<Self, AssetError> {
        let path = path.into();
        let (sender, receiver) = mpsc::channel();
        let worker_path = path.clone();

        thread::Builder::new()
            .name("asset-loader".into())
            .spawn(move || {
                log::info!("Loading model {}", worker_path.display());
                let result = GltfImport::from_path(&worker_path);
                // The receiver is gone if the viewer shut down first.
                let _ = sender.send(result);
            })
            .map_err(AssetError::Worker)?;

        Ok(Self { path, receiver })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn poll(&self) -> Option<Result<GltfImport, AssetError>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(AssetError::WorkerGone)),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// One triangle mesh referenced by a root node and by its child.
    pub(crate) const TRIANGLE_GLTF: &str = r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [
            { "name": "House", "mesh": 0, "children": [1], "translation": [0.0, 5.0, 0.0] },
            { "name": "Chimney", "mesh": 0, "translation": [1.0, 0.0, 0.0] }
        ],
        "meshes": [{
            "name": "Walls",
            "primitives": [{
                "attributes": { "POSITION": 0, "NORMAL": 1 },
                "indices": 2
            }]
        }],
        "buffers": [{
            "byteLength": 80,
            "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAAAAAAAAAAAAAAAIA/AAAAAAAAAAAAAIA/AAAAAAAAAAAAAIA/AAABAAIAAAA="
        }],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
            { "buffer": 0, "byteOffset": 36, "byteLength": 36 },
            { "buffer": 0, "byteOffset": 72, "byteLength": 6 }
        ],
        "accessors": [
            { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
              "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] },
            { "bufferView": 1, "componentType": 5126, "count": 3, "type": "VEC3" },
            { "bufferView": 2, "componentType": 5123, "count": 3, "type": "SCALAR" }
        ]
    }"#;

    pub(crate) const NO_SCENE_GLTF: &str = r#"{ "asset": { "version": "2.0" } }"#;
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use fixtures::{NO_SCENE_GLTF, TRIANGLE_GLTF};

    fn wait_for(loader: &AssetLoader) -> Result<GltfImport, AssetError> {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            if let Some(result) = loader.poll() {
                return result;
            }
            assert!(Instant::now() < deadline, "asset loader timed out");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn imports_embedded_gltf() {
        let import = GltfImport::from_slice(TRIANGLE_GLTF.as_bytes()).unwrap();
        let scene = import.first_scene().unwrap();
        assert_eq!(scene.nodes().count(), 1);
        assert_eq!(import.buffers.len(), 1);
    }

    #[test]
    fn document_without_scene_is_an_error() {
        let import = GltfImport::from_slice(NO_SCENE_GLTF.as_bytes()).unwrap();
        assert!(matches!(import.first_scene(), Err(AssetError::NoScene(_))));
    }

    #[test]
    fn malformed_bytes_are_a_parse_error() {
        let result = GltfImport::from_slice(b"definitely not gltf");
        assert!(matches!(result, Err(AssetError::Parse(_))));
    }

    #[test]
    fn missing_file_fails_on_the_worker() {
        let loader = AssetLoader::spawn("does/not/exist.glb").unwrap();
        assert_eq!(loader.path(), Path::new("does/not/exist.glb"));

        let result = wait_for(&loader);
        assert!(matches!(result, Err(AssetError::Import { .. })));
    }

    #[test]
    fn slot_reports_status() {
        let slot: ModelSlot<u32> = ModelSlot::Loading;
        assert_eq!(slot.status(), "loading");
        assert!(slot.loaded().is_none());

        let slot = ModelSlot::Loaded(7);
        assert_eq!(slot.loaded(), Some(&7));

        let slot: ModelSlot<u32> = ModelSlot::Failed("boom".into());
        assert_eq!(slot.status(), "failed");
    }
}
