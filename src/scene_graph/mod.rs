pub mod object3d;
pub mod scene;
pub mod scene_model;
pub mod transform;

pub use object3d::ObjectId;
pub use scene::Scene;
