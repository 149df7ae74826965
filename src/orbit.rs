use glam::{Vec2, Vec3};

use crate::camera::Camera;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragMode {
    Rotate,
    Pan,
}

/// Mouse-driven orbiting around the camera target: left-drag rotates,
/// right-drag pans, the wheel dollies.
pub struct OrbitControls {
    pub rotate_sensitivity: f32,
    /// World units per pixel at unit distance from the target.
    pub pan_sensitivity: f32,
    pub zoom_factor: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    drag: Option<DragMode>,
    last_cursor: Option<Vec2>,
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self {
            rotate_sensitivity: 0.005,
            pan_sensitivity: 0.001,
            zoom_factor: 0.95,
            min_distance: 1.0,
            max_distance: 500.0,
            drag: None,
            last_cursor: None,
        }
    }
}

const POLE_MARGIN: f32 = 1e-3;

impl OrbitControls {
    pub fn begin_drag(&mut self, mode: DragMode) {
        self.drag = Some(mode);
    }

    /// Ends the drag only if it was started with the same button.
    pub fn end_drag(&mut self, mode: DragMode) {
        if self.drag == Some(mode) {
            self.drag = None;
        }
    }

    pub fn cursor_moved(&mut self, position: Vec2, camera: &mut Camera) {
        if let (Some(mode), Some(last)) = (self.drag, self.last_cursor) {
            let delta = position - last;
            match mode {
                DragMode::Rotate => self.rotate(delta, camera),
                DragMode::Pan => self.pan(delta, camera),
            }
        }

        self.last_cursor = Some(position);
    }

    // Moves eye and target together in the view plane, so the scene follows
    // the cursor.
    fn pan(&self, delta: Vec2, camera: &mut Camera) {
        let offset = camera.target - camera.eye;
        let distance = offset.length();
        let forward = offset.normalize_or_zero();
        let right = forward.cross(camera.up).normalize_or_zero();
        if right == Vec3::ZERO {
            return;
        }
        let up = right.cross(forward);

        let scale = distance * self.pan_sensitivity;
        let shift = (-delta.x * right + delta.y * up) * scale;
        camera.eye += shift;
        camera.target += shift;
    }

    fn rotate(&self, delta: Vec2, camera: &mut Camera) {
        let offset = camera.eye - camera.target;
        let radius = offset.length();
        if radius == 0.0 {
            return;
        }

        // Azimuth around +Y, polar angle measured from +Y.
        let mut theta = offset.x.atan2(offset.z);
        let mut phi = (offset.y / radius).clamp(-1.0, 1.0).acos();

        theta -= delta.x * self.rotate_sensitivity;
        phi = (phi - delta.y * self.rotate_sensitivity)
            .clamp(POLE_MARGIN, std::f32::consts::PI - POLE_MARGIN);

        let offset = Vec3::new(
            radius * phi.sin() * theta.sin(),
            radius * phi.cos(),
            radius * phi.sin() * theta.cos(),
        );
        camera.eye = camera.target + offset;
    }

    /// Positive `lines` moves the camera toward the target.
    pub fn scroll(&self, lines: f32, camera: &mut Camera) {
        let offset = camera.eye - camera.target;
        let distance = offset.length();
        if distance == 0.0 {
            return;
        }

        let new_distance =
            (distance * self.zoom_factor.powf(lines)).clamp(self.min_distance, self.max_distance);
        camera.eye = camera.target + offset * (new_distance / distance);
    }
}
