use glam::{EulerRot, Quat, Vec3};

use crate::scene_graph::{ObjectId, Scene};

/// Monotonic phase counter, advanced once per rendered frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameClock {
    step: f64,
    increment: f64,
}

impl FrameClock {
    pub const DEFAULT_INCREMENT: f64 = 0.02;

    pub fn new(increment: f64) -> Self {
        Self {
            step: 0.0,
            increment,
        }
    }

    pub fn tick(&mut self) -> f64 {
        self.step += self.increment;
        self.step
    }

    pub fn step(&self) -> f64 {
        self.step
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INCREMENT)
    }
}

/// Where the house sits before the per-frame bobbing is layered on top.
#[derive(Debug, Clone, Copy)]
pub struct HousePlacement {
    pub position: Vec3,
    pub tilt_x: f32,
    pub scale: f32,
}

impl Default for HousePlacement {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, -1.3, 0.0),
            tilt_x: -std::f32::consts::FRAC_PI_3,
            scale: 0.4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub offset: f64,
    pub angle: f64,
}

impl Pose {
    pub fn at(step: f64) -> Self {
        let offset = 2.0 * step.sin().abs();
        let angle = step.sin() * ((step / 3.0).cos().abs() / 4.0);

        Self { offset, angle }
    }

    pub fn translation(&self, placement: &HousePlacement) -> Vec3 {
        Vec3::new(placement.position.x, self.offset as f32, placement.position.z)
    }

    // Tilt is applied first, matching an XYZ euler order.
    pub fn rotation(&self, placement: &HousePlacement) -> Quat {
        Quat::from_euler(EulerRot::XYZ, placement.tilt_x, self.angle as f32, 0.0)
    }

    pub fn apply(&self, scene: &mut Scene, object: ObjectId, placement: &HousePlacement) {
        scene.set_object_transform(
            object,
            self.translation(placement),
            self.rotation(placement),
            placement.scale,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene_graph::object3d::Object3D;

    #[test]
    fn clock_advances_by_fixed_increment() {
        let mut clock = FrameClock::default();
        let mut previous = clock.step();

        for _ in 0..1000 {
            let step = clock.tick();
            assert!(step > previous);
            previous = step;
        }

        assert!((clock.step() - 0.02 * 1000.0).abs() < 1e-9);
    }

    #[test]
    fn pose_stays_in_range() {
        let mut step = -50.0;
        while step < 50.0 {
            let pose = Pose::at(step);
            assert!((0.0..=2.0).contains(&pose.offset), "offset {}", pose.offset);
            assert!((-0.25..=0.25).contains(&pose.angle), "angle {}", pose.angle);
            step += 0.013;
        }
    }

    #[test]
    fn pose_at_zero_is_rest() {
        let pose = Pose::at(0.0);
        assert_eq!(pose.offset, 0.0);
        assert_eq!(pose.angle, 0.0);
    }

    #[test]
    fn pose_at_quarter_turn() {
        let pose = Pose::at(std::f64::consts::FRAC_PI_2);
        assert!((pose.offset - 2.0).abs() < 1e-9);
        assert!((pose.angle - 0.2165).abs() < 1e-4);
    }

    #[test]
    fn pose_offset_has_period_pi() {
        let a = Pose::at(0.7);
        let b = Pose::at(0.7 + std::f64::consts::PI);
        assert!((a.offset - b.offset).abs() < 1e-9);
    }

    #[test]
    fn applying_pose_twice_is_stable() {
        let mut scene = Scene::new();
        let house = scene.add_object(Object3D::default());
        let placement = HousePlacement::default();
        let pose = Pose::at(1.234);

        pose.apply(&mut scene, house, &placement);
        scene.late_update();
        let first = *scene.get_object_transform(house).unwrap().get_world_matrix();

        pose.apply(&mut scene, house, &placement);
        scene.late_update();
        let second = *scene.get_object_transform(house).unwrap().get_world_matrix();

        assert_eq!(first, second);
    }

    #[test]
    fn pose_keeps_placement_x_z_and_scale() {
        let placement = HousePlacement {
            position: Vec3::new(3.0, -1.3, -2.0),
            ..Default::default()
        };
        let pose = Pose::at(0.5);
        let translation = pose.translation(&placement);

        assert_eq!(translation.x, 3.0);
        assert_eq!(translation.z, -2.0);
        assert!((translation.y as f64 - pose.offset).abs() < 1e-6);
    }
}
