use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use wgpu::util::DeviceExt;

pub const SPOT_LIGHT_COUNT: usize = 3;

/// Converts a 0xRRGGBB sRGB color to linear RGB.
pub fn linear_rgb(hex: u32) -> Vec3 {
    let channel = |shift: u32| {
        let srgb = ((hex >> shift) & 0xff) as f32 / 255.0;
        if srgb <= 0.04045 {
            srgb / 12.92
        } else {
            ((srgb + 0.055) / 1.055).powf(2.4)
        }
    };

    Vec3::new(channel(16), channel(8), channel(0))
}

#[derive(Debug, Clone, Copy)]
pub struct AmbientLight {
    pub color: u32,
    pub intensity: f32,
}

#[derive(Debug, Clone)]
pub struct SpotLight {
    pub name: &'static str,
    pub color: u32,
    pub intensity: f32,
    pub position: Vec3,
    pub target: Vec3,
    /// Half-angle of the cone, in radians.
    pub angle: f32,
    /// Extent of the debug GUI sliders on every axis.
    pub gui_range: f32,
}

impl SpotLight {
    fn new(name: &'static str, color: u32, intensity: f32, position: Vec3, gui_range: f32) -> Self {
        Self {
            name,
            color,
            intensity,
            position,
            target: Vec3::ZERO,
            angle: std::f32::consts::FRAC_PI_3,
            gui_range,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Lights {
    pub ambient: AmbientLight,
    pub spots: [SpotLight; SPOT_LIGHT_COUNT],
}

impl Default for Lights {
    fn default() -> Self {
        Self {
            ambient: AmbientLight {
                color: 0x404040,
                intensity: 2.0,
            },
            spots: [
                SpotLight::new("BlueLight", 0x1d27f0, 5.0, Vec3::new(6.0, 11.0, 6.0), 30.0),
                SpotLight::new("OrengeLight", 0xf57d22, 2.0, Vec3::new(-10.0, 0.0, 12.0), 40.0),
                SpotLight::new("BackLight", 0x1d27f0, 2.0, Vec3::new(-10.0, 18.0, -17.0), 40.0),
            ],
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct GpuSpotLight {
    // xyz position, w unused
    position: [f32; 4],
    // rgb premultiplied by intensity, w unused
    color: [f32; 4],
    // xyz normalized direction, w cosine of the cone half-angle
    direction: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct LightsUniform {
    ambient: [f32; 4],
    spots: [GpuSpotLight; SPOT_LIGHT_COUNT],
}

impl LightsUniform {
    pub fn from_lights(lights: &Lights) -> Self {
        let ambient = linear_rgb(lights.ambient.color) * lights.ambient.intensity;

        let spots = lights.spots.clone().map(|spot| {
            let direction = (spot.target - spot.position).normalize_or(Vec3::NEG_Y);
            let color = linear_rgb(spot.color) * spot.intensity;

            GpuSpotLight {
                position: spot.position.extend(1.0).to_array(),
                color: color.extend(0.0).to_array(),
                direction: direction.extend(spot.angle.cos()).to_array(),
            }
        });

        Self {
            ambient: ambient.extend(0.0).to_array(),
            spots,
        }
    }
}

pub struct LightsBuffer {
    buffer: wgpu::Buffer,
}

impl LightsBuffer {
    pub fn new(device: &wgpu::Device, lights: &Lights) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Lights uniform buffer"),
            contents: bytemuck::cast_slice(&[LightsUniform::from_lights(lights)]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        Self { buffer }
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn update(&self, queue: &wgpu::Queue, lights: &Lights) {
        queue.write_buffer(
            &self.buffer,
            0,
            bytemuck::cast_slice(&[LightsUniform::from_lights(lights)]),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_hex_to_linear() {
        assert_eq!(linear_rgb(0x000000), Vec3::ZERO);
        assert!((linear_rgb(0xffffff) - Vec3::ONE).length() < 1e-6);

        let orange = linear_rgb(0xf57d22);
        assert!(orange.x > orange.y && orange.y > orange.z);
    }

    #[test]
    fn default_rig_matches_scene_setup() {
        let lights = Lights::default();
        let names: Vec<_> = lights.spots.iter().map(|s| s.name).collect();
        assert_eq!(names, ["BlueLight", "OrengeLight", "BackLight"]);
        assert_eq!(lights.spots[0].position, Vec3::new(6.0, 11.0, 6.0));
        assert_eq!(lights.spots[0].gui_range, 30.0);
        assert_eq!(lights.spots[2].intensity, 2.0);
    }

    #[test]
    fn uniform_points_spots_at_their_target() {
        let lights = Lights::default();
        let uniform = LightsUniform::from_lights(&lights);

        let direction = Vec3::from_slice(&uniform.spots[0].direction[..3]);
        let expected = (Vec3::ZERO - Vec3::new(6.0, 11.0, 6.0)).normalize();
        assert!((direction - expected).length() < 1e-6);
        assert!((uniform.spots[0].direction[3] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn uniform_layout_is_std140_friendly() {
        assert_eq!(std::mem::size_of::<LightsUniform>() % 16, 0);
    }
}
