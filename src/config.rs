use std::path::PathBuf;

use clap::Parser;
use glam::Vec3;

use crate::animation::{FrameClock, HousePlacement};

pub const DEFAULT_MODEL_PATH: &str = "assets/model/scene.glb";

#[derive(Debug, Parser)]
#[command(version, about = "Bobbing house model viewer")]
pub struct Args {
    /// Binary glTF file to load
    #[arg(long, default_value = DEFAULT_MODEL_PATH)]
    pub model: PathBuf,

    /// Initial window width in logical pixels
    #[arg(long, default_value_t = 1280)]
    pub width: u32,

    /// Initial window height in logical pixels
    #[arg(long, default_value_t = 720)]
    pub height: u32,

    /// Hide the light debug GUI
    #[arg(long)]
    pub no_gui: bool,
}

#[derive(Debug, Clone)]
pub struct CameraConfig {
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub eye: Vec3,
    pub target: Vec3,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y_degrees: 40.0,
            near: 0.1,
            far: 1000.0,
            eye: Vec3::new(0.0, 0.0, 25.0),
            target: Vec3::ZERO,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub model_path: PathBuf,
    pub window_size: (u32, u32),
    pub show_gui: bool,
    pub camera: CameraConfig,
    pub placement: HousePlacement,
    pub step_increment: f64,
    pub clear_color: wgpu::Color,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            window_size: (1280, 720),
            show_gui: true,
            camera: CameraConfig::default(),
            placement: HousePlacement::default(),
            step_increment: FrameClock::DEFAULT_INCREMENT,
            clear_color: wgpu::Color::TRANSPARENT,
        }
    }
}

impl From<Args> for ViewerConfig {
    fn from(args: Args) -> Self {
        Self {
            model_path: args.model,
            window_size: (args.width.max(1), args.height.max(1)),
            show_gui: !args.no_gui,
            ..Default::default()
        }
    }
}
