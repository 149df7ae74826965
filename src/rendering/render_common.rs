use std::sync::RwLock;

use wgpu::SurfaceConfiguration;
use winit::dpi::PhysicalSize;

use crate::{
    lights::{Lights, LightsBuffer},
    rendering::texture::DepthTexture,
};

/// GPU state shared by every pass.
pub struct RenderCommon {
    pub output_surface_config: RwLock<SurfaceConfiguration>,
    pub camera_uniform_buffer: wgpu::Buffer,
    pub lights: LightsBuffer,
    pub clear_color: wgpu::Color,
    /// MSAA sample count shared by the color and depth attachments.
    pub sample_count: u32,
}

const PREFERRED_SAMPLE_COUNT: u32 = 4;

/// 4x MSAA when both attachments support it and the color format can be
/// resolved, otherwise no multisampling.
pub fn pick_sample_count(
    color: wgpu::TextureFormatFeatureFlags,
    depth: wgpu::TextureFormatFeatureFlags,
) -> u32 {
    let supported = color.sample_count_supported(PREFERRED_SAMPLE_COUNT)
        && color.contains(wgpu::TextureFormatFeatureFlags::MULTISAMPLE_RESOLVE)
        && depth.sample_count_supported(PREFERRED_SAMPLE_COUNT);

    if supported {
        PREFERRED_SAMPLE_COUNT
    } else {
        1
    }
}

impl RenderCommon {
    pub fn new(
        device: &wgpu::Device,
        adapter: &wgpu::Adapter,
        surface: &wgpu::Surface,
        size: PhysicalSize<u32>,
        camera_uniform_buffer: wgpu::Buffer,
        lights: &Lights,
        clear_color: wgpu::Color,
    ) -> Self {
        let surface_caps = surface.get_capabilities(adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        // See-through background needs a compositor that honors alpha.
        let alpha_mode = [
            wgpu::CompositeAlphaMode::PreMultiplied,
            wgpu::CompositeAlphaMode::PostMultiplied,
        ]
        .into_iter()
        .find(|mode| surface_caps.alpha_modes.contains(mode))
        .unwrap_or(surface_caps.alpha_modes[0]);

        let output_surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps.present_modes[0],
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(device, &output_surface_config);

        let sample_count = pick_sample_count(
            adapter.get_texture_format_features(surface_format).flags,
            adapter
                .get_texture_format_features(DepthTexture::DEPTH_FORMAT)
                .flags,
        );
        log::info!("Rendering with {sample_count}x MSAA");

        Self {
            output_surface_config: RwLock::new(output_surface_config),
            camera_uniform_buffer,
            lights: LightsBuffer::new(device, lights),
            clear_color,
            sample_count,
        }
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.output_surface_config
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .format
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::TextureFormatFeatureFlags as Flags;

    #[test]
    fn prefers_four_samples() {
        let color = Flags::MULTISAMPLE_X4 | Flags::MULTISAMPLE_RESOLVE;
        assert_eq!(pick_sample_count(color, Flags::MULTISAMPLE_X4), 4);
    }

    #[test]
    fn falls_back_to_single_sample() {
        let resolvable = Flags::MULTISAMPLE_X4 | Flags::MULTISAMPLE_RESOLVE;

        assert_eq!(pick_sample_count(Flags::MULTISAMPLE_X4, Flags::MULTISAMPLE_X4), 1);
        assert_eq!(pick_sample_count(resolvable, Flags::empty()), 1);
        assert_eq!(pick_sample_count(Flags::MULTISAMPLE_X2, Flags::MULTISAMPLE_X2), 1);
    }
}
