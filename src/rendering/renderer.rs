use std::sync::Arc;

use anyhow::Context;
use id_arena::Arena;
use wgpu::CommandEncoderDescriptor;
use winit::{dpi::PhysicalSize, window::Window};

use crate::{
    camera::CameraUniform,
    config::ViewerConfig,
    demo::DemoState,
    rendering::{
        instance::gather_instances,
        overlay::Overlay,
        passes::forward_pass::{ForwardPass, ForwardTextureViews},
        render_common::RenderCommon,
        render_model::{render_model_instances, RenderModel},
        shader_loader::{PipelineCacheBuilder, ShaderLoader},
        texture::{DepthTexture, MsaaTexture},
    },
    viewer::{FrameError, FrameSink},
};

pub struct Renderer {
    pub window: Arc<Window>,
    pub size: PhysicalSize<u32>,

    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,

    common: Arc<RenderCommon>,
    depth_texture: DepthTexture,
    msaa_texture: Option<MsaaTexture>,
    render_models: Arena<RenderModel>,

    camera_uniform: CameraUniform,
    camera_buffer: wgpu::Buffer,

    shader_loader: ShaderLoader,
    forward_pass: ForwardPass,

    pub overlay: Option<Overlay>,
}

impl Renderer {
    pub async fn new(
        window: Arc<Window>,
        demo_state: &DemoState,
        config: &ViewerConfig,
    ) -> anyhow::Result<Renderer> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let surface = instance
            .create_surface(window.clone())
            .context("Failed to create surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No suitable graphics adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                label: None,
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("Failed to create device")?;

        let mut camera_uniform = CameraUniform::default();
        camera_uniform.update(&demo_state.camera);
        let camera_buffer = camera_uniform.create_buffer(&device);

        let common = Arc::new(RenderCommon::new(
            &device,
            &adapter,
            &surface,
            size,
            camera_buffer.clone(),
            &demo_state.lights,
            config.clear_color,
        ));

        let (width, height) = (size.width.max(1), size.height.max(1));
        let depth_texture =
            DepthTexture::new(&device, width, height, common.sample_count, "Depth Texture");
        let msaa_texture = (common.sample_count > 1).then(|| {
            MsaaTexture::new(
                &device,
                width,
                height,
                common.surface_format(),
                common.sample_count,
            )
        });

        let mut cache_builder = PipelineCacheBuilder::new();
        let forward_pass = ForwardPass::create(&device, common.clone(), &mut cache_builder)?;
        let shader_loader = ShaderLoader::new(device.clone(), cache_builder)?;

        let overlay = config
            .show_gui
            .then(|| Overlay::new(&window, &device, &queue, common.surface_format()));

        Ok(Self {
            window,
            size,
            surface,
            device,
            queue,
            common,
            depth_texture,
            msaa_texture,
            render_models: Arena::new(),
            camera_uniform,
            camera_buffer,
            shader_loader,
            forward_pass,
            overlay,
        })
    }

    /// Creates GPU buffers for scene models that don't have them yet.
    pub fn upload_new_models(&mut self, demo_state: &mut DemoState) {
        for (_id, scene_model) in demo_state.scene.models.iter_mut() {
            if scene_model.render_model.is_some() {
                continue;
            }

            let render_model = RenderModel::from_model(&self.device, &scene_model.model);
            scene_model.render_model = Some(self.render_models.alloc(render_model));

            log::debug!(
                "Uploaded model {} with {} primitives",
                scene_model.name(),
                scene_model.model.primitives.len()
            );
        }
    }

    pub fn resize_surface(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }

        self.size = new_size;
        self.depth_texture
            .resize(&self.device, new_size.width, new_size.height);
        if let Some(msaa_texture) = self.msaa_texture.as_mut() {
            msaa_texture.resize(&self.device, new_size.width, new_size.height);
        }
        self.reconfigure_surface();
    }

    fn reconfigure_surface(&mut self) {
        let mut config = self
            .common
            .output_surface_config
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        config.width = self.size.width;
        config.height = self.size.height;
        self.surface.configure(&self.device, &config);
    }

    pub fn render_frame(&mut self, demo_state: &mut DemoState) -> Result<(), wgpu::SurfaceError> {
        self.shader_loader.load_pending_shaders();
        self.upload_new_models(demo_state);

        self.camera_uniform.update(&demo_state.camera);
        self.camera_uniform
            .update_buffer(&self.queue, &self.camera_buffer);
        self.common.lights.update(&self.queue, &demo_state.lights);

        gather_instances(&demo_state.scene, &mut self.render_models);

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        let texture_views = match self.msaa_texture.as_ref() {
            Some(msaa_texture) => ForwardTextureViews {
                color: msaa_texture.view().clone(),
                resolve_target: Some(view.clone()),
                depth: self.depth_texture.view().clone(),
            },
            None => ForwardTextureViews {
                color: view.clone(),
                resolve_target: None,
                depth: self.depth_texture.view().clone(),
            },
        };

        self.forward_pass.render(
            &texture_views,
            &mut encoder,
            &self.shader_loader.cache,
            |render_pass| {
                for (_id, render_model) in self.render_models.iter() {
                    if !render_model.instances.should_render() {
                        continue;
                    }

                    render_model_instances(render_pass, &self.queue, render_model);
                }
            },
        );

        if let Some(overlay) = self.overlay.as_mut() {
            overlay.render(&view, &self.device, &self.queue, &mut encoder);
        }

        self.queue.submit([encoder.finish()]);
        output.present();

        Ok(())
    }
}

impl FrameSink for Renderer {
    fn resize(&mut self, width: u32, height: u32) {
        self.resize_surface(PhysicalSize::new(width, height));
    }

    fn draw(&mut self, state: &mut DemoState) -> Result<(), FrameError> {
        match self.render_frame(state) {
            Ok(()) => Ok(()),
            Err(error @ (wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                self.reconfigure_surface();
                Err(FrameError::Skipped(error.to_string()))
            }
            Err(error @ wgpu::SurfaceError::Timeout) => Err(FrameError::Skipped(error.to_string())),
            Err(error) => {
                log::error!("Surface error: {error:?}");
                Err(FrameError::Fatal(error.to_string()))
            }
        }
    }
}
