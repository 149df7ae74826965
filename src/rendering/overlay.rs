use std::time::Instant;

use imgui::{FontConfig, FontSource};
use imgui_wgpu::RendererConfig;
use imgui_winit_support::{HiDpiMode, WinitPlatform};
use wgpu::{CommandEncoder, TextureView};
use winit::{
    event::{Event, WindowEvent},
    window::{Window, WindowId},
};

/// Dear ImGui context plus its winit platform glue and wgpu backend.
pub struct Overlay {
    context: imgui::Context,
    platform: WinitPlatform,
    renderer: imgui_wgpu::Renderer,
    frame_active: bool,
    last_frame: Instant,
}

impl Overlay {
    pub fn new(
        window: &Window,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        texture_format: wgpu::TextureFormat,
    ) -> Self {
        let mut context = imgui::Context::create();
        let mut platform = WinitPlatform::new(&mut context);
        platform.attach_window(context.io_mut(), window, HiDpiMode::Default);

        context.fonts().add_font(&[FontSource::DefaultFontData {
            config: Some(FontConfig {
                oversample_h: 1,
                pixel_snap_h: true,
                size_pixels: 14.0,
                ..Default::default()
            }),
        }]);

        // Slider state lives in DemoState, nothing worth persisting.
        context.set_ini_filename(None);

        let renderer = imgui_wgpu::Renderer::new(
            &mut context,
            device,
            queue,
            RendererConfig {
                texture_format,
                ..Default::default()
            },
        );

        Self {
            context,
            platform,
            renderer,
            frame_active: false,
            last_frame: Instant::now(),
        }
    }

    /// Starts a GUI frame and lets `build` fill it. The result is drawn by the
    /// next call to [`Overlay::render`].
    pub fn frame<F>(&mut self, window: &Window, build: F)
    where
        F: FnOnce(&mut imgui::Ui),
    {
        if self.frame_active {
            // The previous frame never reached the screen.
            self.context.render();
        }

        let now = Instant::now();
        self.context
            .io_mut()
            .update_delta_time(now.saturating_duration_since(self.last_frame));
        self.last_frame = now;

        if let Err(error) = self.platform.prepare_frame(self.context.io_mut(), window) {
            log::warn!("Failed to prepare GUI frame: {error}");
            self.frame_active = false;
            return;
        }

        let ui = self.context.new_frame();
        build(ui);
        self.platform.prepare_render(ui, window);
        self.frame_active = true;
    }

    pub fn render(
        &mut self,
        view: &TextureView,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut CommandEncoder,
    ) {
        if !self.frame_active {
            return;
        }
        self.frame_active = false;

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Imgui render pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        let draw_data = self.context.render();

        // imgui-rs crashes on empty draw data
        // https://github.com/imgui-rs/imgui-rs/issues/325
        if draw_data.draw_lists_count() == 0 {
            return;
        }

        if let Err(error) = self
            .renderer
            .render(draw_data, queue, device, &mut render_pass)
        {
            log::error!("Rendering the GUI failed: {error}");
        }
    }

    pub fn handle_event(&mut self, window: &Window, window_id: WindowId, event: &WindowEvent) {
        self.platform.handle_event::<()>(
            self.context.io_mut(),
            window,
            &Event::WindowEvent {
                window_id,
                event: event.clone(),
            },
        );
    }

    /// Whether the GUI is hovering or dragging and should keep the mouse.
    pub fn wants_mouse(&self) -> bool {
        self.context.io().want_capture_mouse
    }
}
