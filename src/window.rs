use std::{sync::Arc, time::Instant};

use anyhow::Context;
use glam::Vec2;
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowId},
};

use crate::{
    config::ViewerConfig,
    demo::DemoState,
    gui::{self, FrameStats},
    orbit::DragMode,
    rendering::renderer::Renderer,
    viewer::Viewer,
};

// Pixel-precise touchpads report much larger deltas than wheel notches.
const PIXELS_PER_SCROLL_LINE: f32 = 50.0;

struct App {
    config: ViewerConfig,
    viewer: Viewer,
    renderer: Option<Renderer>,
    stats: FrameStats,
    error: Option<anyhow::Error>,
}

impl App {
    fn new(config: ViewerConfig) -> Self {
        let viewer = Viewer::new(DemoState::new(&config));

        Self {
            config,
            viewer,
            renderer: None,
            stats: FrameStats::default(),
            error: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let (width, height) = self.config.window_size;
        let window_attributes = Window::default_attributes()
            .with_title("Hoverhouse")
            .with_transparent(true)
            .with_inner_size(LogicalSize::new(width, height));

        let window = event_loop
            .create_window(window_attributes)
            .context("Failed to create window")?;

        let mut renderer = pollster::block_on(Renderer::new(
            Arc::new(window),
            &self.viewer.state,
            &self.config,
        ))?;

        // The OS may not honor the requested size, so adopt the real one.
        let size = renderer.window.inner_size();
        self.viewer
            .resize(&mut renderer, size.width, size.height)
            .context("Initial resize failed")?;

        self.viewer.state.start_loading(&self.config.model_path);
        self.viewer.start();

        renderer.window.request_redraw();
        self.renderer = Some(renderer);

        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{error:?}");
        self.viewer.stop();
        self.error = Some(error);
        event_loop.exit();
    }

    fn prepare_gui(&mut self) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };

        if let Some(overlay) = renderer.overlay.as_mut() {
            let state = &mut self.viewer.state;
            let stats = &self.stats;
            overlay.frame(&renderer.window, |ui| gui::build(ui, state, stats));
        }
    }

    fn gui_wants_mouse(&self) -> bool {
        self.renderer
            .as_ref()
            .and_then(|renderer| renderer.overlay.as_ref())
            .is_some_and(|overlay| overlay.wants_mouse())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.renderer.is_some() {
            return;
        }

        if let Err(error) = self.init(event_loop) {
            self.fail(event_loop, error);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };

        if let Some(overlay) = renderer.overlay.as_mut() {
            overlay.handle_event(&renderer.window, window_id, &event);
        }

        match event {
            WindowEvent::CloseRequested => {
                self.viewer.stop();
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                self.prepare_gui();
                let Some(renderer) = self.renderer.as_mut() else {
                    return;
                };

                if let Err(error) = self.viewer.resize(renderer, new_size.width, new_size.height) {
                    self.fail(event_loop, error.into());
                }
            }
            WindowEvent::RedrawRequested => {
                if self.viewer.is_running() {
                    self.stats.frame_at(Instant::now());
                }
                self.prepare_gui();
                let Some(renderer) = self.renderer.as_mut() else {
                    return;
                };

                match self.viewer.frame(renderer) {
                    Ok(true) => renderer.window.request_redraw(),
                    Ok(false) => {}
                    Err(error) => self.fail(event_loop, error.into()),
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let mode = match button {
                    MouseButton::Left => DragMode::Rotate,
                    MouseButton::Right => DragMode::Pan,
                    _ => return,
                };

                let gui_wants_mouse = self.gui_wants_mouse();
                let orbit = &mut self.viewer.state.orbit;
                match state {
                    ElementState::Released => orbit.end_drag(mode),
                    ElementState::Pressed if !gui_wants_mouse => orbit.begin_drag(mode),
                    ElementState::Pressed => {}
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let state = &mut self.viewer.state;
                state.orbit.cursor_moved(
                    Vec2::new(position.x as f32, position.y as f32),
                    &mut state.camera,
                );
            }
            WindowEvent::MouseWheel { delta, .. } => {
                if self.gui_wants_mouse() {
                    return;
                }

                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(position) => {
                        position.y as f32 / PIXELS_PER_SCROLL_LINE
                    }
                };

                let state = &mut self.viewer.state;
                state.orbit.scroll(lines, &mut state.camera);
            }
            _ => (),
        }
    }
}

pub async fn run(config: ViewerConfig) -> anyhow::Result<()> {
    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}
