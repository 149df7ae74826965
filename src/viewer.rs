use thiserror::Error;

use crate::demo::DemoState;

#[derive(Debug, Error)]
pub enum FrameError {
    /// The frame was not presented but the next one may succeed.
    #[error("frame skipped: {0}")]
    Skipped(String),
    #[error("rendering failed: {0}")]
    Fatal(String),
}

/// Whatever turns a posed scene into pixels.
pub trait FrameSink {
    fn resize(&mut self, width: u32, height: u32);
    fn draw(&mut self, state: &mut DemoState) -> Result<(), FrameError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Stopped,
}

/// Drives the animation: one clock tick, pose update, and draw per frame.
pub struct Viewer {
    pub state: DemoState,
    loop_state: LoopState,
}

impl Viewer {
    pub fn new(state: DemoState) -> Self {
        Self {
            state,
            loop_state: LoopState::Idle,
        }
    }

    pub fn loop_state(&self) -> LoopState {
        self.loop_state
    }

    pub fn start(&mut self) {
        if self.loop_state == LoopState::Idle {
            log::debug!("Animation loop started");
            self.loop_state = LoopState::Running;
        }
    }

    pub fn stop(&mut self) {
        if self.loop_state != LoopState::Stopped {
            log::debug!("Animation loop stopped after step {:.2}", self.state.clock.step());
            self.loop_state = LoopState::Stopped;
        }
    }

    pub fn is_running(&self) -> bool {
        self.loop_state() == LoopState::Running
    }

    /// Returns whether another frame should be scheduled.
    pub fn frame<S: FrameSink>(&mut self, sink: &mut S) -> Result<bool, FrameError> {
        if !self.is_running() {
            return Ok(false);
        }

        self.state.update();
        self.draw(sink)?;

        Ok(self.is_running())
    }

    /// Applies a new viewport size and redraws immediately, so the window is
    /// never shown at stale dimensions.
    pub fn resize<S: FrameSink>(
        &mut self,
        sink: &mut S,
        width: u32,
        height: u32,
    ) -> Result<(), FrameError> {
        if width == 0 || height == 0 {
            return Ok(());
        }

        self.state.camera.set_viewport(width, height);
        sink.resize(width, height);

        if self.is_running() {
            self.draw(sink)?;
        }

        Ok(())
    }

    fn draw<S: FrameSink>(&mut self, sink: &mut S) -> Result<(), FrameError> {
        match sink.draw(&mut self.state) {
            Ok(()) => Ok(()),
            Err(FrameError::Skipped(reason)) => {
                log::warn!("Frame skipped: {reason}");
                Ok(())
            }
            Err(fatal) => {
                self.stop();
                Err(fatal)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        animation::Pose,
        assets::{fixtures::TRIANGLE_GLTF, GltfImport},
        config::ViewerConfig,
    };

    #[derive(Default)]
    struct RecordingSink {
        draws: usize,
        resizes: Vec<(u32, u32)>,
        steps_seen: Vec<f64>,
        next_error: Option<FrameError>,
    }

    impl FrameSink for RecordingSink {
        fn resize(&mut self, width: u32, height: u32) {
            self.resizes.push((width, height));
        }

        fn draw(&mut self, state: &mut DemoState) -> Result<(), FrameError> {
            self.draws += 1;
            self.steps_seen.push(state.clock.step());
            match self.next_error.take() {
                Some(error) => Err(error),
                None => Ok(()),
            }
        }
    }

    fn viewer() -> Viewer {
        let config = ViewerConfig {
            window_size: (640, 480),
            ..Default::default()
        };
        Viewer::new(DemoState::new(&config))
    }

    #[test]
    fn idle_viewer_does_nothing() {
        let mut viewer = viewer();
        let mut sink = RecordingSink::default();

        assert!(!viewer.frame(&mut sink).unwrap());
        assert_eq!(sink.draws, 0);
        assert_eq!(viewer.state.clock.step(), 0.0);
    }

    #[test]
    fn each_frame_ticks_then_draws_once() {
        let mut viewer = viewer();
        let mut sink = RecordingSink::default();
        viewer.start();

        for _ in 0..5 {
            assert!(viewer.frame(&mut sink).unwrap());
        }

        assert_eq!(sink.draws, 5);
        for (i, step) in sink.steps_seen.iter().enumerate() {
            assert!((step - 0.02 * (i + 1) as f64).abs() < 1e-12);
        }
    }

    #[test]
    fn resize_sets_aspect_and_draws_once() {
        let mut viewer = viewer();
        let mut sink = RecordingSink::default();
        viewer.start();

        viewer.resize(&mut sink, 1024, 300).unwrap();

        assert_eq!(viewer.state.camera.aspect, 1024.0 / 300.0);
        assert_eq!(sink.resizes, [(1024, 300)]);
        assert_eq!(sink.draws, 1);
        assert_eq!(viewer.state.clock.step(), 0.0);
    }

    #[test]
    fn every_resize_notification_is_applied() {
        let mut viewer = viewer();
        let mut sink = RecordingSink::default();
        viewer.start();

        viewer.resize(&mut sink, 100, 100).unwrap();
        viewer.resize(&mut sink, 100, 100).unwrap();
        viewer.resize(&mut sink, 200, 100).unwrap();

        assert_eq!(sink.resizes.len(), 3);
        assert_eq!(sink.draws, 3);
    }

    #[test]
    fn zero_sized_resize_is_ignored() {
        let mut viewer = viewer();
        let mut sink = RecordingSink::default();
        viewer.start();

        viewer.resize(&mut sink, 0, 480).unwrap();

        assert!(sink.resizes.is_empty());
        assert_eq!(sink.draws, 0);
        assert_eq!(viewer.state.camera.aspect, 640.0 / 480.0);
    }

    #[test]
    fn frames_before_model_arrives_keep_running() {
        let mut viewer = viewer();
        let mut sink = RecordingSink::default();
        viewer.start();

        assert!(viewer.frame(&mut sink).unwrap());
        assert!(viewer.state.house.loaded().is_none());

        viewer.state.finish_loading(GltfImport::from_slice(TRIANGLE_GLTF.as_bytes()));
        assert!(viewer.frame(&mut sink).unwrap());

        let house = *viewer.state.house.loaded().unwrap();
        let y = viewer.state.scene.get_object_transform(house).unwrap().translation().y;
        let expected = Pose::at(viewer.state.clock.step()).offset;
        assert!((y as f64 - expected).abs() < 1e-6);
        assert_eq!(sink.draws, 2);
    }

    #[test]
    fn skipped_frame_is_not_fatal() {
        let mut viewer = viewer();
        let mut sink = RecordingSink {
            next_error: Some(FrameError::Skipped("timeout".into())),
            ..Default::default()
        };
        viewer.start();

        assert!(viewer.frame(&mut sink).unwrap());
        assert!(viewer.frame(&mut sink).unwrap());
        assert_eq!(viewer.loop_state(), LoopState::Running);
    }

    #[test]
    fn fatal_error_stops_the_loop() {
        let mut viewer = viewer();
        let mut sink = RecordingSink {
            next_error: Some(FrameError::Fatal("out of memory".into())),
            ..Default::default()
        };
        viewer.start();

        assert!(viewer.frame(&mut sink).is_err());
        assert_eq!(viewer.loop_state(), LoopState::Stopped);
        assert!(!viewer.frame(&mut sink).unwrap());
        assert_eq!(sink.draws, 1);
    }

    #[test]
    fn stopped_viewer_cannot_restart() {
        let mut viewer = viewer();
        viewer.start();
        viewer.stop();
        viewer.start();

        assert_eq!(viewer.loop_state(), LoopState::Stopped);
    }
}
