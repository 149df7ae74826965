use std::time::{Duration, Instant};

use glam::Vec3;
use imgui::{Condition, TreeNodeFlags, Ui};

use crate::{assets::ModelSlot, demo::DemoState};

const SMOOTHING: f64 = 0.1;

/// Exponentially smoothed time between presented frames.
#[derive(Debug, Default)]
pub struct FrameStats {
    average: Option<Duration>,
    last_frame: Option<Instant>,
}

impl FrameStats {
    /// Marks a rendered frame. Only the animation loop should call this, other
    /// redraws (resizes) would count as extra frames.
    pub fn frame_at(&mut self, now: Instant) {
        if let Some(last) = self.last_frame.replace(now) {
            self.record(now.saturating_duration_since(last));
        }
    }

    pub fn record(&mut self, delta: Duration) {
        self.average = Some(match self.average {
            None => delta,
            Some(average) => average.mul_f64(1.0 - SMOOTHING) + delta.mul_f64(SMOOTHING),
        });
    }

    pub fn frame_ms(&self) -> f64 {
        self.average.map_or(0.0, |average| average.as_secs_f64() * 1000.0)
    }

    pub fn fps(&self) -> f64 {
        match self.average {
            Some(average) if !average.is_zero() => 1.0 / average.as_secs_f64(),
            _ => 0.0,
        }
    }
}

/// Sliders move in whole units within the light's range.
fn snap_to_range(value: f32, range: f32) -> f32 {
    value.round().clamp(-range, range)
}

fn model_status(slot: &ModelSlot<impl Sized>) -> String {
    match slot {
        ModelSlot::Failed(message) => format!("Model: failed ({message})"),
        other => format!("Model: {}", other.status()),
    }
}

pub fn build(ui: &Ui, state: &mut DemoState, stats: &FrameStats) {
    ui.window("Lights")
        .position([10.0, 10.0], Condition::FirstUseEver)
        .size([280.0, 0.0], Condition::FirstUseEver)
        .build(|| {
            ui.text(format!("{:.0} FPS ({:.2} ms)", stats.fps(), stats.frame_ms()));
            ui.text(model_status(&state.house));
            ui.separator();

            for spot in state.lights.spots.iter_mut() {
                if !ui.collapsing_header(spot.name, TreeNodeFlags::DEFAULT_OPEN) {
                    continue;
                }

                let range = spot.gui_range;
                let mut position = spot.position.to_array();
                for (axis, value) in ["X", "Y", "Z"].into_iter().zip(position.iter_mut()) {
                    let changed = ui
                        .slider_config(format!("{axis}##{}", spot.name), -range, range)
                        .display_format("%.0f")
                        .build(value);

                    if changed {
                        *value = snap_to_range(*value, range);
                    }
                }
                spot.position = Vec3::from_array(position);
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewerConfig;

    #[test]
    fn stats_start_empty() {
        let stats = FrameStats::default();
        assert_eq!(stats.fps(), 0.0);
        assert_eq!(stats.frame_ms(), 0.0);
    }

    #[test]
    fn stats_converge_on_steady_frame_time() {
        let mut stats = FrameStats::default();
        stats.record(Duration::from_millis(100));
        for _ in 0..200 {
            stats.record(Duration::from_millis(20));
        }

        assert!((stats.frame_ms() - 20.0).abs() < 0.01);
        assert!((stats.fps() - 50.0).abs() < 0.1);
    }

    #[test]
    fn frame_times_are_measured_between_loop_frames() {
        let mut stats = FrameStats::default();
        let start = Instant::now();

        stats.frame_at(start);
        assert_eq!(stats.frame_ms(), 0.0);

        stats.frame_at(start + Duration::from_millis(16));
        assert!((stats.frame_ms() - 16.0).abs() < 1e-9);

        // A long pause with resize-only redraws in between reads as one slow
        // frame, not many fast ones.
        stats.frame_at(start + Duration::from_millis(516));
        assert!(stats.frame_ms() > 16.0);
        assert!(stats.fps() < 60.0);
    }

    #[test]
    fn slider_values_snap_to_whole_units() {
        assert_eq!(snap_to_range(6.4, 30.0), 6.0);
        assert_eq!(snap_to_range(-10.6, 40.0), -11.0);
        assert_eq!(snap_to_range(45.0, 40.0), 40.0);
        assert_eq!(snap_to_range(-31.0, 30.0), -30.0);
    }

    #[test]
    fn status_line_includes_failure_message() {
        let slot: ModelSlot<()> = ModelSlot::Failed("no scene".into());
        assert_eq!(model_status(&slot), "Model: failed (no scene)");
        assert_eq!(model_status(&ModelSlot::<()>::Loading), "Model: loading");
    }

    #[test]
    fn gui_builds_without_touching_lights() {
        let mut context = imgui::Context::create();
        context.set_ini_filename(None);
        context.io_mut().display_size = [800.0, 600.0];
        context.io_mut().delta_time = 1.0 / 60.0;
        context.fonts().build_rgba32_texture();

        let mut state = DemoState::new(&ViewerConfig::default());
        let before: Vec<_> = state.lights.spots.iter().map(|spot| spot.position).collect();

        let ui = context.new_frame();
        build(ui, &mut state, &FrameStats::default());
        context.render();

        let after: Vec<_> = state.lights.spots.iter().map(|spot| spot.position).collect();
        assert_eq!(before, after);
    }
}
