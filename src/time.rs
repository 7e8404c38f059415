//! Wall-clock frame timing.
//!
//! [`FrameClock`] turns real time into the per-frame deltas that
//! [`EmissionScheduler::tick`](crate::EmissionScheduler::tick) consumes. It
//! never reports a negative delta, so its output can be fed to `tick`
//! directly.
//!
//! # Example
//!
//! ```ignore
//! use ringfx::time::FrameClock;
//!
//! let mut clock = FrameClock::new();
//!
//! // In your frame loop:
//! let dt = clock.update();
//! scheduler.tick(dt)?;
//! ```

use std::time::{Duration, Instant};

/// Longest delta reported for a single frame, in seconds.
///
/// A stalled frame (window drag, debugger pause) would otherwise advance the
/// simulation in one large jump.
pub const DEFAULT_MAX_DELTA: f32 = 0.25;

/// Per-frame delta source with pause, time scale and fixed-step support.
#[derive(Debug)]
pub struct FrameClock {
    /// When the last frame occurred.
    last_frame: Instant,
    /// Most recent reported delta in seconds.
    delta_secs: f32,
    /// Frames since creation or reset.
    frame_count: u64,
    /// Calculated FPS (updated periodically).
    fps: f32,
    /// Frame count at last FPS update.
    fps_frame_count: u64,
    /// Time of last FPS calculation.
    fps_update_time: Instant,
    /// How often to update FPS calculation.
    fps_update_interval: Duration,
    paused: bool,
    fixed_delta: Option<f32>,
    time_scale: f32,
    max_delta: f32,
}

impl FrameClock {
    /// Start timing from now.
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            last_frame: now,
            delta_secs: 0.0,
            frame_count: 0,
            fps: 0.0,
            fps_frame_count: 0,
            fps_update_time: now,
            fps_update_interval: Duration::from_millis(500),
            paused: false,
            fixed_delta: None,
            time_scale: 1.0,
            max_delta: DEFAULT_MAX_DELTA,
        }
    }

    /// Mark a new frame and return its delta in seconds.
    ///
    /// Returns 0 while paused. Otherwise the delta is the fixed step if one
    /// is set, else real time since the last frame capped at the max delta,
    /// multiplied by the time scale.
    pub fn update(&mut self) -> f32 {
        let now = Instant::now();
        let raw = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.frame_count += 1;

        let fps_elapsed = now.duration_since(self.fps_update_time);
        if fps_elapsed >= self.fps_update_interval {
            let frames_since = self.frame_count - self.fps_frame_count;
            self.fps = frames_since as f32 / fps_elapsed.as_secs_f32();
            self.fps_frame_count = self.frame_count;
            self.fps_update_time = now;
        }

        self.delta_secs = if self.paused {
            0.0
        } else {
            self.fixed_delta.unwrap_or(raw.min(self.max_delta)) * self.time_scale
        };
        self.delta_secs
    }

    /// Delta reported by the last [`update`](Self::update).
    #[inline]
    pub fn delta(&self) -> f32 {
        self.delta_secs
    }

    /// Frames since creation or reset.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    /// Frames per second, refreshed twice a second.
    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[inline]
    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Toggle pause. While paused every delta is zero.
    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    /// Use a fixed step instead of real frame time. `None` restores real time.
    pub fn set_fixed_delta(&mut self, delta: Option<f32>) {
        self.fixed_delta = delta.map(|d| d.max(0.0));
    }

    /// Set the speed multiplier. Negative values clamp to zero.
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.max(0.0);
    }

    /// Set the cap applied to real frame time.
    pub fn set_max_delta(&mut self, max_delta: f32) {
        self.max_delta = max_delta.max(0.0);
    }

    /// Restart frame counting from now.
    pub fn reset(&mut self) {
        let now = Instant::now();
        self.last_frame = now;
        self.delta_secs = 0.0;
        self.frame_count = 0;
        self.fps = 0.0;
        self.fps_frame_count = 0;
        self.fps_update_time = now;
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_clock_new() {
        let clock = FrameClock::new();
        assert_eq!(clock.frame(), 0);
        assert!(!clock.is_paused());
        assert_eq!(clock.time_scale(), 1.0);
    }

    #[test]
    fn test_update_reports_positive_delta() {
        let mut clock = FrameClock::new();
        thread::sleep(Duration::from_millis(10));
        let dt = clock.update();
        assert!(dt > 0.0);
        assert_eq!(clock.frame(), 1);
    }

    #[test]
    fn test_paused_delta_is_zero() {
        let mut clock = FrameClock::new();
        clock.toggle_pause();
        thread::sleep(Duration::from_millis(5));
        assert_eq!(clock.update(), 0.0);
        clock.toggle_pause();
        assert!(!clock.is_paused());
    }

    #[test]
    fn test_fixed_delta() {
        let mut clock = FrameClock::new();
        clock.set_fixed_delta(Some(1.0 / 60.0));
        thread::sleep(Duration::from_millis(50));
        assert!((clock.update() - 1.0 / 60.0).abs() < 1e-6);
    }

    #[test]
    fn test_delta_capped() {
        let mut clock = FrameClock::new();
        clock.set_max_delta(0.001);
        thread::sleep(Duration::from_millis(20));
        assert!(clock.update() <= 0.001);
    }

    #[test]
    fn test_time_scale_never_negative() {
        let mut clock = FrameClock::new();
        clock.set_time_scale(-2.0);
        assert_eq!(clock.time_scale(), 0.0);
        thread::sleep(Duration::from_millis(5));
        assert_eq!(clock.update(), 0.0);
    }
}
