//! Orbit camera for the particle view.

use glam::{Mat4, Vec3};

const FOV_Y_DEGREES: f32 = 45.0;
const MIN_DISTANCE: f32 = 0.5;
const MAX_DISTANCE: f32 = 20.0;

/// Camera orbiting `target` at `distance`.
#[derive(Clone, Debug)]
pub struct Camera {
    /// Horizontal angle in radians.
    pub yaw: f32,
    /// Vertical angle in radians, kept within +/-1.5.
    pub pitch: f32,
    /// Distance from the target.
    pub distance: f32,
    /// Point the camera looks at.
    pub target: Vec3,
}

impl Camera {
    /// Camera looking at `target` from slightly above.
    pub fn looking_at(target: Vec3) -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.2,
            distance: 4.0,
            target,
        }
    }

    /// World-space eye position.
    pub fn eye(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        self.target + self.distance * Vec3::new(cos_pitch * sin_yaw, sin_pitch, cos_pitch * cos_yaw)
    }

    /// Combined projection and view matrix for an `aspect` (width / height) viewport.
    pub fn view_proj(&self, aspect: f32) -> Mat4 {
        let view = Mat4::look_at_rh(self.eye(), self.target, Vec3::Y);
        let proj = Mat4::perspective_rh(FOV_Y_DEGREES.to_radians(), aspect, 0.1, 100.0);
        proj * view
    }

    /// Rotate by a mouse drag of `(dx, dy)` pixels.
    pub fn orbit(&mut self, dx: f32, dy: f32) {
        self.yaw -= dx * 0.005;
        self.pitch = (self.pitch + dy * 0.005).clamp(-1.5, 1.5);
    }

    /// Move closer (positive) or further (negative).
    pub fn zoom(&mut self, amount: f32) {
        self.distance = (self.distance - amount * 0.3).clamp(MIN_DISTANCE, MAX_DISTANCE);
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::looking_at(Vec3::ZERO)
    }
}
