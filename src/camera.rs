//! Orbit camera around the mesh, with the installation's home view.

use glam::{Mat4, Vec3};

use crate::params::RenderConfig;

/// Home eye position of the installation's default view.
const HOME_EYE: Vec3 = Vec3::new(78.185, 4.692, 87.365);

/// Perspective orbit camera centered on the origin.
pub struct OrbitCamera {
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
}

impl OrbitCamera {
    pub fn new() -> Self {
        let mut camera = Self {
            yaw: 0.0,
            pitch: 0.0,
            distance: 1.0,
        };
        camera.reset();
        camera
    }

    /// Return to the home view (Space).
    pub fn reset(&mut self) {
        self.distance = HOME_EYE.length();
        self.yaw = HOME_EYE.x.atan2(HOME_EYE.z);
        self.pitch = (HOME_EYE.y / self.distance).asin();
    }

    /// Orbit from a mouse drag, in pixels.
    pub fn orbit(&mut self, dx: f32, dy: f32) {
        self.yaw -= dx * 0.005;
        self.pitch = (self.pitch + dy * 0.005).clamp(-1.5, 1.5);
    }

    /// Zoom from a scroll delta.
    pub fn zoom(&mut self, delta: f32) {
        self.distance = (self.distance * (1.0 - delta * 0.1)).clamp(5.0, 500.0);
    }

    /// Current eye position in world space.
    pub fn eye(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        Vec3::new(sy * cp, sp, cy * cp) * self.distance
    }

    /// View matrix looking at the origin.
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), Vec3::ZERO, Vec3::Y)
    }

    /// View-projection matrix for the given aspect ratio.
    pub fn view_proj(&self, config: &RenderConfig, aspect: f32) -> Mat4 {
        let proj = Mat4::perspective_rh(
            config.fov_degrees.to_radians(),
            aspect,
            config.near_plane,
            config.far_plane,
        );
        proj * self.view()
    }

    /// Camera right and up axes in world space, for particle billboards.
    pub fn billboard_axes(&self) -> (Vec3, Vec3) {
        let view = self.view();
        let right = Vec3::new(view.x_axis.x, view.y_axis.x, view.z_axis.x);
        let up = Vec3::new(view.x_axis.y, view.y_axis.y, view.z_axis.y);
        (right, up)
    }
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_home_view_matches_eye() {
        let camera = OrbitCamera::new();
        let eye = camera.eye();
        assert!((eye - HOME_EYE).length() < 0.01);
    }

    #[test]
    fn test_pitch_is_clamped() {
        let mut camera = OrbitCamera::new();
        camera.orbit(0.0, 10_000.0);
        assert!(camera.pitch <= 1.5);
        camera.orbit(0.0, -100_000.0);
        assert!(camera.pitch >= -1.5);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut camera = OrbitCamera::new();
        for _ in 0..1000 {
            camera.zoom(1.0);
        }
        assert!(camera.distance >= 5.0);
        for _ in 0..1000 {
            camera.zoom(-1.0);
        }
        assert!(camera.distance <= 500.0);
    }

    #[test]
    fn test_view_proj_is_finite() {
        let camera = OrbitCamera::new();
        let config = RenderConfig::default();
        let vp = camera.view_proj(&config, config.aspect_ratio());
        assert_ne!(vp, Mat4::IDENTITY);
        for v in vp.to_cols_array() {
            assert!(v.is_finite());
        }
    }

    #[test]
    fn test_billboard_axes_are_orthonormal() {
        let camera = OrbitCamera::new();
        let (right, up) = camera.billboard_axes();
        assert!((right.length() - 1.0).abs() < 1e-4);
        assert!((up.length() - 1.0).abs() < 1e-4);
        assert!(right.dot(up).abs() < 1e-4);
    }

    #[test]
    fn test_reset_after_drag() {
        let mut camera = OrbitCamera::new();
        camera.orbit(150.0, -80.0);
        camera.zoom(3.0);
        camera.reset();
        assert!((camera.eye() - HOME_EYE).length() < 0.01);
    }
}
