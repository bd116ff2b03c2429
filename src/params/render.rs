//! Rendering configuration.

/// Static rendering configuration, fixed after startup.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Window width (pixels).
    pub window_width: u32,

    /// Window height (pixels).
    pub window_height: u32,

    /// Start fullscreen.
    pub fullscreen: bool,

    /// Field of view (degrees).
    pub fov_degrees: f32,

    /// Near clipping plane.
    pub near_plane: f32,

    /// Far clipping plane.
    pub far_plane: f32,

    /// Side length of the offscreen float targets (ping-pong, displacement,
    /// normal). All four are square and equally sized.
    pub map_size: u32,

    /// Edge length of the debug texture tiles (pixels).
    pub debug_tile_px: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            window_width: 1280,
            window_height: 720,
            fullscreen: false,
            fov_degrees: 60.0,
            near_plane: 0.1,
            far_plane: 1000.0,
            map_size: 256,
            debug_tile_px: 256.0,
        }
    }
}

impl RenderConfig {
    pub fn aspect_ratio(&self) -> f32 {
        self.window_width as f32 / self.window_height.max(1) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aspect_ratio() {
        let config = RenderConfig::default();
        assert!((config.aspect_ratio() - 1280.0 / 720.0).abs() < 1e-6);
    }

    #[test]
    fn test_aspect_ratio_survives_zero_height() {
        let config = RenderConfig {
            window_height: 0,
            ..RenderConfig::default()
        };
        assert!(config.aspect_ratio().is_finite());
    }
}
