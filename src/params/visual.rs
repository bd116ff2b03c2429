//! Visual parameters: display toggles, propagation movement, line styling,
//! background, and the particle color ramp.

/// Runtime display toggles, flipped from the keyboard or the panel.
#[derive(Debug, Clone)]
pub struct Toggles {
    /// Show the debug parameter panel (backtick).
    pub show_panel: bool,

    /// Draw the ping-pong / displacement / normal maps as screen tiles (T).
    pub draw_textures: bool,

    /// Render the mesh as wireframe (W).
    pub draw_wireframe: bool,

    /// Draw the undisplaced mesh as a faint overlay (M).
    pub draw_original_mesh: bool,

    /// Enable height-falloff shading in the mesh shader (Q).
    pub enable_falloff: bool,
}

impl Default for Toggles {
    fn default() -> Self {
        Self {
            show_panel: true,
            draw_textures: false,
            draw_wireframe: false,
            draw_original_mesh: false,
            enable_falloff: false,
        }
    }
}

/// Audio propagation and displacement movement parameters.
#[derive(Debug, Clone)]
pub struct MovementParams {
    /// Horizontal shift per frame in the ping-pong buffer (UV units).
    /// Controls how fast the stamped volume scrolls across the mesh.
    pub dx: f32,

    /// Scale applied to the propagated audio value in the displacement pass.
    pub audio_amplitude: f32,

    /// Stamp shape: true = right-edge bar, false = circle at the right mid edge.
    pub straight_marker: bool,

    /// Exponential smoothing factor for the displayed volume (0..1, higher = snappier).
    pub volume_smoothing: f32,
}

impl Default for MovementParams {
    fn default() -> Self {
        Self {
            dx: 0.005,
            audio_amplitude: 10.0,
            straight_marker: true,
            volume_smoothing: 0.5,
        }
    }
}

impl MovementParams {
    /// One step of the displayed-volume exponential smoothing.
    pub fn smooth_volume(&self, smoothed: f32, volume: f32) -> f32 {
        let s = self.volume_smoothing.clamp(0.0, 1.0);
        (1.0 - s) * smoothed + s * volume
    }
}

/// One frame of the base-amplitude glide toward its target.
pub fn ease_amplitude(amplitude: f32, target: f32) -> f32 {
    amplitude + 0.02 * (target - amplitude)
}

/// Mesh line-pattern styling.
#[derive(Debug, Clone)]
pub struct LineStyle {
    /// Render the alternating line pattern encoded in the vertex colors.
    pub enable_lines: bool,

    /// Pattern orientation: true = lines run along the mesh length (every
    /// other depth row), false = across the width (every other column).
    pub length_lines: bool,

    /// Softness threshold for the interpolated line mask.
    pub line_width: f32,

    /// Line gradient endpoints, blended along the mesh length.
    pub color1: [f32; 3],
    pub color2: [f32; 3],

    /// Alpha of the gaps between lines.
    pub gap_alpha: f32,

    /// Color low regions fall off toward when falloff shading is enabled.
    pub falloff_color: [f32; 3],

    /// Highlight color added where the propagated audio value is high.
    pub volume_color: [f32; 3],
}

impl Default for LineStyle {
    fn default() -> Self {
        Self {
            enable_lines: false,
            length_lines: true,
            line_width: 1.0,
            color1: [0.5, 0.5, 0.4],
            color2: [1.0, 0.8, 0.7],
            gap_alpha: 0.5,
            falloff_color: [0.0, 0.0, 0.0],
            volume_color: [1.0, 0.0, 0.0],
        }
    }
}

/// Background rendering parameters.
#[derive(Debug, Clone)]
pub struct BackgroundStyle {
    /// Clear to a solid color instead of drawing the background shader.
    pub solid: bool,

    /// Solid clear color.
    pub color: [f32; 3],

    /// Hue rotation applied to the background texture (radians).
    pub hue: f32,

    /// Brightness multiplier for the background texture.
    pub brightness: f32,
}

impl Default for BackgroundStyle {
    fn default() -> Self {
        Self {
            solid: false,
            color: [0.0, 0.0, 0.0],
            hue: 3.06,
            brightness: 0.17,
        }
    }
}

/// Particle color ramp and field magnitudes.
#[derive(Debug, Clone)]
pub struct ParticleStyle {
    /// Color at birth (rgba).
    pub color1: [f32; 4],

    /// Color at end of life (rgba).
    pub color2: [f32; 4],

    /// Strength of the swirl field applied to particle velocities.
    pub dir_mag: f32,

    /// Position integration scale.
    pub pos_mag: f32,

    /// Time scale of the swirl field animation.
    pub time_mag: f32,

    /// Spatial frequency of the swirl field.
    pub freq_mag: f32,
}

impl Default for ParticleStyle {
    fn default() -> Self {
        Self {
            color1: [0.2, 0.1, 0.05, 0.0],
            color2: [0.3, 0.2, 0.1, 1.0],
            dir_mag: 0.2,
            pos_mag: 1.0,
            time_mag: 0.2,
            freq_mag: 0.2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smooth_volume_converges() {
        let movement = MovementParams::default();
        let mut smoothed = 0.0;
        for _ in 0..100 {
            smoothed = movement.smooth_volume(smoothed, 1.0);
        }
        assert!((smoothed - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_smooth_volume_extremes() {
        let frozen = MovementParams {
            volume_smoothing: 0.0,
            ..MovementParams::default()
        };
        assert_eq!(frozen.smooth_volume(0.3, 1.0), 0.3);

        let instant = MovementParams {
            volume_smoothing: 1.0,
            ..MovementParams::default()
        };
        assert_eq!(instant.smooth_volume(0.3, 1.0), 1.0);
    }

    #[test]
    fn test_ease_amplitude_glides_monotonically() {
        let mut amplitude = 0.0;
        let mut prev = amplitude;
        for _ in 0..500 {
            amplitude = ease_amplitude(amplitude, 10.0);
            assert!(amplitude >= prev);
            prev = amplitude;
        }
        assert!((amplitude - 10.0).abs() < 0.01);

        for _ in 0..500 {
            amplitude = ease_amplitude(amplitude, 0.0);
        }
        assert!(amplitude.abs() < 0.01);
    }

    #[test]
    fn test_defaults_match_shipped_look() {
        let toggles = Toggles::default();
        assert!(toggles.show_panel);
        assert!(!toggles.draw_wireframe);

        let movement = MovementParams::default();
        assert_eq!(movement.dx, 0.005);
        assert_eq!(movement.audio_amplitude, 10.0);
        assert!(movement.straight_marker);

        let lines = LineStyle::default();
        assert!(!lines.enable_lines);
        assert!(lines.length_lines);

        let background = BackgroundStyle::default();
        assert!(!background.solid);
        assert!((background.hue - 3.06).abs() < 1e-6);
    }
}
