/*!
 * Motion effect engine.
 *
 * `MotionEngine::parameters` is a pure function of (effect, progress): every
 * frame's transform can be recomputed from those two values alone. The only
 * randomness in the render path is the effect assignment done by the slide
 * planner.
 *
 * `warp_frame` applies the resulting affine transform to a frame with
 * bilinear sampling and reflect-101 borders, so nothing outside the source
 * image is ever exposed.
 */

use std::f64::consts::PI;
use std::fmt;

use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};

/// Camera-like motion applied to a still slide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionEffect {
    ZoomCenter,
    ZoomLeft,
    ZoomRight,
    ZoomTop,
    ZoomBottom,
    PanLeftZoom,
    PanRightZoom,
    PanUpZoom,
    PanDownZoom,
    SwayHorizontalZoom,
    SwayVerticalZoom,
    SwayDiagonalZoom,
    SpiralZoom,
    WaveZoom,
    OrbitZoom,
    BreathingCenter,
    BreathingCorners,
    PulseZoom,
    Static,
}

impl MotionEffect {
    /// The full effect catalog
    pub const ALL: [MotionEffect; 19] = [
        MotionEffect::ZoomCenter,
        MotionEffect::ZoomLeft,
        MotionEffect::ZoomRight,
        MotionEffect::ZoomTop,
        MotionEffect::ZoomBottom,
        MotionEffect::PanLeftZoom,
        MotionEffect::PanRightZoom,
        MotionEffect::PanUpZoom,
        MotionEffect::PanDownZoom,
        MotionEffect::SwayHorizontalZoom,
        MotionEffect::SwayVerticalZoom,
        MotionEffect::SwayDiagonalZoom,
        MotionEffect::SpiralZoom,
        MotionEffect::WaveZoom,
        MotionEffect::OrbitZoom,
        MotionEffect::BreathingCenter,
        MotionEffect::BreathingCorners,
        MotionEffect::PulseZoom,
        MotionEffect::Static,
    ];

    /// Identifier used in logs and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            MotionEffect::ZoomCenter => "zoom_center",
            MotionEffect::ZoomLeft => "zoom_left",
            MotionEffect::ZoomRight => "zoom_right",
            MotionEffect::ZoomTop => "zoom_top",
            MotionEffect::ZoomBottom => "zoom_bottom",
            MotionEffect::PanLeftZoom => "pan_left_zoom",
            MotionEffect::PanRightZoom => "pan_right_zoom",
            MotionEffect::PanUpZoom => "pan_up_zoom",
            MotionEffect::PanDownZoom => "pan_down_zoom",
            MotionEffect::SwayHorizontalZoom => "sway_horizontal_zoom",
            MotionEffect::SwayVerticalZoom => "sway_vertical_zoom",
            MotionEffect::SwayDiagonalZoom => "sway_diagonal_zoom",
            MotionEffect::SpiralZoom => "spiral_zoom",
            MotionEffect::WaveZoom => "wave_zoom",
            MotionEffect::OrbitZoom => "orbit_zoom",
            MotionEffect::BreathingCenter => "breathing_center",
            MotionEffect::BreathingCorners => "breathing_corners",
            MotionEffect::PulseZoom => "pulse_zoom",
            MotionEffect::Static => "static",
        }
    }

    /// Whether the effect belongs to the zoom-about-point family
    pub fn is_point_zoom(&self) -> bool {
        matches!(
            self,
            MotionEffect::ZoomCenter
                | MotionEffect::ZoomLeft
                | MotionEffect::ZoomRight
                | MotionEffect::ZoomTop
                | MotionEffect::ZoomBottom
        )
    }

    /// Zoom anchor as a fraction of the frame size
    fn anchor(&self) -> (f64, f64) {
        match self {
            MotionEffect::ZoomLeft => (1.0 / 3.0, 0.5),
            MotionEffect::ZoomRight => (2.0 / 3.0, 0.5),
            MotionEffect::ZoomTop => (0.5, 1.0 / 3.0),
            MotionEffect::ZoomBottom => (0.5, 2.0 / 3.0),
            _ => (0.5, 0.5),
        }
    }
}

impl fmt::Display for MotionEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transform of one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionParameters {
    /// Uniform scale, within `[1, 1 + max_zoom]`
    pub scale: f64,
    /// Horizontal displacement in pixels
    pub translate_x: f64,
    /// Vertical displacement in pixels
    pub translate_y: f64,
    /// Counter-clockwise rotation in degrees
    pub rotation: f64,
    /// Scale/rotation anchor as a fraction of the frame size
    pub anchor: (f64, f64),
}

impl MotionParameters {
    /// The identity transform
    pub fn identity() -> Self {
        Self { scale: 1.0, translate_x: 0.0, translate_y: 0.0, rotation: 0.0, anchor: (0.5, 0.5) }
    }
}

/// Motion amplitude limits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionConfig {
    /// Maximum additional zoom
    pub max_zoom: f64,
    /// Maximum displacement in pixels
    pub max_pixel_pan: f64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self { max_zoom: 0.2, max_pixel_pan: 40.0 }
    }
}

/// Ease-in-out sine curve
pub fn ease_in_out_sine(progress: f64) -> f64 {
    -((PI * progress).cos() - 1.0) / 2.0
}

/// Maps (effect, progress) to frame transforms
#[derive(Debug, Clone, Copy, Default)]
pub struct MotionEngine {
    config: MotionConfig,
}

impl MotionEngine {
    /// Create an engine with the given limits
    pub fn new(config: MotionConfig) -> Self {
        Self { config }
    }

    /// Limits in use
    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    /// Compute the transform for `effect` at `progress` (clamped to `[0, 1]`)
    pub fn parameters(&self, effect: MotionEffect, progress: f64) -> MotionParameters {
        let progress = if progress.is_finite() { progress.clamp(0.0, 1.0) } else { 0.0 };
        let s = ease_in_out_sine(progress);
        let zoom = self.config.max_zoom;
        let pan = self.config.max_pixel_pan;

        // Raised-cosine oscillation in [0, 1], zero at both ends
        let breath = (1.0 - (2.0 * PI * s).cos()) / 2.0;

        let mut params = MotionParameters { anchor: effect.anchor(), ..MotionParameters::identity() };

        match effect {
            MotionEffect::Static => {
                params.scale = 1.0 + 0.01 * breath;
            }
            MotionEffect::ZoomCenter
            | MotionEffect::ZoomLeft
            | MotionEffect::ZoomRight
            | MotionEffect::ZoomTop
            | MotionEffect::ZoomBottom => {
                params.scale = 1.0 + zoom * (PI * s).sin();
            }
            MotionEffect::PanLeftZoom
            | MotionEffect::PanRightZoom
            | MotionEffect::PanUpZoom
            | MotionEffect::PanDownZoom => {
                params.scale = 1.05 + zoom * 0.3 * (0.5 * PI * s).sin();
                let shift = pan * (PI * s).sin();
                match effect {
                    MotionEffect::PanLeftZoom => params.translate_x = -shift,
                    MotionEffect::PanRightZoom => params.translate_x = shift,
                    MotionEffect::PanUpZoom => params.translate_y = -shift,
                    _ => params.translate_y = shift,
                }
            }
            MotionEffect::SwayHorizontalZoom | MotionEffect::SwayVerticalZoom | MotionEffect::SwayDiagonalZoom => {
                let sway = (3.0 * PI * s).sin() * 0.3;
                params.scale = 1.05 + zoom * 0.2 * (0.5 * PI * s).sin();
                match effect {
                    MotionEffect::SwayHorizontalZoom => params.translate_x = pan * 0.5 * sway,
                    MotionEffect::SwayVerticalZoom => params.translate_y = pan * 0.5 * sway,
                    _ => {
                        params.translate_x = pan * 0.3 * sway;
                        params.translate_y = pan * 0.3 * sway * (2.0 * PI * s).cos();
                    }
                }
            }
            MotionEffect::SpiralZoom => {
                let angle = 2.0 * PI * s;
                params.scale = 1.05 + zoom * 0.2 * (PI * s).sin();
                params.translate_x = pan * 0.3 * angle.cos() * s;
                params.translate_y = pan * 0.3 * angle.sin() * s;
                params.rotation = 2.0 * s;
            }
            MotionEffect::WaveZoom => {
                params.scale = 1.05 + zoom * 0.15 * (PI * s).sin();
                params.translate_x = pan * 0.4 * (2.0 * PI * s).sin();
                params.translate_y = pan * 0.3 * (1.5 * PI * s).cos();
            }
            MotionEffect::OrbitZoom => {
                let angle = PI * s;
                let radius = pan * 0.4;
                params.scale = 1.05 + zoom * 0.2 * (0.5 * PI * s).sin();
                params.translate_x = radius * angle.cos() * s;
                params.translate_y = radius * angle.sin() * s;
            }
            MotionEffect::BreathingCenter => {
                params.scale = 1.0 + zoom * 0.15 * breath;
            }
            MotionEffect::BreathingCorners => {
                let direction = if progress > 0.5 { 1.0 } else { -1.0 };
                params.scale = 1.05 + zoom * 0.1 * breath;
                params.translate_x = pan * 0.2 * breath * direction;
                params.translate_y = pan * 0.2 * breath * direction;
            }
            MotionEffect::PulseZoom => {
                let pulse = (4.0 * PI * s).sin() * 0.5 + 0.5;
                params.scale = 1.05 + zoom * (0.1 * (PI * s).sin() + 0.05 * pulse);
            }
        }

        params.scale = params.scale.clamp(1.0, 1.0 + zoom);
        params.translate_x = params.translate_x.clamp(-pan, pan);
        params.translate_y = params.translate_y.clamp(-pan, pan);
        params
    }
}

/// 2x3 affine matrix mapping source coordinates to destination coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform {
    pub m: [[f64; 3]; 2],
}

impl AffineTransform {
    /// Build the transform for a frame of the given size
    pub fn from_parameters(params: &MotionParameters, width: u32, height: u32) -> Self {
        let cx = params.anchor.0 * width as f64;
        let cy = params.anchor.1 * height as f64;
        let s = params.scale;

        if params.rotation != 0.0 {
            let theta = params.rotation.to_radians();
            let alpha = s * theta.cos();
            let beta = s * theta.sin();
            Self {
                m: [
                    [alpha, beta, (1.0 - alpha) * cx - beta * cy + params.translate_x],
                    [-beta, alpha, beta * cx + (1.0 - alpha) * cy + params.translate_y],
                ],
            }
        } else {
            Self {
                m: [
                    [s, 0.0, cx * (1.0 - s) + params.translate_x],
                    [0.0, s, cy * (1.0 - s) + params.translate_y],
                ],
            }
        }
    }

    /// Map a point through the transform
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let m = &self.m;
        (m[0][0] * x + m[0][1] * y + m[0][2], m[1][0] * x + m[1][1] * y + m[1][2])
    }

    /// Inverse transform, `None` when the matrix is singular
    pub fn inverse(&self) -> Option<Self> {
        let [[a, b, c], [d, e, f]] = self.m;
        let det = a * e - b * d;
        if det.abs() < f64::EPSILON {
            return None;
        }
        let inv_a = e / det;
        let inv_b = -b / det;
        let inv_d = -d / det;
        let inv_e = a / det;
        Some(Self {
            m: [
                [inv_a, inv_b, -(inv_a * c + inv_b * f)],
                [inv_d, inv_e, -(inv_d * c + inv_e * f)],
            ],
        })
    }
}

/// Reflect an index into `[0, len)` without repeating the edge pixel
fn reflect_101(index: i64, len: i64) -> i64 {
    if len == 1 {
        return 0;
    }
    let period = 2 * (len - 1);
    let wrapped = index.rem_euclid(period);
    if wrapped < len { wrapped } else { period - wrapped }
}

/// Apply motion parameters to a frame, producing a frame of the same size
pub fn warp_frame(source: &RgbImage, params: &MotionParameters) -> RgbImage {
    let (width, height) = source.dimensions();
    let mut output = RgbImage::new(width, height);
    if width == 0 || height == 0 {
        return output;
    }

    let forward = AffineTransform::from_parameters(params, width, height);
    let Some(inverse) = forward.inverse() else {
        return source.clone();
    };

    let (w, h) = (width as i64, height as i64);
    let sample = |x: i64, y: i64| -> Rgb<u8> { *source.get_pixel(reflect_101(x, w) as u32, reflect_101(y, h) as u32) };

    for (x, y, pixel) in output.enumerate_pixels_mut() {
        let (sx, sy) = inverse.apply(x as f64, y as f64);
        let x0 = sx.floor();
        let y0 = sy.floor();
        let fx = sx - x0;
        let fy = sy - y0;
        let (x0, y0) = (x0 as i64, y0 as i64);

        let p00 = sample(x0, y0);
        let p10 = sample(x0 + 1, y0);
        let p01 = sample(x0, y0 + 1);
        let p11 = sample(x0 + 1, y0 + 1);

        for channel in 0..3 {
            let top = p00[channel] as f64 * (1.0 - fx) + p10[channel] as f64 * fx;
            let bottom = p01[channel] as f64 * (1.0 - fx) + p11[channel] as f64 * fx;
            let value = top * (1.0 - fy) + bottom * fy;
            pixel[channel] = value.round().clamp(0.0, 255.0) as u8;
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_ease_curve_endpoints() {
        assert!(approx(ease_in_out_sine(0.0), 0.0));
        assert!(approx(ease_in_out_sine(0.5), 0.5));
        assert!(approx(ease_in_out_sine(1.0), 1.0));
    }

    #[test]
    fn test_zoom_family_returns_to_unit_scale_at_both_ends() {
        let engine = MotionEngine::default();
        for effect in MotionEffect::ALL.iter().filter(|e| e.is_point_zoom()) {
            assert!(approx(engine.parameters(*effect, 0.0).scale, 1.0), "{} at 0", effect);
            assert!(approx(engine.parameters(*effect, 1.0).scale, 1.0), "{} at 1", effect);
            assert!(approx(engine.parameters(*effect, 0.5).scale, 1.2), "{} at 0.5", effect);
        }
    }

    #[test]
    fn test_every_effect_stays_within_bounds() {
        let engine = MotionEngine::default();
        for effect in MotionEffect::ALL {
            for step in 0..=100 {
                let params = engine.parameters(effect, step as f64 / 100.0);
                assert!((1.0..=1.2).contains(&params.scale), "{} scale {}", effect, params.scale);
                assert!(params.translate_x.abs() <= 40.0);
                assert!(params.translate_y.abs() <= 40.0);
            }
        }
    }

    #[test]
    fn test_parameters_are_deterministic() {
        let engine = MotionEngine::default();
        for effect in MotionEffect::ALL {
            assert_eq!(engine.parameters(effect, 0.37), engine.parameters(effect, 0.37));
        }
    }

    #[test]
    fn test_pan_left_moves_left_at_midpoint() {
        let params = MotionEngine::default().parameters(MotionEffect::PanLeftZoom, 0.5);
        assert!(approx(params.translate_x, -40.0));
        assert_eq!(params.translate_y, 0.0);
    }

    #[test]
    fn test_spiral_rotates_with_progress() {
        let engine = MotionEngine::default();
        assert_eq!(engine.parameters(MotionEffect::SpiralZoom, 0.0).rotation, 0.0);
        assert!(approx(engine.parameters(MotionEffect::SpiralZoom, 1.0).rotation, 2.0));
    }

    #[test]
    fn test_zoom_left_anchors_at_left_third() {
        let params = MotionEngine::default().parameters(MotionEffect::ZoomLeft, 0.5);
        let transform = AffineTransform::from_parameters(&params, 300, 100);
        let (x, y) = transform.apply(100.0, 50.0);
        assert!(approx(x, 100.0));
        assert!(approx(y, 50.0));
    }

    #[test]
    fn test_inverse_round_trips_points() {
        let params = MotionParameters { scale: 1.1, translate_x: 5.0, translate_y: -3.0, rotation: 1.5, anchor: (0.5, 0.5) };
        let forward = AffineTransform::from_parameters(&params, 64, 48);
        let inverse = forward.inverse().unwrap();
        let (x, y) = forward.apply(10.0, 20.0);
        let (bx, by) = inverse.apply(x, y);
        assert!((bx - 10.0).abs() < 1e-6);
        assert!((by - 20.0).abs() < 1e-6);
    }

    #[test]
    fn test_reflect_101_mirrors_without_edge_repeat() {
        assert_eq!(reflect_101(-1, 5), 1);
        assert_eq!(reflect_101(-2, 5), 2);
        assert_eq!(reflect_101(5, 5), 3);
        assert_eq!(reflect_101(6, 5), 2);
        assert_eq!(reflect_101(3, 5), 3);
        assert_eq!(reflect_101(7, 1), 0);
    }

    #[test]
    fn test_warp_with_identity_keeps_pixels() {
        let mut image = RgbImage::new(4, 3);
        for (x, y, pixel) in image.enumerate_pixels_mut() {
            *pixel = Rgb([(x * 40) as u8, (y * 60) as u8, 7]);
        }
        let warped = warp_frame(&image, &MotionParameters::identity());
        assert_eq!(warped, image);
    }
}
