//! Easing curves mapping elapsed fraction to progress.

use std::fmt;
use std::sync::Arc;

#[derive(Clone, Default)]
pub enum TimingFunction {
    #[default]
    Linear,
    /// Quadratic acceleration
    EaseIn,
    /// Quadratic deceleration
    EaseOut,
    EaseInOut,
    /// Control points `(x1, y1, x2, y2)` of a unit cubic bezier, as in CSS
    /// `cubic-bezier()`
    CubicBezier(f32, f32, f32, f32),
    /// Jumps in `n` equal steps, holding each value until the step ends
    Steps(u32),
    Custom(Arc<dyn Fn(f32) -> f32 + Send + Sync>),
}

impl TimingFunction {
    /// CSS `ease`.
    pub const EASE: TimingFunction = TimingFunction::CubicBezier(0.25, 0.1, 0.25, 1.0);

    pub fn custom(curve: impl Fn(f32) -> f32 + Send + Sync + 'static) -> Self {
        TimingFunction::Custom(Arc::new(curve))
    }

    /// Progress at elapsed fraction `t`, which is clamped to `[0, 1]`.
    /// Bezier and custom curves may overshoot.
    pub fn evaluate(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            TimingFunction::Linear => t,
            TimingFunction::EaseIn => t * t,
            TimingFunction::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
            TimingFunction::EaseInOut if t < 0.5 => 2.0 * t * t,
            TimingFunction::EaseInOut => 1.0 - 2.0 * (1.0 - t) * (1.0 - t),
            TimingFunction::CubicBezier(x1, y1, x2, y2) => {
                let s = solve_bezier_x(t, *x1, *x2);
                bezier_axis(s, *y1, *y2)
            }
            TimingFunction::Steps(0) => t,
            TimingFunction::Steps(n) => {
                let n = *n as f32;
                (t * n).floor().min(n) / n
            }
            TimingFunction::Custom(curve) => curve(t),
        }
    }
}

impl fmt::Debug for TimingFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimingFunction::Linear => f.write_str("Linear"),
            TimingFunction::EaseIn => f.write_str("EaseIn"),
            TimingFunction::EaseOut => f.write_str("EaseOut"),
            TimingFunction::EaseInOut => f.write_str("EaseInOut"),
            TimingFunction::CubicBezier(x1, y1, x2, y2) => f
                .debug_tuple("CubicBezier")
                .field(x1)
                .field(y1)
                .field(x2)
                .field(y2)
                .finish(),
            TimingFunction::Steps(n) => f.debug_tuple("Steps").field(n).finish(),
            TimingFunction::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Curve parameter whose x coordinate is `x`. Newton iterations, falling
/// back to bisection where the slope flattens out.
fn solve_bezier_x(x: f32, x1: f32, x2: f32) -> f32 {
    let mut s = x;
    for _ in 0..8 {
        let error = bezier_axis(s, x1, x2) - x;
        if error.abs() < 1e-5 {
            return s;
        }
        let slope = bezier_axis_slope(s, x1, x2);
        if slope.abs() < 1e-6 {
            break;
        }
        s -= error / slope;
    }

    let (mut lo, mut hi) = (0.0f32, 1.0f32);
    s = x;
    for _ in 0..32 {
        let value = bezier_axis(s, x1, x2);
        if (value - x).abs() < 1e-5 {
            break;
        }
        if value < x {
            lo = s;
        } else {
            hi = s;
        }
        s = (lo + hi) / 2.0;
    }
    s
}

/// One axis of a bezier running from 0 to 1 through control values `c1`, `c2`.
fn bezier_axis(s: f32, c1: f32, c2: f32) -> f32 {
    let inv = 1.0 - s;
    3.0 * inv * inv * s * c1 + 3.0 * inv * s * s * c2 + s * s * s
}

fn bezier_axis_slope(s: f32, c1: f32, c2: f32) -> f32 {
    let inv = 1.0 - s;
    3.0 * inv * inv * c1 + 6.0 * inv * s * (c2 - c1) + 3.0 * s * s * (1.0 - c2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_are_fixed() {
        let curves = [
            TimingFunction::Linear,
            TimingFunction::EaseIn,
            TimingFunction::EaseOut,
            TimingFunction::EaseInOut,
            TimingFunction::EASE,
            TimingFunction::Steps(4),
        ];
        for curve in curves {
            assert!(curve.evaluate(0.0).abs() < 1e-4, "{curve:?} at 0");
            assert!((curve.evaluate(1.0) - 1.0).abs() < 1e-4, "{curve:?} at 1");
        }
    }

    #[test]
    fn test_ease_shapes() {
        assert!(TimingFunction::EaseIn.evaluate(0.5) < 0.5);
        assert!(TimingFunction::EaseOut.evaluate(0.5) > 0.5);
        assert_eq!(TimingFunction::EaseInOut.evaluate(0.5), 0.5);
        assert!(TimingFunction::EASE.evaluate(0.5) > 0.5);
    }

    #[test]
    fn test_out_of_range_input_is_clamped() {
        assert_eq!(TimingFunction::EaseIn.evaluate(3.0), 1.0);
        assert_eq!(TimingFunction::EaseOut.evaluate(-0.5), 0.0);
    }

    #[test]
    fn test_steps_hold_values() {
        let steps = TimingFunction::Steps(4);
        assert_eq!(steps.evaluate(0.1), 0.0);
        assert_eq!(steps.evaluate(0.3), 0.25);
        assert_eq!(steps.evaluate(0.99), 0.75);
    }

    #[test]
    fn test_custom_curve() {
        let curve = TimingFunction::custom(|t| t.sqrt());
        assert_eq!(curve.evaluate(0.25), 0.5);
    }
}
