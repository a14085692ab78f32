// extensions/easing.rs
//
// Easing curves that shape a dash's displacement over time.
// Pure math: progress in [0, 1] -> normalized distance.

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Step used for the numeric derivative.
const DERIVATIVE_STEP: f32 = 1.0e-3;

/// Named displacement curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    /// Constant speed.
    #[default]
    Linear,
    QuadIn,
    QuadOut,
    QuadInOut,
    CubicIn,
    CubicOut,
    CubicInOut,
    QuartIn,
    QuartOut,
    QuartInOut,
    SineIn,
    SineOut,
    SineInOut,
    /// Explosive start, long tail. Steep near 1.
    ExpoIn,
    ExpoOut,
    ExpoInOut,
    /// Pulls back before launching.
    BackIn,
    /// Overshoots the target and settles back.
    BackOut,
    BackInOut,
    BounceOut,
    ElasticOut,
}

impl Easing {
    /// Normalized distance covered at progress `t`. `t` is clamped to [0, 1];
    /// every curve maps 0 to 0 and 1 to 1 (Back and Elastic overshoot in between).
    #[inline]
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,

            Easing::QuadIn => t * t,
            Easing::QuadOut => 1.0 - (1.0 - t).powi(2),
            Easing::QuadInOut => in_out(t, |u| u * u),

            Easing::CubicIn => t.powi(3),
            Easing::CubicOut => 1.0 - (1.0 - t).powi(3),
            Easing::CubicInOut => in_out(t, |u| u.powi(3)),

            Easing::QuartIn => t.powi(4),
            Easing::QuartOut => 1.0 - (1.0 - t).powi(4),
            Easing::QuartInOut => in_out(t, |u| u.powi(4)),

            Easing::SineIn => 1.0 - (t * PI / 2.0).cos(),
            Easing::SineOut => (t * PI / 2.0).sin(),
            Easing::SineInOut => -((PI * t).cos() - 1.0) / 2.0,

            Easing::ExpoIn => expo_in(t),
            Easing::ExpoOut => 1.0 - expo_in(1.0 - t),
            Easing::ExpoInOut => in_out(t, expo_in),

            Easing::BackIn => back_in(t),
            Easing::BackOut => 1.0 - back_in(1.0 - t),
            Easing::BackInOut => {
                const C2: f32 = 1.70158 * 1.525;
                if t < 0.5 {
                    (2.0 * t).powi(2) * ((C2 + 1.0) * 2.0 * t - C2) / 2.0
                } else {
                    ((2.0 * t - 2.0).powi(2) * ((C2 + 1.0) * (t * 2.0 - 2.0) + C2) + 2.0) / 2.0
                }
            }

            Easing::BounceOut => bounce_out(t),

            Easing::ElasticOut => {
                const C4: f32 = (2.0 * PI) / 3.0;
                if t <= 0.0 {
                    0.0
                } else if t >= 1.0 {
                    1.0
                } else {
                    2.0_f32.powf(-10.0 * t) * ((t * 10.0 - 0.75) * C4).sin() + 1.0
                }
            }
        }
    }

    /// Slope of the curve at `t`, by finite differences inside [0, 1].
    ///
    /// One-sided at the ends, so curves with a jump at a boundary (`ExpoIn`
    /// snapping to 1) produce a very large or non-finite value; callers clamp.
    pub fn derivative(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        let lo = (t - DERIVATIVE_STEP).max(0.0);
        let hi = (t + DERIVATIVE_STEP).min(1.0);
        let span = hi - lo;
        if span <= 0.0 {
            return 0.0;
        }
        (self.apply(hi) - self.apply(lo)) / span
    }
}

/// Mirror an "in" curve into an in-out curve.
#[inline]
fn in_out(t: f32, f: impl Fn(f32) -> f32) -> f32 {
    if t < 0.5 {
        f(2.0 * t) / 2.0
    } else {
        1.0 - f(2.0 - 2.0 * t) / 2.0
    }
}

#[inline]
fn expo_in(t: f32) -> f32 {
    if t <= 0.0 {
        0.0
    } else {
        2.0_f32.powf(10.0 * t - 10.0)
    }
}

#[inline]
fn back_in(t: f32) -> f32 {
    const C1: f32 = 1.70158;
    const C3: f32 = C1 + 1.0;
    C3 * t * t * t - C1 * t * t
}

#[inline]
fn bounce_out(t: f32) -> f32 {
    const N1: f32 = 7.5625;
    const D1: f32 = 2.75;

    if t < 1.0 / D1 {
        N1 * t * t
    } else if t < 2.0 / D1 {
        let t = t - 1.5 / D1;
        N1 * t * t + 0.75
    } else if t < 2.5 / D1 {
        let t = t - 2.25 / D1;
        N1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / D1;
        N1 * t * t + 0.984375
    }
}
