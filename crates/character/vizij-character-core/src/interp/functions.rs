//! Interpolation helpers:
//! - `Lerp` for scalars and small fixed vectors (component-wise)
//! - `Easing` curves mapping normalized progress to blend amount
//!
//! Every easing here is monotonic on [0, 1] with `apply(0) == 0` and
//! `apply(1) == 1`, so transitions never overshoot their target.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AnimationError;

/// Linear interpolation of scalars.
#[inline]
pub fn lerp_f32(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[inline]
pub fn lerp_vec2(a: [f32; 2], b: [f32; 2], t: f32) -> [f32; 2] {
    [lerp_f32(a[0], b[0], t), lerp_f32(a[1], b[1], t)]
}

#[inline]
pub fn lerp_vec3(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
    [
        lerp_f32(a[0], b[0], t),
        lerp_f32(a[1], b[1], t),
        lerp_f32(a[2], b[2], t),
    ]
}

#[inline]
pub fn lerp_vec4(a: [f32; 4], b: [f32; 4], t: f32) -> [f32; 4] {
    [
        lerp_f32(a[0], b[0], t),
        lerp_f32(a[1], b[1], t),
        lerp_f32(a[2], b[2], t),
        lerp_f32(a[3], b[3], t),
    ]
}

/// Values an [`Interpolator`](super::Interpolator) can blend.
pub trait Lerp: Copy {
    fn lerp(self, to: Self, t: f32) -> Self;
}

impl Lerp for f32 {
    #[inline]
    fn lerp(self, to: Self, t: f32) -> Self {
        lerp_f32(self, to, t)
    }
}

impl Lerp for [f32; 2] {
    #[inline]
    fn lerp(self, to: Self, t: f32) -> Self {
        lerp_vec2(self, to, t)
    }
}

impl Lerp for [f32; 3] {
    #[inline]
    fn lerp(self, to: Self, t: f32) -> Self {
        lerp_vec3(self, to, t)
    }
}

impl Lerp for [f32; 4] {
    #[inline]
    fn lerp(self, to: Self, t: f32) -> Self {
        lerp_vec4(self, to, t)
    }
}

/// Easing curves for timed transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Easing {
    #[default]
    Linear,
    QuadraticIn,
    QuadraticOut,
    QuadraticInOut,
    CubicIn,
    CubicOut,
    CubicInOut,
    SineIn,
    SineOut,
    SineInOut,
}

impl Easing {
    /// Apply the curve to normalized progress. Input is clamped to [0, 1].
    #[inline]
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,

            Easing::QuadraticIn => t * t,
            Easing::QuadraticOut => t * (2.0 - t),
            Easing::QuadraticInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }

            Easing::CubicIn => t * t * t,
            Easing::CubicOut => {
                let u = t - 1.0;
                u * u * u + 1.0
            }
            Easing::CubicInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let u = 2.0 * t - 2.0;
                    1.0 + u * u * u / 2.0
                }
            }

            Easing::SineIn => 1.0 - (t * std::f32::consts::FRAC_PI_2).cos(),
            Easing::SineOut => (t * std::f32::consts::FRAC_PI_2).sin(),
            Easing::SineInOut => 0.5 * (1.0 - (std::f32::consts::PI * t).cos()),
        }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::QuadraticIn => "quadratic_in",
            Self::QuadraticOut => "quadratic_out",
            Self::QuadraticInOut => "quadratic_in_out",
            Self::CubicIn => "cubic_in",
            Self::CubicOut => "cubic_out",
            Self::CubicInOut => "cubic_in_out",
            Self::SineIn => "sine_in",
            Self::SineOut => "sine_out",
            Self::SineInOut => "sine_in_out",
        }
    }
}

impl FromStr for Easing {
    type Err = AnimationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let easing = match s.to_lowercase().as_str() {
            "linear" => Self::Linear,
            "quadratic_in" => Self::QuadraticIn,
            "quadratic_out" => Self::QuadraticOut,
            "quadratic_in_out" => Self::QuadraticInOut,
            "cubic_in" => Self::CubicIn,
            "cubic_out" => Self::CubicOut,
            "cubic_in_out" => Self::CubicInOut,
            "sine_in" => Self::SineIn,
            "sine_out" => Self::SineOut,
            "sine_in_out" => Self::SineInOut,
            other => return Err(AnimationError::new(format!("unknown easing '{other}'"))),
        };
        Ok(easing)
    }
}
