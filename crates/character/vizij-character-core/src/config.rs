//! Core configuration for vizij-character-core.

use serde::{Deserialize, Serialize};

use crate::error::AnimationError;
use crate::interp::Easing;

/// Configuration for an `AnimationFeature`.
/// Every field has a default so partial JSON documents are accepted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Easing used by transitions that do not name one.
    pub default_easing: Easing,
    /// Scale override states down when their summed weight exceeds 1.
    pub normalize_override: bool,
    /// Weights at or below this count as no influence when pruning.
    pub prune_epsilon: f32,
    /// Clamp long frames (e.g. after a stall) to this many milliseconds.
    pub max_delta_ms: Option<f32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_easing: Easing::Linear,
            normalize_override: true,
            prune_epsilon: 1e-4,
            max_delta_ms: None,
        }
    }
}

impl Config {
    pub fn from_json(text: &str) -> Result<Self, AnimationError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Apply `max_delta_ms` and drop negative or non-finite deltas.
    #[inline]
    pub fn clamp_delta(&self, delta_ms: f32) -> f32 {
        if !delta_ms.is_finite() || delta_ms <= 0.0 {
            return 0.0;
        }
        match self.max_delta_ms {
            Some(max) if max >= 0.0 => delta_ms.min(max),
            _ => delta_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_is_default() {
        assert_eq!(Config::from_json("{}").unwrap(), Config::default());
    }

    #[test]
    fn clamp_delta_handles_stalls_and_garbage() {
        let cfg = Config {
            max_delta_ms: Some(50.0),
            ..Config::default()
        };
        assert_eq!(cfg.clamp_delta(16.0), 16.0);
        assert_eq!(cfg.clamp_delta(400.0), 50.0);
        assert_eq!(cfg.clamp_delta(-3.0), 0.0);
        assert_eq!(cfg.clamp_delta(f32::NAN), 0.0);
        assert_eq!(Config::default().clamp_delta(400.0), 400.0);
    }
}
