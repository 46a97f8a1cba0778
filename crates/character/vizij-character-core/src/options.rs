//! Registration options for animation states.

use serde::{Deserialize, Serialize};

use crate::error::AnimationError;

/// How a state's pose combines with the others on the layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlendMode {
    /// Weighted replacement; override weights share the layer's influence.
    #[default]
    Override,
    /// Added on top of the override result at full layer weight.
    Additive,
}

/// Options accepted by `AnimationFeature::register_state`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateOptions {
    /// Clip name handed to the binding factory.
    pub clip: String,
    /// Number of plays before finishing; 0 repeats forever, 1 plays once.
    #[serde(default)]
    pub loop_count: u32,
    #[serde(default = "default_time_scale")]
    pub time_scale: f32,
    #[serde(default)]
    pub weight: f32,
    #[serde(default)]
    pub blend_mode: BlendMode,
}

fn default_time_scale() -> f32 {
    1.0
}

impl StateOptions {
    pub fn new(clip: impl Into<String>) -> Self {
        Self {
            clip: clip.into(),
            loop_count: 0,
            time_scale: default_time_scale(),
            weight: 0.0,
            blend_mode: BlendMode::Override,
        }
    }

    #[inline]
    pub fn with_loop_count(mut self, loop_count: u32) -> Self {
        self.loop_count = loop_count;
        self
    }

    /// Negative values play the clip in reverse.
    #[inline]
    pub fn with_time_scale(mut self, time_scale: f32) -> Self {
        self.time_scale = time_scale;
        self
    }

    #[inline]
    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    #[inline]
    pub fn with_blend_mode(mut self, blend_mode: BlendMode) -> Self {
        self.blend_mode = blend_mode;
        self
    }

    pub fn from_json(text: &str) -> Result<Self, AnimationError> {
        Ok(serde_json::from_str(text)?)
    }
}
