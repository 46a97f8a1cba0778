use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AnimationError;

/// Lifecycle position of an animation state
///
/// `Idle → Playing → {Paused ⇄ Playing} → Finished | Cancelled | Stopped`.
/// Every terminal accepts a fresh `play`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PlaybackState {
    /// Registered, never played
    #[default]
    Idle,
    /// Clip time is advancing
    Playing,
    /// Paused by the caller; pending work is kept
    Paused,
    /// Reached its natural end
    Finished,
    /// Pending work was cancelled
    Cancelled,
    /// Stopped and rewound
    Stopped,
}

impl PlaybackState {
    /// Get the name of this playback state
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Finished => "finished",
            Self::Cancelled => "cancelled",
            Self::Stopped => "stopped",
        }
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        matches!(self, Self::Playing)
    }

    #[inline]
    pub fn can_pause(&self) -> bool {
        matches!(self, Self::Playing)
    }

    /// Terminal for the current play; a new `play` is required to continue.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Cancelled | Self::Stopped)
    }
}

impl FromStr for PlaybackState {
    type Err = AnimationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(Self::Idle),
            "playing" => Ok(Self::Playing),
            "paused" => Ok(Self::Paused),
            "finished" => Ok(Self::Finished),
            "cancelled" => Ok(Self::Cancelled),
            "stopped" => Ok(Self::Stopped),
            other => Err(AnimationError::new(format!(
                "unknown playback state '{other}'"
            ))),
        }
    }
}
