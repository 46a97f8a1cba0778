//! Error types for animation states and their bindings

use serde::{Deserialize, Serialize};

/// Failure reported by an engine binding while applying a change to a playable resource.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum BindingError {
    /// The clip has no usable duration, so time cannot be mapped
    #[error("Clip '{clip}' has no duration")]
    MissingDuration { clip: String },

    /// The binding factory does not know the clip
    #[error("Unknown clip: {clip}")]
    UnknownClip { clip: String },

    /// The resource was already released back to the engine
    #[error("Clip '{clip}' has been released")]
    Released { clip: String },

    /// Engine specific failure
    #[error("Binding for clip '{clip}' failed: {reason}")]
    Failed { clip: String, reason: String },
}

/// Comprehensive error type for animation feature operations
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum AnimationError {
    /// A state is already registered under this name
    #[error("Animation state already exists: {name}")]
    DuplicateState { name: String },

    /// No state is registered under this name
    #[error("Animation state not found: {name}")]
    UnknownState { name: String },

    /// Transition parameters were rejected
    #[error("Invalid transition: {reason}")]
    InvalidTransition { reason: String },

    /// The playable resource failed to apply a change
    #[error(transparent)]
    Binding(#[from] BindingError),

    /// Serialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Generic animation error
    #[error("Animation error: {message}")]
    Generic { message: String },
}

impl AnimationError {
    /// Create a new generic error
    pub fn new(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    #[inline]
    pub fn invalid_transition(reason: impl Into<String>) -> Self {
        Self::InvalidTransition {
            reason: reason.into(),
        }
    }

    /// Check if this is a recoverable error
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::InvalidTransition { .. } | Self::Binding(_))
    }

    /// Get error category for logging
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::DuplicateState { .. } | Self::UnknownState { .. } => "registry",
            Self::InvalidTransition { .. } => "validation",
            Self::Binding(_) => "binding",
            Self::SerializationError { .. } => "serialization",
            Self::Generic { .. } => "generic",
        }
    }
}

impl From<serde_json::Error> for AnimationError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError {
            reason: err.to_string(),
        }
    }
}
