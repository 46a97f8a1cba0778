//! Vizij Character Core (engine-agnostic)
//!
//! Animation layering for a virtual character host: named clip states with a
//! play/pause/resume/cancel/stop lifecycle, eased weight and time-scale
//! transitions, per-layer weight composition, and Deferred completion handles.
//! The rendering engine is reached only through the [`Playable`] and
//! [`BindingFactory`] traits; [`SimulatedMixer`] is a headless implementation.

pub mod binding;
pub mod clip;
pub mod config;
pub mod deferred;
pub mod error;
pub mod events;
pub mod feature;
pub mod host;
pub mod interp;
pub mod messenger;
pub mod options;
pub mod playback_state;
pub mod state;

// Re-exports for hosts and adapters
pub use binding::{BindingFactory, BindingGuard, CompletionSink, Playable, ResourceId};
pub use clip::{SimulatedClip, SimulatedMixer};
pub use config::Config;
pub use deferred::{Callbacks, Deferred, DeferredStatus};
pub use error::{AnimationError, BindingError};
pub use events::AnimationEvent;
pub use feature::{AnimationFeature, StateFailure, TickReport};
pub use host::{HostFeature, HostObject};
pub use interp::{Easing, InterpStatus, Interpolator, Lerp};
pub use messenger::{Message, Messenger, SubscriptionId};
pub use options::{BlendMode, StateOptions};
pub use playback_state::PlaybackState;
pub use state::{AnimationState, PendingKind};

pub type Result<T> = core::result::Result<T, AnimationError>;
