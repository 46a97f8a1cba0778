//! Binding contracts between animation states and the rendering engine.
//!
//! The engine owns clip playback; a state drives one [`Playable`] resource and
//! learns about natural completion through a [`CompletionSink`] handed to
//! [`Playable::advance`]. Adapters (three.js-style mixers, Bevy, the headless
//! [`SimulatedMixer`](crate::clip::SimulatedMixer)) implement these traits.

use serde::{Deserialize, Serialize};

use crate::error::BindingError;
use crate::options::BlendMode;

/// Opaque identity of a playable resource, unique per factory.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ResourceId(pub u32);

/// Receives "finished" notifications from a binding.
pub trait CompletionSink {
    fn finished(&mut self, resource: ResourceId);
}

impl CompletionSink for Vec<ResourceId> {
    fn finished(&mut self, resource: ResourceId) {
        self.push(resource);
    }
}

/// One playable clip resource provided by the rendering collaborator.
/// Times are in seconds.
pub trait Playable {
    fn id(&self) -> ResourceId;
    fn clip_name(&self) -> &str;

    fn set_enabled(&mut self, enabled: bool);
    fn is_enabled(&self) -> bool;
    fn set_paused(&mut self, paused: bool);
    fn is_paused(&self) -> bool;

    /// Start running from the current time.
    fn start(&mut self);
    /// Rewind to the start for the current direction, reset the repetition
    /// counter and start running.
    fn restart(&mut self);

    fn time(&self) -> f32;
    fn set_time(&mut self, seconds: f32) -> Result<(), BindingError>;
    /// Clip length, `None` when the engine does not know it.
    fn duration(&self) -> Option<f32>;

    fn set_time_scale(&mut self, time_scale: f32);
    fn set_effective_weight(&mut self, weight: f32);
    fn effective_weight(&self) -> f32;
    /// 0 repeats forever, 1 plays once.
    fn set_repetitions(&mut self, loop_count: u32);
    fn set_blend_mode(&mut self, mode: BlendMode);

    /// Progress clip time by `dt_seconds`. Natural completion is reported
    /// once through `sink`.
    fn advance(&mut self, dt_seconds: f32, sink: &mut dyn CompletionSink)
        -> Result<(), BindingError>;

    /// Return the resource to the engine; no further notifications follow.
    fn release(&mut self);
}

/// Creates playable resources for clip names (the engine's mixer).
pub trait BindingFactory {
    fn create(&mut self, clip: &str) -> Result<Box<dyn Playable>, BindingError>;
}

/// Owns a state's resource and releases it exactly once, on explicit
/// [`release`](Self::release) or on drop.
pub struct BindingGuard {
    inner: Option<Box<dyn Playable>>,
}

impl BindingGuard {
    pub fn new(playable: Box<dyn Playable>) -> Self {
        Self {
            inner: Some(playable),
        }
    }

    #[inline]
    pub fn get(&self) -> Option<&dyn Playable> {
        self.inner.as_deref()
    }

    #[inline]
    pub fn get_mut(&mut self) -> Option<&mut (dyn Playable + 'static)> {
        self.inner.as_deref_mut()
    }

    #[inline]
    pub fn is_released(&self) -> bool {
        self.inner.is_none()
    }

    /// Disable and release the resource. Later calls are no-ops.
    pub fn release(&mut self) -> bool {
        match self.inner.take() {
            Some(mut playable) => {
                playable.set_enabled(false);
                playable.release();
                true
            }
            None => false,
        }
    }
}

impl Drop for BindingGuard {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for BindingGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.get() {
            Some(p) => f
                .debug_struct("BindingGuard")
                .field("id", &p.id())
                .field("clip", &p.clip_name())
                .finish(),
            None => f.write_str("BindingGuard(released)"),
        }
    }
}
