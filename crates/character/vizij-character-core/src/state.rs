//! AnimationState: playback lifecycle for one clip.
//!
//! A state owns its binding (through a [`BindingGuard`]) and the Deferreds of
//! the work it has in flight: the current play and at most one weight and one
//! time-scale transition. `internal_weight` is always `weight * blend_factor`,
//! where the blend factor is supplied by the owning feature every tick.

use std::rc::Rc;

use log::{debug, warn};
use serde_json::json;

use crate::binding::{BindingGuard, Playable, ResourceId};
use crate::deferred::{Callbacks, Deferred};
use crate::error::{AnimationError, BindingError};
use crate::events::{emit_state_event, AnimationEvent};
use crate::interp::{Easing, Interpolator};
use crate::messenger::Messenger;
use crate::options::{BlendMode, StateOptions};
use crate::playback_state::PlaybackState;

/// Kinds of Deferred a state can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PendingKind {
    Play,
    Weight,
    TimeScale,
}

#[derive(Debug)]
struct Transition {
    interp: Interpolator<f32>,
    deferred: Deferred,
}

impl Transition {
    fn is_pending(&self) -> bool {
        self.interp.is_pending() && self.deferred.is_pending()
    }
}

fn sanitize_weight(weight: f32) -> f32 {
    if weight.is_finite() {
        weight.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[derive(Debug)]
pub struct AnimationState {
    name: String,
    messenger: Rc<Messenger>,
    binding: BindingGuard,
    loop_count: u32,
    time_scale: f32,
    weight: f32,
    internal_weight: f32,
    blend_factor: f32,
    blend_mode: BlendMode,
    /// Clip time is held.
    paused: bool,
    /// Set by `pause`; holds transitions as well as clip time.
    frozen: bool,
    state: PlaybackState,
    play: Option<Deferred>,
    weight_transition: Option<Transition>,
    time_scale_transition: Option<Transition>,
    discarded: bool,
}

impl AnimationState {
    /// Wrap `binding` and push the initial options into it. The binding stays
    /// disabled until the state is played or given weight.
    pub fn new(
        name: impl Into<String>,
        options: &StateOptions,
        binding: Box<dyn Playable>,
        messenger: Rc<Messenger>,
    ) -> Self {
        let weight = sanitize_weight(options.weight);
        let mut state = Self {
            name: name.into(),
            messenger,
            binding: BindingGuard::new(binding),
            loop_count: options.loop_count,
            time_scale: options.time_scale,
            weight,
            internal_weight: weight,
            blend_factor: 1.0,
            blend_mode: options.blend_mode,
            paused: false,
            frozen: false,
            state: PlaybackState::Idle,
            play: None,
            weight_transition: None,
            time_scale_transition: None,
            discarded: false,
        };
        if let Some(b) = state.binding.get_mut() {
            b.set_enabled(false);
            b.set_paused(false);
            b.set_repetitions(options.loop_count);
            b.set_time_scale(options.time_scale);
            b.set_effective_weight(weight);
            b.set_blend_mode(options.blend_mode);
        }
        state
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn messenger(&self) -> &Rc<Messenger> {
        &self.messenger
    }

    #[inline]
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[inline]
    pub fn is_discarded(&self) -> bool {
        self.discarded
    }

    #[inline]
    pub fn binding(&self) -> Option<&dyn Playable> {
        self.binding.get()
    }

    #[inline]
    pub fn loop_count(&self) -> u32 {
        self.loop_count
    }

    pub fn set_loop_count(&mut self, loop_count: u32) {
        self.loop_count = loop_count;
        if let Some(b) = self.binding.get_mut() {
            b.set_repetitions(loop_count);
        }
    }

    #[inline]
    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    pub fn set_blend_mode(&mut self, mode: BlendMode) {
        self.blend_mode = mode;
        if let Some(b) = self.binding.get_mut() {
            b.set_blend_mode(mode);
        }
    }

    #[inline]
    pub fn weight(&self) -> f32 {
        self.weight
    }

    #[inline]
    pub fn internal_weight(&self) -> f32 {
        self.internal_weight
    }

    /// Last factor received through [`update_internal_weight`](Self::update_internal_weight).
    #[inline]
    pub fn blend_factor(&self) -> f32 {
        self.blend_factor
    }

    /// Set the user weight immediately, replacing any weight transition.
    pub fn set_weight(&mut self, weight: f32) {
        if let Some(t) = self.weight_transition.take() {
            t.deferred.cancel();
        }
        self.apply_weight(weight);
    }

    #[inline]
    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Set the playback speed immediately, replacing any time-scale transition.
    pub fn set_time_scale(&mut self, time_scale: f32) {
        if let Some(t) = self.time_scale_transition.take() {
            t.deferred.cancel();
        }
        self.apply_time_scale(time_scale);
    }

    /// Playback position in [0, 1]; 0 when the clip duration is unknown.
    pub fn normalized_time(&self) -> f32 {
        match self.binding.get() {
            Some(b) => match b.duration() {
                Some(d) if d > 0.0 && d.is_finite() => b.time() / d,
                _ => 0.0,
            },
            None => 0.0,
        }
    }

    /// Seek to `time` (clamped into [0, 1]) of the clip.
    pub fn set_normalized_time(&mut self, time: f32) -> Result<(), AnimationError> {
        let time = if time.is_finite() {
            time.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let b = self.binding.get_mut().ok_or_else(|| BindingError::Released {
            clip: self.name.clone(),
        })?;
        let duration = match b.duration() {
            Some(d) if d > 0.0 && d.is_finite() => d,
            _ => {
                return Err(BindingError::MissingDuration {
                    clip: b.clip_name().to_string(),
                }
                .into())
            }
        };
        b.set_time(duration * time)?;
        Ok(())
    }

    /// Multiply the user weight by the layer's `factor` to get the weight the
    /// binding applies.
    pub fn update_internal_weight(&mut self, factor: f32) {
        self.blend_factor = if factor.is_finite() {
            factor.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.refresh_internal_weight();
    }

    #[inline]
    pub fn play_deferred(&self) -> Option<&Deferred> {
        self.play.as_ref()
    }

    #[inline]
    pub fn weight_deferred(&self) -> Option<&Deferred> {
        self.weight_transition.as_ref().map(|t| &t.deferred)
    }

    #[inline]
    pub fn time_scale_deferred(&self) -> Option<&Deferred> {
        self.time_scale_transition.as_ref().map(|t| &t.deferred)
    }

    #[inline]
    pub fn is_play_pending(&self) -> bool {
        self.play.as_ref().is_some_and(Deferred::is_pending)
    }

    pub fn has_pending_transitions(&self) -> bool {
        self.weight_transition
            .as_ref()
            .is_some_and(Transition::is_pending)
            || self
                .time_scale_transition
                .as_ref()
                .is_some_and(Transition::is_pending)
    }

    pub fn has_pending_work(&self) -> bool {
        self.is_play_pending() || self.has_pending_transitions()
    }

    /// Kinds of Deferred currently pending, in `play, weight, time_scale` order.
    pub fn pending(&self) -> Vec<PendingKind> {
        let mut kinds = Vec::new();
        if self.is_play_pending() {
            kinds.push(PendingKind::Play);
        }
        if self
            .weight_transition
            .as_ref()
            .is_some_and(Transition::is_pending)
        {
            kinds.push(PendingKind::Weight);
        }
        if self
            .time_scale_transition
            .as_ref()
            .is_some_and(Transition::is_pending)
        {
            kinds.push(PendingKind::TimeScale);
        }
        kinds
    }

    /// Restart from time 0. A still-pending previous play is cancelled first.
    pub fn play(&mut self, callbacks: Callbacks) -> Deferred {
        let deferred = Deferred::with_callbacks(callbacks);
        if self.discarded {
            deferred.reject(self.released_error());
            return deferred;
        }
        self.interrupt_play();

        if let Some(b) = self.binding.get_mut() {
            b.restart();
        }
        self.paused = false;
        self.frozen = false;
        self.state = PlaybackState::Playing;
        self.play = Some(deferred.clone());
        debug!("state '{}' playing", self.name);
        emit_state_event(&self.messenger, AnimationEvent::Play, &self.name, json!({}));
        deferred
    }

    /// Freeze clip time and in-flight transitions. Returns whether the state was playing.
    pub fn pause(&mut self) -> bool {
        let was_playing = self.state.can_pause();
        if let Some(b) = self.binding.get_mut() {
            b.set_paused(true);
        }
        self.paused = true;
        self.frozen = true;
        if was_playing {
            self.state = PlaybackState::Paused;
            debug!("state '{}' paused", self.name);
            emit_state_event(&self.messenger, AnimationEvent::Pause, &self.name, json!({}));
        }
        was_playing
    }

    /// Continue from the current time. Reuses the pending play Deferred (the
    /// new callbacks are attached to it) or starts a new one.
    pub fn resume(&mut self, callbacks: Callbacks) -> Deferred {
        if self.discarded {
            let deferred = Deferred::with_callbacks(callbacks);
            deferred.reject(self.released_error());
            return deferred;
        }

        if let Some(b) = self.binding.get_mut() {
            b.start();
        }
        let weight_incoming = self
            .weight_transition
            .as_ref()
            .is_some_and(Transition::is_pending);
        if self.weight <= 0.0 && !weight_incoming {
            self.apply_weight(1.0);
        }
        self.paused = false;
        self.frozen = false;
        self.state = PlaybackState::Playing;

        let pending = self.play.as_ref().filter(|d| d.is_pending()).cloned();
        let deferred = match pending {
            Some(existing) => {
                existing.attach(callbacks);
                existing
            }
            None => {
                let fresh = Deferred::with_callbacks(callbacks);
                self.play = Some(fresh.clone());
                fresh
            }
        };
        debug!("state '{}' resumed", self.name);
        emit_state_event(&self.messenger, AnimationEvent::Resume, &self.name, json!({}));
        deferred
    }

    /// Cancel every pending Deferred and halt playback. Returns whether any
    /// work was pending.
    pub fn cancel(&mut self) -> bool {
        let mut any = false;
        if let Some(play) = self.play.take() {
            any |= play.cancel();
        }
        if let Some(mut t) = self.weight_transition.take() {
            t.interp.cancel();
            any |= t.deferred.cancel();
        }
        if let Some(mut t) = self.time_scale_transition.take() {
            t.interp.cancel();
            any |= t.deferred.cancel();
        }
        if let Some(b) = self.binding.get_mut() {
            b.set_paused(true);
        }
        self.paused = true;
        self.frozen = false;
        if any {
            self.state = PlaybackState::Cancelled;
            debug!("state '{}' cancelled", self.name);
            emit_state_event(&self.messenger, AnimationEvent::Cancel, &self.name, json!({}));
        }
        any
    }

    /// Rewind to time 0, halt playback and resolve pending work. Transitions
    /// resolve where they currently are.
    pub fn stop(&mut self) -> bool {
        if self.discarded {
            return false;
        }
        if let Some(b) = self.binding.get_mut() {
            b.restart();
            b.set_paused(true);
            if let Err(err) = b.set_time(0.0) {
                debug!("state '{}' could not rewind: {err}", self.name);
            }
        }
        self.paused = true;
        self.frozen = false;

        let mut any = false;
        if let Some(play) = self.play.take() {
            any |= play.resolve();
        }
        if let Some(mut t) = self.weight_transition.take() {
            t.interp.cancel();
            any |= t.deferred.resolve();
        }
        if let Some(mut t) = self.time_scale_transition.take() {
            t.interp.cancel();
            any |= t.deferred.resolve();
        }
        self.state = PlaybackState::Stopped;
        debug!("state '{}' stopped", self.name);
        emit_state_event(&self.messenger, AnimationEvent::Stop, &self.name, json!({}));
        any
    }

    /// Blend the user weight to `target` over `duration_ms`. A zero duration
    /// applies immediately and returns a resolved Deferred.
    pub fn transition_weight(
        &mut self,
        target: f32,
        duration_ms: f32,
        easing: Easing,
    ) -> Result<Deferred, AnimationError> {
        if !target.is_finite() {
            return Err(AnimationError::invalid_transition(format!(
                "weight target must be finite, got {target}"
            )));
        }
        let target = target.clamp(0.0, 1.0);
        let interp = Interpolator::new(self.weight, target, duration_ms, easing)?;
        if let Some(t) = self.weight_transition.take() {
            t.deferred.cancel();
        }
        if !interp.is_pending() {
            self.apply_weight(target);
            return Ok(Deferred::resolved());
        }
        if let Some(b) = self.binding.get_mut() {
            b.set_enabled(true);
        }
        let deferred = Deferred::new();
        self.weight_transition = Some(Transition {
            interp,
            deferred: deferred.clone(),
        });
        emit_state_event(
            &self.messenger,
            AnimationEvent::Weight,
            &self.name,
            json!({ "target": target, "duration_ms": duration_ms }),
        );
        Ok(deferred)
    }

    /// Blend the playback speed to `target` over `duration_ms`.
    pub fn transition_time_scale(
        &mut self,
        target: f32,
        duration_ms: f32,
        easing: Easing,
    ) -> Result<Deferred, AnimationError> {
        if !target.is_finite() {
            return Err(AnimationError::invalid_transition(format!(
                "time scale target must be finite, got {target}"
            )));
        }
        let interp = Interpolator::new(self.time_scale, target, duration_ms, easing)?;
        if let Some(t) = self.time_scale_transition.take() {
            t.deferred.cancel();
        }
        if !interp.is_pending() {
            self.apply_time_scale(target);
            return Ok(Deferred::resolved());
        }
        let deferred = Deferred::new();
        self.time_scale_transition = Some(Transition {
            interp,
            deferred: deferred.clone(),
        });
        emit_state_event(
            &self.messenger,
            AnimationEvent::TimeScale,
            &self.name,
            json!({ "target": target, "duration_ms": duration_ms }),
        );
        Ok(deferred)
    }

    /// Advance in-flight transitions by `delta_ms`. Only a caller `pause`
    /// holds them; finished, stopped and cancelled states keep blending.
    pub fn update(&mut self, delta_ms: f32) {
        if self.frozen || self.discarded {
            return;
        }

        if let Some(t) = self.weight_transition.as_mut() {
            let value = t.interp.step(delta_ms);
            let done = !t.interp.is_pending();
            self.apply_weight(value);
            if done {
                if let Some(t) = self.weight_transition.take() {
                    t.deferred.resolve();
                }
            }
        }

        if let Some(t) = self.time_scale_transition.as_mut() {
            let value = t.interp.step(delta_ms);
            let done = !t.interp.is_pending();
            self.apply_time_scale(value);
            if done {
                if let Some(t) = self.time_scale_transition.take() {
                    t.deferred.resolve();
                }
            }
        }

        // A finished clip keeps evaluating until its last transition settles.
        if self.state.is_terminal() && !self.has_pending_transitions() {
            self.hold();
        }
    }

    /// Advance the bound clip and route its completion reports. Returns
    /// whether this state finished during the call. A binding failure
    /// rejects the state's pending work and is returned.
    pub fn advance_binding(&mut self, dt_seconds: f32) -> Result<bool, AnimationError> {
        if self.paused {
            return Ok(false);
        }
        let Some(b) = self.binding.get_mut() else {
            return Ok(false);
        };
        let mut finished: Vec<ResourceId> = Vec::new();
        if let Err(err) = b.advance(dt_seconds, &mut finished) {
            let err = AnimationError::from(err);
            self.fail(err.clone());
            return Err(err);
        }
        let mut any = false;
        for resource in finished {
            any |= self.handle_finished(resource);
        }
        Ok(any)
    }

    /// Completion sink entry point. Only a report for this state's own
    /// resource settles the pending play.
    pub fn handle_finished(&mut self, resource: ResourceId) -> bool {
        match self.binding.get() {
            Some(b) if b.id() == resource => {}
            _ => {
                warn!(
                    "state '{}' ignoring finish report for foreign resource {:?}",
                    self.name, resource
                );
                return false;
            }
        }
        let Some(play) = self.play.take() else {
            return false;
        };
        if !play.resolve() {
            return false;
        }
        self.state = PlaybackState::Finished;
        debug!("state '{}' finished", self.name);
        emit_state_event(&self.messenger, AnimationEvent::Finish, &self.name, json!({}));
        if !self.has_pending_transitions() {
            self.hold();
        }
        true
    }

    /// Cancel pending work and release the binding. Later calls are no-ops.
    pub fn discard(&mut self) -> bool {
        if self.discarded {
            return false;
        }
        self.cancel();
        self.binding.release();
        self.discarded = true;
        debug!("state '{}' discarded", self.name);
        true
    }

    fn interrupt_play(&mut self) {
        if let Some(previous) = self.play.take() {
            if previous.cancel() {
                debug!("state '{}' interrupted a pending play", self.name);
                emit_state_event(
                    &self.messenger,
                    AnimationEvent::Interrupt,
                    &self.name,
                    json!({}),
                );
            }
        }
    }

    fn fail(&mut self, err: AnimationError) {
        warn!("state '{}' binding failed: {err}", self.name);
        if let Some(play) = self.play.take() {
            play.reject(err.clone());
        }
        if let Some(mut t) = self.weight_transition.take() {
            t.interp.cancel();
            t.deferred.reject(err.clone());
        }
        if let Some(mut t) = self.time_scale_transition.take() {
            t.interp.cancel();
            t.deferred.reject(err.clone());
        }
        self.hold();
        self.frozen = false;
        self.state = PlaybackState::Cancelled;
        emit_state_event(
            &self.messenger,
            AnimationEvent::Error,
            &self.name,
            json!({ "message": err.to_string() }),
        );
    }

    /// Pause without changing the lifecycle position.
    fn hold(&mut self) {
        self.paused = true;
        if let Some(b) = self.binding.get_mut() {
            b.set_paused(true);
        }
    }

    fn apply_weight(&mut self, weight: f32) {
        self.weight = sanitize_weight(weight);
        if let Some(b) = self.binding.get_mut() {
            b.set_enabled(true);
        }
        self.refresh_internal_weight();
    }

    fn apply_time_scale(&mut self, time_scale: f32) {
        self.time_scale = time_scale;
        if let Some(b) = self.binding.get_mut() {
            b.set_time_scale(time_scale);
        }
    }

    fn refresh_internal_weight(&mut self) {
        self.internal_weight = self.weight * self.blend_factor;
        if let Some(b) = self.binding.get_mut() {
            b.set_effective_weight(self.internal_weight);
        }
    }

    fn released_error(&self) -> AnimationError {
        BindingError::Released {
            clip: self.name.clone(),
        }
        .into()
    }
}
