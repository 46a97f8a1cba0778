//! AnimationFeature: a layer of named animation states.
//!
//! The feature owns every state in registration order, tracks which of them
//! currently have influence, and drives them once per host tick:
//! transitions, then weight composition, then binding advancement, then
//! pruning. Structural errors return `Err`; playback failures reject the
//! affected state's Deferreds and are listed in the [`TickReport`].

use std::rc::Rc;

use hashbrown::HashSet;
use indexmap::IndexMap;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::binding::{BindingFactory, Playable};
use crate::config::Config;
use crate::deferred::{Callbacks, Deferred};
use crate::error::AnimationError;
use crate::events::{emit_state_event, AnimationEvent};
use crate::interp::{Easing, Interpolator};
use crate::messenger::Messenger;
use crate::options::{BlendMode, StateOptions};
use crate::playback_state::PlaybackState;
use crate::state::AnimationState;
use crate::Result;

/// A playback failure isolated to one state during a tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateFailure {
    pub state: String,
    pub error: AnimationError,
}

/// Summary of one `AnimationFeature::update` call.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    /// Delta actually applied after `Config::clamp_delta`.
    #[serde(default)]
    pub delta_ms: f32,
    /// Active states visited this tick, in registration order.
    #[serde(default)]
    pub advanced: Vec<String>,
    /// States whose play completed naturally this tick.
    #[serde(default)]
    pub finished: Vec<String>,
    /// States removed from the active set this tick.
    #[serde(default)]
    pub pruned: Vec<String>,
    #[serde(default)]
    pub errors: Vec<StateFailure>,
}

impl TickReport {
    #[inline]
    pub fn clear(&mut self) {
        self.delta_ms = 0.0;
        self.advanced.clear();
        self.finished.clear();
        self.pruned.clear();
        self.errors.clear();
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.advanced.is_empty()
            && self.finished.is_empty()
            && self.pruned.is_empty()
            && self.errors.is_empty()
    }
}

#[derive(Debug)]
struct LayerTransition {
    interp: Interpolator<f32>,
    deferred: Deferred,
}

pub struct AnimationFeature {
    config: Config,
    messenger: Rc<Messenger>,
    factory: Box<dyn BindingFactory>,
    states: IndexMap<String, AnimationState>,
    active: HashSet<String>,
    layer_weight: f32,
    layer_transition: Option<LayerTransition>,
    paused: bool,
    discarded: bool,
    report: TickReport,
}

impl AnimationFeature {
    /// Create an empty layer. Bindings for registered clips come from `factory`;
    /// feature level events go to `messenger`.
    pub fn new(factory: impl BindingFactory + 'static, messenger: Rc<Messenger>) -> Self {
        Self {
            config: Config::default(),
            messenger,
            factory: Box::new(factory),
            states: IndexMap::new(),
            active: HashSet::new(),
            layer_weight: 1.0,
            layer_transition: None,
            paused: false,
            discarded: false,
            report: TickReport::default(),
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn messenger(&self) -> &Rc<Messenger> {
        &self.messenger
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    #[inline]
    pub fn is_discarded(&self) -> bool {
        self.discarded
    }

    /// Registered state names in registration order.
    pub fn state_names(&self) -> impl Iterator<Item = &str> {
        self.states.keys().map(String::as_str)
    }

    pub fn state(&self, name: &str) -> Option<&AnimationState> {
        self.states.get(name)
    }

    #[inline]
    pub fn is_active(&self, name: &str) -> bool {
        self.active.contains(name)
    }

    /// Active state names in registration order.
    pub fn active_states(&self) -> Vec<&str> {
        self.states
            .keys()
            .filter(|k| self.active.contains(k.as_str()))
            .map(String::as_str)
            .collect()
    }

    /// Result of the most recent `update`.
    #[inline]
    pub fn last_report(&self) -> &TickReport {
        &self.report
    }

    /// Register a state whose binding is created from `options.clip`.
    pub fn register_state(&mut self, name: &str, options: StateOptions) -> Result<()> {
        self.ensure_vacant(name)?;
        let binding = self.factory.create(&options.clip)?;
        self.register_state_with_binding(name, options, binding)
    }

    /// Register a state around a binding the host created itself.
    pub fn register_state_with_binding(
        &mut self,
        name: &str,
        options: StateOptions,
        binding: Box<dyn Playable>,
    ) -> Result<()> {
        self.ensure_vacant(name)?;
        let state = AnimationState::new(name, &options, binding, Rc::new(Messenger::new()));
        if state.weight() > self.config.prune_epsilon {
            self.active.insert(name.to_string());
        }
        self.states.insert(name.to_string(), state);
        debug!("registered state '{name}' (clip '{}')", options.clip);
        emit_state_event(
            &self.messenger,
            AnimationEvent::AddState,
            name,
            json!({ "clip": options.clip }),
        );
        Ok(())
    }

    /// Discard and forget a state.
    pub fn remove_state(&mut self, name: &str) -> Result<()> {
        let mut state = self
            .states
            .shift_remove(name)
            .ok_or_else(|| unknown(name))?;
        state.discard();
        self.active.remove(name);
        debug!("removed state '{name}'");
        emit_state_event(&self.messenger, AnimationEvent::RemoveState, name, json!({}));
        Ok(())
    }

    pub fn play_state(&mut self, name: &str, callbacks: Callbacks) -> Result<Deferred> {
        let state = self.get_mut(name)?;
        let interrupted = state.is_play_pending();
        let deferred = state.play(callbacks);
        if interrupted {
            emit_state_event(&self.messenger, AnimationEvent::Interrupt, name, json!({}));
        }
        self.activate(name);
        emit_state_event(&self.messenger, AnimationEvent::Play, name, json!({}));
        Ok(deferred)
    }

    pub fn pause_state(&mut self, name: &str) -> Result<bool> {
        let paused = self.get_mut(name)?.pause();
        if paused {
            emit_state_event(&self.messenger, AnimationEvent::Pause, name, json!({}));
        }
        Ok(paused)
    }

    pub fn resume_state(&mut self, name: &str, callbacks: Callbacks) -> Result<Deferred> {
        let deferred = self.get_mut(name)?.resume(callbacks);
        self.activate(name);
        emit_state_event(&self.messenger, AnimationEvent::Resume, name, json!({}));
        Ok(deferred)
    }

    pub fn stop_state(&mut self, name: &str) -> Result<bool> {
        let settled = self.get_mut(name)?.stop();
        emit_state_event(&self.messenger, AnimationEvent::Stop, name, json!({}));
        Ok(settled)
    }

    pub fn cancel_state(&mut self, name: &str) -> Result<bool> {
        let cancelled = self.get_mut(name)?.cancel();
        if cancelled {
            emit_state_event(&self.messenger, AnimationEvent::Cancel, name, json!({}));
        }
        Ok(cancelled)
    }

    /// Blend a state's weight to `target` over `duration_ms` with the
    /// configured default easing.
    pub fn set_weight(&mut self, name: &str, target: f32, duration_ms: f32) -> Result<Deferred> {
        let easing = self.config.default_easing;
        self.set_weight_eased(name, target, duration_ms, easing)
    }

    pub fn set_weight_eased(
        &mut self,
        name: &str,
        target: f32,
        duration_ms: f32,
        easing: Easing,
    ) -> Result<Deferred> {
        let deferred = self
            .get_mut(name)?
            .transition_weight(target, duration_ms, easing)?;
        self.activate(name);
        emit_state_event(
            &self.messenger,
            AnimationEvent::Weight,
            name,
            json!({ "target": target, "duration_ms": duration_ms }),
        );
        Ok(deferred)
    }

    pub fn set_time_scale(
        &mut self,
        name: &str,
        target: f32,
        duration_ms: f32,
    ) -> Result<Deferred> {
        let easing = self.config.default_easing;
        self.set_time_scale_eased(name, target, duration_ms, easing)
    }

    pub fn set_time_scale_eased(
        &mut self,
        name: &str,
        target: f32,
        duration_ms: f32,
        easing: Easing,
    ) -> Result<Deferred> {
        let deferred = self
            .get_mut(name)?
            .transition_time_scale(target, duration_ms, easing)?;
        self.activate(name);
        emit_state_event(
            &self.messenger,
            AnimationEvent::TimeScale,
            name,
            json!({ "target": target, "duration_ms": duration_ms }),
        );
        Ok(deferred)
    }

    pub fn set_normalized_time(&mut self, name: &str, time: f32) -> Result<()> {
        self.get_mut(name)?.set_normalized_time(time)
    }

    /// Play `name` and fade it in to full weight while every other active
    /// override state fades out, all over `duration_ms`. Returns the play
    /// Deferred of `name`.
    pub fn crossfade(
        &mut self,
        name: &str,
        duration_ms: f32,
        callbacks: Callbacks,
    ) -> Result<Deferred> {
        let easing = self.config.default_easing;
        // Validate before touching any state.
        Interpolator::new(0.0f32, 1.0, duration_ms, easing)?;
        self.get_mut(name)?;

        let outgoing: Vec<String> = self
            .states
            .iter()
            .filter(|(k, s)| {
                k.as_str() != name
                    && self.active.contains(k.as_str())
                    && s.blend_mode() == BlendMode::Override
            })
            .map(|(k, _)| k.clone())
            .collect();
        for other in &outgoing {
            self.set_weight_eased(other, 0.0, duration_ms, easing)?;
        }

        let deferred = self.play_state(name, callbacks)?;
        self.set_weight_eased(name, 1.0, duration_ms, easing)?;
        debug!(
            "crossfading to '{name}' over {duration_ms}ms ({} outgoing)",
            outgoing.len()
        );
        Ok(deferred)
    }

    #[inline]
    pub fn layer_weight(&self) -> f32 {
        self.layer_weight
    }

    /// Blend the layer weight, which scales every state of this feature.
    pub fn set_layer_weight(&mut self, target: f32, duration_ms: f32) -> Result<Deferred> {
        if !target.is_finite() {
            return Err(AnimationError::invalid_transition(format!(
                "layer weight target must be finite, got {target}"
            )));
        }
        let target = target.clamp(0.0, 1.0);
        let interp =
            Interpolator::new(self.layer_weight, target, duration_ms, self.config.default_easing)?;
        if let Some(t) = self.layer_transition.take() {
            t.deferred.cancel();
        }
        if !interp.is_pending() {
            self.layer_weight = target;
            return Ok(Deferred::resolved());
        }
        let deferred = Deferred::new();
        self.layer_transition = Some(LayerTransition {
            interp,
            deferred: deferred.clone(),
        });
        Ok(deferred)
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Stop advancing bindings. Transitions keep running.
    pub fn pause(&mut self) -> bool {
        !std::mem::replace(&mut self.paused, true)
    }

    pub fn resume(&mut self) -> bool {
        std::mem::replace(&mut self.paused, false)
    }

    /// Step every active state by `delta_ms` milliseconds.
    pub fn update(&mut self, delta_ms: f32) -> &TickReport {
        self.report.clear();
        if self.discarded {
            return &self.report;
        }
        let delta_ms = self.config.clamp_delta(delta_ms);
        self.report.delta_ms = delta_ms;

        if let Some(t) = self.layer_transition.as_mut() {
            self.layer_weight = t.interp.step(delta_ms);
            if !t.interp.is_pending() {
                if let Some(t) = self.layer_transition.take() {
                    t.deferred.resolve();
                }
            }
        }

        let names: Vec<String> = self
            .states
            .keys()
            .filter(|k| self.active.contains(k.as_str()))
            .cloned()
            .collect();

        // 1) transitions
        for name in &names {
            if let Some(state) = self.states.get_mut(name) {
                state.update(delta_ms);
            }
        }

        // 2) weight composition
        let override_sum: f32 = names
            .iter()
            .filter_map(|n| self.states.get(n))
            .filter(|s| s.blend_mode() == BlendMode::Override)
            .map(AnimationState::weight)
            .sum();
        let norm = if self.config.normalize_override && override_sum > 1.0 {
            override_sum
        } else {
            1.0
        };
        for name in &names {
            if let Some(state) = self.states.get_mut(name) {
                let factor = match state.blend_mode() {
                    BlendMode::Override => self.layer_weight / norm,
                    BlendMode::Additive => self.layer_weight,
                };
                state.update_internal_weight(factor);
            }
        }

        // 3) bindings
        let dt_seconds = delta_ms / 1000.0;
        for name in &names {
            let Some(state) = self.states.get_mut(name) else {
                continue;
            };
            self.report.advanced.push(name.clone());
            if self.paused {
                continue;
            }
            match state.advance_binding(dt_seconds) {
                Ok(true) => {
                    self.report.finished.push(name.clone());
                    emit_state_event(&self.messenger, AnimationEvent::Finish, name, json!({}));
                }
                Ok(false) => {}
                Err(error) => {
                    emit_state_event(
                        &self.messenger,
                        AnimationEvent::Error,
                        name,
                        json!({ "message": error.to_string() }),
                    );
                    self.report.errors.push(StateFailure {
                        state: name.clone(),
                        error,
                    });
                }
            }
        }

        // 4) prune
        let epsilon = self.config.prune_epsilon;
        for name in &names {
            let Some(state) = self.states.get(name) else {
                continue;
            };
            let holding = matches!(state.state(), PlaybackState::Playing | PlaybackState::Paused);
            if !holding && !state.has_pending_work() && state.weight() <= epsilon {
                self.active.remove(name.as_str());
                trace!("pruned inactive state '{name}'");
                self.report.pruned.push(name.clone());
            }
        }

        &self.report
    }

    /// Cancel all pending work and release every binding. Later calls are no-ops.
    pub fn discard(&mut self) -> bool {
        if self.discarded {
            return false;
        }
        if let Some(t) = self.layer_transition.take() {
            t.deferred.cancel();
        }
        for state in self.states.values_mut() {
            state.discard();
        }
        self.active.clear();
        self.discarded = true;
        debug!("discarded animation feature ({} states)", self.states.len());
        true
    }

    fn ensure_vacant(&self, name: &str) -> Result<()> {
        if self.states.contains_key(name) {
            return Err(AnimationError::DuplicateState {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn get_mut(&mut self, name: &str) -> Result<&mut AnimationState> {
        self.states.get_mut(name).ok_or_else(|| unknown(name))
    }

    fn activate(&mut self, name: &str) {
        if !self.active.contains(name) {
            self.active.insert(name.to_string());
        }
    }
}

fn unknown(name: &str) -> AnimationError {
    AnimationError::UnknownState {
        name: name.to_string(),
    }
}

impl Drop for AnimationFeature {
    fn drop(&mut self) {
        self.discard();
    }
}

impl std::fmt::Debug for AnimationFeature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationFeature")
            .field("states", &self.states.keys().collect::<Vec<_>>())
            .field("active", &self.active_states())
            .field("layer_weight", &self.layer_weight)
            .field("paused", &self.paused)
            .field("discarded", &self.discarded)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::SimulatedMixer;
    use std::cell::RefCell;

    fn approx(a: f32, b: f32, eps: f32) {
        assert!((a - b).abs() <= eps, "left={a} right={b} eps={eps}");
    }

    fn feature() -> AnimationFeature {
        let mixer = SimulatedMixer::new()
            .with_clip("wave", 1.0)
            .with_clip("idle", 2.0)
            .with_clip("blink", 0.25);
        AnimationFeature::new(mixer, Rc::new(Messenger::new()))
    }

    #[test]
    fn duplicate_registration_keeps_original() {
        let mut f = feature();
        f.register_state("wave", StateOptions::new("wave").with_loop_count(1))
            .unwrap();
        let err = f
            .register_state("wave", StateOptions::new("idle").with_loop_count(5))
            .unwrap_err();
        assert!(matches!(err, AnimationError::DuplicateState { .. }));
        assert_eq!(f.len(), 1);
        let s = f.state("wave").unwrap();
        assert_eq!(s.loop_count(), 1);
        assert_eq!(s.binding().unwrap().clip_name(), "wave");
    }

    #[test]
    fn unknown_names_and_clips_fail() {
        let mut f = feature();
        assert!(matches!(
            f.play_state("nope", Callbacks::new()),
            Err(AnimationError::UnknownState { .. })
        ));
        assert!(matches!(
            f.remove_state("nope"),
            Err(AnimationError::UnknownState { .. })
        ));
        assert!(matches!(
            f.register_state("ghost", StateOptions::new("missing")),
            Err(AnimationError::Binding(_))
        ));
        assert!(f.state("ghost").is_none());
    }

    #[test]
    fn active_states_follow_registration_order() {
        let mut f = feature();
        for n in ["wave", "idle", "blink"] {
            f.register_state(n, StateOptions::new(n)).unwrap();
        }
        f.play_state("blink", Callbacks::new()).unwrap();
        f.play_state("wave", Callbacks::new()).unwrap();
        assert_eq!(f.active_states(), vec!["wave", "blink"]);
        assert_eq!(f.update(16.0).advanced, vec!["wave", "blink"]);
    }

    #[test]
    fn finished_zero_weight_states_are_pruned_but_addressable() {
        let mut f = feature();
        f.register_state("blink", StateOptions::new("blink").with_loop_count(1))
            .unwrap();
        let d = f.play_state("blink", Callbacks::new()).unwrap();
        let report = f.update(300.0).clone();
        assert!(d.is_resolved());
        assert_eq!(report.finished, vec!["blink"]);
        assert_eq!(report.pruned, vec!["blink"]);
        assert!(!f.is_active("blink"));
        let again = f.play_state("blink", Callbacks::new()).unwrap();
        assert!(again.is_pending());
        assert!(f.is_active("blink"));
    }

    #[test]
    fn override_weights_are_normalized() {
        let mut f = feature();
        f.register_state("wave", StateOptions::new("wave").with_weight(1.0))
            .unwrap();
        f.register_state("idle", StateOptions::new("idle").with_weight(1.0))
            .unwrap();
        f.register_state(
            "blink",
            StateOptions::new("blink")
                .with_weight(1.0)
                .with_blend_mode(BlendMode::Additive),
        )
        .unwrap();
        f.update(16.0);
        approx(f.state("wave").unwrap().internal_weight(), 0.5, 1e-6);
        approx(f.state("idle").unwrap().internal_weight(), 0.5, 1e-6);
        approx(f.state("blink").unwrap().internal_weight(), 1.0, 1e-6);
    }

    #[test]
    fn layer_weight_scales_states() {
        let mut f = feature().with_config(Config {
            normalize_override: false,
            ..Config::default()
        });
        f.register_state("wave", StateOptions::new("wave").with_weight(0.8))
            .unwrap();
        let d = f.set_layer_weight(0.5, 100.0).unwrap();
        f.update(50.0);
        approx(f.layer_weight(), 0.75, 1e-5);
        approx(f.state("wave").unwrap().internal_weight(), 0.6, 1e-5);
        f.update(50.0);
        assert!(d.is_resolved());
        approx(f.state("wave").unwrap().internal_weight(), 0.4, 1e-5);
    }

    #[test]
    fn paused_feature_still_runs_transitions() {
        let mut f = feature();
        f.register_state("idle", StateOptions::new("idle")).unwrap();
        f.play_state("idle", Callbacks::new()).unwrap();
        f.set_weight("idle", 1.0, 100.0).unwrap();
        assert!(f.pause());
        assert!(!f.pause());
        f.update(50.0);
        approx(f.state("idle").unwrap().weight(), 0.5, 1e-5);
        assert_eq!(f.state("idle").unwrap().normalized_time(), 0.0);
        assert!(f.resume());
        f.update(500.0);
        approx(f.state("idle").unwrap().normalized_time(), 0.25, 1e-5);
    }

    #[test]
    fn events_reach_the_feature_messenger_in_order() {
        let mut f = feature();
        let seen = Rc::new(RefCell::new(Vec::new()));
        for event in ["add_state", "play", "interrupt", "finish", "remove_state"] {
            let seen = seen.clone();
            f.messenger().subscribe(event, move |m| {
                seen.borrow_mut().push(format!(
                    "{}:{}",
                    m.event,
                    m.payload["name"].as_str().unwrap_or_default()
                ));
            });
        }
        f.register_state("wave", StateOptions::new("wave").with_loop_count(1))
            .unwrap();
        f.play_state("wave", Callbacks::new()).unwrap();
        f.play_state("wave", Callbacks::new()).unwrap();
        f.update(1100.0);
        f.remove_state("wave").unwrap();
        assert_eq!(
            *seen.borrow(),
            vec![
                "add_state:wave",
                "play:wave",
                "interrupt:wave",
                "play:wave",
                "finish:wave",
                "remove_state:wave",
            ]
        );
    }

    #[test]
    fn discard_cancels_everything_once() {
        let mut f = feature();
        f.register_state("wave", StateOptions::new("wave")).unwrap();
        let play = f.play_state("wave", Callbacks::new()).unwrap();
        let fade = f.set_weight("wave", 1.0, 500.0).unwrap();
        let layer = f.set_layer_weight(0.0, 500.0).unwrap();
        assert!(f.discard());
        assert!(!f.discard());
        assert!(play.is_cancelled());
        assert!(fade.is_cancelled());
        assert!(layer.is_cancelled());
        assert!(f.update(16.0).is_empty());
        assert!(f.state("wave").unwrap().binding().is_none());
    }

    #[test]
    fn crossfade_swaps_override_states() {
        let mut f = feature();
        f.register_state("idle", StateOptions::new("idle").with_weight(1.0))
            .unwrap();
        f.register_state("wave", StateOptions::new("wave")).unwrap();
        f.play_state("idle", Callbacks::new()).unwrap();
        let play = f.crossfade("wave", 200.0, Callbacks::new()).unwrap();
        let fade_out = f.state("idle").unwrap().weight_deferred().cloned().unwrap();
        let fade_in = f.state("wave").unwrap().weight_deferred().cloned().unwrap();
        f.update(100.0);
        approx(f.state("idle").unwrap().weight(), 0.5, 1e-5);
        approx(f.state("wave").unwrap().weight(), 0.5, 1e-5);
        f.update(100.0);
        assert!(fade_out.is_resolved());
        assert!(fade_in.is_resolved());
        assert!(play.is_pending());
        assert_eq!(f.state("idle").unwrap().weight(), 0.0);
        assert_eq!(f.state("wave").unwrap().weight(), 1.0);
    }

    #[test]
    fn max_delta_clamps_long_frames() {
        let mut f = feature().with_config(Config {
            max_delta_ms: Some(100.0),
            ..Config::default()
        });
        f.register_state("idle", StateOptions::new("idle")).unwrap();
        f.play_state("idle", Callbacks::new()).unwrap();
        assert_eq!(f.update(5000.0).delta_ms, 100.0);
        approx(f.state("idle").unwrap().normalized_time(), 0.05, 1e-5);
    }
}
