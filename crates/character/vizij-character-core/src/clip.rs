//! Headless clip playback.
//!
//! `SimulatedClip` reproduces mixer-action timing without a renderer: time
//! advances by `dt * time_scale`, repeats `loop_count` times (0 = forever),
//! and holds the last frame when it finishes. Hosts without a scene graph and
//! the test-suite use it as the binding behind every state.

use std::cell::Cell;
use std::rc::Rc;

use hashbrown::HashMap;
use log::trace;

use crate::binding::{BindingFactory, CompletionSink, Playable, ResourceId};
use crate::error::BindingError;
use crate::options::BlendMode;

#[derive(Debug)]
pub struct SimulatedClip {
    id: ResourceId,
    clip: String,
    duration: Option<f32>,
    time: f32,
    time_scale: f32,
    weight: f32,
    repetitions: u32,
    loops_done: u32,
    blend_mode: BlendMode,
    enabled: bool,
    paused: bool,
    running: bool,
    released: bool,
    release_counter: Rc<Cell<u32>>,
}

impl SimulatedClip {
    fn new(id: ResourceId, clip: &str, duration: Option<f32>, counter: Rc<Cell<u32>>) -> Self {
        Self {
            id,
            clip: clip.to_string(),
            duration,
            time: 0.0,
            time_scale: 1.0,
            weight: 0.0,
            repetitions: 0,
            loops_done: 0,
            blend_mode: BlendMode::Override,
            enabled: false,
            paused: false,
            running: false,
            released: false,
            release_counter: counter,
        }
    }

    #[inline]
    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running
    }

    fn usable_duration(&self) -> Result<f32, BindingError> {
        match self.duration {
            Some(d) if d > 0.0 && d.is_finite() => Ok(d),
            _ => Err(BindingError::MissingDuration {
                clip: self.clip.clone(),
            }),
        }
    }

    fn finish(&mut self, end: f32, sink: &mut dyn CompletionSink) {
        self.time = end;
        self.running = false;
        trace!("clip '{}' finished at {end}", self.clip);
        sink.finished(self.id);
    }
}

impl Playable for SimulatedClip {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn clip_name(&self) -> &str {
        &self.clip
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn start(&mut self) {
        self.enabled = true;
        self.paused = false;
        self.running = !self.released;
    }

    fn restart(&mut self) {
        self.loops_done = 0;
        self.time = match (self.time_scale < 0.0, self.duration) {
            (true, Some(d)) if d > 0.0 => d,
            _ => 0.0,
        };
        self.start();
    }

    fn time(&self) -> f32 {
        self.time
    }

    fn set_time(&mut self, seconds: f32) -> Result<(), BindingError> {
        if self.released {
            return Err(BindingError::Released {
                clip: self.clip.clone(),
            });
        }
        let d = self.usable_duration()?;
        self.time = seconds.clamp(0.0, d);
        Ok(())
    }

    fn duration(&self) -> Option<f32> {
        self.duration
    }

    fn set_time_scale(&mut self, time_scale: f32) {
        self.time_scale = time_scale;
    }

    fn set_effective_weight(&mut self, weight: f32) {
        self.weight = weight;
    }

    fn effective_weight(&self) -> f32 {
        self.weight
    }

    fn set_repetitions(&mut self, loop_count: u32) {
        self.repetitions = loop_count;
    }

    fn set_blend_mode(&mut self, mode: BlendMode) {
        self.blend_mode = mode;
    }

    fn advance(
        &mut self,
        dt_seconds: f32,
        sink: &mut dyn CompletionSink,
    ) -> Result<(), BindingError> {
        if self.released {
            return Err(BindingError::Released {
                clip: self.clip.clone(),
            });
        }
        if !self.running || self.paused || !self.enabled {
            return Ok(());
        }
        let d = self.usable_duration()?;
        self.time += dt_seconds * self.time_scale;

        if self.time >= 0.0 && self.time < d {
            return Ok(());
        }
        let forward = self.time_scale >= 0.0;
        if self.repetitions == 1 {
            self.finish(if forward { d } else { 0.0 }, sink);
            return Ok(());
        }

        let wraps = (self.time / d).floor();
        self.time -= d * wraps;
        self.loops_done = self.loops_done.saturating_add(wraps.abs() as u32);
        if self.repetitions > 0 && self.loops_done >= self.repetitions {
            self.finish(if forward { d } else { 0.0 }, sink);
        }
        Ok(())
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.running = false;
            self.release_counter.set(self.release_counter.get() + 1);
        }
    }
}

/// Binding factory handing out [`SimulatedClip`]s from a duration table.
#[derive(Debug, Default)]
pub struct SimulatedMixer {
    clips: HashMap<String, Option<f32>>,
    next_id: u32,
    released: Rc<Cell<u32>>,
}

impl SimulatedMixer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a clip with a duration in seconds.
    pub fn with_clip(mut self, name: impl Into<String>, seconds: f32) -> Self {
        self.clips.insert(name.into(), Some(seconds));
        self
    }

    /// Register a clip whose duration the engine never learns.
    pub fn with_unknown_duration(mut self, name: impl Into<String>) -> Self {
        self.clips.insert(name.into(), None);
        self
    }

    pub fn from_durations<I, S>(durations: I) -> Self
    where
        I: IntoIterator<Item = (S, f32)>,
        S: Into<String>,
    {
        durations
            .into_iter()
            .fold(Self::new(), |mixer, (name, secs)| mixer.with_clip(name, secs))
    }

    /// Number of clips released so far.
    pub fn released(&self) -> u32 {
        self.released.get()
    }
}

impl BindingFactory for SimulatedMixer {
    fn create(&mut self, clip: &str) -> Result<Box<dyn Playable>, BindingError> {
        let duration = *self
            .clips
            .get(clip)
            .ok_or_else(|| BindingError::UnknownClip {
                clip: clip.to_string(),
            })?;
        let id = ResourceId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        Ok(Box::new(SimulatedClip::new(
            id,
            clip,
            duration,
            self.released.clone(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32, eps: f32) {
        assert!((a - b).abs() <= eps, "left={a} right={b} eps={eps}");
    }

    fn clip(seconds: f32, loops: u32) -> Box<dyn Playable> {
        let mut mixer = SimulatedMixer::new().with_clip("c", seconds);
        let mut c = mixer.create("c").unwrap();
        c.set_repetitions(loops);
        c.restart();
        c
    }

    #[test]
    fn play_once_finishes_and_holds_last_frame() {
        let mut c = clip(1.0, 1);
        let mut sink = Vec::new();
        for _ in 0..9 {
            c.advance(0.1, &mut sink).unwrap();
        }
        assert!(sink.is_empty());
        c.advance(0.2, &mut sink).unwrap();
        assert_eq!(sink, vec![c.id()]);
        assert_eq!(c.time(), 1.0);
        c.advance(0.5, &mut sink).unwrap();
        assert_eq!(sink.len(), 1, "finished fires once per completion");
    }

    #[test]
    fn repeats_loop_count_times() {
        let mut c = clip(0.5, 3);
        let mut sink = Vec::new();
        c.advance(0.6, &mut sink).unwrap();
        c.advance(0.6, &mut sink).unwrap();
        assert!(sink.is_empty());
        c.advance(0.6, &mut sink).unwrap();
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn infinite_loop_wraps_forever() {
        let mut c = clip(0.5, 0);
        let mut sink = Vec::new();
        for _ in 0..100 {
            c.advance(0.3, &mut sink).unwrap();
        }
        assert!(sink.is_empty());
        assert!(c.time() >= 0.0 && c.time() < 0.5);
    }

    #[test]
    fn reverse_playback_starts_at_end_and_finishes_at_zero() {
        let mut mixer = SimulatedMixer::new().with_clip("c", 1.0);
        let mut c = mixer.create("c").unwrap();
        c.set_repetitions(1);
        c.set_time_scale(-2.0);
        c.restart();
        assert_eq!(c.time(), 1.0);
        let mut sink = Vec::new();
        c.advance(0.25, &mut sink).unwrap();
        approx(c.time(), 0.5, 1e-6);
        c.advance(0.5, &mut sink).unwrap();
        assert_eq!(c.time(), 0.0);
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn paused_or_disabled_clips_do_not_move() {
        let mut c = clip(1.0, 1);
        let mut sink = Vec::new();
        c.set_paused(true);
        c.advance(0.5, &mut sink).unwrap();
        assert_eq!(c.time(), 0.0);
        c.set_paused(false);
        c.set_enabled(false);
        c.advance(0.5, &mut sink).unwrap();
        assert_eq!(c.time(), 0.0);
    }

    #[test]
    fn unknown_duration_is_a_binding_error() {
        let mut mixer = SimulatedMixer::new().with_unknown_duration("mystery");
        let mut c = mixer.create("mystery").unwrap();
        c.restart();
        let mut sink = Vec::new();
        assert!(matches!(
            c.advance(0.1, &mut sink),
            Err(BindingError::MissingDuration { .. })
        ));
        assert!(c.set_time(0.2).is_err());
    }

    #[test]
    fn factory_rejects_unknown_clips_and_allocates_unique_ids() {
        let mut mixer = SimulatedMixer::from_durations([("a", 1.0), ("b", 2.0)]);
        assert!(matches!(
            mixer.create("zzz"),
            Err(BindingError::UnknownClip { .. })
        ));
        let first = mixer.create("a").unwrap();
        let second = mixer.create("a").unwrap();
        assert_ne!(first.id(), second.id());
    }
}
