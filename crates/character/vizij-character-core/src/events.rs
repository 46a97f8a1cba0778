//! Lifecycle notifications emitted through a [`Messenger`](crate::messenger::Messenger).

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

use crate::error::AnimationError;
use crate::messenger::Messenger;

/// Types of animation events
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum AnimationEvent {
    /// A state was registered with the feature
    AddState,
    /// A state was removed and discarded
    RemoveState,
    /// Playback started from the beginning
    Play,
    /// Playback paused
    Pause,
    /// Playback resumed
    Resume,
    /// A pending play was superseded by a new lifecycle call
    Interrupt,
    /// Playback stopped and reset
    Stop,
    /// Pending work was cancelled
    Cancel,
    /// Playback reached its natural end
    Finish,
    /// A weight transition started
    Weight,
    /// A time-scale transition started
    TimeScale,
    /// The binding reported a failure
    Error,
}

impl AnimationEvent {
    /// Get the event name used on the messenger
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddState => "add_state",
            Self::RemoveState => "remove_state",
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Interrupt => "interrupt",
            Self::Stop => "stop",
            Self::Cancel => "cancel",
            Self::Finish => "finish",
            Self::Weight => "weight",
            Self::TimeScale => "time_scale",
            Self::Error => "error",
        }
    }

    /// Check if this is a playback-related event
    #[inline]
    pub fn is_playback_event(&self) -> bool {
        matches!(
            self,
            Self::Play
                | Self::Pause
                | Self::Resume
                | Self::Interrupt
                | Self::Stop
                | Self::Cancel
                | Self::Finish
        )
    }
}

impl FromStr for AnimationEvent {
    type Err = AnimationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let event = match s {
            "add_state" => Self::AddState,
            "remove_state" => Self::RemoveState,
            "play" => Self::Play,
            "pause" => Self::Pause,
            "resume" => Self::Resume,
            "interrupt" => Self::Interrupt,
            "stop" => Self::Stop,
            "cancel" => Self::Cancel,
            "finish" => Self::Finish,
            "weight" => Self::Weight,
            "time_scale" => Self::TimeScale,
            "error" => Self::Error,
            other => return Err(AnimationError::new(format!("unknown event '{other}'"))),
        };
        Ok(event)
    }
}

/// Emit `event` for the state `name`, merging `extra` fields into the payload.
pub(crate) fn emit_state_event(
    messenger: &Messenger,
    event: AnimationEvent,
    name: &str,
    extra: JsonValue,
) {
    let mut payload = json!({ "name": name });
    if let (Some(map), JsonValue::Object(more)) = (payload.as_object_mut(), extra) {
        map.extend(more);
    }
    messenger.emit(event.name(), payload);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn names_parse_back() {
        for e in [
            AnimationEvent::Play,
            AnimationEvent::Interrupt,
            AnimationEvent::TimeScale,
            AnimationEvent::RemoveState,
        ] {
            assert_eq!(e.name().parse::<AnimationEvent>().unwrap(), e);
        }
        assert_eq!("error".parse::<AnimationEvent>().unwrap(), AnimationEvent::Error);
        assert!("explode".parse::<AnimationEvent>().is_err());
        assert!(AnimationEvent::Finish.is_playback_event());
        assert!(!AnimationEvent::Weight.is_playback_event());
    }

    #[test]
    fn payload_carries_name_and_extra_fields() {
        let m = Messenger::with_id("feature");
        let seen = Rc::new(RefCell::new(JsonValue::Null));
        let s = seen.clone();
        m.subscribe("weight", move |msg| *s.borrow_mut() = msg.payload.clone());
        emit_state_event(
            &m,
            AnimationEvent::Weight,
            "wave",
            json!({ "target": 1.0, "duration_ms": 500.0 }),
        );
        let payload = seen.borrow();
        assert_eq!(payload["name"], "wave");
        assert_eq!(payload["target"], 1.0);
        assert_eq!(payload["duration_ms"], 500.0);
    }
}
