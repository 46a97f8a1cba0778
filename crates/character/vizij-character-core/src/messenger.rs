//! Messenger: a small synchronous publish/subscribe bus.
//!
//! Each state and feature owns a messenger handed to it at construction. A
//! process-wide instance is available through [`Messenger::global`] for
//! broadcasts that are not tied to a single entity.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

pub type Handler = Rc<dyn Fn(&Message)>;

/// One emitted event as seen by handlers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub event: String,
    /// Id of the messenger that emitted the event.
    pub sender: String,
    #[serde(default)]
    pub payload: JsonValue,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub u64);

struct Subscription {
    id: SubscriptionId,
    event: String,
    handler: Handler,
}

pub struct Messenger {
    id: String,
    next_id: Cell<u64>,
    subscriptions: RefCell<Vec<Subscription>>,
}

thread_local! {
    static GLOBAL: Rc<Messenger> = Rc::new(Messenger::with_id("global"));
}

impl Messenger {
    /// Create a messenger with a fresh uuid v4 id.
    pub fn new() -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string())
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            next_id: Cell::new(0),
            subscriptions: RefCell::new(Vec::new()),
        }
    }

    /// The shared broadcast messenger. Created on first use and never replaced.
    pub fn global() -> Rc<Messenger> {
        GLOBAL.with(Rc::clone)
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Register `handler` for `event`. Handlers fire in subscription order.
    pub fn subscribe(
        &self,
        event: impl Into<String>,
        handler: impl Fn(&Message) + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(self.next_id.get().wrapping_add(1));
        self.subscriptions.borrow_mut().push(Subscription {
            id,
            event: event.into(),
            handler: Rc::new(handler),
        });
        id
    }

    /// Remove one handler. Returns false if it was not registered for `event`.
    pub fn unsubscribe(&self, event: &str, id: SubscriptionId) -> bool {
        let mut subs = self.subscriptions.borrow_mut();
        let before = subs.len();
        subs.retain(|s| !(s.id == id && s.event == event));
        subs.len() != before
    }

    /// Remove every handler for `event`, returning how many were dropped.
    pub fn unsubscribe_all(&self, event: &str) -> usize {
        let mut subs = self.subscriptions.borrow_mut();
        let before = subs.len();
        subs.retain(|s| s.event != event);
        before - subs.len()
    }

    pub fn subscriber_count(&self, event: &str) -> usize {
        self.subscriptions
            .borrow()
            .iter()
            .filter(|s| s.event == event)
            .count()
    }

    /// Deliver `payload` to every handler of `event`. No subscribers is a no-op.
    pub fn emit(&self, event: &str, payload: JsonValue) {
        self.dispatch(&Message {
            event: event.to_string(),
            sender: self.id.clone(),
            payload,
        });
    }

    /// Emit on the global messenger, stamped with this messenger's id.
    pub fn emit_global(&self, event: &str, payload: JsonValue) {
        Self::global().dispatch(&Message {
            event: event.to_string(),
            sender: self.id.clone(),
            payload,
        });
    }

    pub fn subscribe_global(
        event: impl Into<String>,
        handler: impl Fn(&Message) + 'static,
    ) -> SubscriptionId {
        Self::global().subscribe(event, handler)
    }

    pub fn unsubscribe_global(event: &str, id: SubscriptionId) -> bool {
        Self::global().unsubscribe(event, id)
    }

    fn dispatch(&self, message: &Message) {
        // Snapshot so handlers may (un)subscribe without affecting this pass.
        let handlers: Vec<Handler> = self
            .subscriptions
            .borrow()
            .iter()
            .filter(|s| s.event == message.event)
            .map(|s| s.handler.clone())
            .collect();
        for handler in handlers {
            handler(message);
        }
    }
}

impl Default for Messenger {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Messenger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Messenger")
            .field("id", &self.id)
            .field("subscriptions", &self.subscriptions.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn handlers_fire_in_subscription_order() {
        let m = Messenger::with_id("m");
        let log = Rc::new(RefCell::new(Vec::new()));
        for tag in ["a", "b", "c"] {
            let log = log.clone();
            m.subscribe("play", move |msg| {
                log.borrow_mut()
                    .push(format!("{tag}:{}", msg.payload["name"].as_str().unwrap()));
            });
        }
        m.emit("play", json!({ "name": "wave" }));
        assert_eq!(*log.borrow(), vec!["a:wave", "b:wave", "c:wave"]);
    }

    #[test]
    fn emit_without_subscribers_is_a_noop() {
        let m = Messenger::new();
        m.emit("nobody", JsonValue::Null);
        assert_eq!(m.subscriber_count("nobody"), 0);
    }

    #[test]
    fn unsubscribe_during_emit_keeps_current_pass() {
        let m = Rc::new(Messenger::with_id("m"));
        let hits = Rc::new(Cell::new(0));
        let second = Rc::new(Cell::new(None::<SubscriptionId>));

        let (mm, s) = (m.clone(), second.clone());
        m.subscribe("tick", move |_| {
            if let Some(id) = s.get() {
                mm.unsubscribe("tick", id);
            }
        });
        let h = hits.clone();
        second.set(Some(m.subscribe("tick", move |_| h.set(h.get() + 1))));

        m.emit("tick", JsonValue::Null);
        assert_eq!(hits.get(), 1, "removed handler still sees the in-flight emission");
        m.emit("tick", JsonValue::Null);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn unsubscribe_is_scoped_to_event() {
        let m = Messenger::new();
        let id = m.subscribe("stop", |_| {});
        assert!(!m.unsubscribe("play", id));
        assert!(m.unsubscribe("stop", id));
        assert!(!m.unsubscribe("stop", id));
    }

    #[test]
    fn global_is_shared_and_stamps_sender() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        let id = Messenger::subscribe_global("broadcast", move |msg| {
            s.borrow_mut().push(msg.sender.clone());
        });
        let local = Messenger::with_id("speaker");
        local.emit_global("broadcast", JsonValue::Null);
        assert!(Rc::ptr_eq(&Messenger::global(), &Messenger::global()));
        assert_eq!(*seen.borrow(), vec!["speaker".to_string()]);
        assert!(Messenger::unsubscribe_global("broadcast", id));
    }
}
