//! Host composition root.
//!
//! A `HostObject` owns the messenger shared by its features and ticks them in
//! the order they were added. Features receive the host messenger when they
//! are built, e.g. `AnimationFeature::new(mixer, host.messenger().clone())`.

use std::rc::Rc;

use log::{debug, warn};

use crate::feature::AnimationFeature;
use crate::messenger::Messenger;

/// A unit of per-tick behaviour installed on a host.
pub trait HostFeature {
    /// Unique name on the host.
    fn name(&self) -> &str;
    fn update(&mut self, delta_ms: f32);
    fn discard(&mut self);
}

impl HostFeature for AnimationFeature {
    fn name(&self) -> &str {
        "AnimationFeature"
    }

    fn update(&mut self, delta_ms: f32) {
        AnimationFeature::update(self, delta_ms);
    }

    fn discard(&mut self) {
        AnimationFeature::discard(self);
    }
}

pub struct HostObject {
    messenger: Rc<Messenger>,
    features: Vec<Box<dyn HostFeature>>,
    elapsed_ms: f64,
    discarded: bool,
}

impl HostObject {
    pub fn new(messenger: Rc<Messenger>) -> Self {
        Self {
            messenger,
            features: Vec::new(),
            elapsed_ms: 0.0,
            discarded: false,
        }
    }

    /// Host wired to the process-wide messenger.
    pub fn with_global_messenger() -> Self {
        Self::new(Messenger::global())
    }

    #[inline]
    pub fn messenger(&self) -> &Rc<Messenger> {
        &self.messenger
    }

    /// Milliseconds accumulated by `update`.
    #[inline]
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed_ms
    }

    /// Install `feature`. A second feature with the same name is refused.
    pub fn add_feature(&mut self, feature: impl HostFeature + 'static) -> bool {
        if self.discarded {
            warn!("ignoring feature '{}' on a discarded host", feature.name());
            return false;
        }
        if self.has_feature(feature.name()) {
            warn!("host already has a feature named '{}'", feature.name());
            return false;
        }
        debug!("host {} added feature '{}'", self.messenger.id(), feature.name());
        self.features.push(Box::new(feature));
        true
    }

    pub fn has_feature(&self, name: &str) -> bool {
        self.features.iter().any(|f| f.name() == name)
    }

    pub fn feature_names(&self) -> Vec<&str> {
        self.features.iter().map(|f| f.name()).collect()
    }

    /// Discard and drop the feature called `name`.
    pub fn remove_feature(&mut self, name: &str) -> bool {
        match self.features.iter().position(|f| f.name() == name) {
            Some(index) => {
                let mut feature = self.features.remove(index);
                feature.discard();
                true
            }
            None => false,
        }
    }

    /// Tick every feature in insertion order.
    pub fn update(&mut self, delta_ms: f32) {
        if self.discarded {
            return;
        }
        if delta_ms.is_finite() && delta_ms > 0.0 {
            self.elapsed_ms += f64::from(delta_ms);
        }
        for feature in self.features.iter_mut() {
            feature.update(delta_ms);
        }
    }

    /// Discard every feature. Later calls are no-ops.
    pub fn discard(&mut self) -> bool {
        if self.discarded {
            return false;
        }
        for feature in self.features.iter_mut() {
            feature.discard();
        }
        self.features.clear();
        self.discarded = true;
        true
    }
}

impl Drop for HostObject {
    fn drop(&mut self) {
        self.discard();
    }
}

impl std::fmt::Debug for HostObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostObject")
            .field("messenger", &self.messenger.id())
            .field("features", &self.feature_names())
            .field("elapsed_ms", &self.elapsed_ms)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct Recorder {
        name: &'static str,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl HostFeature for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        fn update(&mut self, delta_ms: f32) {
            self.log.borrow_mut().push(format!("{}:{delta_ms}", self.name));
        }

        fn discard(&mut self) {
            self.log.borrow_mut().push(format!("{}:discard", self.name));
        }
    }

    fn recorder(name: &'static str, log: &Rc<RefCell<Vec<String>>>) -> Recorder {
        Recorder {
            name,
            log: log.clone(),
        }
    }

    #[test]
    fn features_tick_in_insertion_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut host = HostObject::new(Rc::new(Messenger::new()));
        assert!(host.add_feature(recorder("b", &log)));
        assert!(host.add_feature(recorder("a", &log)));
        assert!(!host.add_feature(recorder("a", &log)));
        host.update(16.0);
        assert_eq!(*log.borrow(), vec!["b:16", "a:16"]);
        assert_eq!(host.elapsed_ms(), 16.0);
    }

    #[test]
    fn discard_reaches_every_feature_once() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut host = HostObject::new(Rc::new(Messenger::new()));
        host.add_feature(recorder("a", &log));
        host.add_feature(recorder("b", &log));
        assert!(host.remove_feature("a"));
        assert!(!host.remove_feature("a"));
        assert!(host.discard());
        assert!(!host.discard());
        host.update(16.0);
        assert_eq!(*log.borrow(), vec!["a:discard", "b:discard"]);
        assert!(host.feature_names().is_empty());
    }
}
