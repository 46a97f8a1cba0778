//! Deferred: an externally settled result handle.
//!
//! A `Deferred` starts pending and settles exactly once as resolved, rejected
//! or cancelled. Continuations run synchronously inside the settling call.
//! Handles are cheap clones sharing one cell, so the state that owns the work
//! and the caller awaiting it observe the same status.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::error::AnimationError;

type ResolveFn = Box<dyn FnOnce()>;
type RejectFn = Box<dyn FnOnce(&AnimationError)>;
type CancelFn = Box<dyn FnOnce()>;

/// Settlement status of a [`Deferred`].
#[derive(Debug, Clone, PartialEq)]
pub enum DeferredStatus {
    Pending,
    Resolved,
    Rejected(AnimationError),
    Cancelled,
}

impl DeferredStatus {
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Resolved => "resolved",
            Self::Rejected(_) => "rejected",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Optional continuations for lifecycle calls (`play`, `resume`, ...).
#[derive(Default)]
pub struct Callbacks {
    pub on_finish: Option<ResolveFn>,
    pub on_error: Option<RejectFn>,
    pub on_cancel: Option<CancelFn>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_finish(mut self, f: impl FnOnce() + 'static) -> Self {
        self.on_finish = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl FnOnce(&AnimationError) + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    pub fn on_cancel(mut self, f: impl FnOnce() + 'static) -> Self {
        self.on_cancel = Some(Box::new(f));
        self
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.on_finish.is_none() && self.on_error.is_none() && self.on_cancel.is_none()
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_finish", &self.on_finish.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_cancel", &self.on_cancel.is_some())
            .finish()
    }
}

struct Inner {
    status: DeferredStatus,
    on_resolve: Vec<ResolveFn>,
    on_reject: Vec<RejectFn>,
    on_cancel: Vec<CancelFn>,
}

#[derive(Clone)]
pub struct Deferred {
    inner: Rc<RefCell<Inner>>,
}

impl Deferred {
    /// Create a pending handle with no continuations.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                status: DeferredStatus::Pending,
                on_resolve: Vec::new(),
                on_reject: Vec::new(),
                on_cancel: Vec::new(),
            })),
        }
    }

    /// Create a pending handle carrying the given continuations.
    pub fn with_callbacks(callbacks: Callbacks) -> Self {
        let deferred = Self::new();
        deferred.attach(callbacks);
        deferred
    }

    /// Create an already resolved handle (used for zero-length transitions).
    pub fn resolved() -> Self {
        let deferred = Self::new();
        deferred.resolve();
        deferred
    }

    pub fn status(&self) -> DeferredStatus {
        self.inner.borrow().status.clone()
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        matches!(self.inner.borrow().status, DeferredStatus::Pending)
    }

    #[inline]
    pub fn is_resolved(&self) -> bool {
        matches!(self.inner.borrow().status, DeferredStatus::Resolved)
    }

    #[inline]
    pub fn is_rejected(&self) -> bool {
        matches!(self.inner.borrow().status, DeferredStatus::Rejected(_))
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        matches!(self.inner.borrow().status, DeferredStatus::Cancelled)
    }

    #[inline]
    pub fn is_settled(&self) -> bool {
        !self.is_pending()
    }

    /// Whether both handles share the same settlement cell.
    #[inline]
    pub fn ptr_eq(&self, other: &Deferred) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Attach a batch of continuations.
    pub fn attach(&self, callbacks: Callbacks) {
        let Callbacks {
            on_finish,
            on_error,
            on_cancel,
        } = callbacks;
        if let Some(f) = on_finish {
            self.on_resolve(f);
        }
        if let Some(f) = on_error {
            self.on_reject(f);
        }
        if let Some(f) = on_cancel {
            self.on_cancel(f);
        }
    }

    /// Register a resolve continuation. Runs immediately if already resolved,
    /// is dropped if the handle settled another way.
    pub fn on_resolve(&self, f: impl FnOnce() + 'static) {
        let status = {
            let mut inner = self.inner.borrow_mut();
            if matches!(inner.status, DeferredStatus::Pending) {
                inner.on_resolve.push(Box::new(f));
                return;
            }
            inner.status.clone()
        };
        if status == DeferredStatus::Resolved {
            f();
        }
    }

    pub fn on_reject(&self, f: impl FnOnce(&AnimationError) + 'static) {
        let status = {
            let mut inner = self.inner.borrow_mut();
            if matches!(inner.status, DeferredStatus::Pending) {
                inner.on_reject.push(Box::new(f));
                return;
            }
            inner.status.clone()
        };
        if let DeferredStatus::Rejected(err) = status {
            f(&err);
        }
    }

    pub fn on_cancel(&self, f: impl FnOnce() + 'static) {
        let status = {
            let mut inner = self.inner.borrow_mut();
            if matches!(inner.status, DeferredStatus::Pending) {
                inner.on_cancel.push(Box::new(f));
                return;
            }
            inner.status.clone()
        };
        if status == DeferredStatus::Cancelled {
            f();
        }
    }

    /// Resolve. Returns false if the handle was already settled.
    pub fn resolve(&self) -> bool {
        self.settle(DeferredStatus::Resolved)
    }

    /// Reject with an error. Returns false if the handle was already settled.
    pub fn reject(&self, err: AnimationError) -> bool {
        self.settle(DeferredStatus::Rejected(err))
    }

    /// Cancel. Returns false if the handle was already settled.
    pub fn cancel(&self) -> bool {
        self.settle(DeferredStatus::Cancelled)
    }

    fn settle(&self, status: DeferredStatus) -> bool {
        // Continuations are taken out before running so they may inspect this handle.
        let (resolves, rejects, cancels) = {
            let mut inner = self.inner.borrow_mut();
            if !matches!(inner.status, DeferredStatus::Pending) {
                debug!(
                    "ignoring {} on a deferred that is already {}",
                    status.name(),
                    inner.status.name()
                );
                return false;
            }
            inner.status = status.clone();
            (
                std::mem::take(&mut inner.on_resolve),
                std::mem::take(&mut inner.on_reject),
                std::mem::take(&mut inner.on_cancel),
            )
        };

        match status {
            DeferredStatus::Resolved => resolves.into_iter().for_each(|f| f()),
            DeferredStatus::Rejected(err) => rejects.into_iter().for_each(|f| f(&err)),
            DeferredStatus::Cancelled => cancels.into_iter().for_each(|f| f()),
            DeferredStatus::Pending => {}
        }
        true
    }
}

impl Default for Deferred {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("status", &self.inner.borrow().status)
            .finish()
    }
}
