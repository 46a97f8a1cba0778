//! Time-boxed value transitions.
//!
//! An [`Interpolator`] blends from a start value to a target over a duration
//! measured in accumulated milliseconds of host `delta_ms`.

pub mod functions;

pub use functions::{Easing, Lerp};

use crate::error::AnimationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpStatus {
    Pending,
    Settled,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct Interpolator<T: Lerp> {
    from: T,
    to: T,
    current: T,
    duration_ms: f32,
    elapsed_ms: f32,
    easing: Easing,
    status: InterpStatus,
}

impl<T: Lerp> Interpolator<T> {
    /// Create a transition. Negative or non-finite durations are rejected;
    /// a zero duration settles immediately at `to`.
    pub fn new(from: T, to: T, duration_ms: f32, easing: Easing) -> Result<Self, AnimationError> {
        if !duration_ms.is_finite() || duration_ms < 0.0 {
            return Err(AnimationError::invalid_transition(format!(
                "duration must be a non-negative number of milliseconds, got {duration_ms}"
            )));
        }
        let settled = duration_ms == 0.0;
        Ok(Self {
            from,
            to,
            current: if settled { to } else { from },
            duration_ms,
            elapsed_ms: 0.0,
            easing,
            status: if settled {
                InterpStatus::Settled
            } else {
                InterpStatus::Pending
            },
        })
    }

    /// Advance by `delta_ms` and return the blended value.
    /// Settled or cancelled interpolators hold their last value.
    pub fn step(&mut self, delta_ms: f32) -> T {
        if self.status != InterpStatus::Pending {
            return self.current;
        }
        self.elapsed_ms += delta_ms.max(0.0);
        if self.elapsed_ms >= self.duration_ms {
            self.elapsed_ms = self.duration_ms;
            self.current = self.to;
            self.status = InterpStatus::Settled;
        } else {
            let t = self.easing.apply(self.elapsed_ms / self.duration_ms);
            self.current = self.from.lerp(self.to, t);
        }
        self.current
    }

    /// Stop where it is. The current value is kept.
    pub fn cancel(&mut self) -> bool {
        if self.status == InterpStatus::Pending {
            self.status = InterpStatus::Cancelled;
            true
        } else {
            false
        }
    }

    #[inline]
    pub fn value(&self) -> T {
        self.current
    }

    #[inline]
    pub fn target(&self) -> T {
        self.to
    }

    #[inline]
    pub fn status(&self) -> InterpStatus {
        self.status
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.status == InterpStatus::Pending
    }

    /// Raw (un-eased) progress in [0, 1].
    #[inline]
    pub fn progress(&self) -> f32 {
        if self.duration_ms <= 0.0 {
            1.0
        } else {
            (self.elapsed_ms / self.duration_ms).clamp(0.0, 1.0)
        }
    }

    #[inline]
    pub fn remaining_ms(&self) -> f32 {
        (self.duration_ms - self.elapsed_ms).max(0.0)
    }
}
