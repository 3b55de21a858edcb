#![forbid(unsafe_code)]

//! Frame trigger hooks handed to the scene tree.
//!
//! Triggers only record that a repaint was requested. The owning instance
//! drains the requests (see [`Instance::pump`](crate::instance::Instance::pump))
//! and runs the compositor itself, so a tree can fire triggers from inside
//! its own mutation logic without re-entering the compositor while the tree
//! is still being mutated. Any number of requests between two drains
//! collapse into one.
//!
//! Triggers are `Send + Sync`; a tree mutated from another thread may fire
//! them freely. Compositor runs stay serialized on the instance.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

#[derive(Debug, Default)]
struct TriggerState {
    immediate: AtomicBool,
    throttled: AtomicBool,
    detached: AtomicBool,
    fired: AtomicU64,
}

/// Repaint requests drained from [`FrameTriggers`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TriggerRequest {
    /// An unthrottled repaint was requested.
    pub immediate: bool,
    /// A throttled repaint was requested.
    pub throttled: bool,
}

impl TriggerRequest {
    /// Whether anything was requested.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        !self.immediate && !self.throttled
    }
}

/// The two mutation hooks wired into a scene tree.
#[derive(Debug, Clone, Default)]
pub struct FrameTriggers {
    inner: Arc<TriggerState>,
}

impl FrameTriggers {
    /// Fresh, attached triggers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a repaint through the throttle.
    pub fn trigger_throttled(&self) {
        if self.inner.detached.load(Ordering::Acquire) {
            return;
        }
        self.inner.fired.fetch_add(1, Ordering::Relaxed);
        self.inner.throttled.store(true, Ordering::Release);
    }

    /// Request an unthrottled repaint.
    pub fn trigger_immediate(&self) {
        if self.inner.detached.load(Ordering::Acquire) {
            return;
        }
        self.inner.fired.fetch_add(1, Ordering::Relaxed);
        self.inner.immediate.store(true, Ordering::Release);
    }

    /// Whether the owning instance has detached these triggers.
    #[must_use]
    pub fn is_detached(&self) -> bool {
        self.inner.detached.load(Ordering::Acquire)
    }

    /// Accepted trigger calls since creation.
    #[must_use]
    pub fn fired_count(&self) -> u64 {
        self.inner.fired.load(Ordering::Relaxed)
    }

    /// Whether a request is waiting to be drained.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.inner.immediate.load(Ordering::Acquire) || self.inner.throttled.load(Ordering::Acquire)
    }

    /// Take and reset the pending requests.
    pub(crate) fn take(&self) -> TriggerRequest {
        TriggerRequest {
            immediate: self.inner.immediate.swap(false, Ordering::AcqRel),
            throttled: self.inner.throttled.swap(false, Ordering::AcqRel),
        }
    }

    /// Permanently disable the triggers and drop pending requests.
    pub(crate) fn detach(&self) {
        self.inner.detached.store(true, Ordering::Release);
        self.take();
    }
}
