//! Leading + trailing frame throttle.
//!
//! Bounds how often the compositor runs in interactive mode while
//! guaranteeing the latest state is always painted.
//!
//! # Usage
//!
//! ```
//! use std::time::{Duration, Instant};
//! use inkling_runtime::throttle::{Edge, RenderThrottle, ThrottleAction, ThrottleConfig};
//!
//! let mut throttle = RenderThrottle::new(ThrottleConfig::default());
//! let t0 = Instant::now();
//!
//! // First trigger in an idle period runs immediately.
//! assert_eq!(throttle.trigger_at(t0), ThrottleAction::Run(Edge::Leading));
//!
//! // Triggers inside the window coalesce into one trailing run.
//! assert!(matches!(
//!     throttle.trigger_at(t0 + Duration::from_millis(5)),
//!     ThrottleAction::Deferred { .. }
//! ));
//! assert_eq!(
//!     throttle.tick_at(t0 + Duration::from_millis(32)),
//!     ThrottleAction::Run(Edge::Trailing)
//! );
//! ```
//!
//! # Invariants
//!
//! - **No loss**: a trigger that does not run immediately always leaves a
//!   trailing run pending.
//! - **Bounded**: triggers inside one window produce at most two runs
//!   (leading, then trailing at the window's end).
//! - **Spacing**: two runs are never closer than `window`, except when an
//!   overdue trailing run fires late.
//! - **Deterministic**: identical trigger/tick sequences yield identical
//!   actions.
//!
//! A trailing run is never cancelled because a later frame made it stale.
//! It still fires, and the compositor's equal-output suppression turns it
//! into a no-op.

#![forbid(unsafe_code)]

use std::time::{Duration, Instant};

use tracing::trace;

/// Reference throttle window in milliseconds.
pub const DEFAULT_WINDOW_MS: u64 = 32;

#[inline]
fn duration_since_or_zero(now: Instant, earlier: Instant) -> Duration {
    now.checked_duration_since(earlier)
        .unwrap_or(Duration::ZERO)
}

/// Configuration for the render throttle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleConfig {
    /// Minimum spacing between two compositor runs.
    pub window: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_millis(DEFAULT_WINDOW_MS),
        }
    }
}

impl ThrottleConfig {
    /// Config with the given window.
    #[must_use]
    pub const fn new(window: Duration) -> Self {
        Self { window }
    }

    /// Set the window in milliseconds.
    #[must_use]
    pub const fn with_window_ms(mut self, ms: u64) -> Self {
        self.window = Duration::from_millis(ms);
        self
    }
}

/// Which edge of the window a run belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// First trigger in an idle period.
    Leading,
    /// Deferred run at the end of a window.
    Trailing,
}

impl Edge {
    /// Stable string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Leading => "leading",
            Self::Trailing => "trailing",
        }
    }
}

/// Action returned by the throttle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleAction {
    /// Run the compositor now.
    Run(Edge),
    /// A trailing run is pending until the given instant.
    Deferred {
        /// When the trailing run becomes due.
        until: Instant,
    },
    /// Nothing pending.
    Idle,
}

/// Counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThrottleStats {
    /// Triggers received.
    pub triggers: u64,
    /// Runs on the leading edge.
    pub leading_runs: u64,
    /// Runs on the trailing edge.
    pub trailing_runs: u64,
    /// Triggers folded into a pending trailing run.
    pub coalesced: u64,
}

impl ThrottleStats {
    /// Total runs on either edge.
    #[must_use]
    pub const fn runs(&self) -> u64 {
        self.leading_runs + self.trailing_runs
    }
}

/// Leading + trailing throttle over an injected clock.
#[derive(Debug, Clone)]
pub struct RenderThrottle {
    config: ThrottleConfig,
    last_run: Option<Instant>,
    trailing_deadline: Option<Instant>,
    stats: ThrottleStats,
}

impl RenderThrottle {
    /// New idle throttle.
    #[must_use]
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            config,
            last_run: None,
            trailing_deadline: None,
            stats: ThrottleStats::default(),
        }
    }

    /// Handle a trigger.
    pub fn trigger(&mut self) -> ThrottleAction {
        self.trigger_at(Instant::now())
    }

    /// Handle a trigger at a specific time (for testing).
    pub fn trigger_at(&mut self, now: Instant) -> ThrottleAction {
        self.stats.triggers += 1;

        if let Some(deadline) = self.trailing_deadline {
            if now >= deadline {
                return self.fire_trailing(now);
            }
            self.stats.coalesced += 1;
            trace!(?deadline, "throttle: coalesced into pending trailing run");
            return ThrottleAction::Deferred { until: deadline };
        }

        match self.last_run {
            Some(last) if duration_since_or_zero(now, last) < self.config.window => {
                let deadline = last + self.config.window;
                self.trailing_deadline = Some(deadline);
                self.stats.coalesced += 1;
                trace!(?deadline, "throttle: trailing run scheduled");
                ThrottleAction::Deferred { until: deadline }
            }
            _ => {
                self.last_run = Some(now);
                self.stats.leading_runs += 1;
                trace!("throttle: leading run");
                ThrottleAction::Run(Edge::Leading)
            }
        }
    }

    /// Advance the clock.
    pub fn tick(&mut self) -> ThrottleAction {
        self.tick_at(Instant::now())
    }

    /// Advance the clock to a specific time (for testing).
    pub fn tick_at(&mut self, now: Instant) -> ThrottleAction {
        match self.trailing_deadline {
            Some(deadline) if now >= deadline => self.fire_trailing(now),
            Some(deadline) => ThrottleAction::Deferred { until: deadline },
            None => ThrottleAction::Idle,
        }
    }

    /// Record a run that bypassed the throttle and already painted the
    /// latest state. Any pending trailing run is satisfied by it.
    pub fn record_external_run(&mut self, now: Instant) {
        self.last_run = Some(now);
        if self.trailing_deadline.take().is_some() {
            trace!("throttle: pending trailing run satisfied externally");
        }
    }

    /// Drop the pending trailing run, returning whether one was pending.
    pub fn take_pending(&mut self) -> bool {
        self.trailing_deadline.take().is_some()
    }

    /// Time until the pending trailing run is due.
    #[must_use]
    pub fn time_until_trailing(&self, now: Instant) -> Option<Duration> {
        self.trailing_deadline
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// Instant the pending trailing run is due.
    #[inline]
    #[must_use]
    pub fn trailing_deadline(&self) -> Option<Instant> {
        self.trailing_deadline
    }

    /// Whether a trailing run is pending.
    #[inline]
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.trailing_deadline.is_some()
    }

    /// Counters since construction.
    #[inline]
    #[must_use]
    pub fn stats(&self) -> ThrottleStats {
        self.stats
    }

    /// Active configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> ThrottleConfig {
        self.config
    }

    fn fire_trailing(&mut self, now: Instant) -> ThrottleAction {
        self.trailing_deadline = None;
        self.last_run = Some(now);
        self.stats.trailing_runs += 1;
        trace!("throttle: trailing run");
        ThrottleAction::Run(Edge::Trailing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn throttle() -> RenderThrottle {
        RenderThrottle::new(ThrottleConfig::default())
    }

    #[test]
    fn new_throttle_is_idle() {
        let mut t = throttle();
        assert!(!t.has_pending());
        assert_eq!(t.tick_at(Instant::now()), ThrottleAction::Idle);
    }

    #[test]
    fn first_trigger_runs_leading() {
        let mut t = throttle();
        assert_eq!(t.trigger_at(Instant::now()), ThrottleAction::Run(Edge::Leading));
        assert!(!t.has_pending());
    }

    #[test]
    fn burst_collapses_to_leading_plus_trailing() {
        let mut t = throttle();
        let base = Instant::now();
        assert_eq!(t.trigger_at(base), ThrottleAction::Run(Edge::Leading));
        for i in 1..10 {
            let action = t.trigger_at(base + ms(i * 3));
            assert_eq!(action, ThrottleAction::Deferred { until: base + ms(32) });
        }
        assert_eq!(
            t.tick_at(base + ms(31)),
            ThrottleAction::Deferred { until: base + ms(32) }
        );
        assert_eq!(t.tick_at(base + ms(32)), ThrottleAction::Run(Edge::Trailing));
        assert_eq!(t.tick_at(base + ms(40)), ThrottleAction::Idle);

        let stats = t.stats();
        assert_eq!(stats.triggers, 10);
        assert_eq!(stats.runs(), 2);
        assert_eq!(stats.coalesced, 9);
    }

    #[test]
    fn trigger_after_window_runs_leading_again() {
        let mut t = throttle();
        let base = Instant::now();
        t.trigger_at(base);
        assert_eq!(t.trigger_at(base + ms(50)), ThrottleAction::Run(Edge::Leading));
    }

    #[test]
    fn trigger_right_after_trailing_is_spaced_by_window() {
        let mut t = throttle();
        let base = Instant::now();
        t.trigger_at(base);
        t.trigger_at(base + ms(1));
        t.tick_at(base + ms(32));
        assert_eq!(
            t.trigger_at(base + ms(33)),
            ThrottleAction::Deferred { until: base + ms(64) }
        );
    }

    #[test]
    fn overdue_trailing_fires_on_next_trigger() {
        let mut t = throttle();
        let base = Instant::now();
        t.trigger_at(base);
        t.trigger_at(base + ms(1));
        // No tick happened; the next trigger arrives after the deadline.
        assert_eq!(t.trigger_at(base + ms(100)), ThrottleAction::Run(Edge::Trailing));
        assert!(!t.has_pending());
    }

    #[test]
    fn time_until_trailing_counts_down() {
        let mut t = throttle();
        let base = Instant::now();
        assert_eq!(t.time_until_trailing(base), None);
        t.trigger_at(base);
        t.trigger_at(base + ms(10));
        assert_eq!(t.time_until_trailing(base + ms(10)), Some(ms(22)));
        assert_eq!(t.time_until_trailing(base + ms(50)), Some(Duration::ZERO));
    }

    #[test]
    fn external_run_satisfies_pending() {
        let mut t = throttle();
        let base = Instant::now();
        t.trigger_at(base);
        t.trigger_at(base + ms(5));
        t.record_external_run(base + ms(6));
        assert!(!t.has_pending());
        assert_eq!(t.tick_at(base + ms(40)), ThrottleAction::Idle);
    }

    #[test]
    fn take_pending_reports_and_clears() {
        let mut t = throttle();
        let base = Instant::now();
        assert!(!t.take_pending());
        t.trigger_at(base);
        t.trigger_at(base + ms(1));
        assert!(t.take_pending());
        assert!(!t.has_pending());
    }

    #[test]
    fn zero_window_never_defers() {
        let mut t = RenderThrottle::new(ThrottleConfig::new(Duration::ZERO));
        let base = Instant::now();
        for _ in 0..5 {
            assert_eq!(t.trigger_at(base), ThrottleAction::Run(Edge::Leading));
        }
    }
}
