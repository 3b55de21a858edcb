#![forbid(unsafe_code)]

//! Single-resolution exit signal.
//!
//! Every mounted instance owns one [`ExitSignal`]. It settles exactly once,
//! when the instance unmounts: resolved for a clean exit or a numeric code,
//! rejected when unmount was given an error. Observers that start waiting
//! after the signal settled see the same outcome.

use std::error::Error as StdError;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Error a rejected exit signal carries. Cheap to clone.
#[derive(Clone)]
pub struct ExitError {
    inner: Arc<dyn StdError + Send + Sync>,
}

impl ExitError {
    /// Wrap an application error.
    pub fn new<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(err),
        }
    }

    /// Error from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(MessageError(message.into())),
        }
    }

    /// The wrapped error.
    #[must_use]
    pub fn get_ref(&self) -> &(dyn StdError + Send + Sync + 'static) {
        &*self.inner
    }

    /// Whether two handles wrap the same error value.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ExitError").field(&self.inner.to_string()).finish()
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl StdError for ExitError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&*self.inner)
    }
}

#[derive(Debug)]
struct MessageError(String);

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl StdError for MessageError {}

/// Why an instance is unmounting.
#[derive(Debug, Clone, Default)]
pub enum ExitReason {
    /// Normal teardown.
    #[default]
    Clean,
    /// Exit code. Codes are not errors: the signal resolves.
    Code(i32),
    /// Fatal application error: the signal rejects with it.
    Error(ExitError),
}

impl ExitReason {
    /// Outcome the exit signal settles with.
    #[must_use]
    pub fn into_outcome(self) -> ExitOutcome {
        match self {
            Self::Clean | Self::Code(_) => Ok(()),
            Self::Error(err) => Err(err),
        }
    }

    /// Whether this reason rejects the signal.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

impl From<ExitError> for ExitReason {
    fn from(err: ExitError) -> Self {
        Self::Error(err)
    }
}

impl From<i32> for ExitReason {
    fn from(code: i32) -> Self {
        Self::Code(code)
    }
}

/// Settled state of an exit signal.
pub type ExitOutcome = Result<(), ExitError>;

type Slot = Arc<(Mutex<Option<ExitOutcome>>, Condvar)>;

/// Observer side of the exit signal.
#[derive(Clone)]
pub struct ExitSignal {
    inner: Slot,
}

impl ExitSignal {
    /// New unsettled signal and the resolver that settles it.
    #[must_use]
    pub fn new() -> (Self, ExitResolver) {
        let inner: Slot = Arc::new((Mutex::new(None), Condvar::new()));
        let signal = Self {
            inner: Arc::clone(&inner),
        };
        (signal, ExitResolver { inner })
    }

    /// Outcome, if settled.
    #[must_use]
    pub fn outcome(&self) -> Option<ExitOutcome> {
        let (lock, _) = &*self.inner;
        lock.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Whether the signal has settled.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        let (lock, _) = &*self.inner;
        lock.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// Block until the signal settles.
    pub fn wait(&self) -> ExitOutcome {
        let (lock, cvar) = &*self.inner;
        let mut slot = lock.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(outcome) = slot.as_ref() {
                return outcome.clone();
            }
            slot = cvar.wait(slot).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Block until the signal settles or `timeout` elapses.
    ///
    /// Returns `None` on timeout. Spurious wakeups are absorbed. A timeout
    /// too large to express as a deadline waits without one.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<ExitOutcome> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return Some(self.wait());
        };
        let (lock, cvar) = &*self.inner;
        let mut slot = lock.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(outcome) = slot.as_ref() {
                return Some(outcome.clone());
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            let (guard, _) = cvar
                .wait_timeout(slot, remaining)
                .unwrap_or_else(PoisonError::into_inner);
            slot = guard;
        }
    }

    /// Whether two handles observe the same signal.
    #[must_use]
    pub fn same_signal(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for ExitSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExitSignal")
            .field("outcome", &self.outcome())
            .finish()
    }
}

/// Settling side of the exit signal. Consumed on use.
pub struct ExitResolver {
    inner: Slot,
}

impl ExitResolver {
    /// Settle the signal and wake every waiter.
    ///
    /// Returns `false` if the slot was already filled, which only happens
    /// when a second resolver was forged for the same slot; the first
    /// outcome is kept.
    pub fn settle(self, outcome: ExitOutcome) -> bool {
        let (lock, cvar) = &*self.inner;
        let mut slot = lock.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return false;
        }
        *slot = Some(outcome);
        cvar.notify_all();
        true
    }

    /// Settle from an exit reason.
    pub fn settle_with(self, reason: ExitReason) -> bool {
        self.settle(reason.into_outcome())
    }
}

impl fmt::Debug for ExitResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExitResolver").finish_non_exhaustive()
    }
}
