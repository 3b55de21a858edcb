#![forbid(unsafe_code)]

//! Process-wide map from output stream to the instance painting on it.
//!
//! Two instances painting on one stream would erase each other's live
//! regions, so ownership is exclusive.
//!
//! # Lifecycle
//!
//! 1. Mounting an instance claims its stream ([`StreamRegistry::claim`]).
//!    A claim on a stream owned by another instance fails.
//! 2. [`render`](crate::instance::render) attaches a shareable handle to the
//!    claim so a later `render` on the same stream reuses the instance.
//! 3. Unmounting releases the claim. Release is owner-checked: a stale
//!    instance can never release a claim it lost.
//!
//! The [`global`](StreamRegistry::global) registry serves the process; tests
//! and embedders can create isolated registries.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::error::{Error, Result};
use crate::stream::StreamId;

/// Identity of one mounted instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(u64);

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

impl InstanceId {
    /// Allocate a fresh identity.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Type-erased shareable handle stored alongside a claim.
pub type SharedHandle = Arc<dyn Any + Send + Sync>;

struct Claim {
    owner: InstanceId,
    handle: Option<SharedHandle>,
}

static GLOBAL: LazyLock<Arc<StreamRegistry>> = LazyLock::new(|| Arc::new(StreamRegistry::new()));

/// Stream ownership registry.
#[derive(Default)]
pub struct StreamRegistry {
    claims: Mutex<HashMap<StreamId, Claim>>,
}

impl StreamRegistry {
    /// Empty, isolated registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    #[must_use]
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL)
    }

    /// Claim `stream` for `owner`.
    ///
    /// Re-claiming by the current owner succeeds.
    pub fn claim(&self, stream: StreamId, owner: InstanceId) -> Result<()> {
        let mut claims = self.lock();
        match claims.get(&stream) {
            Some(claim) if claim.owner != owner => Err(Error::StreamBusy(stream)),
            Some(_) => Ok(()),
            None => {
                claims.insert(
                    stream,
                    Claim {
                        owner,
                        handle: None,
                    },
                );
                debug!(%stream, owner = owner.get(), "stream claimed");
                Ok(())
            }
        }
    }

    /// Attach a shareable handle to `owner`'s claim on `stream`.
    ///
    /// Returns `false` if `owner` does not hold the claim.
    pub fn attach_handle(&self, stream: StreamId, owner: InstanceId, handle: SharedHandle) -> bool {
        match self.lock().get_mut(&stream) {
            Some(claim) if claim.owner == owner => {
                claim.handle = Some(handle);
                true
            }
            _ => false,
        }
    }

    /// Handle attached to the claim on `stream`.
    #[must_use]
    pub fn lookup(&self, stream: StreamId) -> Option<SharedHandle> {
        self.lock()
            .get(&stream)
            .and_then(|claim| claim.handle.clone())
    }

    /// Current owner of `stream`.
    #[must_use]
    pub fn owner(&self, stream: StreamId) -> Option<InstanceId> {
        self.lock().get(&stream).map(|claim| claim.owner)
    }

    /// Release `owner`'s claim on `stream`.
    ///
    /// Returns whether a claim was released.
    pub fn release(&self, stream: StreamId, owner: InstanceId) -> bool {
        let mut claims = self.lock();
        match claims.get(&stream) {
            Some(claim) if claim.owner == owner => {
                // Drop the handle outside the lock; it may own an instance.
                let released = claims.remove(&stream);
                drop(claims);
                drop(released);
                debug!(%stream, owner = owner.get(), "stream released");
                true
            }
            _ => false,
        }
    }

    /// Whether `stream` is claimed.
    #[must_use]
    pub fn contains(&self, stream: StreamId) -> bool {
        self.lock().contains_key(&stream)
    }

    /// Number of claimed streams.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no stream is claimed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<StreamId, Claim>> {
        self.claims.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for StreamRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamRegistry")
            .field("claims", &self.len())
            .finish()
    }
}
