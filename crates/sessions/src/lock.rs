//! Per-session concurrency control.
//!
//! Ensures only one turn runs per session at a time.  A second message for
//! the same session waits until the first turn releases its permit; turns
//! for different sessions never wait on each other.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use dm_domain::error::{Error, Result};

/// Manages per-session run locks.
///
/// Each session key maps to a `Semaphore(1)`.  Holding the permit grants
/// exclusive read-modify-write access to that session; it auto-releases on
/// drop, including when the turn returns early with an error.
pub struct SessionLockMap {
    locks: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl Default for SessionLockMap {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionLockMap {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Acquire the run lock for a session, waiting for any in-flight turn.
    pub async fn acquire(&self, session_key: &str) -> Result<OwnedSemaphorePermit> {
        let sem = {
            let mut locks = self.locks.lock();
            locks
                .entry(session_key.to_owned())
                .or_insert_with(|| Arc::new(Semaphore::new(1)))
                .clone()
        };

        sem.acquire_owned()
            .await
            .map_err(|_| Error::Other(format!("session lock for {session_key} was closed")))
    }

    /// Number of tracked sessions (for monitoring).
    pub fn session_count(&self) -> usize {
        self.locks.lock().len()
    }

    /// Drop locks nobody holds or waits on.  A semaphore referenced only by
    /// the map has no permit holder and no queued waiter.
    pub fn prune_idle(&self) -> usize {
        let mut locks = self.locks.lock();
        let before = locks.len();
        locks.retain(|_, sem| Arc::strong_count(sem) > 1);
        before - locks.len()
    }
}
