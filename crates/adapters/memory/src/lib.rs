//! # Session OTP Memory Adapter
//!
//! An in-memory session store for session OTPs, primarily intended
//! for testing and development purposes, plus notifiers that keep
//! messages local.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use session_otp_adapter_memory::{MemorySessionStore, RecordingNotifier};
//!
//! let store = MemorySessionStore::new();
//! let session = store.open_session().await;
//! let manager = OtpManager::new(config, Arc::new(store), Arc::new(RecordingNotifier::new()))?;
//! ```

mod notifier;

pub use notifier::{LogNotifier, RecordingNotifier, SentMessage};

use async_trait::async_trait;
use session_otp_core::error::{OtpError, OtpResult};
use session_otp_core::traits::SessionStore;
use session_otp_core::types::{OtpRecord, SessionId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// In-memory storage keyed by session.
type Store<T> = Arc<RwLock<HashMap<SessionId, T>>>;

/// In-memory session store.
///
/// Sessions must be opened before use; unknown or ended sessions are
/// reported as `SessionUnavailable`. Each session also owns a mutex that
/// hosts hold around a request to keep concurrent requests of the same
/// client from interleaving. Data is lost when the process exits.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    records: Store<Option<OtpRecord>>,
    locks: Store<Arc<Mutex<()>>>,
}

impl MemorySessionStore {
    /// Creates a new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new session with a random identifier.
    pub async fn open_session(&self) -> SessionId {
        let session = SessionId::generate();
        self.open_session_with(session.clone()).await;
        session
    }

    /// Opens a session under a known identifier.
    ///
    /// Opening an already open session leaves its record untouched.
    pub async fn open_session_with(&self, session: SessionId) {
        self.locks
            .write()
            .await
            .entry(session.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())));
        self.records.write().await.entry(session).or_insert(None);
    }

    /// Ends a session, discarding its record.
    ///
    /// The session's request lock survives while a request holds or awaits
    /// it, so a session reopened under the same id keeps serializing with
    /// that request. Returns true if the session existed.
    pub async fn end_session(&self, session: &SessionId) -> bool {
        let mut locks = self.locks.write().await;
        let mut records = self.records.write().await;
        let existed = records.remove(session).is_some();
        prune_idle_locks(&mut locks, |id| records.contains_key(id));
        existed
    }

    /// Returns true if the session is open.
    pub async fn contains(&self, session: &SessionId) -> bool {
        self.records.read().await.contains_key(session)
    }

    /// Acquires the per-session request lock.
    ///
    /// Returns `None` for unknown sessions.
    pub async fn lock_session(&self, session: &SessionId) -> Option<OwnedMutexGuard<()>> {
        let lock = self.locks.read().await.get(session).cloned()?;
        Some(lock.lock_owned().await)
    }

    /// Returns the number of open sessions.
    pub async fn session_count(&self) -> usize {
        self.records.read().await.len()
    }

    /// Clears all stored data.
    ///
    /// Locks still in use are kept, as in [`end_session`](Self::end_session).
    pub async fn clear(&self) {
        let mut locks = self.locks.write().await;
        self.records.write().await.clear();
        prune_idle_locks(&mut locks, |_| false);
    }
}

/// Drops the locks of ended sessions that no request holds or awaits.
///
/// Callers hold the lock map for writing, so no new handle can be taken
/// while the counts are read.
fn prune_idle_locks(
    locks: &mut HashMap<SessionId, Arc<Mutex<()>>>,
    is_open: impl Fn(&SessionId) -> bool,
) {
    locks.retain(|id, lock| is_open(id) || Arc::strong_count(lock) > 1);
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, session: &SessionId) -> OtpResult<Option<OtpRecord>> {
        let records = self.records.read().await;
        records
            .get(session)
            .cloned()
            .ok_or(OtpError::SessionUnavailable)
    }

    async fn set(&self, session: &SessionId, record: Option<OtpRecord>) -> OtpResult<()> {
        let mut records = self.records.write().await;
        let slot = records
            .get_mut(session)
            .ok_or(OtpError::SessionUnavailable)?;
        *slot = record;
        Ok(())
    }
}
