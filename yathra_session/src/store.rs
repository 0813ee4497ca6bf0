use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};
use yathra_core::{SeedPair, Transcript, Turn};

use crate::error::SessionError;
use crate::history::{HistoryConfig, HistoryWindow};

/// Shared, exclusively-lockable transcript of one identity.
///
/// Holding the lock is what serializes turns for that identity.
pub type SessionHandle = Arc<Mutex<Transcript>>;

/// Bounds on the store as a whole and on each transcript.
#[derive(Debug, Clone, Copy)]
pub struct StoreConfig {
    /// Maximum live identities; the least recently active one is evicted
    /// to make room. `None` means unbounded.
    pub max_sessions: Option<usize>,
    /// Idle time after which an identity is forgotten. `None` disables.
    pub idle_ttl: Option<Duration>,
    pub history: HistoryConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_sessions: Some(10_000),
            idle_ttl: Some(Duration::from_secs(3600)),
            history: HistoryConfig::default(),
        }
    }
}

impl StoreConfig {
    /// No eviction, no expiry, no trimming.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            max_sessions: None,
            idle_ttl: None,
            history: HistoryConfig::unbounded(),
        }
    }
}

#[derive(Debug)]
struct SessionEntry {
    transcript: SessionHandle,
    last_activity: DateTime<Utc>,
}

impl SessionEntry {
    fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        let Ok(ttl) = chrono::TimeDelta::from_std(ttl) else {
            return false;
        };
        now - self.last_activity > ttl
    }

    /// A transcript whose lock is held has a turn in flight.
    fn in_use(&self) -> bool {
        self.transcript.try_lock().is_err()
    }
}

/// In-memory map from identity to transcript.
///
/// Lives for as long as its owner keeps it; nothing is persisted.
#[derive(Debug)]
pub struct SessionStore {
    seed: SeedPair,
    config: StoreConfig,
    window: HistoryWindow,
    sessions: RwLock<HashMap<String, SessionEntry>>,
}

impl SessionStore {
    #[must_use]
    pub fn new(seed: SeedPair, config: StoreConfig) -> Self {
        info!(
            "Creating session store: max_sessions={:?}, idle_ttl={:?}, max_turns={:?}",
            config.max_sessions, config.idle_ttl, config.history.max_turns
        );
        Self {
            seed,
            window: HistoryWindow::with_config(config.history),
            config,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub const fn seed(&self) -> &SeedPair {
        &self.seed
    }

    #[must_use]
    pub const fn window(&self) -> &HistoryWindow {
        &self.window
    }

    /// Return the identity's transcript, creating a seeded one if absent.
    ///
    /// Check and insert happen under one write lock, so concurrent callers
    /// for a new identity all observe the same single seed pair.
    pub async fn get_or_init(&self, identity: &str) -> SessionHandle {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;

        if let Some(entry) = sessions.get_mut(identity) {
            let expired = self
                .config
                .idle_ttl
                .is_some_and(|ttl| entry.is_expired(ttl, now) && !entry.in_use());
            if !expired {
                entry.last_activity = now;
                return Arc::clone(&entry.transcript);
            }
            debug!("Session for {identity} expired, starting over");
        }

        let at_capacity = self
            .config
            .max_sessions
            .is_some_and(|max| sessions.len() >= max);
        if at_capacity && !sessions.contains_key(identity) {
            Self::evict_least_recent(&mut sessions);
        }

        let transcript = Arc::new(Mutex::new(Transcript::seeded(&self.seed)));
        sessions.insert(
            identity.to_string(),
            SessionEntry {
                transcript: Arc::clone(&transcript),
                last_activity: now,
            },
        );
        debug!("Initialized session for {identity}");
        transcript
    }

    /// Append a turn to an existing transcript.
    pub async fn append(&self, identity: &str, turn: Turn) -> Result<(), SessionError> {
        let handle = {
            let sessions = self.sessions.read().await;
            let entry = sessions
                .get(identity)
                .ok_or_else(|| SessionError::UnknownIdentity(identity.to_string()))?;
            Arc::clone(&entry.transcript)
        };

        let mut transcript = handle.lock().await;
        self.record(identity, &mut transcript, turn).await;
        Ok(())
    }

    /// Append a turn to a transcript whose lock the caller already holds.
    ///
    /// Applies the history window and refreshes the identity's activity
    /// time. Returns how many old turns the window dropped. An identity
    /// that was reset meanwhile is not recreated.
    pub async fn record(&self, identity: &str, transcript: &mut Transcript, turn: Turn) -> usize {
        transcript.push(turn);
        let trimmed = self.window.apply(transcript);

        if let Some(entry) = self.sessions.write().await.get_mut(identity) {
            entry.last_activity = Utc::now();
        }
        trimmed
    }

    /// Snapshot of the identity's transcript, if any.
    pub async fn transcript(&self, identity: &str) -> Option<Transcript> {
        let handle = {
            let sessions = self.sessions.read().await;
            Arc::clone(&sessions.get(identity)?.transcript)
        };
        let transcript = handle.lock().await;
        Some(transcript.clone())
    }

    /// Forget one identity. Returns whether it existed.
    pub async fn reset(&self, identity: &str) -> bool {
        let removed = self.sessions.write().await.remove(identity).is_some();
        if removed {
            info!("Reset session: {identity}");
        }
        removed
    }

    /// Drop identities idle for longer than the configured TTL.
    pub async fn evict_expired(&self) -> usize {
        let Some(ttl) = self.config.idle_ttl else {
            return 0;
        };
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| entry.in_use() || !entry.is_expired(ttl, now));
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!("Evicted {evicted} idle sessions");
        }
        evicted
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    pub async fn clear(&self) {
        let mut sessions = self.sessions.write().await;
        let count = sessions.len();
        sessions.clear();
        info!("Cleared {count} sessions");
    }

    fn evict_least_recent(sessions: &mut HashMap<String, SessionEntry>) {
        let oldest = sessions
            .iter()
            .filter(|(_, entry)| !entry.in_use())
            .min_by_key(|(_, entry)| entry.last_activity)
            .map(|(identity, _)| identity.clone());

        if let Some(identity) = oldest {
            sessions.remove(&identity);
            debug!("Evicted least recently active session: {identity}");
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(SeedPair::default(), StoreConfig::default())
    }
}
