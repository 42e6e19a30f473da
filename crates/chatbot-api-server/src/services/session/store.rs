use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info};

use super::types::Session;
use crate::config::SettingsHandle;
use crate::models::chat::{ChatMessage, Message};

/// Thread-safe in-memory session store.
///
/// Every read-modify-write runs under the DashMap shard lock of its entry, so
/// concurrent appends to the same session serialize and the sweep cannot drop a
/// session between its staleness check and a concurrent touch.
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<DashMap<String, Session>>,
    settings: SettingsHandle,
}

impl SessionStore {
    pub fn new(settings: SettingsHandle) -> Self {
        info!("Initializing session store with DashMap");
        Self {
            storage: Arc::new(DashMap::new()),
            settings,
        }
    }

    /// Snapshot of the session, created empty on first access.
    pub fn get_or_create(&self, session_id: &str) -> Session {
        self.storage
            .entry(session_id.to_string())
            .or_insert_with(|| {
                debug!("Creating session {}", session_id);
                Session::new(session_id.to_string(), Utc::now())
            })
            .clone()
    }

    pub fn append(&self, session_id: &str, message: Message) {
        self.append_at(session_id, message, Utc::now());
    }

    fn append_at(&self, session_id: &str, message: Message, now: DateTime<Utc>) {
        let max_messages = self.settings.current().session.max_messages_per_session;

        let mut entry = self
            .storage
            .entry(session_id.to_string())
            .or_insert_with(|| Session::new(session_id.to_string(), now));
        entry.push(message, max_messages, now);

        debug!(
            "Session {} now holds {} messages",
            session_id,
            entry.messages.len()
        );
    }

    /// Stored messages projected for provider consumption.
    pub fn history(&self, session_id: &str) -> Vec<ChatMessage> {
        self.storage
            .entry(session_id.to_string())
            .or_insert_with(|| Session::new(session_id.to_string(), Utc::now()))
            .history()
    }

    /// Remove sessions idle for longer than the configured max age.
    /// Returns the number of sessions removed.
    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Utc::now())
    }

    pub fn sweep_expired_at(&self, now: DateTime<Utc>) -> usize {
        let max_age = self.settings.current().session.max_age();

        let start_len = self.storage.len();
        self.storage
            .retain(|_, session: &mut Session| !session.is_expired(now, max_age));
        let count = start_len.saturating_sub(self.storage.len());

        if count > 0 {
            info!("Swept {} expired sessions", count);
        }

        count
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.storage.contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            active_sessions: self.storage.len(),
            stored_messages: self.storage.iter().map(|s| s.messages.len()).sum(),
        }
    }
}

/// Store statistics for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    pub active_sessions: usize,
    pub stored_messages: usize,
}
