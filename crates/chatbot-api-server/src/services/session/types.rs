use chrono::{DateTime, Utc};

use crate::models::chat::{ChatMessage, Message, SessionId};

/// Conversation thread owned by the [`SessionStore`](super::SessionStore).
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl Session {
    pub fn new(id: SessionId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            messages: Vec::new(),
            created_at: now,
            last_updated: now,
        }
    }

    /// Append and enforce the cap. On overflow the first message (usually a
    /// system/context message) is kept together with the most recent
    /// `max_messages - 1` messages.
    pub fn push(&mut self, message: Message, max_messages: usize, now: DateTime<Utc>) {
        self.messages.push(message);

        if self.messages.len() > max_messages {
            let keep_recent = max_messages.saturating_sub(1);
            let drop_until = self.messages.len() - keep_recent;
            self.messages.drain(1..drop_until);
        }

        self.last_updated = now;
    }

    pub fn is_expired(&self, now: DateTime<Utc>, max_age: chrono::Duration) -> bool {
        now - self.last_updated > max_age
    }

    pub fn history(&self) -> Vec<ChatMessage> {
        self.messages.iter().map(ChatMessage::from).collect()
    }
}
