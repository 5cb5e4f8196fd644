use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::app::{Rejection, Result, ThriftError};
use crate::domain::{ChatId, ItemId, ThreadKey, UserId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Text,
    Image,
    System,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Image => "image",
            MessageKind::System => "system",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = ThriftError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(MessageKind::Text),
            "image" => Ok(MessageKind::Image),
            "system" => Ok(MessageKind::System),
            other => Err(ThriftError::Validation(format!("unknown message kind: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Position in the thread's log.
    pub id: u32,
    pub sender_id: UserId,
    pub content: String,
    pub kind: MessageKind,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Cached preview of the newest message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastMessage {
    pub content: String,
    pub sender_id: UserId,
    pub timestamp: DateTime<Utc>,
}

/// A buyer/seller conversation about one item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatThread {
    pub id: ChatId,
    /// Sorted ascending.
    pub participants: [UserId; 2],
    pub item_id: ItemId,
    pub messages: Vec<Message>,
    pub last_message: Option<LastMessage>,
    pub unread_count: BTreeMap<UserId, u32>,
    pub last_activity: DateTime<Utc>,
    pub is_active: bool,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl ChatThread {
    pub fn new(key: &ThreadKey, now: DateTime<Utc>) -> Self {
        let participants = key.participants();
        Self {
            id: key.chat_id(),
            participants,
            item_id: key.item_id(),
            messages: Vec::new(),
            last_message: None,
            unread_count: participants.iter().map(|p| (*p, 0)).collect(),
            last_activity: now,
            is_active: true,
            version: 0,
            created_at: now,
        }
    }

    pub fn is_participant(&self, user_id: UserId) -> bool {
        self.participants.contains(&user_id)
    }

    pub fn other_participant(&self, user_id: UserId) -> Option<UserId> {
        match self.participants {
            [a, b] if a == user_id => Some(b),
            [a, b] if b == user_id => Some(a),
            _ => None,
        }
    }

    pub fn unread_for(&self, user_id: UserId) -> u32 {
        self.unread_count.get(&user_id).copied().unwrap_or(0)
    }

    pub fn ensure_participant(&self, user_id: UserId) -> Result<()> {
        if self.is_participant(user_id) {
            Ok(())
        } else {
            Err(ThriftError::InvalidTransition(Rejection::NotAParticipant))
        }
    }

    /// Append a message, refresh the preview cache and bump the recipient's
    /// unread counter.
    pub fn post(
        &mut self,
        sender_id: UserId,
        content: String,
        kind: MessageKind,
        now: DateTime<Utc>,
    ) -> Result<Message> {
        self.ensure_participant(sender_id)?;
        if !self.is_active {
            return Err(ThriftError::InvalidTransition(Rejection::ChatInactive));
        }

        let message = Message {
            id: self.messages.len() as u32,
            sender_id,
            content,
            kind,
            is_read: false,
            read_at: None,
            created_at: now,
        };

        self.last_message = Some(LastMessage {
            content: message.content.clone(),
            sender_id,
            timestamp: now,
        });
        self.last_activity = now;
        for (participant, count) in self.unread_count.iter_mut() {
            if *participant != sender_id {
                *count += 1;
            }
        }
        self.messages.push(message.clone());
        Ok(message)
    }

    /// Mark everything the other side sent as read. Returns how many
    /// messages flipped; zero means the call changed nothing.
    pub fn mark_read(&mut self, user_id: UserId, now: DateTime<Utc>) -> Result<usize> {
        self.ensure_participant(user_id)?;

        let mut flipped = 0;
        for message in self
            .messages
            .iter_mut()
            .filter(|m| m.sender_id != user_id && !m.is_read)
        {
            message.is_read = true;
            message.read_at = Some(now);
            flipped += 1;
        }

        self.unread_count.insert(user_id, 0);
        Ok(flipped)
    }

    pub fn deactivate(&mut self, user_id: UserId) -> Result<bool> {
        self.ensure_participant(user_id)?;
        let changed = self.is_active;
        self.is_active = false;
        Ok(changed)
    }

    /// Unread messages addressed to `user_id`, counted from the log itself.
    pub fn count_unread_in_log(&self, user_id: UserId) -> u32 {
        self.messages
            .iter()
            .filter(|m| m.sender_id != user_id && !m.is_read)
            .count() as u32
    }
}
