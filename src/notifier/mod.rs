//! Best-effort fan-out of marketplace events to live sessions.
//!
//! Nothing here is authoritative: a recipient without an open session
//! simply misses the event and picks the state up on its next read.

mod hub;

pub use hub::{SessionHub, SessionId};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::domain::{ChatId, ChatThread, Item, ItemId, Message, MessageKind, UserId};

/// Where a notification goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Address {
    User(UserId),
    Everyone,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Notification {
    ItemHearted {
        item_id: ItemId,
        hearts: u64,
    },
    HeartReceived {
        item_id: ItemId,
        from: UserId,
    },
    ItemBoosted {
        item_id: ItemId,
        expires_at: Option<DateTime<Utc>>,
    },
    BoostExpired {
        item_id: ItemId,
    },
    ItemSold {
        item_id: ItemId,
    },
    ItemRemoved {
        item_id: ItemId,
    },
    ItemViewed {
        item_id: ItemId,
        views: u64,
    },
    NewMessage {
        chat_id: ChatId,
        sender_id: UserId,
        content: String,
        kind: MessageKind,
        unread: u32,
        timestamp: DateTime<Utc>,
    },
    MessagesRead {
        chat_id: ChatId,
        read_by: UserId,
    },
}

impl Notification {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Fire-and-forget delivery capability.
pub trait Transport: Send + Sync {
    fn deliver(&self, address: Address, notification: Notification);
}

/// Maps domain events to addressed notifications.
#[derive(Clone)]
pub struct RealtimeNotifier {
    transport: Arc<dyn Transport>,
}

impl RealtimeNotifier {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn heart_toggled(&self, item: &Item, user_id: UserId, hearted: bool) {
        self.transport.deliver(
            Address::Everyone,
            Notification::ItemHearted {
                item_id: item.id,
                hearts: item.hearts,
            },
        );
        if hearted && user_id != item.seller_id {
            self.transport.deliver(
                Address::User(item.seller_id),
                Notification::HeartReceived {
                    item_id: item.id,
                    from: user_id,
                },
            );
        }
    }

    pub fn item_boosted(&self, item: &Item) {
        self.transport.deliver(
            Address::Everyone,
            Notification::ItemBoosted {
                item_id: item.id,
                expires_at: item.boost_expires_at,
            },
        );
    }

    pub fn boost_expired(&self, item_id: ItemId) {
        self.transport
            .deliver(Address::Everyone, Notification::BoostExpired { item_id });
    }

    pub fn item_sold(&self, item_id: ItemId) {
        self.transport
            .deliver(Address::Everyone, Notification::ItemSold { item_id });
    }

    pub fn item_removed(&self, item_id: ItemId) {
        self.transport
            .deliver(Address::Everyone, Notification::ItemRemoved { item_id });
    }

    pub fn item_viewed(&self, item_id: ItemId, views: u64) {
        self.transport
            .deliver(Address::Everyone, Notification::ItemViewed { item_id, views });
    }

    pub fn message_posted(&self, thread: &ChatThread, message: &Message) {
        let Some(recipient) = thread.other_participant(message.sender_id) else {
            return;
        };
        debug!("Notifying {} of message in chat {}", recipient, thread.id);
        self.transport.deliver(
            Address::User(recipient),
            Notification::NewMessage {
                chat_id: thread.id.clone(),
                sender_id: message.sender_id,
                content: message.content.clone(),
                kind: message.kind,
                unread: thread.unread_for(recipient),
                timestamp: message.created_at,
            },
        );
    }

    pub fn messages_read(&self, thread: &ChatThread, reader: UserId) {
        if let Some(other) = thread.other_participant(reader) {
            self.transport.deliver(
                Address::User(other),
                Notification::MessagesRead {
                    chat_id: thread.id.clone(),
                    read_by: reader,
                },
            );
        }
    }
}
