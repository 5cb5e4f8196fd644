use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub i64);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The unordered participant pair plus item that identifies a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThreadKey {
    low: UserId,
    high: UserId,
    item_id: ItemId,
}

impl ThreadKey {
    /// Returns `None` when both sides are the same user.
    pub fn new(a: UserId, b: UserId, item_id: ItemId) -> Option<Self> {
        if a == b {
            return None;
        }
        let (low, high) = if a < b { (a, b) } else { (b, a) };
        Some(Self { low, high, item_id })
    }

    pub fn participants(&self) -> [UserId; 2] {
        [self.low, self.high]
    }

    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    /// Deterministic chat id, so both sides of a first contact derive the same row key.
    pub fn chat_id(&self) -> ChatId {
        let mut hasher = Sha256::new();
        hasher.update(self.low.0.to_be_bytes());
        hasher.update(self.high.0.to_be_bytes());
        hasher.update(self.item_id.0.to_be_bytes());
        ChatId(hex::encode(hasher.finalize()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_key_is_unordered() {
        let k1 = ThreadKey::new(UserId(7), UserId(3), ItemId(1)).unwrap();
        let k2 = ThreadKey::new(UserId(3), UserId(7), ItemId(1)).unwrap();
        assert_eq!(k1, k2);
        assert_eq!(k1.chat_id(), k2.chat_id());
        assert_eq!(k1.participants(), [UserId(3), UserId(7)]);
    }

    #[test]
    fn test_thread_key_differs_per_item() {
        let k1 = ThreadKey::new(UserId(1), UserId(2), ItemId(1)).unwrap();
        let k2 = ThreadKey::new(UserId(1), UserId(2), ItemId(2)).unwrap();
        assert_ne!(k1.chat_id(), k2.chat_id());
    }

    #[test]
    fn test_thread_key_rejects_self_pair() {
        assert!(ThreadKey::new(UserId(4), UserId(4), ItemId(1)).is_none());
    }

    #[test]
    fn test_chat_id_is_hex_sha256() {
        let id = ThreadKey::new(UserId(1), UserId(2), ItemId(9)).unwrap().chat_id();
        assert_eq!(id.0.len(), 64);
        assert!(id.0.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
