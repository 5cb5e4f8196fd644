use thiserror::Error;

use crate::domain::{ChatId, ItemId, UserId};

/// Precondition that made a lifecycle or chat transition illegal.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    #[error("item is already sold")]
    AlreadySold,

    #[error("item is already boosted")]
    AlreadyBoosted,

    #[error("listing is not active")]
    ListingInactive,

    #[error("only the seller may do this")]
    NotTheSeller,

    #[error("user is not a participant of this chat")]
    NotAParticipant,

    #[error("a chat needs two different participants")]
    SelfConversation,

    #[error("chat has been deactivated")]
    ChatInactive,

    #[error("user account is deactivated")]
    UserInactive,
}

#[derive(Error, Debug)]
pub enum ThriftError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] rusqlite_migration::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),

    #[error("Chat not found: {0}")]
    ChatNotFound(ChatId),

    #[error("Insufficient balance: {required} points required, {available} available")]
    InsufficientBalance { required: u64, available: u64 },

    #[error("Invalid transition: {0}")]
    InvalidTransition(Rejection),

    #[error("Concurrent modification of {entity} {id}, retries exhausted")]
    ConcurrentModification { entity: &'static str, id: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ThriftError {
    /// Transient failures the caller may resubmit unchanged.
    pub fn is_transient(&self) -> bool {
        matches!(self, ThriftError::ConcurrentModification { .. })
    }
}

pub type Result<T> = std::result::Result<T, ThriftError>;
