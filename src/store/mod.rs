pub mod retry;
pub mod sqlite;

use crate::app::Result;
use crate::domain::{ChatId, ChatThread, Item, ItemId, ThreadKey, TradeRecord, User, UserId};

pub use retry::{with_retry, Attempt, RetryPolicy};
pub use sqlite::SqliteStore;

/// Durable storage for users, items and chats.
///
/// `update_*` methods are compare-and-swap writes: they only apply when the
/// stored `version` still equals the entity's `version`, bump it on success
/// and return `false` when another writer got there first.
pub trait Store: Send + Sync {
    // User operations
    fn add_user(&self, user: &User) -> Result<UserId>;
    fn get_user(&self, id: UserId) -> Result<Option<User>>;
    fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    fn update_user(&self, user: &mut User) -> Result<bool>;

    // Item operations
    fn add_item(&self, item: &Item) -> Result<ItemId>;
    fn get_item(&self, id: ItemId) -> Result<Option<Item>>;
    fn list_active_items(&self) -> Result<Vec<Item>>;
    fn list_boosted_items(&self) -> Result<Vec<Item>>;
    /// Every listing by `seller_id`, newest first, whatever its state.
    fn list_items_by_seller(&self, seller_id: UserId) -> Result<Vec<Item>>;
    fn update_item(&self, item: &mut Item) -> Result<bool>;
    /// Unversioned counter bump. Returns the new count, or `None` if the item is missing.
    fn increment_views(&self, id: ItemId) -> Result<Option<u64>>;

    // Trade history
    fn add_trade(&self, trade: &TradeRecord) -> Result<i64>;
    /// Trades where `user_id` bought or sold, most recent first.
    fn list_trades_for_user(&self, user_id: UserId) -> Result<Vec<TradeRecord>>;

    // Chat operations
    fn get_chat(&self, id: &ChatId) -> Result<Option<ChatThread>>;
    fn find_chat(&self, key: &ThreadKey) -> Result<Option<ChatThread>>;
    /// Insert unless a thread with the same key exists. Returns the stored
    /// thread and whether this call created it.
    fn insert_chat_if_absent(&self, thread: &ChatThread) -> Result<(ChatThread, bool)>;
    fn update_chat(&self, thread: &mut ChatThread) -> Result<bool>;
    fn list_chats_for_user(&self, user_id: UserId) -> Result<Vec<ChatThread>>;
}
