pub mod chat;
pub mod ids;
pub mod item;
pub mod trade;
pub mod user;

use chrono::{DateTime, Utc};

pub use chat::{ChatThread, LastMessage, Message, MessageKind};
pub use ids::{ChatId, ItemId, ThreadKey, UserId};
pub use item::{Item, ListingFilter, ListingState};
pub use trade::TradeRecord;
pub use user::User;

/// Coarse relative age for listings and chat previews.
pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now - then;
    let days = elapsed.num_days();
    let hours = elapsed.num_hours() % 24;

    if days > 0 {
        format!("{} day{} ago", days, if days > 1 { "s" } else { "" })
    } else if hours > 0 {
        format!("{} hour{} ago", hours, if hours > 1 { "s" } else { "" })
    } else {
        "Just now".to_string()
    }
}
