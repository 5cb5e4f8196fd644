use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Item, ItemId, UserId};

/// A completed sale, kept for each party's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: i64,
    pub item_id: ItemId,
    pub buyer_id: UserId,
    pub seller_id: UserId,
    pub price: u64,
    pub original_price: u64,
    pub savings: u64,
    /// Points credited to each side
    pub points_awarded: u64,
    pub completed_at: DateTime<Utc>,
}

impl TradeRecord {
    pub fn for_sale(item: &Item, buyer_id: UserId, points_awarded: u64) -> Self {
        Self {
            id: 0,
            item_id: item.id,
            buyer_id,
            seller_id: item.seller_id,
            price: item.price,
            original_price: item.original_price,
            savings: item.savings(),
            points_awarded,
            completed_at: item.sold_at.unwrap_or_else(Utc::now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_captures_price_and_savings() {
        let mut item = Item::new(UserId(1), "Desk".into(), 500, 800).unwrap();
        item.id = ItemId(9);
        let now = Utc::now();
        item.mark_sold(now).unwrap();

        let record = TradeRecord::for_sale(&item, UserId(2), 5);
        assert_eq!(record.item_id, ItemId(9));
        assert_eq!(record.seller_id, UserId(1));
        assert_eq!(record.buyer_id, UserId(2));
        assert_eq!(record.savings, 300);
        assert_eq!(record.points_awarded, 5);
        assert_eq!(record.completed_at, now);
    }
}
