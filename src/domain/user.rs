use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::app::{Result, ThriftError};
use crate::domain::{ItemId, UserId};

/// Largest balance the store can hold.
pub const MAX_POINTS: u64 = i64::MAX as u64;

/// A marketplace account and the points ledger embedded in it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub points: u64,
    pub total_transactions: u64,
    /// Sum of discounts on everything this user bought
    pub money_saved: u64,
    pub hearted_item_ids: BTreeSet<ItemId>,
    pub is_active: bool,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: String) -> Self {
        Self {
            id: UserId(0),
            username,
            points: 0,
            total_transactions: 0,
            money_saved: 0,
            hearted_item_ids: BTreeSet::new(),
            is_active: true,
            version: 0,
            created_at: Utc::now(),
        }
    }

    /// Earn points. Counts as one completed transaction.
    pub fn credit(&mut self, amount: u64) -> Result<()> {
        if amount == 0 {
            return Err(ThriftError::Validation("credit amount must be positive".into()));
        }
        self.points = Self::add_points(self.points, amount)?;
        self.total_transactions += 1;
        Ok(())
    }

    /// Count a completed trade: reward points (possibly zero) and the
    /// purchase discount added to `money_saved`.
    pub fn record_trade(&mut self, points: u64, saved: u64) -> Result<()> {
        self.points = Self::add_points(self.points, points)?;
        self.total_transactions += 1;
        self.money_saved = self.money_saved.saturating_add(saved).min(MAX_POINTS);
        Ok(())
    }

    /// Spend points. Either the whole amount is taken or nothing changes.
    pub fn debit(&mut self, amount: u64) -> Result<()> {
        if amount == 0 {
            return Err(ThriftError::Validation("debit amount must be positive".into()));
        }
        if self.points < amount {
            return Err(ThriftError::InsufficientBalance {
                required: amount,
                available: self.points,
            });
        }
        self.points -= amount;
        Ok(())
    }

    /// Give back a previous debit without counting a transaction.
    pub fn refund(&mut self, amount: u64) -> Result<()> {
        self.points = Self::add_points(self.points, amount)?;
        Ok(())
    }

    fn add_points(balance: u64, amount: u64) -> Result<u64> {
        balance
            .checked_add(amount)
            .filter(|total| *total <= MAX_POINTS)
            .ok_or_else(|| ThriftError::Validation("points balance overflow".into()))
    }

    /// Bring the heart set in line with the item side. Returns whether anything changed.
    pub fn set_hearted(&mut self, item_id: ItemId, hearted: bool) -> bool {
        if hearted {
            self.hearted_item_ids.insert(item_id)
        } else {
            self.hearted_item_ids.remove(&item_id)
        }
    }

    pub fn can_afford(&self, amount: u64) -> bool {
        self.points >= amount
    }
}
