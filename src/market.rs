//! Flows that span more than one entity.
//!
//! Each step is its own versioned write. When a later step fails, earlier
//! ones are compensated explicitly rather than rolled back.

use std::sync::Arc;

use tracing::{info, warn};

use crate::app::{Rejection, Result, ThriftError};
use crate::chat::ChatRegistry;
use crate::config::{BoostConfig, PointsConfig};
use crate::domain::{ChatThread, Item, ItemId, MessageKind, TradeRecord, User, UserId};
use crate::ledger::{ensure_active, PointsLedger};
use crate::lifecycle::ItemLifecycle;
use crate::store::Store;

/// Outcome of a completed trade.
#[derive(Debug, Clone)]
pub struct TradeReceipt {
    pub item: Item,
    /// `None` if the history row could not be written
    pub trade: Option<TradeRecord>,
    pub buyer: User,
    pub seller: User,
}

#[derive(Clone)]
pub struct Marketplace {
    store: Arc<dyn Store>,
    ledger: PointsLedger,
    lifecycle: ItemLifecycle,
    chats: ChatRegistry,
    points: PointsConfig,
    boost: BoostConfig,
}

impl Marketplace {
    pub fn new(
        store: Arc<dyn Store>,
        ledger: PointsLedger,
        lifecycle: ItemLifecycle,
        chats: ChatRegistry,
        points: PointsConfig,
        boost: BoostConfig,
    ) -> Self {
        Self {
            store,
            ledger,
            lifecycle,
            chats,
            points,
            boost,
        }
    }

    /// Seller pays `boost.cost` points to boost their listing.
    pub fn boost_listing(&self, seller_id: UserId, item_id: ItemId) -> Result<Item> {
        let item = self.lifecycle.get_item(item_id)?;
        if item.seller_id != seller_id {
            return Err(ThriftError::InvalidTransition(Rejection::NotTheSeller));
        }
        // Cheap pre-check so obviously doomed boosts never touch the balance.
        item.ensure_live()?;
        if item.is_boosted {
            return Err(ThriftError::InvalidTransition(Rejection::AlreadyBoosted));
        }

        self.ledger.debit(seller_id, self.boost.cost)?;
        match self.lifecycle.boost(item_id, self.boost.duration_days) {
            Ok(item) => {
                info!(
                    "User {} paid {} points to boost item {}",
                    seller_id, self.boost.cost, item_id
                );
                Ok(item)
            }
            Err(e) => {
                warn!(
                    "Boost of item {} failed after payment, refunding {}: {}",
                    item_id, self.boost.cost, e
                );
                self.ledger.refund(seller_id, self.boost.cost)?;
                Err(e)
            }
        }
    }

    /// Mark the item sold to `buyer_id`, record the trade and reward both sides.
    ///
    /// Every precondition is checked before the sale commits. Once it has,
    /// the sale stands: a later failure to record or reward is logged and
    /// shows up in the receipt rather than as an error.
    pub fn complete_trade(&self, item_id: ItemId, buyer_id: UserId) -> Result<TradeReceipt> {
        let item = self.lifecycle.get_item(item_id)?;
        if item.seller_id == buyer_id {
            return Err(ThriftError::Validation(
                "a seller cannot buy their own item".into(),
            ));
        }
        item.ensure_live()?;

        let reward = self.points.per_transaction;
        let savings = item.savings();
        let buyer = self.ledger.account(buyer_id)?;
        let seller = self.ledger.account(item.seller_id)?;
        for (user, saved) in [(&buyer, savings), (&seller, 0)] {
            ensure_active(user)?;
            user.clone().record_trade(reward, saved)?;
        }

        let item = self.lifecycle.mark_sold(item_id)?;

        let mut record = TradeRecord::for_sale(&item, buyer_id, reward);
        let trade = match self.store.add_trade(&record) {
            Ok(id) => {
                record.id = id;
                Some(record)
            }
            Err(e) => {
                warn!("Item {} sold but the trade was not recorded: {}", item_id, e);
                None
            }
        };
        let buyer = self.settle(buyer, reward, savings)?;
        let seller = self.settle(seller, reward, 0)?;
        info!(
            "Trade of item {} completed: {} points each to buyer {} and seller {}",
            item_id, reward, buyer_id, item.seller_id
        );

        Ok(TradeReceipt {
            item,
            trade,
            buyer,
            seller,
        })
    }

    /// Reward one side of a committed sale. A failure is logged and the
    /// account is returned as it stands.
    fn settle(&self, user: User, reward: u64, saved: u64) -> Result<User> {
        match self.ledger.reward_trade(user.id, reward, saved) {
            Ok(user) => Ok(user),
            Err(e) => {
                warn!(
                    "Trade reward of {} points to user {} failed after the sale: {}",
                    reward, user.id, e
                );
                self.ledger.account(user.id)
            }
        }
    }

    /// Trades `user_id` took part in, most recent first.
    pub fn trade_history(&self, user_id: UserId) -> Result<Vec<TradeRecord>> {
        self.ledger.account(user_id)?;
        self.store.list_trades_for_user(user_id)
    }

    /// Open (or reopen) the buyer's conversation with the seller about an
    /// item, optionally posting a first message.
    pub fn start_chat(
        &self,
        buyer_id: UserId,
        item_id: ItemId,
        opening: Option<&str>,
    ) -> Result<ChatThread> {
        let item = self.lifecycle.get_item(item_id)?;
        item.ensure_live()?;
        if item.seller_id == buyer_id {
            return Err(ThriftError::InvalidTransition(Rejection::SelfConversation));
        }

        let thread = self.chats.find_or_create(buyer_id, item.seller_id, item_id)?;
        match opening {
            Some(text) => {
                let (thread, _) =
                    self.chats
                        .post_message(&thread.id, buyer_id, text, MessageKind::Text)?;
                Ok(thread)
            }
            None => Ok(thread),
        }
    }
}
