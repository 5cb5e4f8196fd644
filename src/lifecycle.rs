//! Item lifecycle: boosts, hearts, views and the sale.
//!
//! Every path goes through [`ItemLifecycle::modify`], which clears an
//! expired boost before anything else looks at the item. There is no
//! background sweeper.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::app::{Clock, Rejection, Result, ThriftError};
use crate::domain::{Item, ItemId, ListingFilter, UserId};
use crate::ledger::modify_user;
use crate::notifier::RealtimeNotifier;
use crate::store::{with_retry, Attempt, RetryPolicy, Store};

#[derive(Clone)]
pub struct ItemLifecycle {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    notifier: RealtimeNotifier,
    retry: RetryPolicy,
}

impl ItemLifecycle {
    pub fn new(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        notifier: RealtimeNotifier,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            clock,
            notifier,
            retry,
        }
    }

    pub fn create_listing(
        &self,
        seller_id: UserId,
        title: &str,
        price: u64,
        original_price: u64,
    ) -> Result<Item> {
        let seller = self
            .store
            .get_user(seller_id)?
            .ok_or(ThriftError::UserNotFound(seller_id))?;
        if !seller.is_active {
            return Err(ThriftError::InvalidTransition(Rejection::UserInactive));
        }
        let title = title.trim();
        if title.is_empty() {
            return Err(ThriftError::Validation("title must not be empty".into()));
        }

        let mut item = Item::new(seller_id, title.to_string(), price, original_price)?;
        item.created_at = self.clock.now();
        item.id = self.store.add_item(&item)?;
        info!("Listed item {} for {} by user {}", item.id, price, seller_id);
        Ok(item)
    }

    /// Current state of an item, with any lapsed boost already cleared.
    pub fn get_item(&self, item_id: ItemId) -> Result<Item> {
        let (item, ()) = self.modify(item_id, |_, _| Ok(()))?;
        Ok(item)
    }

    pub fn boost(&self, item_id: ItemId, duration_days: u32) -> Result<Item> {
        let (item, ()) = self.modify(item_id, |item, now| item.boost(duration_days, now))?;
        info!(
            "Boosted item {} for {} days (until {:?})",
            item_id, duration_days, item.boost_expires_at
        );
        self.notifier.item_boosted(&item);
        Ok(item)
    }

    /// Toggle `user_id`'s heart on the item. Returns the item and whether the
    /// user now hearts it.
    pub fn heart_toggle(&self, item_id: ItemId, user_id: UserId) -> Result<(Item, bool)> {
        if self.store.get_user(user_id)?.is_none() {
            return Err(ThriftError::UserNotFound(user_id));
        }

        let (item, hearted) = self.modify(item_id, |item, _| item.toggle_heart(user_id))?;
        debug!(
            "User {} {} item {} ({} hearts)",
            user_id,
            if hearted { "hearted" } else { "unhearted" },
            item_id,
            item.hearts
        );

        // The item is the source of truth; copy its verdict rather than
        // toggling the user side blindly, so racing toggles cannot diverge.
        modify_user(&self.store, self.retry, user_id, |user| {
            let current = self
                .store
                .get_item(item_id)?
                .map(|item| item.is_hearted_by(user_id))
                .unwrap_or(false);
            user.set_hearted(item_id, current);
            Ok(())
        })?;

        self.notifier.heart_toggled(&item, user_id, hearted);
        Ok((item, hearted))
    }

    /// Advisory counter; concurrent bumps may be lost.
    pub fn increment_views(&self, item_id: ItemId) -> Result<u64> {
        let item = self.get_item(item_id)?;
        if item.is_sold {
            return Err(ThriftError::InvalidTransition(Rejection::AlreadySold));
        }
        let views = self
            .store
            .increment_views(item_id)?
            .ok_or(ThriftError::ItemNotFound(item_id))?;
        self.notifier.item_viewed(item_id, views);
        Ok(views)
    }

    pub fn mark_sold(&self, item_id: ItemId) -> Result<Item> {
        let (item, ()) = self.modify(item_id, |item, now| item.mark_sold(now))?;
        info!("Item {} sold", item_id);
        self.notifier.item_sold(item_id);
        Ok(item)
    }

    /// Take a listing off the market. Only its seller may do this.
    pub fn withdraw(&self, seller_id: UserId, item_id: ItemId) -> Result<Item> {
        let (item, ()) = self.modify(item_id, |item, now| {
            if item.seller_id != seller_id {
                return Err(ThriftError::InvalidTransition(Rejection::NotTheSeller));
            }
            item.withdraw(now)
        })?;
        info!("Item {} withdrawn by seller {}", item_id, seller_id);
        self.notifier.item_removed(item_id);
        Ok(item)
    }

    /// Edit a live listing's title or prices. Only its seller may do this.
    pub fn update_listing(
        &self,
        seller_id: UserId,
        item_id: ItemId,
        title: Option<&str>,
        price: Option<u64>,
        original_price: Option<u64>,
    ) -> Result<Item> {
        let (item, ()) = self.modify(item_id, |item, _| {
            if item.seller_id != seller_id {
                return Err(ThriftError::InvalidTransition(Rejection::NotTheSeller));
            }
            item.update_details(title, price, original_price)
        })?;
        info!(
            "Item {} updated by seller {} (price {}, was {})",
            item_id, seller_id, item.price, item.original_price
        );
        Ok(item)
    }

    /// A seller's own listings, newest first.
    pub fn list_for_seller(&self, seller_id: UserId, filter: ListingFilter) -> Result<Vec<Item>> {
        let items = self.reconcile_all(self.store.list_items_by_seller(seller_id)?)?;
        Ok(items.into_iter().filter(|item| filter.matches(item)).collect())
    }

    /// Listings `user_id` has hearted that are still for sale, newest first.
    pub fn hearted_items(&self, user_id: UserId) -> Result<Vec<Item>> {
        let user = self
            .store
            .get_user(user_id)?
            .ok_or(ThriftError::UserNotFound(user_id))?;

        let mut items = Vec::with_capacity(user.hearted_item_ids.len());
        for item_id in &user.hearted_item_ids {
            match self.get_item(*item_id) {
                Ok(item) if ListingFilter::Active.matches(&item) => items.push(item),
                Ok(_) | Err(ThriftError::ItemNotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    /// Unsold, active listings: currently boosted first, then newest.
    pub fn list_active(&self) -> Result<Vec<Item>> {
        let now = self.clock.now();
        let mut items = self.reconcile_all(self.store.list_active_items()?)?;
        items.sort_by(|a, b| {
            b.is_boost_active(now)
                .cmp(&a.is_boost_active(now))
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(items)
    }

    /// Listings whose boost is running right now.
    pub fn list_boosted(&self) -> Result<Vec<Item>> {
        let now = self.clock.now();
        let items = self.reconcile_all(self.store.list_boosted_items()?)?;
        Ok(items
            .into_iter()
            .filter(|item| item.is_boost_active(now))
            .collect())
    }

    fn reconcile_all(&self, items: Vec<Item>) -> Result<Vec<Item>> {
        let now = self.clock.now();
        items
            .into_iter()
            .map(|item| {
                if item.is_boosted && !item.is_boost_active(now) {
                    self.get_item(item.id)
                } else {
                    Ok(item)
                }
            })
            .collect()
    }

    /// Load the item, clear a lapsed boost, apply `op`, and write only if
    /// something changed. A lost version race re-runs from fresh state.
    fn modify<T, F>(&self, item_id: ItemId, mut op: F) -> Result<(Item, T)>
    where
        F: FnMut(&mut Item, DateTime<Utc>) -> Result<T>,
    {
        let (item, value, expired) = with_retry(self.retry, "item", item_id, || {
            let now = self.clock.now();
            let mut item = self
                .store
                .get_item(item_id)?
                .ok_or(ThriftError::ItemNotFound(item_id))?;
            let before = item.clone();

            let expired = item.reconcile_boost(now);
            let value = op(&mut item, now)?;

            if item == before {
                return Ok(Attempt::Done((item, value, false)));
            }
            if self.store.update_item(&mut item)? {
                Ok(Attempt::Done((item, value, expired)))
            } else {
                Ok(Attempt::Conflict)
            }
        })?;

        // Only the writer that actually cleared the flag reports it.
        if expired {
            debug!("Boost on item {} lapsed", item_id);
            self.notifier.boost_expired(item_id);
        }
        Ok((item, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    use crate::app::ManualClock;
    use crate::domain::{ListingState, User};
    use crate::notifier::{Notification, SessionHub};
    use crate::store::SqliteStore;

    struct Fixture {
        lifecycle: ItemLifecycle,
        store: Arc<dyn Store>,
        clock: Arc<ManualClock>,
        hub: Arc<SessionHub>,
        seller: UserId,
        buyer: UserId,
    }

    fn fixture(retry: RetryPolicy) -> Fixture {
        let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory().unwrap());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let hub = Arc::new(SessionHub::new());
        let seller = store.add_user(&User::new("seller".into())).unwrap();
        let buyer = store.add_user(&User::new("buyer".into())).unwrap();
        let lifecycle = ItemLifecycle::new(
            store.clone(),
            clock.clone(),
            RealtimeNotifier::new(hub.clone()),
            retry,
        );
        Fixture {
            lifecycle,
            store,
            clock,
            hub,
            seller,
            buyer,
        }
    }

    fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<Notification>) -> Vec<Notification> {
        let mut out = Vec::new();
        while let Ok(n) = rx.try_recv() {
            out.push(n);
        }
        out
    }

    #[test]
    fn test_create_listing_validates() {
        let f = fixture(RetryPolicy::default());
        assert!(matches!(
            f.lifecycle.create_listing(f.seller, "Lamp", 900, 800),
            Err(ThriftError::Validation(_))
        ));
        assert!(matches!(
            f.lifecycle.create_listing(f.seller, "   ", 10, 10),
            Err(ThriftError::Validation(_))
        ));
        assert!(matches!(
            f.lifecycle.create_listing(UserId(404), "Lamp", 10, 10),
            Err(ThriftError::UserNotFound(_))
        ));

        let item = f.lifecycle.create_listing(f.seller, " Lamp ", 500, 800).unwrap();
        assert_eq!(item.title, "Lamp");
        assert_eq!(f.lifecycle.get_item(item.id).unwrap().seller_id, f.seller);
    }

    #[test]
    fn test_boost_scenario_with_savings_expiry_and_sale() {
        let f = fixture(RetryPolicy::default());
        let item = f.lifecycle.create_listing(f.seller, "Study desk", 500, 800).unwrap();
        assert_eq!(item.savings(), 300);
        assert_eq!(item.savings_percentage(), 38);

        let boosted = f.lifecycle.boost(item.id, 7).unwrap();
        assert!(boosted.is_boosted);
        assert_eq!(f.lifecycle.list_boosted().unwrap().len(), 1);

        f.clock.advance(Duration::days(7) + Duration::seconds(1));
        let read = f.lifecycle.get_item(item.id).unwrap();
        assert!(!read.is_boosted);
        assert_eq!(read.state(f.clock.now()), ListingState::Expired);
        assert!(f.lifecycle.list_boosted().unwrap().is_empty());
        // The cleared flag was written back, not just computed.
        assert!(!f.store.get_item(item.id).unwrap().unwrap().is_boosted);

        let reboosted = f.lifecycle.boost(item.id, 7).unwrap();
        assert!(reboosted.is_boost_active(f.clock.now()));

        f.lifecycle.mark_sold(item.id).unwrap();
        assert!(matches!(
            f.lifecycle.boost(item.id, 7),
            Err(ThriftError::InvalidTransition(Rejection::AlreadySold))
        ));
        assert!(matches!(
            f.lifecycle.mark_sold(item.id),
            Err(ThriftError::InvalidTransition(Rejection::AlreadySold))
        ));
    }

    #[test]
    fn test_expired_boost_hidden_from_listing_order() {
        let f = fixture(RetryPolicy::default());
        let old = f.lifecycle.create_listing(f.seller, "Old", 10, 10).unwrap();
        f.clock.advance(Duration::hours(1));
        let newer = f.lifecycle.create_listing(f.seller, "New", 10, 10).unwrap();

        f.lifecycle.boost(old.id, 1).unwrap();
        let listed = f.lifecycle.list_active().unwrap();
        assert_eq!(listed[0].id, old.id);

        f.clock.advance(Duration::days(2));
        let listed = f.lifecycle.list_active().unwrap();
        assert_eq!(listed[0].id, newer.id);
        assert!(listed.iter().all(|i| !i.is_boosted));
    }

    #[test]
    fn test_expiry_reported_once() {
        let f = fixture(RetryPolicy::default());
        let (_, mut rx) = f.hub.connect(f.buyer);
        let item = f.lifecycle.create_listing(f.seller, "Kettle", 10, 10).unwrap();
        f.lifecycle.boost(item.id, 1).unwrap();
        f.clock.advance(Duration::days(2));

        f.lifecycle.get_item(item.id).unwrap();
        f.lifecycle.get_item(item.id).unwrap();
        f.lifecycle.list_active().unwrap();

        let expiries = drain(&mut rx)
            .into_iter()
            .filter(|n| matches!(n, Notification::BoostExpired { .. }))
            .count();
        assert_eq!(expiries, 1);
    }

    #[test]
    fn test_concurrent_reads_of_expiring_item_write_once() {
        let f = fixture(RetryPolicy { max_retries: 1000 });
        let item = f.lifecycle.create_listing(f.seller, "Bike", 10, 10).unwrap();
        f.lifecycle.boost(item.id, 1).unwrap();
        let version_after_boost = f.store.get_item(item.id).unwrap().unwrap().version;
        f.clock.advance(Duration::days(2));

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    let read = f.lifecycle.get_item(item.id).unwrap();
                    assert!(!read.is_boosted);
                });
            }
        });

        let stored = f.store.get_item(item.id).unwrap().unwrap();
        assert!(!stored.is_boosted);
        assert_eq!(stored.version, version_after_boost + 1);
    }

    #[test]
    fn test_heart_toggle_twice_restores() {
        let f = fixture(RetryPolicy::default());
        let item = f.lifecycle.create_listing(f.seller, "Jacket", 300, 900).unwrap();

        let (after_one, hearted) = f.lifecycle.heart_toggle(item.id, f.buyer).unwrap();
        assert!(hearted);
        assert_eq!(after_one.hearts, 1);
        let user = f.store.get_user(f.buyer).unwrap().unwrap();
        assert!(user.hearted_item_ids.contains(&item.id));

        let (after_two, hearted) = f.lifecycle.heart_toggle(item.id, f.buyer).unwrap();
        assert!(!hearted);
        assert_eq!(after_two.hearts, 0);
        assert!(after_two.hearted_by.is_empty());
        let user = f.store.get_user(f.buyer).unwrap().unwrap();
        assert!(user.hearted_item_ids.is_empty());
    }

    #[test]
    fn test_heart_unknown_user_or_item() {
        let f = fixture(RetryPolicy::default());
        let item = f.lifecycle.create_listing(f.seller, "Jacket", 300, 900).unwrap();
        assert!(matches!(
            f.lifecycle.heart_toggle(item.id, UserId(404)),
            Err(ThriftError::UserNotFound(_))
        ));
        assert!(matches!(
            f.lifecycle.heart_toggle(ItemId(404), f.buyer),
            Err(ThriftError::ItemNotFound(_))
        ));
    }

    #[test]
    fn test_concurrent_hearts_from_many_users() {
        let f = fixture(RetryPolicy { max_retries: 1000 });
        let item = f.lifecycle.create_listing(f.seller, "Books", 50, 200).unwrap();
        let users: Vec<UserId> = (0..10)
            .map(|i| f.store.add_user(&User::new(format!("fan{}", i))).unwrap())
            .collect();

        std::thread::scope(|s| {
            for user in &users {
                let lifecycle = &f.lifecycle;
                let item_id = item.id;
                s.spawn(move || lifecycle.heart_toggle(item_id, *user).unwrap());
            }
        });

        let stored = f.store.get_item(item.id).unwrap().unwrap();
        assert_eq!(stored.hearts, 10);
        assert_eq!(stored.hearts as usize, stored.hearted_by.len());
        for user in &users {
            assert!(stored.hearted_by.contains(user));
            let account = f.store.get_user(*user).unwrap().unwrap();
            assert!(account.hearted_item_ids.contains(&item.id));
        }
    }

    #[test]
    fn test_same_user_racing_toggles_stay_consistent() {
        let f = fixture(RetryPolicy { max_retries: 1000 });
        let item = f.lifecycle.create_listing(f.seller, "Books", 50, 200).unwrap();

        std::thread::scope(|s| {
            for _ in 0..6 {
                s.spawn(|| f.lifecycle.heart_toggle(item.id, f.buyer).unwrap());
            }
        });

        // Six toggles cancel out pairwise.
        let stored = f.store.get_item(item.id).unwrap().unwrap();
        assert_eq!(stored.hearts, 0);
        assert_eq!(stored.hearts as usize, stored.hearted_by.len());
        let user = f.store.get_user(f.buyer).unwrap().unwrap();
        assert_eq!(
            user.hearted_item_ids.contains(&item.id),
            stored.is_hearted_by(f.buyer)
        );
    }

    #[test]
    fn test_views_count_and_broadcast() {
        let f = fixture(RetryPolicy::default());
        let (_, mut rx) = f.hub.connect(f.seller);
        let item = f.lifecycle.create_listing(f.seller, "Rug", 40, 60).unwrap();

        assert_eq!(f.lifecycle.increment_views(item.id).unwrap(), 1);
        assert_eq!(f.lifecycle.increment_views(item.id).unwrap(), 2);
        assert_eq!(
            drain(&mut rx).last(),
            Some(&Notification::ItemViewed {
                item_id: item.id,
                views: 2
            })
        );

        f.lifecycle.mark_sold(item.id).unwrap();
        assert!(matches!(
            f.lifecycle.increment_views(item.id),
            Err(ThriftError::InvalidTransition(Rejection::AlreadySold))
        ));
        assert_eq!(f.lifecycle.get_item(item.id).unwrap().views, 2);
    }

    #[test]
    fn test_withdraw_requires_seller() {
        let f = fixture(RetryPolicy::default());
        let item = f.lifecycle.create_listing(f.seller, "Rug", 40, 60).unwrap();
        assert!(matches!(
            f.lifecycle.withdraw(f.buyer, item.id),
            Err(ThriftError::InvalidTransition(Rejection::NotTheSeller))
        ));
        let withdrawn = f.lifecycle.withdraw(f.seller, item.id).unwrap();
        assert!(!withdrawn.is_active);
        assert!(f.lifecycle.list_active().unwrap().is_empty());
    }

    #[test]
    fn test_withdrawn_listing_rejects_hearts() {
        let f = fixture(RetryPolicy::default());
        let item = f.lifecycle.create_listing(f.seller, "Rug", 40, 60).unwrap();
        f.lifecycle.withdraw(f.seller, item.id).unwrap();

        assert!(matches!(
            f.lifecycle.heart_toggle(item.id, f.seller),
            Err(ThriftError::InvalidTransition(Rejection::ListingInactive))
        ));
        assert!(matches!(
            f.lifecycle.heart_toggle(item.id, f.buyer),
            Err(ThriftError::InvalidTransition(Rejection::ListingInactive))
        ));
        let stored = f.store.get_item(item.id).unwrap().unwrap();
        assert_eq!(stored.hearts, 0);
        assert!(f
            .store
            .get_user(f.buyer)
            .unwrap()
            .unwrap()
            .hearted_item_ids
            .is_empty());
    }

    #[test]
    fn test_withdraw_broadcasts_removal() {
        let f = fixture(RetryPolicy::default());
        let (_, mut rx) = f.hub.connect(f.buyer);
        let item = f.lifecycle.create_listing(f.seller, "Rug", 40, 60).unwrap();

        f.lifecycle.withdraw(f.seller, item.id).unwrap();
        assert_eq!(
            drain(&mut rx),
            vec![Notification::ItemRemoved { item_id: item.id }]
        );

        assert!(f.lifecycle.withdraw(f.seller, item.id).is_err());
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_update_listing() {
        let f = fixture(RetryPolicy::default());
        let item = f.lifecycle.create_listing(f.seller, "Desk", 500, 800).unwrap();

        assert!(matches!(
            f.lifecycle.update_listing(f.buyer, item.id, None, Some(1), None),
            Err(ThriftError::InvalidTransition(Rejection::NotTheSeller))
        ));
        assert!(matches!(
            f.lifecycle.update_listing(f.seller, item.id, None, Some(900), None),
            Err(ThriftError::Validation(_))
        ));
        let unchanged = f.store.get_item(item.id).unwrap().unwrap();
        assert_eq!((unchanged.price, unchanged.version), (500, item.version));

        let updated = f
            .lifecycle
            .update_listing(f.seller, item.id, Some("Oak desk"), Some(450), None)
            .unwrap();
        assert_eq!(updated.title, "Oak desk");
        assert_eq!(updated.savings(), 350);
        assert_eq!(f.store.get_item(item.id).unwrap().unwrap(), updated);

        f.lifecycle.mark_sold(item.id).unwrap();
        assert!(matches!(
            f.lifecycle.update_listing(f.seller, item.id, None, Some(100), None),
            Err(ThriftError::InvalidTransition(Rejection::AlreadySold))
        ));
    }

    #[test]
    fn test_list_for_seller_by_state() {
        let f = fixture(RetryPolicy::default());
        let live = f.lifecycle.create_listing(f.seller, "Lamp", 10, 10).unwrap();
        f.clock.advance(Duration::minutes(1));
        let sold = f.lifecycle.create_listing(f.seller, "Desk", 10, 10).unwrap();
        f.clock.advance(Duration::minutes(1));
        let gone = f.lifecycle.create_listing(f.seller, "Rug", 10, 10).unwrap();
        f.lifecycle.create_listing(f.buyer, "Kettle", 5, 5).unwrap();
        f.lifecycle.mark_sold(sold.id).unwrap();
        f.lifecycle.withdraw(f.seller, gone.id).unwrap();

        let ids = |filter: ListingFilter| -> Vec<ItemId> {
            f.lifecycle
                .list_for_seller(f.seller, filter)
                .unwrap()
                .iter()
                .map(|i| i.id)
                .collect()
        };
        assert_eq!(ids(ListingFilter::Active), vec![live.id]);
        assert_eq!(ids(ListingFilter::Sold), vec![sold.id]);
        assert_eq!(ids(ListingFilter::Inactive), vec![gone.id, sold.id]);
        assert_eq!(ids(ListingFilter::All), vec![gone.id, sold.id, live.id]);
    }

    #[test]
    fn test_hearted_items_only_lists_live_ones() {
        let f = fixture(RetryPolicy::default());
        let lamp = f.lifecycle.create_listing(f.seller, "Lamp", 10, 10).unwrap();
        f.clock.advance(Duration::minutes(1));
        let desk = f.lifecycle.create_listing(f.seller, "Desk", 10, 10).unwrap();
        f.clock.advance(Duration::minutes(1));
        let rug = f.lifecycle.create_listing(f.seller, "Rug", 10, 10).unwrap();

        for id in [lamp.id, desk.id, rug.id] {
            f.lifecycle.heart_toggle(id, f.buyer).unwrap();
        }
        f.lifecycle.mark_sold(desk.id).unwrap();

        let hearted: Vec<ItemId> = f
            .lifecycle
            .hearted_items(f.buyer)
            .unwrap()
            .iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(hearted, vec![rug.id, lamp.id]);
        assert!(f.lifecycle.hearted_items(f.seller).unwrap().is_empty());
        assert!(matches!(
            f.lifecycle.hearted_items(UserId(404)),
            Err(ThriftError::UserNotFound(_))
        ));
    }

    #[test]
    fn test_rejected_boost_leaves_item_untouched() {
        let f = fixture(RetryPolicy::default());
        let item = f.lifecycle.create_listing(f.seller, "Rug", 40, 60).unwrap();
        f.lifecycle.boost(item.id, 3).unwrap();
        let before = f.store.get_item(item.id).unwrap().unwrap();

        assert!(matches!(
            f.lifecycle.boost(item.id, 3),
            Err(ThriftError::InvalidTransition(Rejection::AlreadyBoosted))
        ));
        assert_eq!(f.store.get_item(item.id).unwrap().unwrap(), before);
    }
}
