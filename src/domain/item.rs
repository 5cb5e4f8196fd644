use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::app::{Rejection, Result, ThriftError};
use crate::domain::{ItemId, UserId};

/// Lifecycle position of a listing, derived from its flags at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListingState {
    Active,
    Boosted,
    /// Was boosted, the window has passed.
    Expired,
    Sold,
    Inactive,
}

/// Which of a seller's listings to return.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListingFilter {
    /// Unsold and still on the market
    #[default]
    Active,
    Sold,
    /// Withdrawn or sold
    Inactive,
    All,
}

impl ListingFilter {
    pub fn matches(&self, item: &Item) -> bool {
        match self {
            ListingFilter::Active => item.is_active && !item.is_sold,
            ListingFilter::Sold => item.is_sold,
            ListingFilter::Inactive => !item.is_active,
            ListingFilter::All => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub seller_id: UserId,
    pub title: String,
    pub price: u64,
    pub original_price: u64,
    pub is_active: bool,
    pub is_sold: bool,
    pub sold_at: Option<DateTime<Utc>>,
    pub is_boosted: bool,
    pub boost_expires_at: Option<DateTime<Utc>>,
    pub hearts: u64,
    pub hearted_by: BTreeSet<UserId>,
    pub views: u64,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl Item {
    pub fn new(seller_id: UserId, title: String, price: u64, original_price: u64) -> Result<Self> {
        if original_price < price {
            return Err(ThriftError::Validation(format!(
                "original price {} is below selling price {}",
                original_price, price
            )));
        }
        Ok(Self {
            id: ItemId(0),
            seller_id,
            title,
            price,
            original_price,
            is_active: true,
            is_sold: false,
            sold_at: None,
            is_boosted: false,
            boost_expires_at: None,
            hearts: 0,
            hearted_by: BTreeSet::new(),
            views: 0,
            version: 0,
            created_at: Utc::now(),
        })
    }

    pub fn is_boost_active(&self, now: DateTime<Utc>) -> bool {
        self.is_boosted && self.boost_expires_at.is_some_and(|at| at > now)
    }

    pub fn state(&self, now: DateTime<Utc>) -> ListingState {
        if self.is_sold {
            ListingState::Sold
        } else if !self.is_active {
            ListingState::Inactive
        } else if self.is_boost_active(now) {
            ListingState::Boosted
        } else if self.boost_expires_at.is_some() {
            ListingState::Expired
        } else {
            ListingState::Active
        }
    }

    /// Clear a boost whose window has passed. Returns true if the flag changed.
    ///
    /// Safe to call any number of times; only the first call after expiry
    /// has an effect.
    pub fn reconcile_boost(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_boosted && !self.is_boost_active(now) {
            self.is_boosted = false;
            return true;
        }
        false
    }

    pub fn boost(&mut self, duration_days: u32, now: DateTime<Utc>) -> Result<()> {
        if duration_days == 0 {
            return Err(ThriftError::Validation("boost duration must be at least one day".into()));
        }
        self.reconcile_boost(now);
        self.ensure_live()?;
        if self.is_boosted {
            return Err(ThriftError::InvalidTransition(Rejection::AlreadyBoosted));
        }
        self.is_boosted = true;
        self.boost_expires_at = Some(now + Duration::days(i64::from(duration_days)));
        Ok(())
    }

    /// Flip `user_id`'s membership in the heart set. Returns whether the user
    /// now hearts the item.
    pub fn toggle_heart(&mut self, user_id: UserId) -> Result<bool> {
        self.ensure_live()?;
        let hearted = if self.hearted_by.remove(&user_id) {
            false
        } else {
            self.hearted_by.insert(user_id);
            true
        };
        self.hearts = self.hearted_by.len() as u64;
        Ok(hearted)
    }

    pub fn is_hearted_by(&self, user_id: UserId) -> bool {
        self.hearted_by.contains(&user_id)
    }

    pub fn mark_sold(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.reconcile_boost(now);
        self.ensure_live()?;
        self.is_sold = true;
        self.sold_at = Some(now);
        self.is_active = false;
        self.is_boosted = false;
        Ok(())
    }

    /// Edit title and prices of a live listing. `None` keeps the current value;
    /// the result must still satisfy `original_price >= price`.
    pub fn update_details(
        &mut self,
        title: Option<&str>,
        price: Option<u64>,
        original_price: Option<u64>,
    ) -> Result<()> {
        self.ensure_live()?;

        let title = match title.map(str::trim) {
            Some("") => return Err(ThriftError::Validation("title must not be empty".into())),
            Some(t) => t.to_string(),
            None => self.title.clone(),
        };
        let price = price.unwrap_or(self.price);
        let original_price = original_price.unwrap_or(self.original_price);
        if original_price < price {
            return Err(ThriftError::Validation(format!(
                "original price {} is below asking price {}",
                original_price, price
            )));
        }

        self.title = title;
        self.price = price;
        self.original_price = original_price;
        Ok(())
    }

    /// Take an unsold listing off the market.
    pub fn withdraw(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.reconcile_boost(now);
        self.ensure_live()?;
        self.is_active = false;
        self.is_boosted = false;
        Ok(())
    }

    pub fn savings(&self) -> u64 {
        self.original_price.saturating_sub(self.price)
    }

    /// Discount against the original price, rounded to the nearest percent.
    pub fn savings_percentage(&self) -> u64 {
        if self.original_price == 0 {
            return 0;
        }
        (self.savings() * 100 + self.original_price / 2) / self.original_price
    }

    pub fn ensure_live(&self) -> Result<()> {
        if self.is_sold {
            return Err(ThriftError::InvalidTransition(Rejection::AlreadySold));
        }
        if !self.is_active {
            return Err(ThriftError::InvalidTransition(Rejection::ListingInactive));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing() -> Item {
        Item::new(UserId(1), "Desk lamp".into(), 500, 800).unwrap()
    }

    #[test]
    fn test_new_rejects_price_above_original() {
        let err = Item::new(UserId(1), "Kettle".into(), 900, 800).unwrap_err();
        assert!(matches!(err, ThriftError::Validation(_)));
    }

    #[test]
    fn test_savings() {
        let item = listing();
        assert_eq!(item.savings(), 300);
        assert_eq!(item.savings_percentage(), 38);
    }

    #[test]
    fn test_savings_percentage_zero_original() {
        let item = Item::new(UserId(1), "Free books".into(), 0, 0).unwrap();
        assert_eq!(item.savings(), 0);
        assert_eq!(item.savings_percentage(), 0);
    }

    #[test]
    fn test_boost_sets_window() {
        let now = Utc::now();
        let mut item = listing();
        item.boost(7, now).unwrap();
        assert!(item.is_boosted);
        assert_eq!(item.boost_expires_at, Some(now + Duration::days(7)));
        assert_eq!(item.state(now), ListingState::Boosted);
    }

    #[test]
    fn test_boost_while_boosted_rejected() {
        let now = Utc::now();
        let mut item = listing();
        item.boost(7, now).unwrap();
        let err = item.boost(7, now + Duration::days(1)).unwrap_err();
        assert!(matches!(
            err,
            ThriftError::InvalidTransition(Rejection::AlreadyBoosted)
        ));
    }

    #[test]
    fn test_reconcile_clears_expired_boost_once() {
        let now = Utc::now();
        let mut item = listing();
        item.boost(7, now).unwrap();

        let later = now + Duration::days(7);
        assert!(item.reconcile_boost(later));
        assert!(!item.is_boosted);
        assert!(!item.reconcile_boost(later));
        assert_eq!(item.state(later), ListingState::Expired);
    }

    #[test]
    fn test_reboost_after_expiry() {
        let now = Utc::now();
        let mut item = listing();
        item.boost(7, now).unwrap();
        let later = now + Duration::days(8);
        item.boost(7, later).unwrap();
        assert!(item.is_boost_active(later));
    }

    #[test]
    fn test_sold_is_terminal() {
        let now = Utc::now();
        let mut item = listing();
        item.boost(7, now).unwrap();
        item.mark_sold(now).unwrap();
        assert_eq!(item.state(now), ListingState::Sold);
        assert!(!item.is_active);
        assert!(!item.is_boosted);

        assert!(matches!(
            item.mark_sold(now),
            Err(ThriftError::InvalidTransition(Rejection::AlreadySold))
        ));
        assert!(matches!(
            item.boost(7, now),
            Err(ThriftError::InvalidTransition(Rejection::AlreadySold))
        ));
        assert!(matches!(
            item.toggle_heart(UserId(2)),
            Err(ThriftError::InvalidTransition(Rejection::AlreadySold))
        ));
    }

    #[test]
    fn test_withdrawn_listing_cannot_boost_or_sell() {
        let now = Utc::now();
        let mut item = listing();
        item.withdraw(now).unwrap();
        assert_eq!(item.state(now), ListingState::Inactive);
        assert!(matches!(
            item.boost(7, now),
            Err(ThriftError::InvalidTransition(Rejection::ListingInactive))
        ));
        assert!(matches!(
            item.mark_sold(now),
            Err(ThriftError::InvalidTransition(Rejection::ListingInactive))
        ));
    }

    #[test]
    fn test_withdrawn_listing_cannot_be_hearted() {
        let now = Utc::now();
        let mut item = listing();
        item.toggle_heart(UserId(2)).unwrap();
        item.withdraw(now).unwrap();

        assert!(matches!(
            item.toggle_heart(UserId(3)),
            Err(ThriftError::InvalidTransition(Rejection::ListingInactive))
        ));
        assert_eq!(item.hearts, 1);
        assert!(!item.is_hearted_by(UserId(3)));
    }

    #[test]
    fn test_update_details_keeps_price_invariant() {
        let mut item = listing();
        item.update_details(Some(" Brass lamp "), Some(450), None).unwrap();
        assert_eq!(item.title, "Brass lamp");
        assert_eq!(item.price, 450);
        assert_eq!(item.original_price, 800);
        assert_eq!(item.savings(), 350);

        let before = item.clone();
        assert!(matches!(
            item.update_details(None, Some(900), None),
            Err(ThriftError::Validation(_))
        ));
        assert!(matches!(
            item.update_details(None, None, Some(100)),
            Err(ThriftError::Validation(_))
        ));
        assert!(matches!(
            item.update_details(Some("  "), None, None),
            Err(ThriftError::Validation(_))
        ));
        assert_eq!(item, before);

        item.update_details(None, Some(900), Some(1000)).unwrap();
        assert_eq!((item.price, item.original_price), (900, 1000));
    }

    #[test]
    fn test_update_details_rejected_once_off_market() {
        let now = Utc::now();
        let mut sold = listing();
        sold.mark_sold(now).unwrap();
        assert!(matches!(
            sold.update_details(None, Some(100), None),
            Err(ThriftError::InvalidTransition(Rejection::AlreadySold))
        ));

        let mut withdrawn = listing();
        withdrawn.withdraw(now).unwrap();
        assert!(matches!(
            withdrawn.update_details(None, Some(100), None),
            Err(ThriftError::InvalidTransition(Rejection::ListingInactive))
        ));
    }

    #[test]
    fn test_listing_filter() {
        let now = Utc::now();
        let live = listing();
        let mut sold = listing();
        sold.mark_sold(now).unwrap();
        let mut withdrawn = listing();
        withdrawn.withdraw(now).unwrap();

        assert!(ListingFilter::Active.matches(&live));
        assert!(!ListingFilter::Active.matches(&sold));
        assert!(!ListingFilter::Active.matches(&withdrawn));
        assert!(ListingFilter::Sold.matches(&sold));
        assert!(!ListingFilter::Sold.matches(&withdrawn));
        assert!(ListingFilter::Inactive.matches(&sold));
        assert!(ListingFilter::Inactive.matches(&withdrawn));
        assert!([&live, &sold, &withdrawn]
            .iter()
            .all(|i| ListingFilter::All.matches(i)));
    }

    #[test]
    fn test_heart_toggle_pair_restores_state() {
        let mut item = listing();
        assert!(item.toggle_heart(UserId(2)).unwrap());
        assert_eq!(item.hearts, 1);
        assert!(item.is_hearted_by(UserId(2)));

        assert!(!item.toggle_heart(UserId(2)).unwrap());
        assert_eq!(item.hearts, 0);
        assert!(item.hearted_by.is_empty());
    }

    #[test]
    fn test_hearts_track_set_size() {
        let mut item = listing();
        for user in 2..6 {
            item.toggle_heart(UserId(user)).unwrap();
        }
        item.toggle_heart(UserId(3)).unwrap();
        assert_eq!(item.hearts, 3);
        assert_eq!(item.hearts as usize, item.hearted_by.len());
    }
}
