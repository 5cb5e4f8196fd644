//! Points ledger: credit and debit against a user's balance.
//!
//! Each operation is one versioned write of the user row, so the balance
//! check and the decrement commit together or not at all.

use std::sync::Arc;

use tracing::{debug, info};

use crate::app::{Rejection, Result, ThriftError};
use crate::domain::{User, UserId};
use crate::store::{with_retry, Attempt, RetryPolicy, Store};

#[derive(Clone)]
pub struct PointsLedger {
    store: Arc<dyn Store>,
    retry: RetryPolicy,
}

impl PointsLedger {
    pub fn new(store: Arc<dyn Store>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    pub fn credit(&self, user_id: UserId, amount: u64) -> Result<User> {
        let user = modify_user(&self.store, self.retry, user_id, |user| {
            ensure_active(user)?;
            user.credit(amount)
        })?;
        info!(
            "Credited {} points to user {} (balance {})",
            amount, user_id, user.points
        );
        Ok(user)
    }

    pub fn debit(&self, user_id: UserId, amount: u64) -> Result<User> {
        let user = modify_user(&self.store, self.retry, user_id, |user| {
            ensure_active(user)?;
            user.debit(amount)
        })
        .inspect_err(|e| {
            if let ThriftError::InsufficientBalance { available, .. } = e {
                debug!(
                    "Debit of {} from user {} refused, {} available",
                    amount, user_id, available
                );
            }
        })?;
        info!(
            "Debited {} points from user {} (balance {})",
            amount, user_id, user.points
        );
        Ok(user)
    }

    /// Undo a debit whose purchase could not be completed.
    pub fn refund(&self, user_id: UserId, amount: u64) -> Result<User> {
        let user = modify_user(&self.store, self.retry, user_id, |user| user.refund(amount))?;
        info!("Refunded {} points to user {}", amount, user_id);
        Ok(user)
    }

    /// Reward one side of a completed trade.
    pub fn reward_trade(&self, user_id: UserId, points: u64, saved: u64) -> Result<User> {
        let user = modify_user(&self.store, self.retry, user_id, |user| {
            ensure_active(user)?;
            user.record_trade(points, saved)
        })?;
        info!(
            "User {} earned {} points for a trade (balance {}, saved {})",
            user_id, points, user.points, user.money_saved
        );
        Ok(user)
    }

    /// Soft-deactivate an account. Its balance stays but can no longer move.
    pub fn deactivate(&self, user_id: UserId) -> Result<User> {
        let user = modify_user(&self.store, self.retry, user_id, |user| {
            user.is_active = false;
            Ok(())
        })?;
        info!("User {} deactivated", user_id);
        Ok(user)
    }

    pub fn account(&self, user_id: UserId) -> Result<User> {
        self.store
            .get_user(user_id)?
            .ok_or(ThriftError::UserNotFound(user_id))
    }

    pub fn balance(&self, user_id: UserId) -> Result<u64> {
        self.account(user_id).map(|user| user.points)
    }
}

pub(crate) fn ensure_active(user: &User) -> Result<()> {
    if user.is_active {
        Ok(())
    } else {
        Err(ThriftError::InvalidTransition(Rejection::UserInactive))
    }
}

/// Load, mutate and conditionally write one user, retrying lost races.
pub(crate) fn modify_user<F>(
    store: &Arc<dyn Store>,
    retry: RetryPolicy,
    user_id: UserId,
    mut op: F,
) -> Result<User>
where
    F: FnMut(&mut User) -> Result<()>,
{
    with_retry(retry, "user", user_id, || {
        let mut user = store
            .get_user(user_id)?
            .ok_or(ThriftError::UserNotFound(user_id))?;
        op(&mut user)?;
        if store.update_user(&mut user)? {
            Ok(Attempt::Done(user))
        } else {
            Ok(Attempt::Conflict)
        }
    })
}
