use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use crate::domain::UserId;
use crate::notifier::{Address, Notification, Transport};

/// Identifies one live connection, so a user can hold several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

struct Session {
    id: SessionId,
    sender: UnboundedSender<Notification>,
}

/// In-process session registry keyed by user.
#[derive(Default)]
pub struct SessionHub {
    sessions: RwLock<HashMap<UserId, Vec<Session>>>,
    next_id: AtomicU64,
}

impl SessionHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session for `user_id`. Dropping the receiver ends it; the hub
    /// prunes it on the next delivery.
    pub fn connect(&self, user_id: UserId) -> (SessionId, UnboundedReceiver<Notification>) {
        let (tx, rx) = unbounded_channel();
        let id = SessionId(self.next_id.fetch_add(1, Ordering::Relaxed));

        let mut guard = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        guard
            .entry(user_id)
            .or_default()
            .push(Session { id, sender: tx });

        debug!(
            "Session {:?} opened for user {}, {} live",
            id,
            user_id,
            guard.get(&user_id).map(|v| v.len()).unwrap_or(0)
        );
        (id, rx)
    }

    pub fn disconnect(&self, user_id: UserId, session_id: SessionId) {
        let mut guard = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        if let Some(sessions) = guard.get_mut(&user_id) {
            sessions.retain(|s| s.id != session_id);
            if sessions.is_empty() {
                guard.remove(&user_id);
            }
        }
    }

    pub fn session_count(&self, user_id: UserId) -> usize {
        let guard = self.sessions.read().unwrap_or_else(|e| e.into_inner());
        guard.get(&user_id).map(|v| v.len()).unwrap_or(0)
    }

    pub fn online_users(&self) -> usize {
        self.sessions.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn send_to(sessions: &mut Vec<Session>, notification: &Notification) -> usize {
        let before = sessions.len();
        sessions.retain(|s| s.sender.send(notification.clone()).is_ok());
        before - sessions.len()
    }
}

impl Transport for SessionHub {
    fn deliver(&self, address: Address, notification: Notification) {
        let mut guard = self.sessions.write().unwrap_or_else(|e| e.into_inner());

        let pruned = match address {
            Address::User(user_id) => {
                let Some(sessions) = guard.get_mut(&user_id) else {
                    return;
                };
                Self::send_to(sessions, &notification)
            }
            Address::Everyone => guard
                .values_mut()
                .map(|sessions| Self::send_to(sessions, &notification))
                .sum(),
        };

        if pruned > 0 {
            guard.retain(|_, sessions| !sessions.is_empty());
            debug!("Pruned {} closed sessions", pruned);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ItemId;

    fn viewed(views: u64) -> Notification {
        Notification::ItemViewed {
            item_id: ItemId(1),
            views,
        }
    }

    #[tokio::test]
    async fn test_user_delivery_reaches_all_sessions() {
        let hub = SessionHub::new();
        let (_, mut phone) = hub.connect(UserId(1));
        let (_, mut laptop) = hub.connect(UserId(1));
        let (_, mut other) = hub.connect(UserId(2));

        hub.deliver(Address::User(UserId(1)), viewed(1));

        assert_eq!(phone.recv().await, Some(viewed(1)));
        assert_eq!(laptop.recv().await, Some(viewed(1)));
        assert!(other.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_reaches_everyone() {
        let hub = SessionHub::new();
        let (_, mut a) = hub.connect(UserId(1));
        let (_, mut b) = hub.connect(UserId(2));

        hub.deliver(Address::Everyone, viewed(3));

        assert_eq!(a.recv().await, Some(viewed(3)));
        assert_eq!(b.recv().await, Some(viewed(3)));
    }

    #[test]
    fn test_offline_user_is_a_noop() {
        let hub = SessionHub::new();
        hub.deliver(Address::User(UserId(42)), viewed(1));
        assert_eq!(hub.session_count(UserId(42)), 0);
    }

    #[test]
    fn test_closed_sessions_are_pruned() {
        let hub = SessionHub::new();
        let (_, rx) = hub.connect(UserId(1));
        let (_, mut live) = hub.connect(UserId(2));
        drop(rx);

        hub.deliver(Address::Everyone, viewed(1));
        assert_eq!(tokio_test::block_on(live.recv()), Some(viewed(1)));

        assert_eq!(hub.session_count(UserId(1)), 0);
        assert_eq!(hub.session_count(UserId(2)), 1);
        assert_eq!(hub.online_users(), 1);
    }

    #[test]
    fn test_disconnect_removes_only_that_session() {
        let hub = SessionHub::new();
        let (first, _rx1) = hub.connect(UserId(1));
        let (_, _rx2) = hub.connect(UserId(1));

        hub.disconnect(UserId(1), first);
        assert_eq!(hub.session_count(UserId(1)), 1);
    }
}
