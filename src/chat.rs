//! Chat registry: one thread per (unordered user pair, item).

use std::sync::Arc;

use tracing::{debug, info};

use crate::app::{Clock, Rejection, Result, ThriftError};
use crate::domain::{ChatId, ChatThread, ItemId, Message, MessageKind, ThreadKey, UserId};
use crate::notifier::RealtimeNotifier;
use crate::store::{with_retry, Attempt, RetryPolicy, Store};

pub const DEFAULT_MAX_MESSAGE_LEN: usize = 1000;

#[derive(Clone)]
pub struct ChatRegistry {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    notifier: RealtimeNotifier,
    retry: RetryPolicy,
    max_message_len: usize,
}

impl ChatRegistry {
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
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
        }
    }

    pub fn with_max_message_len(mut self, max_message_len: usize) -> Self {
        self.max_message_len = max_message_len;
        self
    }

    /// Return the thread for this pair and item, creating an empty one on
    /// first contact. Argument order does not matter.
    pub fn find_or_create(
        &self,
        user_a: UserId,
        user_b: UserId,
        item_id: ItemId,
    ) -> Result<ChatThread> {
        let key = ThreadKey::new(user_a, user_b, item_id)
            .ok_or(ThriftError::InvalidTransition(Rejection::SelfConversation))?;

        if let Some(thread) = self.store.find_chat(&key)? {
            return Ok(thread);
        }

        for user_id in key.participants() {
            if self.store.get_user(user_id)?.is_none() {
                return Err(ThriftError::UserNotFound(user_id));
            }
        }
        if self.store.get_item(item_id)?.is_none() {
            return Err(ThriftError::ItemNotFound(item_id));
        }

        // The unique key decides the winner; losers read back its row.
        let (thread, created) = self
            .store
            .insert_chat_if_absent(&ChatThread::new(&key, self.clock.now()))?;
        if created {
            info!(
                "Opened chat {} between {} and {} about item {}",
                thread.id, user_a, user_b, item_id
            );
        }
        Ok(thread)
    }

    pub fn post_message(
        &self,
        chat_id: &ChatId,
        sender_id: UserId,
        content: &str,
        kind: MessageKind,
    ) -> Result<(ChatThread, Message)> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ThriftError::Validation("message must not be empty".into()));
        }
        let len = content.chars().count();
        if len > self.max_message_len {
            return Err(ThriftError::Validation(format!(
                "message is {} characters, limit is {}",
                len, self.max_message_len
            )));
        }

        let (thread, message) = self.modify(chat_id, |thread| {
            let message = thread.post(sender_id, content.to_string(), kind, self.clock.now())?;
            Ok((true, message))
        })?;
        debug!("User {} posted message {} in chat {}", sender_id, message.id, chat_id);
        self.notifier.message_posted(&thread, &message);
        Ok((thread, message))
    }

    /// Mark the other participant's messages read for `user_id`. Returns the
    /// thread and how many messages flipped.
    pub fn mark_read(&self, chat_id: &ChatId, user_id: UserId) -> Result<(ChatThread, usize)> {
        let (thread, flipped) = self.modify(chat_id, |thread| {
            let had_unread = thread.unread_for(user_id) > 0;
            let flipped = thread.mark_read(user_id, self.clock.now())?;
            Ok((flipped > 0 || had_unread, flipped))
        })?;
        if flipped > 0 {
            debug!("User {} read {} messages in chat {}", user_id, flipped, chat_id);
            self.notifier.messages_read(&thread, user_id);
        }
        Ok((thread, flipped))
    }

    /// Hide a thread from further posting. Either participant may do this.
    pub fn deactivate(&self, chat_id: &ChatId, user_id: UserId) -> Result<ChatThread> {
        let (thread, changed) = self.modify(chat_id, |thread| {
            let changed = thread.deactivate(user_id)?;
            Ok((changed, changed))
        })?;
        if changed {
            info!("Chat {} deactivated by user {}", chat_id, user_id);
        }
        Ok(thread)
    }

    pub fn get_thread(&self, chat_id: &ChatId, viewer: UserId) -> Result<ChatThread> {
        let thread = self.load(chat_id)?;
        thread.ensure_participant(viewer)?;
        Ok(thread)
    }

    /// Active threads `user_id` takes part in, most recent activity first.
    pub fn list_for_user(&self, user_id: UserId) -> Result<Vec<ChatThread>> {
        let mut threads: Vec<ChatThread> = self
            .store
            .list_chats_for_user(user_id)?
            .into_iter()
            .filter(|t| t.is_active)
            .collect();
        threads.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        Ok(threads)
    }

    pub fn total_unread(&self, user_id: UserId) -> Result<u64> {
        Ok(self
            .list_for_user(user_id)?
            .iter()
            .map(|t| u64::from(t.unread_for(user_id)))
            .sum())
    }

    pub fn other_participant(&self, thread: &ChatThread, user_id: UserId) -> Option<UserId> {
        thread.other_participant(user_id)
    }

    fn load(&self, chat_id: &ChatId) -> Result<ChatThread> {
        self.store
            .get_chat(chat_id)?
            .ok_or_else(|| ThriftError::ChatNotFound(chat_id.clone()))
    }

    /// `op` returns whether it changed the thread along with its result.
    /// Unchanged threads are not written back.
    fn modify<T, F>(&self, chat_id: &ChatId, mut op: F) -> Result<(ChatThread, T)>
    where
        F: FnMut(&mut ChatThread) -> Result<(bool, T)>,
    {
        with_retry(self.retry, "chat", chat_id, || {
            let mut thread = self.load(chat_id)?;
            let (changed, value) = op(&mut thread)?;
            if !changed {
                return Ok(Attempt::Done((thread, value)));
            }
            if self.store.update_chat(&mut thread)? {
                Ok(Attempt::Done((thread, value)))
            } else {
                Ok(Attempt::Conflict)
            }
        })
    }
}
