//! Sending messages and observing the conversation feed

use super::message::ChatMessage;
use crate::core_identity::Identity;
use crate::core_membership::paths;
use crate::core_model::GroupId;
use crate::core_store::{SharedStore, StoreError, StoreUpdate};
use metrics::counter;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::warn;

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("Sender is not a member of this group")]
    NotMember,

    #[error("Message body is empty")]
    EmptyMessage,

    #[error("Store operation failed: {0}")]
    Store(#[from] StoreError),

    #[error("Stored message could not be encoded: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Appends messages to a group's conversation subtree and hands out feeds.
pub struct MessageService {
    store: Arc<dyn SharedStore>,
}

impl MessageService {
    pub fn new(store: Arc<dyn SharedStore>) -> Self {
        Self { store }
    }

    /// Store one message. Membership is checked against the group's member
    /// map; non-members cannot post into the conversation subtree.
    pub async fn send(
        &self,
        group_id: &GroupId,
        sender: &Identity,
        body: &str,
    ) -> Result<ChatMessage, MessageError> {
        let body = body.trim();
        if body.is_empty() {
            return Err(MessageError::EmptyMessage);
        }

        let membership = self
            .store
            .read(&paths::group_member(group_id, &sender.user_id))
            .await?;
        if membership.is_none() {
            return Err(MessageError::NotMember);
        }

        let message = ChatMessage::new(group_id.clone(), sender.user_id.clone(), body);
        let update = StoreUpdate::new().set(
            paths::conversation_message(group_id, &message.id),
            serde_json::to_value(&message)?,
        );
        self.store.atomic_update(update).await?;

        counter!("huddle_messages_sent_total").increment(1);
        Ok(message)
    }

    /// Subscribe to the group's conversation.
    pub async fn feed(&self, group_id: &GroupId) -> Result<MessageFeed, MessageError> {
        let rx = self
            .store
            .subscribe(&paths::conversation_messages(group_id))
            .await?;
        Ok(MessageFeed { rx })
    }
}

/// Live view of a conversation, ordered by `(sent_at, id)`.
pub struct MessageFeed {
    rx: watch::Receiver<Option<Value>>,
}

impl MessageFeed {
    pub fn current(&self) -> Vec<ChatMessage> {
        decode_messages(self.rx.borrow().as_ref())
    }

    /// Wait for the next change to the conversation and return the full
    /// ordered feed. `None` once the store is gone.
    pub async fn next(&mut self) -> Option<Vec<ChatMessage>> {
        self.rx.changed().await.ok()?;
        Some(self.current())
    }
}

fn decode_messages(snapshot: Option<&Value>) -> Vec<ChatMessage> {
    let Some(value) = snapshot else {
        return Vec::new();
    };
    let entries: HashMap<String, Value> = match serde_json::from_value(value.clone()) {
        Ok(entries) => entries,
        Err(error) => {
            warn!(%error, "conversation subtree is not a message map");
            return Vec::new();
        }
    };

    let mut messages: Vec<ChatMessage> = entries
        .into_iter()
        .filter_map(|(id, entry)| match serde_json::from_value(entry) {
            Ok(message) => Some(message),
            Err(error) => {
                warn!(message_id = %id, %error, "skipping undecodable message");
                None
            }
        })
        .collect();
    messages.sort_by(|a, b| (a.sent_at, &a.id.0).cmp(&(b.sent_at, &b.id.0)));
    messages
}
