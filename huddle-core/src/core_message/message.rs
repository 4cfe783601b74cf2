//! Chat message record

use crate::core_model::{GroupId, MessageId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// One message in a group conversation, as stored under
/// `conversations/<gid>/messages/<mid>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub group_id: GroupId,
    pub sender: UserId,
    pub body: String,
    pub sent_at: Timestamp,
}

impl ChatMessage {
    pub fn new(group_id: GroupId, sender: UserId, body: impl Into<String>) -> Self {
        ChatMessage {
            id: MessageId::generate(),
            group_id,
            sender,
            body: body.into(),
            sent_at: Timestamp::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_roundtrip() {
        let message = ChatMessage::new(GroupId::new("g1"), UserId::new("u1"), "hello");
        let value = serde_json::to_value(&message).unwrap();
        let back: ChatMessage = serde_json::from_value(value).unwrap();
        assert_eq!(back, message);
    }
}
