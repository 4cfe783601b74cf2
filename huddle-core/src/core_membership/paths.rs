//! Layout of the group, index, and conversation subtrees
//!
//! ```text
//! groups/<gid>/info                  -> GroupInfo
//! groups/<gid>/members/<uid>         -> MembershipRecord
//! users/<uid>/chats/<gid>            -> ChatIndexEntry
//! conversations/<gid>/messages/<mid> -> ChatMessage
//! ```

use crate::core_model::{GroupId, MessageId, UserId};
use crate::core_store::StorePath;

pub fn group_root(group_id: &GroupId) -> StorePath {
    StorePath::new("groups").child(group_id.as_str())
}

pub fn group_info(group_id: &GroupId) -> StorePath {
    group_root(group_id).child("info")
}

pub fn group_invite_token(group_id: &GroupId) -> StorePath {
    group_info(group_id).child("invite_token")
}

pub fn group_member_count(group_id: &GroupId) -> StorePath {
    group_info(group_id).child("member_count")
}

pub fn group_member(group_id: &GroupId, user_id: &UserId) -> StorePath {
    group_root(group_id).child("members").child(user_id.as_str())
}

pub fn user_chats(user_id: &UserId) -> StorePath {
    StorePath::new("users").child(user_id.as_str()).child("chats")
}

pub fn user_chat(user_id: &UserId, group_id: &GroupId) -> StorePath {
    user_chats(user_id).child(group_id.as_str())
}

pub fn conversation_messages(group_id: &GroupId) -> StorePath {
    StorePath::new("conversations")
        .child(group_id.as_str())
        .child("messages")
}

pub fn conversation_message(group_id: &GroupId, message_id: &MessageId) -> StorePath {
    conversation_messages(group_id).child(message_id.as_str())
}
