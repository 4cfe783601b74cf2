//! Group records as they live in the shared tree

use crate::core_model::{GroupId, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Role held by a member within a group.
///
/// The join protocol only ever assigns `Member`; `Admin` is granted to the
/// creator at group creation and is what invite rotation requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupRole {
    Member,
    Admin,
}

/// The group's info block: everything about the group except its members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupInfo {
    /// Human-readable name
    pub name: String,

    /// Current admission secret; rotatable, single active value at a time
    pub invite_token: String,

    /// Cached cardinality of the member map
    pub member_count: u64,

    /// When the group was created
    pub created_at: Timestamp,
}

/// Per-(group, user) membership record.
///
/// Created exactly once per user per group and never mutated by the join
/// protocol afterwards; re-joining is a no-op redirect, not a new write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MembershipRecord {
    pub role: GroupRole,
    pub joined_at: Timestamp,
}

/// Denormalized back-reference under the user's chat index.
///
/// Written by the same atomic update that creates the membership record;
/// the two going out of sync is a split-brain bug, not a tolerated state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatIndexEntry {
    pub role: GroupRole,
    pub joined_at: Timestamp,
}

#[derive(Debug, Deserialize)]
struct GroupTree {
    info: Option<GroupInfo>,
    #[serde(default)]
    members: HashMap<UserId, MembershipRecord>,
}

/// Decoded snapshot of a whole group subtree.
#[derive(Debug, Clone)]
pub struct Group {
    pub id: GroupId,
    pub info: GroupInfo,
    pub members: HashMap<UserId, MembershipRecord>,
}

impl Group {
    /// Decode the subtree read from `groups/<id>`. Returns `None` when the
    /// info block is absent; a member map without info does not count as
    /// an existing group.
    pub fn decode(id: GroupId, value: Value) -> Result<Option<Group>, serde_json::Error> {
        let tree: GroupTree = serde_json::from_value(value)?;
        Ok(tree.info.map(|info| Group {
            id,
            info,
            members: tree.members,
        }))
    }

    pub fn is_member(&self, user_id: &UserId) -> bool {
        self.members.contains_key(user_id)
    }

    pub fn role(&self, user_id: &UserId) -> Option<GroupRole> {
        self.members.get(user_id).map(|record| record.role)
    }

    /// Whether the cached count matches the member map.
    pub fn count_consistent(&self) -> bool {
        self.info.member_count == self.members.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_value(GroupRole::Member).unwrap(), json!("member"));
        assert_eq!(serde_json::to_value(GroupRole::Admin).unwrap(), json!("admin"));
    }

    #[test]
    fn test_decode_full_group() {
        let value = json!({
            "info": {
                "name": "rustaceans",
                "invite_token": "abc123",
                "member_count": 2,
                "created_at": 1000,
            },
            "members": {
                "u1": {"role": "admin", "joined_at": 1000},
                "u2": {"role": "member", "joined_at": 2000},
            },
        });

        let group = Group::decode(GroupId::new("g1"), value).unwrap().unwrap();
        assert_eq!(group.info.invite_token, "abc123");
        assert!(group.is_member(&UserId::new("u2")));
        assert_eq!(group.role(&UserId::new("u1")), Some(GroupRole::Admin));
        assert!(group.count_consistent());
    }

    #[test]
    fn test_decode_without_info_is_absent() {
        let value = json!({
            "members": {"u1": {"role": "member", "joined_at": 1}},
        });
        assert!(Group::decode(GroupId::new("g1"), value).unwrap().is_none());
    }

    #[test]
    fn test_membership_record_roundtrip() {
        let record = MembershipRecord {
            role: GroupRole::Member,
            joined_at: Timestamp::from_millis(42),
        };
        let value = serde_json::to_value(&record).unwrap();
        let back: MembershipRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }
}
