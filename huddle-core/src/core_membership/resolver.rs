//! Invite validation and the atomic group-join transaction

use super::group::{ChatIndexEntry, Group, GroupInfo, GroupRole, MembershipRecord};
use super::paths;
use crate::core_identity::Identity;
use crate::core_model::{GroupId, Timestamp};
use crate::core_store::{SharedStore, StoreError, StoreUpdate};
use metrics::counter;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Terminal success states of a join attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The membership record, index entry, and count landed in one write.
    Joined,
    /// The requester already held a record; nothing was written.
    AlreadyMember,
}

/// Failures of the join protocol, each mapped by the caller to a
/// user-visible message and a recovery action.
#[derive(Debug, Clone, Error)]
pub enum JoinError {
    #[error("Group not found")]
    GroupNotFound,

    #[error("Invite link is not valid for this group")]
    InvalidInvite,

    #[error("Sign-in required before joining")]
    AuthRequired,

    #[error("Join could not be applied: {0}")]
    JoinFailed(String),
}

/// Failures of the adjacent membership operations.
#[derive(Debug, Error)]
pub enum MembershipError {
    #[error("Group not found")]
    GroupNotFound,

    #[error("User is not a member of this group")]
    NotMember,

    #[error("Operation requires the admin role")]
    AdminRequired,

    #[error("Store operation failed: {0}")]
    Store(#[from] StoreError),

    #[error("Stored record could not be decoded: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("Concurrent updates kept conflicting")]
    Contended,
}

/// Tunables for the resolver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Attempts before a guarded write that keeps conflicting is reported
    /// as a transient failure
    pub join_retry_limit: u32,

    /// Length of generated invite tokens
    pub invite_token_length: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            join_retry_limit: 3,
            invite_token_length: 8,
        }
    }
}

/// Validates invite references and performs the membership state
/// transitions. The only component that writes the group/membership
/// subtree.
pub struct MembershipResolver {
    store: Arc<dyn SharedStore>,
    config: ResolverConfig,
}

impl MembershipResolver {
    pub fn new(store: Arc<dyn SharedStore>) -> Self {
        Self::with_config(store, ResolverConfig::default())
    }

    pub fn with_config(store: Arc<dyn SharedStore>, config: ResolverConfig) -> Self {
        Self { store, config }
    }

    /// Admit `requester` to `group_id` if `invite_token` matches the
    /// group's current token.
    ///
    /// The admission itself is one atomic multi-path write: the membership
    /// record, the requester's chat-index entry, and the incremented member
    /// count all land together or not at all. The count write is guarded on
    /// the value observed in the snapshot read, so concurrent joins retry
    /// instead of losing increments.
    pub async fn join_group(
        &self,
        group_id: &GroupId,
        invite_token: &str,
        requester: Option<&Identity>,
    ) -> Result<JoinOutcome, JoinError> {
        let requester = requester.ok_or(JoinError::AuthRequired)?;

        for attempt in 1..=self.config.join_retry_limit {
            let snapshot = self
                .store
                .read(&paths::group_root(group_id))
                .await
                .map_err(|e| JoinError::JoinFailed(e.to_string()))?;

            let group = match snapshot {
                Some(value) => Group::decode(group_id.clone(), value)
                    .map_err(|e| JoinError::JoinFailed(e.to_string()))?,
                None => None,
            };
            let Some(group) = group else {
                counter!("huddle_joins_total", "outcome" => "group_not_found").increment(1);
                return Err(JoinError::GroupNotFound);
            };

            // Exact byte-for-byte comparison; no trimming, no case folding.
            if invite_token != group.info.invite_token {
                counter!("huddle_joins_total", "outcome" => "invalid_invite").increment(1);
                return Err(JoinError::InvalidInvite);
            }

            if group.is_member(&requester.user_id) {
                counter!("huddle_joins_total", "outcome" => "already_member").increment(1);
                debug!(group = %group_id, user = %requester.user_id, "already a member");
                return Ok(JoinOutcome::AlreadyMember);
            }

            let observed_count = group.info.member_count;
            let joined_at = Timestamp::now();
            let record = MembershipRecord {
                role: GroupRole::Member,
                joined_at,
            };
            let entry = ChatIndexEntry {
                role: GroupRole::Member,
                joined_at,
            };

            let record_value = serde_json::to_value(&record)
                .map_err(|e| JoinError::JoinFailed(e.to_string()))?;
            let entry_value = serde_json::to_value(&entry)
                .map_err(|e| JoinError::JoinFailed(e.to_string()))?;

            let update = StoreUpdate::new()
                .set(paths::group_member(group_id, &requester.user_id), record_value)
                .set(paths::user_chat(&requester.user_id, group_id), entry_value)
                .set(paths::group_member_count(group_id), json!(observed_count + 1))
                .guard(
                    paths::group_member_count(group_id),
                    Some(json!(observed_count)),
                )
                .guard(paths::group_member(group_id, &requester.user_id), None);

            match self.store.atomic_update(update).await {
                Ok(()) => {
                    counter!("huddle_joins_total", "outcome" => "joined").increment(1);
                    info!(group = %group_id, user = %requester.user_id, "joined group");
                    return Ok(JoinOutcome::Joined);
                }
                Err(StoreError::Conflict { path }) => {
                    debug!(group = %group_id, %path, attempt, "join conflicted, retrying");
                    continue;
                }
                Err(e) => {
                    counter!("huddle_joins_total", "outcome" => "join_failed").increment(1);
                    warn!(group = %group_id, error = %e, "join write failed");
                    return Err(JoinError::JoinFailed(e.to_string()));
                }
            }
        }

        counter!("huddle_joins_total", "outcome" => "join_failed").increment(1);
        Err(JoinError::JoinFailed(
            "concurrent membership updates kept conflicting".to_string(),
        ))
    }

    /// Create a group with `owner` as its sole, admin member.
    pub async fn create_group(
        &self,
        name: impl Into<String>,
        owner: &Identity,
    ) -> Result<Group, MembershipError> {
        let group_id = GroupId::generate();
        let created_at = Timestamp::now();
        let info = GroupInfo {
            name: name.into(),
            invite_token: self.generate_invite_token(),
            member_count: 1,
            created_at,
        };
        let record = MembershipRecord {
            role: GroupRole::Admin,
            joined_at: created_at,
        };
        let entry = ChatIndexEntry {
            role: GroupRole::Admin,
            joined_at: created_at,
        };

        let update = StoreUpdate::new()
            .set(paths::group_info(&group_id), serde_json::to_value(&info)?)
            .set(
                paths::group_member(&group_id, &owner.user_id),
                serde_json::to_value(&record)?,
            )
            .set(
                paths::user_chat(&owner.user_id, &group_id),
                serde_json::to_value(&entry)?,
            )
            .guard(paths::group_root(&group_id), None);
        self.store.atomic_update(update).await?;

        info!(group = %group_id, owner = %owner.user_id, "created group");
        let mut members = HashMap::new();
        members.insert(owner.user_id.clone(), record);
        Ok(Group {
            id: group_id,
            info,
            members,
        })
    }

    /// Replace the group's invite token. Admin only; outstanding links
    /// carrying the old token stop admitting anyone.
    pub async fn rotate_invite(
        &self,
        group_id: &GroupId,
        requester: &Identity,
    ) -> Result<String, MembershipError> {
        for _ in 0..self.config.join_retry_limit {
            let group = self
                .load_group(group_id)
                .await?
                .ok_or(MembershipError::GroupNotFound)?;
            match group.role(&requester.user_id) {
                Some(GroupRole::Admin) => {}
                Some(_) => return Err(MembershipError::AdminRequired),
                None => return Err(MembershipError::NotMember),
            }

            let new_token = self.generate_invite_token();
            let update = StoreUpdate::new()
                .set(paths::group_invite_token(group_id), json!(new_token))
                .guard(
                    paths::group_invite_token(group_id),
                    Some(json!(group.info.invite_token)),
                );

            match self.store.atomic_update(update).await {
                Ok(()) => {
                    info!(group = %group_id, "rotated invite token");
                    return Ok(new_token);
                }
                Err(StoreError::Conflict { .. }) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(MembershipError::Contended)
    }

    /// Remove `requester` from the group, deleting the membership record
    /// and index entry and decrementing the count in one write.
    pub async fn leave_group(
        &self,
        group_id: &GroupId,
        requester: &Identity,
    ) -> Result<(), MembershipError> {
        for _ in 0..self.config.join_retry_limit {
            let group = self
                .load_group(group_id)
                .await?
                .ok_or(MembershipError::GroupNotFound)?;
            if !group.is_member(&requester.user_id) {
                return Err(MembershipError::NotMember);
            }

            let observed_count = group.info.member_count;
            let update = StoreUpdate::new()
                .remove(paths::group_member(group_id, &requester.user_id))
                .remove(paths::user_chat(&requester.user_id, group_id))
                .set(
                    paths::group_member_count(group_id),
                    json!(observed_count.saturating_sub(1)),
                )
                .guard(
                    paths::group_member_count(group_id),
                    Some(json!(observed_count)),
                );

            match self.store.atomic_update(update).await {
                Ok(()) => {
                    info!(group = %group_id, user = %requester.user_id, "left group");
                    return Ok(());
                }
                Err(StoreError::Conflict { .. }) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(MembershipError::Contended)
    }

    /// Groups the requester belongs to, straight from the denormalized
    /// index; no scan over all groups.
    pub async fn list_user_groups(
        &self,
        requester: &Identity,
    ) -> Result<Vec<(GroupId, ChatIndexEntry)>, MembershipError> {
        let snapshot = self.store.read(&paths::user_chats(&requester.user_id)).await?;
        let Some(value) = snapshot else {
            return Ok(Vec::new());
        };

        let index: HashMap<GroupId, ChatIndexEntry> = serde_json::from_value(value)?;
        let mut chats: Vec<_> = index.into_iter().collect();
        chats.sort_by(|a, b| a.1.joined_at.cmp(&b.1.joined_at));
        Ok(chats)
    }

    async fn load_group(&self, group_id: &GroupId) -> Result<Option<Group>, MembershipError> {
        let snapshot = self.store.read(&paths::group_root(group_id)).await?;
        match snapshot {
            Some(value) => Ok(Group::decode(group_id.clone(), value)?),
            None => Ok(None),
        }
    }

    fn generate_invite_token(&self) -> String {
        use rand::Rng;
        const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

        let mut rng = rand::rng();
        (0..self.config.invite_token_length)
            .map(|_| {
                let idx = rng.random_range(0..CHARSET.len());
                CHARSET[idx] as char
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_model::UserId;
    use crate::core_store::MemoryStore;

    fn identity(id: &str) -> Identity {
        Identity::new(UserId::new(id))
    }

    fn setup() -> MembershipResolver {
        MembershipResolver::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_create_group_seeds_owner_as_admin() {
        let resolver = setup();
        let owner = identity("alice");

        let group = resolver.create_group("rustaceans", &owner).await.unwrap();

        assert_eq!(group.info.member_count, 1);
        assert_eq!(group.role(&owner.user_id), Some(GroupRole::Admin));
        assert_eq!(
            group.info.invite_token.len(),
            ResolverConfig::default().invite_token_length
        );

        let chats = resolver.list_user_groups(&owner).await.unwrap();
        assert_eq!(chats.len(), 1);
        assert_eq!(chats[0].0, group.id);
    }

    #[tokio::test]
    async fn test_join_then_reload_is_consistent() {
        let resolver = setup();
        let owner = identity("alice");
        let joiner = identity("bob");

        let group = resolver.create_group("rustaceans", &owner).await.unwrap();
        let outcome = resolver
            .join_group(&group.id, &group.info.invite_token, Some(&joiner))
            .await
            .unwrap();
        assert_eq!(outcome, JoinOutcome::Joined);

        let reloaded = resolver.load_group(&group.id).await.unwrap().unwrap();
        assert_eq!(reloaded.info.member_count, 2);
        assert!(reloaded.count_consistent());
        assert_eq!(reloaded.role(&joiner.user_id), Some(GroupRole::Member));
    }

    #[tokio::test]
    async fn test_join_without_identity_fails_safely() {
        let resolver = setup();
        let owner = identity("alice");
        let group = resolver.create_group("rustaceans", &owner).await.unwrap();

        let result = resolver
            .join_group(&group.id, &group.info.invite_token, None)
            .await;
        assert!(matches!(result, Err(JoinError::AuthRequired)));
    }

    #[tokio::test]
    async fn test_rotate_invite_requires_admin() {
        let resolver = setup();
        let owner = identity("alice");
        let member = identity("bob");

        let group = resolver.create_group("rustaceans", &owner).await.unwrap();
        resolver
            .join_group(&group.id, &group.info.invite_token, Some(&member))
            .await
            .unwrap();

        let result = resolver.rotate_invite(&group.id, &member).await;
        assert!(matches!(result, Err(MembershipError::AdminRequired)));

        let stranger = identity("mallory");
        let result = resolver.rotate_invite(&group.id, &stranger).await;
        assert!(matches!(result, Err(MembershipError::NotMember)));
    }

    #[tokio::test]
    async fn test_rotate_invalidates_old_token() {
        let resolver = setup();
        let owner = identity("alice");
        let joiner = identity("bob");

        let group = resolver.create_group("rustaceans", &owner).await.unwrap();
        let old_token = group.info.invite_token.clone();
        let new_token = resolver.rotate_invite(&group.id, &owner).await.unwrap();
        assert_ne!(old_token, new_token);

        let result = resolver.join_group(&group.id, &old_token, Some(&joiner)).await;
        assert!(matches!(result, Err(JoinError::InvalidInvite)));

        let outcome = resolver
            .join_group(&group.id, &new_token, Some(&joiner))
            .await
            .unwrap();
        assert_eq!(outcome, JoinOutcome::Joined);
    }

    #[tokio::test]
    async fn test_leave_group_removes_both_sides() {
        let resolver = setup();
        let owner = identity("alice");
        let member = identity("bob");

        let group = resolver.create_group("rustaceans", &owner).await.unwrap();
        resolver
            .join_group(&group.id, &group.info.invite_token, Some(&member))
            .await
            .unwrap();

        resolver.leave_group(&group.id, &member).await.unwrap();

        let reloaded = resolver.load_group(&group.id).await.unwrap().unwrap();
        assert_eq!(reloaded.info.member_count, 1);
        assert!(!reloaded.is_member(&member.user_id));
        assert!(resolver.list_user_groups(&member).await.unwrap().is_empty());

        let result = resolver.leave_group(&group.id, &member).await;
        assert!(matches!(result, Err(MembershipError::NotMember)));
    }

    #[tokio::test]
    async fn test_list_user_groups_ordered_by_join_time() {
        let resolver = setup();
        let owner = identity("alice");

        let first = resolver.create_group("first", &owner).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let second = resolver.create_group("second", &owner).await.unwrap();

        let chats = resolver.list_user_groups(&owner).await.unwrap();
        assert_eq!(chats.len(), 2);
        assert_eq!(chats[0].0, first.id);
        assert_eq!(chats[1].0, second.id);
    }
}
