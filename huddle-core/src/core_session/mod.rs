//! Navigation-scoped session state
//!
//! Process-wide, client-local, never persisted. The active conversation and
//! the pending invite artifact live in one watch slot, so consumers always
//! observe a conversation change and the invite invalidation it implies as
//! a single frame.

use crate::core_model::{GroupId, InviteRef};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// One frame of session state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionState {
    /// Conversation currently on screen
    pub active_conversation: Option<GroupId>,

    /// Invite being processed, pending admission. Single-use navigation
    /// context: every change of the active conversation clears it.
    pub pending_invite: Option<InviteRef>,
}

/// Handle to the session slot. Cheap to clone; all clones observe and
/// mutate the same state.
#[derive(Clone)]
pub struct SessionContext {
    state: Arc<watch::Sender<SessionState>>,
}

impl SessionContext {
    pub fn new() -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            state: Arc::new(state),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn active_conversation(&self) -> Option<GroupId> {
        self.state.borrow().active_conversation.clone()
    }

    pub fn pending_invite(&self) -> Option<InviteRef> {
        self.state.borrow().pending_invite.clone()
    }

    /// Enter a conversation. Unconditionally drops any pending invite in
    /// the same transition, also when the conversation being entered is
    /// the one that invite just admitted into.
    pub fn set_active_conversation(&self, id: GroupId) {
        debug!(conversation = %id, "entering conversation");
        self.state.send_modify(|state| {
            state.active_conversation = Some(id);
            state.pending_invite = None;
        });
    }

    /// Leave the conversation view. A change of active conversation, so the
    /// pending invite is dropped here too.
    pub fn clear_active_conversation(&self) {
        self.state.send_modify(|state| {
            state.active_conversation = None;
            state.pending_invite = None;
        });
    }

    /// Record the invite being processed. Only the invite flow calls this,
    /// before admission is confirmed.
    pub fn set_pending_invite(&self, invite: InviteRef) {
        self.state.send_modify(|state| {
            state.pending_invite = Some(invite);
        });
    }

    /// Idempotent.
    pub fn clear_pending_invite(&self) {
        self.state.send_modify(|state| {
            state.pending_invite = None;
        });
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invite(group: &str) -> InviteRef {
        InviteRef::new(GroupId::new(group), "token")
    }

    #[test]
    fn test_entering_conversation_clears_pending_invite() {
        let session = SessionContext::new();
        session.set_pending_invite(invite("g1"));
        assert!(session.pending_invite().is_some());

        session.set_active_conversation(GroupId::new("g1"));

        assert_eq!(session.active_conversation(), Some(GroupId::new("g1")));
        assert!(session.pending_invite().is_none());
    }

    #[test]
    fn test_clear_applies_without_pending_invite() {
        let session = SessionContext::new();
        session.set_active_conversation(GroupId::new("g1"));
        assert!(session.pending_invite().is_none());

        session.clear_active_conversation();
        assert!(session.active_conversation().is_none());
    }

    #[test]
    fn test_clear_pending_invite_is_idempotent() {
        let session = SessionContext::new();
        session.set_pending_invite(invite("g1"));
        session.clear_pending_invite();
        session.clear_pending_invite();
        assert!(session.pending_invite().is_none());
    }

    #[test]
    fn test_clones_share_state() {
        let session = SessionContext::new();
        let other = session.clone();

        session.set_active_conversation(GroupId::new("g1"));
        assert_eq!(other.active_conversation(), Some(GroupId::new("g1")));
    }

    #[tokio::test]
    async fn test_watchers_never_see_stale_invite_with_new_conversation() {
        let session = SessionContext::new();
        let mut rx = session.watch();

        session.set_pending_invite(invite("g1"));
        session.set_active_conversation(GroupId::new("g1"));

        // Drain every frame the watcher can observe; none may pair an
        // active conversation with a leftover invite artifact.
        while rx.has_changed().unwrap() {
            let frame = rx.borrow_and_update().clone();
            if frame.active_conversation.is_some() {
                assert!(frame.pending_invite.is_none());
            }
        }

        let last = rx.borrow().clone();
        assert_eq!(last.active_conversation, Some(GroupId::new("g1")));
        assert!(last.pending_invite.is_none());
    }
}
