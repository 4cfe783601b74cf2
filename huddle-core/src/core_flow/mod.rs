//! Invite-following control flow
//!
//! Drives a followed invite link end to end: guard check, pending-invite
//! bookkeeping, the join itself, and the session transition into the
//! conversation. Every step lands in an observable state slot, so no
//! failure disappears without a trace a caller (or test) can see.

use crate::core_guard::{AccessGuard, RouteTarget};
use crate::core_identity::IdentityProvider;
use crate::core_membership::{JoinError, JoinOutcome, MembershipResolver};
use crate::core_model::{GroupId, InviteRef};
use crate::core_session::SessionContext;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

/// What the UI should offer after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Terminal: the link is dead, offer the way home
    ReturnHome,
    /// Transient: the same invite may succeed on retry
    Retry,
    /// Sign in first; the invite reference is preserved for resumption
    SignIn,
}

/// Observable progress of the invite flow.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InviteFlowState {
    #[default]
    Idle,
    /// Identity was absent; the invite is parked until sign-in completes.
    AwaitingSignIn { resume: InviteRef },
    Joining { invite: InviteRef },
    Entered { conversation: GroupId },
    /// The error slot: message plus the recovery the caller should render.
    Failed {
        message: String,
        recovery: RecoveryAction,
    },
}

/// Coordinates one invite reference through guard, resolver, and session.
pub struct InviteFlow {
    resolver: Arc<MembershipResolver>,
    session: SessionContext,
    identity: Arc<dyn IdentityProvider>,
    state: watch::Sender<InviteFlowState>,
}

impl InviteFlow {
    pub fn new(
        resolver: Arc<MembershipResolver>,
        session: SessionContext,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let (state, _) = watch::channel(InviteFlowState::Idle);
        Self {
            resolver,
            session,
            identity,
            state,
        }
    }

    pub fn state(&self) -> InviteFlowState {
        self.state.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<InviteFlowState> {
        self.state.subscribe()
    }

    /// Follow an invite reference.
    ///
    /// Sets the pending invite before admission, and relies on
    /// `set_active_conversation` to drop it in the same frame the
    /// conversation opens. On failure the pending invite is cleared
    /// explicitly and the failure lands in the observable error slot.
    pub async fn follow_invite(&self, invite: InviteRef) -> Result<JoinOutcome, JoinError> {
        let identity = self.identity.current_identity();
        let decision =
            AccessGuard::decide(identity.as_ref(), RouteTarget::JoinInvite(invite.clone()));
        if !decision.is_allowed() {
            info!(group = %invite.group_id, "invite needs sign-in, parking it");
            self.session.set_pending_invite(invite.clone());
            self.state
                .send_replace(InviteFlowState::AwaitingSignIn { resume: invite });
            return Err(JoinError::AuthRequired);
        }

        self.session.set_pending_invite(invite.clone());
        self.state.send_replace(InviteFlowState::Joining {
            invite: invite.clone(),
        });

        match self
            .resolver
            .join_group(&invite.group_id, &invite.invite_token, identity.as_ref())
            .await
        {
            Ok(outcome) => {
                self.session.set_active_conversation(invite.group_id.clone());
                self.state.send_replace(InviteFlowState::Entered {
                    conversation: invite.group_id,
                });
                Ok(outcome)
            }
            Err(error) => {
                warn!(group = %invite.group_id, %error, "invite flow failed");
                self.session.clear_pending_invite();
                self.state.send_replace(InviteFlowState::Failed {
                    message: error.to_string(),
                    recovery: recovery_for(&error),
                });
                Err(error)
            }
        }
    }

    /// Re-run a parked invite once sign-in has completed. `None` when
    /// nothing is parked.
    pub async fn resume_after_sign_in(&self) -> Option<Result<JoinOutcome, JoinError>> {
        let resume = match self.state.borrow().clone() {
            InviteFlowState::AwaitingSignIn { resume } => resume,
            _ => return None,
        };
        Some(self.follow_invite(resume).await)
    }
}

fn recovery_for(error: &JoinError) -> RecoveryAction {
    match error {
        JoinError::GroupNotFound | JoinError::InvalidInvite => RecoveryAction::ReturnHome,
        JoinError::JoinFailed(_) => RecoveryAction::Retry,
        JoinError::AuthRequired => RecoveryAction::SignIn,
    }
}
