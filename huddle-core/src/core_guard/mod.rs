//! Identity-gated routing
//!
//! A pure predicate over the identity provider's current value, plus a
//! watcher that re-evaluates the decision on every identity change:
//! signing out while a protected view is active yields a fresh `Deny`, not
//! a stale one-time check from initial render.

use crate::core_identity::{Identity, IdentityProvider};
use crate::core_model::{GroupId, InviteRef};
use std::sync::Arc;
use tokio::sync::watch;

/// Addressable views of the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteTarget {
    /// Sign-in view; never gated (it is the redirect target)
    Login,
    /// Group list / landing view
    Home,
    /// An open conversation
    Conversation(GroupId),
    /// A followed invite link
    JoinInvite(InviteRef),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    Allow(RouteTarget),
    Deny { redirect: RouteTarget },
}

impl AuthDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AuthDecision::Allow(_))
    }
}

/// Gates navigation on the presence of an authenticated identity.
pub struct AccessGuard {
    provider: Arc<dyn IdentityProvider>,
}

impl AccessGuard {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self { provider }
    }

    /// The predicate itself: no I/O, no side effects.
    pub fn decide(identity: Option<&Identity>, requested: RouteTarget) -> AuthDecision {
        match (&requested, identity) {
            (RouteTarget::Login, _) => AuthDecision::Allow(requested),
            (_, Some(_)) => AuthDecision::Allow(requested),
            (_, None) => AuthDecision::Deny {
                redirect: RouteTarget::Login,
            },
        }
    }

    /// Decide against the provider's identity at this instant.
    pub fn authorize(&self, requested: RouteTarget) -> AuthDecision {
        Self::decide(self.provider.current_identity().as_ref(), requested)
    }

    /// Bind a route to the identity channel for continuous re-evaluation.
    pub fn guard(&self, requested: RouteTarget) -> RouteWatcher {
        RouteWatcher {
            identity: self.provider.watch_identity(),
            requested,
        }
    }
}

/// A route decision that stays current as identity changes.
pub struct RouteWatcher {
    identity: watch::Receiver<Option<Identity>>,
    requested: RouteTarget,
}

impl RouteWatcher {
    pub fn current(&self) -> AuthDecision {
        AccessGuard::decide(self.identity.borrow().as_ref(), self.requested.clone())
    }

    /// Wait for the next identity change and return the fresh decision.
    /// `None` once the provider is gone.
    pub async fn recheck(&mut self) -> Option<AuthDecision> {
        self.identity.changed().await.ok()?;
        Some(self.current())
    }
}
