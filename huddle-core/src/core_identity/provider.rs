//! Identity provider trait

use super::error::AuthError;
use super::identity::{Credentials, Identity};
use async_trait::async_trait;
use tokio::sync::watch;

/// Observable authentication state consumed by the core.
///
/// The current identity is a single-value slot with change notification;
/// components that need re-evaluation on sign-in/sign-out hold a watch
/// receiver rather than polling.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The identity at this instant, if any.
    fn current_identity(&self) -> Option<Identity>;

    /// Subscribe to identity changes; the receiver holds the latest value.
    fn watch_identity(&self) -> watch::Receiver<Option<Identity>>;

    /// Authenticate and make the resulting identity current.
    async fn sign_in(&self, credentials: Credentials) -> Result<Identity, AuthError>;

    /// Clear the current identity.
    async fn sign_out(&self);
}
