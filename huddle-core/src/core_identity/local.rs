//! Local in-process identity provider

use super::error::AuthError;
use super::identity::{Credentials, Identity};
use super::provider::IdentityProvider;
use crate::core_model::UserId;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::{watch, RwLock};
use tracing::info;

struct Account {
    password: String,
    identity: Identity,
}

/// Reference identity provider holding accounts in memory.
///
/// Stands in for the external authentication service; it verifies plain
/// credentials and drives the same observable current-identity slot the
/// real provider would. Nothing here persists across restarts.
pub struct LocalIdentityProvider {
    accounts: RwLock<HashMap<String, Account>>,
    current: watch::Sender<Option<Identity>>,
}

impl LocalIdentityProvider {
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self {
            accounts: RwLock::new(HashMap::new()),
            current,
        }
    }

    /// Create an account and return its identity without signing it in.
    pub async fn register(
        &self,
        email: impl Into<String>,
        password: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Result<Identity, AuthError> {
        let email = email.into();
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&email) {
            return Err(AuthError::AccountExists(email));
        }

        let identity = Identity::new(UserId::generate())
            .with_email(email.clone())
            .with_display_name(display_name);
        accounts.insert(
            email,
            Account {
                password: password.into(),
                identity: identity.clone(),
            },
        );
        Ok(identity)
    }
}

impl Default for LocalIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    fn current_identity(&self) -> Option<Identity> {
        self.current.borrow().clone()
    }

    fn watch_identity(&self) -> watch::Receiver<Option<Identity>> {
        self.current.subscribe()
    }

    async fn sign_in(&self, credentials: Credentials) -> Result<Identity, AuthError> {
        let accounts = self.accounts.read().await;
        let account = accounts
            .get(&credentials.email)
            .filter(|account| account.password == credentials.password)
            .ok_or(AuthError::InvalidCredentials)?;

        let identity = account.identity.clone();
        drop(accounts);

        info!(user_id = %identity.user_id, "signed in");
        self.current.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) {
        if let Some(identity) = self.current.send_replace(None) {
            info!(user_id = %identity.user_id, "signed out");
        }
    }
}
