//! Identity provider error types

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("Email or password is incorrect")]
    InvalidCredentials,

    #[error("An account already exists for {0}")]
    AccountExists(String),

    #[error("Identity provider unavailable: {0}")]
    ProviderUnavailable(String),
}
