//! Authenticated principal data

use crate::core_model::UserId;

/// The principal issued by the identity provider after authentication.
///
/// Presence of a value is the sole predicate the access guard evaluates;
/// the optional profile fields are display conveniences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl Identity {
    pub fn new(user_id: UserId) -> Self {
        Identity {
            user_id,
            email: None,
            display_name: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }
}

/// Email/password credentials handed to `sign_in`.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials {
            email: email.into(),
            password: password.into(),
        }
    }
}
