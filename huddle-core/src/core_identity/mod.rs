//! Authentication identity interface
//!
//! The credential store, token issuance, and refresh machinery live in an
//! external provider; the core consumes only an observable "current user"
//! slot and a sign-in/sign-out surface. [`LocalIdentityProvider`] is the
//! in-process reference implementation used by tests and the demo binary.

mod error;
mod identity;
mod local;
mod provider;

pub use error::AuthError;
pub use identity::{Credentials, Identity};
pub use local::LocalIdentityProvider;
pub use provider::IdentityProvider;
