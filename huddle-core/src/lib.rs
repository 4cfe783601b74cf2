//! Huddle core: coordination logic for a multi-user group-chat client.
//!
//! The heavy lifting lives in three places: [`core_membership`] validates
//! invite links and performs the atomic group-join transaction against the
//! shared store, [`core_session`] tracks the active conversation and
//! invalidates transient invite state on navigation, and [`core_guard`]
//! gates protected views on the presence of an authenticated identity.
//! [`core_flow`] wires the three together for the invite-following path.
//!
//! The identity provider and the synchronized store are external
//! collaborators, consumed through the traits in [`core_identity`] and
//! [`core_store`]; in-process reference implementations of both keep the
//! core executable and testable without a backend.

pub mod config;
pub mod core_flow;
pub mod core_guard;
pub mod core_identity;
pub mod core_membership;
pub mod core_message;
pub mod core_model;
pub mod core_session;
pub mod core_store;
pub mod logging;

pub use config::Config;
pub use core_flow::{InviteFlow, InviteFlowState, RecoveryAction};
pub use core_guard::{AccessGuard, AuthDecision, RouteTarget};
pub use core_identity::{Credentials, Identity, IdentityProvider, LocalIdentityProvider};
pub use core_membership::{JoinError, JoinOutcome, MembershipResolver};
pub use core_model::{GroupId, InviteRef, UserId};
pub use core_session::{SessionContext, SessionState};
pub use core_store::{MemoryStore, SharedStore};
pub use logging::{init_logging, init_logging_with_config, LogConfig, LogLevel};
