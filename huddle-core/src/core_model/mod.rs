//! Shared domain types used across the coordination core

mod types;

pub use types::{GroupId, InviteRef, MessageId, Timestamp, UserId};
