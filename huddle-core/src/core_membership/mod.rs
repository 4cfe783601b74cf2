//! Group membership: records, tree layout, and the invite/join protocol

mod group;
pub mod paths;
mod resolver;

pub use group::{ChatIndexEntry, Group, GroupInfo, GroupRole, MembershipRecord};
pub use resolver::{JoinError, JoinOutcome, MembershipError, MembershipResolver, ResolverConfig};
