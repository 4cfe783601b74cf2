//! Tree-structured synchronized store interface
//!
//! The chat client treats its backend as a tree of JSON values addressed by
//! slash-separated paths. The engine behind the interface (persistence,
//! network sync) is an external collaborator; the core only relies on three
//! primitives: snapshot reads, atomic multi-path writes, and path-scoped
//! subscriptions. [`MemoryStore`] is the in-process reference implementation
//! backing tests and the demo binary.

mod error;
mod memory;
mod path;
mod update;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use path::StorePath;
pub use update::StoreUpdate;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::watch;

/// Storage seam consumed by the coordination core.
///
/// `atomic_update` is transactional across every path it lists: no reader
/// ever observes a state where only part of the update applied. Guards are
/// value preconditions checked atomically with the write; a failed guard
/// surfaces as [`StoreError::Conflict`] and leaves the tree untouched.
#[async_trait]
pub trait SharedStore: Send + Sync {
    /// Snapshot read of the subtree at `path`. `Ok(None)` for an absent path.
    async fn read(&self, path: &StorePath) -> Result<Option<Value>, StoreError>;

    /// Apply a multi-path update as one indivisible operation.
    async fn atomic_update(&self, update: StoreUpdate) -> Result<(), StoreError>;

    /// Subscribe to the subtree at `path`; the receiver holds the latest
    /// snapshot and is notified whenever any write touches the subtree.
    async fn subscribe(
        &self,
        path: &StorePath,
    ) -> Result<watch::Receiver<Option<Value>>, StoreError>;
}
