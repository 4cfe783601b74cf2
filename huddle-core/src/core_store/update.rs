//! Multi-path atomic update description

use super::path::StorePath;
use serde_json::Value;

/// A batch of writes applied as one indivisible operation, optionally
/// guarded by value preconditions.
///
/// A write of `None` (or JSON `null`) removes the subtree at that path. A
/// guard pins the snapshot a path must still hold when the write lands;
/// `None` means "path absent". Guards are what turn a read-modify-write
/// sequence into an exact transition instead of a lost-update race.
#[derive(Debug, Clone, Default)]
pub struct StoreUpdate {
    writes: Vec<(StorePath, Option<Value>)>,
    guards: Vec<(StorePath, Option<Value>)>,
}

impl StoreUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `value` at `path`.
    pub fn set(mut self, path: StorePath, value: Value) -> Self {
        if value.is_null() {
            self.writes.push((path, None));
        } else {
            self.writes.push((path, Some(value)));
        }
        self
    }

    /// Remove the subtree at `path`.
    pub fn remove(mut self, path: StorePath) -> Self {
        self.writes.push((path, None));
        self
    }

    /// Require the snapshot at `path` to equal `expected` when the update is
    /// applied; `None` requires the path to be absent.
    pub fn guard(mut self, path: StorePath, expected: Option<Value>) -> Self {
        self.guards.push((path, expected));
        self
    }

    pub fn writes(&self) -> &[(StorePath, Option<Value>)] {
        &self.writes
    }

    pub fn guards(&self) -> &[(StorePath, Option<Value>)] {
        &self.guards
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_write_is_removal() {
        let update = StoreUpdate::new()
            .set(StorePath::new("a/b"), Value::Null)
            .remove(StorePath::new("a/c"));

        assert_eq!(update.writes().len(), 2);
        assert!(update.writes().iter().all(|(_, v)| v.is_none()));
    }

    #[test]
    fn test_guards_recorded() {
        let update = StoreUpdate::new()
            .set(StorePath::new("counter"), json!(3))
            .guard(StorePath::new("counter"), Some(json!(2)));

        assert_eq!(update.guards().len(), 1);
        assert!(!update.is_empty());
    }
}
