//! In-memory reference store
//!
//! Backs tests and the demo binary. All updates go through a single write
//! lock, which is what makes the multi-path write indivisible here; a real
//! backend provides the same contract over the network.

use super::{SharedStore, StoreError, StorePath, StoreUpdate};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{watch, RwLock};
use tracing::debug;

pub struct MemoryStore {
    inner: RwLock<Inner>,
    fail_next_write: AtomicBool,
}

struct Inner {
    tree: Value,
    watchers: HashMap<StorePath, watch::Sender<Option<Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                tree: Value::Object(Map::new()),
                watchers: HashMap::new(),
            }),
            fail_next_write: AtomicBool::new(false),
        }
    }

    /// Make the next `atomic_update` fail with `WriteRejected`, leaving the
    /// tree untouched. Test hook for exercising transient-failure paths.
    pub fn inject_write_failure(&self) {
        self.fail_next_write.store(true, Ordering::SeqCst);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SharedStore for MemoryStore {
    async fn read(&self, path: &StorePath) -> Result<Option<Value>, StoreError> {
        let inner = self.inner.read().await;
        Ok(node_get(&inner.tree, path).cloned())
    }

    async fn atomic_update(&self, update: StoreUpdate) -> Result<(), StoreError> {
        if self.fail_next_write.swap(false, Ordering::SeqCst) {
            return Err(StoreError::WriteRejected(
                "injected write failure".to_string(),
            ));
        }
        if update.is_empty() {
            return Ok(());
        }

        let mut inner = self.inner.write().await;

        // Guards are checked before any write lands, so a conflict leaves
        // the tree exactly as it was.
        for (path, expected) in update.guards() {
            let current = node_get(&inner.tree, path);
            let holds = match expected {
                Some(value) => current == Some(value),
                None => current.is_none(),
            };
            if !holds {
                debug!(path = %path, "guarded write conflicted");
                return Err(StoreError::Conflict { path: path.clone() });
            }
        }

        for (path, value) in update.writes() {
            match value {
                Some(value) => node_set(&mut inner.tree, path, value.clone()),
                None => node_remove(&mut inner.tree, path),
            }
        }

        let Inner { tree, watchers } = &mut *inner;
        for (path, sender) in watchers.iter() {
            let snapshot = node_get(tree, path).cloned();
            sender.send_if_modified(|current| {
                if *current == snapshot {
                    false
                } else {
                    *current = snapshot.clone();
                    true
                }
            });
        }

        Ok(())
    }

    async fn subscribe(
        &self,
        path: &StorePath,
    ) -> Result<watch::Receiver<Option<Value>>, StoreError> {
        let mut inner = self.inner.write().await;
        let Inner { tree, watchers } = &mut *inner;
        let snapshot = node_get(tree, path).cloned();
        let sender = watchers
            .entry(path.clone())
            .or_insert_with(|| watch::channel(snapshot).0);
        Ok(sender.subscribe())
    }
}

fn node_get<'a>(tree: &'a Value, path: &StorePath) -> Option<&'a Value> {
    let mut node = tree;
    for segment in path.segments() {
        node = node.as_object()?.get(segment)?;
    }
    Some(node)
}

fn node_set(tree: &mut Value, path: &StorePath, value: Value) {
    fn set_at(node: &mut Value, segments: &[&str], value: Value) {
        match segments.split_first() {
            None => *node = value,
            Some((head, rest)) => {
                if !node.is_object() {
                    *node = Value::Object(Map::new());
                }
                if let Some(map) = node.as_object_mut() {
                    let child = map.entry(head.to_string()).or_insert(Value::Null);
                    set_at(child, rest, value);
                }
            }
        }
    }

    let segments: Vec<&str> = path.segments().collect();
    set_at(tree, &segments, value);
}

fn node_remove(tree: &mut Value, path: &StorePath) {
    // Returns whether the parent should prune this node.
    fn remove_at(node: &mut Value, segments: &[&str]) -> bool {
        match segments.split_first() {
            None => true,
            Some((head, rest)) => match node.as_object_mut() {
                Some(map) => {
                    let prune_child = match map.get_mut(*head) {
                        Some(child) => remove_at(child, rest),
                        None => false,
                    };
                    if prune_child {
                        map.remove(*head);
                    }
                    map.is_empty()
                }
                None => false,
            },
        }
    }

    let segments: Vec<&str> = path.segments().collect();
    if segments.is_empty() {
        *tree = Value::Object(Map::new());
        return;
    }
    remove_at(tree, &segments);
}
