//! In-process collection store.
//!
//! Behaves like the realtime database from a listener's point of view: the
//! current state is pushed on subscribe and after every write or remove.
//! All mutations are serialized under one lock.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tokio::sync::mpsc;

use super::tree;
use super::{
    CollectionPath, CollectionStore, EventSender, Snapshot, Subscription, SubscriptionEvent,
    SubscriptionGuard,
};
use crate::errors::AppError;

/// A mutation accepted by the store, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Write { path: String, value: Value },
    Remove { path: String },
}

struct Listener {
    id: u64,
    path: Vec<String>,
    tx: EventSender,
}

#[derive(Default)]
struct Inner {
    root: Value,
    listeners: Vec<Listener>,
    next_listener_id: u64,
    journal: Vec<Operation>,
    write_failure: Option<String>,
}

impl Inner {
    fn snapshot_for(&self, path: &[String]) -> Snapshot {
        let value = tree::get_at(&self.root, path).cloned().unwrap_or(Value::Null);
        Snapshot::new(path.join("/"), value)
    }

    /// Push fresh snapshots to listeners whose path overlaps `changed`.
    fn notify(&mut self, changed: &[String]) {
        let mut closed = Vec::new();
        for listener in &self.listeners {
            if !overlaps(&listener.path, changed) {
                continue;
            }
            let snapshot = self.snapshot_for(&listener.path);
            if listener.tx.send(SubscriptionEvent::Snapshot(snapshot)).is_err() {
                closed.push(listener.id);
            }
        }
        self.listeners.retain(|l| !closed.contains(&l.id));
    }
}

fn overlaps(a: &[String], b: &[String]) -> bool {
    a.iter().zip(b.iter()).all(|(x, y)| x == y)
}

/// Shared in-memory store. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `value` at the root.
    pub fn with_root(value: Value) -> Self {
        let store = Self::new();
        let mut root = Value::Null;
        tree::set_at::<&str>(&mut root, &[], value);
        store.lock().root = root;
        store
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current value at a path, without subscribing.
    pub fn get(&self, path: &str) -> Option<Value> {
        let inner = self.lock();
        tree::get_at(&inner.root, &tree::segments(path)).cloned()
    }

    /// Replace the stored tree as another client would, notifying listeners.
    pub fn set_external(&self, path: &str, value: Value) {
        let segments: Vec<String> = tree::segments(path).into_iter().map(String::from).collect();
        let mut inner = self.lock();
        tree::set_at(&mut inner.root, &segments, value);
        inner.notify(&segments);
    }

    /// Every accepted write and remove so far.
    pub fn journal(&self) -> Vec<Operation> {
        self.lock().journal.clone()
    }

    /// Number of live listeners.
    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    /// Reject subsequent writes with `message`; `None` accepts them again.
    pub fn fail_writes(&self, message: Option<&str>) {
        self.lock().write_failure = message.map(str::to_string);
    }

    /// Push an error to every listener, as a dropped connection would.
    pub fn broadcast_error(&self, error: AppError) {
        let inner = self.lock();
        for listener in &inner.listeners {
            let _ = listener.tx.send(SubscriptionEvent::Error(error.clone()));
        }
    }

    fn child_segments(path: &CollectionPath, key: &str) -> Result<Vec<String>, AppError> {
        let child = path.child(key)?;
        Ok(tree::segments(&child).into_iter().map(String::from).collect())
    }
}

impl CollectionStore for MemoryStore {
    fn subscribe(&self, path: &CollectionPath) -> Result<Subscription, AppError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.lock();

        let id = inner.next_listener_id;
        inner.next_listener_id += 1;

        let listener_path = path.segments().to_vec();
        let initial = inner.snapshot_for(&listener_path);
        let _ = tx.send(SubscriptionEvent::Snapshot(initial));

        inner.listeners.push(Listener {
            id,
            path: listener_path,
            tx,
        });
        tracing::debug!("Listener {} attached to {}", id, path);

        let shared = self.inner.clone();
        let guard = SubscriptionGuard::new(move || {
            let mut inner = shared.lock().unwrap_or_else(PoisonError::into_inner);
            inner.listeners.retain(|l| l.id != id);
            tracing::debug!("Listener {} released", id);
        });

        Ok(Subscription::new(rx, guard))
    }

    async fn write(&self, path: &CollectionPath, key: &str, value: Value) -> Result<(), AppError> {
        let segments = Self::child_segments(path, key)?;
        let mut inner = self.lock();

        if let Some(message) = &inner.write_failure {
            return Err(AppError::Write(message.clone()));
        }

        inner.journal.push(Operation::Write {
            path: segments.join("/"),
            value: value.clone(),
        });
        tree::set_at(&mut inner.root, &segments, value);
        inner.notify(&segments);
        Ok(())
    }

    async fn remove(&self, path: &CollectionPath, key: &str) -> Result<(), AppError> {
        let segments = Self::child_segments(path, key)?;
        let mut inner = self.lock();

        if let Some(message) = &inner.write_failure {
            return Err(AppError::Write(message.clone()));
        }

        inner.journal.push(Operation::Remove {
            path: segments.join("/"),
        });
        tree::set_at(&mut inner.root, &segments, Value::Null);
        inner.notify(&segments);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meals() -> CollectionPath {
        CollectionPath::parse("meals").unwrap()
    }

    #[tokio::test]
    async fn test_subscribe_pushes_current_state() {
        let store = MemoryStore::with_root(json!({ "meals": { "a": { "title": "Tacos" } } }));
        let mut sub = store.subscribe(&meals()).unwrap();

        match sub.next().await {
            Some(SubscriptionEvent::Snapshot(snapshot)) => {
                assert_eq!(snapshot.path, "meals");
                assert_eq!(snapshot.value, Some(json!({ "a": { "title": "Tacos" } })));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_write_and_remove_push_snapshots() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe(&meals()).unwrap();
        assert!(matches!(
            sub.next().await,
            Some(SubscriptionEvent::Snapshot(Snapshot { value: None, .. }))
        ));

        store
            .write(&meals(), "a", json!({ "title": "Soup" }))
            .await
            .unwrap();
        match sub.next().await {
            Some(SubscriptionEvent::Snapshot(snapshot)) => {
                assert_eq!(snapshot.value, Some(json!({ "a": { "title": "Soup" } })));
            }
            other => panic!("unexpected event: {:?}", other),
        }

        store.remove(&meals(), "a").await.unwrap();
        assert!(matches!(
            sub.next().await,
            Some(SubscriptionEvent::Snapshot(Snapshot { value: None, .. }))
        ));

        assert_eq!(
            store.journal(),
            vec![
                Operation::Write {
                    path: "meals/a".to_string(),
                    value: json!({ "title": "Soup" }),
                },
                Operation::Remove {
                    path: "meals/a".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_write_replaces_whole_value() {
        let store = MemoryStore::new();
        store
            .write(&meals(), "a", json!({ "title": "Soup", "cost": "4" }))
            .await
            .unwrap();
        store
            .write(&meals(), "a", json!({ "title": "Stew" }))
            .await
            .unwrap();
        assert_eq!(store.get("meals/a"), Some(json!({ "title": "Stew" })));
    }

    #[tokio::test]
    async fn test_unrelated_paths_do_not_notify() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe(&meals()).unwrap();
        let _ = sub.next().await;

        let drinks = CollectionPath::parse("drinks").unwrap();
        store
            .write(&drinks, "a", json!({ "title": "Tea" }))
            .await
            .unwrap();

        let (mut events, _guard) = sub.into_parts();
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_failed_write_leaves_state_untouched() {
        let store = MemoryStore::new();
        store.fail_writes(Some("Permission denied"));

        let err = store
            .write(&meals(), "a", json!({ "title": "Soup" }))
            .await
            .unwrap_err();
        assert_eq!(err, AppError::Write("Permission denied".to_string()));
        assert!(store.journal().is_empty());
        assert_eq!(store.get("meals"), None);
    }

    #[tokio::test]
    async fn test_invalid_key_is_rejected() {
        let store = MemoryStore::new();
        let err = store
            .write(&meals(), "a.b", json!({ "title": "Soup" }))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_dropping_guard_releases_listener() {
        let store = MemoryStore::new();
        let sub = store.subscribe(&meals()).unwrap();
        assert_eq!(store.listener_count(), 1);
        drop(sub);
        assert_eq!(store.listener_count(), 0);
    }
}
