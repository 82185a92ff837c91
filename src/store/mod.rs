//! Remote collection store contract.
//!
//! The realtime database is the source of truth for all meal data. This
//! module defines what the list and form need from it and ships two
//! adapters: an in-process [`MemoryStore`] and a [`RestStore`] that speaks
//! the database's REST and event-stream protocol.

mod memory;
mod rest;
mod sse;
mod tree;

pub use memory::*;
pub use rest::*;

use std::fmt;
use std::future::Future;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::errors::AppError;

/// Characters the database refuses inside a key.
const FORBIDDEN_KEY_CHARS: [char; 6] = ['.', '$', '#', '[', ']', '/'];

/// Validated slash-separated location of a collection, e.g. `meals`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath {
    segments: Vec<String>,
}

impl CollectionPath {
    /// Parse a path such as `meals/` or `/menus/lunch`.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let segments = raw
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| -> Result<String, AppError> {
                validate_key(s)?;
                Ok(s.to_string())
            })
            .collect::<Result<Vec<_>, AppError>>()?;

        if segments.is_empty() {
            return Err(AppError::Validation(
                "Collection path must not be empty".to_string(),
            ));
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Path of one entity inside this collection.
    pub fn child(&self, key: &str) -> Result<String, AppError> {
        validate_key(key)?;
        Ok(format!("{}/{}", self, key))
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

/// Reject keys the database would refuse before any request is made.
pub fn validate_key(key: &str) -> Result<(), AppError> {
    if key.is_empty() {
        return Err(AppError::Validation("Key must not be empty".to_string()));
    }
    if key
        .chars()
        .any(|c| FORBIDDEN_KEY_CHARS.contains(&c) || c.is_ascii_control())
    {
        return Err(AppError::Validation(format!(
            "Key {:?} contains a forbidden character",
            key
        )));
    }
    Ok(())
}

/// Point-in-time contents of a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub path: String,
    /// `None` when nothing is stored at the path.
    pub value: Option<Value>,
}

impl Snapshot {
    pub fn new(path: impl Into<String>, value: Value) -> Self {
        let value = match value {
            Value::Null => None,
            other => Some(other),
        };
        Self {
            path: path.into(),
            value,
        }
    }

    pub fn exists(&self) -> bool {
        self.value.is_some()
    }
}

/// Notification delivered to a live listener.
#[derive(Debug, Clone)]
pub enum SubscriptionEvent {
    Snapshot(Snapshot),
    Error(AppError),
}

pub type EventSender = mpsc::UnboundedSender<SubscriptionEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<SubscriptionEvent>;

/// Releases a listener when dropped.
pub struct SubscriptionGuard {
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl SubscriptionGuard {
    pub fn new(release: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for SubscriptionGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionGuard")
            .field("active", &self.release.is_some())
            .finish()
    }
}

/// A live listener on one collection path.
#[derive(Debug)]
pub struct Subscription {
    events: EventReceiver,
    guard: SubscriptionGuard,
}

impl Subscription {
    pub fn new(events: EventReceiver, guard: SubscriptionGuard) -> Self {
        Self { events, guard }
    }

    /// Wait for the next snapshot or error; `None` once the store hung up.
    pub async fn next(&mut self) -> Option<SubscriptionEvent> {
        self.events.recv().await
    }

    /// Split so the events can be consumed elsewhere while the owner keeps the guard.
    pub fn into_parts(self) -> (EventReceiver, SubscriptionGuard) {
        (self.events, self.guard)
    }
}

/// Operations the list and the form need from the remote collection.
pub trait CollectionStore: Send + Sync + 'static {
    /// Register a live listener. The first snapshot carries the current state.
    fn subscribe(&self, path: &CollectionPath) -> Result<Subscription, AppError>;

    /// Create or replace the whole value at `path/key`.
    fn write(
        &self,
        path: &CollectionPath,
        key: &str,
        value: Value,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Delete the value at `path/key`.
    fn remove(
        &self,
        path: &CollectionPath,
        key: &str,
    ) -> impl Future<Output = Result<(), AppError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_collection_path_parse() {
        let path = CollectionPath::parse("meals/").unwrap();
        assert_eq!(path.to_string(), "meals");

        let nested = CollectionPath::parse("/menus//lunch").unwrap();
        assert_eq!(nested.segments(), ["menus", "lunch"]);

        assert!(CollectionPath::parse("").is_err());
        assert!(CollectionPath::parse("meals.v2").is_err());
    }

    #[test]
    fn test_child_validates_key() {
        let path = CollectionPath::parse("meals").unwrap();
        assert_eq!(path.child("abc").unwrap(), "meals/abc");
        assert!(path.child("").is_err());
        assert!(path.child("2024-01-01T10:00:00.123Z").is_err());
        assert!(path.child("a/b").is_err());
        assert!(path.child("2024-01-01T10:00:00_123Z").is_ok());
    }

    #[test]
    fn test_snapshot_null_is_absent() {
        assert!(!Snapshot::new("meals", Value::Null).exists());
        assert!(Snapshot::new("meals", json!({ "a": {} })).exists());
    }

    #[test]
    fn test_guard_releases_once_on_drop() {
        let released = Arc::new(AtomicBool::new(false));
        let flag = released.clone();
        let guard = SubscriptionGuard::new(move || flag.store(true, Ordering::SeqCst));
        assert!(!released.load(Ordering::SeqCst));
        drop(guard);
        assert!(released.load(Ordering::SeqCst));
    }
}
