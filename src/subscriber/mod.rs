//! Live meal list.
//!
//! Mounting opens exactly one subscription on the collection. Every pushed
//! snapshot is decoded into a fresh list that replaces the published one.

use serde::Deserialize;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::errors::AppError;
use crate::models::{Meal, MealRecord};
use crate::store::{
    CollectionPath, CollectionStore, EventReceiver, Snapshot, SubscriptionEvent,
    SubscriptionGuard,
};

/// Result of decoding one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Entities(Vec<Meal>),
    /// Nothing stored at the collection path.
    Empty,
    /// The snapshot did not have the expected shape.
    Malformed(AppError),
}

impl Decoded {
    /// The list to publish; anything but `Entities` publishes an empty list.
    pub fn into_entities(self) -> Vec<Meal> {
        match self {
            Decoded::Entities(meals) => meals,
            Decoded::Empty | Decoded::Malformed(_) => Vec::new(),
        }
    }
}

/// Turn a snapshot into meals, attaching each collection key as the meal id.
pub fn decode_snapshot(snapshot: &Snapshot) -> Decoded {
    let Some(value) = &snapshot.value else {
        return Decoded::Empty;
    };

    let result = match value {
        Value::Object(map) => decode_entries(map.iter().map(|(k, v)| (k.clone(), v))),
        // Sequential numeric keys come back as an array.
        Value::Array(items) => decode_entries(
            items
                .iter()
                .enumerate()
                .filter(|(_, v)| !v.is_null())
                .map(|(i, v)| (i.to_string(), v)),
        ),
        other => Err(AppError::Decode(format!(
            "Expected a keyed collection at {}, found {}",
            snapshot.path,
            type_name(other)
        ))),
    };

    match result {
        Ok(meals) if meals.is_empty() => Decoded::Empty,
        Ok(meals) => Decoded::Entities(meals),
        Err(err) => Decoded::Malformed(err),
    }
}

fn decode_entries<'a>(
    entries: impl Iterator<Item = (String, &'a Value)>,
) -> Result<Vec<Meal>, AppError> {
    entries
        .map(|(key, value)| {
            if !value.is_object() {
                return Err(AppError::Decode(format!(
                    "Record {} is {}, not an object",
                    key,
                    type_name(value)
                )));
            }
            let record = MealRecord::deserialize(value)
                .map_err(|e| AppError::Decode(format!("Record {}: {}", key, e)))?;
            Ok(Meal::new(key, record))
        })
        .collect()
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Decode `event` and publish the outcome. Errors are logged, never raised.
pub fn apply_event(event: SubscriptionEvent, publisher: &watch::Sender<Vec<Meal>>) {
    match event {
        SubscriptionEvent::Snapshot(snapshot) => {
            let decoded = decode_snapshot(&snapshot);
            match &decoded {
                Decoded::Entities(meals) => {
                    tracing::debug!("Snapshot of {} has {} meals", snapshot.path, meals.len())
                }
                Decoded::Empty => tracing::debug!("Snapshot of {} is empty", snapshot.path),
                Decoded::Malformed(err) => {
                    tracing::warn!("Could not decode snapshot of {}: {}", snapshot.path, err)
                }
            }
            publisher.send_replace(decoded.into_entities());
        }
        SubscriptionEvent::Error(err) => {
            tracing::warn!("Subscription error: {}", err);
        }
    }
}

/// Opens the subscription behind a list view.
pub struct CollectionSubscriber;

impl CollectionSubscriber {
    /// Subscribe to `path` and keep the published list current.
    ///
    /// Must be called from within a tokio runtime.
    pub fn mount<S: CollectionStore>(
        store: &S,
        path: &CollectionPath,
    ) -> Result<MountedCollection, AppError> {
        let subscription = store.subscribe(path)?;
        let (events, guard) = subscription.into_parts();
        let (publisher, receiver) = watch::channel(Vec::new());

        let task = tokio::spawn(pump(events, publisher));
        tracing::info!("Mounted list on {}", path);

        Ok(MountedCollection {
            path: path.clone(),
            receiver,
            task,
            _guard: guard,
        })
    }
}

async fn pump(mut events: EventReceiver, publisher: watch::Sender<Vec<Meal>>) {
    while let Some(event) = events.recv().await {
        apply_event(event, &publisher);
    }
    tracing::debug!("Subscription closed by store");
}

/// A mounted list. Dropping it releases the subscription.
pub struct MountedCollection {
    path: CollectionPath,
    receiver: watch::Receiver<Vec<Meal>>,
    task: JoinHandle<()>,
    _guard: SubscriptionGuard,
}

impl MountedCollection {
    pub fn path(&self) -> &CollectionPath {
        &self.path
    }

    /// The latest published list.
    pub fn entities(&self) -> Vec<Meal> {
        self.receiver.borrow().clone()
    }

    /// Wait until a new list is published.
    pub async fn changed(&mut self) -> Result<Vec<Meal>, AppError> {
        self.receiver
            .changed()
            .await
            .map_err(|_| AppError::Subscription("List publisher stopped".to_string()))?;
        Ok(self.receiver.borrow_and_update().clone())
    }

    /// A receiver for views that watch the list on their own.
    pub fn receiver(&self) -> watch::Receiver<Vec<Meal>> {
        self.receiver.clone()
    }
}

impl Drop for MountedCollection {
    fn drop(&mut self) {
        self.task.abort();
        tracing::info!("Unmounted list on {}", self.path);
    }
}
