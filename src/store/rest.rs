//! REST adapter for the realtime database.
//!
//! Writes are `PUT`/`DELETE` on `{base}/{path}/{key}.json`. Listening opens
//! `GET {base}/{path}.json` as an event stream whose `put` and `patch`
//! events edit a local copy of the collection; the whole copy is pushed as
//! a snapshot after every edit.
//!
//! The server sends `keep-alive` every 30 seconds. A stream that stays
//! silent longer than the idle timeout counts as a dropped connection.

use std::time::Duration;

use reqwest::{header, Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;

use tokio::time::timeout;

use super::sse::{SseEvent, SseParser};
use super::tree;
use super::{
    CollectionPath, CollectionStore, EventSender, Snapshot, Subscription, SubscriptionEvent,
    SubscriptionGuard,
};
use crate::errors::AppError;

/// Default idle window: twice the server's keep-alive interval.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Body of `put` and `patch` events.
#[derive(Debug, Deserialize)]
struct StreamPayload {
    path: String,
    data: Value,
}

/// Error body returned by the database.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// How one streaming connection ended.
#[derive(Debug)]
enum StreamEnd {
    /// Server closed the body; reopen after the delay.
    Closed,
    /// Listener was cancelled by the server or the receiver went away.
    Finished,
}

/// Realtime database client over HTTP.
#[derive(Debug, Clone)]
pub struct RestStore {
    client: Client,
    base_url: String,
    reconnect_delay: Duration,
    idle_timeout: Duration,
}

impl RestStore {
    pub fn new(base_url: impl Into<String>, reconnect_delay: Duration) -> Self {
        Self::with_client(Client::new(), base_url, reconnect_delay)
    }

    pub fn with_client(
        client: Client,
        base_url: impl Into<String>,
        reconnect_delay: Duration,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            reconnect_delay,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    /// How long a listener waits for any bytes before reconnecting.
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}.json", self.base_url, path)
    }

    async fn check(response: Response) -> Result<Response, AppError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or_else(|_| format!("HTTP {}", status));

        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::PermissionDenied(message),
            _ => AppError::Write(message),
        })
    }
}

impl CollectionStore for RestStore {
    fn subscribe(&self, path: &CollectionPath) -> Result<Subscription, AppError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let listener = Listener {
            client: self.client.clone(),
            url: self.url(&path.to_string()),
            path: path.to_string(),
            reconnect_delay: self.reconnect_delay,
            idle_timeout: self.idle_timeout,
            tx,
        };

        let task = tokio::spawn(listener.run());
        let abort = task.abort_handle();
        let guard = SubscriptionGuard::new(move || abort.abort());

        Ok(Subscription::new(rx, guard))
    }

    async fn write(&self, path: &CollectionPath, key: &str, value: Value) -> Result<(), AppError> {
        let url = self.url(&path.child(key)?);
        tracing::debug!("PUT {}", url);

        let response = self.client.put(&url).json(&value).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn remove(&self, path: &CollectionPath, key: &str) -> Result<(), AppError> {
        let url = self.url(&path.child(key)?);
        tracing::debug!("DELETE {}", url);

        let response = self.client.delete(&url).send().await?;
        Self::check(response).await?;
        Ok(())
    }
}

/// Background task feeding one subscription.
struct Listener {
    client: Client,
    url: String,
    path: String,
    reconnect_delay: Duration,
    idle_timeout: Duration,
    tx: EventSender,
}

impl Listener {
    async fn run(self) {
        let mut local = Value::Null;

        loop {
            match self.stream_once(&mut local).await {
                Ok(StreamEnd::Finished) => return,
                Ok(StreamEnd::Closed) => {
                    tracing::debug!("Event stream for {} closed; reconnecting", self.path);
                    let err =
                        AppError::Subscription(format!("Event stream for {} closed", self.path));
                    if self.tx.send(SubscriptionEvent::Error(err)).is_err() {
                        return;
                    }
                }
                Err(err) => {
                    let terminal = err.is_terminal();
                    if self.tx.send(SubscriptionEvent::Error(err)).is_err() || terminal {
                        return;
                    }
                }
            }

            if self.tx.is_closed() {
                return;
            }
            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    async fn stream_once(&self, local: &mut Value) -> Result<StreamEnd, AppError> {
        let request = self
            .client
            .get(&self.url)
            .header(header::ACCEPT, "text/event-stream")
            .send();
        let response = timeout(self.idle_timeout, request)
            .await
            .map_err(|_| self.idle_error())??;
        let mut response = RestStore::check(response).await.map_err(|err| match err {
            AppError::Write(message) => AppError::Subscription(message),
            other => other,
        })?;

        let mut parser = SseParser::new();
        while let Some(chunk) = timeout(self.idle_timeout, response.chunk())
            .await
            .map_err(|_| self.idle_error())??
        {
            for event in parser.feed(&chunk) {
                if let Some(end) = self.apply(local, event)? {
                    return Ok(end);
                }
            }
        }

        Ok(StreamEnd::Closed)
    }

    fn idle_error(&self) -> AppError {
        tracing::warn!(
            "No data on event stream for {} in {:?}",
            self.path,
            self.idle_timeout
        );
        AppError::Transport(format!(
            "Event stream for {} idle for {:?}",
            self.path, self.idle_timeout
        ))
    }

    /// Apply one event; `Some` ends the connection.
    fn apply(&self, local: &mut Value, event: SseEvent) -> Result<Option<StreamEnd>, AppError> {
        match event.event.as_str() {
            "put" | "patch" => {
                let payload: StreamPayload = serde_json::from_str(&event.data)?;
                let at = tree::segments(&payload.path);
                if event.event == "put" {
                    tree::set_at(local, &at, payload.data);
                } else {
                    tree::merge_at(local, &at, payload.data);
                }

                let snapshot = Snapshot::new(self.path.clone(), local.clone());
                if self.tx.send(SubscriptionEvent::Snapshot(snapshot)).is_err() {
                    return Ok(Some(StreamEnd::Finished));
                }
                Ok(None)
            }
            "keep-alive" => Ok(None),
            "cancel" | "auth_revoked" => {
                let reason = serde_json::from_str::<Value>(&event.data)
                    .ok()
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_else(|| event.event.clone());
                tracing::warn!("Listener on {} cancelled by server: {}", self.path, reason);
                let _ = self
                    .tx
                    .send(SubscriptionEvent::Error(AppError::PermissionDenied(reason)));
                Ok(Some(StreamEnd::Finished))
            }
            other => {
                tracing::debug!("Ignoring event {:?} on {}", other, self.path);
                Ok(None)
            }
        }
    }
}
