//! Analytics event relay.
//!
//! Every event is enriched with the attribution parameters found in session
//! storage and handed to each configured backend. Backend failures are logged
//! and counted; they never reach the caller.

use crate::metrics_defs::{RELAY_EVENTS, RELAY_FAILURES};
use crate::session::{SessionStorage, stored_params};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use shared::counter;
use std::sync::Arc;

pub const PAGE_VIEW_EVENT: &str = "page_view";

#[derive(thiserror::Error, Debug)]
pub enum RelayError {
    #[error("analytics request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("analytics backend rejected event with status {0}")]
    Rejected(u16),
    #[error("analytics backend unavailable: {0}")]
    Unavailable(String),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrackedEvent {
    pub name: String,
    /// Attribution parameters, overlaid by the event's own properties, plus
    /// `timestamp`.
    pub properties: Map<String, Value>,
}

/// Destination for tracked events: tag manager, pixel, product analytics.
#[async_trait]
pub trait AnalyticsBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, event: &TrackedEvent) -> Result<(), RelayError>;
}

pub struct Relay {
    storage: Arc<dyn SessionStorage>,
    backends: Vec<Arc<dyn AnalyticsBackend>>,
}

impl Relay {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Relay {
            storage,
            backends: Vec::new(),
        }
    }

    pub fn with_backend(mut self, backend: Arc<dyn AnalyticsBackend>) -> Self {
        self.backends.push(backend);
        self
    }

    pub fn storage(&self) -> &dyn SessionStorage {
        self.storage.as_ref()
    }

    pub fn build_event(
        &self,
        name: &str,
        properties: Option<Map<String, Value>>,
        now: DateTime<Utc>,
    ) -> TrackedEvent {
        let mut merged = stored_params(self.storage.as_ref()).to_json_map();
        if let Some(properties) = properties {
            merged.extend(properties);
        }
        merged.insert(
            "timestamp".to_string(),
            Value::from(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );

        TrackedEvent {
            name: name.to_string(),
            properties: merged,
        }
    }

    /// Emits `name` to every backend and returns the event that was sent.
    pub async fn track(&self, name: &str, properties: Option<Map<String, Value>>) -> TrackedEvent {
        let event = self.build_event(name, properties, Utc::now());

        for backend in &self.backends {
            match backend.send(&event).await {
                Ok(()) => {
                    counter!(RELAY_EVENTS, "backend" => backend.name()).increment(1);
                }
                Err(e) => {
                    tracing::warn!(
                        backend = backend.name(),
                        event = %event.name,
                        error = %e,
                        "failed to relay analytics event"
                    );
                    counter!(RELAY_FAILURES, "backend" => backend.name()).increment(1);
                }
            }
        }

        event
    }

    /// Emitted on every route change.
    pub async fn page_view(&self, path: &str) -> TrackedEvent {
        let mut properties = Map::new();
        properties.insert("path".to_string(), Value::from(path));
        self.track(PAGE_VIEW_EVENT, Some(properties)).await
    }
}
