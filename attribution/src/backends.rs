use crate::relay::{AnalyticsBackend, RelayError, TrackedEvent};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use url::Url;

/// Tag-manager style queue: every event is appended as a flat object with an
/// `event` key.
#[derive(Debug, Default)]
pub struct DataLayer {
    entries: Mutex<Vec<Value>>,
}

impl DataLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<Value> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl AnalyticsBackend for DataLayer {
    fn name(&self) -> &'static str {
        "data_layer"
    }

    async fn send(&self, event: &TrackedEvent) -> Result<(), RelayError> {
        let mut entry = Map::new();
        entry.insert("event".to_string(), Value::from(event.name.as_str()));
        entry.extend(event.properties.clone());

        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Value::Object(entry));
        Ok(())
    }
}

/// Writes events to the application log.
#[derive(Debug, Default)]
pub struct LogBackend;

#[async_trait]
impl AnalyticsBackend for LogBackend {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(&self, event: &TrackedEvent) -> Result<(), RelayError> {
        let properties = Value::Object(event.properties.clone());
        tracing::info!(event = %event.name, %properties, "analytics event");
        Ok(())
    }
}

#[derive(Serialize)]
struct CapturePayload<'a> {
    api_key: &'a str,
    event: &'a str,
    properties: &'a Map<String, Value>,
}

/// Posts events as JSON to a product-analytics capture endpoint.
pub struct HttpCollector {
    client: reqwest::Client,
    url: Url,
    api_key: String,
}

impl HttpCollector {
    pub fn new(url: Url, api_key: String, timeout: Duration) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(HttpCollector {
            client,
            url,
            api_key,
        })
    }
}

#[async_trait]
impl AnalyticsBackend for HttpCollector {
    fn name(&self) -> &'static str {
        "http_collector"
    }

    async fn send(&self, event: &TrackedEvent) -> Result<(), RelayError> {
        let payload = CapturePayload {
            api_key: &self.api_key,
            event: &event.name,
            properties: &event.properties,
        };

        let response = self
            .client
            .post(self.url.clone())
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RelayError::Rejected(response.status().as_u16()));
        }
        Ok(())
    }
}
