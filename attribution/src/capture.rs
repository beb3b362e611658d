use crate::params::AttributionParams;
use crate::relay::Relay;
use crate::session::store_params;
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub const ATTRIBUTION_EVENT: &str = "attribution_captured";

/// Re-captures tracking parameters from the browser location when the root of
/// the page first mounts.
///
/// The capture runs once per instance; later navigations are only reported
/// through [`Relay::page_view`].
pub struct SessionCapture {
    relay: Arc<Relay>,
    started: AtomicBool,
}

impl SessionCapture {
    pub fn new(relay: Arc<Relay>) -> Self {
        SessionCapture {
            relay,
            started: AtomicBool::new(false),
        }
    }

    /// Stores the parameters found in `location_query` in session storage,
    /// replacing any earlier entry, and emits one attribution event.
    ///
    /// Returns the captured parameters, or `None` if nothing was captured.
    pub async fn capture_on_load(&self, location_query: &str, path: &str) -> Option<AttributionParams> {
        if self.started.swap(true, Ordering::AcqRel) {
            return None;
        }

        let params = AttributionParams::from_query(location_query);
        if !store_params(self.relay.storage(), &params) {
            return None;
        }

        let mut properties: Map<String, Value> = params.to_json_map();
        properties.insert("path".to_string(), Value::from(path));
        properties.insert(
            "captured_at".to_string(),
            Value::from(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        self.relay.track(ATTRIBUTION_EVENT, Some(properties)).await;

        Some(params)
    }
}
