use crate::metrics_defs::ATTRIBUTION_CAPTURED;
use crate::params::{AttributionParams, TrackingParam};
use serde_json::{Map, Value};
use shared::counter;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Key of the session entry holding the last captured parameters.
pub const SESSION_KEY: &str = "utm_params";

/// Session-scoped key/value storage, living as long as one browsing session.
pub trait SessionStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&self, key: &str, value: String);
    fn remove_item(&self, key: &str);
}

#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemorySessionStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        let items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.get(key).cloned()
    }

    fn set_item(&self, key: &str, value: String) {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.insert(key.to_string(), value);
    }

    fn remove_item(&self, key: &str) {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.remove(key);
    }
}

/// Reads the stored parameters. Missing or unreadable entries yield an empty
/// set; keys outside the allow-list and non-string values are skipped.
pub fn stored_params(storage: &dyn SessionStorage) -> AttributionParams {
    let Some(raw) = storage.get_item(SESSION_KEY) else {
        return AttributionParams::new();
    };

    let stored: Map<String, Value> = match serde_json::from_str(&raw) {
        Ok(stored) => stored,
        Err(e) => {
            tracing::debug!(error = %e, "ignoring unreadable session attribution");
            return AttributionParams::new();
        }
    };

    TrackingParam::ALL
        .into_iter()
        .filter_map(|param| match stored.get(param.as_str()) {
            Some(Value::String(value)) if !value.is_empty() => Some((param, value.clone())),
            _ => None,
        })
        .collect()
}

/// Replaces the stored parameters wholesale. Empty captures leave the
/// previous entry in place.
pub fn store_params(storage: &dyn SessionStorage, params: &AttributionParams) -> bool {
    if params.is_empty() {
        return false;
    }

    match serde_json::to_string(params) {
        Ok(json) => {
            storage.set_item(SESSION_KEY, json);
            counter!(ATTRIBUTION_CAPTURED, "store" => "session").increment(1);
            true
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to serialize session attribution");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_replaces_wholesale() {
        let storage = MemorySessionStorage::new();
        store_params(
            &storage,
            &AttributionParams::from_query("utm_source=google&utm_medium=cpc"),
        );
        store_params(&storage, &AttributionParams::from_query("fbclid=f1"));

        let params = stored_params(&storage);
        assert_eq!(params.len(), 1);
        assert_eq!(params.get(TrackingParam::Fbclid), Some("f1"));
        assert_eq!(storage.get_item(SESSION_KEY).unwrap(), r#"{"fbclid":"f1"}"#);
    }

    #[test]
    fn test_empty_capture_keeps_previous() {
        let storage = MemorySessionStorage::new();
        store_params(&storage, &AttributionParams::from_query("utm_source=google"));

        assert!(!store_params(&storage, &AttributionParams::new()));
        assert_eq!(
            stored_params(&storage).get(TrackingParam::UtmSource),
            Some("google")
        );
    }

    #[test]
    fn test_unknown_keys_are_skipped() {
        let storage = MemorySessionStorage::new();
        storage.set_item(
            SESSION_KEY,
            r#"{"ref":"x","utm_source":"g","gclid":7,"utm_medium":""}"#.to_string(),
        );

        let params = stored_params(&storage);
        assert_eq!(params.len(), 1);
        assert_eq!(params.get(TrackingParam::UtmSource), Some("g"));
    }

    #[test]
    fn test_unreadable_entry_is_empty() {
        let storage = MemorySessionStorage::new();
        assert!(stored_params(&storage).is_empty());

        storage.set_item(SESSION_KEY, "{not json".to_string());
        assert!(stored_params(&storage).is_empty());

        storage.set_item(SESSION_KEY, r#"{"utm_id":"x"}"#.to_string());
        assert!(stored_params(&storage).is_empty());

        storage.set_item(SESSION_KEY, r#"["utm_source"]"#.to_string());
        assert!(stored_params(&storage).is_empty());

        storage.remove_item(SESSION_KEY);
        assert!(storage.get_item(SESSION_KEY).is_none());
    }
}
