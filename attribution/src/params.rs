//! Recognized campaign-tracking query parameters.
//!
//! A single allow-list is shared by the server-side interceptor and the
//! client-side re-capture so both stores see the same keys.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingParam {
    UtmSource,
    UtmMedium,
    UtmCampaign,
    UtmTerm,
    UtmContent,
    /// Google Ads click id
    Gclid,
    /// Meta click id
    Fbclid,
    /// Microsoft Ads click id
    Msclkid,
    /// TikTok click id
    Ttclid,
    /// LinkedIn first-party ad tracking id
    LiFatId,
}

impl TrackingParam {
    pub const ALL: [TrackingParam; 10] = [
        TrackingParam::UtmSource,
        TrackingParam::UtmMedium,
        TrackingParam::UtmCampaign,
        TrackingParam::UtmTerm,
        TrackingParam::UtmContent,
        TrackingParam::Gclid,
        TrackingParam::Fbclid,
        TrackingParam::Msclkid,
        TrackingParam::Ttclid,
        TrackingParam::LiFatId,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            TrackingParam::UtmSource => "utm_source",
            TrackingParam::UtmMedium => "utm_medium",
            TrackingParam::UtmCampaign => "utm_campaign",
            TrackingParam::UtmTerm => "utm_term",
            TrackingParam::UtmContent => "utm_content",
            TrackingParam::Gclid => "gclid",
            TrackingParam::Fbclid => "fbclid",
            TrackingParam::Msclkid => "msclkid",
            TrackingParam::Ttclid => "ttclid",
            TrackingParam::LiFatId => "li_fat_id",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == name)
    }

    /// Ad-network click identifiers, as opposed to `utm_*` tags.
    pub const fn is_click_id(&self) -> bool {
        matches!(
            self,
            TrackingParam::Gclid
                | TrackingParam::Fbclid
                | TrackingParam::Msclkid
                | TrackingParam::Ttclid
                | TrackingParam::LiFatId
        )
    }
}

impl fmt::Display for TrackingParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracking parameters observed in one capture, in allow-list order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributionParams(IndexMap<TrackingParam, String>);

impl AttributionParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extracts allow-listed parameters from a raw (undecoded) query string.
    ///
    /// Keys outside the allow-list and empty values are ignored. For a
    /// repeated key the last occurrence wins.
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);

        let mut seen: HashMap<TrackingParam, String> = HashMap::new();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let Some(param) = TrackingParam::from_name(&key) else {
                continue;
            };
            if value.is_empty() {
                continue;
            }
            seen.insert(param, value.into_owned());
        }

        let params = TrackingParam::ALL
            .into_iter()
            .filter_map(|p| seen.remove(&p).map(|v| (p, v)))
            .collect();
        Self(params)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, param: TrackingParam) -> Option<&str> {
        self.0.get(&param).map(String::as_str)
    }

    pub fn insert(&mut self, param: TrackingParam, value: impl Into<String>) {
        self.0.insert(param, value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (TrackingParam, &str)> {
        self.0.iter().map(|(p, v)| (*p, v.as_str()))
    }

    /// Flattens into a JSON object keyed by parameter name.
    pub fn to_json_map(&self) -> serde_json::Map<String, serde_json::Value> {
        self.iter()
            .map(|(p, v)| (p.as_str().to_string(), serde_json::Value::from(v)))
            .collect()
    }
}

impl FromIterator<(TrackingParam, String)> for AttributionParams {
    fn from_iter<I: IntoIterator<Item = (TrackingParam, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
