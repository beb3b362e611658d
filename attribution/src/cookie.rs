use crate::record::AttributionRecord;
use chrono::{DateTime, Utc};
use http::header::{COOKIE, HeaderMap, HeaderValue, InvalidHeaderValue};
use serde_json::{Map, Value};
use std::time::Duration;

pub const DEFAULT_COOKIE_NAME: &str = "masterkey_utms";
/// 90 days
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(7_776_000);

#[derive(thiserror::Error, Debug)]
pub enum CookieError {
    #[error("attribution cookie is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("attribution cookie is not a valid header value: {0}")]
    InvalidHeader(#[from] InvalidHeaderValue),
}

/// Attributes applied to the attribution cookie.
///
/// The cookie is intentionally readable from page scripts, so `HttpOnly` is
/// never set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CookiePolicy {
    pub name: String,
    pub max_age: Duration,
    /// Adds `Secure`; enabled in production.
    pub secure: bool,
}

impl Default for CookiePolicy {
    fn default() -> Self {
        CookiePolicy {
            name: DEFAULT_COOKIE_NAME.to_string(),
            max_age: DEFAULT_MAX_AGE,
            secure: false,
        }
    }
}

impl CookiePolicy {
    /// Builds the `Set-Cookie` value carrying `record`.
    pub fn set_cookie(&self, record: &AttributionRecord) -> Result<HeaderValue, CookieError> {
        let json = serde_json::to_string(record)?;
        let value: String = url::form_urlencoded::byte_serialize(json.as_bytes()).collect();

        let mut cookie = format!(
            "{}={}; Path=/; Max-Age={}; SameSite=Lax",
            self.name,
            value,
            self.max_age.as_secs()
        );
        if self.secure {
            cookie.push_str("; Secure");
        }

        Ok(HeaderValue::from_str(&cookie)?)
    }

    /// Returns the raw value of this policy's cookie from the request headers.
    pub fn find<'a>(&self, headers: &'a HeaderMap) -> Option<&'a str> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|h| h.to_str().ok())
            .flat_map(|h| h.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.name)
            .map(|(_, value)| value.trim_matches('"'))
    }
}

/// Decodes a raw cookie value written by [`CookiePolicy::set_cookie`].
///
/// Any JSON object is accepted. Timestamps it lacks are filled with `now`
/// and keys outside the allow-list are dropped.
pub fn decode_record(raw: &str, now: DateTime<Utc>) -> Result<AttributionRecord, CookieError> {
    // The encoder escapes '&', '=' and '+', so the whole value parses as a
    // single form key.
    let decoded = url::form_urlencoded::parse(raw.as_bytes())
        .next()
        .map(|(key, _)| key.into_owned())
        .unwrap_or_default();

    let mut object: Map<String, Value> = serde_json::from_str(&decoded)?;
    for key in ["first_seen", "last_updated"] {
        if !object.contains_key(key) {
            object.insert(key.to_string(), serde_json::to_value(now)?);
        }
    }
    Ok(serde_json::from_value(Value::Object(object))?)
}
