use crate::cookie::{CookiePolicy, decode_record};
use crate::metrics_defs::{
    ATTRIBUTION_CAPTURED, ATTRIBUTION_COOKIE_FAILED, ATTRIBUTION_COOKIE_INVALID,
};
use crate::params::AttributionParams;
use crate::record::AttributionRecord;
use chrono::{DateTime, Utc};
use http::Uri;
use http::header::{HeaderMap, HeaderValue};
use shared::counter;

const EXCLUDED_PREFIXES: &[&str] = &["/_next/static", "/_next/image"];
const EXCLUDED_PATHS: &[&str] = &["/favicon.ico"];
const API_ROOT: &str = "/api";

/// Captures tracking parameters from inbound page requests into the
/// attribution cookie.
#[derive(Clone, Debug)]
pub struct Interceptor {
    policy: CookiePolicy,
}

impl Interceptor {
    pub fn new(policy: CookiePolicy) -> Self {
        Interceptor { policy }
    }

    pub fn policy(&self) -> &CookiePolicy {
        &self.policy
    }

    /// API routes, build assets, image optimization and the favicon are never
    /// captured.
    pub fn applies_to(path: &str) -> bool {
        let is_api = path == API_ROOT
            || path
                .strip_prefix(API_ROOT)
                .is_some_and(|rest| rest.starts_with('/'));

        !is_api
            && !EXCLUDED_PREFIXES.iter().any(|p| path.starts_with(p))
            && !EXCLUDED_PATHS.contains(&path)
    }

    /// Returns the `Set-Cookie` value to attach to the response, if any.
    ///
    /// `None` means the response must go out unchanged: the path is excluded,
    /// no tracking parameter was present, or the cookie could not be built.
    /// A malformed existing cookie is treated as absent.
    pub fn intercept(
        &self,
        uri: &Uri,
        headers: &HeaderMap,
        now: DateTime<Utc>,
    ) -> Option<HeaderValue> {
        if !Self::applies_to(uri.path()) {
            return None;
        }

        let captured = AttributionParams::from_query(uri.query().unwrap_or_default());
        if captured.is_empty() {
            return None;
        }
        counter!(ATTRIBUTION_CAPTURED, "store" => "cookie").increment(1);

        let prior = self
            .policy
            .find(headers)
            .and_then(|raw| match decode_record(raw, now) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::debug!(error = %e, "discarding unreadable attribution cookie");
                    counter!(ATTRIBUTION_COOKIE_INVALID).increment(1);
                    None
                }
            });

        let record = AttributionRecord::merge(prior, &captured, now);

        match self.policy.set_cookie(&record) {
            Ok(value) => {
                tracing::debug!(
                    path = %uri.path(),
                    params = captured.len(),
                    "captured attribution parameters"
                );
                Some(value)
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to write attribution cookie");
                counter!(ATTRIBUTION_COOKIE_FAILED).increment(1);
                None
            }
        }
    }
}
