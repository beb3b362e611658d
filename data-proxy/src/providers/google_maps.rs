use super::{Endpoint, HOUR, Provider, ProviderSettings, UpstreamRequest};
use crate::address::normalize;
use crate::errors::ProxyError;
use crate::query::ProxyQuery;
use std::time::Duration;

const IMAGE_SIZE: &str = "640x400";

/// Street-level photo of an address. The upstream body is a JPEG.
pub struct StreetView {
    settings: ProviderSettings,
}

impl StreetView {
    pub fn new(settings: ProviderSettings) -> Self {
        StreetView { settings }
    }
}

impl Endpoint for StreetView {
    fn path(&self) -> &'static str {
        "/api/street-view"
    }

    fn provider(&self) -> Provider {
        Provider::GoogleMaps
    }

    fn ttl(&self) -> Duration {
        7 * 24 * HOUR
    }

    fn cache_key(&self, query: &ProxyQuery) -> Result<String, ProxyError> {
        Ok(format!("{}:{}", self.path(), normalize(query.require_address()?)))
    }

    fn upstream_request(&self, query: &ProxyQuery) -> Result<UpstreamRequest, ProxyError> {
        let address = query.require_address()?;
        let api_key = self.settings.api_key()?;

        // Without return_error_code the API answers 200 with a placeholder
        // image when it has no imagery for the location.
        let mut url = self.settings.url("/maps/api/streetview")?;
        url.query_pairs_mut()
            .append_pair("size", IMAGE_SIZE)
            .append_pair("location", address)
            .append_pair("return_error_code", "true")
            .append_pair("key", api_key);

        Ok(UpstreamRequest::get(url))
    }
}
