use super::{Endpoint, HOUR, Provider, ProviderSettings, UpstreamRequest};
use crate::address::normalize;
use crate::errors::ProxyError;
use crate::query::ProxyQuery;
use std::time::Duration;

/// Zillow property details through RapidAPI.
pub struct ZillowProperty {
    settings: ProviderSettings,
}

impl ZillowProperty {
    pub fn new(settings: ProviderSettings) -> Self {
        ZillowProperty { settings }
    }
}

impl Endpoint for ZillowProperty {
    fn path(&self) -> &'static str {
        "/api/zillow/property"
    }

    fn provider(&self) -> Provider {
        Provider::Zillow
    }

    fn ttl(&self) -> Duration {
        6 * HOUR
    }

    fn cache_key(&self, query: &ProxyQuery) -> Result<String, ProxyError> {
        Ok(format!("{}:{}", self.path(), normalize(query.require_address()?)))
    }

    fn upstream_request(&self, query: &ProxyQuery) -> Result<UpstreamRequest, ProxyError> {
        let address = query.require_address()?;
        let api_key = self.settings.api_key()?;

        let mut url = self.settings.url("/property")?;
        url.query_pairs_mut().append_pair("address", address);

        // RapidAPI routes on the host header value, which must match the
        // subscribed API.
        Ok(UpstreamRequest::get(url)
            .header("X-RapidAPI-Key", api_key)
            .header("X-RapidAPI-Host", self.settings.host()))
    }
}
