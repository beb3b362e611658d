use super::{Endpoint, HOUR, Provider, ProviderSettings, UpstreamRequest};
use crate::errors::ProxyError;
use crate::query::ProxyQuery;
use std::time::Duration;

const RESULTS_PER_PAGE: &str = "12";

/// Active MLS listings in a zipcode, from Repliers.
pub struct Listings {
    settings: ProviderSettings,
}

impl Listings {
    pub fn new(settings: ProviderSettings) -> Self {
        Listings { settings }
    }
}

impl Endpoint for Listings {
    fn path(&self) -> &'static str {
        "/api/listings"
    }

    fn provider(&self) -> Provider {
        Provider::Repliers
    }

    fn ttl(&self) -> Duration {
        HOUR
    }

    fn cache_key(&self, query: &ProxyQuery) -> Result<String, ProxyError> {
        Ok(format!("{}:{}", self.path(), query.resolve_zipcode()?))
    }

    fn upstream_request(&self, query: &ProxyQuery) -> Result<UpstreamRequest, ProxyError> {
        let zipcode = query.resolve_zipcode()?;
        let api_key = self.settings.api_key()?;

        let mut url = self.settings.url("/listings")?;
        url.query_pairs_mut()
            .append_pair("zip", &zipcode)
            .append_pair("status", "A")
            .append_pair("resultsPerPage", RESULTS_PER_PAGE);

        Ok(UpstreamRequest::get(url).header("REPLIERS-API-KEY", api_key))
    }
}
