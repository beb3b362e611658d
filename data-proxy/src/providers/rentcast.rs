use super::{Endpoint, HOUR, Provider, ProviderSettings, UpstreamRequest};
use crate::address::normalize;
use crate::errors::ProxyError;
use crate::query::ProxyQuery;
use std::sync::Arc;
use std::time::Duration;

const API_KEY_HEADER: &str = "X-Api-Key";
const MARKET_HISTORY_MONTHS: &str = "12";

/// Rentcast lookups keyed by a full street address.
pub struct AddressLookup {
    path: &'static str,
    upstream_path: &'static str,
    settings: Arc<ProviderSettings>,
}

impl AddressLookup {
    /// Automated valuation of the property.
    pub fn valuation(settings: Arc<ProviderSettings>) -> Self {
        AddressLookup {
            path: "/api/property-valuation",
            upstream_path: "/v1/avm/value",
            settings,
        }
    }

    /// Long-term rent estimate.
    pub fn rent_estimate(settings: Arc<ProviderSettings>) -> Self {
        AddressLookup {
            path: "/api/rent-estimate",
            upstream_path: "/v1/avm/rent/long-term",
            settings,
        }
    }

    /// Public property records (beds, baths, tax history, ...).
    pub fn property_records(settings: Arc<ProviderSettings>) -> Self {
        AddressLookup {
            path: "/api/property-records",
            upstream_path: "/v1/properties",
            settings,
        }
    }
}

impl Endpoint for AddressLookup {
    fn path(&self) -> &'static str {
        self.path
    }

    fn provider(&self) -> Provider {
        Provider::Rentcast
    }

    fn ttl(&self) -> Duration {
        24 * HOUR
    }

    fn cache_key(&self, query: &ProxyQuery) -> Result<String, ProxyError> {
        Ok(format!("{}:{}", self.path, normalize(query.require_address()?)))
    }

    fn upstream_request(&self, query: &ProxyQuery) -> Result<UpstreamRequest, ProxyError> {
        let address = query.require_address()?;
        let api_key = self.settings.api_key()?;

        let mut url = self.settings.url(self.upstream_path)?;
        url.query_pairs_mut().append_pair("address", address);

        Ok(UpstreamRequest::get(url).header(API_KEY_HEADER, api_key))
    }
}

/// Sale and rental market statistics for a zipcode.
pub struct MarketStats {
    settings: Arc<ProviderSettings>,
}

impl MarketStats {
    pub fn new(settings: Arc<ProviderSettings>) -> Self {
        MarketStats { settings }
    }

    fn data_type(query: &ProxyQuery) -> Result<&'static str, ProxyError> {
        let Some(requested) = query.data_type.as_deref() else {
            return Ok("All");
        };

        ["All", "Sale", "Rental"]
            .into_iter()
            .find(|t| t.eq_ignore_ascii_case(requested))
            .ok_or_else(|| ProxyError::InvalidParameter {
                name: "dataType",
                value: requested.to_string(),
            })
    }
}

impl Endpoint for MarketStats {
    fn path(&self) -> &'static str {
        "/api/market-stats"
    }

    fn provider(&self) -> Provider {
        Provider::Rentcast
    }

    fn ttl(&self) -> Duration {
        24 * HOUR
    }

    fn cache_key(&self, query: &ProxyQuery) -> Result<String, ProxyError> {
        Ok(format!(
            "{}:{}:{}",
            self.path(),
            query.resolve_zipcode()?,
            Self::data_type(query)?
        ))
    }

    fn upstream_request(&self, query: &ProxyQuery) -> Result<UpstreamRequest, ProxyError> {
        let zipcode = query.resolve_zipcode()?;
        let data_type = Self::data_type(query)?;
        let api_key = self.settings.api_key()?;

        let mut url = self.settings.url("/v1/markets")?;
        url.query_pairs_mut()
            .append_pair("zipCode", &zipcode)
            .append_pair("dataType", data_type)
            .append_pair("historyRange", MARKET_HISTORY_MONTHS);

        Ok(UpstreamRequest::get(url).header(API_KEY_HEADER, api_key))
    }
}
