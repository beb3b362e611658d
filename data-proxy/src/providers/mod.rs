//! Third-party data providers and the endpoints built on them.
//!
//! Each endpoint turns a [`ProxyQuery`] into one upstream request. Responses
//! are never inspected; the router returns them as opaque blobs.

mod google_maps;
mod openai;
mod rentcast;
mod repliers;
mod zillow;

use crate::config::{Config, ProviderConfig};
use crate::errors::ProxyError;
use crate::query::ProxyQuery;
use reqwest::Method;
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub use google_maps::StreetView;
pub use openai::MarketSummary;
pub use rentcast::{AddressLookup, MarketStats};
pub use repliers::Listings;
pub use zillow::ZillowProperty;

const HOUR: Duration = Duration::from_secs(60 * 60);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Provider {
    Rentcast,
    Zillow,
    Repliers,
    GoogleMaps,
    OpenAi,
}

impl Provider {
    pub const fn display_name(&self) -> &'static str {
        match self {
            Provider::Rentcast => "Rentcast",
            Provider::Zillow => "Zillow",
            Provider::Repliers => "Repliers",
            Provider::GoogleMaps => "Google Maps",
            Provider::OpenAi => "OpenAI",
        }
    }

    /// Short tag used in metrics and logs.
    pub const fn tag(&self) -> &'static str {
        match self {
            Provider::Rentcast => "rentcast",
            Provider::Zillow => "zillow",
            Provider::Repliers => "repliers",
            Provider::GoogleMaps => "google_maps",
            Provider::OpenAi => "openai",
        }
    }

    const fn default_base_url(&self) -> &'static str {
        match self {
            Provider::Rentcast => "https://api.rentcast.io",
            Provider::Zillow => "https://zillow-com1.p.rapidapi.com",
            Provider::Repliers => "https://api.repliers.io",
            Provider::GoogleMaps => "https://maps.googleapis.com",
            Provider::OpenAi => "https://api.openai.com",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Resolved credential and base URL for one provider.
#[derive(Clone, Debug)]
pub struct ProviderSettings {
    provider: Provider,
    api_key: Option<String>,
    base_url: Url,
}

impl ProviderSettings {
    pub fn new(provider: Provider, api_key: Option<String>, base_url: Url) -> Self {
        ProviderSettings {
            provider,
            api_key,
            base_url,
        }
    }

    pub fn from_config(provider: Provider, config: &ProviderConfig) -> Result<Self, ProxyError> {
        let base_url = match &config.base_url {
            Some(url) => url.clone(),
            None => Url::parse(provider.default_base_url())?,
        };
        let api_key = config.api_key.as_ref().and_then(|c| c.resolve());
        if api_key.is_none() {
            tracing::warn!(provider = provider.tag(), "no API key configured");
        }

        Ok(Self::new(provider, api_key, base_url))
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn api_key(&self) -> Result<&str, ProxyError> {
        self.api_key
            .as_deref()
            .ok_or(ProxyError::MissingCredential(self.provider))
    }

    pub fn url(&self, path: &str) -> Result<Url, ProxyError> {
        Ok(self.base_url.join(path)?)
    }

    pub fn host(&self) -> &str {
        self.base_url.host_str().unwrap_or_default()
    }
}

/// Outbound request to a provider.
#[derive(Clone, Debug)]
pub struct UpstreamRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(&'static str, String)>,
    pub body: Option<JsonValue>,
}

impl UpstreamRequest {
    pub fn get(url: Url) -> Self {
        UpstreamRequest {
            method: Method::GET,
            url,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post_json(url: Url, body: JsonValue) -> Self {
        UpstreamRequest {
            method: Method::POST,
            url,
            headers: Vec::new(),
            body: Some(body),
        }
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }
}

pub trait Endpoint: Send + Sync {
    /// Path under which the endpoint is served, e.g. `/api/market-stats`.
    fn path(&self) -> &'static str;

    fn provider(&self) -> Provider;

    /// How long a successful response stays cached.
    fn ttl(&self) -> Duration;

    /// Identifies requests that share a cached response.
    fn cache_key(&self, query: &ProxyQuery) -> Result<String, ProxyError>;

    /// Builds the upstream request, validating inputs and the credential.
    fn upstream_request(&self, query: &ProxyQuery) -> Result<UpstreamRequest, ProxyError>;
}

/// Builds every endpoint served by the proxy.
pub fn endpoints(config: &Config) -> Result<Vec<Arc<dyn Endpoint>>, ProxyError> {
    let rentcast = Arc::new(ProviderSettings::from_config(
        Provider::Rentcast,
        &config.rentcast,
    )?);
    let zillow = ProviderSettings::from_config(Provider::Zillow, &config.zillow)?;
    let repliers = ProviderSettings::from_config(Provider::Repliers, &config.repliers)?;
    let google_maps = ProviderSettings::from_config(Provider::GoogleMaps, &config.google_maps)?;
    let openai = ProviderSettings::from_config(Provider::OpenAi, &config.openai.provider)?;

    Ok(vec![
        Arc::new(AddressLookup::valuation(rentcast.clone())),
        Arc::new(AddressLookup::rent_estimate(rentcast.clone())),
        Arc::new(AddressLookup::property_records(rentcast.clone())),
        Arc::new(MarketStats::new(rentcast)),
        Arc::new(ZillowProperty::new(zillow)),
        Arc::new(Listings::new(repliers)),
        Arc::new(StreetView::new(google_maps)),
        Arc::new(MarketSummary::new(openai, config.openai.model.clone())),
    ])
}
