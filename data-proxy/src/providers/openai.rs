use super::{Endpoint, HOUR, Provider, ProviderSettings, UpstreamRequest};
use crate::errors::ProxyError;
use crate::query::ProxyQuery;
use serde_json::json;
use std::time::Duration;

const SYSTEM_PROMPT: &str = "You are a local real-estate market analyst writing for home buyers and \
     sellers. Be factual and concise, avoid superlatives, and do not invent statistics.";
const MAX_TOKENS: u32 = 400;

/// Short narrative market summary for a zipcode, generated by OpenAI.
pub struct MarketSummary {
    settings: ProviderSettings,
    model: String,
}

impl MarketSummary {
    pub fn new(settings: ProviderSettings, model: String) -> Self {
        MarketSummary { settings, model }
    }
}

impl Endpoint for MarketSummary {
    fn path(&self) -> &'static str {
        "/api/market-summary"
    }

    fn provider(&self) -> Provider {
        Provider::OpenAi
    }

    fn ttl(&self) -> Duration {
        24 * HOUR
    }

    fn cache_key(&self, query: &ProxyQuery) -> Result<String, ProxyError> {
        Ok(format!("{}:{}:{}", self.path(), self.model, query.resolve_zipcode()?))
    }

    fn upstream_request(&self, query: &ProxyQuery) -> Result<UpstreamRequest, ProxyError> {
        let zipcode = query.resolve_zipcode()?;
        let api_key = self.settings.api_key()?;

        let body = json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {
                    "role": "user",
                    "content": format!(
                        "Write a three-paragraph overview of the housing market in ZIP code {zipcode}: \
                         neighborhood character, typical buyers, and what sellers should expect."
                    ),
                },
            ],
        });

        let url = self.settings.url("/v1/chat/completions")?;
        Ok(UpstreamRequest::post_json(url, body).header("Authorization", format!("Bearer {api_key}")))
    }
}
