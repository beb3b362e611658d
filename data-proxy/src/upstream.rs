use crate::cache::Blob;
use crate::errors::ProxyError;
use crate::metrics_defs::UPSTREAM_DURATION;
use crate::providers::{Provider, UpstreamRequest};
use http::header::CONTENT_TYPE;
use shared::histogram;
use std::time::{Duration, Instant};

const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// HTTP client shared by all provider endpoints.
#[derive(Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
}

impl UpstreamClient {
    /// `timeout` covers the whole exchange, body included.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(UpstreamClient { client })
    }

    /// Sends `request` and returns the body untouched on a 2xx status.
    pub async fn send(&self, provider: Provider, request: UpstreamRequest) -> Result<Blob, ProxyError> {
        let start = Instant::now();
        let result = self.exchange(provider, request).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(ProxyError::RateLimited(_)) => "rate_limited",
            Err(ProxyError::NotFound(_)) => "not_found",
            Err(ProxyError::Unauthorized(_)) => "unauthorized",
            Err(_) => "failure",
        };
        histogram!(UPSTREAM_DURATION, "provider" => provider.tag(), "outcome" => outcome)
            .record(start.elapsed().as_secs_f64());

        result
    }

    async fn exchange(&self, provider: Provider, request: UpstreamRequest) -> Result<Blob, ProxyError> {
        let mut builder = self.client.request(request.method, request.url);
        for (name, value) in request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        // Provider URLs can carry credentials in the query.
        let response = builder
            .send()
            .await
            .map_err(|e| ProxyError::UpstreamRequestFailed(provider, e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProxyError::from_upstream_status(provider, status));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();

        let body = response
            .bytes()
            .await
            .map_err(|e| ProxyError::UpstreamRequestFailed(provider, e.without_url()))?;

        Ok(Blob { content_type, body })
    }
}
