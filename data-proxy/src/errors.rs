use crate::providers::Provider;
use http::StatusCode;
use thiserror::Error;

/// Errors that can occur while serving a data-proxy request.
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid value for {name}: {value}")]
    InvalidParameter { name: &'static str, value: String },

    #[error("{0} API key is not configured")]
    MissingCredential(Provider),

    #[error("{0} rejected the configured credentials")]
    Unauthorized(Provider),

    #[error("{0} rate limit exceeded")]
    RateLimited(Provider),

    #[error("{0} has no data for this location")]
    NotFound(Provider),

    #[error("{0} returned status {1}")]
    UpstreamStatus(Provider, StatusCode),

    #[error("Request to {0} failed: {1}")]
    UpstreamRequestFailed(Provider, #[source] reqwest::Error),

    #[error("Invalid upstream URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ProxyError {
    /// Classifies a non-success upstream status.
    pub fn from_upstream_status(provider: Provider, status: StatusCode) -> Self {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProxyError::Unauthorized(provider),
            StatusCode::TOO_MANY_REQUESTS => ProxyError::RateLimited(provider),
            StatusCode::NOT_FOUND => ProxyError::NotFound(provider),
            status => ProxyError::UpstreamStatus(provider, status),
        }
    }

    /// Status returned to the calling page.
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::MissingParameter(_) | ProxyError::InvalidParameter { .. } => {
                StatusCode::BAD_REQUEST
            }
            ProxyError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            ProxyError::NotFound(_) => StatusCode::NOT_FOUND,
            ProxyError::MissingCredential(_)
            | ProxyError::Unauthorized(_)
            | ProxyError::UpstreamStatus(..)
            | ProxyError::UpstreamRequestFailed(..)
            | ProxyError::InvalidUrl(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to site visitors. Upstream details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            ProxyError::MissingParameter(_)
            | ProxyError::InvalidParameter { .. }
            | ProxyError::MissingCredential(_) => self.to_string(),
            ProxyError::Unauthorized(provider) => format!("{provider} API configuration error"),
            ProxyError::RateLimited(_) => "Rate limit exceeded, please try again later".to_string(),
            ProxyError::NotFound(_) => "No data found for this location".to_string(),
            ProxyError::UpstreamStatus(provider, _) | ProxyError::UpstreamRequestFailed(provider, _) => {
                format!("Failed to fetch data from {provider}")
            }
            ProxyError::InvalidUrl(_) => "Failed to build upstream request".to_string(),
        }
    }
}

/// Errors raised while assembling the proxy at startup.
#[derive(Error, Debug)]
pub enum InitError {
    #[error("failed to build upstream HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error(transparent)]
    Endpoint(#[from] ProxyError),
}
