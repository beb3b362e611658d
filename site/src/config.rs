use attribution::CookiePolicy;
use attribution::cookie::{DEFAULT_COOKIE_NAME, DEFAULT_MAX_AGE};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Listener and admin listener both bind {0}")]
    ListenerConflict(String),

    #[error("Renderer timeout cannot be 0")]
    InvalidRendererTimeout,

    #[error("Attribution cookie name cannot be empty")]
    EmptyCookieName,

    #[error("Attribution cookie max age cannot be 0")]
    InvalidMaxAge,

    #[error("Invalid data proxy config: {0}")]
    DataProxy(#[from] data_proxy::config::ValidationError),
}

/// Site configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Main listener for page and API traffic
    pub listener: Listener,
    /// Admin listener for health and readiness checks
    pub admin_listener: Listener,
    #[serde(default)]
    pub environment: Environment,
    /// Upstream that renders the site's pages
    pub renderer: RendererConfig,
    #[serde(default)]
    pub attribution: AttributionConfig,
    #[serde(default)]
    pub data_proxy: data_proxy::Config,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;
        if self.listener == self.admin_listener {
            return Err(ValidationError::ListenerConflict(self.listener.address()));
        }

        if self.renderer.timeout_secs == 0 {
            return Err(ValidationError::InvalidRendererTimeout);
        }
        self.attribution.validate()?;
        self.data_proxy.validate()?;

        Ok(())
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    Development,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Development => "development",
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct RendererConfig {
    pub url: Url,
    /// Applies to the whole exchange, response body included.
    #[serde(default = "default_renderer_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_renderer_timeout_secs() -> u64 {
    30
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct AttributionConfig {
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,
}

fn default_cookie_name() -> String {
    DEFAULT_COOKIE_NAME.to_string()
}

fn default_max_age_secs() -> u64 {
    DEFAULT_MAX_AGE.as_secs()
}

impl Default for AttributionConfig {
    fn default() -> Self {
        AttributionConfig {
            cookie_name: default_cookie_name(),
            max_age_secs: default_max_age_secs(),
        }
    }
}

impl AttributionConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.cookie_name.trim().is_empty() {
            return Err(ValidationError::EmptyCookieName);
        }
        if self.max_age_secs == 0 {
            return Err(ValidationError::InvalidMaxAge);
        }
        Ok(())
    }

    /// The cookie is only marked `Secure` in production.
    pub fn cookie_policy(&self, environment: Environment) -> CookiePolicy {
        CookiePolicy {
            name: self.cookie_name.clone(),
            max_age: Duration::from_secs(self.max_age_secs),
            secure: environment.is_production(),
        }
    }
}
