use serde::Deserialize;
use std::fmt;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Upstream timeout cannot be 0")]
    InvalidTimeout,

    #[error("Bounded cache capacity cannot be 0")]
    InvalidCacheCapacity,

    #[error("Empty OpenAI model name")]
    EmptyModel,
}

/// A server-held API key.
///
/// Written inline, or as `env:VAR_NAME` to read it from the environment when
/// the proxy starts.
#[derive(Clone, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Credential(value.into())
    }

    /// Resolves the key. Unset or empty variables resolve to `None`.
    pub fn resolve(&self) -> Option<String> {
        let value = match self.0.strip_prefix("env:") {
            Some(var) => std::env::var(var).ok()?,
            None => self.0.clone(),
        };
        (!value.trim().is_empty()).then_some(value)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.strip_prefix("env:") {
            Some(var) => write!(f, "Credential(env:{var})"),
            None => f.write_str("Credential(<redacted>)"),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct ProviderConfig {
    pub api_key: Option<Credential>,
    /// Overrides the provider's public base URL.
    pub base_url: Option<Url>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct OpenAiConfig {
    #[serde(flatten)]
    pub provider: ProviderConfig,
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        OpenAiConfig {
            provider: ProviderConfig::default(),
            model: default_model(),
        }
    }
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

/// Storage behind the response cache.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CacheConfig {
    /// Process-local and unbounded; entries expire when read after their TTL.
    #[default]
    Memory,
    /// Capacity-bounded with per-entry TTL.
    Bounded { max_capacity: u64 },
    Disabled,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub rentcast: ProviderConfig,
    #[serde(default)]
    pub zillow: ProviderConfig,
    #[serde(default)]
    pub repliers: ProviderConfig,
    #[serde(default)]
    pub google_maps: ProviderConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    /// Applies to the whole upstream request, body included.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    15
}

impl Default for Config {
    fn default() -> Self {
        Config {
            rentcast: ProviderConfig::default(),
            zillow: ProviderConfig::default(),
            repliers: ProviderConfig::default(),
            google_maps: ProviderConfig::default(),
            openai: OpenAiConfig::default(),
            cache: CacheConfig::default(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        if let CacheConfig::Bounded { max_capacity: 0 } = self.cache {
            return Err(ValidationError::InvalidCacheCapacity);
        }
        if self.openai.model.trim().is_empty() {
            return Err(ValidationError::EmptyModel);
        }
        Ok(())
    }
}
