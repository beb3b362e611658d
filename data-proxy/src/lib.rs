//! Server-side proxy for the property-data providers used by the site.
//!
//! Each `/api/*` endpoint hides a provider credential, resolves the request
//! into a single upstream call and caches successful responses for a fixed
//! TTL per endpoint. Upstream bodies are passed through as opaque blobs.

pub mod address;
pub mod cache;
pub mod config;
pub mod errors;
pub mod metrics_defs;
pub mod providers;
pub mod query;
pub mod router;
pub mod upstream;

pub use config::Config;
pub use errors::{InitError, ProxyError};
pub use router::DataProxy;
