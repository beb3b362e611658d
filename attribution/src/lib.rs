//! Marketing attribution for the brokerage site.
//!
//! Two independent stores are kept:
//!
//! - the `masterkey_utms` cookie, written by the server-side [`Interceptor`]
//!   and merged on every capture so `first_seen` survives;
//! - the `utm_params` session entry, written by [`SessionCapture`] and replaced
//!   wholesale on each non-empty capture.
//!
//! The [`Relay`] reads the session entry and attaches it to every analytics
//! event it forwards.

pub mod backends;
pub mod capture;
pub mod cookie;
pub mod interceptor;
pub mod metrics_defs;
pub mod params;
pub mod record;
pub mod relay;
pub mod session;

pub use capture::SessionCapture;
pub use cookie::CookiePolicy;
pub use interceptor::Interceptor;
pub use params::{AttributionParams, TrackingParam};
pub use record::AttributionRecord;
pub use relay::{AnalyticsBackend, Relay, RelayError, TrackedEvent};
pub use session::{MemorySessionStorage, SessionStorage};
