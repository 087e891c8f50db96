//! Provider traits and structured error types.
//!
//! `Venue` abstracts over the exchange (catalog + historical bars) and
//! `RankingSource` over the market-cap ranking service, so the resolver,
//! shortlist builder and sampler can be exercised against mocks.

use std::sync::Arc;

use thiserror::Error;

use crate::domain::{MarketDescriptor, RawBar, Timeframe, VenueMode};

/// Structured error types for provider operations.
///
/// These are designed to be displayable in both CLI and TUI contexts.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("HTTP {status} from {provider}")]
    HttpStatus { provider: String, status: u16 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("access restricted: {0}")]
    AccessRestricted(String),

    #[error("hard stop: venue has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("invalid client configuration: {0}")]
    Configuration(String),

    #[error("no venue reachable: derivatives failed ({derivatives}); spot failed ({spot})")]
    VenueUnreachable { derivatives: String, spot: String },

    #[error("data error: {0}")]
    Other(String),
}

/// A connected exchange venue with its instrument catalog loaded.
pub trait Venue: Send + Sync {
    /// Loaded instrument catalog.
    fn markets(&self) -> &[MarketDescriptor];

    /// Fetch up to `limit` bars whose open time is at or after `since_ms`,
    /// oldest first.
    fn fetch_ohlcv(
        &self,
        id: &str,
        timeframe: Timeframe,
        since_ms: i64,
        limit: usize,
    ) -> Result<Vec<RawBar>, DataError>;

    /// Current time in epoch milliseconds, as the venue sees it.
    fn milliseconds(&self) -> i64;
}

/// Opens venue connections for a given mode.
pub trait VenueConnector: Send + Sync {
    /// Initialize a connection for `mode` and load its catalog.
    fn connect(&self, mode: VenueMode) -> Result<Arc<dyn Venue>, DataError>;
}

/// Market-cap ranking service.
pub trait RankingSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Asset symbols ordered by market capitalization, largest first.
    fn fetch_symbols(&self) -> Result<Vec<String>, DataError>;
}
