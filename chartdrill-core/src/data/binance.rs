//! Binance venue provider.
//!
//! Derivatives mode talks to the USDⓈ-M futures API (`/fapi/v1`), spot mode
//! to the spot API (`/api/v3`). Both expose the same two calls we need:
//! `exchangeInfo` for the catalog and `klines` for historical bars.
//!
//! Futures endpoints answer HTTP 451 from restricted jurisdictions, which is
//! the usual reason the resolver ends up on spot.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::circuit_breaker::CircuitBreaker;
use super::provider::{DataError, Venue, VenueConnector};
use crate::domain::{InstrumentClass, MarketDescriptor, RawBar, Timeframe, VenueMode};

pub const FUTURES_BASE_URL: &str = "https://fapi.binance.com";
pub const SPOT_BASE_URL: &str = "https://api.binance.com";

#[derive(Debug, Deserialize)]
struct ExchangeInfo {
    symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SymbolInfo {
    symbol: String,
    status: String,
    base_asset: String,
    quote_asset: String,
    // futures only
    #[serde(default)]
    contract_type: Option<String>,
    #[serde(default)]
    margin_asset: Option<String>,
    // spot only
    #[serde(default)]
    is_spot_trading_allowed: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: i64,
    msg: String,
}

/// Opens Binance connections for either market family.
///
/// Each family has its own circuit breaker; a futures ban never blocks the
/// spot fallback.
pub struct BinanceConnector {
    futures_base_url: String,
    spot_base_url: String,
    futures_breaker: Arc<CircuitBreaker>,
    spot_breaker: Arc<CircuitBreaker>,
}

impl BinanceConnector {
    pub fn with_base_urls(futures_base_url: &str, spot_base_url: &str) -> Self {
        Self {
            futures_base_url: futures_base_url.trim_end_matches('/').to_string(),
            spot_base_url: spot_base_url.trim_end_matches('/').to_string(),
            futures_breaker: Arc::new(CircuitBreaker::default_venue()),
            spot_breaker: Arc::new(CircuitBreaker::default_venue()),
        }
    }
}

impl VenueConnector for BinanceConnector {
    fn connect(&self, mode: VenueMode) -> Result<Arc<dyn Venue>, DataError> {
        let (base_url, breaker) = match mode {
            VenueMode::Derivatives => (&self.futures_base_url, &self.futures_breaker),
            VenueMode::Spot => (&self.spot_base_url, &self.spot_breaker),
        };
        let venue = BinanceVenue::connect(mode, base_url, breaker.clone())?;
        Ok(Arc::new(venue))
    }
}

/// A Binance connection with its catalog loaded.
pub struct BinanceVenue {
    mode: VenueMode,
    base_url: String,
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    markets: Vec<MarketDescriptor>,
}

impl BinanceVenue {
    /// Build the HTTP client and load the instrument catalog.
    pub fn connect(
        mode: VenueMode,
        base_url: &str,
        circuit_breaker: Arc<CircuitBreaker>,
    ) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("chartdrill/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DataError::Configuration(e.to_string()))?;

        let mut venue = Self {
            mode,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            circuit_breaker,
            markets: Vec::new(),
        };
        let body = venue.get(&venue.exchange_info_url())?;
        venue.markets = parse_exchange_info(mode, &body)?;
        debug!(%mode, markets = venue.markets.len(), "loaded Binance catalog");
        Ok(venue)
    }

    fn api_prefix(&self) -> &'static str {
        match self.mode {
            VenueMode::Derivatives => "fapi/v1",
            VenueMode::Spot => "api/v3",
        }
    }

    fn exchange_info_url(&self) -> String {
        format!("{}/{}/exchangeInfo", self.base_url, self.api_prefix())
    }

    fn klines_url(&self, id: &str, timeframe: Timeframe, since_ms: i64, limit: usize) -> String {
        format!(
            "{}/{}/klines?symbol={id}&interval={timeframe}&startTime={since_ms}&limit={limit}",
            self.base_url,
            self.api_prefix(),
        )
    }

    /// GET a URL through the circuit breaker and return the body text.
    fn get(&self, url: &str) -> Result<String, DataError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(DataError::CircuitBreakerTripped);
        }

        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;
        let status = resp.status();

        if status == reqwest::StatusCode::IM_A_TEAPOT || status == reqwest::StatusCode::FORBIDDEN {
            self.circuit_breaker.trip();
            return Err(DataError::CircuitBreakerTripped);
        }

        if status == reqwest::StatusCode::UNAVAILABLE_FOR_LEGAL_REASONS {
            return Err(DataError::AccessRestricted(format!(
                "Binance {} is unavailable from this location",
                self.mode
            )));
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            self.circuit_breaker.record_failure();
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(DataError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        let body = resp
            .text()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;

        if !status.is_success() {
            self.circuit_breaker.record_failure();
            if let Ok(err) = serde_json::from_str::<ApiError>(&body) {
                return Err(DataError::Other(format!("Binance error {}: {}", err.code, err.msg)));
            }
            return Err(DataError::HttpStatus {
                provider: "binance".into(),
                status: status.as_u16(),
            });
        }

        self.circuit_breaker.record_success();
        Ok(body)
    }
}

impl Venue for BinanceVenue {
    fn markets(&self) -> &[MarketDescriptor] {
        &self.markets
    }

    fn fetch_ohlcv(
        &self,
        id: &str,
        timeframe: Timeframe,
        since_ms: i64,
        limit: usize,
    ) -> Result<Vec<RawBar>, DataError> {
        let url = self.klines_url(id, timeframe, since_ms, limit);
        debug!(%url, "fetching klines");
        let body = self.get(&url)?;
        parse_klines(&body)
    }

    fn milliseconds(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Parse an `exchangeInfo` payload into catalog entries for `mode`.
pub fn parse_exchange_info(mode: VenueMode, body: &str) -> Result<Vec<MarketDescriptor>, DataError> {
    let info: ExchangeInfo = serde_json::from_str(body)
        .map_err(|e| DataError::ResponseFormatChanged(format!("exchangeInfo: {e}")))?;

    let markets = info
        .symbols
        .into_iter()
        .map(|s| {
            let class = match mode {
                VenueMode::Derivatives => {
                    let perpetual = s.contract_type.as_deref() == Some("PERPETUAL");
                    let linear = s.margin_asset.as_deref() == Some(s.quote_asset.as_str());
                    if perpetual && linear {
                        InstrumentClass::LinearPerpetual
                    } else {
                        InstrumentClass::Other
                    }
                }
                VenueMode::Spot => {
                    if s.is_spot_trading_allowed.unwrap_or(true) {
                        InstrumentClass::Spot
                    } else {
                        InstrumentClass::Other
                    }
                }
            };
            MarketDescriptor {
                base: s.base_asset.to_uppercase(),
                quote: s.quote_asset.to_uppercase(),
                id: s.symbol,
                active: s.status == "TRADING",
                class,
            }
        })
        .collect();

    Ok(markets)
}

/// Parse a `klines` payload: an array of `[openTime, "o", "h", "l", "c", "v", ...]` rows.
pub fn parse_klines(body: &str) -> Result<Vec<RawBar>, DataError> {
    let rows: Vec<Vec<Value>> = serde_json::from_str(body)
        .map_err(|e| DataError::ResponseFormatChanged(format!("klines: {e}")))?;

    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            if row.len() < 6 {
                return Err(DataError::ResponseFormatChanged(format!(
                    "kline row {i} has {} fields",
                    row.len()
                )));
            }
            let ts_ms = row[0].as_i64().ok_or_else(|| {
                DataError::ResponseFormatChanged(format!("kline row {i}: bad open time"))
            })?;
            Ok(RawBar {
                ts_ms,
                open: number_field(&row[1], i, "open")?,
                high: number_field(&row[2], i, "high")?,
                low: number_field(&row[3], i, "low")?,
                close: number_field(&row[4], i, "close")?,
                volume: number_field(&row[5], i, "volume")?,
            })
        })
        .collect()
}

// Binance sends decimals as strings; accept plain numbers too.
fn number_field(value: &Value, row: usize, name: &str) -> Result<f64, DataError> {
    let parsed = match value {
        Value::String(s) => s.parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    };
    parsed.ok_or_else(|| DataError::ResponseFormatChanged(format!("kline row {row}: bad {name}")))
}
