//! CoinGecko market-cap ranking.
//!
//! One GET to `/coins/markets`, sorted by market cap, 60 coins per page.
//! The payload is large; only the `symbol` field is read.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use super::provider::{DataError, RankingSource};

pub const COINGECKO_MARKETS_URL: &str = "https://api.coingecko.com/api/v3/coins/markets";

#[derive(Debug, Deserialize)]
struct CoinEntry {
    #[serde(default)]
    symbol: Option<String>,
}

pub struct CoinGeckoRanking {
    client: reqwest::blocking::Client,
    url: String,
}

impl CoinGeckoRanking {
    pub fn with_url(url: &str, timeout: Duration) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("chartdrill/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DataError::Configuration(e.to_string()))?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

impl RankingSource for CoinGeckoRanking {
    fn name(&self) -> &str {
        "coingecko"
    }

    fn fetch_symbols(&self) -> Result<Vec<String>, DataError> {
        debug!(url = %self.url, "fetching market-cap ranking");
        let resp = self
            .client
            .get(&self.url)
            .query(&[
                ("vs_currency", "usd"),
                ("order", "market_cap_desc"),
                ("per_page", "60"),
                ("page", "1"),
                ("sparkline", "false"),
            ])
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DataError::HttpStatus {
                provider: self.name().to_string(),
                status: status.as_u16(),
            });
        }

        let body = resp
            .text()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;
        parse_markets(&body)
    }
}

/// Extract symbols in ranking order from a `/coins/markets` payload.
pub fn parse_markets(body: &str) -> Result<Vec<String>, DataError> {
    let entries: Vec<CoinEntry> = serde_json::from_str(body)
        .map_err(|e| DataError::ResponseFormatChanged(format!("coins/markets: {e}")))?;
    Ok(entries.into_iter().filter_map(|c| c.symbol).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_symbols_in_order() {
        let body = r#"[
            {"id":"bitcoin","symbol":"btc","market_cap":1},
            {"id":"tether","symbol":"usdt"},
            {"id":"mystery"},
            {"id":"ethereum","symbol":"eth"}
        ]"#;
        assert_eq!(parse_markets(body).unwrap(), vec!["btc", "usdt", "eth"]);
    }

    #[test]
    fn object_payload_is_malformed() {
        let err = parse_markets(r#"{"status":{"error_code":429}}"#).unwrap_err();
        assert!(matches!(err, DataError::ResponseFormatChanged(_)));
    }
}
