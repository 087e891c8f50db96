//! Mock providers shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chartdrill_core::data::{DataError, RankingSource, Venue, VenueConnector};
use chartdrill_core::domain::{MarketDescriptor, RawBar, Timeframe, VenueMode};

/// 2025-10-09 08:26:40 UTC, deliberately not on a 5m boundary.
pub const NOW_MS: i64 = 1_760_000_000_000;

/// How the mock answers a bar request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feed {
    /// Every requested bar, never past `now`.
    Full,
    /// One bar fewer than requested.
    Short,
    /// Full batch with one bar missing in the middle.
    Gapped,
    /// Transport error.
    Failing,
}

pub struct MockVenue {
    pub mode: VenueMode,
    pub markets: Vec<MarketDescriptor>,
    pub feed: Feed,
    pub now_ms: i64,
    pub fetches: AtomicUsize,
    pub since_seen: std::sync::Mutex<Vec<i64>>,
}

impl MockVenue {
    pub fn new(mode: VenueMode, feed: Feed) -> Self {
        Self {
            mode,
            markets: catalog(mode, &["BTC", "ETH", "SOL", "DOGE"]),
            feed,
            now_ms: NOW_MS,
            fetches: AtomicUsize::new(0),
            since_seen: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn with_now(mut self, now_ms: i64) -> Self {
        self.now_ms = now_ms;
        self
    }

    pub fn with_markets(mut self, markets: Vec<MarketDescriptor>) -> Self {
        self.markets = markets;
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl Venue for MockVenue {
    fn markets(&self) -> &[MarketDescriptor] {
        &self.markets
    }

    fn fetch_ohlcv(
        &self,
        _id: &str,
        timeframe: Timeframe,
        since_ms: i64,
        limit: usize,
    ) -> Result<Vec<RawBar>, DataError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.since_seen.lock().unwrap().push(since_ms);
        if self.feed == Feed::Failing {
            return Err(DataError::NetworkUnreachable("mock offline".into()));
        }

        let step = timeframe.duration_ms();
        let first = since_ms.div_euclid(step) * step
            + if since_ms.rem_euclid(step) == 0 { 0 } else { step };
        // Only closed bars exist.
        let mut bars: Vec<RawBar> = (0..limit as i64)
            .map(|i| first + i * step)
            .take_while(|ts| *ts + step <= self.now_ms)
            .map(|ts| raw_bar(ts, 100.0 + (ts / step % 7) as f64))
            .collect();

        match self.feed {
            Feed::Short => {
                bars.pop();
            }
            Feed::Gapped if bars.len() > 2 => {
                let mid = bars.len() / 2;
                bars.remove(mid);
                let last = bars.last().map(|b| b.ts_ms).unwrap_or(first);
                bars.push(raw_bar(last + step, 100.0));
            }
            _ => {}
        }
        Ok(bars)
    }

    fn milliseconds(&self) -> i64 {
        self.now_ms
    }
}

pub fn raw_bar(ts_ms: i64, close: f64) -> RawBar {
    RawBar {
        ts_ms,
        open: close - 0.5,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 42.0,
    }
}

/// Active USDT markets of the class `mode` lists, one per base.
pub fn catalog(mode: VenueMode, bases: &[&str]) -> Vec<MarketDescriptor> {
    bases
        .iter()
        .map(|base| {
            let id = match mode {
                VenueMode::Derivatives => format!("{base}USDT_PERP"),
                VenueMode::Spot => format!("{base}USDT"),
            };
            MarketDescriptor {
                base: base.to_string(),
                quote: "USDT".into(),
                id,
                active: true,
                class: mode.instrument_class(),
            }
        })
        .collect()
}

/// Connector that hands out a prepared venue per mode.
pub struct MockConnector {
    pub derivatives: Option<Arc<MockVenue>>,
    pub spot: Option<Arc<MockVenue>>,
    pub connects: AtomicUsize,
}

impl MockConnector {
    pub fn new(derivatives: Option<Arc<MockVenue>>, spot: Option<Arc<MockVenue>>) -> Self {
        Self {
            derivatives,
            spot,
            connects: AtomicUsize::new(0),
        }
    }
}

impl VenueConnector for MockConnector {
    fn connect(&self, mode: VenueMode) -> Result<Arc<dyn Venue>, DataError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let venue = match mode {
            VenueMode::Derivatives => self.derivatives.clone(),
            VenueMode::Spot => self.spot.clone(),
        };
        match venue {
            Some(v) => Ok(v as Arc<dyn Venue>),
            None => Err(DataError::AccessRestricted(format!("{mode} unavailable"))),
        }
    }
}

/// Ranking that returns a fixed list, or fails.
pub struct MockRanking {
    pub symbols: Option<Vec<String>>,
    pub calls: AtomicUsize,
}

impl MockRanking {
    pub fn ok(symbols: &[&str]) -> Self {
        Self {
            symbols: Some(symbols.iter().map(|s| s.to_string()).collect()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            symbols: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RankingSource for MockRanking {
    fn name(&self) -> &str {
        "mock"
    }

    fn fetch_symbols(&self) -> Result<Vec<String>, DataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.symbols
            .clone()
            .ok_or_else(|| DataError::NetworkUnreachable("ranking timed out".into()))
    }
}

