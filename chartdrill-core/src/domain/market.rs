//! Venue modes and catalog entries.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Quote asset every listed symbol is priced in.
pub const QUOTE_ASSET: &str = "USDT";

/// Which market family the venue connection trades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VenueMode {
    /// USDT-margined linear perpetual swaps.
    Derivatives,
    Spot,
}

impl VenueMode {
    /// Instrument class a shortlist in this mode is built from.
    pub fn instrument_class(self) -> InstrumentClass {
        match self {
            VenueMode::Derivatives => InstrumentClass::LinearPerpetual,
            VenueMode::Spot => InstrumentClass::Spot,
        }
    }

    /// Human-readable data source label shown next to the chart.
    pub fn source_label(self) -> &'static str {
        match self {
            VenueMode::Derivatives => "Binance Futures",
            VenueMode::Spot => "Binance Spot (fallback)",
        }
    }

    pub fn is_fallback(self) -> bool {
        self == VenueMode::Spot
    }
}

impl fmt::Display for VenueMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VenueMode::Derivatives => f.write_str("derivatives"),
            VenueMode::Spot => f.write_str("spot"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentClass {
    Spot,
    LinearPerpetual,
    /// Delivery futures, inverse contracts, anything we never list.
    Other,
}

/// One tradable instrument from the venue catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketDescriptor {
    pub base: String,
    pub quote: String,
    /// Venue-specific identifier used for bar requests (e.g. `BTCUSDT`).
    pub id: String,
    pub active: bool,
    pub class: InstrumentClass,
}

impl MarketDescriptor {
    /// Normalized display form, e.g. `BTC/USDT`.
    pub fn display_symbol(&self) -> String {
        display_symbol(&self.base)
    }

    /// True if this market belongs in a shortlist for the given mode.
    pub fn is_listable(&self, mode: VenueMode) -> bool {
        self.active
            && self.class == mode.instrument_class()
            && self.quote.eq_ignore_ascii_case(QUOTE_ASSET)
            && !self.id.is_empty()
    }
}

/// `{BASE}/USDT` for a base asset code.
pub fn display_symbol(base: &str) -> String {
    format!("{}/{QUOTE_ASSET}", base.to_uppercase())
}
