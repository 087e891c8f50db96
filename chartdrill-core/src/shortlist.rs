//! Symbol shortlist: market-cap ranking intersected with the venue catalog.
//!
//! Ordering rules:
//! 1. ranked bases that the catalog lists, in ranking order
//! 2. anchors (`BTC/USDT`, then `ETH/USDT`) inserted at the front when listed
//!    but missing, so ETH lands ahead of BTC when both were missing
//! 3. duplicates removed, first occurrence wins
//! 4. fewer than [`MIN_CHOICES`] entries → backfill from the catalog map in
//!    key order up to [`MAX_CHOICES`]

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::data::RankingSource;
use crate::domain::{display_symbol, MarketDescriptor, VenueMode};

/// Stablecoins never offered for practice.
pub const STABLECOINS: [&str; 14] = [
    "USDT", "USDC", "BUSD", "TUSD", "DAI", "FDUSD", "PYUSD", "USDD", "GUSD", "PAX", "EURS",
    "LUSD", "USDP", "FRAX",
];

/// Used whenever the ranking service is unavailable.
pub const FALLBACK_BASES: [&str; 10] = [
    "BTC", "ETH", "BNB", "SOL", "XRP", "TON", "DOGE", "ADA", "TRX", "AVAX",
];

pub const ANCHORS: [&str; 2] = ["BTC/USDT", "ETH/USDT"];

pub const TOP_N: usize = 10;
pub const MIN_CHOICES: usize = 4;
pub const MAX_CHOICES: usize = 12;

/// Ordered display list plus the display → venue identifier map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolChoices {
    pub ordered: Vec<String>,
    pub display_to_id: BTreeMap<String, String>,
    pub mode: VenueMode,
}

impl SymbolChoices {
    /// Venue identifier for a display symbol.
    pub fn id_for(&self, display: &str) -> Option<&str> {
        self.display_to_id.get(display).map(String::as_str)
    }

    /// Index of `BTC/USDT` if listed, else 0.
    pub fn default_index(&self) -> usize {
        self.ordered
            .iter()
            .position(|d| d == ANCHORS[0])
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

/// Keep the first [`TOP_N`] non-stablecoin symbols, upper-cased and unique.
pub fn top_non_stable_bases(symbols: &[String]) -> Vec<String> {
    let mut top: Vec<String> = Vec::with_capacity(TOP_N);
    for sym in symbols {
        let sym = sym.trim().to_uppercase();
        if sym.is_empty() || STABLECOINS.contains(&sym.as_str()) {
            continue;
        }
        if !top.contains(&sym) {
            top.push(sym);
        }
        if top.len() >= TOP_N {
            break;
        }
    }
    top
}

pub fn fallback_bases() -> Vec<String> {
    FALLBACK_BASES.iter().map(|s| s.to_string()).collect()
}

/// Ranked bases from `source`, or the fixed fallback list on any failure.
///
/// An empty ranking after stablecoin filtering also counts as a failure.
pub fn ranked_bases(source: &dyn RankingSource) -> Vec<String> {
    match source.fetch_symbols() {
        Ok(symbols) => {
            let top = top_non_stable_bases(&symbols);
            if top.is_empty() {
                warn!(source = source.name(), "ranking had no usable symbols, using fallback list");
                fallback_bases()
            } else {
                top
            }
        }
        Err(e) => {
            warn!(source = source.name(), error = %e, "ranking unavailable, using fallback list");
            fallback_bases()
        }
    }
}

/// `{BASE}/USDT` → venue id for every listable market in `mode`.
pub fn display_map(markets: &[MarketDescriptor], mode: VenueMode) -> BTreeMap<String, String> {
    markets
        .iter()
        .filter(|m| m.is_listable(mode))
        .map(|m| (m.display_symbol(), m.id.clone()))
        .collect()
}

/// Build the shortlist from a catalog and a ranked base list.
pub fn build_shortlist(
    markets: &[MarketDescriptor],
    mode: VenueMode,
    ranked: &[String],
) -> SymbolChoices {
    let display_to_id = display_map(markets, mode);

    let mut ordered: Vec<String> = ranked
        .iter()
        .map(|base| display_symbol(base))
        .filter(|d| display_to_id.contains_key(d))
        .collect();

    for anchor in ANCHORS {
        if display_to_id.contains_key(anchor) && !ordered.iter().any(|d| d == anchor) {
            ordered.insert(0, anchor.to_string());
        }
    }

    let mut seen = HashSet::new();
    ordered.retain(|d| seen.insert(d.clone()));

    if ordered.len() < MIN_CHOICES {
        for display in display_to_id.keys() {
            if ordered.len() >= MAX_CHOICES {
                break;
            }
            if seen.insert(display.clone()) {
                ordered.push(display.clone());
            }
        }
    }

    SymbolChoices {
        ordered,
        display_to_id,
        mode,
    }
}
