//! ChartDrill Core: venue resolution, symbol shortlist and random segment
//! sampling for candlestick pattern practice.
//!
//! - Domain types (bars, segments, markets, timeframes)
//! - Binance venue and CoinGecko ranking providers behind traits
//! - Derivatives-first venue resolver with spot fallback
//! - Shortlist builder and retrying segment sampler
//! - TTL caches, configuration and CSV export

pub mod cache;
pub mod config;
pub mod data;
pub mod domain;
pub mod export;
pub mod resolver;
pub mod rng;
pub mod sampler;
pub mod service;
pub mod session;
pub mod shortlist;
