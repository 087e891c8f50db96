//! Market data providers: Binance venue, CoinGecko ranking, circuit breaker.

pub mod binance;
pub mod circuit_breaker;
pub mod coingecko;
pub mod provider;

pub use binance::{BinanceConnector, BinanceVenue};
pub use circuit_breaker::CircuitBreaker;
pub use coingecko::CoinGeckoRanking;
pub use provider::{DataError, RankingSource, Venue, VenueConnector};
