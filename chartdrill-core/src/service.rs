//! Chart service: venue resolution, cached shortlist and segment sampling
//! behind one handle.
//!
//! Owned by a single thread (the TUI worker or the CLI main), so the caches
//! need no locking.

use std::sync::Arc;
use std::time::Instant;

use rand::Rng;
use thiserror::Error;
use tracing::info;

use crate::cache::{Ttl, TtlCache};
use crate::config::ChartDrillConfig;
use crate::data::{BinanceConnector, CoinGeckoRanking, DataError, RankingSource, VenueConnector};
use crate::domain::Segment;
use crate::resolver::{ResolvedVenue, VenueResolver};
use crate::sampler::{self, SampleError, SampleRequest};
use crate::session::SegmentParams;
use crate::shortlist::{build_shortlist, ranked_bases, SymbolChoices};

const RANKING_CACHE: &str = "ranking";
const SHORTLIST_CACHE: &str = "shortlist";

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Sample(#[from] SampleError),

    #[error("symbol '{0}' is not listed on the current venue")]
    UnknownSymbol(String),
}

pub struct ChartService {
    config: ChartDrillConfig,
    resolver: VenueResolver,
    ranking: Arc<dyn RankingSource>,
    ranking_cache: TtlCache<Vec<String>>,
    shortlist_cache: TtlCache<SymbolChoices>,
}

impl ChartService {
    pub fn new(
        config: ChartDrillConfig,
        connector: Arc<dyn VenueConnector>,
        ranking: Arc<dyn RankingSource>,
    ) -> Self {
        Self {
            config,
            resolver: VenueResolver::new(connector),
            ranking,
            ranking_cache: TtlCache::new(),
            shortlist_cache: TtlCache::new(),
        }
    }

    /// Binance venue and CoinGecko ranking, wired from `config`.
    pub fn from_config(config: ChartDrillConfig) -> Result<Self, DataError> {
        let connector =
            BinanceConnector::with_base_urls(&config.futures_base_url, &config.spot_base_url);
        let ranking = CoinGeckoRanking::with_url(&config.ranking_url, config.ranking_timeout())?;
        Ok(Self::new(config, Arc::new(connector), Arc::new(ranking)))
    }

    pub fn config(&self) -> &ChartDrillConfig {
        &self.config
    }

    pub fn resolve(&mut self) -> Result<ResolvedVenue, DataError> {
        self.resolver.resolve()
    }

    /// Ranked bases, cached for `ranking_ttl_secs`.
    ///
    /// The fallback list is cached like a real ranking, so an outage is not
    /// retried on every shortlist rebuild.
    pub fn ranked_bases(&mut self) -> Vec<String> {
        self.ranked_bases_at(Instant::now())
    }

    pub fn ranked_bases_at(&mut self, now: Instant) -> Vec<String> {
        if let Some(bases) = self.ranking_cache.get(RANKING_CACHE, now) {
            return bases;
        }
        let bases = ranked_bases(self.ranking.as_ref());
        self.ranking_cache.insert(
            RANKING_CACHE,
            bases.clone(),
            Ttl::For(self.config.ranking_ttl()),
            now,
        );
        bases
    }

    /// Symbol shortlist, cached for `shortlist_ttl_secs`.
    ///
    /// Fails only when no venue can be reached.
    pub fn symbol_choices(&mut self) -> Result<SymbolChoices, DataError> {
        self.symbol_choices_at(Instant::now())
    }

    /// `symbol_choices` as seen at `now`; expiry is judged against it.
    pub fn symbol_choices_at(&mut self, now: Instant) -> Result<SymbolChoices, DataError> {
        if let Some(choices) = self.shortlist_cache.get(SHORTLIST_CACHE, now) {
            return Ok(choices);
        }
        let resolved = self.resolve()?;
        let ranked = self.ranked_bases_at(now);
        let choices = build_shortlist(resolved.venue.markets(), resolved.mode, &ranked);
        info!(
            mode = %choices.mode,
            symbols = choices.ordered.len(),
            "shortlist rebuilt"
        );
        self.shortlist_cache.insert(
            SHORTLIST_CACHE,
            choices.clone(),
            Ttl::For(self.config.shortlist_ttl()),
            now,
        );
        Ok(choices)
    }

    /// Default control values with the default symbol of the current list.
    pub fn default_params(&mut self) -> Result<SegmentParams, DataError> {
        let choices = self.symbol_choices()?;
        let symbol_display = choices
            .ordered
            .get(choices.default_index())
            .cloned()
            .unwrap_or_default();
        Ok(SegmentParams {
            symbol_display,
            window_days: self.config.default_window_days,
            bar_count: self.config.default_bar_count,
            mode: choices.mode,
        })
    }

    /// Sample a fresh segment for `params.symbol_display`.
    pub fn sample_segment<R: Rng + ?Sized>(
        &mut self,
        params: &SegmentParams,
        rng: &mut R,
    ) -> Result<Segment, ServiceError> {
        let choices = self.symbol_choices()?;
        let symbol_id = choices
            .id_for(&params.symbol_display)
            .ok_or_else(|| ServiceError::UnknownSymbol(params.symbol_display.clone()))?
            .to_string();
        let resolved = self.resolve()?;

        let req = SampleRequest {
            symbol_id,
            bar_count: params.bar_count,
            timeframe: self.config.timeframe,
            tz: self.config.tz(),
            window_days: params.window_days,
            max_retries: self.config.max_retries,
        };
        Ok(sampler::sample(resolved.venue.as_ref(), &req, rng)?)
    }

    /// Drop cached ranking and shortlist; the venue decision stays.
    pub fn invalidate_caches(&mut self) {
        self.ranking_cache.clear();
        self.shortlist_cache.clear();
    }
}
