//! Sampler behavior against mock venues.
//!
//! Properties checked:
//! 1. A successful sample has exactly `bar_count` consecutive bars
//! 2. The last bar opens no later than `now − bar`
//! 3. Short, gapped or failing feeds exhaust after exactly `max_retries` fetches
//! 4. Seeded draws are reproducible

mod common;

use chartdrill_core::domain::Timeframe;
use chartdrill_core::domain::VenueMode;
use chartdrill_core::rng::SampleSeed;
use chartdrill_core::sampler::{end_window, sample, SampleError, SampleRequest, DAY_MS};
use chrono::FixedOffset;
use common::{Feed, MockVenue, NOW_MS};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn taipei() -> FixedOffset {
    FixedOffset::east_opt(8 * 3600).unwrap()
}

fn request(symbol: &str, bar_count: usize, window_days: u32, max_retries: u32) -> SampleRequest {
    SampleRequest {
        symbol_id: symbol.into(),
        bar_count,
        timeframe: Timeframe::M5,
        tz: taipei(),
        window_days,
        max_retries,
    }
}

// ── Concrete scenarios ───────────────────────────────────────────────

#[test]
fn perp_segment_on_first_attempt() {
    let venue = MockVenue::new(VenueMode::Derivatives, Feed::Full);
    let req = request("BTCUSDT_PERP", 120, 750, 5);
    let seg = sample(&venue, &req, &mut StdRng::seed_from_u64(42)).unwrap();

    assert_eq!(venue.fetch_count(), 1);
    assert_eq!(seg.len(), 120);
    assert_eq!(seg.symbol(), "BTCUSDT_PERP");
    assert_eq!((seg.end() - seg.start()).num_minutes(), 595);
    assert_eq!(seg.start().offset().local_minus_utc(), 8 * 3600);
}

#[test]
fn short_feed_exhausts_after_max_retries() {
    let venue = MockVenue::new(VenueMode::Spot, Feed::Short);
    let req = request("ETHUSDT", 120, 750, 5);
    let err = sample(&venue, &req, &mut StdRng::seed_from_u64(1)).unwrap_err();

    assert_eq!(venue.fetch_count(), 5);
    match err {
        SampleError::Exhausted {
            symbol,
            bar_count,
            attempts,
            ..
        } => {
            assert_eq!(symbol, "ETHUSDT");
            assert_eq!(bar_count, 120);
            assert_eq!(attempts, 5);
        }
        other => panic!("expected Exhausted, got {other:?}"),
    }
}

#[test]
fn gapped_batches_are_discarded() {
    let venue = MockVenue::new(VenueMode::Spot, Feed::Gapped);
    let req = request("SOLUSDT", 60, 30, 3);
    let err = sample(&venue, &req, &mut StdRng::seed_from_u64(9)).unwrap_err();
    assert_eq!(venue.fetch_count(), 3);
    match err {
        SampleError::Exhausted { last_error, .. } => {
            assert!(last_error.unwrap_or_default().contains("gap"));
        }
        other => panic!("expected Exhausted, got {other:?}"),
    }
}

#[test]
fn fetch_errors_count_as_empty_attempts() {
    let venue = MockVenue::new(VenueMode::Derivatives, Feed::Failing);
    let req = request("BTCUSDT_PERP", 20, 7, 4);
    let err = sample(&venue, &req, &mut StdRng::seed_from_u64(3)).unwrap_err();
    assert_eq!(venue.fetch_count(), 4);
    match err {
        SampleError::Exhausted { last_error, .. } => {
            assert!(last_error.unwrap_or_default().contains("mock offline"));
        }
        other => panic!("expected Exhausted, got {other:?}"),
    }
}

#[test]
fn window_longer_than_history_clamps_to_epoch() {
    // Venue clock one day after the epoch: the window cannot reach back 2000 days.
    let now = DAY_MS;
    let w = end_window(now, Timeframe::M5.duration_ms(), 2000);
    assert_eq!(w.min_end, 0);

    let venue = MockVenue::new(VenueMode::Spot, Feed::Full).with_now(now);
    let req = request("BTCUSDT", 20, 2000, 5);
    let seg = sample(&venue, &req, &mut StdRng::seed_from_u64(5)).unwrap();
    assert_eq!(seg.len(), 20);
    assert!(venue.since_seen.lock().unwrap().iter().all(|since| *since >= -19 * 300_000));
}

#[test]
fn seeded_draws_replay() {
    let seed = SampleSeed::new(2024);
    let req = request("BTCUSDT", 50, 90, 5);

    let a = sample(
        &MockVenue::new(VenueMode::Spot, Feed::Full),
        &req,
        &mut seed.rng_for("BTC/USDT", 0),
    )
    .unwrap();
    let b = sample(
        &MockVenue::new(VenueMode::Spot, Feed::Full),
        &req,
        &mut seed.rng_for("BTC/USDT", 0),
    )
    .unwrap();
    assert_eq!(a.start(), b.start());
    assert_eq!(a.bars(), b.bars());
}

// ── Properties ───────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Full feeds always yield exactly `bar_count` consecutive, closed bars
    /// whose end lies inside the lookback window.
    #[test]
    fn full_feed_yields_exact_consecutive_segment(
        seed in any::<u64>(),
        bar_count in 20usize..=300,
        window_days in 7u32..=2000,
        tf_index in 0usize..Timeframe::ALL.len(),
    ) {
        let timeframe = Timeframe::ALL[tf_index];
        let bar_ms = timeframe.duration_ms();
        let venue = MockVenue::new(VenueMode::Derivatives, Feed::Full);
        let mut req = request("BTCUSDT_PERP", bar_count, window_days, 5);
        req.timeframe = timeframe;

        let seg = sample(&venue, &req, &mut StdRng::seed_from_u64(seed)).unwrap();
        prop_assert_eq!(seg.len(), bar_count);
        prop_assert_eq!(venue.fetch_count(), 1);

        for pair in seg.bars().windows(2) {
            prop_assert_eq!(pair[1].timestamp_ms() - pair[0].timestamp_ms(), bar_ms);
        }

        let last = seg.bars()[bar_count - 1].timestamp_ms();
        let window = end_window(NOW_MS, bar_ms, window_days);
        prop_assert!(last <= NOW_MS - bar_ms);
        prop_assert!(last >= window.min_end);
        prop_assert_eq!(last % bar_ms, 0);
    }

    /// A feed that never returns a full batch is asked exactly `max_retries` times.
    #[test]
    fn short_feed_uses_whole_retry_budget(
        seed in any::<u64>(),
        max_retries in 1u32..10,
        bar_count in 20usize..=300,
    ) {
        let venue = MockVenue::new(VenueMode::Spot, Feed::Short);
        let req = request("DOGEUSDT", bar_count, 750, max_retries);
        let result = sample(&venue, &req, &mut StdRng::seed_from_u64(seed));
        let is_exhausted = matches!(result, Err(SampleError::Exhausted { .. }));
        prop_assert!(is_exhausted);
        prop_assert_eq!(venue.fetch_count(), max_retries as usize);
    }
}
