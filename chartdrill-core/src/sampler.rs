//! Random segment sampler.
//!
//! Picks a random end time inside the lookback window, asks the venue for
//! `bar_count` bars ending there, and retries with a fresh random window until
//! a full, gap-free batch comes back or the retry budget runs out. Short or
//! gapped batches, and batches holding a malformed bar (NaN, or high below
//! low), are discarded whole; there is no partial salvage.

use chrono::FixedOffset;
use rand::Rng;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::data::Venue;
use crate::domain::{Bar, Segment, Timeframe};

pub const DAY_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SampleError {
    #[error("could not get {bar_count} consecutive bars for {symbol} after {attempts} attempts")]
    Exhausted {
        symbol: String,
        bar_count: usize,
        attempts: u32,
        last_error: Option<String>,
    },

    #[error("invalid sample request: {0}")]
    InvalidRequest(String),
}

/// Everything one sampling call needs.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRequest {
    /// Venue identifier (not the display symbol).
    pub symbol_id: String,
    pub bar_count: usize,
    pub timeframe: Timeframe,
    /// Display timezone for bar timestamps.
    pub tz: FixedOffset,
    pub window_days: u32,
    pub max_retries: u32,
}

/// Range of admissible segment end times, in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndWindow {
    pub min_end: i64,
    pub max_end: i64,
}

/// `max_end = now − bar`, `min_end = max(0, max_end − window)`.
pub fn end_window(now_ms: i64, bar_ms: i64, window_days: u32) -> EndWindow {
    let max_end = now_ms - bar_ms;
    let window_ms = i64::from(window_days) * DAY_MS;
    EndWindow {
        min_end: (max_end - window_ms).max(0),
        max_end,
    }
}

/// Uniform random bar-aligned end time within `window`.
///
/// Falls back to the aligned `max_end` when the window holds no boundary.
pub fn pick_end<R: Rng + ?Sized>(window: EndWindow, bar_ms: i64, rng: &mut R) -> i64 {
    let lo = (window.min_end + bar_ms - 1).div_euclid(bar_ms);
    let hi = window.max_end.div_euclid(bar_ms);
    if lo > hi {
        return hi * bar_ms;
    }
    rng.gen_range(lo..=hi) * bar_ms
}

/// Draw a random segment from `venue`.
///
/// Fetch errors count as an empty batch for that attempt. Exhausting
/// `max_retries` yields [`SampleError::Exhausted`], which callers show to the
/// user and treat as "nothing to render".
pub fn sample<R: Rng + ?Sized>(
    venue: &dyn Venue,
    req: &SampleRequest,
    rng: &mut R,
) -> Result<Segment, SampleError> {
    if req.bar_count == 0 {
        return Err(SampleError::InvalidRequest("bar_count must be positive".into()));
    }

    let bar_ms = req.timeframe.duration_ms();
    let window = end_window(venue.milliseconds(), bar_ms, req.window_days);
    let span_ms = (req.bar_count as i64 - 1) * bar_ms;
    let mut last_error = None;

    for attempt in 1..=req.max_retries {
        let end_ms = pick_end(window, bar_ms, rng);
        let since_ms = end_ms - span_ms;

        let raw = match venue.fetch_ohlcv(&req.symbol_id, req.timeframe, since_ms, req.bar_count) {
            Ok(raw) => raw,
            Err(e) => {
                debug!(attempt, symbol = %req.symbol_id, error = %e, "bar fetch failed");
                last_error = Some(e.to_string());
                Vec::new()
            }
        };
        debug!(attempt, since_ms, end_ms, got = raw.len(), "sample attempt");

        if raw.len() < req.bar_count {
            continue;
        }

        let bars: Option<Vec<Bar>> = raw[..req.bar_count]
            .iter()
            .map(|r| r.to_bar(&req.tz))
            .collect();
        let Some(bars) = bars else {
            last_error = Some("bar timestamp out of range".into());
            continue;
        };
        if let Some(bad) = bars.iter().position(|b| !b.is_sane()) {
            debug!(attempt, index = bad, "discarding batch with malformed bar");
            last_error = Some(format!("malformed bar at index {bad}"));
            continue;
        }

        match Segment::new(req.symbol_id.clone(), req.timeframe, bars, req.bar_count) {
            Ok(segment) => {
                info!(
                    symbol = %req.symbol_id,
                    attempt,
                    start = %segment.start(),
                    "sampled segment"
                );
                return Ok(segment);
            }
            Err(e) => {
                debug!(attempt, error = %e, "discarding incomplete batch");
                last_error = Some(e.to_string());
            }
        }
    }

    warn!(symbol = %req.symbol_id, attempts = req.max_retries, "sampling exhausted");
    Err(SampleError::Exhausted {
        symbol: req.symbol_id.clone(),
        bar_count: req.bar_count,
        attempts: req.max_retries,
        last_error,
    })
}
