//! Bar and Segment: the market data units handed to the chart.

use chrono::{DateTime, FixedOffset, TimeZone};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::timeframe::Timeframe;

/// Raw OHLCV row as returned by the venue (`[ts_ms, open, high, low, close, volume]`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    pub ts_ms: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl RawBar {
    /// Convert to a display bar in the given timezone.
    ///
    /// Returns `None` when the timestamp is outside chrono's representable range.
    pub fn to_bar(&self, tz: &FixedOffset) -> Option<Bar> {
        let time = tz.timestamp_millis_opt(self.ts_ms).single()?;
        Some(Bar {
            time,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
        })
    }
}

/// OHLCV bar with its open time converted to the display timezone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub time: DateTime<FixedOffset>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn timestamp_ms(&self) -> i64 {
        self.time.timestamp_millis()
    }

    pub fn is_up(&self) -> bool {
        self.close >= self.open
    }

    /// High is the maximum and low the minimum of the bar, with no NaN
    /// anywhere. Comparisons against NaN are false, so one check covers both.
    pub fn is_sane(&self) -> bool {
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SegmentError {
    #[error("expected {expected} bars, got {actual}")]
    WrongLength { expected: usize, actual: usize },

    #[error("gap after bar {index}: expected {expected_ms}, got {actual_ms}")]
    Gap {
        index: usize,
        expected_ms: i64,
        actual_ms: i64,
    },

    #[error("segment must contain at least one bar")]
    Empty,
}

/// A fixed-length run of consecutive bars for one symbol.
///
/// Construction validates the length and that every bar is exactly one
/// timeframe after its predecessor, so a `Segment` is never partial. Only
/// `Segment::new` builds one, which is why it serializes but does not
/// deserialize.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    symbol: String,
    timeframe: Timeframe,
    bars: Vec<Bar>,
}

impl Segment {
    pub fn new(
        symbol: impl Into<String>,
        timeframe: Timeframe,
        bars: Vec<Bar>,
        expected_len: usize,
    ) -> Result<Self, SegmentError> {
        if bars.is_empty() {
            return Err(SegmentError::Empty);
        }
        if bars.len() != expected_len {
            return Err(SegmentError::WrongLength {
                expected: expected_len,
                actual: bars.len(),
            });
        }
        check_consecutive(&bars, timeframe)?;
        Ok(Self {
            symbol: symbol.into(),
            timeframe,
            bars,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Open time of the first bar.
    pub fn start(&self) -> DateTime<FixedOffset> {
        self.bars[0].time
    }

    /// Open time of the last bar.
    pub fn end(&self) -> DateTime<FixedOffset> {
        self.bars[self.bars.len() - 1].time
    }

    /// Lowest low and highest high across the segment.
    pub fn price_range(&self) -> (f64, f64) {
        let low = self.bars.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
        let high = self
            .bars
            .iter()
            .map(|b| b.high)
            .fold(f64::NEG_INFINITY, f64::max);
        (low, high)
    }
}

fn check_consecutive(bars: &[Bar], timeframe: Timeframe) -> Result<(), SegmentError> {
    let step = timeframe.duration_ms();
    for (i, pair) in bars.windows(2).enumerate() {
        let expected_ms = pair[0].timestamp_ms() + step;
        let actual_ms = pair[1].timestamp_ms();
        if actual_ms != expected_ms {
            return Err(SegmentError::Gap {
                index: i,
                expected_ms,
                actual_ms,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn taipei() -> FixedOffset {
        FixedOffset::east_opt(8 * 3600).unwrap()
    }

    fn raw(ts_ms: i64) -> RawBar {
        RawBar {
            ts_ms,
            open: 100.0,
            high: 102.0,
            low: 99.0,
            close: 101.0,
            volume: 12.5,
        }
    }

    fn bars_from(start_ms: i64, step_ms: i64, n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| raw(start_ms + i as i64 * step_ms).to_bar(&taipei()).unwrap())
            .collect()
    }

    #[test]
    fn raw_bar_converts_to_display_timezone() {
        let bar = raw(0).to_bar(&taipei()).unwrap();
        assert_eq!(bar.time.to_rfc3339(), "1970-01-01T08:00:00+08:00");
        assert_eq!(bar.timestamp_ms(), 0);
    }

    #[test]
    fn bar_is_sane() {
        let bar = raw(0).to_bar(&taipei()).unwrap();
        assert!(bar.is_sane());
        assert!(bar.is_up());
    }

    #[test]
    fn bar_with_nan_is_not_sane() {
        let mut bar = raw(0).to_bar(&taipei()).unwrap();
        bar.close = f64::NAN;
        assert!(!bar.is_sane());
    }

    #[test]
    fn inverted_high_low_is_not_sane() {
        let mut bar = raw(0).to_bar(&taipei()).unwrap();
        bar.high = 98.0;
        assert!(!bar.is_sane());
    }

    #[test]
    fn consecutive_bars_form_a_segment() {
        let bars = bars_from(1_700_000_100_000, 300_000, 4);
        let seg = Segment::new("BTCUSDT", Timeframe::M5, bars, 4).unwrap();
        assert_eq!(seg.len(), 4);
        assert_eq!(
            seg.end().timestamp_millis() - seg.start().timestamp_millis(),
            900_000
        );
    }

    #[test]
    fn gap_is_rejected() {
        let mut bars = bars_from(0, 300_000, 3);
        bars.push(raw(1_200_000).to_bar(&taipei()).unwrap());
        let err = Segment::new("BTCUSDT", Timeframe::M5, bars, 4).unwrap_err();
        assert_eq!(
            err,
            SegmentError::Gap {
                index: 2,
                expected_ms: 900_000,
                actual_ms: 1_200_000,
            }
        );
    }

    #[test]
    fn validated_segment_serializes_its_bars() {
        let seg = Segment::new("BTCUSDT", Timeframe::M5, bars_from(0, 300_000, 3), 3).unwrap();
        let json = serde_json::to_value(&seg).unwrap();
        assert_eq!(json["symbol"], "BTCUSDT");
        assert_eq!(json["bars"].as_array().map(Vec::len), Some(3));
    }

    #[test]
    fn wrong_length_is_rejected() {
        let bars = bars_from(0, 300_000, 3);
        let err = Segment::new("BTCUSDT", Timeframe::M5, bars, 4).unwrap_err();
        assert_eq!(err, SegmentError::WrongLength { expected: 4, actual: 3 });
    }

    #[test]
    fn price_range_spans_lows_and_highs() {
        let mut bars = bars_from(0, 300_000, 2);
        bars[1].high = 110.0;
        bars[0].low = 95.0;
        let seg = Segment::new("BTCUSDT", Timeframe::M5, bars, 2).unwrap();
        assert_eq!(seg.price_range(), (95.0, 110.0));
    }
}
