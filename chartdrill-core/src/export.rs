//! Segment export: file naming and CSV serialization.

use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset};
use thiserror::Error;
use tracing::info;

use crate::domain::Segment;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv output was not valid UTF-8")]
    Encoding,
}

/// `{symbol}_{start:%Y%m%d-%H%M}_{end:%Y%m%d-%H%M}` with `/` and `:` in the
/// symbol replaced by `-`.
pub fn export_filename(
    display_symbol: &str,
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
) -> String {
    let safe_symbol = display_symbol.replace(['/', ':'], "-");
    format!(
        "{safe_symbol}_{}_{}",
        start.format("%Y%m%d-%H%M"),
        end.format("%Y%m%d-%H%M")
    )
}

/// Segment bars as CSV (`time,open,high,low,close,volume`), RFC 3339 times.
pub fn export_segment_csv(segment: &Segment) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["time", "open", "high", "low", "close", "volume"])?;
    for bar in segment.bars() {
        wtr.write_record(&[
            bar.time.to_rfc3339(),
            bar.open.to_string(),
            bar.high.to_string(),
            bar.low.to_string(),
            bar.close.to_string(),
            bar.volume.to_string(),
        ])?;
    }
    let bytes = wtr.into_inner().map_err(|e| ExportError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|_| ExportError::Encoding)
}

/// Write `{export_filename}.csv` into `dir`, creating it if needed.
pub fn save_segment(
    dir: &Path,
    display_symbol: &str,
    segment: &Segment,
) -> Result<PathBuf, ExportError> {
    std::fs::create_dir_all(dir)?;
    let name = export_filename(display_symbol, segment.start(), segment.end());
    let path = dir.join(format!("{name}.csv"));
    std::fs::write(&path, export_segment_csv(segment)?)?;
    info!(path = %path.display(), "exported segment");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RawBar, Timeframe};
    use chrono::TimeZone;

    fn taipei() -> FixedOffset {
        FixedOffset::east_opt(8 * 3600).unwrap()
    }

    fn segment() -> Segment {
        // 2024-03-01 00:00 UTC = 08:00 Taipei
        let start = 1_709_251_200_000;
        let bars = (0..3)
            .map(|i| {
                RawBar {
                    ts_ms: start + i * 300_000,
                    open: 1.0,
                    high: 2.0,
                    low: 0.5,
                    close: 1.5,
                    volume: 10.0,
                }
                .to_bar(&taipei())
                .unwrap()
            })
            .collect();
        Segment::new("BTCUSDT", Timeframe::M5, bars, 3).unwrap()
    }

    #[test]
    fn filename_replaces_separators() {
        let tz = taipei();
        let start = tz.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let end = tz.with_ymd_and_hms(2024, 3, 1, 17, 55, 0).unwrap();
        assert_eq!(
            export_filename("BTC/USDT:USDT", start, end),
            "BTC-USDT-USDT_20240301-0800_20240301-1755"
        );
    }

    #[test]
    fn csv_has_header_and_rows() {
        let csv = export_segment_csv(&segment()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "time,open,high,low,close,volume");
        assert!(lines[1].starts_with("2024-03-01T08:00:00+08:00,1,2,0.5,1.5,10"));
    }

    #[test]
    fn save_writes_named_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_segment(&dir.path().join("exports"), "ETH/USDT", &segment()).unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "ETH-USDT_20240301-0800_20240301-0810.csv"
        );
        assert!(std::fs::read_to_string(path).unwrap().contains("volume"));
    }
}
