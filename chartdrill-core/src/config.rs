//! TOML configuration.
//!
//! Every field has a default, so an empty or missing file is valid. Looked up
//! at `--config PATH` or `{config_dir}/chartdrill/config.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::binance::{FUTURES_BASE_URL, SPOT_BASE_URL};
use crate::data::coingecko::COINGECKO_MARKETS_URL;
use crate::domain::Timeframe;

pub const WINDOW_DAYS_RANGE: (u32, u32) = (7, 2000);
pub const BAR_COUNT_RANGE: (usize, usize) = (20, 300);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChartDrillConfig {
    pub timeframe: Timeframe,
    /// Display timezone as a fixed UTC offset (Asia/Taipei = +8).
    pub utc_offset_hours: i32,
    pub default_window_days: u32,
    pub default_bar_count: usize,
    pub max_retries: u32,
    pub shortlist_ttl_secs: u64,
    pub ranking_ttl_secs: u64,
    pub ranking_timeout_secs: u64,
    pub ranking_url: String,
    pub futures_base_url: String,
    pub spot_base_url: String,
    pub export_dir: PathBuf,
}

impl Default for ChartDrillConfig {
    fn default() -> Self {
        Self {
            timeframe: Timeframe::M5,
            utc_offset_hours: 8,
            default_window_days: 750,
            default_bar_count: 120,
            max_retries: 5,
            shortlist_ttl_secs: 30 * 60,
            ranking_ttl_secs: 60 * 60,
            ranking_timeout_secs: 10,
            ranking_url: COINGECKO_MARKETS_URL.to_string(),
            futures_base_url: FUTURES_BASE_URL.to_string(),
            spot_base_url: SPOT_BASE_URL.to_string(),
            export_dir: PathBuf::from("exports"),
        }
    }
}

impl ChartDrillConfig {
    /// Default config file location.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("chartdrill")
            .join("config.toml")
    }

    /// Load from `path`; a missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content).map_err(|e| match e {
                ConfigError::Parse { source, .. } => ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                },
                other => other,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<string>"),
            source,
        })?;
        config.validated()
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Clamp control defaults into their ranges and reject impossible values.
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        if self.max_retries == 0 {
            return Err(ConfigError::Invalid("max_retries must be at least 1".into()));
        }
        if self.ranking_timeout_secs == 0 {
            return Err(ConfigError::Invalid("ranking_timeout_secs must be at least 1".into()));
        }
        if !(-12..=14).contains(&self.utc_offset_hours) {
            return Err(ConfigError::Invalid(format!(
                "utc_offset_hours {} outside -12..=14",
                self.utc_offset_hours
            )));
        }
        self.default_window_days = clamp_window_days(self.default_window_days);
        self.default_bar_count = clamp_bar_count(self.default_bar_count);
        Ok(self)
    }

    pub fn tz(&self) -> FixedOffset {
        // validated() keeps the offset in range; UTC covers hand-built configs.
        FixedOffset::east_opt(self.utc_offset_hours * 3600)
            .unwrap_or_else(|| Utc.fix())
    }

    /// `UTC+8`-style label for chart axes.
    pub fn tz_label(&self) -> String {
        format!("UTC{:+}", self.utc_offset_hours)
    }

    pub fn shortlist_ttl(&self) -> Duration {
        Duration::from_secs(self.shortlist_ttl_secs)
    }

    pub fn ranking_ttl(&self) -> Duration {
        Duration::from_secs(self.ranking_ttl_secs)
    }

    pub fn ranking_timeout(&self) -> Duration {
        Duration::from_secs(self.ranking_timeout_secs)
    }
}

pub fn clamp_window_days(days: u32) -> u32 {
    days.clamp(WINDOW_DAYS_RANGE.0, WINDOW_DAYS_RANGE.1)
}

pub fn clamp_bar_count(count: usize) -> usize {
    count.clamp(BAR_COUNT_RANGE.0, BAR_COUNT_RANGE.1)
}
