//! Staleness check for the displayed segment.

use serde::{Deserialize, Serialize};

use crate::domain::VenueMode;

/// Control values a segment was (or would be) sampled with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentParams {
    pub symbol_display: String,
    pub window_days: u32,
    pub bar_count: usize,
    pub mode: VenueMode,
}

impl SegmentParams {
    /// True when nothing has been applied yet or any control changed.
    pub fn needs_refresh(&self, last_applied: Option<&SegmentParams>) -> bool {
        last_applied != Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> SegmentParams {
        SegmentParams {
            symbol_display: "BTC/USDT".into(),
            window_days: 750,
            bar_count: 120,
            mode: VenueMode::Derivatives,
        }
    }

    #[test]
    fn first_load_needs_refresh() {
        assert!(params().needs_refresh(None));
    }

    #[test]
    fn unchanged_params_do_not_refresh() {
        let p = params();
        assert!(!p.needs_refresh(Some(&p.clone())));
    }

    #[test]
    fn any_changed_field_refreshes() {
        let last = params();

        let mut p = params();
        p.symbol_display = "ETH/USDT".into();
        assert!(p.needs_refresh(Some(&last)));

        let mut p = params();
        p.window_days = 30;
        assert!(p.needs_refresh(Some(&last)));

        let mut p = params();
        p.bar_count = 200;
        assert!(p.needs_refresh(Some(&last)));

        let mut p = params();
        p.mode = VenueMode::Spot;
        assert!(p.needs_refresh(Some(&last)));
    }
}
