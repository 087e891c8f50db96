//! In-memory chart annotations and the chart cursor.
//!
//! Annotations live in (bar index, price) coordinates so they survive
//! terminal resizes. They are dropped when a new segment loads.

use chartdrill_core::domain::Segment;

/// Number of cursor steps between the segment's low and high.
pub const PRICE_STEPS: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Rect,
    Line,
    Level,
}

impl Tool {
    pub fn next(self) -> Tool {
        match self {
            Tool::Rect => Tool::Line,
            Tool::Line => Tool::Level,
            Tool::Level => Tool::Rect,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Tool::Rect => "Rect",
            Tool::Line => "Line",
            Tool::Level => "Level",
        }
    }

    /// Level needs one point, the others two.
    fn is_single_point(self) -> bool {
        matches!(self, Tool::Level)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub bar: usize,
    pub price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Annotation {
    Rect { from: Point, to: Point },
    Line { from: Point, to: Point },
    Level { price: f64 },
}

#[derive(Debug, Clone)]
pub struct Annotations {
    pub tool: Tool,
    /// First point of a two-point shape, waiting for its second.
    pub anchor: Option<Point>,
    pub items: Vec<Annotation>,
}

impl Default for Annotations {
    fn default() -> Self {
        Self {
            tool: Tool::Rect,
            anchor: None,
            items: Vec::new(),
        }
    }
}

impl Annotations {
    /// Switching tools drops a pending anchor.
    pub fn cycle_tool(&mut self) {
        self.tool = self.tool.next();
        self.anchor = None;
    }

    /// Anchor or commit at `at`. Returns the committed annotation, if any.
    pub fn press(&mut self, at: Point) -> Option<Annotation> {
        if self.tool.is_single_point() {
            let level = Annotation::Level { price: at.price };
            self.items.push(level);
            return Some(level);
        }
        match self.anchor.take() {
            None => {
                self.anchor = Some(at);
                None
            }
            Some(from) => {
                let shape = match self.tool {
                    Tool::Rect => Annotation::Rect { from, to: at },
                    _ => Annotation::Line { from, to: at },
                };
                self.items.push(shape);
                Some(shape)
            }
        }
    }

    /// Cancel a pending anchor, otherwise remove the newest annotation.
    pub fn erase_last(&mut self) -> bool {
        if self.anchor.take().is_some() {
            return true;
        }
        self.items.pop().is_some()
    }

    pub fn clear(&mut self) {
        self.anchor = None;
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Crosshair position on the current segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cursor {
    pub bar: usize,
    pub price: f64,
}

impl Cursor {
    /// Last bar, mid price.
    pub fn centered(segment: &Segment) -> Self {
        let (low, high) = segment.price_range();
        Self {
            bar: segment.len().saturating_sub(1),
            price: (low + high) / 2.0,
        }
    }

    pub fn point(&self) -> Point {
        Point {
            bar: self.bar,
            price: self.price,
        }
    }

    /// Move by whole bars and price steps, clamped to the segment.
    pub fn step(&mut self, segment: &Segment, bars: i64, steps: i64) {
        let last = segment.len().saturating_sub(1) as i64;
        self.bar = (self.bar as i64 + bars).clamp(0, last) as usize;

        let (low, high) = segment.price_range();
        let step = price_step(low, high);
        self.price = (self.price + steps as f64 * step).clamp(low, high);
    }
}

pub fn price_step(low: f64, high: f64) -> f64 {
    let range = high - low;
    if range > 0.0 {
        range / PRICE_STEPS
    } else {
        high.abs().max(1.0) / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartdrill_core::domain::{RawBar, Timeframe};
    use chrono::FixedOffset;
    use proptest::prelude::*;

    fn segment(n: usize) -> Segment {
        let tz = FixedOffset::east_opt(8 * 3600).unwrap();
        let bars = (0..n)
            .map(|i| {
                let close = 100.0 + i as f64;
                RawBar {
                    ts_ms: 1_700_000_100_000 + i as i64 * 300_000,
                    open: close - 0.5,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 1.0,
                }
                .to_bar(&tz)
                .unwrap()
            })
            .collect();
        Segment::new("BTCUSDT", Timeframe::M5, bars, n).unwrap()
    }

    fn pt(bar: usize, price: f64) -> Point {
        Point { bar, price }
    }

    #[test]
    fn tool_cycle() {
        assert_eq!(Tool::Rect.next(), Tool::Line);
        assert_eq!(Tool::Line.next(), Tool::Level);
        assert_eq!(Tool::Level.next(), Tool::Rect);
    }

    #[test]
    fn two_point_shapes_anchor_then_commit() {
        let mut a = Annotations::default();
        assert_eq!(a.press(pt(1, 100.0)), None);
        assert_eq!(a.anchor, Some(pt(1, 100.0)));
        let committed = a.press(pt(5, 110.0)).unwrap();
        assert_eq!(
            committed,
            Annotation::Rect {
                from: pt(1, 100.0),
                to: pt(5, 110.0)
            }
        );
        assert!(a.anchor.is_none());
        assert_eq!(a.len(), 1);
    }

    #[test]
    fn level_commits_immediately() {
        let mut a = Annotations::default();
        a.cycle_tool();
        a.cycle_tool();
        assert_eq!(a.tool, Tool::Level);
        assert_eq!(a.press(pt(3, 42.0)), Some(Annotation::Level { price: 42.0 }));
        assert!(a.anchor.is_none());
    }

    #[test]
    fn cycling_drops_pending_anchor() {
        let mut a = Annotations::default();
        a.press(pt(0, 1.0));
        a.cycle_tool();
        assert!(a.anchor.is_none());
        assert_eq!(a.tool, Tool::Line);
    }

    #[test]
    fn erase_cancels_anchor_before_items() {
        let mut a = Annotations::default();
        a.press(pt(0, 1.0));
        a.press(pt(2, 3.0));
        a.press(pt(4, 5.0));
        assert!(a.erase_last());
        assert!(a.anchor.is_none());
        assert_eq!(a.len(), 1);
        assert!(a.erase_last());
        assert!(a.is_empty());
        assert!(!a.erase_last());
    }

    #[test]
    fn clear_removes_everything() {
        let mut a = Annotations::default();
        a.press(pt(0, 1.0));
        a.press(pt(2, 3.0));
        a.press(pt(4, 5.0));
        a.clear();
        assert!(a.is_empty());
        assert!(a.anchor.is_none());
    }

    #[test]
    fn cursor_starts_on_last_bar() {
        let seg = segment(30);
        let c = Cursor::centered(&seg);
        assert_eq!(c.bar, 29);
        let (low, high) = seg.price_range();
        assert!((c.price - (low + high) / 2.0).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn cursor_stays_inside_segment(moves in prop::collection::vec((-50i64..50, -100i64..100), 1..40)) {
            let seg = segment(25);
            let (low, high) = seg.price_range();
            let mut c = Cursor::centered(&seg);
            for (bars, steps) in moves {
                c.step(&seg, bars, steps);
                prop_assert!(c.bar < seg.len());
                prop_assert!(c.price >= low && c.price <= high);
            }
        }
    }
}
