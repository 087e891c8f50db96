//! Candle chart widget - OHLC candles with annotation and cursor overlays
//!
//! Renders the segment using direct buffer writes:
//! - One column per bar when the plot is wide enough, otherwise adjacent
//!   bars are merged into one column
//! - Body: block char in the up/down colour; wicks: vertical line chars
//! - Annotations: boxes, dotted lines and dashed levels in (bar, price) space
//! - X axis: first and last bar time only

use chrono::{DateTime, FixedOffset};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    widgets::{Block, Borders, Widget},
};

use chartdrill_core::domain::{Segment, Timeframe, VenueMode};

use crate::annotation::{Annotation, Annotations, Cursor, Point};
use crate::theme::Theme;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// `" BTC/USDT | Binance Futures | 5m | 120 bars "`
pub fn chart_title(display: &str, mode: VenueMode, timeframe: Timeframe, bars: usize) -> String {
    format!(
        " {display} | {} | {timeframe} | {bars} bars ",
        mode.source_label()
    )
}

/// Price label sized to the magnitude of the quote.
pub fn format_price(price: f64) -> String {
    let abs = price.abs();
    if abs >= 1000.0 {
        format!("{price:.1}")
    } else if abs >= 1.0 {
        format!("{price:.3}")
    } else {
        format!("{price:.5}")
    }
}

#[derive(Debug, Clone, Copy)]
struct Ohlc {
    open: f64,
    high: f64,
    low: f64,
    close: f64,
}

/// Screen mapping for one render pass.
#[derive(Debug, Clone, Copy)]
struct Plot {
    left: u16,
    top: u16,
    width: u16,
    height: u16,
    bars: usize,
    y_lower: f64,
    y_upper: f64,
}

impl Plot {
    /// Column for a bar index. Bars are spread out when there is room.
    fn x(&self, bar: usize) -> u16 {
        let width = self.width as usize;
        let col = if self.bars <= width {
            let step = width / self.bars.max(1);
            bar * step + step.saturating_sub(1) / 2
        } else {
            bar * width / self.bars
        };
        self.left + col.min(width.saturating_sub(1)) as u16
    }

    /// Row for a price, 0 = top of the plot.
    fn y(&self, price: f64) -> u16 {
        if (self.y_upper - self.y_lower).abs() < 1e-12 || self.height == 0 {
            return self.top;
        }
        let frac = (price - self.y_lower) / (self.y_upper - self.y_lower);
        let y = self.height.saturating_sub(1) as f64 * (1.0 - frac);
        self.top + y.round().clamp(0.0, self.height.saturating_sub(1) as f64) as u16
    }
}

/// Candle chart widget
pub struct CandleChart<'a> {
    segment: Option<&'a Segment>,
    title: String,
    tz_label: &'a str,
    annotations: Option<&'a Annotations>,
    cursor: Option<Cursor>,
    message: Option<&'a str>,
    theme: &'a Theme,
}

impl<'a> CandleChart<'a> {
    pub fn new(segment: Option<&'a Segment>, theme: &'a Theme) -> Self {
        Self {
            segment,
            title: String::new(),
            tz_label: "",
            annotations: None,
            cursor: None,
            message: None,
            theme,
        }
    }

    pub fn title(mut self, title: String) -> Self {
        self.title = title;
        self
    }

    pub fn tz_label(mut self, tz_label: &'a str) -> Self {
        self.tz_label = tz_label;
        self
    }

    pub fn annotations(mut self, annotations: &'a Annotations) -> Self {
        self.annotations = Some(annotations);
        self
    }

    pub fn cursor(mut self, cursor: Option<Cursor>) -> Self {
        self.cursor = cursor;
        self
    }

    /// Shown centred when there is no segment.
    pub fn message(mut self, message: &'a str) -> Self {
        self.message = Some(message);
        self
    }

    fn render_empty(&self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(" No segment ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.theme.muted))
            .style(Style::default().bg(self.theme.background));
        let inner = block.inner(area);
        block.render(area, buf);

        let msg = self.message.unwrap_or("Press n to draw a segment");
        if inner.height == 0 || inner.width == 0 {
            return;
        }
        let len = msg.chars().count() as u16;
        let x = inner.x + inner.width.saturating_sub(len) / 2;
        let y = inner.y + inner.height / 2;
        buf.set_stringn(
            x,
            y,
            msg,
            inner.width as usize,
            Style::default().fg(self.theme.warning),
        );
    }

    /// Merge bars that share a column.
    fn columns(&self, segment: &Segment, plot: &Plot) -> Vec<(u16, Ohlc)> {
        let mut cols: Vec<(u16, Ohlc)> = Vec::with_capacity(plot.width as usize);
        for (i, bar) in segment.bars().iter().enumerate() {
            let x = plot.x(i);
            match cols.last_mut() {
                Some((cx, c)) if *cx == x => {
                    c.high = c.high.max(bar.high);
                    c.low = c.low.min(bar.low);
                    c.close = bar.close;
                }
                _ => cols.push((
                    x,
                    Ohlc {
                        open: bar.open,
                        high: bar.high,
                        low: bar.low,
                        close: bar.close,
                    },
                )),
            }
        }
        cols
    }

    fn draw_candles(&self, segment: &Segment, plot: &Plot, buf: &mut Buffer) {
        for (x, c) in self.columns(segment, plot) {
            let is_up = c.close >= c.open;
            let style = Style::default().fg(self.theme.candle_color(is_up));

            let high_y = plot.y(c.high);
            let low_y = plot.y(c.low);
            let body_top_y = plot.y(c.open.max(c.close));
            let body_bot_y = plot.y(c.open.min(c.close));

            for y in high_y..body_top_y {
                buf.set_string(x, y, "\u{2502}", style);
            }
            // full block vs medium shade
            let body_char = if is_up { "\u{2588}" } else { "\u{2593}" };
            for y in body_top_y..=body_bot_y {
                buf.set_string(x, y, body_char, style);
            }
            for y in (body_bot_y + 1)..=low_y {
                buf.set_string(x, y, "\u{2502}", style);
            }
        }
    }

    fn draw_annotation(&self, shape: &Annotation, plot: &Plot, style: Style, buf: &mut Buffer) {
        match *shape {
            Annotation::Level { price } => {
                let y = plot.y(price);
                for x in plot.left..plot.left + plot.width {
                    if (x - plot.left) % 2 == 0 {
                        buf.set_string(x, y, "-", style);
                    }
                }
                let label = format_price(price);
                let lx = (plot.left + plot.width).saturating_sub(label.len() as u16);
                buf.set_string(lx, y, &label, style.add_modifier(Modifier::BOLD));
            }
            Annotation::Rect { from, to } => {
                let (x1, x2) = min_max(plot.x(from.bar), plot.x(to.bar));
                let (y1, y2) = min_max(plot.y(from.price), plot.y(to.price));
                for x in x1..=x2 {
                    buf.set_string(x, y1, "\u{2500}", style);
                    buf.set_string(x, y2, "\u{2500}", style);
                }
                for y in y1..=y2 {
                    buf.set_string(x1, y, "\u{2502}", style);
                    buf.set_string(x2, y, "\u{2502}", style);
                }
                buf.set_string(x1, y1, "\u{250c}", style);
                buf.set_string(x2, y1, "\u{2510}", style);
                buf.set_string(x1, y2, "\u{2514}", style);
                buf.set_string(x2, y2, "\u{2518}", style);
            }
            Annotation::Line { from, to } => {
                let (ax, ay) = (plot.x(from.bar) as i32, plot.y(from.price) as i32);
                let (bx, by) = (plot.x(to.bar) as i32, plot.y(to.price) as i32);
                let steps = (bx - ax).abs().max((by - ay).abs()).max(1);
                for s in 0..=steps {
                    let x = ax + (bx - ax) * s / steps;
                    let y = ay + (by - ay) * s / steps;
                    buf.set_string(x as u16, y as u16, "\u{2022}", style);
                }
            }
        }
    }

    fn draw_overlays(&self, plot: &Plot, buf: &mut Buffer) {
        if let Some(annotations) = self.annotations {
            let style = Style::default().fg(self.theme.annotation);
            for shape in &annotations.items {
                self.draw_annotation(shape, plot, style, buf);
            }

            // Preview the pending shape from its anchor to the cursor.
            if let (Some(anchor), Some(cursor)) = (annotations.anchor, self.cursor) {
                let preview_style = Style::default()
                    .fg(self.theme.warning)
                    .add_modifier(Modifier::DIM);
                let preview = preview_shape(annotations, anchor, cursor.point());
                self.draw_annotation(&preview, plot, preview_style, buf);
                buf.set_string(
                    plot.x(anchor.bar),
                    plot.y(anchor.price),
                    "\u{25c6}",
                    Style::default().fg(self.theme.warning),
                );
            }
        }

        if let Some(cursor) = self.cursor {
            let style = Style::default()
                .fg(self.theme.accent)
                .add_modifier(Modifier::BOLD);
            let y = plot.y(cursor.price);
            buf.set_string(plot.x(cursor.bar), y, "\u{253c}", style);
        }
    }

    fn draw_axes(&self, segment: &Segment, plot: &Plot, inner: Rect, buf: &mut Buffer) {
        let label_style = Style::default().fg(self.theme.muted);
        let label_width = plot.left - inner.x;

        let rows = [
            (plot.y_upper, plot.top),
            ((plot.y_upper + plot.y_lower) / 2.0, plot.top + plot.height / 2),
            (plot.y_lower, plot.top + plot.height.saturating_sub(1)),
        ];
        for (price, y) in rows {
            let label = format!("{:>w$}", format_price(price), w = label_width as usize - 1);
            buf.set_stringn(inner.x, y, &label, label_width as usize - 1, label_style);
        }

        if let Some(cursor) = self.cursor {
            let label = format!("{:>w$}", format_price(cursor.price), w = label_width as usize - 1);
            buf.set_stringn(
                inner.x,
                plot.y(cursor.price),
                &label,
                label_width as usize - 1,
                Style::default().fg(self.theme.accent),
            );
        }

        let axis_y = plot.top + plot.height;
        if axis_y >= inner.bottom() {
            return;
        }
        let start = time_label(segment.start(), "");
        let end = time_label(segment.end(), self.tz_label);
        buf.set_stringn(plot.left, axis_y, &start, plot.width as usize, label_style);
        let end_len = end.chars().count() as u16;
        if end_len + start.chars().count() as u16 + 1 <= plot.width {
            buf.set_string(plot.left + plot.width - end_len, axis_y, &end, label_style);
        }
    }
}

impl<'a> Widget for CandleChart<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(segment) = self.segment.filter(|s| !s.is_empty()) else {
            self.render_empty(area, buf);
            return;
        };

        let block = Block::default()
            .title(self.title.clone())
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.theme.accent))
            .style(Style::default().bg(self.theme.background));
        let inner = block.inner(area);
        block.render(area, buf);

        // Left margin for price labels, bottom row for the time axis.
        let label_width: u16 = 11;
        let plot_width = inner.width.saturating_sub(label_width);
        let plot_height = inner.height.saturating_sub(1);
        if plot_width == 0 || plot_height == 0 {
            return;
        }

        let (low, high) = segment.price_range();
        let range = high - low;
        let pad = if range > 0.0 { range * 0.05 } else { high.abs().max(1.0) * 0.01 };
        let plot = Plot {
            left: inner.x + label_width,
            top: inner.y,
            width: plot_width,
            height: plot_height,
            bars: segment.len(),
            y_lower: low - pad,
            y_upper: high + pad,
        };

        self.draw_candles(segment, &plot, buf);
        self.draw_overlays(&plot, buf);
        self.draw_axes(segment, &plot, inner, buf);
    }
}

fn preview_shape(annotations: &Annotations, from: Point, to: Point) -> Annotation {
    match annotations.tool {
        crate::annotation::Tool::Rect => Annotation::Rect { from, to },
        _ => Annotation::Line { from, to },
    }
}

fn time_label(t: DateTime<FixedOffset>, tz_label: &str) -> String {
    if tz_label.is_empty() {
        t.format(TIME_FORMAT).to_string()
    } else {
        format!("{} {tz_label}", t.format(TIME_FORMAT))
    }
}

fn min_max(a: u16, b: u16) -> (u16, u16) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::segment;
    use ratatui::style::Color;

    fn render(chart: CandleChart<'_>, w: u16, h: u16) -> Buffer {
        let area = Rect::new(0, 0, w, h);
        let mut buf = Buffer::empty(area);
        chart.render(area, &mut buf);
        buf
    }

    fn content(buf: &Buffer) -> String {
        let area = buf.area;
        let mut s = String::new();
        for y in 0..area.height {
            for x in 0..area.width {
                s.push_str(buf.cell((x, y)).unwrap().symbol());
            }
            s.push('\n');
        }
        s
    }

    #[test]
    fn title_names_symbol_source_timeframe_and_bars() {
        assert_eq!(
            chart_title("BTC/USDT", VenueMode::Spot, Timeframe::M5, 120),
            " BTC/USDT | Binance Spot (fallback) | 5m | 120 bars "
        );
    }

    #[test]
    fn renders_segment_with_start_and_end_times() {
        let theme = Theme::default();
        let seg = segment(20);
        let chart = CandleChart::new(Some(&seg), &theme)
            .title(chart_title("BTC/USDT", VenueMode::Derivatives, Timeframe::M5, 20))
            .tz_label("UTC+8");
        let text = content(&render(chart, 100, 24));
        assert!(text.contains("BTC/USDT | Binance Futures | 5m | 20 bars"));
        assert!(text.contains("2024-03-01 08:00"));
        assert!(text.contains("2024-03-01 09:35 UTC+8"));
    }

    #[test]
    fn empty_chart_shows_message() {
        let theme = Theme::default();
        let chart = CandleChart::new(None, &theme).message("could not get 120 bars");
        let text = content(&render(chart, 60, 12));
        assert!(text.contains("No segment"));
        assert!(text.contains("could not get 120 bars"));
    }

    #[test]
    fn up_candles_red_down_candles_teal() {
        let theme = Theme::default();
        let seg = segment(20);
        let buf = render(CandleChart::new(Some(&seg), &theme), 80, 20);
        let mut colours = std::collections::HashSet::new();
        for y in 0..20 {
            for x in 0..80 {
                let cell = buf.cell((x, y)).unwrap();
                if cell.symbol() == "\u{2588}" || cell.symbol() == "\u{2593}" {
                    colours.insert(cell.fg);
                }
            }
        }
        assert!(colours.contains(&Color::Rgb(0xef, 0x53, 0x50)));
        assert!(colours.contains(&Color::Rgb(0x26, 0xa6, 0x9a)));
    }

    #[test]
    fn wide_segment_merges_columns() {
        let theme = Theme::default();
        let seg = segment(300);
        // Narrower than the segment; must not panic or spill past the border.
        let buf = render(CandleChart::new(Some(&seg), &theme), 60, 20);
        let right_border = buf.cell((59, 5)).unwrap().symbol().to_string();
        assert_eq!(right_border, "\u{2502}");
    }

    #[test]
    fn annotations_and_cursor_are_drawn() {
        let theme = Theme::default();
        let seg = segment(20);
        let mut ann = Annotations::default();
        ann.cycle_tool();
        ann.cycle_tool();
        ann.press(Point { bar: 0, price: 100.0 });
        let cursor = Cursor::centered(&seg);
        let chart = CandleChart::new(Some(&seg), &theme)
            .annotations(&ann)
            .cursor(Some(cursor));
        let text = content(&render(chart, 100, 24));
        assert!(text.contains("100.000"));
        assert!(text.contains('\u{253c}'));
    }

    #[test]
    fn rect_annotation_has_corners() {
        let theme = Theme::default();
        let seg = segment(20);
        let mut ann = Annotations::default();
        ann.press(Point { bar: 2, price: 101.5 });
        ann.press(Point { bar: 10, price: 99.0 });
        let chart = CandleChart::new(Some(&seg), &theme).annotations(&ann);
        let text = content(&render(chart, 100, 24));
        assert!(text.contains('\u{250c}'));
        assert!(text.contains('\u{2518}'));
    }

    #[test]
    fn price_labels_scale_with_magnitude() {
        assert_eq!(format_price(64_123.456), "64123.5");
        assert_eq!(format_price(3.14159), "3.142");
        assert_eq!(format_price(0.123456), "0.12346");
    }
}
