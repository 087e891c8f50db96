//! Controls sidebar: symbol, window, bar count, tool and cursor readout.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use chartdrill_core::config::{BAR_COUNT_RANGE, WINDOW_DAYS_RANGE};

use crate::app::AppState;
use crate::theme;
use crate::ui::candle_chart::format_price;

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::panel_border(false))
        .title(" Controls ")
        .title_style(theme::panel_title(false));
    let inner = block.inner(area);
    f.render_widget(block, area);
    f.render_widget(Paragraph::new(lines(app)), inner);
}

pub fn lines(app: &AppState) -> Vec<Line<'static>> {
    let mut lines: Vec<Line> = Vec::new();

    let symbol = match (&app.choices, app.selected_symbol()) {
        (Some(c), Some(s)) => format!("{s} ({}/{})", app.controls.symbol_index + 1, c.ordered.len()),
        _ => "loading...".to_string(),
    };
    row(&mut lines, "Symbol", symbol, "[ ]");
    let source = app
        .choices
        .as_ref()
        .map(|c| c.mode.source_label())
        .unwrap_or("-");
    row(&mut lines, "Source", source.to_string(), "");
    row(
        &mut lines,
        "Window",
        format!("{} days", app.controls.window_days),
        "- = _ +",
    );
    row(
        &mut lines,
        "Bars",
        app.controls.bar_count.to_string(),
        "< >",
    );
    row(
        &mut lines,
        "Frame",
        format!("{} {}", app.config.timeframe, app.config.tz_label()),
        "",
    );
    lines.push(Line::from(Span::styled(
        format!(
            "  {}-{} days, {}-{} bars",
            WINDOW_DAYS_RANGE.0, WINDOW_DAYS_RANGE.1, BAR_COUNT_RANGE.0, BAR_COUNT_RANGE.1
        ),
        theme::muted(),
    )));
    lines.push(Line::from(""));

    let stale = app
        .current_params()
        .map(|p| p.needs_refresh(app.last_applied.as_ref()))
        .unwrap_or(false);
    let state = if app.fatal.is_some() {
        Span::styled("venue unreachable", theme::negative())
    } else if app.in_flight {
        Span::styled("sampling...", theme::warning())
    } else if stale {
        Span::styled("stale", theme::warning())
    } else if app.segment.is_some() {
        Span::styled("ready", theme::accent())
    } else {
        Span::styled("idle", theme::muted())
    };
    lines.push(Line::from(vec![Span::styled(format!("  {:<7}", "State"), theme::muted()), state]));
    lines.push(Line::from(""));

    let tool = if app.annotations.anchor.is_some() {
        format!("{} (anchored)", app.annotations.tool.label())
    } else {
        app.annotations.tool.label().to_string()
    };
    row(&mut lines, "Tool", tool, "t");
    row(&mut lines, "Drawn", app.annotations.len().to_string(), "u c");

    if let (Some(cursor), Some(segment)) = (app.cursor, app.segment.as_ref()) {
        if let Some(bar) = segment.bars().get(cursor.bar) {
            row(
                &mut lines,
                "Cursor",
                format!("#{} {}", cursor.bar + 1, bar.time.format("%m-%d %H:%M")),
                "",
            );
            row(&mut lines, "", format_price(cursor.price), "");
            row(
                &mut lines,
                "OHLC",
                format!("{} {}", format_price(bar.open), format_price(bar.high)),
                "",
            );
            row(
                &mut lines,
                "",
                format!("{} {}", format_price(bar.low), format_price(bar.close)),
                "",
            );
        }
    }

    lines
}

fn row(lines: &mut Vec<Line<'static>>, label: &str, value: String, keys: &str) {
    let mut spans = vec![
        Span::styled(format!("  {label:<7}"), theme::muted()),
        Span::styled(value, theme::primary()),
    ];
    if !keys.is_empty() {
        spans.push(Span::styled(format!("  {keys}"), theme::accent()));
    }
    lines.push(Line::from(spans));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{app, choices};
    use crate::worker::WorkerResponse;
    use chartdrill_core::session::SegmentParams;

    fn text(lines: &[Line]) -> String {
        lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn shows_loading_before_choices() {
        let (app, _rx, _) = app();
        let t = text(&lines(&app));
        assert!(t.contains("loading..."));
        assert!(t.contains("750 days"));
        assert!(t.contains("5m UTC+8"));
    }

    #[test]
    fn shows_symbol_position_and_source() {
        let (mut app, _rx, _) = app();
        let c = choices();
        let defaults = SegmentParams {
            symbol_display: "BTC/USDT".into(),
            window_days: 750,
            bar_count: 120,
            mode: c.mode,
        };
        app.handle_worker_response(WorkerResponse::Choices { choices: c, defaults });
        let t = text(&lines(&app));
        assert!(t.contains("BTC/USDT (2/3)"));
        assert!(t.contains("Binance Futures"));
        assert!(t.contains("sampling..."));
    }
}
