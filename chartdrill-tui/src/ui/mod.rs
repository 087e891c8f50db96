//! Top-level UI layout: chart, controls sidebar and status bar.

pub mod candle_chart;
pub mod overlays;
pub mod sidebar;
pub mod status_bar;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};

use crate::app::{AppState, Overlay};
use crate::theme::Theme;
use candle_chart::{chart_title, CandleChart};

const SIDEBAR_WIDTH: u16 = 34;

/// Draw the entire UI.
pub fn draw(f: &mut Frame, app: &AppState) {
    // Split: main area + 1-line status bar.
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(f.area());
    let main_area = chunks[0];

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(20), Constraint::Length(SIDEBAR_WIDTH)])
        .split(main_area);

    draw_chart(f, columns[0], app);
    sidebar::render(f, columns[1], app);
    status_bar::render(f, chunks[1], app);

    match app.overlay {
        Overlay::Help => overlays::render_help(f, main_area),
        Overlay::ErrorHistory => overlays::render_error_history(f, main_area, app),
        Overlay::None => {}
    }
}

fn draw_chart(f: &mut Frame, area: Rect, app: &AppState) {
    let theme = Theme::default();
    let tz_label = app.config.tz_label();

    let message = if let Some(fatal) = &app.fatal {
        fatal.clone()
    } else if app.choices.is_none() {
        "Connecting to venue...".to_string()
    } else if app.in_flight {
        "Sampling...".to_string()
    } else {
        match app.error_history.front() {
            Some(last) if app.last_applied.is_some() => last.message.clone(),
            _ => "Press n to draw a segment".to_string(),
        }
    };

    let mut chart = CandleChart::new(app.segment.as_ref(), &theme)
        .tz_label(&tz_label)
        .annotations(&app.annotations)
        .cursor(app.cursor)
        .message(&message);
    if let (Some(segment), Some(params)) = (&app.segment, &app.last_applied) {
        chart = chart.title(chart_title(
            &params.symbol_display,
            app.segment_mode.unwrap_or(params.mode),
            segment.timeframe(),
            segment.len(),
        ));
    }
    f.render_widget(chart, area);
}

/// Compute a centered rect for overlays.
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
