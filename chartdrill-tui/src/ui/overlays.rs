//! Overlay widgets: key help and error history.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Modifier;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::app::AppState;
use crate::theme;
use crate::ui::centered_rect;

/// Key reference overlay.
pub fn render_help(f: &mut Frame, area: Rect) {
    let popup = centered_rect(70, 80, area);
    f.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::accent())
        .title(" Keys [any key]close ")
        .title_style(theme::accent_bold());

    let inner = block.inner(popup);
    f.render_widget(block, popup);
    f.render_widget(Paragraph::new(help_lines()), inner);
}

pub fn help_lines() -> Vec<Line<'static>> {
    let mut lines: Vec<Line> = Vec::new();

    section(&mut lines, "Segment");
    key(&mut lines, "[ / ]", "Previous / next symbol");
    key(&mut lines, "- / =", "Lookback window -7 / +7 days");
    key(&mut lines, "_ / +", "Lookback window -90 / +90 days");
    key(&mut lines, "< / >", "Bar count -10 / +10");
    key(&mut lines, "n", "Draw a new random segment");
    key(&mut lines, "x", "Export segment as CSV");
    lines.push(Line::from(""));

    section(&mut lines, "Annotations");
    key(&mut lines, "h j k l / arrows", "Move cursor (Shift: x10)");
    key(&mut lines, "Home / End", "Cursor to first / last bar");
    key(&mut lines, "t", "Cycle tool: Rect, Line, Level");
    key(&mut lines, "Space", "Set anchor / commit shape");
    key(&mut lines, "u", "Cancel anchor or erase last shape");
    key(&mut lines, "c", "Clear all annotations");
    lines.push(Line::from(""));

    section(&mut lines, "General");
    key(&mut lines, "e", "Error history");
    key(&mut lines, "?", "This help");
    key(&mut lines, "q", "Quit");

    lines
}

fn section(lines: &mut Vec<Line<'static>>, title: &str) {
    lines.push(Line::from(Span::styled(title.to_string(), theme::accent_bold())));
}

fn key(lines: &mut Vec<Line<'static>>, keys: &str, desc: &str) {
    lines.push(Line::from(vec![
        Span::styled(format!("  {:>18}  ", keys), theme::accent()),
        Span::styled(desc.to_string(), theme::muted()),
    ]));
}

/// Error history overlay.
pub fn render_error_history(f: &mut Frame, area: Rect, app: &AppState) {
    let popup = centered_rect(80, 70, area);
    f.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::negative())
        .title(format!(
            " Error History ({}) [Esc]close [j/k]scroll ",
            app.error_history.len()
        ))
        .title_style(theme::negative());

    let inner = block.inner(popup);
    f.render_widget(block, popup);

    if app.error_history.is_empty() {
        let text = Paragraph::new(Span::styled("No errors recorded.", theme::muted()));
        f.render_widget(text, inner);
        return;
    }

    let visible_height = inner.height as usize;
    let start = app.error_scroll;
    let end = (start + visible_height).min(app.error_history.len());

    let mut lines: Vec<Line> = Vec::new();
    for (i, err) in app.error_history.iter().enumerate().take(end).skip(start) {
        let style = if i == app.error_scroll {
            theme::negative().add_modifier(Modifier::BOLD)
        } else {
            theme::muted()
        };

        lines.push(Line::from(vec![
            Span::styled(
                format!("[{}] ", err.timestamp.format("%H:%M:%S")),
                theme::muted(),
            ),
            Span::styled(format!("[{}] ", err.category.label()), theme::warning()),
            Span::styled(err.message.as_str(), style),
        ]));

        if !err.context.is_empty() {
            lines.push(Line::from(vec![
                Span::raw("  "),
                Span::styled(err.context.as_str(), theme::muted()),
            ]));
        }
    }

    f.render_widget(Paragraph::new(lines), inner);
}
