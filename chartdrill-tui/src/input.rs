//! Keyboard input dispatch: overlays first, then global keys.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::app::{AppState, Overlay};

pub const WINDOW_STEP_DAYS: i64 = 7;
pub const WINDOW_JUMP_DAYS: i64 = 90;
pub const BAR_STEP: i64 = 10;

/// Handle a key event.
pub fn handle_key(app: &mut AppState, key: KeyEvent) {
    // Only handle key press events (Windows sends both Press and Release).
    if key.kind != KeyEventKind::Press {
        return;
    }

    // 1. Overlays consume input first.
    match app.overlay {
        Overlay::Help => {
            app.overlay = Overlay::None;
            return;
        }
        Overlay::ErrorHistory => {
            handle_error_overlay(app, key);
            return;
        }
        Overlay::None => {}
    }

    // Shift+hjkl moves the cursor in larger strides.
    let fast = key.modifiers.contains(KeyModifiers::SHIFT);
    let stride = if fast { 10 } else { 1 };

    match key.code {
        KeyCode::Char('q') => app.running = false,
        KeyCode::Char('?') => app.overlay = Overlay::Help,
        KeyCode::Char('e') => {
            app.error_scroll = 0;
            app.overlay = Overlay::ErrorHistory;
        }

        // Controls
        KeyCode::Char('[') => app.cycle_symbol(-1),
        KeyCode::Char(']') => app.cycle_symbol(1),
        KeyCode::Char('-') => app.adjust_window(-WINDOW_STEP_DAYS),
        KeyCode::Char('=') => app.adjust_window(WINDOW_STEP_DAYS),
        KeyCode::Char('_') => app.adjust_window(-WINDOW_JUMP_DAYS),
        KeyCode::Char('+') => app.adjust_window(WINDOW_JUMP_DAYS),
        KeyCode::Char('<') | KeyCode::Char(',') => app.adjust_bars(-BAR_STEP),
        KeyCode::Char('>') | KeyCode::Char('.') => app.adjust_bars(BAR_STEP),
        KeyCode::Char('n') => app.request_next_segment(),
        KeyCode::Char('x') => app.export_current(),

        // Annotations
        KeyCode::Char('t') => {
            app.annotations.cycle_tool();
            let tool = app.annotations.tool.label();
            app.set_status(format!("Tool: {tool}"));
        }
        KeyCode::Char(' ') => app.press_annotation(),
        KeyCode::Char('u') => {
            if app.annotations.erase_last() {
                app.set_status("Erased");
            }
        }
        KeyCode::Char('c') => {
            app.annotations.clear();
            app.set_status("Annotations cleared");
        }

        // Cursor
        KeyCode::Left | KeyCode::Char('h') => app.move_cursor(-stride, 0),
        KeyCode::Right | KeyCode::Char('l') => app.move_cursor(stride, 0),
        KeyCode::Up | KeyCode::Char('k') => app.move_cursor(0, stride),
        KeyCode::Down | KeyCode::Char('j') => app.move_cursor(0, -stride),
        KeyCode::Char('H') => app.move_cursor(-10, 0),
        KeyCode::Char('L') => app.move_cursor(10, 0),
        KeyCode::Char('K') => app.move_cursor(0, 10),
        KeyCode::Char('J') => app.move_cursor(0, -10),
        KeyCode::Home => {
            if let Some(c) = app.cursor.as_mut() {
                c.bar = 0;
            }
        }
        KeyCode::End => app.move_cursor(i64::from(u16::MAX), 0),
        _ => {}
    }
}

fn handle_error_overlay(app: &mut AppState, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('e') => {
            app.overlay = Overlay::None;
        }
        KeyCode::Char('j') | KeyCode::Down => {
            if app.error_scroll + 1 < app.error_history.len() {
                app.error_scroll += 1;
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.error_scroll = app.error_scroll.saturating_sub(1);
        }
        _ => {}
    }
}
