//! Chart theme tokens.
//!
//! Candle colours follow the Asian convention:
//! - **Up**: red `#ef5350`
//! - **Down**: teal `#26a69a`
//!
//! Everything else sits on a near-black background with a cyan accent.

use ratatui::style::{Color, Modifier, Style};

#[derive(Debug, Clone, Copy)]
pub struct Theme {
    /// Near-black background (primary surface)
    pub background: Color,
    /// Cyan accent (focus, highlights)
    pub accent: Color,
    /// Close above open
    pub up: Color,
    /// Close below open
    pub down: Color,
    /// Warnings, pending anchors
    pub warning: Color,
    /// Committed annotations
    pub annotation: Color,
    /// Steel blue (muted text, axes)
    pub muted: Color,
    pub text_primary: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            background: Color::Rgb(18, 18, 20),
            accent: Color::Rgb(0, 255, 255),
            up: Color::Rgb(0xef, 0x53, 0x50),
            down: Color::Rgb(0x26, 0xa6, 0x9a),
            warning: Color::Rgb(255, 140, 0),
            annotation: Color::Rgb(255, 215, 0),
            muted: Color::Rgb(100, 149, 237),
            text_primary: Color::White,
        }
    }

    pub fn candle_color(&self, is_up: bool) -> Color {
        if is_up {
            self.up
        } else {
            self.down
        }
    }
}

// Free style helpers for widgets that do not carry a `Theme`.

pub fn accent() -> Style {
    Style::default().fg(Theme::default().accent)
}

pub fn accent_bold() -> Style {
    accent().add_modifier(Modifier::BOLD)
}

pub fn muted() -> Style {
    Style::default().fg(Theme::default().muted)
}

pub fn warning() -> Style {
    Style::default().fg(Theme::default().warning)
}

pub fn negative() -> Style {
    Style::default().fg(Theme::default().up)
}

pub fn primary() -> Style {
    Style::default().fg(Theme::default().text_primary)
}

pub fn panel_border(active: bool) -> Style {
    if active {
        accent()
    } else {
        muted()
    }
}

pub fn panel_title(active: bool) -> Style {
    if active {
        accent_bold()
    } else {
        muted()
    }
}
