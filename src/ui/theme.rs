//! Console colours.

use crossterm::style::{style, Color, Stylize};

/// Colours for console output. A disabled theme emits plain text.
#[derive(Debug, Clone)]
pub struct Theme {
    enabled: bool,
    /// Banner and separators.
    pub accent: Color,
    /// Arrival timestamps.
    pub timestamp: Color,
    /// Topic names.
    pub topic: Color,
    /// Confirmation marks.
    pub ok: Color,
    /// Error reports.
    pub error: Color,
}

impl Theme {
    /// Default ANSI palette.
    pub fn colored() -> Self {
        Self {
            enabled: true,
            accent: Color::Cyan,
            timestamp: Color::DarkGrey,
            topic: Color::Yellow,
            ok: Color::Green,
            error: Color::Red,
        }
    }

    /// No escape codes at all.
    pub fn plain() -> Self {
        Self {
            enabled: false,
            ..Self::colored()
        }
    }

    pub fn new(enabled: bool) -> Self {
        if enabled {
            Self::colored()
        } else {
            Self::plain()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Wrap `text` in `color` when colours are enabled.
    pub fn paint(&self, text: &str, color: Color) -> String {
        if self.enabled {
            style(text).with(color).to_string()
        } else {
            text.to_string()
        }
    }

    /// Bold `text` in `color` when colours are enabled.
    pub fn strong(&self, text: &str, color: Color) -> String {
        if self.enabled {
            style(text).with(color).bold().to_string()
        } else {
            text.to_string()
        }
    }
}
