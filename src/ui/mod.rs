//! Terminal widgets for roam

mod select_list;

pub use select_list::ListSelector;

use ratatui::style::Color;

/// Colors for inline widgets; plain ANSI so they follow the user's terminal palette
pub struct Theme {
    pub primary: Color,
    pub muted: Color,
    pub highlight_fg: Color,
    pub highlight_bg: Color,
    pub fg: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary: Color::Cyan,
            muted: Color::DarkGray,
            highlight_fg: Color::Black,
            highlight_bg: Color::Cyan,
            fg: Color::Reset,
        }
    }
}
