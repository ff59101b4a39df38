//! Tray-style status output.

use serde::Serialize;

pub const READY_TOKEN: &str = "RDY";
pub const ERROR_TOKEN: &str = "ERR";
pub const LOADING_TOKEN: &str = "...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusColor {
    Green,
    Black,
    Red,
    Navy,
}

impl StatusColor {
    pub fn rgba(self) -> [u8; 4] {
        match self {
            StatusColor::Green => [0, 128, 0, 255],
            StatusColor::Black => [0, 0, 0, 255],
            StatusColor::Red => [255, 0, 0, 255],
            StatusColor::Navy => [0, 0, 128, 255],
        }
    }
}

pub trait StatusDisplay: Send + Sync {
    fn show_loading(&self);

    fn show_text(&self, text: &str, color: StatusColor);

    fn show_ready(&self) {
        self.show_text(READY_TOKEN, StatusColor::Green);
    }

    fn show_error(&self) {
        self.show_text(ERROR_TOKEN, StatusColor::Red);
    }
}

/// Cut `text` to at most `max_chars` characters, marking the cut with "...".
pub fn truncate_for_display(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars).collect();
    cut.push_str("...");
    cut
}
