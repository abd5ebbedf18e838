//! TUI color theme
//!
//! HUD-inspired color scheme for the terminal interface

use ratatui::style::Color;

// HUD color scheme (F-35 inspired)
pub const HUD_GREEN: Color = Color::Rgb(0, 255, 0);
pub const CRITICAL_RED: Color = Color::Rgb(255, 0, 0);
pub const CAUTION_AMBER: Color = Color::Rgb(255, 191, 0);
pub const INFO_DIM: Color = Color::Rgb(0, 180, 0);

/// Brackets drawn around the selected row
pub const SEL_LEFT: &str = "<";
pub const SEL_RIGHT: &str = ">";

/// Color for a listing row, by what the row stands for
///
/// Placeholder rows (unresolved references, schema errors) are flagged so a
/// broken field stands out from real data.
#[must_use]
pub fn row_color(row: &str) -> Color {
    if row.starts_with("<schema error") {
        CRITICAL_RED
    } else if row.starts_with("<unresolved") || row.ends_with("=<unresolved>") {
        CAUTION_AMBER
    } else {
        HUD_GREEN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_rows_are_flagged() {
        assert_eq!(row_color("<schema error: Leak.x: bad>"), CRITICAL_RED);
        assert_eq!(row_color("com.example.Leak.next=<unresolved>"), CAUTION_AMBER);
        assert_eq!(row_color("com.example.Leak.size=3"), HUD_GREEN);
    }
}
