use ratatui::style::{Color, Modifier, Style};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::core::FilterStatus;

/// Theme selected in the config file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ThemeName {
    #[default]
    Dark,
    Light,
}

/// A theme defines the color scheme for the TUI
#[derive(Debug, Clone)]
pub struct Theme {
    pub name: String,

    // General UI colors
    pub background: Color,
    pub foreground: Color,
    pub border: Color,
    pub border_focused: Color,

    // Table colors
    pub header_fg: Color,
    pub header_bg: Color,
    pub selected_fg: Color,
    pub selected_bg: Color,
    pub row_alt_bg: Color, // For zebra striping

    // Filter tokens
    pub operator_fg: Color,
    pub paren_fg: Color,
    pub complete_fg: Color,
    pub incomplete_fg: Color,
    pub empty_fg: Color,

    // Status/feedback colors
    pub success: Color,
    pub error: Color,
    pub warning: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    pub fn from_name(name: ThemeName) -> Self {
        match name {
            ThemeName::Dark => Self::dark(),
            ThemeName::Light => Self::light(),
        }
    }

    /// Default dark theme
    pub fn dark() -> Self {
        Self {
            name: "Default Dark".to_string(),
            background: Color::Reset,
            foreground: Color::Gray,
            border: Color::DarkGray,
            border_focused: Color::Cyan,
            header_fg: Color::Cyan,
            header_bg: Color::Reset,
            selected_fg: Color::Black,
            selected_bg: Color::Cyan,
            row_alt_bg: Color::Rgb(25, 25, 35),
            operator_fg: Color::Magenta,
            paren_fg: Color::DarkGray,
            complete_fg: Color::Green,
            incomplete_fg: Color::Yellow,
            empty_fg: Color::DarkGray,
            success: Color::Green,
            error: Color::Red,
            warning: Color::Yellow,
        }
    }

    /// Light theme
    pub fn light() -> Self {
        Self {
            name: "Light".to_string(),
            background: Color::White,
            foreground: Color::Black,
            border: Color::Gray,
            border_focused: Color::Blue,
            header_fg: Color::Blue,
            header_bg: Color::Rgb(240, 240, 240),
            selected_fg: Color::White,
            selected_bg: Color::Blue,
            row_alt_bg: Color::Rgb(250, 250, 250),
            operator_fg: Color::Rgb(140, 0, 140),
            paren_fg: Color::Gray,
            complete_fg: Color::Rgb(0, 120, 0),
            incomplete_fg: Color::Rgb(200, 150, 0), // Darker yellow for light bg
            empty_fg: Color::Gray,
            success: Color::Green,
            error: Color::Red,
            warning: Color::Rgb(200, 150, 0),
        }
    }

    pub fn header_style(&self) -> Style {
        Style::default()
            .fg(self.header_fg)
            .bg(self.header_bg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn selected_style(&self) -> Style {
        Style::default()
            .fg(self.selected_fg)
            .bg(self.selected_bg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn normal_style(&self) -> Style {
        Style::default().fg(self.foreground).bg(self.background)
    }

    pub fn alt_row_style(&self) -> Style {
        Style::default().fg(self.foreground).bg(self.row_alt_bg)
    }

    pub fn border_style(&self) -> Style {
        Style::default().fg(self.border)
    }

    pub fn focused_border_style(&self) -> Style {
        Style::default().fg(self.border_focused)
    }

    /// Leaf token colored by completion
    pub fn leaf_style(&self, status: FilterStatus) -> Style {
        let fg = match status {
            FilterStatus::Complete => self.complete_fg,
            FilterStatus::Incomplete => self.incomplete_fg,
            FilterStatus::Empty => self.empty_fg,
        };
        let style = Style::default().fg(fg);
        if status == FilterStatus::Empty {
            style.add_modifier(Modifier::ITALIC)
        } else {
            style
        }
    }

    pub fn operator_style(&self) -> Style {
        Style::default()
            .fg(self.operator_fg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn paren_style(&self) -> Style {
        Style::default().fg(self.paren_fg)
    }

    /// The selected leaf inside a filter cell or the mirror panel
    pub fn selected_token_style(&self) -> Style {
        Style::default()
            .fg(Color::Black)
            .bg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    }

    pub fn error_style(&self) -> Style {
        Style::default().fg(self.error)
    }

    pub fn success_style(&self) -> Style {
        Style::default().fg(self.success)
    }

    pub fn warning_style(&self) -> Style {
        Style::default().fg(self.warning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_theme() {
        let theme = Theme::default();
        assert_eq!(theme.name, "Default Dark");
        assert_ne!(theme.header_fg, Color::Reset);
        assert_ne!(theme.selected_bg, Color::Reset);
    }

    #[test]
    fn test_theme_from_name() {
        let theme = Theme::from_name("light".parse().unwrap());
        assert_eq!(theme.name, "Light");
        assert_eq!(theme.background, Color::White);
    }

    #[test]
    fn test_leaf_styles_follow_status() {
        let theme = Theme::default();
        assert_eq!(theme.leaf_style(FilterStatus::Complete).fg, Some(theme.complete_fg));
        assert_eq!(theme.leaf_style(FilterStatus::Incomplete).fg, Some(theme.incomplete_fg));
        assert!(theme
            .leaf_style(FilterStatus::Empty)
            .add_modifier
            .contains(Modifier::ITALIC));
        assert!(theme.operator_style().add_modifier.contains(Modifier::BOLD));
    }
}
