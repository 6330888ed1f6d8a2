//! Theme configuration for the TUI.
//!
//! Supports light and dark themes with automatic terminal detection.

use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::block::BorderType;

use crate::data::Status;

/// Color and style theme for the TUI.
///
/// Use [`Theme::auto_detect()`] for automatic theme selection based on
/// terminal background, or [`Theme::dark()`]/[`Theme::light()`] explicitly.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Accent color for highlights and active elements.
    pub highlight: Color,
    /// Color for degraded status.
    pub degraded: Color,
    /// Color for failed status.
    pub failed: Color,
    /// Color for up status.
    pub up: Color,
    /// Color for borders and separators.
    pub border: Color,
    /// Style for header rows in tables.
    pub header: Style,
    /// Style for selected/highlighted rows.
    pub selected: Style,
    /// Style for the row revealed by an attention signal.
    pub attention: Style,
    /// Border style (rounded, plain, etc.).
    pub border_type: BorderType,
}

impl Theme {
    /// Create a dark theme suitable for dark terminal backgrounds.
    pub fn dark() -> Self {
        Self {
            highlight: Color::Cyan,
            degraded: Color::Yellow,
            failed: Color::Red,
            up: Color::Green,
            border: Color::Gray,
            header: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            selected: Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD),
            attention: Style::default().fg(Color::Red).add_modifier(Modifier::REVERSED),
            border_type: BorderType::Rounded,
        }
    }

    /// Create a light theme suitable for light terminal backgrounds.
    pub fn light() -> Self {
        Self {
            highlight: Color::Blue,
            degraded: Color::Yellow,
            failed: Color::Red,
            up: Color::Green,
            border: Color::DarkGray,
            header: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            selected: Style::default().bg(Color::LightBlue).add_modifier(Modifier::BOLD),
            attention: Style::default().fg(Color::Red).add_modifier(Modifier::REVERSED),
            border_type: BorderType::Rounded,
        }
    }

    /// Auto-detect based on terminal background
    pub fn auto_detect() -> Self {
        // Use terminal-light crate to detect background luminance
        match terminal_light::luma() {
            Ok(luma) if luma > 0.5 => Self::light(),
            _ => Self::dark(),
        }
    }

    /// Get style for a health status
    pub fn status_style(&self, status: Status) -> Style {
        match status {
            Status::Up => Style::default().fg(self.up),
            Status::Degraded => Style::default().fg(self.degraded),
            Status::Failed => Style::default().fg(self.failed).add_modifier(Modifier::BOLD),
        }
    }

    /// Style for a rendered status class (`up`/`degraded`/`failed`).
    ///
    /// Unknown classes render unstyled.
    pub fn class_style(&self, class: Option<&str>) -> Style {
        match class {
            Some("up") => self.status_style(Status::Up),
            Some("degraded") => self.status_style(Status::Degraded),
            Some("failed") => self.status_style(Status::Failed),
            _ => Style::default(),
        }
    }
}
