//! Common UI components shared across views.
//!
//! This module contains the header bar, status bar, and help overlay.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;
use crate::view::{Field, NodeKey};

/// Render the header bar with fleet-wide totals.
///
/// Displays: status indicator, application/service/instance counters.
pub fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let Some(root) = app.store().get(&NodeKey::Root) else {
        let line = Line::from(vec![
            Span::styled(" UPWATCH ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("| Loading..."),
        ]);
        frame.render_widget(Paragraph::new(line), area);
        return;
    };

    let class = root.field(Field::StatusClass);
    let field = |f: Field| root.field(f).unwrap_or("-").to_string();

    let line = Line::from(vec![
        Span::styled(" ● ", app.theme.class_style(class)),
        Span::styled("UPWATCH ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("│ "),
        Span::styled(
            class.unwrap_or("-").to_uppercase(),
            app.theme.class_style(class).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" │ "),
        Span::raw(field(Field::Applications)),
        Span::raw(" │ "),
        Span::raw(field(Field::Services)),
        Span::raw(" │ "),
        Span::raw(field(Field::Instances)),
    ]);

    frame.render_widget(Paragraph::new(line), area);
}

/// Render the status bar at the bottom.
///
/// Shows: source, location fragment, time since last update, available
/// controls. Also displays temporary status messages and errors.
pub fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    // Check for temporary status message first
    if let Some(msg) = app.get_status_message() {
        let paragraph = Paragraph::new(format!(" {} ", msg)).style(app.theme.attention);
        frame.render_widget(paragraph, area);
        return;
    }

    let fragment = format!("#{}", app.fragment());
    let controls = if app.controller().is_focused() {
        "↑↓:select Space:expand Esc:close ?:help"
    } else {
        "↑↓:select Space:expand Enter:detail ?:help q:quit"
    };

    let status = if let Some(ref err) = app.load_error {
        format!(" {} | {} | Error: {} | r:retry q:quit", app.source_description(), fragment, err)
    } else if let Some(updated) = app.last_update {
        let elapsed = chrono::Utc::now() - updated;
        format!(
            " {} | {} | Updated {:.1}s ago | {}",
            app.source_description(),
            fragment,
            elapsed.num_milliseconds().max(0) as f64 / 1000.0,
            controls,
        )
    } else {
        format!(" {} | Loading... | q:quit", app.source_description())
    };

    let paragraph = Paragraph::new(status).style(Style::default().add_modifier(Modifier::DIM));

    frame.render_widget(paragraph, area);
}

/// Render the help overlay with keyboard shortcuts.
///
/// Displayed as a centered modal on top of the current view.
pub fn render_help(frame: &mut Frame, app: &App, area: Rect) {
    let help_text = vec![
        Line::from(vec![Span::styled("Keyboard Shortcuts", app.theme.header)]),
        Line::from(""),
        Line::from(vec![Span::styled(
            " Navigation",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from("  ↑/↓ j/k     Navigate list"),
        Line::from("  PgUp/PgDn   Jump 10 items"),
        Line::from("  Home/End    Jump to first/last"),
        Line::from("  Space ←/→   Expand/collapse service"),
        Line::from("  Enter       Open application detail"),
        Line::from("  Esc         Close detail"),
        Line::from(""),
        Line::from(vec![Span::styled(
            " General",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from("  r         Reload data"),
        Line::from("  e         Export to JSON"),
        Line::from("  q         Quit"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Press any key to close",
            Style::default().add_modifier(Modifier::DIM),
        )]),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));

    let paragraph = Paragraph::new(help_text).block(block);

    // Center the help overlay - responsive to terminal size
    let help_width = 44u16.min(area.width.saturating_sub(4));
    let help_height = 20u16.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(help_width)) / 2;
    let y = area.y + (area.height.saturating_sub(help_height)) / 2;
    let help_area = Rect::new(x, y, help_width, help_height);

    // Clear the area behind the help
    frame.render_widget(ratatui::widgets::Clear, help_area);
    frame.render_widget(paragraph, help_area);
}
