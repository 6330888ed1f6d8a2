//! Detail overlay rendering.
//!
//! Displays a modal overlay for the focused application, fed by its own
//! scoped subscription rather than the root stream.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Table, TableState},
    Frame,
};

use crate::app::App;
use crate::ui::overview;
use crate::view::{Field, NodeKey};

/// Minimum width required for the detail overlay to render properly.
const MIN_OVERLAY_WIDTH: u16 = 50;
/// Minimum height required for the detail overlay to render properly.
const MIN_OVERLAY_HEIGHT: u16 = 12;

/// Render the focused application as a modal overlay.
pub fn render_overlay(frame: &mut Frame, app: &App, area: Rect) {
    // Skip rendering if terminal is too small for the overlay
    if area.width < MIN_OVERLAY_WIDTH || area.height < MIN_OVERLAY_HEIGHT {
        return;
    }
    let Some(session) = app.controller().session() else {
        return;
    };

    // Width: 95% of screen, clamped to [MIN_OVERLAY_WIDTH, 110]
    let overlay_width = (area.width * 95 / 100).clamp(MIN_OVERLAY_WIDTH, 110);
    // Height: 90% of screen, clamped to [MIN_OVERLAY_HEIGHT, 50]
    let overlay_height = (area.height * 90 / 100).clamp(MIN_OVERLAY_HEIGHT, 50);

    let x = area.x + (area.width.saturating_sub(overlay_width)) / 2;
    let y = area.y + (area.height.saturating_sub(overlay_height)) / 2;
    let overlay_area = Rect::new(x, y, overlay_width, overlay_height);

    frame.render_widget(Clear, overlay_area);

    let chunks = Layout::vertical([
        Constraint::Length(4), // Application summary
        Constraint::Min(5),    // Services and instances
        Constraint::Length(1), // Footer
    ])
    .split(overlay_area);

    // ===== HEADER SECTION =====
    let app_node = session.store().get(&NodeKey::application(session.app()));
    let field = |f: Field| app_node.and_then(|n| n.field(f)).unwrap_or("-");
    let class = app_node.and_then(|n| n.field(Field::StatusClass));

    let header_lines = vec![
        Line::from(vec![
            Span::styled(
                format!(" {} ", session.app()),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                class.unwrap_or("waiting for data"),
                app.theme.class_style(class).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            Span::raw(format!(" {}    {}    ", field(Field::Services), field(Field::Instances))),
            Span::styled(
                session.source_description().to_string(),
                Style::default().add_modifier(Modifier::DIM),
            ),
        ]),
    ];

    let header_block = Block::default()
        .title(" Application Detail ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));
    frame.render_widget(Paragraph::new(header_lines).block(header_block), chunks[0]);

    // ===== CONTENT SECTION =====
    let nodes = app.detail_rows();

    let content_block = Block::default()
        .title(format!(
            " Services ({}) ",
            session.store().children(&NodeKey::application(session.app())).len()
        ))
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));

    if nodes.is_empty() {
        let message = session
            .error()
            .unwrap_or_else(|| "No services reported yet".to_string());
        let empty = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                format!("  {}", message),
                Style::default().add_modifier(Modifier::DIM),
            )),
        ])
        .block(content_block);
        frame.render_widget(empty, chunks[1]);
    } else {
        let table = Table::new(overview::rows(&nodes, &app.theme), overview::WIDTHS)
            .header(overview::header(&app.theme))
            .block(content_block)
            .row_highlight_style(app.theme.selected)
            .highlight_symbol("▶ ");

        let mut state = TableState::default();
        state.select(Some(app.detail_index.min(nodes.len() - 1)));
        frame.render_stateful_widget(table, chunks[1], &mut state);
    }

    // ===== FOOTER =====
    let footer = Paragraph::new(Line::from(vec![Span::styled(
        " Space:expand  Esc:close ",
        Style::default().add_modifier(Modifier::DIM),
    )]));
    frame.render_widget(footer, chunks[2]);
}
