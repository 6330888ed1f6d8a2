//! Overview rendering.
//!
//! Displays every application, its services, and the instances of expanded
//! services as one indented table, in first-seen order.

use ratatui::{
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    widgets::{Block, Borders, Cell, Row, Table, TableState},
    Frame,
};

use crate::app::App;
use crate::ui::Theme;
use crate::view::{Field, NodeKey, ViewNode};

/// Column widths shared with the detail overlay.
pub(crate) const WIDTHS: [Constraint; 5] = [
    Constraint::Fill(3),  // Name
    Constraint::Min(9),   // Status
    Constraint::Fill(2),  // Counters
    Constraint::Fill(1),  // Response
    Constraint::Min(10),  // Since
];

/// Render the overview tree.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let nodes = app.rows();

    let title = if nodes.is_empty() {
        " Applications ".to_string()
    } else {
        format!(
            " Applications ({}) [{}/{}] ",
            app.store().applications().len(),
            app.selected_index.min(nodes.len() - 1) + 1,
            nodes.len()
        )
    };

    let table = Table::new(rows(&nodes, &app.theme), WIDTHS)
        .header(header(&app.theme))
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_type(app.theme.border_type)
                .border_style(Style::default().fg(app.theme.border)),
        )
        .row_highlight_style(app.theme.selected)
        .highlight_symbol("▶ ");

    let mut state = TableState::default();
    if !nodes.is_empty() {
        state.select(Some(app.selected_index.min(nodes.len() - 1)));
    }

    frame.render_stateful_widget(table, area, &mut state);
}

pub(crate) fn header(theme: &Theme) -> Row<'static> {
    Row::new(vec![
        Cell::from("Name"),
        Cell::from("Status"),
        Cell::from("Up"),
        Cell::from("Response"),
        Cell::from("Changed"),
    ])
    .height(1)
    .style(theme.header)
}

pub(crate) fn rows<'a>(nodes: &[&'a ViewNode], theme: &Theme) -> Vec<Row<'a>> {
    nodes.iter().map(|node| row(node, theme)).collect()
}

/// One table row built purely from the node's last rendered fields.
fn row<'a>(node: &'a ViewNode, theme: &Theme) -> Row<'a> {
    let class = node.field(Field::StatusClass);
    let status_style = theme.class_style(class);
    let text = |field: Field| node.field(field).unwrap_or("-");

    let (name, counters) = match node.key() {
        NodeKey::Application(name) => (
            name.clone(),
            format!("{}  {}", text(Field::Services), text(Field::Instances)),
        ),
        NodeKey::Service(_, name) => {
            let marker = if node.is_expanded() { "▾" } else { "▸" };
            (format!("  {} {}", marker, name), text(Field::Counters).to_string())
        }
        NodeKey::Instance(_, _, id) => (format!("      {}", id), String::new()),
        NodeKey::Root => (String::new(), String::new()),
    };

    let name_style = match node.key() {
        NodeKey::Application(_) => Style::default().add_modifier(Modifier::BOLD),
        NodeKey::Instance(..) => Style::default().add_modifier(Modifier::DIM),
        _ => Style::default(),
    };

    Row::new(vec![
        Cell::from(name).style(name_style),
        Cell::from(class.unwrap_or("-")).style(status_style),
        Cell::from(counters),
        Cell::from(node.field(Field::ResponseTime).unwrap_or("")),
        Cell::from(node.field(Field::Elapsed).unwrap_or("")),
    ])
}
