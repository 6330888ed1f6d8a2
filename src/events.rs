use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use crossterm::event::{self, Event, KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};

use crate::app::App;

/// File written by the in-app export key.
const EXPORT_PATH: &str = "upwatch_export.json";

/// Poll for events with a timeout
pub fn poll_event(timeout: Duration) -> Result<Option<Event>> {
    if event::poll(timeout)? {
        Ok(Some(event::read()?))
    } else {
        Ok(None)
    }
}

/// Handle a key event
pub fn handle_key_event(app: &mut App, key: KeyEvent, now: DateTime<Utc>) {
    app.record_activity(now);

    // If help is shown, any key closes it
    if app.show_help {
        app.show_help = false;
        return;
    }

    // Detail view has its own list; only closing differs from the overview
    if app.controller().is_focused() {
        match key.code {
            KeyCode::Esc | KeyCode::Backspace | KeyCode::Char('q') => app.go_back(),
            _ => handle_list_key(app, key, now),
        }
        return;
    }

    match key.code {
        KeyCode::Char('q') => app.quit(),

        // Enter detail view for the selected application
        KeyCode::Enter => app.enter_detail(),

        // Help
        KeyCode::Char('?') => app.toggle_help(),

        // Export
        KeyCode::Char('e') => {
            let export_path = std::path::PathBuf::from(EXPORT_PATH);
            match app.export_state(&export_path) {
                Ok(()) => {
                    app.set_status_message(format!("Exported to {}", export_path.display()));
                }
                Err(e) => {
                    app.set_status_message(format!("Export failed: {}", e));
                }
            }
        }

        _ => handle_list_key(app, key, now),
    }
}

/// Keys shared by the overview and the detail list.
fn handle_list_key(app: &mut App, key: KeyEvent, now: DateTime<Utc>) {
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => app.select_prev(),
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::PageUp => app.select_prev_n(10),
        KeyCode::PageDown => app.select_next_n(10),
        KeyCode::Home => app.select_first(),
        KeyCode::End => app.select_last(),

        // Expand/collapse the selected service
        KeyCode::Char(' ') | KeyCode::Right | KeyCode::Left => app.toggle_selected(),

        // Reload
        KeyCode::Char('r') => {
            app.reload_data(now);
            app.poll_detail(now);
        }

        _ => {}
    }
}

/// Handle mouse events
pub fn handle_mouse_event(
    app: &mut App,
    mouse: MouseEvent,
    content_start_row: u16,
    now: DateTime<Utc>,
) {
    app.record_activity(now);

    match mouse.kind {
        MouseEventKind::ScrollUp => app.select_prev(),
        MouseEventKind::ScrollDown => app.select_next(),

        // Click to select; clicking the selected service toggles it
        MouseEventKind::Down(MouseButton::Left) => {
            if mouse.row > content_start_row {
                let row = (mouse.row - content_start_row - 1) as usize;
                let already_selected = if app.controller().is_focused() {
                    app.detail_index == row
                } else {
                    app.selected_index == row
                };
                if already_selected {
                    app.toggle_selected();
                } else {
                    app.select_row(row);
                }
            }
        }

        // Right-click goes back
        MouseEventKind::Down(MouseButton::Right) => app.go_back(),

        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{ChannelSource, Feed, FileScopedFeed};
    use crate::ui::Theme;
    use crate::view::{NodeKey, ViewSettings};
    use chrono::{TimeDelta, TimeZone};
    use crossterm::event::KeyModifiers;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap() + TimeDelta::seconds(secs)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app(dir: &tempfile::TempDir) -> App {
        let (tx, source) = ChannelSource::create("test");
        tx.try_send(Feed::Payload(
            br#"{"applications": {"shop": {"services": {"web": {"instances": {
                "a": {"up": true, "responseTime": 100}
            }}}}}}"#
                .to_vec(),
        ))
        .unwrap();
        let mut app = App::new(
            Box::new(source),
            Box::new(FileScopedFeed::new(dir.path())),
            ViewSettings::default(),
            t(0),
        )
        .with_theme(Theme::dark());
        app.reload_data(t(0));
        app
    }

    #[test]
    fn test_keys_record_activity() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(&dir);
        handle_key_event(&mut app, key(KeyCode::Char('x')), t(500));
        assert_eq!(app.context().idle.idle_for(t(510)), TimeDelta::seconds(10));
    }

    #[test]
    fn test_navigation_and_toggle() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(&dir);
        handle_key_event(&mut app, key(KeyCode::Char('j')), t(1));
        assert_eq!(app.selected_key(), Some(NodeKey::service("shop", "web")));

        handle_key_event(&mut app, key(KeyCode::Char(' ')), t(2));
        assert_eq!(app.rows().len(), 3);
        handle_key_event(&mut app, key(KeyCode::End), t(3));
        assert_eq!(app.selected_key(), Some(NodeKey::instance("shop", "web", "a")));
    }

    #[test]
    fn test_enter_and_escape_detail() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(&dir);
        handle_key_event(&mut app, key(KeyCode::Enter), t(1));
        assert_eq!(app.fragment(), "shop");

        // 'q' closes the detail view instead of quitting.
        handle_key_event(&mut app, key(KeyCode::Char('q')), t(2));
        assert_eq!(app.fragment(), "");
        assert!(app.running);

        handle_key_event(&mut app, key(KeyCode::Char('q')), t(3));
        assert!(!app.running);
    }

    #[test]
    fn test_help_swallows_next_key() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(&dir);
        handle_key_event(&mut app, key(KeyCode::Char('?')), t(1));
        assert!(app.show_help);
        handle_key_event(&mut app, key(KeyCode::Char('q')), t(2));
        assert!(!app.show_help);
        assert!(app.running);
    }
}
