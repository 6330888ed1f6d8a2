//! Application state and navigation logic.
//!
//! [`App`] is the single writer of every view store: payload arrival, timer
//! ticks and key presses all funnel through `&mut App` on the UI thread.

use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::controller::InteractionController;
use crate::data::{aggregate, AnnotatedTree, Ingestor};
use crate::source::{DataSource, Feed, ScopedFeed};
use crate::ui::Theme;
use crate::view::{
    reconcile, refresh, NodeKey, RenderCommand, Scope, ViewContext, ViewNode, ViewSettings,
    ViewStore,
};

/// How long a status message stays in the status bar.
const STATUS_MESSAGE_TTL: std::time::Duration = std::time::Duration::from_secs(3);

/// Main application state.
pub struct App {
    pub running: bool,
    pub show_help: bool,

    // Root feed
    source: Box<dyn DataSource>,
    ingestor: Ingestor,
    pub tree: Option<AnnotatedTree>,
    pub load_error: Option<String>,
    pub last_update: Option<DateTime<Utc>>,

    // View engine
    store: ViewStore,
    ctx: ViewContext,
    controller: InteractionController<Box<dyn ScopedFeed>>,

    // Navigation state
    pub selected_index: usize,
    pub detail_index: usize,

    // UI
    pub theme: Theme,

    // Status message (temporary feedback)
    pub status_message: Option<(String, Instant)>,
}

impl App {
    /// Create a new App reading the root feed from `source` and opening
    /// detail subscriptions through `feed`.
    pub fn new(
        source: Box<dyn DataSource>,
        feed: Box<dyn ScopedFeed>,
        settings: ViewSettings,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            running: true,
            show_help: false,
            source,
            ingestor: Ingestor::new(),
            tree: None,
            load_error: None,
            last_update: None,
            store: ViewStore::new(Scope::Overview),
            ctx: ViewContext::new(settings, now),
            controller: InteractionController::new(feed),
            selected_index: 0,
            detail_index: 0,
            theme: Theme::auto_detect(),
            status_message: None,
        }
    }

    /// Use an explicit theme instead of the detected one.
    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    /// Returns a description of the current data source.
    pub fn source_description(&self) -> &str {
        self.source.description()
    }

    pub fn store(&self) -> &ViewStore {
        &self.store
    }

    pub fn context(&self) -> &ViewContext {
        &self.ctx
    }

    pub fn controller(&self) -> &InteractionController<Box<dyn ScopedFeed>> {
        &self.controller
    }

    /// Store of the open detail view, if any.
    pub fn detail_store(&self) -> Option<&ViewStore> {
        self.controller.session().map(|s| s.store())
    }

    /// Set a temporary status message that will be shown for a few seconds.
    pub fn set_status_message(&mut self, message: String) {
        self.status_message = Some((message, Instant::now()));
    }

    /// Get the current status message if it hasn't expired.
    pub fn get_status_message(&self) -> Option<&str> {
        match &self.status_message {
            Some((msg, time)) if time.elapsed() < STATUS_MESSAGE_TTL => Some(msg),
            _ => None,
        }
    }

    /// Drain the root source through ingest, aggregate and reconcile.
    ///
    /// Returns true if at least one payload was accepted. A rejected payload
    /// leaves the view exactly as it was and is reported in `load_error`.
    pub fn reload_data(&mut self, now: DateTime<Utc>) -> bool {
        let selected = self.rows().get(self.selected_index).map(|n| n.key().clone());
        let mut commands = Vec::new();
        let mut updated = false;
        while let Some(feed) = self.source.poll() {
            match feed {
                Feed::Resumed => {
                    info!(source = self.source.description(), "feed resumed");
                    self.ingestor.mark_resumed();
                }
                Feed::Payload(bytes) => match self.ingestor.ingest(&bytes) {
                    Ok(snapshot) => {
                        let tree = aggregate(snapshot);
                        commands.extend(reconcile(&mut self.store, &tree, &mut self.ctx, now));
                        self.tree = Some(tree);
                        self.last_update = Some(now);
                        self.load_error = None;
                        updated = true;
                    }
                    Err(e) => {
                        self.load_error = Some(format!("Parse error: {}", e));
                    }
                },
            }
        }

        if !updated {
            if let Some(err) = self.source.error() {
                self.load_error = Some(err);
            }
        }
        // Rows may have moved under the selection; keep it on the same node.
        if let Some(key) = selected {
            self.reveal(&key);
        }
        self.present(&commands, Scope::Overview);
        self.clamp_selection();
        updated
    }

    /// Drain the detail subscription into the detail store.
    pub fn poll_detail(&mut self, now: DateTime<Utc>) -> usize {
        let selected = self.detail_rows().get(self.detail_index).map(|n| n.key().clone());
        let commands = self.controller.poll_detail(&mut self.ctx, now);
        if let Some(key) = selected {
            if let Some(index) = self.detail_rows().iter().position(|n| n.key() == &key) {
                self.detail_index = index;
            }
        }
        self.present(&commands, Scope::Detail);
        self.clamp_selection();
        commands.len()
    }

    /// Periodic work: due timestamp timers in both views, then the detail feed.
    pub fn tick(&mut self, now: DateTime<Utc>) -> usize {
        let mut commands = refresh(&mut self.store, &mut self.ctx, now);
        if let Some(detail) = self.controller.detail_store_mut() {
            commands.extend(refresh(detail, &mut self.ctx, now));
        }
        commands.len() + self.poll_detail(now)
    }

    /// Any key or mouse input.
    pub fn record_activity(&mut self, now: DateTime<Utc>) {
        self.ctx.idle.record_activity(now);
    }

    /// Apply the side effects of render commands that the store alone
    /// does not capture.
    ///
    /// Only overview attention may move the overview selection; the detail
    /// overlay covers it.
    fn present(&mut self, commands: &[RenderCommand], scope: Scope) {
        for command in commands {
            match command {
                RenderCommand::Attention {
                    key,
                    status,
                    reveal,
                } => {
                    self.set_status_message(format!("{} is {}", key, status));
                    if let (Some(target), Scope::Overview) = (reveal, scope) {
                        self.reveal(target);
                    }
                }
                RenderCommand::DetailOpened { app } | RenderCommand::DetailClosed { app } => {
                    let opened = matches!(command, RenderCommand::DetailOpened { .. });
                    debug!(app = %app, opened, "detail surface");
                }
                _ => {}
            }
        }
    }

    /// Move the overview selection onto `key`.
    fn reveal(&mut self, key: &NodeKey) {
        if let Some(index) = self.rows().iter().position(|n| n.key() == key) {
            self.selected_index = index;
        }
    }

    /// Overview rows in display order.
    pub fn rows(&self) -> Vec<&ViewNode> {
        self.store.walk(true)
    }

    /// Detail rows (services and expanded instances) in display order;
    /// empty when no detail is open.
    pub fn detail_rows(&self) -> Vec<&ViewNode> {
        let Some(store) = self.detail_store() else {
            return Vec::new();
        };
        store
            .walk(true)
            .into_iter()
            .filter(|n| !matches!(n.key(), NodeKey::Application(_)))
            .collect()
    }

    /// Key of the selected row in whichever view has focus.
    pub fn selected_key(&self) -> Option<NodeKey> {
        if self.controller.is_focused() {
            self.detail_rows()
                .get(self.detail_index)
                .map(|n| n.key().clone())
        } else {
            self.rows().get(self.selected_index).map(|n| n.key().clone())
        }
    }

    fn row_count(&self) -> usize {
        if self.controller.is_focused() {
            self.detail_rows().len()
        } else {
            self.rows().len()
        }
    }

    fn selection_mut(&mut self) -> &mut usize {
        if self.controller.is_focused() {
            &mut self.detail_index
        } else {
            &mut self.selected_index
        }
    }

    fn clamp_selection(&mut self) {
        let overview = self.rows().len();
        let detail = self.detail_rows().len();
        self.selected_index = self.selected_index.min(overview.saturating_sub(1));
        self.detail_index = self.detail_index.min(detail.saturating_sub(1));
    }

    /// Move selection down by one item.
    pub fn select_next(&mut self) {
        self.select_next_n(1);
    }

    /// Move selection up by one item.
    pub fn select_prev(&mut self) {
        self.select_prev_n(1);
    }

    /// Move selection down by n items.
    pub fn select_next_n(&mut self, n: usize) {
        let max = self.row_count().saturating_sub(1);
        let index = self.selection_mut();
        *index = (*index + n).min(max);
    }

    /// Move selection up by n items.
    pub fn select_prev_n(&mut self, n: usize) {
        let index = self.selection_mut();
        *index = index.saturating_sub(n);
    }

    /// Jump to the first item in the list.
    pub fn select_first(&mut self) {
        *self.selection_mut() = 0;
    }

    /// Jump to the last item in the list.
    pub fn select_last(&mut self) {
        let last = self.row_count().saturating_sub(1);
        *self.selection_mut() = last;
    }

    /// Select a row by its visual position, if it exists.
    pub fn select_row(&mut self, row: usize) {
        if row < self.row_count() {
            *self.selection_mut() = row;
        }
    }

    /// Expand or collapse the selected service.
    pub fn toggle_selected(&mut self) {
        let Some(key) = self.selected_key() else {
            return;
        };
        let store = if self.controller.is_focused() {
            match self.controller.detail_store_mut() {
                Some(store) => store,
                None => return,
            }
        } else {
            &mut self.store
        };
        type Controller = InteractionController<Box<dyn ScopedFeed>>;
        if Controller::toggle_expanded(store, &key).is_some() {
            self.clamp_selection();
        }
    }

    /// Open the detail view for the application of the selected row.
    pub fn enter_detail(&mut self) {
        if self.controller.is_focused() {
            return;
        }
        let Some(app) = self
            .selected_key()
            .and_then(|k| k.application_name().map(str::to_string))
        else {
            return;
        };
        self.open_detail(&app);
    }

    fn open_detail(&mut self, app: &str) {
        match self.controller.focus(app) {
            Ok(commands) => {
                self.detail_index = 0;
                self.present(&commands, Scope::Detail);
            }
            Err(e) => self.set_status_message(format!("Cannot open {}: {}", app, e)),
        }
    }

    /// Navigate back: close help first, then the detail view.
    pub fn go_back(&mut self) {
        if self.show_help {
            self.show_help = false;
            return;
        }
        let commands = self.controller.close(&mut self.ctx);
        self.present(&commands, Scope::Detail);
    }

    /// Follow a location fragment (`""` or `"#app"`).
    pub fn navigate(&mut self, fragment: &str) {
        match self.controller.navigate(fragment, &mut self.ctx) {
            Ok(commands) => {
                self.detail_index = 0;
                self.present(&commands, Scope::Detail);
            }
            Err(e) => self.set_status_message(format!("Cannot open {}: {}", fragment, e)),
        }
    }

    /// Location fragment of the current focus, empty when none.
    pub fn fragment(&self) -> &str {
        self.controller.fragment()
    }

    /// Toggle the help overlay.
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    /// Signal the application to quit.
    pub fn quit(&mut self) {
        self.running = false;
    }

    /// Export the current annotated tree to a file.
    pub fn export_state(&self, path: &Path) -> Result<()> {
        let Some(ref tree) = self.tree else {
            anyhow::bail!("No data to export");
        };
        let json = serde_json::to_string_pretty(tree)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
