//! Focus state machine for the per-application detail view.
//!
//! ```text
//!            focus(app)               close()
//!   Idle ───────────────▶ Focused ───────────────▶ Idle
//!    ▲  close(): no-op      │  focus(_): no-op
//!    └──────────────────────┘
//! ```
//!
//! `navigate` to another application opens the new subscription before
//! closing the current one.
//!
//! While focused, exactly one scoped subscription is open. Its payloads go
//! through a dedicated [`Ingestor`] into a detail [`ViewStore`] that lives
//! only as long as the focus does.

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::data::{aggregate, Ingestor};
use crate::source::{DataSource, Feed, ScopedFeed};
use crate::view::{reconcile, NodeKey, RenderCommand, Scope, ViewContext, ViewStore};

/// State owned while one application is focused.
#[derive(Debug)]
pub struct DetailSession {
    app: String,
    source: Box<dyn DataSource>,
    ingestor: Ingestor,
    store: ViewStore,
    last_error: Option<String>,
}

impl DetailSession {
    pub fn app(&self) -> &str {
        &self.app
    }

    pub fn store(&self) -> &ViewStore {
        &self.store
    }

    pub fn source_description(&self) -> &str {
        self.source.description()
    }

    /// Last payload or transport error of the scoped feed.
    pub fn error(&self) -> Option<String> {
        self.last_error.clone().or_else(|| self.source.error())
    }
}

/// Current focus.
#[derive(Debug, Default)]
pub enum Focus {
    #[default]
    Idle,
    Focused(DetailSession),
}

/// Owns the focus key and the detail subscription it implies.
#[derive(Debug)]
pub struct InteractionController<F: ScopedFeed> {
    focus: Focus,
    feed: F,
}

impl<F: ScopedFeed> InteractionController<F> {
    pub fn new(feed: F) -> Self {
        Self {
            focus: Focus::Idle,
            feed,
        }
    }

    pub fn feed(&self) -> &F {
        &self.feed
    }

    pub fn focus_state(&self) -> &Focus {
        &self.focus
    }

    pub fn is_focused(&self) -> bool {
        matches!(self.focus, Focus::Focused(_))
    }

    pub fn session(&self) -> Option<&DetailSession> {
        match &self.focus {
            Focus::Focused(session) => Some(session),
            Focus::Idle => None,
        }
    }

    /// Store of the open detail view.
    pub fn detail_store_mut(&mut self) -> Option<&mut ViewStore> {
        match &mut self.focus {
            Focus::Focused(session) => Some(&mut session.store),
            Focus::Idle => None,
        }
    }

    /// Focus `app`, opening its scoped subscription.
    ///
    /// Does nothing while another focus (or the same one) is open. If the
    /// subscription cannot be opened the controller stays idle.
    pub fn focus(&mut self, app: &str) -> Result<Vec<RenderCommand>> {
        if let Focus::Focused(session) = &self.focus {
            debug!(requested = app, focused = %session.app, "already focused");
            return Ok(Vec::new());
        }
        let session = self.open_session(app)?;
        Ok(self.install(session))
    }

    fn open_session(&mut self, app: &str) -> Result<DetailSession> {
        let source = self.feed.open(app)?;
        info!(app, source = source.description(), "detail opened");
        Ok(DetailSession {
            app: app.to_string(),
            source,
            ingestor: Ingestor::new(),
            store: ViewStore::new(Scope::Detail),
            last_error: None,
        })
    }

    fn install(&mut self, session: DetailSession) -> Vec<RenderCommand> {
        let app = session.app.clone();
        self.focus = Focus::Focused(session);
        vec![RenderCommand::DetailOpened { app }]
    }

    /// Close the detail view, dropping its subscription, nodes and timers.
    ///
    /// Closing while idle is a no-op.
    pub fn close(&mut self, ctx: &mut ViewContext) -> Vec<RenderCommand> {
        match std::mem::take(&mut self.focus) {
            Focus::Idle => Vec::new(),
            Focus::Focused(session) => {
                let cancelled = ctx.timers.cancel_scope(Scope::Detail);
                info!(app = %session.app, cancelled, "detail closed");
                vec![RenderCommand::DetailClosed { app: session.app }]
            }
        }
    }

    /// Follow a location fragment: empty means no focus.
    ///
    /// A fragment naming another application switches the detail view.
    /// If the new subscription cannot be opened, the current focus stays.
    pub fn navigate(&mut self, fragment: &str, ctx: &mut ViewContext) -> Result<Vec<RenderCommand>> {
        let app = fragment.trim_start_matches('#');
        if app == self.fragment() {
            return Ok(Vec::new());
        }
        if app.is_empty() {
            return Ok(self.close(ctx));
        }
        let session = self.open_session(app)?;
        let mut commands = self.close(ctx);
        commands.extend(self.install(session));
        Ok(commands)
    }

    /// The location fragment for the current focus, empty when idle.
    pub fn fragment(&self) -> &str {
        match &self.focus {
            Focus::Focused(session) => &session.app,
            Focus::Idle => "",
        }
    }

    /// Drain the scoped feed into the detail store.
    pub fn poll_detail(&mut self, ctx: &mut ViewContext, now: DateTime<Utc>) -> Vec<RenderCommand> {
        let Focus::Focused(session) = &mut self.focus else {
            return Vec::new();
        };
        let mut commands = Vec::new();
        while let Some(feed) = session.source.poll() {
            match feed {
                Feed::Resumed => session.ingestor.mark_resumed(),
                Feed::Payload(bytes) => {
                    match session.ingestor.ingest_application(&session.app, &bytes) {
                        Ok(snapshot) => {
                            session.last_error = None;
                            let tree = aggregate(snapshot);
                            commands.extend(reconcile(&mut session.store, &tree, ctx, now));
                        }
                        Err(e) => {
                            warn!(app = %session.app, error = %e, "detail payload rejected");
                            session.last_error = Some(e.to_string());
                        }
                    }
                }
            }
        }
        commands
    }

    /// Flip a service's instance table open or closed.
    ///
    /// Only service nodes are expandable; anything else is ignored.
    pub fn toggle_expanded(store: &mut ViewStore, key: &NodeKey) -> Option<RenderCommand> {
        if !matches!(key, NodeKey::Service(..)) {
            return None;
        }
        let node = store.get_mut(key)?;
        node.expanded = !node.expanded;
        Some(RenderCommand::Expand {
            key: key.clone(),
            expanded: node.expanded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{ChannelScopedFeed, FileScopedFeed};
    use crate::view::{Field, ViewSettings};
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap() + chrono::TimeDelta::seconds(secs)
    }

    fn setup() -> (InteractionController<ChannelScopedFeed>, ViewContext) {
        (
            InteractionController::new(ChannelScopedFeed::new()),
            ViewContext::new(ViewSettings::default(), t(0)),
        )
    }

    const DETAIL: &[u8] = br#"{"services": {"web": {"instances": {
        "a": {"up": true, "responseTime": 100, "lastChange": "2024-01-01T12:00:00Z"},
        "b": {"up": false, "responseTime": 300}
    }}}}"#;

    #[test]
    fn test_focus_opens_one_subscription() {
        let (mut controller, _ctx) = setup();
        let commands = controller.focus("shop").unwrap();
        assert_eq!(
            commands,
            vec![RenderCommand::DetailOpened {
                app: "shop".to_string()
            }]
        );
        assert_eq!(controller.fragment(), "shop");

        // Same or different key while focused: nothing happens.
        assert!(controller.focus("shop").unwrap().is_empty());
        assert!(controller.focus("blog").unwrap().is_empty());
        assert_eq!(controller.feed().opened(), 1);
        assert_eq!(controller.feed().open_count(), 1);
        assert_eq!(controller.fragment(), "shop");
    }

    #[test]
    fn test_close_is_idempotent() {
        let (mut controller, mut ctx) = setup();
        assert!(controller.close(&mut ctx).is_empty());

        controller.focus("shop").unwrap();
        assert_eq!(
            controller.close(&mut ctx),
            vec![RenderCommand::DetailClosed {
                app: "shop".to_string()
            }]
        );
        assert!(controller.close(&mut ctx).is_empty());
        assert!(!controller.is_focused());
        assert_eq!(controller.feed().open_count(), 0);
        assert_eq!(controller.fragment(), "");
    }

    #[test]
    fn test_poll_detail_builds_store() {
        let (mut controller, mut ctx) = setup();
        controller.focus("shop").unwrap();
        let tx = controller.feed().sender("shop").unwrap();
        tx.try_send(Feed::Payload(DETAIL.to_vec())).unwrap();

        let commands = controller.poll_detail(&mut ctx, t(3));
        assert!(commands.iter().any(|c| c.is_attention()));

        let store = controller.session().unwrap().store();
        assert_eq!(store.scope(), Scope::Detail);
        let web = store.get(&NodeKey::service("shop", "web")).unwrap();
        assert_eq!(web.field(Field::Counters), Some("1/2 up"));
        assert_eq!(ctx.timers.active_for(Scope::Detail, &NodeKey::instance("shop", "web", "a")), 1);

        // Nothing new queued.
        assert!(controller.poll_detail(&mut ctx, t(3)).is_empty());
    }

    #[test]
    fn test_close_clears_detail_state() {
        let (mut controller, mut ctx) = setup();
        controller.focus("shop").unwrap();
        let tx = controller.feed().sender("shop").unwrap();
        tx.try_send(Feed::Payload(DETAIL.to_vec())).unwrap();
        controller.poll_detail(&mut ctx, t(1));
        assert_eq!(ctx.timers.len(), 1);

        controller.close(&mut ctx);
        assert!(ctx.timers.is_empty());
        assert!(controller.session().is_none());

        // Reopening starts from an empty store.
        controller.focus("shop").unwrap();
        assert!(controller.session().unwrap().store().is_empty());
        assert_eq!(controller.feed().opened(), 2);
    }

    #[test]
    fn test_rejected_detail_payload_keeps_store() {
        let (mut controller, mut ctx) = setup();
        controller.focus("shop").unwrap();
        let tx = controller.feed().sender("shop").unwrap();
        tx.try_send(Feed::Payload(DETAIL.to_vec())).unwrap();
        tx.try_send(Feed::Payload(b"{not json".to_vec())).unwrap();

        controller.poll_detail(&mut ctx, t(1));
        let session = controller.session().unwrap();
        assert!(session.error().is_some());
        assert_eq!(session.store().len(), 5);
    }

    #[test]
    fn test_navigate_by_fragment() {
        let (mut controller, mut ctx) = setup();
        controller.navigate("#shop", &mut ctx).unwrap();
        assert_eq!(controller.fragment(), "shop");
        assert!(controller.navigate("shop", &mut ctx).unwrap().is_empty());

        let commands = controller.navigate("#blog", &mut ctx).unwrap();
        assert_eq!(
            commands,
            vec![
                RenderCommand::DetailClosed { app: "shop".to_string() },
                RenderCommand::DetailOpened { app: "blog".to_string() },
            ]
        );
        assert_eq!(controller.fragment(), "blog");
        assert_eq!(controller.feed().open_count(), 1);

        controller.navigate("", &mut ctx).unwrap();
        assert!(!controller.is_focused());
    }

    #[test]
    fn test_failed_navigation_keeps_current_focus() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = InteractionController::new(FileScopedFeed::new(dir.path()));
        let mut ctx = ViewContext::new(ViewSettings::default(), t(0));

        controller.navigate("#shop", &mut ctx).unwrap();
        assert!(controller.navigate("#../etc", &mut ctx).is_err());
        assert_eq!(controller.fragment(), "shop");

        let commands = controller.navigate("", &mut ctx).unwrap();
        assert_eq!(
            commands,
            vec![RenderCommand::DetailClosed { app: "shop".to_string() }]
        );
    }

    #[test]
    fn test_toggle_expanded_services_only() {
        let mut store = ViewStore::new(Scope::Overview);
        let web = NodeKey::service("shop", "web");
        store.ensure(&NodeKey::Root);
        store.ensure(&NodeKey::application("shop"));
        store.ensure(&web);

        type Controller = InteractionController<ChannelScopedFeed>;
        assert_eq!(
            Controller::toggle_expanded(&mut store, &web),
            Some(RenderCommand::Expand {
                key: web.clone(),
                expanded: true
            })
        );
        assert!(store.get(&web).unwrap().is_expanded());
        Controller::toggle_expanded(&mut store, &web);
        assert!(!store.get(&web).unwrap().is_expanded());

        assert!(Controller::toggle_expanded(&mut store, &NodeKey::application("shop")).is_none());
        assert!(Controller::toggle_expanded(&mut store, &NodeKey::service("shop", "db")).is_none());
    }
}
