//! Scoped (per-application) feeds for detail views.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{bail, Result};
use tokio::sync::mpsc;

use super::{ChannelSource, DataSource, FileSource};

/// Opens the narrower feed for one application while its detail view is focused.
///
/// The returned source delivers application-subtree payloads
/// (`{"services": {...}}`). Dropping it closes the subscription.
pub trait ScopedFeed: Send + std::fmt::Debug {
    fn open(&mut self, app: &str) -> Result<Box<dyn DataSource>>;
}

impl<F: ScopedFeed + ?Sized> ScopedFeed for Box<F> {
    fn open(&mut self, app: &str) -> Result<Box<dyn DataSource>> {
        (**self).open(app)
    }
}

/// Reads `<dir>/<app>.json` for each focused application.
#[derive(Debug, Clone)]
pub struct FileScopedFeed {
    dir: PathBuf,
}

impl FileScopedFeed {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }
}

impl ScopedFeed for FileScopedFeed {
    fn open(&mut self, app: &str) -> Result<Box<dyn DataSource>> {
        if app.is_empty() || app.contains(['/', '\\']) || app == ".." {
            bail!("Invalid application name for a file feed: {:?}", app);
        }
        let path = self.dir.join(format!("{}.json", app));
        Ok(Box::new(FileSource::new(path)))
    }
}

/// Hands out channel-backed sources; the matching senders are kept for the host.
///
/// Each `open` replaces the sender registered for that application, so the
/// host always pushes into the live subscription.
#[derive(Debug, Default)]
pub struct ChannelScopedFeed {
    senders: HashMap<String, mpsc::Sender<super::Feed>>,
    opened: usize,
}

impl ChannelScopedFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sender for the currently open subscription of `app`, if any.
    pub fn sender(&self, app: &str) -> Option<mpsc::Sender<super::Feed>> {
        self.senders
            .get(app)
            .filter(|tx| !tx.is_closed())
            .cloned()
    }

    /// Total number of subscriptions opened so far.
    pub fn opened(&self) -> usize {
        self.opened
    }

    /// Number of subscriptions whose receiving side is still alive.
    pub fn open_count(&self) -> usize {
        self.senders.values().filter(|tx| !tx.is_closed()).count()
    }
}

impl ScopedFeed for ChannelScopedFeed {
    fn open(&mut self, app: &str) -> Result<Box<dyn DataSource>> {
        let (tx, source) = ChannelSource::create(&format!("detail:{}", app));
        self.senders.insert(app.to_string(), tx);
        self.opened += 1;
        Ok(Box::new(source))
    }
}
