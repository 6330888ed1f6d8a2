//! Data source abstraction for receiving health payloads.
//!
//! Sources hand raw payload bytes to the caller; parsing and validation
//! belong to the [`Ingestor`](crate::data::Ingestor), so a malformed message
//! is rejected in exactly one place.
//!
//! Two kinds of feeds exist:
//!
//! - the root stream, one [`DataSource`] for the process lifetime;
//! - scoped streams, opened per application through a [`ScopedFeed`] while a
//!   detail view is focused and dropped when it closes.

mod channel;
mod file;
mod scoped;
mod snapshot;
mod stream;

pub use channel::ChannelSource;
pub use file::FileSource;
pub use scoped::{ChannelScopedFeed, FileScopedFeed, ScopedFeed};
pub use snapshot::{
    ApplicationPayload, InstancePayload, OrderedMap, RootPayload, ServicePayload,
};
pub use stream::StreamSource;

use std::fmt::Debug;

/// One item delivered by a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feed {
    /// A raw JSON payload.
    Payload(Vec<u8>),
    /// The transport reconnected; the next payload starts a fresh tree.
    Resumed,
}

/// Trait for receiving health payloads from various sources.
///
/// # Example
///
/// ```
/// use upwatch::{DataSource, FileSource};
///
/// let mut source = FileSource::new("status.json");
/// if let Some(feed) = source.poll() {
///     println!("{:?}", feed);
/// }
/// ```
pub trait DataSource: Send + Debug {
    /// Poll for the next item.
    ///
    /// Returns `None` when nothing new is available. Must not block.
    fn poll(&mut self) -> Option<Feed>;

    /// Returns a human-readable description of the source.
    ///
    /// Used for display in the TUI status bar.
    fn description(&self) -> &str;

    /// The most recent transport error, if the source is currently failing.
    fn error(&self) -> Option<String>;
}
