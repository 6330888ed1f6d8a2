//! # upwatch
//!
//! A terminal dashboard and library for application/service/instance health.
//!
//! Health payloads arrive from a file, a TCP stream or an in-process channel,
//! possibly as sparse updates. The crate merges them into the last known
//! tree, derives a worst-of-children status at every level, and keeps a
//! persistent view model that changes only where the data changed.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                           Application                            │
//! │  ┌─────────┐   ┌──────────┐   ┌───────────┐   ┌──────────────┐   │
//! │  │ source  │──▶│  data    │──▶│   view    │──▶│  ui (ratatui)│   │
//! │  │ (bytes) │   │ ingest + │   │ reconcile │   │              │   │
//! │  └─────────┘   │ aggregate│   │ + refresh │   └──────────────┘   │
//! │                └──────────┘   └─────▲─────┘                      │
//! │                                     │                            │
//! │  ┌────────────┐   ┌─────────────────┴──┐                         │
//! │  │   events   │──▶│ app + controller   │◀── ScopedFeed (detail)  │
//! │  └────────────┘   └────────────────────┘                         │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`source`]**: Data source abstraction ([`DataSource`] trait) delivering raw
//!   payloads from files, TCP streams and channels, plus per-application
//!   [`ScopedFeed`](source::ScopedFeed)s for the detail view
//! - **[`data`]**: Sparse-update ingestion ([`Ingestor`]) and pure status
//!   aggregation ([`aggregate()`])
//! - **[`view`]**: Keyed view store, reconciler emitting [`RenderCommand`]s,
//!   timestamp timers and the idle tracker
//! - **[`controller`]**: Focus state machine owning at most one detail subscription
//! - **[`app`]**: Single owner of all of the above, driven by the UI loop
//! - **[`ui`]**: Terminal rendering of the view store
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Watch a JSON file
//! upwatch --file status.json
//!
//! # Watch a live feed, reconnecting when it drops
//! upwatch --connect localhost:9090 --detail-dir ./apps
//! ```
//!
//! ### As a library
//!
//! ```
//! use upwatch::{aggregate, reconcile, Ingestor, Scope, Status, ViewContext, ViewSettings, ViewStore};
//!
//! let mut ingestor = Ingestor::new();
//! let snapshot = ingestor
//!     .ingest(br#"{"applications": {"shop": {"services": {"web": {"instances": {
//!         "a": {"up": true, "responseTime": 120},
//!         "b": {"up": false, "responseTime": 0}
//!     }}}}}}"#)
//!     .unwrap();
//!
//! let tree = aggregate(snapshot);
//! assert_eq!(tree.status, Status::Degraded);
//!
//! let now = chrono::Utc::now();
//! let mut store = ViewStore::new(Scope::Overview);
//! let mut ctx = ViewContext::new(ViewSettings::default(), now);
//! let commands = reconcile(&mut store, &tree, &mut ctx, now);
//! assert!(commands.iter().any(|c| c.is_attention()));
//!
//! // Nothing changed, nothing to draw.
//! assert!(reconcile(&mut store, &tree, &mut ctx, now).is_empty());
//! ```
//!
//! ### With a channel source (for message bus integration)
//!
//! ```
//! use upwatch::{App, ChannelScopedFeed, ChannelSource, ViewSettings};
//!
//! let (tx, source) = ChannelSource::create("bus://status");
//! let app = App::new(
//!     Box::new(source),
//!     Box::new(ChannelScopedFeed::new()),
//!     ViewSettings::default(),
//!     chrono::Utc::now(),
//! );
//! ```
//!
//! ### Bridging raw bytes from another transport
//!
//! ```no_run
//! use upwatch::StreamSource;
//! use tokio::sync::mpsc;
//!
//! # tokio_test::block_on(async {
//! let (tx, rx) = mpsc::channel::<Vec<u8>>(16);
//! let source = StreamSource::from_bytes_channel(rx, "bus");
//! # });
//! ```

pub mod app;
pub mod config;
pub mod controller;
pub mod data;
pub mod error;
pub mod events;
pub mod source;
pub mod ui;
pub mod view;

// Re-export main types for convenience
pub use app::App;
pub use config::Settings;
pub use controller::InteractionController;
pub use data::{aggregate, AnnotatedTree, Ingestor, RootSnapshot, Status};
pub use error::ParseError;
pub use source::{
    ChannelScopedFeed, ChannelSource, DataSource, Feed, FileScopedFeed, FileSource, StreamSource,
};
pub use view::{
    reconcile, refresh, NodeKey, RenderCommand, Scope, StalePolicy, ViewContext, ViewSettings,
    ViewStore,
};
