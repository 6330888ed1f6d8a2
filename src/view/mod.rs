//! Persistent view model and the diff engine that keeps it current.
//!
//! ```text
//! AnnotatedTree ──▶ reconcile() ──▶ Vec<RenderCommand>
//!                       │
//!                       ▼
//!                   ViewStore  ◀── refresh() ◀── TimerRegistry (in ViewContext)
//! ```
//!
//! Nothing in here draws; the terminal UI reads the store and the commands.

pub mod command;
pub mod context;
pub mod key;
pub mod node;
pub mod reconcile;
pub mod refresh;
pub mod store;
pub mod timer;

pub use command::RenderCommand;
pub use context::{Humanize, IdleTracker, StalePolicy, ViewContext, ViewSettings};
pub use key::NodeKey;
pub use node::{Field, NodeId, ViewNode};
pub use reconcile::reconcile;
pub use refresh::refresh;
pub use store::{Scope, ViewStore};
pub use timer::{TimerId, TimerRegistry};
