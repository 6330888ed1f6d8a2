//! Terminal UI rendering using ratatui.
//!
//! This is the presentation adapter: it reads the persisted view nodes and
//! never touches the health data directly.
//!
//! ## Submodules
//!
//! - [`overview`]: Application/service/instance tree of the whole fleet
//! - [`detail`]: Modal overlay for the focused application
//! - [`common`]: Shared components (header, status bar, help overlay)
//! - [`theme`]: Light/dark theme support with terminal auto-detection
//!
//! ## Rendering Architecture
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │ Header (common::render_header)       │
//! ├──────────────────────────────────────┤
//! │                                      │
//! │ Tree (overview::render)              │
//! │                                      │
//! ├──────────────────────────────────────┤
//! │ Status Bar (common::render_status)   │
//! └──────────────────────────────────────┘
//!         ↑
//!    Overlays rendered on top:
//!    - detail::render_overlay
//!    - common::render_help
//! ```

pub mod common;
pub mod detail;
pub mod overview;
pub mod theme;

pub use theme::Theme;
