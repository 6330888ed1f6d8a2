//! Data models and processing for health payloads.
//!
//! This module handles the transformation of raw payloads into a
//! health-annotated tree suitable for display.
//!
//! ## Submodules
//!
//! - [`duration`]: Duration parsing, response-time and elapsed-time formatting
//! - [`ingest`]: Payload parsing with sparse-update semantics ([`Ingestor`])
//! - [`aggregate`]: Bottom-up status and metric derivation ([`aggregate()`])
//! - [`model`]: Raw and annotated tree types
//!
//! ## Data Flow
//!
//! ```text
//! payload bytes
//!        │
//!        ▼
//! Ingestor::ingest()  ──▶ RootSnapshot (last known values for every key)
//!        │
//!        ▼
//! aggregate()         ──▶ AnnotatedTree (status + metrics at every level)
//! ```

pub mod aggregate;
pub mod duration;
pub mod ingest;
pub mod model;

pub use aggregate::{aggregate, application_health, service_health};
pub use ingest::Ingestor;
pub use model::{
    AnnotatedTree, Application, ApplicationHealth, Instance, RootSnapshot, Service,
    ServiceHealth, Status,
};
