//! Health tree data model.
//!
//! Two shapes of the same three-level tree live here:
//!
//! - the raw tree ([`RootSnapshot`] → [`Application`] → [`Service`] → [`Instance`])
//!   produced by the ingestor, carrying only observed per-instance values;
//! - the annotated tree ([`AnnotatedTree`] → [`ApplicationHealth`] → [`ServiceHealth`])
//!   produced by the aggregator, carrying derived status and metrics at every level.
//!
//! Both are plain values rebuilt for every ingested payload. Collections keep
//! first-seen order and are never re-sorted.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Health classification shared by every level of the tree.
///
/// Variants are ordered from best to worst, so the worst of a set of
/// statuses is simply its maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Up,
    Degraded,
    Failed,
}

impl Status {
    /// Lowercase label used as the display class and status text.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Up => "up",
            Status::Degraded => "degraded",
            Status::Failed => "failed",
        }
    }

    /// Short symbol for compact display.
    pub fn symbol(&self) -> &'static str {
        match self {
            Status::Up => "OK",
            Status::Degraded => "DEGR",
            Status::Failed => "FAIL",
        }
    }

    /// Whether this status should draw attention.
    pub fn is_worse_than_up(&self) -> bool {
        *self != Status::Up
    }

    /// Worst status of an iterator, `Up` when empty.
    pub fn worst<I: IntoIterator<Item = Status>>(statuses: I) -> Status {
        statuses.into_iter().max().unwrap_or(Status::Up)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single monitored endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub id: String,
    pub up: bool,
    /// Last check duration in microseconds.
    pub response_time: f64,
    /// When `up` last flipped, if the producer reported it.
    pub last_change: Option<DateTime<Utc>>,
}

impl Instance {
    pub fn status(&self) -> Status {
        if self.up {
            Status::Up
        } else {
            Status::Failed
        }
    }
}

/// Raw service: its instances and optional failure budget.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Service {
    pub name: String,
    pub instances: Vec<Instance>,
    /// Down instances tolerated before the service counts as failed.
    pub max_failures: Option<u32>,
}

/// Raw application: an ordered set of services.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Application {
    pub name: String,
    pub services: Vec<Service>,
}

/// Raw tree as known after applying one payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RootSnapshot {
    pub applications: Vec<Application>,
}

impl RootSnapshot {
    pub fn application(&self, name: &str) -> Option<&Application> {
        self.applications.iter().find(|a| a.name == name)
    }

    /// Number of instances across the whole tree.
    pub fn instance_count(&self) -> usize {
        self.applications
            .iter()
            .flat_map(|a| &a.services)
            .map(|s| s.instances.len())
            .sum()
    }
}

/// Service with derived status and metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceHealth {
    pub name: String,
    pub status: Status,
    pub instances_up: usize,
    pub instances_total: usize,
    /// Mean response time (microseconds) over up instances; `None` when none is up.
    pub average_response_time: Option<f64>,
    pub instances: Vec<Instance>,
}

/// Application with derived status and totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationHealth {
    pub name: String,
    pub status: Status,
    pub services_up: usize,
    pub services_total: usize,
    pub instances_up: usize,
    pub instances_total: usize,
    pub services: Vec<ServiceHealth>,
}

/// Whole tree with global status and totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedTree {
    pub status: Status,
    pub applications_up: usize,
    pub applications_total: usize,
    pub services_up: usize,
    pub services_total: usize,
    pub instances_up: usize,
    pub instances_total: usize,
    pub applications: Vec<ApplicationHealth>,
}

impl AnnotatedTree {
    pub fn application(&self, name: &str) -> Option<&ApplicationHealth> {
        self.applications.iter().find(|a| a.name == name)
    }
}
