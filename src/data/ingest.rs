//! Snapshot ingestion.
//!
//! Turns raw payload bytes into a fresh [`RootSnapshot`], resolving sparse
//! updates against the most recently known value of every key. A payload is
//! applied atomically: it is merged into a copy of the known tree and only
//! committed once every entity in it validated.

use tracing::{debug, warn};

use super::model::{Application, Instance, RootSnapshot, Service};
use crate::error::ParseError;
use crate::source::{
    ApplicationPayload, InstancePayload, OrderedMap, RootPayload, ServicePayload,
};

/// Stateful ingestor for one stream.
#[derive(Debug, Default)]
pub struct Ingestor {
    known: RootSnapshot,
    /// Next payload replaces the known tree regardless of its `full` flag.
    resumed: bool,
    accepted: u64,
    rejected: u64,
}

impl Ingestor {
    pub fn new() -> Self {
        Self::default()
    }

    /// The tree as of the last accepted payload.
    pub fn known(&self) -> &RootSnapshot {
        &self.known
    }

    /// Number of payloads accepted so far.
    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    /// Number of payloads rejected so far.
    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    /// Treat the next payload as a complete tree.
    ///
    /// Called when the transport reconnects: whatever arrives next is a
    /// resumed feed, so keys it omits are no longer known.
    pub fn mark_resumed(&mut self) {
        self.resumed = true;
    }

    /// Ingest a root-stream payload.
    pub fn ingest(&mut self, payload: &[u8]) -> Result<RootSnapshot, ParseError> {
        let result = parse_root(payload).and_then(|root| {
            let full = root.full || self.resumed;
            let mut next = if full {
                RootSnapshot::default()
            } else {
                self.known.clone()
            };
            if let Some(apps) = root.applications {
                merge_applications(&mut next, apps)?;
            }
            Ok((next, full))
        });
        self.commit(result)
    }

    /// Ingest a scoped-stream payload describing a single application.
    ///
    /// The known tree holds at most that one application.
    pub fn ingest_application(
        &mut self,
        app: &str,
        payload: &[u8],
    ) -> Result<RootSnapshot, ParseError> {
        let result = parse_object::<ApplicationPayload>(payload).and_then(|update| {
            let full = self.resumed;
            let mut next = if full {
                RootSnapshot::default()
            } else {
                self.known.clone()
            };
            let mut apps = OrderedMap::new();
            apps.insert(app.to_string(), update);
            merge_applications(&mut next, apps)?;
            Ok((next, full))
        });
        self.commit(result)
    }

    fn commit(
        &mut self,
        result: Result<(RootSnapshot, bool), ParseError>,
    ) -> Result<RootSnapshot, ParseError> {
        match result {
            Ok((next, full)) => {
                self.known = next;
                self.resumed = false;
                self.accepted += 1;
                debug!(
                    full,
                    applications = self.known.applications.len(),
                    instances = self.known.instance_count(),
                    "snapshot ingested"
                );
                Ok(self.known.clone())
            }
            Err(e) => {
                self.rejected += 1;
                warn!(error = %e, rejected = self.rejected, "discarding snapshot");
                Err(e)
            }
        }
    }
}

fn parse_root(payload: &[u8]) -> Result<RootPayload, ParseError> {
    parse_object(payload)
}

fn parse_object<T: serde::de::DeserializeOwned>(payload: &[u8]) -> Result<T, ParseError> {
    let value: serde_json::Value = serde_json::from_slice(payload)?;
    if !value.is_object() {
        return Err(ParseError::NotAnObject);
    }
    Ok(serde_json::from_value(value)?)
}

fn merge_applications(
    tree: &mut RootSnapshot,
    apps: OrderedMap<ApplicationPayload>,
) -> Result<(), ParseError> {
    for (name, update) in apps {
        if name.is_empty() {
            return Err(ParseError::EmptyKey {
                kind: "application",
                parent: String::new(),
            });
        }
        let idx = match tree.applications.iter().position(|a| a.name == name) {
            Some(idx) => idx,
            None => {
                tree.applications.push(Application {
                    name: name.clone(),
                    services: Vec::new(),
                });
                tree.applications.len() - 1
            }
        };
        if let Some(services) = update.services {
            merge_services(&mut tree.applications[idx], services)?;
        }
    }
    Ok(())
}

fn merge_services(
    app: &mut Application,
    services: OrderedMap<ServicePayload>,
) -> Result<(), ParseError> {
    for (name, update) in services {
        if name.is_empty() {
            return Err(ParseError::EmptyKey {
                kind: "service",
                parent: app.name.clone(),
            });
        }
        let idx = match app.services.iter().position(|s| s.name == name) {
            Some(idx) => idx,
            None => {
                app.services.push(Service {
                    name: name.clone(),
                    ..Service::default()
                });
                app.services.len() - 1
            }
        };
        let service = &mut app.services[idx];
        if update.max_failures.is_some() {
            service.max_failures = update.max_failures;
        }
        if let Some(instances) = update.instances {
            let path = format!("{}/{}", app.name, service.name);
            merge_instances(&path, service, instances)?;
        }
    }
    Ok(())
}

fn merge_instances(
    service_path: &str,
    service: &mut Service,
    instances: OrderedMap<InstancePayload>,
) -> Result<(), ParseError> {
    for (id, update) in instances {
        if id.is_empty() {
            return Err(ParseError::EmptyKey {
                kind: "instance",
                parent: service_path.to_string(),
            });
        }
        let path = format!("{}/{}", service_path, id);
        if let Some(rt) = update.response_time {
            if !rt.is_finite() || rt < 0.0 {
                return Err(ParseError::InvalidValue {
                    path,
                    field: "response_time",
                    reason: format!("expected a non-negative number, got {}", rt),
                });
            }
        }

        match service.instances.iter_mut().find(|i| i.id == id) {
            Some(existing) => {
                if let Some(up) = update.up {
                    existing.up = up;
                }
                if let Some(rt) = update.response_time {
                    existing.response_time = rt;
                }
                if update.last_change.is_some() {
                    existing.last_change = update.last_change;
                }
            }
            None => {
                let up = update.up.ok_or(ParseError::MissingField { path, field: "up" })?;
                service.instances.push(Instance {
                    id,
                    up,
                    response_time: update.response_time.unwrap_or(0.0),
                    last_change: update.last_change,
                });
            }
        }
    }
    Ok(())
}
