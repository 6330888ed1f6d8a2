use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::key::NodeKey;
use super::timer::TimerId;
use crate::data::Status;

/// Serial number assigned when a node is created, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

/// A displayed value of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    /// Status class (`up` / `degraded` / `failed`).
    StatusClass,
    /// Status word shown next to a service.
    StatusText,
    /// "x/y up" for a service.
    Counters,
    /// "x/y apps" on the root.
    Applications,
    /// "x/y services" on the root and applications.
    Services,
    /// "x/y instances" on the root and applications.
    Instances,
    /// Average (service) or last (instance) response time.
    ResponseTime,
    /// RFC 3339 timestamp the elapsed text is computed from.
    Anchor,
    /// Humanized time since the anchor.
    Elapsed,
}

impl Field {
    pub fn name(&self) -> &'static str {
        match self {
            Field::StatusClass => "status_class",
            Field::StatusText => "status_text",
            Field::Counters => "counters",
            Field::Applications => "applications",
            Field::Services => "services",
            Field::Instances => "instances",
            Field::ResponseTime => "response_time",
            Field::Anchor => "anchor",
            Field::Elapsed => "elapsed",
        }
    }
}

/// Persistent projection of one tree entity.
///
/// Holds what was last rendered so the next snapshot can be diffed against
/// it. Created once per key and mutated in place afterwards.
#[derive(Debug, Clone)]
pub struct ViewNode {
    id: NodeId,
    key: NodeKey,
    pub(crate) status: Option<Status>,
    pub(crate) fields: BTreeMap<Field, String>,
    pub(crate) anchor: Option<DateTime<Utc>>,
    pub(crate) timer: Option<TimerId>,
    pub(crate) children: Vec<NodeKey>,
    pub(crate) expanded: bool,
}

impl ViewNode {
    pub(crate) fn new(id: NodeId, key: NodeKey) -> Self {
        Self {
            id,
            key,
            status: None,
            fields: BTreeMap::new(),
            anchor: None,
            timer: None,
            children: Vec::new(),
            expanded: false,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn key(&self) -> &NodeKey {
        &self.key
    }

    /// Last rendered status class.
    pub fn status(&self) -> Option<Status> {
        self.status
    }

    /// Last rendered text of a field.
    pub fn field(&self, field: Field) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    pub fn anchor(&self) -> Option<DateTime<Utc>> {
        self.anchor
    }

    /// The node's active timestamp timer, if any.
    pub fn timer(&self) -> Option<TimerId> {
        self.timer
    }

    /// Child keys in first-seen order.
    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    /// Whether the service's instance table is shown.
    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    /// Record `value` for `field`; returns false when it was already rendered.
    pub(crate) fn set_field(&mut self, field: Field, value: &str) -> bool {
        match self.fields.get(&field) {
            Some(current) if current == value => false,
            _ => {
                self.fields.insert(field, value.to_string());
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_field_reports_changes_only() {
        let mut node = ViewNode::new(NodeId(1), NodeKey::application("shop"));
        assert!(node.set_field(Field::Services, "1/2 services"));
        assert!(!node.set_field(Field::Services, "1/2 services"));
        assert!(node.set_field(Field::Services, "2/2 services"));
        assert_eq!(node.field(Field::Services), Some("2/2 services"));
        assert_eq!(node.field(Field::Instances), None);
    }
}
