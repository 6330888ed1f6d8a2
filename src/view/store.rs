//! Keyed arena of view nodes.

use std::collections::HashMap;

use super::key::NodeKey;
use super::node::{NodeId, ViewNode};

/// Which view a store (and its timers) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// The always-present fleet overview.
    Overview,
    /// The transient per-application detail view.
    Detail,
}

/// Persistent view model: every node ever observed, keyed by path.
///
/// Parents own the ordered list of their children's keys; the nodes
/// themselves live in one map so lookups never walk the tree.
#[derive(Debug)]
pub struct ViewStore {
    scope: Scope,
    nodes: HashMap<NodeKey, ViewNode>,
    next_id: u64,
}

impl ViewStore {
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            nodes: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn get(&self, key: &NodeKey) -> Option<&ViewNode> {
        self.nodes.get(key)
    }

    pub(crate) fn get_mut(&mut self, key: &NodeKey) -> Option<&mut ViewNode> {
        self.nodes.get_mut(key)
    }

    pub fn contains(&self, key: &NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Child keys of `key` in first-seen order.
    pub fn children(&self, key: &NodeKey) -> &[NodeKey] {
        self.nodes.get(key).map(|n| n.children()).unwrap_or(&[])
    }

    /// Application keys in first-seen order.
    pub fn applications(&self) -> &[NodeKey] {
        self.children(&NodeKey::Root)
    }

    /// Fetch the node for `key`, creating it (and linking it under its
    /// parent) on first observation. Returns whether it was created.
    ///
    /// The parent must already exist unless `key` is the root.
    pub(crate) fn ensure(&mut self, key: &NodeKey) -> (&mut ViewNode, bool) {
        let created = !self.nodes.contains_key(key);
        if created {
            if let Some(parent) = key.parent().and_then(|p| self.nodes.get_mut(&p)) {
                parent.children.push(key.clone());
            }
            self.next_id += 1;
        }
        let id = NodeId(self.next_id);
        let node = self
            .nodes
            .entry(key.clone())
            .or_insert_with(|| ViewNode::new(id, key.clone()));
        (node, created)
    }

    /// Remove a node and its whole subtree, unlinking it from its parent.
    ///
    /// Returns the removed nodes, parents before children.
    pub(crate) fn remove(&mut self, key: &NodeKey) -> Vec<ViewNode> {
        if let Some(parent) = key.parent().and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.retain(|k| k != key);
        }
        let mut removed = Vec::new();
        let mut pending = vec![key.clone()];
        while let Some(next) = pending.pop() {
            if let Some(node) = self.nodes.remove(&next) {
                pending.extend(node.children.iter().rev().cloned());
                removed.push(node);
            }
        }
        removed
    }

    /// Depth-first walk from the root in display order.
    ///
    /// Instances of collapsed services are skipped when `respect_collapse`
    /// is set. The root itself is not included.
    pub fn walk(&self, respect_collapse: bool) -> Vec<&ViewNode> {
        let mut out = Vec::new();
        let mut stack: Vec<&NodeKey> = self.applications().iter().rev().collect();
        while let Some(key) = stack.pop() {
            let Some(node) = self.nodes.get(key) else {
                continue;
            };
            out.push(node);
            let descend = !(respect_collapse
                && matches!(key, NodeKey::Service(..))
                && !node.is_expanded());
            if descend {
                stack.extend(node.children().iter().rev());
            }
        }
        out
    }

    /// Every node, in no particular order.
    pub fn nodes(&self) -> impl Iterator<Item = &ViewNode> {
        self.nodes.values()
    }
}
