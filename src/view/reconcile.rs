//! Diff an annotated tree into a [`ViewStore`], producing render commands.
//!
//! The store is updated in place: a node is created the first time its key
//! is seen and mutated afterwards, so identity never depends on arrival
//! order. Every displayed field is compared with what was last rendered and
//! only differences are emitted.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::command::RenderCommand;
use super::context::{StalePolicy, ViewContext};
use super::key::NodeKey;
use super::node::{Field, ViewNode};
use super::store::ViewStore;
use crate::data::duration::format_response_time;
use crate::data::{AnnotatedTree, ApplicationHealth, Instance, ServiceHealth, Status};

/// Bring `store` in line with `tree` and return the commands needed to
/// update a display showing the previous state.
pub fn reconcile(
    store: &mut ViewStore,
    tree: &AnnotatedTree,
    ctx: &mut ViewContext,
    now: DateTime<Utc>,
) -> Vec<RenderCommand> {
    let mut pass = Pass {
        store: &mut *store,
        ctx,
        now,
        seen: HashSet::new(),
        commands: Vec::new(),
    };

    pass.root(tree);
    for app in &tree.applications {
        pass.application(app);
    }
    if pass.ctx.settings.stale_policy == StalePolicy::Prune {
        pass.prune();
    }

    let commands = pass.commands;
    debug!(
        scope = ?store.scope(),
        nodes = store.len(),
        commands = commands.len(),
        "reconciled"
    );
    commands
}

struct Pass<'a> {
    store: &'a mut ViewStore,
    ctx: &'a mut ViewContext,
    now: DateTime<Utc>,
    seen: HashSet<NodeKey>,
    commands: Vec<RenderCommand>,
}

impl Pass<'_> {
    fn root(&mut self, tree: &AnnotatedTree) {
        let fields = [
            (Field::StatusClass, tree.status.as_str().to_string()),
            (
                Field::Applications,
                format!("{}/{} apps", tree.applications_up, tree.applications_total),
            ),
            (
                Field::Services,
                format!("{}/{} services", tree.services_up, tree.services_total),
            ),
            (
                Field::Instances,
                format!("{}/{} instances", tree.instances_up, tree.instances_total),
            ),
        ];
        self.node(NodeKey::Root, tree.status, &fields);
    }

    fn application(&mut self, app: &ApplicationHealth) {
        let key = NodeKey::application(&app.name);
        let fields = [
            (Field::StatusClass, app.status.as_str().to_string()),
            (
                Field::Services,
                format!("{}/{} services", app.services_up, app.services_total),
            ),
            (
                Field::Instances,
                format!("{}/{} instances", app.instances_up, app.instances_total),
            ),
        ];
        self.node(key, app.status, &fields);
        for service in &app.services {
            self.service(&app.name, service);
        }
    }

    fn service(&mut self, app: &str, service: &ServiceHealth) {
        let key = NodeKey::service(app, &service.name);
        let response = match service.average_response_time {
            Some(micros) => format!("{} avg", format_response_time(micros)),
            None => "no response".to_string(),
        };
        let fields = [
            (Field::StatusClass, service.status.as_str().to_string()),
            (Field::StatusText, service.status.as_str().to_string()),
            (
                Field::Counters,
                format!("{}/{} up", service.instances_up, service.instances_total),
            ),
            (Field::ResponseTime, response),
        ];
        let previous = self.node(key.clone(), service.status, &fields);
        self.attention(&key, previous, service.status);

        for instance in &service.instances {
            self.instance(app, &service.name, instance);
        }
    }

    fn instance(&mut self, app: &str, service: &str, instance: &Instance) {
        let key = NodeKey::instance(app, service, &instance.id);
        let fields = [
            (Field::StatusClass, instance.status().as_str().to_string()),
            (
                Field::ResponseTime,
                format_response_time(instance.response_time),
            ),
        ];
        self.node(key.clone(), instance.status(), &fields);
        self.anchor(&key, instance.last_change);
    }

    /// Create or update one node; returns the status it had before.
    fn node(&mut self, key: NodeKey, status: Status, fields: &[(Field, String)]) -> Option<Status> {
        let (node, created) = self.store.ensure(&key);
        if created {
            self.commands.push(RenderCommand::Create {
                key: key.clone(),
                parent: key.parent(),
            });
        }
        let previous = node.status.replace(status);
        for (field, value) in fields {
            if node.set_field(*field, value) {
                self.commands.push(RenderCommand::Update {
                    key: key.clone(),
                    field: *field,
                    value: value.clone(),
                });
            }
        }
        self.seen.insert(key);
        previous
    }

    fn attention(&mut self, key: &NodeKey, previous: Option<Status>, status: Status) {
        if status.is_worse_than_up() && previous != Some(status) {
            let reveal = if self.ctx.may_reveal(self.now) {
                key.parent()
            } else {
                None
            };
            info!(%key, %status, revealed = reveal.is_some(), "attention");
            self.commands.push(RenderCommand::Attention {
                key: key.clone(),
                status,
                reveal,
            });
            self.set_expanded(key, true);
        } else if status == Status::Up && previous.is_some_and(|p| p.is_worse_than_up()) {
            self.set_expanded(key, false);
        }
    }

    fn set_expanded(&mut self, key: &NodeKey, expanded: bool) {
        if let Some(node) = self.store.get_mut(key) {
            if node.expanded != expanded {
                node.expanded = expanded;
                self.commands.push(RenderCommand::Expand {
                    key: key.clone(),
                    expanded,
                });
            }
        }
    }

    /// Track the relative-time anchor of an instance, replacing its timer
    /// whenever the anchor moves.
    fn anchor(&mut self, key: &NodeKey, anchor: Option<DateTime<Utc>>) {
        let scope = self.store.scope();
        let Some(node) = self.store.get_mut(key) else {
            return;
        };
        if node.anchor == anchor {
            return;
        }
        if let Some(old) = node.timer.take() {
            self.ctx.timers.cancel(old);
            debug!(%key, "timestamp timer replaced");
        }
        node.anchor = anchor;

        let (anchor_text, elapsed) = match anchor {
            Some(at) => {
                node.timer = Some(self.ctx.timers.schedule(
                    scope,
                    key.clone(),
                    at,
                    self.ctx.settings.refresh_period,
                    self.now,
                ));
                (at.to_rfc3339(), (self.ctx.humanize)(at, self.now))
            }
            None => (String::new(), String::new()),
        };
        push_if_changed(&mut self.commands, node, Field::Anchor, anchor_text);
        push_if_changed(&mut self.commands, node, Field::Elapsed, elapsed);
    }

    /// Remove every node whose key was not part of this pass.
    fn prune(&mut self) {
        let stale: Vec<NodeKey> = self
            .store
            .walk(false)
            .into_iter()
            .map(|n| n.key().clone())
            .filter(|k| !self.seen.contains(k))
            .collect();

        for key in stale {
            // Already gone with an ancestor.
            if !self.store.contains(&key) {
                continue;
            }
            for node in self.store.remove(&key) {
                if let Some(timer) = node.timer() {
                    self.ctx.timers.cancel(timer);
                }
            }
            debug!(%key, "pruned stale node");
            self.commands.push(RenderCommand::Remove { key });
        }
    }
}

fn push_if_changed(
    commands: &mut Vec<RenderCommand>,
    node: &mut ViewNode,
    field: Field,
    value: String,
) {
    if node.set_field(field, &value) {
        commands.push(RenderCommand::Update {
            key: node.key().clone(),
            field,
            value,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{aggregate, Application, RootSnapshot, Service};
    use crate::view::context::ViewSettings;
    use crate::view::store::Scope;
    use chrono::{TimeDelta, TimeZone};

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap() + TimeDelta::seconds(secs)
    }

    fn instance(id: &str, up: bool, response_time: f64, last_change: Option<i64>) -> Instance {
        Instance {
            id: id.to_string(),
            up,
            response_time,
            last_change: last_change.map(t),
        }
    }

    fn tree(instances: Vec<Instance>) -> AnnotatedTree {
        aggregate(RootSnapshot {
            applications: vec![Application {
                name: "shop".to_string(),
                services: vec![Service {
                    name: "web".to_string(),
                    instances,
                    max_failures: None,
                }],
            }],
        })
    }

    fn healthy() -> AnnotatedTree {
        tree(vec![
            instance("a", true, 100.0, Some(0)),
            instance("b", true, 300.0, Some(0)),
        ])
    }

    fn attention(commands: &[RenderCommand]) -> Vec<&RenderCommand> {
        commands.iter().filter(|c| c.is_attention()).collect()
    }

    #[test]
    fn test_first_pass_creates_in_order() {
        let mut store = ViewStore::new(Scope::Overview);
        let mut ctx = ViewContext::new(ViewSettings::default(), t(0));
        let commands = reconcile(&mut store, &healthy(), &mut ctx, t(1));

        let created: Vec<String> = commands
            .iter()
            .filter_map(|c| match c {
                RenderCommand::Create { key, .. } => Some(key.to_string()),
                _ => None,
            })
            .collect();
        assert_eq!(created, vec!["/", "shop", "shop/web", "shop/web/a", "shop/web/b"]);

        let web = store.get(&NodeKey::service("shop", "web")).unwrap();
        assert_eq!(web.field(Field::Counters), Some("2/2 up"));
        assert_eq!(web.field(Field::ResponseTime), Some("0.20ms avg"));
        let root = store.get(&NodeKey::Root).unwrap();
        assert_eq!(root.field(Field::Applications), Some("1/1 apps"));
        let a = store.get(&NodeKey::instance("shop", "web", "a")).unwrap();
        assert_eq!(a.field(Field::Elapsed), Some("1s ago"));
    }

    #[test]
    fn test_identical_snapshot_emits_nothing() {
        let mut store = ViewStore::new(Scope::Overview);
        let mut ctx = ViewContext::new(ViewSettings::default(), t(0));
        reconcile(&mut store, &healthy(), &mut ctx, t(1));

        let commands = reconcile(&mut store, &healthy(), &mut ctx, t(1));
        assert!(commands.is_empty(), "{commands:?}");
    }

    #[test]
    fn test_only_changed_fields_are_emitted() {
        let mut store = ViewStore::new(Scope::Overview);
        let mut ctx = ViewContext::new(ViewSettings::default(), t(0));
        reconcile(&mut store, &healthy(), &mut ctx, t(1));

        let changed = tree(vec![
            instance("a", true, 500.0, Some(0)),
            instance("b", true, 300.0, Some(0)),
        ]);
        let commands = reconcile(&mut store, &changed, &mut ctx, t(2));
        let fields: Vec<(String, Field)> = commands
            .iter()
            .filter_map(|c| match c {
                RenderCommand::Update { key, field, .. } => Some((key.to_string(), *field)),
                _ => None,
            })
            .collect();
        assert_eq!(
            fields,
            vec![
                ("shop/web".to_string(), Field::ResponseTime),
                ("shop/web/a".to_string(), Field::ResponseTime),
            ]
        );
    }

    #[test]
    fn test_node_identity_is_stable() {
        let mut store = ViewStore::new(Scope::Overview);
        let mut ctx = ViewContext::new(ViewSettings::default(), t(0));
        reconcile(&mut store, &healthy(), &mut ctx, t(1));
        let key = NodeKey::instance("shop", "web", "b");
        let id = store.get(&key).unwrap().id();

        for secs in 2..10 {
            let down = tree(vec![
                instance("b", secs % 2 == 0, 300.0, Some(secs)),
                instance("a", true, 100.0, Some(0)),
            ]);
            reconcile(&mut store, &down, &mut ctx, t(secs));
        }
        assert_eq!(store.get(&key).unwrap().id(), id);
        assert_eq!(store.len(), 5);
        // Order is first-seen, not latest payload order.
        assert_eq!(
            store.children(&NodeKey::service("shop", "web")),
            &[
                NodeKey::instance("shop", "web", "a"),
                NodeKey::instance("shop", "web", "b")
            ]
        );
    }

    #[test]
    fn test_anchor_updates_keep_one_timer() {
        let mut store = ViewStore::new(Scope::Overview);
        let mut ctx = ViewContext::new(ViewSettings::default(), t(0));
        let key = NodeKey::instance("shop", "web", "a");

        for anchor in [0, 5, 9] {
            let changed = tree(vec![instance("a", true, 100.0, Some(anchor))]);
            reconcile(&mut store, &changed, &mut ctx, t(10));
        }
        assert_eq!(ctx.timers.active_for(Scope::Overview, &key), 1);
        assert_eq!(ctx.timers.len(), 1);
        let node = store.get(&key).unwrap();
        assert!(ctx.timers.is_active(node.timer().unwrap()));
        assert_eq!(node.field(Field::Elapsed), Some("1s ago"));
    }

    #[test]
    fn test_attention_fires_once_per_transition() {
        let mut store = ViewStore::new(Scope::Overview);
        let mut ctx = ViewContext::new(ViewSettings::default(), t(0));
        reconcile(&mut store, &healthy(), &mut ctx, t(1));

        let degraded = tree(vec![
            instance("a", true, 100.0, Some(0)),
            instance("b", false, 300.0, Some(0)),
        ]);
        let commands = reconcile(&mut store, &degraded, &mut ctx, t(2));
        assert_eq!(
            attention(&commands),
            vec![&RenderCommand::Attention {
                key: NodeKey::service("shop", "web"),
                status: Status::Degraded,
                reveal: None,
            }]
        );

        // Staying degraded does not repeat it.
        let commands = reconcile(&mut store, &degraded, &mut ctx, t(3));
        assert!(attention(&commands).is_empty());

        // Degraded to failed is a new transition.
        let failed = tree(vec![
            instance("a", false, 100.0, Some(0)),
            instance("b", false, 300.0, Some(0)),
        ]);
        let commands = reconcile(&mut store, &failed, &mut ctx, t(4));
        assert_eq!(attention(&commands).len(), 1);

        // Recovering to up is silent.
        let commands = reconcile(&mut store, &healthy(), &mut ctx, t(5));
        assert!(attention(&commands).is_empty());
    }

    #[test]
    fn test_new_failing_service_gets_attention() {
        let mut store = ViewStore::new(Scope::Overview);
        let mut ctx = ViewContext::new(ViewSettings::default(), t(0));
        let failed = tree(vec![instance("a", false, 100.0, None)]);
        let commands = reconcile(&mut store, &failed, &mut ctx, t(1));
        assert_eq!(attention(&commands).len(), 1);
    }

    #[test]
    fn test_reveal_only_when_idle() {
        let mut store = ViewStore::new(Scope::Overview);
        let mut ctx = ViewContext::new(ViewSettings::default(), t(0));
        reconcile(&mut store, &healthy(), &mut ctx, t(1));

        let degraded = tree(vec![
            instance("a", true, 100.0, Some(0)),
            instance("b", false, 300.0, Some(0)),
        ]);
        let commands = reconcile(&mut store, &degraded, &mut ctx, t(90));
        assert_eq!(
            attention(&commands),
            vec![&RenderCommand::Attention {
                key: NodeKey::service("shop", "web"),
                status: Status::Degraded,
                reveal: Some(NodeKey::application("shop")),
            }]
        );
    }

    #[test]
    fn test_auto_expand_and_collapse() {
        let mut store = ViewStore::new(Scope::Overview);
        let mut ctx = ViewContext::new(ViewSettings::default(), t(0));
        let web = NodeKey::service("shop", "web");
        reconcile(&mut store, &healthy(), &mut ctx, t(1));
        assert!(!store.get(&web).unwrap().is_expanded());

        let degraded = tree(vec![
            instance("a", true, 100.0, Some(0)),
            instance("b", false, 300.0, Some(0)),
        ]);
        let commands = reconcile(&mut store, &degraded, &mut ctx, t(2));
        assert!(commands.contains(&RenderCommand::Expand {
            key: web.clone(),
            expanded: true
        }));
        assert!(store.get(&web).unwrap().is_expanded());

        let commands = reconcile(&mut store, &healthy(), &mut ctx, t(3));
        assert!(commands.contains(&RenderCommand::Expand {
            key: web.clone(),
            expanded: false
        }));
    }

    #[test]
    fn test_missing_keys_retained_by_default() {
        let mut store = ViewStore::new(Scope::Overview);
        let mut ctx = ViewContext::new(ViewSettings::default(), t(0));
        reconcile(&mut store, &healthy(), &mut ctx, t(1));

        let shrunk = tree(vec![instance("a", true, 100.0, Some(0))]);
        let commands = reconcile(&mut store, &shrunk, &mut ctx, t(1));
        assert!(store.contains(&NodeKey::instance("shop", "web", "b")));
        assert!(!commands
            .iter()
            .any(|c| matches!(c, RenderCommand::Remove { .. })));
        assert_eq!(ctx.timers.len(), 2);
    }

    #[test]
    fn test_prune_removes_missing_keys_and_timers() {
        let settings = ViewSettings {
            stale_policy: StalePolicy::Prune,
            ..ViewSettings::default()
        };
        let mut store = ViewStore::new(Scope::Overview);
        let mut ctx = ViewContext::new(settings, t(0));
        reconcile(&mut store, &healthy(), &mut ctx, t(1));

        let shrunk = tree(vec![instance("a", true, 100.0, Some(0))]);
        let commands = reconcile(&mut store, &shrunk, &mut ctx, t(1));
        assert!(commands.contains(&RenderCommand::Remove {
            key: NodeKey::instance("shop", "web", "b")
        }));
        assert!(!store.contains(&NodeKey::instance("shop", "web", "b")));
        assert_eq!(ctx.timers.len(), 1);

        let empty = aggregate(RootSnapshot::default());
        let commands = reconcile(&mut store, &empty, &mut ctx, t(2));
        assert!(commands.contains(&RenderCommand::Remove {
            key: NodeKey::application("shop")
        }));
        assert_eq!(store.len(), 1);
        assert!(ctx.timers.is_empty());
    }

    #[test]
    fn test_empty_service_has_no_response() {
        let mut store = ViewStore::new(Scope::Overview);
        let mut ctx = ViewContext::new(ViewSettings::default(), t(0));
        reconcile(&mut store, &tree(vec![]), &mut ctx, t(1));
        let web = store.get(&NodeKey::service("shop", "web")).unwrap();
        assert_eq!(web.field(Field::ResponseTime), Some("no response"));
        assert_eq!(web.status(), Some(Status::Up));
    }
}
