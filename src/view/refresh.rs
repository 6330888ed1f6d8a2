use chrono::{DateTime, Utc};
use tracing::trace;

use super::command::RenderCommand;
use super::context::ViewContext;
use super::node::Field;
use super::store::ViewStore;

/// Fire the store's due timestamp timers and re-humanize their anchors.
///
/// Only elapsed texts that actually changed produce an update. A timer
/// whose node is gone, or no longer owns it, is cancelled.
pub fn refresh(
    store: &mut ViewStore,
    ctx: &mut ViewContext,
    now: DateTime<Utc>,
) -> Vec<RenderCommand> {
    let mut commands = Vec::new();
    for (id, key) in ctx.timers.due(store.scope(), now) {
        let node = match store.get_mut(&key) {
            Some(node) if node.timer == Some(id) => node,
            _ => {
                trace!(%key, ?id, "dropping orphaned timer");
                ctx.timers.cancel(id);
                continue;
            }
        };
        let Some(anchor) = node.anchor else {
            continue;
        };
        let elapsed = (ctx.humanize)(anchor, now);
        if node.set_field(Field::Elapsed, &elapsed) {
            commands.push(RenderCommand::Update {
                key,
                field: Field::Elapsed,
                value: elapsed,
            });
        }
    }
    commands
}
