//! Recurring timers for relative-timestamp refresh.
//!
//! Timers are plain records polled by the event loop; nothing runs on its
//! own. A node refers to its timer by [`TimerId`], and whoever replaces a
//! node's anchor must cancel the old id before scheduling a new one.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::trace;

use super::key::NodeKey;
use super::store::Scope;

/// Handle to a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug, Clone)]
struct Scheduled {
    scope: Scope,
    key: NodeKey,
    period: TimeDelta,
    next_due: DateTime<Utc>,
}

/// Registry of every active recurring timer.
#[derive(Debug, Default)]
pub struct TimerRegistry {
    next_id: u64,
    timers: BTreeMap<TimerId, Scheduled>,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a recurring timer for `key` whose ticks line up with whole
    /// periods elapsed since `anchor`.
    pub fn schedule(
        &mut self,
        scope: Scope,
        key: NodeKey,
        anchor: DateTime<Utc>,
        period: Duration,
        now: DateTime<Utc>,
    ) -> TimerId {
        let period_ms = (period.as_millis() as i64).max(1);
        let elapsed_ms = (now - anchor).num_milliseconds();
        let first_in = if elapsed_ms < 0 {
            period_ms
        } else {
            period_ms - elapsed_ms % period_ms
        };

        self.next_id += 1;
        let id = TimerId(self.next_id);
        trace!(%key, ?id, first_in_ms = first_in, "timer scheduled");
        self.timers.insert(
            id,
            Scheduled {
                scope,
                key,
                period: TimeDelta::milliseconds(period_ms),
                next_due: now + TimeDelta::milliseconds(first_in),
            },
        );
        id
    }

    /// Cancel a timer. Returns false if it was not active.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.timers.remove(&id).is_some()
    }

    /// Cancel every timer belonging to `scope`, returning how many were active.
    pub fn cancel_scope(&mut self, scope: Scope) -> usize {
        let before = self.timers.len();
        self.timers.retain(|_, t| t.scope != scope);
        before - self.timers.len()
    }

    pub fn is_active(&self, id: TimerId) -> bool {
        self.timers.contains_key(&id)
    }

    /// Timers in `scope` that fired at or before `now`.
    ///
    /// Each returned timer is rescheduled to its next tick after `now`;
    /// missed ticks are coalesced into one.
    pub fn due(&mut self, scope: Scope, now: DateTime<Utc>) -> Vec<(TimerId, NodeKey)> {
        let mut fired = Vec::new();
        for (id, timer) in self.timers.iter_mut() {
            if timer.scope != scope || timer.next_due > now {
                continue;
            }
            let behind = (now - timer.next_due).num_milliseconds();
            let periods = behind / timer.period.num_milliseconds() + 1;
            timer.next_due += TimeDelta::milliseconds(periods * timer.period.num_milliseconds());
            fired.push((*id, timer.key.clone()));
        }
        fired
    }

    /// Number of active timers for one node.
    pub fn active_for(&self, scope: Scope, key: &NodeKey) -> usize {
        self.timers
            .values()
            .filter(|t| t.scope == scope && &t.key == key)
            .count()
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(secs: i64, millis: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
            + TimeDelta::seconds(secs)
            + TimeDelta::milliseconds(millis)
    }

    #[test]
    fn test_first_tick_aligned_to_anchor() {
        let mut timers = TimerRegistry::new();
        let key = NodeKey::instance("shop", "web", "a");
        // Anchor at 0.300s, now at 5.000s: 4.7s elapsed, next whole second at 5.300s.
        let id = timers.schedule(Scope::Overview, key.clone(), t(0, 300), Duration::from_secs(1), t(5, 0));

        assert!(timers.due(Scope::Overview, t(5, 299)).is_empty());
        assert_eq!(timers.due(Scope::Overview, t(5, 300)), vec![(id, key.clone())]);
        // Next tick one period later.
        assert!(timers.due(Scope::Overview, t(6, 299)).is_empty());
        assert_eq!(timers.due(Scope::Overview, t(6, 300)).len(), 1);
    }

    #[test]
    fn test_missed_ticks_coalesce() {
        let mut timers = TimerRegistry::new();
        let key = NodeKey::instance("shop", "web", "a");
        timers.schedule(Scope::Overview, key, t(0, 0), Duration::from_secs(1), t(0, 0));

        assert_eq!(timers.due(Scope::Overview, t(10, 500)).len(), 1);
        assert!(timers.due(Scope::Overview, t(10, 900)).is_empty());
        assert_eq!(timers.due(Scope::Overview, t(11, 0)).len(), 1);
    }

    #[test]
    fn test_future_anchor_waits_one_period() {
        let mut timers = TimerRegistry::new();
        let key = NodeKey::instance("shop", "web", "a");
        timers.schedule(Scope::Overview, key, t(30, 0), Duration::from_secs(1), t(0, 0));
        assert!(timers.due(Scope::Overview, t(0, 999)).is_empty());
        assert_eq!(timers.due(Scope::Overview, t(1, 0)).len(), 1);
    }

    #[test]
    fn test_cancel_and_scopes() {
        let mut timers = TimerRegistry::new();
        let key = NodeKey::instance("shop", "web", "a");
        let a = timers.schedule(Scope::Overview, key.clone(), t(0, 0), Duration::from_secs(1), t(0, 0));
        timers.schedule(Scope::Detail, key.clone(), t(0, 0), Duration::from_secs(1), t(0, 0));
        timers.schedule(Scope::Detail, NodeKey::instance("shop", "web", "b"), t(0, 0), Duration::from_secs(1), t(0, 0));

        assert_eq!(timers.len(), 3);
        assert_eq!(timers.active_for(Scope::Overview, &key), 1);

        assert!(timers.cancel(a));
        assert!(!timers.cancel(a));
        assert!(!timers.is_active(a));

        assert_eq!(timers.cancel_scope(Scope::Detail), 2);
        assert!(timers.is_empty());
    }

    #[test]
    fn test_due_only_reports_requested_scope() {
        let mut timers = TimerRegistry::new();
        let key = NodeKey::instance("shop", "web", "a");
        timers.schedule(Scope::Detail, key, t(0, 0), Duration::from_secs(1), t(0, 0));
        assert!(timers.due(Scope::Overview, t(5, 0)).is_empty());
        assert_eq!(timers.due(Scope::Detail, t(5, 0)).len(), 1);
    }
}
