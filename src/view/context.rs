//! Explicit state shared by the reconciler and the refresher.
//!
//! Everything that used to be ambient (idle counter, timer registry, the
//! relative-time formatter) lives in [`ViewContext`]. One context exists per
//! [`App`](crate::App); it is created at startup with the current time and
//! is never reset while the process runs. Closing a detail view cancels the
//! detail-scoped timers in it but leaves the rest untouched.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;

use super::timer::TimerRegistry;
use crate::data::duration::humanize_elapsed;

/// Formats the time elapsed between an anchor and now.
pub type Humanize = fn(DateTime<Utc>, DateTime<Utc>) -> String;

/// What happens to nodes whose key is missing from the current tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StalePolicy {
    /// Keep them as last rendered; a sparse or interrupted feed may bring them back.
    #[default]
    Retain,
    /// Remove them and cancel their timers.
    Prune,
}

/// Tunables for the view engine.
#[derive(Debug, Clone)]
pub struct ViewSettings {
    /// Inactivity after which attention may move the view.
    pub idle_threshold: Duration,
    /// Period of timestamp refresh timers.
    pub refresh_period: Duration,
    pub stale_policy: StalePolicy,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            idle_threshold: Duration::from_secs(60),
            refresh_period: Duration::from_secs(1),
            stale_policy: StalePolicy::Retain,
        }
    }
}

/// Tracks time since the user last touched a key or the mouse.
#[derive(Debug, Clone)]
pub struct IdleTracker {
    last_activity: DateTime<Utc>,
}

impl IdleTracker {
    /// Start counting from `now`: a fresh session is not idle.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { last_activity: now }
    }

    pub fn record_activity(&mut self, now: DateTime<Utc>) {
        if now > self.last_activity {
            self.last_activity = now;
        }
    }

    pub fn idle_for(&self, now: DateTime<Utc>) -> TimeDelta {
        (now - self.last_activity).max(TimeDelta::zero())
    }

    pub fn is_idle(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        self.idle_for(now).to_std().unwrap_or_default() >= threshold
    }
}

/// Shared, explicitly passed state for reconciling and refreshing views.
#[derive(Debug)]
pub struct ViewContext {
    pub settings: ViewSettings,
    pub idle: IdleTracker,
    pub timers: TimerRegistry,
    pub humanize: Humanize,
}

impl ViewContext {
    pub fn new(settings: ViewSettings, now: DateTime<Utc>) -> Self {
        Self {
            settings,
            idle: IdleTracker::new(now),
            timers: TimerRegistry::new(),
            humanize: humanize_elapsed,
        }
    }

    /// Replace the relative-time formatter.
    pub fn with_humanize(mut self, humanize: Humanize) -> Self {
        self.humanize = humanize;
        self
    }

    /// Whether a reveal may interrupt the user right now.
    pub fn may_reveal(&self, now: DateTime<Utc>) -> bool {
        self.idle.is_idle(now, self.settings.idle_threshold)
    }
}
