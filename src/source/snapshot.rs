//! Wire types for health payloads.
//!
//! Every field is optional: a payload may describe the whole tree or only
//! the parts that changed. Absent fields mean "unchanged", which the
//! ingestor resolves against the last known tree. Derived values a producer
//! may include (`status`, `degraded`, `instances_up`, ...) are ignored and
//! recomputed locally.

use std::fmt;
use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};

/// A string-keyed JSON object that keeps the order keys appear in.
///
/// A repeated key replaces the earlier value in place.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<T>(Vec<(String, T)>);

impl<T> Default for OrderedMap<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> OrderedMap<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: String, value: T) {
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<T> IntoIterator for OrderedMap<T> {
    type Item = (String, T);
    type IntoIter = std::vec::IntoIter<(String, T)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for OrderedMap<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedMapVisitor<T>(PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<T> {
            type Value = OrderedMap<T>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map keyed by name")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = OrderedMap::new();
                while let Some((key, value)) = access.next_entry::<String, T>()? {
                    map.insert(key, value);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
    }
}

/// Top-level payload on the root stream.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct RootPayload {
    /// Replace the known tree instead of merging into it.
    #[serde(default)]
    pub full: bool,
    pub applications: Option<OrderedMap<ApplicationPayload>>,
}

/// One application's subtree. Also the payload shape of a scoped stream.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct ApplicationPayload {
    pub services: Option<OrderedMap<ServicePayload>>,
}

/// One service's subtree.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct ServicePayload {
    #[serde(alias = "maxFailures")]
    pub max_failures: Option<u32>,
    pub instances: Option<OrderedMap<InstancePayload>>,
}

/// One instance's observed values.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct InstancePayload {
    pub up: Option<bool>,
    /// Microseconds.
    #[serde(alias = "responseTime")]
    pub response_time: Option<f64>,
    #[serde(alias = "lastChange")]
    pub last_change: Option<DateTime<Utc>>,
}
