//! Available-metrics store
//!
//! Maps each metric to its last known value. An entry that has not been
//! written for longer than the TTL is treated as absent: it models a sensor
//! going quiet, so dependents stop being computable from it. Expiry is
//! passive, checked against the time passed in by the caller.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::metric::{Metric, MetricValue};

#[derive(Debug, Clone)]
struct Entry {
    value: MetricValue,
    refreshed: Instant,
}

/// Metric values with staleness expiry
#[derive(Debug, Clone)]
pub struct MetricStore {
    entries: HashMap<Metric, Entry>,
    ttl: Duration,
    persistent: Vec<Metric>,
}

impl MetricStore {
    /// Create an empty store
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::with_capacity(Metric::COUNT),
            ttl,
            persistent: Vec::new(),
        }
    }

    /// Exempt metrics from expiry
    pub fn with_persistent(mut self, metrics: &[Metric]) -> Self {
        self.persistent.extend_from_slice(metrics);
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_live(&self, metric: Metric, entry: &Entry, now: Instant) -> bool {
        self.persistent.contains(&metric) || now.saturating_duration_since(entry.refreshed) < self.ttl
    }

    /// Value of a metric, if present and not expired
    pub fn get(&self, metric: Metric, now: Instant) -> Option<&MetricValue> {
        self.entries
            .get(&metric)
            .filter(|entry| self.is_live(metric, entry, now))
            .map(|entry| &entry.value)
    }

    /// Whether a metric has a live value
    pub fn contains(&self, metric: Metric, now: Instant) -> bool {
        self.get(metric, now).is_some()
    }

    /// Store a value and restart its expiry window
    pub fn insert(&mut self, metric: Metric, value: MetricValue, now: Instant) {
        self.entries.insert(
            metric,
            Entry {
                value,
                refreshed: now,
            },
        );
    }

    /// Drop a value
    pub fn remove(&mut self, metric: Metric) -> Option<MetricValue> {
        self.entries.remove(&metric).map(|entry| entry.value)
    }

    /// Drop every expired entry, returning how many went
    pub fn evict_expired(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        let persistent = &self.persistent;
        self.entries.retain(|metric, entry| {
            persistent.contains(metric) || now.saturating_duration_since(entry.refreshed) < ttl
        });
        before - self.entries.len()
    }

    /// Live metrics, in declaration order
    pub fn available(&self, now: Instant) -> Vec<Metric> {
        Metric::ALL
            .iter()
            .copied()
            .filter(|metric| self.contains(*metric, now))
            .collect()
    }

    /// Number of live entries
    pub fn len(&self, now: Instant) -> usize {
        self.available(now).len()
    }

    pub fn is_empty(&self, now: Instant) -> bool {
        self.len(now) == 0
    }

    /// Remove everything
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Read-only view at a fixed instant, handed to formulas
    pub fn view(&self, now: Instant) -> MetricsView<'_> {
        MetricsView { store: self, now }
    }
}

/// Store contents as seen at one instant
#[derive(Debug, Clone, Copy)]
pub struct MetricsView<'a> {
    store: &'a MetricStore,
    now: Instant,
}

impl<'a> MetricsView<'a> {
    pub fn get(&self, metric: Metric) -> Option<&'a MetricValue> {
        self.store.get(metric, self.now)
    }

    /// Numeric value of a metric
    pub fn number(&self, metric: Metric) -> Option<f64> {
        self.get(metric).and_then(MetricValue::as_f64)
    }

    /// Age in whole years
    pub fn age(&self) -> Option<u32> {
        self.number(Metric::Age).map(|age| age.max(0.0) as u32)
    }

    pub fn contains(&self, metric: Metric) -> bool {
        self.get(metric).is_some()
    }
}
