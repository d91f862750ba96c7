//! Metrics handler
//!
//! One [`MetricsHandler`] exists per configured device. It ingests raw sensor
//! states, keeps the available-metrics store, aggregates sensor problems into
//! STATUS and runs the propagation wave: whenever a metric changes, every
//! metric depending on it is recomputed once all of its dependencies are
//! available, recursively, and subscribers are told about each new value.
//!
//! Everything runs synchronously on the caller's thread. A wave always runs to
//! completion before `on_state_changed` returns.

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use log::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::{BodyScaleConfig, Profile, SensorRole, POUNDS_TO_KG, UNIT_POUNDS};
use crate::error::{BodyScaleError, Result};
use crate::graph::DependencyGraph;
use crate::metric::{Metric, MetricValue};
use crate::status::{ProblemKind, ProblemTracker, SensorProblem};
use crate::store::MetricStore;

/// Placeholder state of a sensor that has not reported yet
pub const STATE_UNKNOWN: &str = "unknown";
/// Placeholder state of a sensor that is offline
pub const STATE_UNAVAILABLE: &str = "unavailable";

const AWARE_TIMESTAMP_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
];
const NAIVE_TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Raw state of a sensor entity as delivered by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorState {
    /// State text
    pub state: String,
    /// Declared unit of measurement
    pub unit: Option<String>,
}

impl SensorState {
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            unit: None,
        }
    }

    /// Attach a unit of measurement
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn unknown() -> Self {
        Self::new(STATE_UNKNOWN)
    }

    pub fn unavailable() -> Self {
        Self::new(STATE_UNAVAILABLE)
    }

    pub fn is_unknown(&self) -> bool {
        self.state == STATE_UNKNOWN
    }

    pub fn is_unavailable(&self) -> bool {
        self.state == STATE_UNAVAILABLE
    }

    fn is_pounds(&self) -> bool {
        self.unit
            .as_deref()
            .is_some_and(|unit| unit.eq_ignore_ascii_case(UNIT_POUNDS))
    }
}

/// Callback receiving the rounded value of a metric
pub type Callback = Box<dyn FnMut(&MetricValue)>;

/// Handle returned by [`MetricsHandler::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
    metric: Metric,
    id: u64,
}

impl Subscription {
    pub fn metric(&self) -> Metric {
        self.metric
    }
}

/// Recalculation engine for one device
pub struct MetricsHandler {
    profile: Profile,
    graph: Arc<DependencyGraph>,
    order: Arc<[Metric]>,
    store: MetricStore,
    problems: ProblemTracker,
    subscribers: HashMap<Metric, Vec<(u64, Callback)>>,
    next_subscription: u64,
    clock: Rc<dyn Clock>,
}

impl MetricsHandler {
    /// Create a handler on the system clock with its own graph
    pub fn new(config: BodyScaleConfig) -> Result<Self> {
        Self::with_parts(config, Arc::new(DependencyGraph::new()), Rc::new(SystemClock))
    }

    /// Create a handler on a custom clock
    pub fn with_clock(config: BodyScaleConfig, clock: Rc<dyn Clock>) -> Result<Self> {
        Self::with_parts(config, Arc::new(DependencyGraph::new()), clock)
    }

    /// Create a handler sharing an existing graph
    pub fn with_parts(
        config: BodyScaleConfig,
        graph: Arc<DependencyGraph>,
        clock: Rc<dyn Clock>,
    ) -> Result<Self> {
        config.validate(clock.today())?;

        let order: Arc<[Metric]> = graph
            .topological_order()
            .ok_or_else(|| {
                BodyScaleError::InvalidConfig("metric dependency graph has a cycle".to_string())
            })?
            .into();

        let ttl = Duration::from_secs(config.constraints.metric_ttl_secs);
        let store = MetricStore::new(ttl).with_persistent(&[Metric::Status]);

        let mut handler = Self {
            profile: Profile::new(config),
            graph,
            order,
            store,
            problems: ProblemTracker::new(),
            subscribers: HashMap::new(),
            next_subscription: 0,
            clock,
        };

        handler.update_status();
        handler.refresh_age();
        Ok(handler)
    }

    pub fn config(&self) -> &BodyScaleConfig {
        self.profile.config()
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn graph(&self) -> &Arc<DependencyGraph> {
        &self.graph
    }

    /// Entry point for host state changes
    pub fn on_state_changed(&mut self, entity_id: &str, state: &SensorState) -> Result<()> {
        if state.is_unknown() {
            debug!("Ignoring unknown state of {}", entity_id);
            return Ok(());
        }

        let role = self
            .profile
            .config()
            .role_of(entity_id)
            .ok_or_else(|| BodyScaleError::UnknownSensor {
                entity_id: entity_id.to_string(),
            })?;

        self.ingest(role, state)
    }

    /// Ingest a raw reading for a sensor role.
    ///
    /// Bad readings are never errors: they become problems in STATUS and the
    /// last valid value is kept.
    pub fn ingest(&mut self, role: SensorRole, state: &SensorState) -> Result<()> {
        if state.is_unknown() {
            return Ok(());
        }
        if !self.profile.config().has_role(role) {
            return Err(BodyScaleError::UnconfiguredRole { role });
        }

        debug!("Received {} reading {:?}", role, state.state);

        let evicted = self.store.evict_expired(self.clock.now());
        if evicted > 0 {
            debug!("Evicted {} expired metrics", evicted);
        }

        match self.parse_reading(role, state) {
            Ok(value) => {
                if self.problems.clear(role) {
                    self.update_status();
                }
                self.refresh_age();
                self.update_metric(role.metric(), value);
                self.recalculate_all();
            }
            Err(kind) => {
                let problem = SensorProblem { role, kind };
                match kind {
                    ProblemKind::Unavailable => debug!("Sensor problem {}", problem),
                    _ => warn!("Rejected {} reading {:?}: {}", role, state.state, kind),
                }
                if self.problems.record(role, kind) {
                    self.update_status();
                }
            }
        }

        Ok(())
    }

    fn parse_reading(
        &self,
        role: SensorRole,
        state: &SensorState,
    ) -> std::result::Result<MetricValue, ProblemKind> {
        if state.is_unavailable() {
            return Err(ProblemKind::Unavailable);
        }

        if role == SensorRole::LastMeasurementTime {
            return parse_timestamp(&state.state, self.clock.local_offset())
                .map(MetricValue::from)
                .ok_or(ProblemKind::InvalidFormat);
        }

        let raw: f64 = state
            .state
            .trim()
            .parse()
            .map_err(|_| ProblemKind::InvalidFormat)?;
        if raw.is_nan() {
            return Err(ProblemKind::Invalid);
        }

        let value = if role == SensorRole::Weight && state.is_pounds() {
            raw * POUNDS_TO_KG
        } else {
            raw
        };

        if let Some((min, max)) = self.profile.config().constraints.range(role) {
            if value < min {
                return Err(ProblemKind::Low);
            }
            if value > max {
                return Err(ProblemKind::High);
            }
        }

        Ok(MetricValue::Number(value))
    }

    /// Store a metric value and propagate it.
    ///
    /// An equal value only restarts the expiry window: nobody is notified and
    /// nothing is recomputed. Returns true when the value changed.
    pub fn update_metric(&mut self, metric: Metric, value: MetricValue) -> bool {
        let now = self.clock.now();
        if self.store.get(metric, now) == Some(&value) {
            self.store.insert(metric, value, now);
            return false;
        }

        self.store.insert(metric, value.clone(), now);
        self.notify(metric, &value);

        let graph = Arc::clone(&self.graph);
        for dependent in graph.depended_by(metric) {
            self.recalculate(*dependent);
        }

        true
    }

    /// Recompute one metric if all its dependencies are available.
    ///
    /// Returns `None` when it could not be computed.
    fn recalculate(&mut self, metric: Metric) -> Option<bool> {
        let info = self.graph.info(metric);
        let calculate = info.calculate?;
        let depends_on = info.depends_on;

        let view = self.store.view(self.clock.now());
        if !depends_on.iter().all(|dependency| view.contains(*dependency)) {
            return None;
        }
        let value = calculate(&self.profile, &view)?;

        Some(self.update_metric(metric, value))
    }

    /// Recompute every derived metric whose dependencies are available, in
    /// dependency order
    pub fn recalculate_all(&mut self) {
        let order = Arc::clone(&self.order);
        for metric in order.iter() {
            self.recalculate(*metric);
        }
    }

    fn notify(&mut self, metric: Metric, value: &MetricValue) {
        let rounded = value.rounded(self.graph.decimals(metric));
        debug!("{} = {}", metric, rounded);

        if let Some(callbacks) = self.subscribers.get_mut(&metric) {
            for (_, callback) in callbacks.iter_mut() {
                callback(&rounded);
            }
        }
    }

    fn update_status(&mut self) {
        let status = self.problems.status();
        self.update_metric(Metric::Status, MetricValue::Text(status));
    }

    /// Age in whole years today
    pub fn age(&self) -> u32 {
        self.profile.config().age_on(self.clock.today())
    }

    /// Derive AGE from the birthday and today's date
    pub fn refresh_age(&mut self) {
        let age = self.age();
        self.update_metric(Metric::Age, MetricValue::Integer(i64::from(age)));
    }

    /// Register a callback for a metric.
    ///
    /// If the metric already has a value the callback is invoked with it
    /// before returning. Callbacks must not call back into the handler.
    pub fn subscribe<F>(&mut self, metric: Metric, mut callback: F) -> Subscription
    where
        F: FnMut(&MetricValue) + 'static,
    {
        if let Some(value) = self.current(metric) {
            callback(&value);
        }

        let id = self.next_subscription;
        self.next_subscription += 1;
        self.subscribers
            .entry(metric)
            .or_default()
            .push((id, Box::new(callback)));

        Subscription { metric, id }
    }

    /// Remove a callback, returning false if it was already gone
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let Some(callbacks) = self.subscribers.get_mut(&subscription.metric) else {
            return false;
        };

        let before = callbacks.len();
        callbacks.retain(|(id, _)| *id != subscription.id);
        let removed = callbacks.len() != before;

        if callbacks.is_empty() {
            self.subscribers.remove(&subscription.metric);
        }
        removed
    }

    pub fn subscriber_count(&self, metric: Metric) -> usize {
        self.subscribers.get(&metric).map_or(0, Vec::len)
    }

    /// Drop every subscription
    pub fn clear_subscribers(&mut self) {
        self.subscribers.clear();
    }

    /// Current value as subscribers see it
    pub fn current(&self, metric: Metric) -> Option<MetricValue> {
        self.value(metric)
            .map(|value| value.rounded(self.graph.decimals(metric)))
    }

    /// Current unrounded value
    pub fn value(&self, metric: Metric) -> Option<MetricValue> {
        self.store.get(metric, self.clock.now()).cloned()
    }

    /// Metrics that currently have a value, in declaration order
    pub fn available(&self) -> Vec<Metric> {
        self.store.available(self.clock.now())
    }

    /// Aggregated STATUS text
    pub fn status(&self) -> String {
        self.problems.status()
    }

    /// Active sensor problems, in role order
    pub fn problems(&self) -> Vec<SensorProblem> {
        self.problems.problems()
    }
}

impl std::fmt::Debug for MetricsHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsHandler")
            .field("config", self.profile.config())
            .field("store", &self.store)
            .field("problems", &self.problems)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

/// Parse an ISO 8601 timestamp.
///
/// Seconds are optional and a bare date means midnight. Timestamps without an
/// offset get `local_offset`.
pub fn parse_timestamp(value: &str, local_offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    let value = value.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Some(timestamp);
    }
    if let Some(timestamp) = AWARE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| DateTime::parse_from_str(value, format).ok())
    {
        return Some(timestamp);
    }

    let naive = NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;
    local_offset.from_local_datetime(&naive).single()
}
