//! Sensor problem tracking
//!
//! Each raw sensor carries at most one active problem. The STATUS metric is
//! the problems joined in role order, or `"none"` when every sensor is fine.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::config::SensorRole;

/// STATUS value when no sensor has a problem
pub const PROBLEM_NONE: &str = "none";
/// Joins problem tokens in STATUS
pub const PROBLEM_SEPARATOR: &str = "_and_";

/// What is wrong with a raw reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemKind {
    /// The sensor reports itself unavailable
    Unavailable,
    /// Below the valid range
    Low,
    /// Above the valid range
    High,
    /// Parsed, but not a usable value
    Invalid,
    /// Could not be parsed at all
    InvalidFormat,
}

impl ProblemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProblemKind::Unavailable => "unavailable",
            ProblemKind::Low => "low",
            ProblemKind::High => "high",
            ProblemKind::Invalid => "invalid",
            ProblemKind::InvalidFormat => "invalid_format",
        }
    }
}

impl fmt::Display for ProblemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A problem attached to one sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SensorProblem {
    pub role: SensorRole,
    pub kind: ProblemKind,
}

impl SensorProblem {
    /// Token as it appears in STATUS, e.g. `weight_low`
    pub fn token(&self) -> String {
        format!("{}_{}", self.role.problem_prefix(), self.kind.as_str())
    }
}

impl fmt::Display for SensorProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.role.problem_prefix(), self.kind)
    }
}

/// Active problems, at most one per sensor
#[derive(Debug, Clone, Default)]
pub struct ProblemTracker {
    active: BTreeMap<SensorRole, ProblemKind>,
}

impl ProblemTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the problem of a sensor, replacing any previous one.
    ///
    /// Returns true when the set of problems changed.
    pub fn record(&mut self, role: SensorRole, kind: ProblemKind) -> bool {
        self.active.insert(role, kind) != Some(kind)
    }

    /// Forget the problem of a sensor, returning true if it had one
    pub fn clear(&mut self, role: SensorRole) -> bool {
        self.active.remove(&role).is_some()
    }

    /// Current problem of a sensor
    pub fn get(&self, role: SensorRole) -> Option<ProblemKind> {
        self.active.get(&role).copied()
    }

    /// Active problems in role order
    pub fn problems(&self) -> Vec<SensorProblem> {
        self.active
            .iter()
            .map(|(role, kind)| SensorProblem {
                role: *role,
                kind: *kind,
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// STATUS text for the active problems
    pub fn status(&self) -> String {
        if self.active.is_empty() {
            return PROBLEM_NONE.to_string();
        }

        self.problems()
            .iter()
            .map(SensorProblem::token)
            .collect::<Vec<_>>()
            .join(PROBLEM_SEPARATOR)
    }
}
