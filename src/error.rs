//! Error types for bodyscale
//!
//! Only construction and wiring mistakes are errors. Bad sensor readings are
//! never surfaced here: they are recorded as problems in the STATUS metric.

use thiserror::Error;

use crate::config::SensorRole;

/// Result type alias for bodyscale operations
pub type Result<T> = std::result::Result<T, BodyScaleError>;

/// Main error type for bodyscale operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BodyScaleError {
    /// A state change arrived from an entity the handler does not track
    #[error("Unknown reading from sensor {entity_id}")]
    UnknownSensor { entity_id: String },

    /// A reading was ingested for a role that has no sensor configured
    #[error("No {role} sensor configured")]
    UnconfiguredRole { role: SensorRole },

    /// The configuration is unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The birthday could not be parsed as a calendar date
    #[error("Invalid birthday: {0}")]
    InvalidBirthday(String),
}
