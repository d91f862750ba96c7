//! # bodyscale - Body composition metrics engine
//!
//! Estimates body composition (BMI, body fat, muscle mass, body score, ...)
//! from the weight and impedance readings of a smart scale, and keeps every
//! derived metric up to date as new readings arrive.
//!
//! ## Key Features
//!
//! - **Incremental recalculation**: a raw reading recomputes only the metrics
//!   that depend on it, in dependency order
//! - **Sticky values**: out-of-range or broken readings keep the last good value
//! - **Problem status**: per-sensor problems aggregated into one STATUS metric
//! - **Passive expiry**: metrics not refreshed within a window become unavailable
//!
//! ## Quick Start
//!
//! ```rust
//! use bodyscale::{BodyScaleConfig, Gender, Metric, MetricsHandler, SensorState};
//! use chrono::NaiveDate;
//!
//! let birthday = NaiveDate::from_ymd_opt(1990, 1, 1).unwrap();
//! let config = BodyScaleConfig::new(170, birthday, Gender::Male, "sensor.weight")
//!     .with_impedance_sensor("sensor.impedance");
//! let mut handler = MetricsHandler::new(config).unwrap();
//!
//! handler.subscribe(Metric::BodyScore, |score| println!("body score: {}", score));
//!
//! handler.on_state_changed("sensor.weight", &SensorState::new("70.0")).unwrap();
//! handler.on_state_changed("sensor.impedance", &SensorState::new("500")).unwrap();
//!
//! assert!(handler.current(Metric::BodyScore).is_some());
//! assert_eq!(handler.status(), "none");
//! ```
//!
//! ## Modules
//!
//! - [`config`]: device configuration and reading constraints
//! - [`scale`]: age, gender and height banded reference ranges
//! - [`formulas`]: the metric formulas
//! - [`graph`]: static metric dependency graph
//! - [`store`]: available metrics with expiry
//! - [`status`]: sensor problem aggregation
//! - [`handler`]: the recalculation engine

// Modules
pub mod clock;
pub mod config;
pub mod error;
pub mod formulas;
pub mod graph;
pub mod handler;
pub mod metric;
pub mod scale;
pub mod status;
pub mod store;

// Re-exports for convenient access
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{parse_birthday, BodyScaleConfig, Constraints, Gender, Profile, SensorRole};
pub use error::{BodyScaleError, Result};
pub use formulas::{bmi_label, ideal_weight, BodyType};
pub use graph::{DependencyGraph, MetricInfo};
pub use handler::{MetricsHandler, SensorState, Subscription};
pub use metric::{Metric, MetricValue};
pub use scale::Scale;
pub use status::{ProblemKind, ProblemTracker, SensorProblem};
pub use store::{MetricStore, MetricsView};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
