// bodyscale Hub - Device and sensor entity layer
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # bodyscale Hub - Device and sensor entity layer
//!
//! This crate sits between a host platform and the bodyscale metrics
//! handlers. It manages one device per configured person, routes raw entity
//! states to the devices that track them and renders metrics as entities.
//!
//! ## Features
//!
//! - **Multi-device management**: one handler per person, one shared graph
//! - **State routing**: an entity shared by several devices is pushed once
//! - **Late start**: devices added later replay the states already known
//! - **Entities**: per-metric sensors plus a device entity with attributes
//!
//! ## Quick Start
//!
//! ```rust
//! use bodyscale::{Metric, MetricValue, SensorState};
//! use bodyscale_hub::Hub;
//!
//! let mut hub = Hub::new();
//! hub.add_devices_from_json(r#"[{
//!     "id": "alice",
//!     "height": 165,
//!     "birthday": "1990-04-12",
//!     "gender": "female",
//!     "weight_sensor": "sensor.bathroom_scale_weight"
//! }]"#).unwrap();
//!
//! hub.push_state("sensor.bathroom_scale_weight", SensorState::new("65")).unwrap();
//!
//! let alice = hub.get("alice").unwrap();
//! assert_eq!(alice.current(Metric::Bmi), Some(MetricValue::Number(23.9)));
//! println!("{}", alice.snapshot().to_json().unwrap());
//! ```

mod config;
mod entity;
mod error;
mod hub;

// Public API
pub use config::{DeviceConfig, HubConfig};
pub use entity::{
    sensor_descriptions, BodyScaleEntity, EntitySnapshot, ExtraAttributes, MetricSensor,
    SensorDescription, ATTR_AGE, ATTR_BMI_LABEL, ATTR_FAT_MASS_TO_GAIN, ATTR_FAT_MASS_TO_LOSE,
    ATTR_GENDER, ATTR_HEIGHT, ATTR_IDEAL, ATTR_PROBLEM, DOMAIN, SENSOR_DESCRIPTIONS, STATE_OK,
    STATE_PROBLEM,
};
pub use error::{HubError, Result};
pub use hub::{Device, DeviceId, DeviceSnapshot, Hub};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
