// bodyscale Hub - Device and sensor entity layer
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Configuration types for bodyscale Hub

use bodyscale::BodyScaleConfig;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Hub-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Maximum number of devices
    pub max_devices: usize,

    /// Feed already known entity states to devices added later
    pub replay_known_states: bool,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_devices: 16,
            replay_known_states: true,
        }
    }
}

impl HubConfig {
    /// Create a configuration with a custom device limit
    pub fn with_max_devices(max_devices: usize) -> Self {
        Self {
            max_devices,
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// One device entry: an id plus the person and sensors behind it
///
/// ```json
/// {
///   "id": "alice",
///   "height": 165,
///   "birthday": "1990-04-12",
///   "gender": "female",
///   "weight_sensor": "sensor.alice_weight",
///   "impedance_sensor": "sensor.alice_impedance"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device identifier, unique within a hub
    pub id: String,

    /// Body scale configuration
    #[serde(flatten)]
    pub scale: BodyScaleConfig,
}

impl DeviceConfig {
    pub fn new(id: impl Into<String>, scale: BodyScaleConfig) -> Self {
        Self {
            id: id.into(),
            scale,
        }
    }

    /// Parse a single device entry
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse a JSON array of device entries
    pub fn list_from_json(json: &str) -> Result<Vec<Self>> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bodyscale::{Gender, SensorRole};

    #[test]
    fn test_hub_config_defaults() {
        let config = HubConfig::from_json("{}").unwrap();
        assert_eq!(config.max_devices, 16);
        assert!(config.replay_known_states);

        let config = HubConfig::from_json(r#"{"max_devices": 2}"#).unwrap();
        assert_eq!(config.max_devices, 2);
    }

    #[test]
    fn test_device_config_from_json() {
        let device = DeviceConfig::from_json(
            r#"{
                "id": "alice",
                "height": 165,
                "birthday": "1990-04-12",
                "gender": "female",
                "weight_sensor": "sensor.alice_weight",
                "impedance_sensor": "sensor.alice_impedance"
            }"#,
        )
        .unwrap();

        assert_eq!(device.id, "alice");
        assert_eq!(device.scale.height, 165);
        assert_eq!(device.scale.gender, Gender::Female);
        assert_eq!(
            device.scale.role_of("sensor.alice_impedance"),
            Some(SensorRole::Impedance)
        );
        assert!(device.scale.last_measurement_time_sensor.is_none());
        assert_eq!(device.scale.constraints.weight_max, 200.0);
    }

    #[test]
    fn test_device_config_partial_constraints() {
        let device = DeviceConfig::from_json(
            r#"{
                "id": "bob",
                "height": 180,
                "birthday": "1985-11-02",
                "gender": "male",
                "weight_sensor": "sensor.bob_weight",
                "constraints": {"weight_max": 250.0}
            }"#,
        )
        .unwrap();

        assert_eq!(device.scale.constraints.weight_max, 250.0);
        assert_eq!(device.scale.constraints.weight_min, 10.0);
        assert_eq!(device.scale.constraints.metric_ttl_secs, 60);
    }

    #[test]
    fn test_device_config_rejects_bad_gender() {
        let result = DeviceConfig::from_json(
            r#"{"id": "x", "height": 170, "birthday": "1990-01-01",
                "gender": "other", "weight_sensor": "sensor.w"}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_device_list_roundtrip() {
        let json = r#"[
            {"id": "a", "height": 170, "birthday": "1990-01-01",
             "gender": "male", "weight_sensor": "sensor.a"},
            {"id": "b", "height": 160, "birthday": "1992-05-05",
             "gender": "female", "weight_sensor": "sensor.b"}
        ]"#;
        let devices = DeviceConfig::list_from_json(json).unwrap();
        assert_eq!(devices.len(), 2);

        let again = DeviceConfig::from_json(&devices[1].to_json().unwrap()).unwrap();
        assert_eq!(again, devices[1]);
    }
}
