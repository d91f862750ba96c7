//! Device configuration
//!
//! A [`BodyScaleConfig`] describes one person weighing on one scale: their
//! height, birthday and gender, plus the entity ids of the sensors that feed
//! readings in. It is immutable for the lifetime of a
//! [`MetricsHandler`](crate::handler::MetricsHandler).

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{BodyScaleError, Result};
use crate::metric::Metric;
use crate::scale::Scale;

/// Minimum accepted height (cm)
pub const CONSTRAINT_HEIGHT_MIN: u32 = 50;
/// Maximum accepted height (cm)
pub const CONSTRAINT_HEIGHT_MAX: u32 = 220;
/// Minimum valid weight reading (kg)
pub const CONSTRAINT_WEIGHT_MIN: f64 = 10.0;
/// Maximum valid weight reading (kg)
pub const CONSTRAINT_WEIGHT_MAX: f64 = 200.0;
/// Minimum valid impedance reading (ohm)
pub const CONSTRAINT_IMPEDANCE_MIN: f64 = 50.0;
/// Maximum valid impedance reading (ohm)
pub const CONSTRAINT_IMPEDANCE_MAX: f64 = 3000.0;
/// Maximum age covered by the scale tables
pub const CONSTRAINT_AGE_MAX: u32 = 99;
/// Seconds a stored metric stays available without being refreshed
pub const DEFAULT_METRIC_TTL_SECS: u64 = 60;

/// Unit attribute that marks a weight sensor reporting pounds
pub const UNIT_POUNDS: &str = "lb";
/// Pounds to kilograms
pub const POUNDS_TO_KG: f64 = 0.45359237;

/// Gender, selects the coefficients of most formulas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

/// The part a raw sensor plays for a device.
///
/// Ordering is significant: problems are reported weight first, then
/// impedance, then last measurement time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorRole {
    Weight,
    Impedance,
    LastMeasurementTime,
}

impl SensorRole {
    /// Prefix used for this sensor's problem tokens in STATUS
    pub fn problem_prefix(&self) -> &'static str {
        match self {
            SensorRole::Weight => "weight",
            SensorRole::Impedance => "impedance",
            SensorRole::LastMeasurementTime => "last_time",
        }
    }

    /// Metric the readings of this sensor are stored under
    pub fn metric(&self) -> Metric {
        match self {
            SensorRole::Weight => Metric::Weight,
            SensorRole::Impedance => Metric::Impedance,
            SensorRole::LastMeasurementTime => Metric::LastMeasurementTime,
        }
    }
}

impl fmt::Display for SensorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.problem_prefix())
    }
}

/// Validity bounds for raw readings and store expiry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Constraints {
    /// Lowest valid weight (kg)
    pub weight_min: f64,
    /// Highest valid weight (kg)
    pub weight_max: f64,
    /// Lowest valid impedance (ohm)
    pub impedance_min: f64,
    /// Highest valid impedance (ohm)
    pub impedance_max: f64,
    /// Seconds before an unrefreshed metric is evicted
    pub metric_ttl_secs: u64,
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            weight_min: CONSTRAINT_WEIGHT_MIN,
            weight_max: CONSTRAINT_WEIGHT_MAX,
            impedance_min: CONSTRAINT_IMPEDANCE_MIN,
            impedance_max: CONSTRAINT_IMPEDANCE_MAX,
            metric_ttl_secs: DEFAULT_METRIC_TTL_SECS,
        }
    }
}

impl Constraints {
    /// Valid `(min, max)` range for a numeric sensor role
    pub fn range(&self, role: SensorRole) -> Option<(f64, f64)> {
        match role {
            SensorRole::Weight => Some((self.weight_min, self.weight_max)),
            SensorRole::Impedance => Some((self.impedance_min, self.impedance_max)),
            SensorRole::LastMeasurementTime => None,
        }
    }
}

/// Configuration of one body scale device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyScaleConfig {
    /// Height in centimetres
    pub height: u32,
    /// Date of birth
    pub birthday: NaiveDate,
    /// Gender
    pub gender: Gender,
    /// Entity id of the weight sensor
    pub weight_sensor: String,
    /// Entity id of the impedance sensor
    #[serde(default)]
    pub impedance_sensor: Option<String>,
    /// Entity id of the sensor reporting when the last weighing happened
    #[serde(default)]
    pub last_measurement_time_sensor: Option<String>,
    /// Reading bounds
    #[serde(default)]
    pub constraints: Constraints,
}

impl BodyScaleConfig {
    /// Create a weight-only configuration
    pub fn new(
        height: u32,
        birthday: NaiveDate,
        gender: Gender,
        weight_sensor: impl Into<String>,
    ) -> Self {
        Self {
            height,
            birthday,
            gender,
            weight_sensor: weight_sensor.into(),
            impedance_sensor: None,
            last_measurement_time_sensor: None,
            constraints: Constraints::default(),
        }
    }

    /// Add an impedance sensor
    pub fn with_impedance_sensor(mut self, entity_id: impl Into<String>) -> Self {
        self.impedance_sensor = Some(entity_id.into());
        self
    }

    /// Add a last-measurement-time sensor
    pub fn with_last_measurement_time_sensor(mut self, entity_id: impl Into<String>) -> Self {
        self.last_measurement_time_sensor = Some(entity_id.into());
        self
    }

    /// Replace the reading bounds
    pub fn with_constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = constraints;
        self
    }

    /// Whether impedance-based metrics can ever be computed
    pub fn has_impedance(&self) -> bool {
        self.impedance_sensor.is_some()
    }

    /// Age in whole years on the given day
    pub fn age_on(&self, today: NaiveDate) -> u32 {
        age_on(self.birthday, today)
    }

    /// Which role an entity plays, if any
    pub fn role_of(&self, entity_id: &str) -> Option<SensorRole> {
        if entity_id == self.weight_sensor {
            Some(SensorRole::Weight)
        } else if self.impedance_sensor.as_deref() == Some(entity_id) {
            Some(SensorRole::Impedance)
        } else if self.last_measurement_time_sensor.as_deref() == Some(entity_id) {
            Some(SensorRole::LastMeasurementTime)
        } else {
            None
        }
    }

    /// Whether a role has a sensor configured
    pub fn has_role(&self, role: SensorRole) -> bool {
        match role {
            SensorRole::Weight => true,
            SensorRole::Impedance => self.impedance_sensor.is_some(),
            SensorRole::LastMeasurementTime => self.last_measurement_time_sensor.is_some(),
        }
    }

    /// Entity ids that must be observed, in role order
    pub fn tracked_sensors(&self) -> Vec<&str> {
        let mut sensors = vec![self.weight_sensor.as_str()];
        sensors.extend(self.impedance_sensor.as_deref());
        sensors.extend(self.last_measurement_time_sensor.as_deref());
        sensors
    }

    /// Check the configuration against the supported ranges
    pub fn validate(&self, today: NaiveDate) -> Result<()> {
        if !(CONSTRAINT_HEIGHT_MIN..=CONSTRAINT_HEIGHT_MAX).contains(&self.height) {
            return Err(BodyScaleError::InvalidConfig(format!(
                "height {} cm outside {}..={} cm",
                self.height, CONSTRAINT_HEIGHT_MIN, CONSTRAINT_HEIGHT_MAX
            )));
        }

        if self.birthday > today {
            return Err(BodyScaleError::InvalidBirthday(format!(
                "{} is in the future",
                self.birthday
            )));
        }

        let age = self.age_on(today);
        if age > CONSTRAINT_AGE_MAX {
            return Err(BodyScaleError::InvalidConfig(format!(
                "age {} outside 0..={}",
                age, CONSTRAINT_AGE_MAX
            )));
        }

        if self.weight_sensor.trim().is_empty() {
            return Err(BodyScaleError::InvalidConfig(
                "weight sensor is required".to_string(),
            ));
        }

        let sensors = self.tracked_sensors();
        for (i, sensor) in sensors.iter().enumerate() {
            if sensors[..i].contains(sensor) {
                return Err(BodyScaleError::InvalidConfig(format!(
                    "sensor {} is used for more than one reading",
                    sensor
                )));
            }
        }

        let c = &self.constraints;
        if c.weight_min >= c.weight_max || c.impedance_min >= c.impedance_max {
            return Err(BodyScaleError::InvalidConfig(
                "constraint minimum must be below maximum".to_string(),
            ));
        }

        Ok(())
    }
}

/// Parse a `YYYY-MM-DD` birthday
pub fn parse_birthday(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|e| BodyScaleError::InvalidBirthday(format!("{}: {}", value, e)))
}

/// Whole years between `born` and `today`
pub fn age_on(born: NaiveDate, today: NaiveDate) -> u32 {
    let mut age = today.year() - born.year();
    if (today.month(), today.day()) < (born.month(), born.day()) {
        age -= 1;
    }
    age.max(0) as u32
}

/// Configuration plus the lookup tables derived from it once
#[derive(Debug, Clone)]
pub struct Profile {
    config: BodyScaleConfig,
    scale: Scale,
}

impl Profile {
    /// Derive the scale tables for a configuration
    pub fn new(config: BodyScaleConfig) -> Self {
        let scale = Scale::new(config.height, config.gender);
        Self { config, scale }
    }

    pub fn config(&self) -> &BodyScaleConfig {
        &self.config
    }

    pub fn scale(&self) -> &Scale {
        &self.scale
    }

    /// Height in centimetres
    pub fn height(&self) -> f64 {
        f64::from(self.config.height)
    }

    pub fn gender(&self) -> Gender {
        self.config.gender
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn config() -> BodyScaleConfig {
        BodyScaleConfig::new(170, date(1990, 6, 15), Gender::Male, "sensor.weight")
            .with_impedance_sensor("sensor.impedance")
    }

    #[test]
    fn test_age_before_and_after_birthday() {
        let born = date(1990, 6, 15);
        assert_eq!(age_on(born, date(2020, 6, 14)), 29);
        assert_eq!(age_on(born, date(2020, 6, 15)), 30);
        assert_eq!(age_on(born, date(2020, 12, 1)), 30);
    }

    #[test]
    fn test_role_of() {
        let config = config();
        assert_eq!(config.role_of("sensor.weight"), Some(SensorRole::Weight));
        assert_eq!(config.role_of("sensor.impedance"), Some(SensorRole::Impedance));
        assert_eq!(config.role_of("sensor.other"), None);
    }

    #[test]
    fn test_tracked_sensors_order() {
        let config = config().with_last_measurement_time_sensor("sensor.last");
        assert_eq!(
            config.tracked_sensors(),
            vec!["sensor.weight", "sensor.impedance", "sensor.last"]
        );
    }

    #[test]
    fn test_validate_height() {
        let mut config = config();
        assert!(config.validate(date(2024, 1, 1)).is_ok());

        config.height = 221;
        assert!(matches!(
            config.validate(date(2024, 1, 1)),
            Err(BodyScaleError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_future_birthday() {
        let config = config();
        assert!(matches!(
            config.validate(date(1980, 1, 1)),
            Err(BodyScaleError::InvalidBirthday(_))
        ));
    }

    #[test]
    fn test_validate_duplicate_sensor() {
        let config = BodyScaleConfig::new(170, date(1990, 1, 1), Gender::Female, "sensor.x")
            .with_impedance_sensor("sensor.x");
        assert!(config.validate(date(2024, 1, 1)).is_err());
    }

    #[test]
    fn test_parse_birthday() {
        assert_eq!(parse_birthday("1990-06-15").unwrap(), date(1990, 6, 15));
        assert!(parse_birthday("15/06/1990").is_err());
    }

    #[test]
    fn test_constraints_default() {
        let c = Constraints::default();
        assert_eq!(c.range(SensorRole::Weight), Some((10.0, 200.0)));
        assert_eq!(c.range(SensorRole::Impedance), Some((50.0, 3000.0)));
        assert_eq!(c.range(SensorRole::LastMeasurementTime), None);
        assert_eq!(c.metric_ttl_secs, 60);
    }

    #[test]
    fn test_config_from_json() {
        let config: BodyScaleConfig = serde_json::from_str(
            r#"{"height": 165, "birthday": "1990-04-12", "gender": "female",
                "weight_sensor": "sensor.weight"}"#,
        )
        .unwrap();

        assert_eq!(config.gender, Gender::Female);
        assert_eq!(config.birthday, date(1990, 4, 12));
        assert_eq!(config.impedance_sensor, None);
        assert_eq!(config.constraints, Constraints::default());

        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains(r#""gender":"female""#));
        let back: BodyScaleConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_partial_constraints_from_json() {
        let constraints: Constraints =
            serde_json::from_str(r#"{"weight_max": 150.0, "metric_ttl_secs": 300}"#).unwrap();
        assert_eq!(constraints.weight_min, CONSTRAINT_WEIGHT_MIN);
        assert_eq!(constraints.weight_max, 150.0);
        assert_eq!(constraints.impedance_max, CONSTRAINT_IMPEDANCE_MAX);
        assert_eq!(constraints.metric_ttl_secs, 300);
    }

    #[test]
    fn test_problem_prefix_order() {
        assert!(SensorRole::Weight < SensorRole::Impedance);
        assert!(SensorRole::Impedance < SensorRole::LastMeasurementTime);
        assert_eq!(SensorRole::LastMeasurementTime.problem_prefix(), "last_time");
    }
}
