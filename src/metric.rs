//! Metric identifiers and values

use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// One named quantity in the dependency graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Status,
    Age,
    Weight,
    Impedance,
    Bmi,
    Bmr,
    VisceralFat,
    Lbm,
    FatPercentage,
    WaterPercentage,
    BoneMass,
    MuscleMass,
    MetabolicAge,
    ProteinPercentage,
    FatMassToIdealWeight,
    BodyType,
    BodyScore,
    LastMeasurementTime,
}

impl Metric {
    /// Number of metrics
    pub const COUNT: usize = 18;

    /// Every metric, in declaration order
    pub const ALL: [Metric; Metric::COUNT] = [
        Metric::Status,
        Metric::Age,
        Metric::Weight,
        Metric::Impedance,
        Metric::Bmi,
        Metric::Bmr,
        Metric::VisceralFat,
        Metric::Lbm,
        Metric::FatPercentage,
        Metric::WaterPercentage,
        Metric::BoneMass,
        Metric::MuscleMass,
        Metric::MetabolicAge,
        Metric::ProteinPercentage,
        Metric::FatMassToIdealWeight,
        Metric::BodyType,
        Metric::BodyScore,
        Metric::LastMeasurementTime,
    ];

    /// Position in [`Metric::ALL`]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Attribute key used when the metric is presented
    pub const fn as_str(&self) -> &'static str {
        match self {
            Metric::Status => "status",
            Metric::Age => "age",
            Metric::Weight => "weight",
            Metric::Impedance => "impedance",
            Metric::Bmi => "bmi",
            Metric::Bmr => "basal_metabolism",
            Metric::VisceralFat => "visceral_fat",
            Metric::Lbm => "lean_body_mass",
            Metric::FatPercentage => "body_fat",
            Metric::WaterPercentage => "water",
            Metric::BoneMass => "bone_mass",
            Metric::MuscleMass => "muscle_mass",
            Metric::MetabolicAge => "metabolic_age",
            Metric::ProteinPercentage => "protein",
            Metric::FatMassToIdealWeight => "fat_mass_2_ideal_weight",
            Metric::BodyType => "body_type",
            Metric::BodyScore => "body_score",
            Metric::LastMeasurementTime => "last_measurement_time",
        }
    }

    /// Raw metrics are ingested from sensors, never computed
    pub fn is_raw(&self) -> bool {
        matches!(
            self,
            Metric::Weight | Metric::Impedance | Metric::LastMeasurementTime
        )
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last known value of a metric
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    /// Measured or computed quantity
    Number(f64),
    /// Whole quantity (age)
    Integer(i64),
    /// Categorical value (status, body type)
    Text(String),
    /// Point in time
    Timestamp(DateTime<FixedOffset>),
}

impl MetricValue {
    /// Numeric view, integers included
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Number(v) => Some(*v),
            MetricValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            MetricValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            MetricValue::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    /// Round a number to `decimals` places; every other kind passes through
    pub fn rounded(&self, decimals: Option<u32>) -> MetricValue {
        match (self, decimals) {
            (MetricValue::Number(v), Some(decimals)) => {
                MetricValue::Number(round_to(*v, decimals))
            }
            _ => self.clone(),
        }
    }
}

/// Round to `decimals` places, ties to even
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    let scaled = value * factor;
    let mut rounded = scaled.round();
    if (rounded - scaled).abs() == 0.5 {
        rounded = 2.0 * (scaled / 2.0).round();
    }
    rounded / factor
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Number(v) => write!(f, "{}", v),
            MetricValue::Integer(v) => write!(f, "{}", v),
            MetricValue::Text(s) => f.write_str(s),
            MetricValue::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
        }
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        MetricValue::Number(value)
    }
}

impl From<i64> for MetricValue {
    fn from(value: i64) -> Self {
        MetricValue::Integer(value)
    }
}

impl From<&str> for MetricValue {
    fn from(value: &str) -> Self {
        MetricValue::Text(value.to_string())
    }
}

impl From<String> for MetricValue {
    fn from(value: String) -> Self {
        MetricValue::Text(value)
    }
}

impl From<DateTime<FixedOffset>> for MetricValue {
    fn from(value: DateTime<FixedOffset>) -> Self {
        MetricValue::Timestamp(value)
    }
}
