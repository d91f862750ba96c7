// bodyscale Hub - Device and sensor entity layer
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Sensor entities
//!
//! A [`MetricSensor`] mirrors one metric of a handler through a subscription
//! and renders it with its unit and extra attributes. The [`BodyScaleEntity`]
//! is the device-level entity: its state is `ok` or `problem` and its
//! attributes gather every available metric.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use bodyscale::{
    bmi_label, ideal_weight, BodyScaleConfig, Metric, MetricValue, MetricsHandler, Subscription,
};
use serde::Serialize;

use crate::error::Result;

/// Prefix of every unique id
pub const DOMAIN: &str = "bodyscale";

/// Device state when STATUS is `none`
pub const STATE_OK: &str = "ok";
/// Device state while any sensor has a problem
pub const STATE_PROBLEM: &str = "problem";

pub const ATTR_AGE: &str = "age";
pub const ATTR_BMI_LABEL: &str = "bmi_label";
pub const ATTR_FAT_MASS_TO_GAIN: &str = "fat_mass_to_gain";
pub const ATTR_FAT_MASS_TO_LOSE: &str = "fat_mass_to_lose";
pub const ATTR_GENDER: &str = "gender";
pub const ATTR_HEIGHT: &str = "height";
pub const ATTR_IDEAL: &str = "ideal_weight";
pub const ATTR_PROBLEM: &str = "problem";

/// Extra attributes a sensor renders next to its value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtraAttributes {
    None,
    /// BMI category of the current value
    BmiLabel,
    /// Ideal weight for the configured height
    IdealWeight,
}

/// Static description of a metric sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorDescription {
    /// Key used in unique ids and names
    pub key: &'static str,
    /// Metric rendered
    pub metric: Metric,
    /// Unit of measurement
    pub unit: Option<&'static str>,
    /// Suggested display precision
    pub display_precision: Option<u32>,
    /// Only created when an impedance sensor is configured
    pub requires_impedance: bool,
    /// Extra attributes
    pub extra: ExtraAttributes,
}

const fn describe(
    metric: Metric,
    unit: Option<&'static str>,
    display_precision: Option<u32>,
    requires_impedance: bool,
    extra: ExtraAttributes,
) -> SensorDescription {
    SensorDescription {
        key: metric.as_str(),
        metric,
        unit,
        display_precision,
        requires_impedance,
        extra,
    }
}

const KG: Option<&str> = Some("kg");
const PERCENT: Option<&str> = Some("%");

/// Every metric sensor, weight based ones first
pub static SENSOR_DESCRIPTIONS: [SensorDescription; 12] = [
    describe(Metric::Bmi, None, None, false, ExtraAttributes::BmiLabel),
    describe(Metric::Bmr, Some("kcal"), Some(0), false, ExtraAttributes::None),
    describe(Metric::VisceralFat, None, Some(0), false, ExtraAttributes::None),
    describe(Metric::Weight, KG, None, false, ExtraAttributes::IdealWeight),
    describe(Metric::Lbm, None, None, true, ExtraAttributes::None),
    describe(Metric::FatPercentage, PERCENT, None, true, ExtraAttributes::None),
    describe(Metric::ProteinPercentage, PERCENT, None, true, ExtraAttributes::None),
    describe(Metric::WaterPercentage, PERCENT, None, true, ExtraAttributes::None),
    describe(Metric::BoneMass, KG, None, true, ExtraAttributes::None),
    describe(Metric::MuscleMass, KG, None, true, ExtraAttributes::None),
    describe(Metric::MetabolicAge, None, Some(0), true, ExtraAttributes::None),
    describe(Metric::BodyScore, None, Some(0), true, ExtraAttributes::None),
];

/// Sensor descriptions that apply to a configuration
pub fn sensor_descriptions(config: &BodyScaleConfig) -> Vec<&'static SensorDescription> {
    SENSOR_DESCRIPTIONS
        .iter()
        .filter(|description| config.has_impedance() || !description.requires_impedance)
        .collect()
}

fn unique_id(device_id: &str, key: &str) -> String {
    [DOMAIN, device_id, key].join("_")
}

fn display_name(key: &str) -> String {
    let spaced = key.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Rendered state of an entity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntitySnapshot {
    pub unique_id: String,
    pub name: String,
    pub state: Option<MetricValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<&'static str>,
    pub attributes: BTreeMap<String, MetricValue>,
}

impl EntitySnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Entity mirroring one metric of a handler
#[derive(Debug)]
pub struct MetricSensor {
    description: &'static SensorDescription,
    unique_id: String,
    value: Rc<RefCell<Option<MetricValue>>>,
    subscription: Option<Subscription>,
}

impl MetricSensor {
    /// Create the sensor and subscribe it to its metric
    pub fn attach(
        device_id: &str,
        description: &'static SensorDescription,
        handler: &mut MetricsHandler,
    ) -> Self {
        let value = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&value);
        let subscription = handler.subscribe(description.metric, move |new_value| {
            *sink.borrow_mut() = Some(new_value.clone());
        });

        Self {
            description,
            unique_id: unique_id(device_id, description.key),
            value,
            subscription: Some(subscription),
        }
    }

    /// Remove the subscription; the last value stays readable
    pub fn detach(&mut self, handler: &mut MetricsHandler) {
        if let Some(subscription) = self.subscription.take() {
            handler.unsubscribe(subscription);
        }
    }

    pub fn is_attached(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn description(&self) -> &'static SensorDescription {
        self.description
    }

    pub fn metric(&self) -> Metric {
        self.description.metric
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    /// Last value pushed by the handler
    pub fn native_value(&self) -> Option<MetricValue> {
        self.value.borrow().clone()
    }

    /// Extra attributes for the current value
    pub fn attributes(&self, config: &BodyScaleConfig) -> BTreeMap<String, MetricValue> {
        let mut attributes = BTreeMap::new();
        match self.description.extra {
            ExtraAttributes::None => {}
            ExtraAttributes::BmiLabel => {
                if let Some(bmi) = self.native_value().and_then(|v| v.as_f64()) {
                    attributes.insert(ATTR_BMI_LABEL.to_string(), bmi_label(bmi).into());
                }
            }
            ExtraAttributes::IdealWeight => {
                attributes.insert(ATTR_IDEAL.to_string(), ideal_weight(config).into());
            }
        }
        attributes
    }

    pub fn snapshot(&self, config: &BodyScaleConfig) -> EntitySnapshot {
        EntitySnapshot {
            unique_id: self.unique_id.clone(),
            name: display_name(self.description.key),
            state: self.native_value(),
            unit: self.description.unit,
            attributes: self.attributes(config),
        }
    }
}

/// Device-level entity aggregating every metric of a handler
#[derive(Debug, Clone)]
pub struct BodyScaleEntity {
    device_id: String,
    unique_id: String,
}

impl BodyScaleEntity {
    pub fn new(device_id: impl Into<String>) -> Self {
        let device_id = device_id.into();
        let unique_id = unique_id(&device_id, DOMAIN);
        Self {
            device_id,
            unique_id,
        }
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    /// `ok` when no sensor has a problem, `problem` otherwise
    pub fn state(&self, handler: &MetricsHandler) -> &'static str {
        if handler.problems().is_empty() {
            STATE_OK
        } else {
            STATE_PROBLEM
        }
    }

    /// Profile, derived values and every available metric.
    ///
    /// STATUS appears as `problem`. The fat mass to ideal weight is split into
    /// a `fat_mass_to_gain` or `fat_mass_to_lose` magnitude.
    pub fn attributes(&self, handler: &MetricsHandler) -> BTreeMap<String, MetricValue> {
        let config = handler.config();
        let mut attributes = BTreeMap::new();

        attributes.insert(
            ATTR_HEIGHT.to_string(),
            MetricValue::Integer(i64::from(config.height)),
        );
        attributes.insert(ATTR_GENDER.to_string(), config.gender.as_str().into());
        attributes.insert(ATTR_IDEAL.to_string(), ideal_weight(config).into());
        attributes.insert(
            ATTR_AGE.to_string(),
            MetricValue::Integer(i64::from(handler.age())),
        );

        for metric in handler.available() {
            let Some(value) = handler.current(metric) else {
                continue;
            };

            match metric {
                Metric::Status => {
                    attributes.insert(ATTR_PROBLEM.to_string(), value);
                }
                Metric::Age => {}
                Metric::FatMassToIdealWeight => {
                    if let Some(mass) = value.as_f64() {
                        if mass < 0.0 {
                            attributes.insert(ATTR_FAT_MASS_TO_LOSE.to_string(), (-mass).into());
                        } else {
                            attributes.insert(ATTR_FAT_MASS_TO_GAIN.to_string(), mass.into());
                        }
                    }
                }
                Metric::Bmi => {
                    if let Some(bmi) = value.as_f64() {
                        attributes.insert(ATTR_BMI_LABEL.to_string(), bmi_label(bmi).into());
                    }
                    attributes.insert(metric.as_str().to_string(), value);
                }
                _ => {
                    attributes.insert(metric.as_str().to_string(), value);
                }
            }
        }

        attributes
    }

    pub fn snapshot(&self, handler: &MetricsHandler) -> EntitySnapshot {
        EntitySnapshot {
            unique_id: self.unique_id.clone(),
            name: display_name(&self.device_id),
            state: Some(self.state(handler).into()),
            unit: None,
            attributes: self.attributes(handler),
        }
    }
}
