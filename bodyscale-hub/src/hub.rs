// bodyscale Hub - Device and sensor entity layer
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Device management for bodyscale Hub
//!
//! The [`Hub`] owns one [`Device`] per configured person. Every device wraps
//! a [`MetricsHandler`] built on the hub's shared dependency graph, plus the
//! entities rendering it. Raw entity states are pushed once into the hub,
//! which routes them to every device tracking that entity.

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use bodyscale::{
    BodyScaleConfig, Clock, DependencyGraph, Metric, MetricValue, MetricsHandler, SensorState,
    SystemClock,
};
use log::{debug, info};
use serde::Serialize;

use crate::config::{DeviceConfig, HubConfig};
use crate::entity::{sensor_descriptions, BodyScaleEntity, EntitySnapshot, MetricSensor};
use crate::error::{HubError, Result};

/// Unique identifier for a device
pub type DeviceId = String;

/// One configured person with their handler and entities
pub struct Device {
    /// Device identifier
    pub id: DeviceId,
    handler: MetricsHandler,
    entity: BodyScaleEntity,
    sensors: Vec<MetricSensor>,
}

impl Device {
    fn new(id: DeviceId, mut handler: MetricsHandler) -> Self {
        let descriptions = sensor_descriptions(handler.config());
        let sensors = descriptions
            .into_iter()
            .map(|description| MetricSensor::attach(&id, description, &mut handler))
            .collect();

        Self {
            entity: BodyScaleEntity::new(id.clone()),
            id,
            handler,
            sensors,
        }
    }

    pub fn config(&self) -> &BodyScaleConfig {
        self.handler.config()
    }

    pub fn handler(&self) -> &MetricsHandler {
        &self.handler
    }

    /// Mutable access, e.g. to add subscriptions
    pub fn handler_mut(&mut self) -> &mut MetricsHandler {
        &mut self.handler
    }

    pub fn entity(&self) -> &BodyScaleEntity {
        &self.entity
    }

    pub fn sensors(&self) -> &[MetricSensor] {
        &self.sensors
    }

    /// Sensor rendering a metric, if the device has one
    pub fn sensor(&self, metric: Metric) -> Option<&MetricSensor> {
        self.sensors.iter().find(|sensor| sensor.metric() == metric)
    }

    /// Current rounded value of a metric
    pub fn current(&self, metric: Metric) -> Option<MetricValue> {
        self.handler.current(metric)
    }

    /// Render the device entity and every sensor
    pub fn snapshot(&self) -> DeviceSnapshot {
        let config = self.handler.config();
        DeviceSnapshot {
            id: self.id.clone(),
            entity: self.entity.snapshot(&self.handler),
            sensors: self
                .sensors
                .iter()
                .map(|sensor| sensor.snapshot(config))
                .collect(),
        }
    }

    fn release(&mut self) {
        for sensor in &mut self.sensors {
            sensor.detach(&mut self.handler);
        }
        self.handler.clear_subscribers();
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("id", &self.id)
            .field("config", self.handler.config())
            .field("sensors", &self.sensors.len())
            .finish()
    }
}

/// Serialisable rendering of a device
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceSnapshot {
    pub id: DeviceId,
    pub entity: EntitySnapshot,
    pub sensors: Vec<EntitySnapshot>,
}

impl DeviceSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Manages devices and routes entity states to them
pub struct Hub {
    config: HubConfig,
    graph: Arc<DependencyGraph>,
    clock: Rc<dyn Clock>,
    /// Map of device ID to device
    devices: HashMap<DeviceId, Device>,
    /// Entity ID to the devices tracking it
    tracking: HashMap<String, Vec<DeviceId>>,
    /// Latest state of every entity pushed so far
    states: HashMap<String, SensorState>,
}

impl Hub {
    /// Create a hub with default configuration
    pub fn new() -> Self {
        Self::with_config(HubConfig::default())
    }

    /// Create a hub with custom configuration
    pub fn with_config(config: HubConfig) -> Self {
        Self::with_clock(config, Rc::new(SystemClock))
    }

    /// Create a hub whose devices share a custom clock
    pub fn with_clock(config: HubConfig, clock: Rc<dyn Clock>) -> Self {
        Self {
            config,
            graph: Arc::new(DependencyGraph::new()),
            clock,
            devices: HashMap::new(),
            tracking: HashMap::new(),
            states: HashMap::new(),
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Add a device and start tracking its sensors
    pub fn add_device(&mut self, id: impl Into<String>, config: BodyScaleConfig) -> Result<()> {
        let id = id.into();

        if self.devices.contains_key(&id) {
            return Err(HubError::DeviceAlreadyExists(id));
        }

        if self.devices.len() >= self.config.max_devices {
            return Err(HubError::MaxDevicesReached {
                max: self.config.max_devices,
            });
        }

        let handler =
            MetricsHandler::with_parts(config, Arc::clone(&self.graph), Rc::clone(&self.clock))?;
        let mut device = Device::new(id.clone(), handler);

        let entities: Vec<String> = device
            .config()
            .tracked_sensors()
            .into_iter()
            .map(str::to_string)
            .collect();

        if self.config.replay_known_states {
            for entity_id in &entities {
                if let Some(state) = self.states.get(entity_id) {
                    debug!("Replaying {} into device {}", entity_id, id);
                    device.handler.on_state_changed(entity_id, state)?;
                }
            }
        }

        for entity_id in entities {
            self.tracking.entry(entity_id).or_default().push(id.clone());
        }

        info!("Added device {} ({} sensors)", id, device.sensors.len());
        self.devices.insert(id, device);
        Ok(())
    }

    /// Add a device from its configuration entry
    pub fn add_device_config(&mut self, device: DeviceConfig) -> Result<()> {
        self.add_device(device.id, device.scale)
    }

    /// Add every device of a JSON array, returning how many were added
    pub fn add_devices_from_json(&mut self, json: &str) -> Result<usize> {
        let devices = DeviceConfig::list_from_json(json)?;
        let count = devices.len();
        for device in devices {
            self.add_device_config(device)?;
        }
        Ok(count)
    }

    /// Remove a device, releasing its subscriptions and entity tracking.
    ///
    /// Known states of entities no other device tracks are forgotten.
    pub fn remove_device(&mut self, id: &str) -> Result<Device> {
        let mut device = self
            .devices
            .remove(id)
            .ok_or_else(|| HubError::DeviceNotFound(id.to_string()))?;

        self.tracking.retain(|_, devices| {
            devices.retain(|device_id| device_id != id);
            !devices.is_empty()
        });
        for entity_id in device.config().tracked_sensors() {
            if !self.tracking.contains_key(entity_id) {
                self.states.remove(entity_id);
            }
        }
        device.release();

        info!("Removed device {}", id);
        Ok(device)
    }

    /// Record an entity state and forward it to every device tracking it.
    ///
    /// Returns the number of devices that received it.
    pub fn push_state(&mut self, entity_id: &str, state: SensorState) -> Result<usize> {
        let targets = self.tracking.get(entity_id).cloned().unwrap_or_default();

        for device_id in &targets {
            let device = self
                .devices
                .get_mut(device_id)
                .ok_or_else(|| HubError::DeviceNotFound(device_id.clone()))?;
            device.handler.on_state_changed(entity_id, &state)?;
        }

        self.states.insert(entity_id.to_string(), state);
        Ok(targets.len())
    }

    /// Get a reference to a device
    pub fn get(&self, id: &str) -> Result<&Device> {
        self.devices
            .get(id)
            .ok_or_else(|| HubError::DeviceNotFound(id.to_string()))
    }

    /// Get a mutable reference to a device
    pub fn get_mut(&mut self, id: &str) -> Result<&mut Device> {
        self.devices
            .get_mut(id)
            .ok_or_else(|| HubError::DeviceNotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.devices.contains_key(id)
    }

    /// Number of devices
    pub fn count(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Device ids, sorted
    pub fn device_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.devices.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Whether any device tracks an entity
    pub fn is_tracked(&self, entity_id: &str) -> bool {
        self.tracking.contains_key(entity_id)
    }

    /// Devices tracking an entity
    pub fn devices_tracking(&self, entity_id: &str) -> &[DeviceId] {
        self.tracking
            .get(entity_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Latest state pushed for an entity
    pub fn last_state(&self, entity_id: &str) -> Option<&SensorState> {
        self.states.get(entity_id)
    }

    /// Render a device
    pub fn snapshot(&self, id: &str) -> Result<DeviceSnapshot> {
        Ok(self.get(id)?.snapshot())
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Hub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub")
            .field("config", &self.config)
            .field("devices", &self.device_ids())
            .field("tracked_entities", &self.tracking.len())
            .finish()
    }
}
