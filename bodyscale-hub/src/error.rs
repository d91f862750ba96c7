// bodyscale Hub - Device and sensor entity layer
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Error types for bodyscale Hub

use thiserror::Error;

/// Main error type for Hub operations
#[derive(Error, Debug)]
pub enum HubError {
    /// Device not found
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Device already exists
    #[error("Device already exists: {0}")]
    DeviceAlreadyExists(String),

    /// Maximum devices reached
    #[error("Maximum devices ({max}) reached")]
    MaxDevicesReached { max: usize },

    /// Device configuration could not be read
    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),

    /// Error from a metrics handler
    #[error("Handler error: {0}")]
    Core(#[from] bodyscale::BodyScaleError),
}

/// Result type alias for Hub operations
pub type Result<T> = std::result::Result<T, HubError>;
