//! Custom error types for the fan controller.
//!
//! This module provides fine-grained error handling for GPIO access,
//! thermal sensor reads, and configuration validation.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for fan controller operations.
#[derive(Error, Debug)]
pub enum FanControlError {
    /// GPIO subsystem or pin operation failure.
    #[error("GPIO error: {0}")]
    Gpio(#[from] rppal::gpio::Error),

    /// PWM output used before it was configured.
    #[error("PWM output not configured. Call configure_pwm() first.")]
    PwmNotConfigured,

    /// Thermal sensor file could not be read.
    #[error("failed to read thermal sensor {path}: {source}")]
    SensorRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Thermal sensor file did not contain a millidegree integer.
    #[error("unparsable thermal reading {value:?} from {path}")]
    SensorParse { path: PathBuf, value: String },

    /// Configuration invariants violated (contradictory thresholds etc.).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for fan controller operations.
pub type Result<T> = std::result::Result<T, FanControlError>;
