//! Raspberry Pi PWM Fan Controller Library
//!
//! A closed-loop, temperature-driven PWM fan controller for single-board
//! computers. Intended for the "Noctua NF-A4x10 5V PWM" fan on a Raspberry
//! Pi 4; other PWM fans work with adjusted configuration.
//!
//! # Features
//!
//! - Piecewise-linear temperature-to-duty speed curve with clamping
//! - Redundant-write suppression (hardware is touched only on change)
//! - Optional tachometer RPM measurement via falling-edge interrupts
//! - Guaranteed cleanup: fan off, original pin modes restored
//!
//! # Example
//!
//! ```no_run
//! use rpi_fan_control::config::Config;
//! use rpi_fan_control::controller::Controller;
//! use rpi_fan_control::device::RpiBackend;
//! use rpi_fan_control::sensor::ThermalZoneSensor;
//! use rpi_fan_control::shutdown::ShutdownToken;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load(&Config::default_path());
//!     config.validate()?;
//!
//!     let backend = RpiBackend::open()?;
//!     let sensor = ThermalZoneSensor::new(config.thermal_file.clone());
//!
//!     let shutdown = ShutdownToken::new();
//!     let handle = shutdown.clone();
//!     ctrlc::set_handler(move || handle.trigger())?;
//!
//!     Controller::new(config, backend, sensor, shutdown)?.run()?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod controller;
pub mod cooling;
pub mod device;
pub mod error;
pub mod sensor;
pub mod shutdown;
pub mod tacho;

// Re-exports for convenience
pub use config::{Config, CurveParams};
pub use controller::Controller;
pub use device::{PinMode, PwmBackend, RpiBackend};
pub use error::{FanControlError, Result};
pub use shutdown::ShutdownToken;
