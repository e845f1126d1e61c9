//! Thermal sensor access.
//!
//! The controller samples one sysfs thermal-zone file per tick. The file
//! yields a textual integer in millidegrees Celsius; readings are rounded to
//! whole degrees.

use std::path::PathBuf;

use crate::error::{FanControlError, Result};

/// Source of the temperature driving the speed curve.
pub trait TemperatureSource {
    /// Read the current temperature in whole degrees Celsius.
    fn read_temp_c(&mut self) -> Result<i32>;
}

// =============================================================================
// ThermalZoneSensor
// =============================================================================

/// Reads a sysfs thermal-zone file such as
/// `/sys/class/thermal/thermal_zone0/temp`.
pub struct ThermalZoneSensor {
    path: PathBuf,
}

impl ThermalZoneSensor {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl TemperatureSource for ThermalZoneSensor {
    fn read_temp_c(&mut self) -> Result<i32> {
        let raw = std::fs::read_to_string(&self.path).map_err(|source| {
            FanControlError::SensorRead {
                path: self.path.clone(),
                source,
            }
        })?;
        let millidegrees: i64 =
            raw.trim()
                .parse()
                .map_err(|_| FanControlError::SensorParse {
                    path: self.path.clone(),
                    value: raw.trim().to_string(),
                })?;
        Ok((millidegrees as f64 / 1000.0).round() as i32)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn sensor_with(content: &str) -> (NamedTempFile, ThermalZoneSensor) {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file.flush().unwrap();
        let sensor = ThermalZoneSensor::new(file.path().to_path_buf());
        (file, sensor)
    }

    #[test]
    fn test_read_rounds_down() {
        let (_file, mut sensor) = sensor_with("47123\n");
        assert_eq!(sensor.read_temp_c().unwrap(), 47);
    }

    #[test]
    fn test_read_rounds_up() {
        let (_file, mut sensor) = sensor_with("47500");
        assert_eq!(sensor.read_temp_c().unwrap(), 48);
    }

    #[test]
    fn test_missing_file() {
        let mut sensor = ThermalZoneSensor::new(PathBuf::from("/nonexistent/temp"));
        assert!(matches!(
            sensor.read_temp_c(),
            Err(FanControlError::SensorRead { .. })
        ));
    }

    #[test]
    fn test_unparsable_contents() {
        let (_file, mut sensor) = sensor_with("not-a-number");
        assert!(matches!(
            sensor.read_temp_c(),
            Err(FanControlError::SensorParse { .. })
        ));
    }
}
