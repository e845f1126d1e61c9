//! Controller configuration: defaults, file loading, and validation.
//!
//! Configuration is read once at startup from a plain `KEY=value` file and
//! never mutated afterwards. A missing file is not an error; defaults for the
//! reference fan (Noctua NF-A4x10 5V PWM on a Raspberry Pi 4) apply.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{FanControlError, Result};

/// System-wide configuration file location.
const SYSTEM_CONFIG_PATH: &str = "/etc/fan-control/params.conf";

// =============================================================================
// Config
// =============================================================================

/// Immutable-after-load controller configuration.
///
/// Field names mirror the `KEY=value` keys of the configuration file.
#[derive(Clone, Debug, Serialize)]
pub struct Config {
    /// PWM output pin (BCM numbering). HW PWM works at GPIO 12, 13, 18 and 19
    /// on the RPi4B.
    pub pwm_pin: u8,
    /// Tachometer input pin (BCM numbering).
    pub tacho_pin: u8,
    /// Fan speed ceiling. Noctua specs: Max=5000.
    pub rpm_max: u32,
    /// Lowest speed the curve may command while the fan is engaged.
    pub rpm_min: u32,
    /// Duty applied below the lower temperature threshold.
    pub rpm_off: u32,
    /// PWM switching frequency in Hz. Noctua specs: Target_Frequency=25kHz.
    pub pwm_frequency: u32,
    /// Above this temperature the fan runs at max speed.
    pub temp_max: i32,
    /// At or below this temperature the fan is off.
    pub temp_low: i32,
    /// Milliseconds between control ticks.
    pub wait_ms: u64,
    /// Whether to count tachometer pulses and log measured RPM.
    pub tacho_enabled: bool,
    /// Thermal zone file yielding millidegrees Celsius.
    pub thermal_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pwm_pin: 18,
            tacho_pin: 23,
            rpm_max: 5000,
            rpm_min: 1500,
            rpm_off: 0,
            pwm_frequency: 25_000,
            temp_max: 55,
            temp_low: 40,
            wait_ms: 5000,
            tacho_enabled: false,
            thermal_file: PathBuf::from("/sys/class/thermal/thermal_zone0/temp"),
        }
    }
}

impl Config {
    /// Resolve the default configuration file location.
    ///
    /// Prefers the system-wide path, falling back to the per-user config
    /// directory when the system file does not exist.
    pub fn default_path() -> PathBuf {
        let system = PathBuf::from(SYSTEM_CONFIG_PATH);
        if system.exists() {
            return system;
        }
        dirs::config_dir()
            .map(|dir| dir.join("fan-control").join("params.conf"))
            .unwrap_or(system)
    }

    /// Load configuration from `path`.
    ///
    /// An absent file is not an error: defaults apply and a warning is
    /// logged. Fields present in the file override defaults; absent or
    /// malformed fields keep their defaults. No partial-record error is
    /// raised.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let config = Self::parse(&content);
                config.log_loaded();
                config
            }
            Err(_) => {
                warn!("{} not found - default values loaded", path.display());
                Self::default()
            }
        }
    }

    /// Parse whitespace-separated `KEY=value` entries, starting from
    /// defaults. Lines beginning with `#` are skipped.
    fn parse(content: &str) -> Self {
        let mut config = Self::default();
        for line in content.lines() {
            if line.trim_start().starts_with('#') {
                continue;
            }
            for entry in line.split_whitespace() {
                match entry.split_once('=') {
                    Some((key, value)) => config.apply(key, value),
                    None => warn!("ignoring malformed config entry {:?}", entry),
                }
            }
        }
        config
    }

    fn apply(&mut self, key: &str, value: &str) {
        match key {
            "PWM_PIN" => set_field(&mut self.pwm_pin, key, value),
            "TACHO_PIN" => set_field(&mut self.tacho_pin, key, value),
            "RPM_MAX" => set_field(&mut self.rpm_max, key, value),
            "RPM_MIN" => set_field(&mut self.rpm_min, key, value),
            "RPM_OFF" => set_field(&mut self.rpm_off, key, value),
            "FREQUENCY" => set_field(&mut self.pwm_frequency, key, value),
            "TEMP_MAX" => set_field(&mut self.temp_max, key, value),
            "TEMP_LOW" => set_field(&mut self.temp_low, key, value),
            "WAIT" => set_field(&mut self.wait_ms, key, value),
            // Anything other than exactly "1" leaves the tachometer disabled.
            "TACHO_ENABLED" => self.tacho_enabled = value == "1",
            "THERMAL_FILE" => self.thermal_file = PathBuf::from(value),
            _ => warn!("unknown config key {:?}", key),
        }
    }

    /// Check cross-field invariants.
    ///
    /// Violations are fatal at startup: the speed curve divides by the
    /// threshold span, so inverted thresholds have no meaningful fallback.
    pub fn validate(&self) -> Result<()> {
        if self.temp_max <= self.temp_low {
            return Err(FanControlError::InvalidConfig(format!(
                "TEMP_MAX ({}) must be greater than TEMP_LOW ({})",
                self.temp_max, self.temp_low
            )));
        }
        if self.rpm_min > self.rpm_max {
            return Err(FanControlError::InvalidConfig(format!(
                "RPM_MIN ({}) must not exceed RPM_MAX ({})",
                self.rpm_min, self.rpm_max
            )));
        }
        if self.wait_ms == 0 {
            return Err(FanControlError::InvalidConfig(
                "WAIT must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Tick interval as a [`Duration`].
    pub fn wait(&self) -> Duration {
        Duration::from_millis(self.wait_ms)
    }

    /// Emit an info record of every effective value.
    pub fn log_loaded(&self) {
        info!(
            "config values loaded: PWM_PIN={} | TACHO_PIN={} | RPM_MAX={} | RPM_MIN={} | \
             RPM_OFF={} | FREQUENCY={} | TEMP_MAX={} | TEMP_LOW={} | WAIT={} | \
             TACHO_ENABLED={} | THERMAL_FILE={}",
            self.pwm_pin,
            self.tacho_pin,
            self.rpm_max,
            self.rpm_min,
            self.rpm_off,
            self.pwm_frequency,
            self.temp_max,
            self.temp_low,
            self.wait_ms,
            self.tacho_enabled as u8,
            self.thermal_file.display()
        );
    }
}

fn set_field<T: FromStr>(field: &mut T, key: &str, value: &str) {
    match value.parse() {
        Ok(parsed) => *field = parsed,
        Err(_) => warn!("ignoring invalid value {:?} for {}", value, key),
    }
}

// =============================================================================
// CurveParams
// =============================================================================

/// Parameters derived once from a validated [`Config`].
#[derive(Clone, Copy, Debug)]
pub struct CurveParams {
    /// Threshold span normalized to a percentage step:
    /// `(temp_max - temp_low) / 100`. Validation guarantees this is positive.
    pub ratio: f32,
}

impl CurveParams {
    pub fn from_config(config: &Config) -> Self {
        Self {
            ratio: (config.temp_max - config.temp_low) as f32 / 100.0,
        }
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

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.pwm_pin, 18);
        assert_eq!(config.tacho_pin, 23);
        assert_eq!(config.rpm_max, 5000);
        assert_eq!(config.rpm_min, 1500);
        assert_eq!(config.temp_max, 55);
        assert_eq!(config.temp_low, 40);
        assert_eq!(config.wait_ms, 5000);
        assert!(!config.tacho_enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_record() {
        let config = Config::parse(
            "PWM_PIN=12 TACHO_PIN=6 RPM_MAX=4000 RPM_MIN=1000 RPM_OFF=0 TEMP_MAX=60 \
             TEMP_LOW=45 WAIT=2000 TACHO_ENABLED=1 THERMAL_FILE=/tmp/temp",
        );
        assert_eq!(config.pwm_pin, 12);
        assert_eq!(config.tacho_pin, 6);
        assert_eq!(config.rpm_max, 4000);
        assert_eq!(config.rpm_min, 1000);
        assert_eq!(config.temp_max, 60);
        assert_eq!(config.temp_low, 45);
        assert_eq!(config.wait_ms, 2000);
        assert!(config.tacho_enabled);
        assert_eq!(config.thermal_file, PathBuf::from("/tmp/temp"));
    }

    #[test]
    fn test_parse_partial_record_keeps_defaults() {
        let config = Config::parse("RPM_MAX=4000\nTEMP_MAX=60");
        assert_eq!(config.rpm_max, 4000);
        assert_eq!(config.temp_max, 60);
        // Untouched fields keep their defaults.
        assert_eq!(config.pwm_pin, 18);
        assert_eq!(config.rpm_min, 1500);
        assert_eq!(config.wait_ms, 5000);
    }

    #[test]
    fn test_parse_malformed_value_keeps_default() {
        let config = Config::parse("RPM_MAX=fast WAIT=\nPWM_PIN=13");
        assert_eq!(config.rpm_max, 5000);
        assert_eq!(config.wait_ms, 5000);
        assert_eq!(config.pwm_pin, 13);
    }

    #[test]
    fn test_parse_comments_and_unknown_keys() {
        let config = Config::parse("# reference fan settings\nRPM_MIN=1200\nSPEED=9000");
        assert_eq!(config.rpm_min, 1200);
        assert_eq!(config.rpm_max, 5000);
    }

    #[test]
    fn test_tacho_flag_normalization() {
        assert!(Config::parse("TACHO_ENABLED=1").tacho_enabled);
        assert!(!Config::parse("TACHO_ENABLED=0").tacho_enabled);
        assert!(!Config::parse("TACHO_ENABLED=2").tacho_enabled);
        assert!(!Config::parse("TACHO_ENABLED=yes").tacho_enabled);
    }

    #[test]
    fn test_load_missing_file_yields_defaults() {
        let config = Config::load(Path::new("/nonexistent/params.conf"));
        assert_eq!(config.rpm_max, 5000);
        assert_eq!(config.temp_low, 40);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "TEMP_LOW=35 TEMP_MAX=50").unwrap();
        file.flush().unwrap();

        let config = Config::load(file.path());
        assert_eq!(config.temp_low, 35);
        assert_eq!(config.temp_max, 50);
    }

    #[test]
    fn test_validate_inverted_thresholds() {
        let config = Config::parse("TEMP_MAX=40 TEMP_LOW=55");
        assert!(matches!(
            config.validate(),
            Err(FanControlError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_equal_thresholds() {
        let config = Config::parse("TEMP_MAX=40 TEMP_LOW=40");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rpm_bounds() {
        let config = Config::parse("RPM_MIN=6000");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_interval() {
        let config = Config::parse("WAIT=0");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_curve_params_ratio() {
        let params = CurveParams::from_config(&Config::default());
        assert!((params.ratio - 0.15).abs() < f32::EPSILON);
    }
}
