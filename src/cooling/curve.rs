//! Piecewise-linear speed curve mapping temperature to a duty target.

use crate::config::{Config, CurveParams};

/// Compute the duty target for the current temperature.
///
/// At or below the lower threshold the fan is off. Above it, the
/// temperature offset is normalized against the threshold span and scaled
/// into the `[rpm_min, rpm_max]` range:
///
/// ```text
/// diff_pct = (temp - temp_low) / params.ratio
/// raw      = diff_pct * rpm_max / 100
/// target   = clamp(raw, rpm_min, rpm_max)
/// ```
///
/// Pure function; division by zero is excluded by configuration validation.
pub fn compute_target(temp_c: i32, config: &Config, params: &CurveParams) -> u32 {
    let diff = temp_c - config.temp_low;
    if diff <= 0 {
        return config.rpm_off;
    }
    let diff_pct = diff as f32 / params.ratio;
    let raw = (diff_pct * config.rpm_max as f32 / 100.0).round() as u32;
    raw.clamp(config.rpm_min, config.rpm_max)
}
