//! Tachometer pulse counting and RPM sampling.
//!
//! The fan emits falling-edge pulses on its tachometer line while spinning.
//! An interrupt callback increments an atomic counter; the control loop
//! periodically converts accumulated pulses into RPM. The counter is the only
//! state shared between the interrupt context and the control thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

/// Pulses emitted per fan revolution. The reference fan (Noctua NF-A4x10)
/// puts out two pulses per revolution.
pub const PULSES_PER_REVOLUTION: u32 = 2;

// =============================================================================
// Tachometer
// =============================================================================

/// Accumulates pulse edges and converts them to RPM on demand.
///
/// Constructed once at controller startup when the tachometer feature is
/// enabled; there is no way to stop counting short of dropping the value.
pub struct Tachometer {
    pulses: Arc<AtomicU32>,
    window_start: Instant,
}

impl Tachometer {
    pub fn new() -> Self {
        Self {
            pulses: Arc::new(AtomicU32::new(0)),
            window_start: Instant::now(),
        }
    }

    /// Build the edge callback handed to the hardware backend.
    ///
    /// Its sole effect is an atomic increment; it never blocks and performs
    /// no I/O, so it is safe to invoke from the interrupt dispatch thread
    /// concurrently with [`read_rpm`](Self::read_rpm).
    pub fn edge_handler(&self) -> Box<dyn FnMut() + Send> {
        let pulses = Arc::clone(&self.pulses);
        Box::new(move || {
            pulses.fetch_add(1, Ordering::Relaxed);
        })
    }

    /// Sample the current RPM and start a new counting window.
    ///
    /// Returns `None` when no reading is available: the window is shorter
    /// than one second (counting continues into the next window) or no
    /// pulses arrived. The counter is read and reset in a single atomic
    /// step, so edges are never double-counted across windows.
    pub fn read_rpm(&mut self) -> Option<u32> {
        self.read_rpm_at(Instant::now())
    }

    fn read_rpm_at(&mut self, now: Instant) -> Option<u32> {
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < Duration::from_secs(1) {
            return None;
        }
        let pulses = self.pulses.swap(0, Ordering::AcqRel);
        self.window_start = now;
        if pulses == 0 {
            return None;
        }
        let frequency = pulses as f64 / elapsed.as_secs_f64();
        let rpm = (frequency * 60.0 / PULSES_PER_REVOLUTION as f64) as u32;
        (rpm > 0).then_some(rpm)
    }
}

impl Default for Tachometer {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_second_window() {
        let mut tacho = Tachometer::new();
        let start = tacho.window_start;
        let mut edge = tacho.edge_handler();
        for _ in 0..10 {
            edge();
        }
        // 10 pulses over one second: 10 * 60 / 2 = 300 RPM.
        let rpm = tacho.read_rpm_at(start + Duration::from_secs(1));
        assert_eq!(rpm, Some(300));
    }

    #[test]
    fn test_multi_second_window_truncates_toward_zero() {
        let mut tacho = Tachometer::new();
        let start = tacho.window_start;
        let mut edge = tacho.edge_handler();
        for _ in 0..5 {
            edge();
        }
        // 5 pulses over 2 s: 2.5 Hz * 60 / 2 = 75 RPM.
        assert_eq!(tacho.read_rpm_at(start + Duration::from_secs(2)), Some(75));
    }

    #[test]
    fn test_starved_window_keeps_counting() {
        let mut tacho = Tachometer::new();
        let start = tacho.window_start;
        let mut edge = tacho.edge_handler();
        for _ in 0..4 {
            edge();
        }
        // Sub-second sample: no reading, counter untouched.
        assert_eq!(tacho.read_rpm_at(start + Duration::from_millis(500)), None);
        for _ in 0..4 {
            edge();
        }
        // All eight pulses land in the one-second window.
        assert_eq!(
            tacho.read_rpm_at(start + Duration::from_secs(1)),
            Some(8 * 60 / 2)
        );
    }

    #[test]
    fn test_zero_pulses_is_no_reading() {
        let mut tacho = Tachometer::new();
        let start = tacho.window_start;
        assert_eq!(tacho.read_rpm_at(start + Duration::from_secs(1)), None);
    }

    #[test]
    fn test_read_resets_window() {
        let mut tacho = Tachometer::new();
        let start = tacho.window_start;
        let mut edge = tacho.edge_handler();
        for _ in 0..6 {
            edge();
        }
        assert_eq!(tacho.read_rpm_at(start + Duration::from_secs(1)), Some(180));
        // Nothing carried over into the new window.
        assert_eq!(tacho.read_rpm_at(start + Duration::from_secs(2)), None);
    }

    #[test]
    fn test_concurrent_increments() {
        let tacho = Tachometer::new();
        let start = tacho.window_start;
        let mut handles = Vec::new();
        for _ in 0..4 {
            let mut edge = tacho.edge_handler();
            handles.push(std::thread::spawn(move || {
                for _ in 0..1000 {
                    edge();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        let mut tacho = tacho;
        // 4000 pulses over one second: 4000 * 60 / 2.
        assert_eq!(
            tacho.read_rpm_at(start + Duration::from_secs(1)),
            Some(120_000)
        );
    }
}
