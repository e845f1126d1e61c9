//! Recording backend for controller tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::device::{PinMode, PwmBackend};
use crate::error::{FanControlError, Result};

/// Everything a test wants to assert on after the controller has run.
#[derive(Default)]
pub struct MockLog {
    pub duty_writes: Vec<(u8, u32)>,
    pub mode_sets: Vec<(u8, PinMode)>,
    pub configured: Option<(u8, u32, u32)>,
    pub edge_registered_on: Option<u8>,
    pub edge_cleared: bool,
    pub released: bool,
}

/// In-memory [`PwmBackend`] that records every call.
///
/// The log is shared, so tests keep a handle while the backend itself moves
/// into the controller.
pub struct MockBackend {
    log: Arc<Mutex<MockLog>>,
    modes: HashMap<u8, PinMode>,
    write_attempts: usize,
    pub fail_configure: bool,
    /// Write attempts (0-based, counting every `write_duty` call) that fail.
    pub fail_write_attempts: Vec<usize>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(MockLog::default())),
            modes: HashMap::new(),
            write_attempts: 0,
            fail_configure: false,
            fail_write_attempts: Vec::new(),
        }
    }

    pub fn log_handle(&self) -> Arc<Mutex<MockLog>> {
        Arc::clone(&self.log)
    }

    pub fn with_pin_mode(mut self, pin: u8, mode: PinMode) -> Self {
        self.modes.insert(pin, mode);
        self
    }

    fn injected_failure() -> FanControlError {
        FanControlError::Gpio(rppal::gpio::Error::Io(std::io::Error::other(
            "injected failure",
        )))
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl PwmBackend for MockBackend {
    fn pin_mode(&self, pin: u8) -> Result<PinMode> {
        Ok(self.modes.get(&pin).copied().unwrap_or(PinMode::Input))
    }

    fn set_pin_mode(&mut self, pin: u8, mode: PinMode) -> Result<()> {
        self.modes.insert(pin, mode);
        self.log.lock().unwrap().mode_sets.push((pin, mode));
        Ok(())
    }

    fn configure_pwm(&mut self, pin: u8, frequency_hz: u32, range: u32) -> Result<()> {
        if self.fail_configure {
            return Err(Self::injected_failure());
        }
        self.log.lock().unwrap().configured = Some((pin, frequency_hz, range));
        Ok(())
    }

    fn write_duty(&mut self, pin: u8, duty: u32) -> Result<()> {
        let attempt = self.write_attempts;
        self.write_attempts += 1;
        if self.fail_write_attempts.contains(&attempt) {
            return Err(Self::injected_failure());
        }
        self.log.lock().unwrap().duty_writes.push((pin, duty));
        Ok(())
    }

    fn register_falling_edge(&mut self, pin: u8, _handler: Box<dyn FnMut() + Send>) -> Result<()> {
        self.log.lock().unwrap().edge_registered_on = Some(pin);
        Ok(())
    }

    fn clear_falling_edge(&mut self, _pin: u8) -> Result<()> {
        self.log.lock().unwrap().edge_cleared = true;
        Ok(())
    }

    fn release(&mut self) {
        self.log.lock().unwrap().released = true;
    }
}
