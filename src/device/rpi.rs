//! Raspberry Pi GPIO backend over `rppal`.
//!
//! The PWM output uses `rppal`'s software PWM on the claimed output pin; the
//! tachometer input uses the async interrupt dispatcher. Pin mode changes are
//! managed explicitly (reset-on-drop is disabled) so that cleanup, not drop
//! order, decides the final pin state.

use rppal::gpio::{Gpio, InputPin, Level, Mode, OutputPin, Trigger};

use crate::device::{PinMode, PwmBackend};
use crate::error::{FanControlError, Result};

// =============================================================================
// RpiBackend
// =============================================================================

/// Raspberry Pi adapter. Owns the GPIO handle and any claimed pins.
pub struct RpiBackend {
    gpio: Gpio,
    pwm: Option<PwmOutput>,
    tacho: Option<TachoInput>,
}

struct PwmOutput {
    number: u8,
    pin: OutputPin,
    frequency_hz: u32,
    range: u32,
}

struct TachoInput {
    number: u8,
    pin: InputPin,
}

impl RpiBackend {
    /// Open the GPIO subsystem.
    ///
    /// # Errors
    /// Fails when `/dev/gpiomem` (or the character device) is unavailable,
    /// typically due to permissions or non-Pi hardware.
    pub fn open() -> Result<Self> {
        Ok(Self {
            gpio: Gpio::new()?,
            pwm: None,
            tacho: None,
        })
    }

    fn drop_claims_on(&mut self, pin: u8) {
        if self.pwm.as_ref().map(|p| p.number) == Some(pin) {
            if let Some(mut pwm) = self.pwm.take() {
                let _ = pwm.pin.clear_pwm();
            }
        }
        if self.tacho.as_ref().map(|t| t.number) == Some(pin) {
            if let Some(mut tacho) = self.tacho.take() {
                let _ = tacho.pin.clear_async_interrupt();
            }
        }
    }
}

impl PwmBackend for RpiBackend {
    fn pin_mode(&self, pin: u8) -> Result<PinMode> {
        Ok(self.gpio.get(pin)?.mode().into())
    }

    fn set_pin_mode(&mut self, pin: u8, mode: PinMode) -> Result<()> {
        // A claimed pin must be released before it can be re-acquired.
        self.drop_claims_on(pin);
        let mut io = self.gpio.get(pin)?.into_io(mode.into());
        io.set_reset_on_drop(false);
        Ok(())
    }

    fn configure_pwm(&mut self, pin: u8, frequency_hz: u32, range: u32) -> Result<()> {
        self.drop_claims_on(pin);
        let mut output = self.gpio.get(pin)?.into_output();
        output.set_reset_on_drop(false);
        output.set_pwm_frequency(frequency_hz as f64, 0.0)?;
        self.pwm = Some(PwmOutput {
            number: pin,
            pin: output,
            frequency_hz,
            range,
        });
        Ok(())
    }

    fn write_duty(&mut self, pin: u8, duty: u32) -> Result<()> {
        let pwm = self
            .pwm
            .as_mut()
            .filter(|p| p.number == pin)
            .ok_or(FanControlError::PwmNotConfigured)?;
        let duty_cycle = duty.min(pwm.range) as f64 / pwm.range.max(1) as f64;
        pwm.pin
            .set_pwm_frequency(pwm.frequency_hz as f64, duty_cycle)?;
        Ok(())
    }

    fn register_falling_edge(
        &mut self,
        pin: u8,
        mut handler: Box<dyn FnMut() + Send>,
    ) -> Result<()> {
        self.drop_claims_on(pin);
        let mut input = self.gpio.get(pin)?.into_input_pullup();
        input.set_reset_on_drop(false);
        input.set_async_interrupt(Trigger::FallingEdge, move |_: Level| handler())?;
        self.tacho = Some(TachoInput { number: pin, pin: input });
        Ok(())
    }

    fn clear_falling_edge(&mut self, pin: u8) -> Result<()> {
        if self.tacho.as_ref().map(|t| t.number) == Some(pin) {
            if let Some(mut tacho) = self.tacho.take() {
                tacho.pin.clear_async_interrupt()?;
            }
        }
        Ok(())
    }

    fn release(&mut self) {
        if let Some(mut pwm) = self.pwm.take() {
            let _ = pwm.pin.clear_pwm();
        }
        if let Some(mut tacho) = self.tacho.take() {
            let _ = tacho.pin.clear_async_interrupt();
        }
    }
}

// =============================================================================
// Mode conversions
// =============================================================================

impl From<Mode> for PinMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Input => PinMode::Input,
            Mode::Output => PinMode::Output,
            Mode::Alt0 => PinMode::Alt0,
            Mode::Alt1 => PinMode::Alt1,
            Mode::Alt2 => PinMode::Alt2,
            Mode::Alt3 => PinMode::Alt3,
            Mode::Alt4 => PinMode::Alt4,
            Mode::Alt5 => PinMode::Alt5,
        }
    }
}

impl From<PinMode> for Mode {
    fn from(mode: PinMode) -> Self {
        match mode {
            PinMode::Input => Mode::Input,
            PinMode::Output => Mode::Output,
            PinMode::Alt0 => Mode::Alt0,
            PinMode::Alt1 => Mode::Alt1,
            PinMode::Alt2 => Mode::Alt2,
            PinMode::Alt3 => Mode::Alt3,
            PinMode::Alt4 => Mode::Alt4,
            PinMode::Alt5 => Mode::Alt5,
        }
    }
}
