//! The control loop and its lifecycle.
//!
//! One controller owns the hardware backend, the thermal sensor, and all
//! run-time state. Per-tick failures (a bad sensor read, a failed duty
//! write) are logged and recovered locally; only setup failures are fatal.
//! Cleanup runs exactly once on every exit path after setup has begun.

use tracing::{debug, info, warn};

use crate::config::{Config, CurveParams};
use crate::cooling::compute_target;
use crate::device::{PinMode, PinModeSnapshot, PwmBackend};
use crate::error::Result;
use crate::sensor::TemperatureSource;
use crate::shutdown::ShutdownToken;
use crate::tacho::Tachometer;

// =============================================================================
// Controller
// =============================================================================

/// Closed-loop fan controller: sample, compute, apply, measure, sleep.
pub struct Controller<B: PwmBackend, S: TemperatureSource> {
    config: Config,
    params: CurveParams,
    backend: B,
    sensor: S,
    shutdown: ShutdownToken,
    last_duty: Option<u32>,
    tacho: Option<Tachometer>,
    snapshot: PinModeSnapshot,
}

impl<B: PwmBackend, S: TemperatureSource> Controller<B, S> {
    /// Build a controller from a validated configuration.
    ///
    /// # Errors
    /// Returns `InvalidConfig` when the configuration invariants do not hold.
    pub fn new(config: Config, backend: B, sensor: S, shutdown: ShutdownToken) -> Result<Self> {
        config.validate()?;
        let params = CurveParams::from_config(&config);
        Ok(Self {
            config,
            params,
            backend,
            sensor,
            shutdown,
            last_duty: None,
            tacho: None,
            snapshot: PinModeSnapshot::default(),
        })
    }

    /// Run until the shutdown token triggers.
    ///
    /// Consumes the controller: setup, the tick loop, then cleanup. Cleanup
    /// runs even when setup fails partway, so any pin already touched is
    /// restored.
    pub fn run(mut self) -> Result<()> {
        let setup = self.setup();
        if setup.is_ok() {
            info!("initialized and running ...");
            self.run_loop();
        }
        self.cleanup();
        setup
    }

    /// Capture original pin modes, configure the PWM output at zero duty,
    /// and start the tachometer when enabled.
    fn setup(&mut self) -> Result<()> {
        self.snapshot.pwm = Some(self.backend.pin_mode(self.config.pwm_pin)?);
        self.backend.configure_pwm(
            self.config.pwm_pin,
            self.config.pwm_frequency,
            self.config.rpm_max,
        )?;
        self.backend
            .write_duty(self.config.pwm_pin, self.config.rpm_off)?;
        self.last_duty = Some(self.config.rpm_off);

        if self.config.tacho_enabled {
            self.snapshot.tacho = Some(self.backend.pin_mode(self.config.tacho_pin)?);
            let tacho = Tachometer::new();
            self.backend
                .register_falling_edge(self.config.tacho_pin, tacho.edge_handler())?;
            self.tacho = Some(tacho);
        }
        Ok(())
    }

    fn run_loop(&mut self) {
        while !self.shutdown.is_triggered() {
            self.tick();
            if self.shutdown.wait_timeout(self.config.wait()) {
                break;
            }
        }
    }

    /// One control tick, in fixed order: sample temperature, compute the
    /// target, apply it if changed, then sample the tachometer.
    fn tick(&mut self) {
        match self.sensor.read_temp_c() {
            Ok(temp) => {
                let target = compute_target(temp, &self.config, &self.params);
                if self.last_duty != Some(target) {
                    match self.backend.write_duty(self.config.pwm_pin, target) {
                        Ok(()) => {
                            debug!("temp: {}C | duty: {}", temp, target);
                            self.last_duty = Some(target);
                        }
                        // Not latched, so the write is retried next tick.
                        Err(err) => warn!("failed to apply duty {}: {}", target, err),
                    }
                }
            }
            Err(err) => warn!("temperature read failed, tick skipped: {}", err),
        }

        if let Some(tacho) = self.tacho.as_mut() {
            if let Some(rpm) = tacho.read_rpm() {
                debug!("tachometer: {} rpm", rpm);
            }
        }
    }

    /// Force the fan off, restore captured pin modes, and release the
    /// hardware handle. Best-effort: each step logs and continues.
    fn cleanup(&mut self) {
        if self.last_duty.is_some() {
            if let Err(err) = self
                .backend
                .write_duty(self.config.pwm_pin, self.config.rpm_off)
            {
                warn!("cleanup: failed to zero duty: {}", err);
            }
        }
        if self.tacho.is_some() {
            if let Err(err) = self.backend.clear_falling_edge(self.config.tacho_pin) {
                warn!("cleanup: failed to clear edge handler: {}", err);
            }
        }
        if let Some(mode) = self.snapshot.pwm.take() {
            self.restore_mode(self.config.pwm_pin, mode);
        }
        if let Some(mode) = self.snapshot.tacho.take() {
            self.restore_mode(self.config.tacho_pin, mode);
        }
        self.backend.release();
        info!("cleaned up - exiting ...");
    }

    fn restore_mode(&mut self, pin: u8, mode: PinMode) {
        if let Err(err) = self.backend.set_pin_mode(pin, mode) {
            warn!("cleanup: failed to restore pin {} to {}: {}", pin, mode, err);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
