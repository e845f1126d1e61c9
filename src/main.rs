//! Fan Controller CLI
//!
//! Command-line interface for the temperature-driven PWM fan controller.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use rpi_fan_control::config::{Config, CurveParams};
use rpi_fan_control::controller::Controller;
use rpi_fan_control::cooling::compute_target;
use rpi_fan_control::device::RpiBackend;
use rpi_fan_control::sensor::ThermalZoneSensor;
use rpi_fan_control::shutdown::ShutdownToken;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Raspberry Pi PWM Fan Controller
#[derive(Parser, Debug)]
#[command(name = "fanctl")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the control loop until SIGINT/SIGTERM
    Run {
        /// Configuration file path (defaults to the system location)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the effective configuration as JSON
    ShowConfig {
        /// Configuration file path (defaults to the system location)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the duty target the speed curve yields for a temperature
    Curve {
        /// Temperature in whole degrees Celsius
        temp: i32,

        /// Configuration file path (defaults to the system location)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

// =============================================================================
// Main
// =============================================================================

fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Command::Run { config } => cmd_run(config),
        Command::ShowConfig { config } => cmd_show_config(config),
        Command::Curve { temp, config } => cmd_curve(temp, config),
    }
}

// =============================================================================
// Command Implementations
// =============================================================================

fn cmd_run(config_path: Option<PathBuf>) -> Result<()> {
    init_tracing();

    let config = load_config(config_path);
    config.validate().context("configuration rejected")?;

    // GPIO failure is fatal before any pin state is touched.
    let backend = RpiBackend::open().context("GPIO initialization failed")?;
    let sensor = ThermalZoneSensor::new(config.thermal_file.clone());

    let shutdown = ShutdownToken::new();
    let handle = shutdown.clone();
    ctrlc::set_handler(move || {
        info!("termination signal received - shutting down");
        handle.trigger();
    })
    .context("failed to install signal handler")?;

    let controller = Controller::new(config, backend, sensor, shutdown)?;
    controller.run()?;
    Ok(())
}

fn cmd_show_config(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path);
    config.validate().context("configuration rejected")?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn cmd_curve(temp: i32, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path);
    config.validate().context("configuration rejected")?;

    let params = CurveParams::from_config(&config);
    println!("{}", compute_target(temp, &config, &params));
    Ok(())
}

// =============================================================================
// Helpers
// =============================================================================

fn load_config(path: Option<PathBuf>) -> Config {
    let path = path.unwrap_or_else(Config::default_path);
    Config::load(&path)
}

/// Log to the systemd journal when available, otherwise to stderr.
/// `FANCTL_LOG` selects the filter (default `info`).
fn init_tracing() {
    let filter = std::env::var("FANCTL_LOG").unwrap_or_else(|_| "info".to_string());

    if std::path::Path::new("/run/systemd/journal/socket").exists() {
        if let Ok(journald) = tracing_journald::layer() {
            use tracing_subscriber::prelude::*;
            tracing_subscriber::registry()
                .with(journald)
                .with(tracing_subscriber::EnvFilter::new(&filter))
                .init();
            return;
        }
    }

    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::new(&filter))
        .init();
}
