//! `artik` command-line tool
//!
//! Exercises the SDK modules from a shell:
//!
//! ```bash
//! artik platform
//! artik modules
//! artik adc read 0 --count 10 --interval-ms 100
//! artik gpio write 21 1
//! artik pwm set 0 --period 1000000 --duty 250000 --duration-ms 2000
//! ```
//!
//! Configuration comes from `config/artik.toml` (see `--config`) and
//! `ARTIK_` environment variables.

// Global allocator (Microsoft Rust Guidelines: M-MIMALLOC-APPS)
#[cfg(not(test))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use artik::config::{ArtikConfig, ConfigError, DEFAULT_CONFIG_PATH};
use artik::{logging, ModuleId, ModuleOps, ModuleRegistry};
use artik_core::capabilities::{Readable, Settable, Switchable};
use artik_core::hal::{ReadableAdc, SettablePwm, SwitchableGpio};
use artik_core::{AdcConfig, AdcPin, GpioConfig, GpioPin, PwmConfig, PwmPin, PwmPolarity};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;

#[derive(Parser)]
#[command(name = "artik")]
#[command(about = "ARTIK hardware abstraction SDK tool", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Override the configured log level
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the detected board
    Platform,

    /// List the modules this board offers
    Modules,

    /// Print the effective configuration
    Config,

    /// Analog-to-digital converter
    #[command(subcommand)]
    Adc(AdcCommands),

    /// General purpose I/O
    #[command(subcommand)]
    Gpio(GpioCommands),

    /// Pulse-width modulation
    #[command(subcommand)]
    Pwm(PwmCommands),
}

#[derive(Subcommand)]
enum AdcCommands {
    /// Read raw samples from a channel
    Read {
        /// ADC channel
        pin: u32,
        /// Number of samples
        #[arg(short = 'n', long, default_value = "1")]
        count: u32,
        /// Delay between samples
        #[arg(long, default_value = "0")]
        interval_ms: u64,
        /// Multiply raw counts by this factor
        #[arg(long, default_value = "1.0")]
        scale: f64,
    },
}

#[derive(Subcommand)]
enum GpioCommands {
    /// Read an input line
    Read {
        /// GPIO number
        id: u32,
    },
    /// Drive an output line
    Write {
        /// GPIO number
        id: u32,
        /// Level (0 or 1)
        #[arg(value_parser = clap::value_parser!(u8).range(0..=1))]
        value: u8,
    },
}

#[derive(Subcommand)]
enum PwmCommands {
    /// Configure and run a channel
    Set {
        /// PWM channel
        pin: u32,
        /// Period in ns
        #[arg(long)]
        period: u32,
        /// Duty cycle in ns
        #[arg(long)]
        duty: u32,
        /// normal or inversed
        #[arg(long, default_value = "normal", value_parser = parse_polarity)]
        polarity: PwmPolarity,
        /// Run this long, then release; runs until Ctrl-C when omitted
        #[arg(long)]
        duration_ms: Option<u64>,
    },
}

fn parse_polarity(s: &str) -> Result<PwmPolarity, String> {
    match s {
        "normal" => Ok(PwmPolarity::Normal),
        "inversed" | "inverse" => Ok(PwmPolarity::Inversed),
        _ => Err(format!("unknown polarity '{}'", s)),
    }
}

fn load_config(cli: &Cli) -> Result<ArtikConfig> {
    let mut config = ArtikConfig::load_from(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(level) = &cli.log_level {
        config.application.log_level = level.clone();
    }
    config.validate().map_err(ConfigError::Invalid)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    logging::init_from_config(&config).map_err(anyhow::Error::msg)?;

    if let Commands::Config = cli.command {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let registry = ModuleRegistry::from_config(&config)?;

    match cli.command {
        Commands::Config => {}
        Commands::Platform => {
            println!("{}", registry.platform_name());
        }
        Commands::Modules => {
            for id in ModuleId::ALL {
                match registry.backend_name(id) {
                    Some(backend) => println!("{:<5} {}", id, backend),
                    None => println!("{:<5} -", id),
                }
            }
        }
        Commands::Adc(AdcCommands::Read {
            pin,
            count,
            interval_ms,
            scale,
        }) => {
            let ops = registry.request_adc()?;
            let adc = ReadableAdc::new(AdcPin::request(ops.clone(), AdcConfig::new(pin))?)
                .with_scale(scale);
            for i in 0..count {
                if i > 0 && interval_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(interval_ms)).await;
                }
                println!("{}", adc.read().await?);
            }
            drop(adc);
            registry.release_api_module(&ModuleOps::Adc(ops))?;
        }
        Commands::Gpio(GpioCommands::Read { id }) => {
            let ops = registry.request_gpio()?;
            let mut pin = GpioPin::request(ops.clone(), GpioConfig::input(id))?;
            println!("{}", u8::from(pin.read()?));
            pin.release()?;
            registry.release_api_module(&ModuleOps::Gpio(ops))?;
        }
        Commands::Gpio(GpioCommands::Write { id, value }) => {
            let ops = registry.request_gpio()?;
            let pin = GpioPin::request(ops.clone(), GpioConfig::output(id, value == 1))?;
            let mut gpio = SwitchableGpio::new(pin);
            if value == 1 {
                gpio.turn_on("value").await?;
            } else {
                gpio.turn_off("value").await?;
            }
            info!(id, level = gpio.is_on("value").await?, "GPIO written");
            drop(gpio);
            registry.release_api_module(&ModuleOps::Gpio(ops))?;
        }
        Commands::Pwm(PwmCommands::Set {
            pin,
            period,
            duty,
            polarity,
            duration_ms,
        }) => {
            let ops = registry.request_pwm()?;
            let config = PwmConfig::new(pin, period, duty).with_polarity(polarity);
            let pwm = SettablePwm::new(PwmPin::request(ops.clone(), config)?);
            pwm.set_value("enabled", json!(true)).await?;
            info!(pin, period, duty, "PWM running");

            match duration_ms {
                Some(ms) => tokio::time::sleep(Duration::from_millis(ms)).await,
                None => tokio::signal::ctrl_c().await?,
            }
            drop(pwm);
            registry.release_api_module(&ModuleOps::Pwm(ops))?;
        }
    }

    Ok(())
}
