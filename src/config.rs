//! SDK configuration using Figment
//!
//! Configuration is layered:
//! 1. Built-in defaults
//! 2. `config/artik.toml` (or any file passed to [`ArtikConfig::load_from`])
//! 3. Environment variables prefixed with `ARTIK_`, sections separated by a
//!    double underscore (`ARTIK_ADC__BACKEND=mock`)
//!
//! # Example
//! ```no_run
//! use artik::config::ArtikConfig;
//!
//! let config = ArtikConfig::load()?;
//! config.validate().map_err(artik::config::ConfigError::Invalid)?;
//! println!("ADC backend: {:?}", config.adc.backend);
//! # Ok::<(), artik::config::ConfigError>(())
//! ```

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/artik.toml";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "ARTIK_";

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File or environment could not be extracted into [`ArtikConfig`].
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    /// Values loaded but rejected by [`ArtikConfig::validate`].
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// Effective configuration could not be rendered.
    #[error("Failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
}

/// Top-level SDK configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtikConfig {
    /// Application settings
    pub application: ApplicationConfig,
    /// Platform detection and filesystem roots
    pub platform: PlatformConfig,
    /// ADC module
    pub adc: AdcSection,
    /// GPIO module
    pub gpio: GpioSection,
    /// PWM module
    pub pwm: PwmSection,
}

/// Application-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name
    #[serde(default = "default_name")]
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log output format (pretty, compact, json)
    #[serde(default = "default_log_format")]
    pub log_format: String,
    /// Log span NEW/CLOSE events
    #[serde(default)]
    pub log_span_events: bool,
    /// Include source file and line in log lines
    #[serde(default)]
    pub log_file_and_line: bool,
    /// Include thread names in log lines
    #[serde(default)]
    pub log_thread_names: bool,
}

/// Platform configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Board model override (e.g. "ARTIK 530"); detected when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// sysfs mount point
    #[serde(default = "default_sysfs_root")]
    pub sysfs_root: PathBuf,
    /// Device node directory
    #[serde(default = "default_dev_root")]
    pub dev_root: PathBuf,
    /// procfs mount point (device-tree model lives below it)
    #[serde(default = "default_proc_root")]
    pub proc_root: PathBuf,
}

/// Backend selection for one module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Linux sysfs attributes
    Sysfs,
    /// RTOS character device
    Tizenrt,
    /// In-memory mock
    Mock,
    /// Module not offered
    Disabled,
}

impl BackendKind {
    /// Lowercase name as written in configuration.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sysfs => "sysfs",
            Self::Tizenrt => "tizenrt",
            Self::Mock => "mock",
            Self::Disabled => "disabled",
        }
    }
}

/// ADC module configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdcSection {
    /// Backend; chosen from the platform when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendKind>,
    /// IIO device index (sysfs) or `/dev/adc<N>` index (tizenrt)
    #[serde(default)]
    pub device: u32,
    /// Trigger ioctl request code (tizenrt); 0 reads without triggering
    #[serde(default = "default_trigger_request")]
    pub trigger_request: u64,
}

/// GPIO module configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GpioSection {
    /// Backend; chosen from the platform when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendKind>,
}

/// PWM module configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PwmSection {
    /// Backend; chosen from the platform when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendKind>,
    /// PWM chip index (`pwmchip<N>`)
    #[serde(default)]
    pub chip: u32,
}

// Default value functions
fn default_name() -> String {
    "artik".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_sysfs_root() -> PathBuf {
    PathBuf::from(artik_driver_sysfs::SYSFS_PATH)
}

fn default_dev_root() -> PathBuf {
    PathBuf::from(artik_driver_tizenrt::DEV_PATH)
}

fn default_proc_root() -> PathBuf {
    PathBuf::from("/proc")
}

fn default_trigger_request() -> u64 {
    artik_driver_tizenrt::ANIOC_TRIGGER
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            log_span_events: false,
            log_file_and_line: false,
            log_thread_names: false,
        }
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            model: None,
            sysfs_root: default_sysfs_root(),
            dev_root: default_dev_root(),
            proc_root: default_proc_root(),
        }
    }
}

impl Default for AdcSection {
    fn default() -> Self {
        Self {
            backend: None,
            device: 0,
            trigger_request: default_trigger_request(),
        }
    }
}

impl AdcSection {
    /// Trigger request, `None` when triggering is turned off.
    pub fn trigger(&self) -> Option<u64> {
        (self.trigger_request != 0).then_some(self.trigger_request)
    }
}

impl ArtikConfig {
    /// Load configuration from `config/artik.toml` and the environment
    ///
    /// Environment variables override the file, e.g.
    /// `ARTIK_APPLICATION__LOG_LEVEL=debug`.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path
    ///
    /// A missing file is not an error; defaults and environment still apply.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::figment(path.as_ref())
            .extract::<Self>()
            .map_err(|e| ConfigError::Load(Box::new(e)))
    }

    /// The provider stack behind [`ArtikConfig::load_from`].
    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(ArtikConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            ));
        }

        let valid_formats = ["pretty", "compact", "json"];
        if !valid_formats.contains(&self.application.log_format.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid log_format '{}'. Must be one of: {}",
                self.application.log_format,
                valid_formats.join(", ")
            ));
        }

        // Only the ADC has an RTOS backend
        for (module, backend) in [("gpio", self.gpio.backend), ("pwm", self.pwm.backend)] {
            if backend == Some(BackendKind::Tizenrt) {
                return Err(format!(
                    "Backend 'tizenrt' is not available for module '{}'",
                    module
                ));
            }
        }

        Ok(())
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
