//! # ARTIK SDK
//!
//! Uniform ADC, GPIO and PWM access over Linux sysfs and RTOS device nodes.
//!
//! The crate is a facade over the workspace:
//!
//! - **`artik_core`**: module ops traits, managers, handle registry, pin
//!   wrappers, async capability adapters, error and status codes
//! - **`artik_driver_sysfs`**: IIO ADC, sysfs GPIO and PWM backends
//! - **`artik_driver_tizenrt`**: `/dev/adc<N>` backend for the RTOS boards
//!
//! and adds what an application needs on top:
//!
//! - **`config`**: figment-based configuration (`config/artik.toml` + `ARTIK_` env)
//! - **`logging`**: tracing subscriber setup
//! - **`platform`**: board detection from the device tree
//! - **`module`**: the module registry (`request_api_module` / `release_api_module`)

pub mod config;
pub mod logging;
pub mod module;
pub mod platform;

pub use artik_core;
pub use artik_driver_sysfs;
pub use artik_driver_tizenrt;
pub use artik_core::{ArtikError, Result, Status};
pub use module::{ModuleId, ModuleOps, ModuleRegistry};
pub use platform::Platform;
