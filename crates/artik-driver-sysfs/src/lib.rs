//! Linux sysfs backends for the ARTIK SDK.
//!
//! - [`IioAdc`] - ADC channels through the Industrial I/O subsystem
//! - [`SysfsGpio`] - GPIO lines through `/sys/class/gpio`
//! - [`SysfsPwm`] - PWM channels through `/sys/class/pwm`
//!
//! Every backend takes its sysfs mount point from `with_root`, so tests can
//! point it at a temporary directory tree.
//!
//! # Example
//!
//! ```no_run
//! use artik_core::{AdcConfig, AdcManager, AdcModule};
//! use artik_driver_sysfs::IioAdc;
//!
//! let adc = AdcManager::new(IioAdc::new());
//! let handle = adc.request(&AdcConfig::new(0))?;
//! println!("in_voltage0_raw = {}", adc.get_value(handle)?);
//! adc.release(handle)?;
//! # Ok::<(), artik_core::ArtikError>(())
//! ```

/// Default sysfs mount point.
pub const SYSFS_PATH: &str = "/sys";

mod attr;

pub mod adc;
pub mod gpio;
pub mod pwm;

pub use adc::{IioAdc, IioChannel};
pub use gpio::{SysfsGpio, SysfsLine};
pub use pwm::{SysfsPwm, SysfsPwmChannel};
