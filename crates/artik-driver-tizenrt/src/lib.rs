//! RTOS backends for the ARTIK SDK.
//!
//! On the ARTIK 05x boards peripherals are exposed as character devices
//! rather than sysfs attributes. The ADC driver is `/dev/adc<D>`: an
//! `ANIOC_TRIGGER` ioctl starts a conversion and a subsequent `read` returns
//! packed samples for every enabled channel.
//!
//! ```no_run
//! use artik_core::{AdcConfig, AdcManager, AdcModule};
//! use artik_driver_tizenrt::TizenRtAdc;
//!
//! let adc = AdcManager::new(TizenRtAdc::new());
//! let handle = adc.request(&AdcConfig::new(1))?;
//! println!("adc1 = {}", adc.get_value(handle)?);
//! adc.release(handle)?;
//! # Ok::<(), artik_core::ArtikError>(())
//! ```

/// Default device directory.
pub const DEV_PATH: &str = "/dev";

pub mod adc;

pub use adc::{decode_samples, AdcSample, TizenRtAdc, TizenRtChannel, ANIOC_TRIGGER, SAMPLE_SIZE};
