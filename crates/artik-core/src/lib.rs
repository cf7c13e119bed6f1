//! Core types for the ARTIK hardware abstraction SDK.
//!
//! This crate holds everything that does not depend on a particular OS:
//! the module ops traits, the backend shim traits, the managers that pair a
//! backend with a handle registry, and the error taxonomy.
//!
//! # Architecture
//!
//! ```text
//!   AdcPin / GpioPin / PwmPin        owned handle, released on drop
//!            │
//!            ▼
//!   Arc<dyn AdcModule> ...           module ops (request / read / release)
//!            │
//!            ▼
//!   AdcManager<B> ...                HandleRegistry<pin, node> + backend B
//!            │
//!            ▼
//!   B: AdcBackend ...                sysfs, RTOS device node, or mock
//! ```
//!
//! Backends for Linux sysfs and the RTOS character devices live in the
//! `artik-driver-sysfs` and `artik-driver-tizenrt` crates.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use artik_core::adc::{AdcConfig, AdcManager, AdcModule};
//! use artik_core::mock::MockAdc;
//!
//! let backend = MockAdc::new();
//! backend.set_value(0, 812);
//! let adc = AdcManager::new(backend);
//!
//! let handle = adc.request(&AdcConfig::new(0))?;
//! assert_eq!(adc.get_value(handle)?, 812);
//! adc.release(handle)?;
//! # Ok::<(), artik_core::ArtikError>(())
//! ```

pub mod adc;
pub mod capabilities;
pub mod error;
pub mod gpio;
pub mod hal;
pub mod mock;
pub mod pwm;
pub mod registry;

pub use adc::{AdcBackend, AdcConfig, AdcManager, AdcModule, AdcPin};
pub use error::{ArtikError, Result, Status};
pub use gpio::{
    GpioBackend, GpioConfig, GpioDirection, GpioEdge, GpioManager, GpioModule, GpioPin,
};
pub use pwm::{PwmBackend, PwmConfig, PwmManager, PwmModule, PwmPin, PwmPolarity};
pub use registry::{Handle, HandleRegistry};
