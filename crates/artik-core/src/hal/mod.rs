//! Capability adapters over owned pins.
//!
//! This module implements the [`crate::capabilities`] traits for requested
//! ADC, GPIO and PWM pins. Every call moves the blocking module operation
//! onto `tokio::task::spawn_blocking`.
//!
//! # Implemented Traits
//!
//! - [`Readable`](crate::capabilities::Readable) for ADC pins
//! - [`Switchable`](crate::capabilities::Switchable) for GPIO lines
//! - [`Settable`](crate::capabilities::Settable) for PWM channels
//!
//! # Example
//!
//! ```rust,ignore
//! use artik_core::capabilities::Readable;
//! use artik_core::hal::ReadableAdc;
//!
//! let pin = AdcPin::request(adc_module, AdcConfig::new(0))?;
//! let readable = ReadableAdc::new(pin);
//! let counts = readable.read().await?;
//! ```

mod adc;
mod gpio;
mod pwm;

pub use adc::ReadableAdc;
pub use gpio::SwitchableGpio;
pub use pwm::SettablePwm;

/// Run a blocking pin operation on the blocking pool.
pub(crate) async fn blocking<T, F>(f: F) -> anyhow::Result<T>
where
    F: FnOnce() -> crate::error::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| anyhow::anyhow!("Task join error: {}", e))?
        .map_err(anyhow::Error::from)
}
