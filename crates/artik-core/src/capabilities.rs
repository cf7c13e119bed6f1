//! Async capability traits.
//!
//! Module ops are blocking. These traits give async callers a uniform view
//! of a requested resource, independent of which module it came from. See
//! [`crate::hal`] for the adapters over ADC, GPIO and PWM pins.
//!
//! # Example
//!
//! ```rust,ignore
//! use artik_core::capabilities::Readable;
//!
//! async fn average<R: Readable>(sensor: &R, n: usize) -> anyhow::Result<f64> {
//!     let mut sum = 0.0;
//!     for _ in 0..n {
//!         sum += sensor.read().await?;
//!     }
//!     Ok(sum / n as f64)
//! }
//! ```

use anyhow::Result;
use async_trait::async_trait;

/// Capability: Readable
///
/// Resources that produce a single scalar value (ADC channels).
///
/// # Contract
/// - `read()` performs one measurement and returns the value
/// - Units are resource-specific (raw counts for ADC)
#[async_trait]
pub trait Readable: Send + Sync {
    /// Read current value
    ///
    /// # Returns
    /// - Ok(value) on successful read
    /// - Err on device error
    async fn read(&self) -> Result<f64>;
}

/// Capability: Settable (Parameter Control)
///
/// Resources with named parameters.
#[async_trait]
pub trait Settable: Send + Sync {
    /// Set a named parameter to a new value.
    ///
    /// # Arguments
    /// * `name` - The identifier for the parameter to set.
    /// * `value` - The new value for the parameter.
    async fn set_value(&self, name: &str, value: serde_json::Value) -> Result<()>;

    /// Get the current value of a named parameter.
    ///
    /// # Arguments
    /// * `name` - The identifier for the parameter to query.
    async fn get_value(&self, name: &str) -> Result<serde_json::Value> {
        anyhow::bail!("Get value for '{}' not supported by this device", name)
    }
}

/// Capability: Switchable (On/Off States)
///
/// # Contract
/// - `turn_on()` activates the named feature.
/// - `turn_off()` deactivates the named feature.
/// - `is_on()` queries the current on/off state.
#[async_trait]
pub trait Switchable: Send + Sync {
    /// Turn on a named switchable feature.
    async fn turn_on(&mut self, name: &str) -> Result<()>;

    /// Turn off a named switchable feature.
    async fn turn_off(&mut self, name: &str) -> Result<()>;

    /// Query the on/off state of a named switchable feature.
    ///
    /// # Returns
    /// - `Ok(true)` if the feature is on.
    /// - `Ok(false)` if the feature is off.
    /// - `Err` if the state cannot be determined or is not supported.
    async fn is_on(&self, name: &str) -> Result<bool> {
        anyhow::bail!("State query for '{}' not supported by this device", name)
    }
}
