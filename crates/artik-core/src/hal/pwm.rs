//! Settable trait implementation for PWM channels.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::capabilities::Settable;
use crate::pwm::{PwmPin, PwmPolarity};

/// A wrapper that implements [`Settable`] for a requested PWM channel.
///
/// # Parameter Names
///
/// - `"period"` - period in ns (unsigned integer)
/// - `"duty_cycle"` - duty cycle in ns (unsigned integer)
/// - `"polarity"` - `"normal"` or `"inversed"`
/// - `"enabled"` - bool
pub struct SettablePwm {
    pin: Arc<PwmPin>,
}

impl SettablePwm {
    /// Wrap a requested channel.
    pub fn new(pin: PwmPin) -> Self {
        Self { pin: Arc::new(pin) }
    }

    /// The wrapped channel.
    pub fn pin(&self) -> &PwmPin {
        &self.pin
    }

    fn as_ns(name: &str, value: &Value) -> Result<u32> {
        let n = value
            .as_u64()
            .ok_or_else(|| anyhow::anyhow!("{} must be an unsigned integer", name))?;
        u32::try_from(n).map_err(|_| anyhow::anyhow!("{} {} ns out of range", name, n))
    }
}

#[async_trait]
impl Settable for SettablePwm {
    async fn set_value(&self, name: &str, value: Value) -> Result<()> {
        let pin = self.pin.clone();
        match name {
            "period" => {
                let period = Self::as_ns(name, &value)?;
                super::blocking(move || pin.set_period(period)).await
            }
            "duty_cycle" => {
                let duty = Self::as_ns(name, &value)?;
                super::blocking(move || pin.set_duty_cycle(duty)).await
            }
            "polarity" => {
                let polarity = match value.as_str() {
                    Some("normal") => PwmPolarity::Normal,
                    Some("inversed") | Some("inverse") => PwmPolarity::Inversed,
                    _ => anyhow::bail!("polarity must be 'normal' or 'inversed'"),
                };
                super::blocking(move || pin.set_polarity(polarity)).await
            }
            "enabled" => {
                let enabled = value
                    .as_bool()
                    .ok_or_else(|| anyhow::anyhow!("enabled must be a bool"))?;
                super::blocking(move || {
                    if enabled {
                        pin.enable()
                    } else {
                        pin.disable()
                    }
                })
                .await
            }
            _ => anyhow::bail!("Unknown PWM parameter '{}'", name),
        }
    }

    async fn get_value(&self, name: &str) -> Result<Value> {
        let pin = self.pin.clone();
        if name == "enabled" {
            return Ok(Value::Bool(super::blocking(move || pin.is_enabled()).await?));
        }

        let config = super::blocking(move || pin.config()).await?;
        match name {
            "period" => Ok(Value::from(config.period)),
            "duty_cycle" => Ok(Value::from(config.duty_cycle)),
            "polarity" => Ok(Value::from(config.polarity.as_str())),
            _ => anyhow::bail!("Unknown PWM parameter '{}'", name),
        }
    }
}

impl std::fmt::Debug for SettablePwm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettablePwm")
            .field("pin", &self.pin.pin_num())
            .finish()
    }
}
