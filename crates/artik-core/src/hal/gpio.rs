//! Switchable trait implementation for GPIO lines.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::capabilities::Switchable;
use crate::gpio::GpioPin;

/// A wrapper that implements [`Switchable`] for a requested GPIO line.
///
/// # Feature Naming
///
/// The line answers to:
/// - `"value"`
/// - its configured name (e.g. `"led"`)
/// - its number, bare or prefixed: `"21"`, `"gpio21"`
pub struct SwitchableGpio {
    pin: Arc<GpioPin>,
}

impl SwitchableGpio {
    /// Wrap a requested line.
    pub fn new(pin: GpioPin) -> Self {
        Self { pin: Arc::new(pin) }
    }

    /// The wrapped line.
    pub fn pin(&self) -> &GpioPin {
        &self.pin
    }

    fn check_name(&self, name: &str) -> Result<()> {
        let id = self.pin.id();
        let matches_id = |s: &str| s.parse::<u32>().map(|n| n == id).unwrap_or(false);

        if name == "value"
            || name == self.pin.name()
            || matches_id(name)
            || name.strip_prefix("gpio").map(matches_id).unwrap_or(false)
        {
            return Ok(());
        }
        anyhow::bail!("Unknown feature '{}' for gpio {}", name, id)
    }

    async fn drive(&self, name: &str, value: bool) -> Result<()> {
        self.check_name(name)?;
        let pin = self.pin.clone();
        super::blocking(move || pin.write(value)).await
    }
}

#[async_trait]
impl Switchable for SwitchableGpio {
    async fn turn_on(&mut self, name: &str) -> Result<()> {
        self.drive(name, true).await
    }

    async fn turn_off(&mut self, name: &str) -> Result<()> {
        self.drive(name, false).await
    }

    async fn is_on(&self, name: &str) -> Result<bool> {
        self.check_name(name)?;
        let pin = self.pin.clone();
        super::blocking(move || pin.read()).await
    }
}

impl std::fmt::Debug for SwitchableGpio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwitchableGpio")
            .field("id", &self.pin.id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpio::{GpioConfig, GpioManager};
    use crate::mock::MockGpio;

    fn led() -> (SwitchableGpio, MockGpio) {
        let backend = MockGpio::new();
        let probe = backend.clone();
        let module = Arc::new(GpioManager::new(backend));
        let pin = GpioPin::request(module, GpioConfig::output(21, false).with_name("led")).unwrap();
        (SwitchableGpio::new(pin), probe)
    }

    #[tokio::test]
    async fn test_turn_on_off_by_any_name() {
        let (mut led, probe) = led();
        led.turn_on("led").await.unwrap();
        assert!(probe.level(21));
        led.turn_off("gpio21").await.unwrap();
        assert!(!probe.level(21));
        led.turn_on("21").await.unwrap();
        assert!(led.is_on("value").await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_feature_rejected() {
        let (mut led, probe) = led();
        assert!(led.turn_on("gpio22").await.is_err());
        assert!(led.turn_on("buzzer").await.is_err());
        assert!(!probe.level(21));
    }
}
