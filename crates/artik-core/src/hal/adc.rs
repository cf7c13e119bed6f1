//! Readable trait implementation for ADC pins.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::adc::AdcPin;
use crate::capabilities::Readable;

/// A wrapper that implements [`Readable`] for a requested ADC pin.
///
/// Readings are raw counts multiplied by `scale` (1.0 unless set), so a
/// caller that knows the reference voltage can get volts directly.
pub struct ReadableAdc {
    pin: Arc<AdcPin>,
    scale: f64,
}

impl ReadableAdc {
    /// Wrap a requested pin.
    pub fn new(pin: AdcPin) -> Self {
        Self {
            pin: Arc::new(pin),
            scale: 1.0,
        }
    }

    /// Multiply every reading by `scale`.
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// The wrapped pin.
    pub fn pin(&self) -> &AdcPin {
        &self.pin
    }
}

#[async_trait]
impl Readable for ReadableAdc {
    async fn read(&self) -> Result<f64> {
        let pin = self.pin.clone();
        let raw = super::blocking(move || pin.value()).await?;
        Ok(f64::from(raw) * self.scale)
    }
}

impl std::fmt::Debug for ReadableAdc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadableAdc")
            .field("pin", &self.pin.pin_num())
            .field("scale", &self.scale)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adc::{AdcConfig, AdcManager};
    use crate::mock::MockAdc;

    #[tokio::test]
    async fn test_read_scaled() {
        let backend = MockAdc::new();
        backend.set_value(0, 2048);
        let module = Arc::new(AdcManager::new(backend));
        let pin = AdcPin::request(module, AdcConfig::new(0)).unwrap();

        let readable = ReadableAdc::new(pin).with_scale(1.8 / 4096.0);
        let volts = readable.read().await.unwrap();
        assert!((volts - 0.9).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_read_error_propagates() {
        let backend = MockAdc::new();
        let probe = backend.clone();
        let module = Arc::new(AdcManager::new(backend));
        let readable = ReadableAdc::new(AdcPin::request(module, AdcConfig::new(1)).unwrap());

        probe.fail_next_read();
        let err = readable.read().await.unwrap_err();
        assert!(err.to_string().contains("Short read"));
        assert_eq!(readable.read().await.unwrap(), 0.0);
    }
}
