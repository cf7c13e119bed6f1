//! ADC module.
//!
//! - [`AdcBackend`] - the OS shim (open a channel, read one sample, close it)
//! - [`AdcModule`] - the module ops handed out by the module registry
//! - [`AdcManager`] - the module implementation: one backend plus a
//!   [`HandleRegistry`] keyed by pin number
//! - [`AdcPin`] - an owned handle that releases itself on drop

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ArtikError, Result};
use crate::registry::{Handle, HandleRegistry};

/// Configuration of one ADC pin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdcConfig {
    /// Pin (channel) number
    pub pin_num: u32,
    /// User-visible name
    #[serde(default)]
    pub name: String,
}

impl AdcConfig {
    /// Create a config for `pin_num` with a default name.
    pub fn new(pin_num: u32) -> Self {
        Self {
            pin_num,
            name: format!("adc{}", pin_num),
        }
    }

    /// Set the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// OS-specific ADC shim.
pub trait AdcBackend: Send + Sync + 'static {
    /// Open per-pin state (descriptor, path).
    type Channel: Send;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Open the device node for `config.pin_num`.
    fn open(&self, config: &AdcConfig) -> Result<Self::Channel>;

    /// Perform one blocking read.
    fn read(&self, channel: &mut Self::Channel) -> Result<i32>;

    /// Release backend resources. The channel is dropped afterwards.
    fn close(&self, _channel: &mut Self::Channel) -> Result<()> {
        Ok(())
    }
}

/// ADC module ops.
pub trait AdcModule: Send + Sync {
    /// Claim a pin. Fails with `Busy` if the pin is already requested.
    fn request(&self, config: &AdcConfig) -> Result<Handle>;

    /// Read the current raw value of the pin.
    fn get_value(&self, handle: Handle) -> Result<i32>;

    /// Release the pin. Fails with `BadArgs` if the handle is not tracked.
    fn release(&self, handle: Handle) -> Result<()>;

    /// Configuration the pin was requested with.
    fn config(&self, handle: Handle) -> Result<AdcConfig>;

    /// Number of live handles.
    fn active_count(&self) -> usize;
}

struct AdcNode<C> {
    config: AdcConfig,
    channel: C,
}

/// [`AdcModule`] implementation over one backend.
pub struct AdcManager<B: AdcBackend> {
    backend: B,
    pins: Mutex<HandleRegistry<u32, AdcNode<B::Channel>>>,
}

impl<B: AdcBackend> AdcManager<B> {
    /// Create a manager with no pins requested.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            pins: Mutex::new(HandleRegistry::new()),
        }
    }

    /// The backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: AdcBackend> AdcModule for AdcManager<B> {
    fn request(&self, config: &AdcConfig) -> Result<Handle> {
        let mut pins = self.pins.lock();
        if pins.contains_key(&config.pin_num) {
            return Err(ArtikError::AlreadyRequested {
                module: "adc",
                key: config.pin_num,
            });
        }

        let channel = self.backend.open(config)?;
        let node = AdcNode {
            config: config.clone(),
            channel,
        };
        let handle = pins
            .insert(config.pin_num, node)
            .map_err(|_| ArtikError::AlreadyRequested {
                module: "adc",
                key: config.pin_num,
            })?;

        debug!(
            backend = self.backend.name(),
            pin = config.pin_num,
            %handle,
            "Requested ADC pin"
        );
        Ok(handle)
    }

    fn get_value(&self, handle: Handle) -> Result<i32> {
        let mut pins = self.pins.lock();
        let node = pins
            .get_mut(handle)
            .ok_or(ArtikError::UnknownHandle { handle })?;
        self.backend.read(&mut node.channel)
    }

    fn release(&self, handle: Handle) -> Result<()> {
        let mut pins = self.pins.lock();
        let node = pins
            .get_mut(handle)
            .ok_or(ArtikError::UnknownHandle { handle })?;
        self.backend.close(&mut node.channel)?;

        if let Some((pin, _)) = pins.remove(handle) {
            debug!(backend = self.backend.name(), pin, %handle, "Released ADC pin");
        }
        Ok(())
    }

    fn config(&self, handle: Handle) -> Result<AdcConfig> {
        self.pins
            .lock()
            .get(handle)
            .map(|node| node.config.clone())
            .ok_or(ArtikError::UnknownHandle { handle })
    }

    fn active_count(&self) -> usize {
        self.pins.lock().len()
    }
}

impl<B: AdcBackend> Drop for AdcManager<B> {
    fn drop(&mut self) {
        for (handle, pin, mut node) in self.pins.get_mut().drain() {
            warn!(pin, %handle, "ADC pin still requested at module teardown");
            if let Err(e) = self.backend.close(&mut node.channel) {
                warn!(pin, error = %e, "Failed to close ADC pin");
            }
        }
    }
}

/// An owned ADC pin.
///
/// Holds the module ops it was requested from and releases its handle when
/// dropped.
pub struct AdcPin {
    module: Arc<dyn AdcModule>,
    handle: Handle,
    config: AdcConfig,
    released: bool,
}

impl AdcPin {
    /// Request `config` from `module`.
    pub fn request(module: Arc<dyn AdcModule>, config: AdcConfig) -> Result<Self> {
        let handle = module.request(&config)?;
        Ok(Self {
            module,
            handle,
            config,
            released: false,
        })
    }

    /// Read the current raw value.
    pub fn value(&self) -> Result<i32> {
        self.module.get_value(self.handle)
    }

    /// Pin number.
    pub fn pin_num(&self) -> u32 {
        self.config.pin_num
    }

    /// Pin name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Underlying handle.
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Release now and report the outcome.
    ///
    /// On failure the pin keeps its handle so the release can be retried.
    pub fn release(&mut self) -> Result<()> {
        if !self.released {
            self.module.release(self.handle)?;
            self.released = true;
        }
        Ok(())
    }
}

impl Drop for AdcPin {
    fn drop(&mut self) {
        if !self.released {
            if let Err(e) = self.module.release(self.handle) {
                warn!(pin = self.config.pin_num, error = %e, "Failed to release ADC pin");
            }
        }
    }
}

impl std::fmt::Debug for AdcPin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdcPin")
            .field("pin_num", &self.config.pin_num)
            .field("name", &self.config.name)
            .field("handle", &self.handle)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Status;
    use crate::mock::MockAdc;
    use tracing_test::traced_test;

    fn manager() -> AdcManager<MockAdc> {
        let backend = MockAdc::new();
        backend.set_value(0, 1234);
        backend.set_value(1, 17);
        AdcManager::new(backend)
    }

    #[test]
    fn test_request_read_release_cycle() {
        let adc = manager();
        let h = adc.request(&AdcConfig::new(0)).unwrap();
        assert_eq!(adc.get_value(h).unwrap(), 1234);
        adc.release(h).unwrap();

        let h2 = adc.request(&AdcConfig::new(0)).unwrap();
        assert_eq!(adc.get_value(h2).unwrap(), 1234);
        adc.release(h2).unwrap();
        assert_eq!(adc.active_count(), 0);
    }

    #[test]
    fn test_double_request_is_busy() {
        let adc = manager();
        let h = adc.request(&AdcConfig::new(1)).unwrap();
        let err = adc.request(&AdcConfig::new(1)).unwrap_err();
        assert_eq!(err.status(), Status::Busy);
        // the second request never reached the backend
        assert_eq!(adc.backend().open_count(), 1);
        adc.release(h).unwrap();
    }

    #[test]
    fn test_unknown_handle_is_bad_args() {
        let adc = manager();
        let h = adc.request(&AdcConfig::new(0)).unwrap();
        adc.release(h).unwrap();

        assert_eq!(adc.release(h).unwrap_err().status(), Status::BadArgs);
        assert_eq!(adc.get_value(h).unwrap_err().status(), Status::BadArgs);
        assert_eq!(adc.config(h).unwrap_err().status(), Status::BadArgs);
    }

    #[test]
    fn test_failed_close_keeps_node() {
        let adc = manager();
        let h = adc.request(&AdcConfig::new(0)).unwrap();
        adc.backend().fail_next_close();
        assert!(adc.release(h).is_err());
        assert_eq!(adc.active_count(), 1);
        adc.release(h).unwrap();
        assert_eq!(adc.active_count(), 0);
    }

    #[test]
    fn test_repeated_cycles_leave_nothing_open() {
        let adc = manager();
        for _ in 0..100 {
            let h = adc.request(&AdcConfig::new(0)).unwrap();
            adc.get_value(h).unwrap();
            adc.release(h).unwrap();
        }
        assert_eq!(adc.backend().open_count(), 0);
        assert_eq!(adc.active_count(), 0);
    }

    #[test]
    fn test_pin_releases_on_drop() {
        let module: Arc<AdcManager<MockAdc>> = Arc::new(manager());
        {
            let pin = AdcPin::request(module.clone(), AdcConfig::new(0).with_name("light")).unwrap();
            assert_eq!(pin.value().unwrap(), 1234);
            assert_eq!(pin.name(), "light");
            assert_eq!(module.active_count(), 1);
        }
        assert_eq!(module.active_count(), 0);
        assert_eq!(module.backend().open_count(), 0);
    }

    #[test]
    #[traced_test]
    fn test_pin_release_can_be_retried() {
        let module: Arc<AdcManager<MockAdc>> = Arc::new(manager());
        let mut pin = AdcPin::request(module.clone(), AdcConfig::new(1)).unwrap();

        module.backend().fail_next_close();
        assert_eq!(pin.release().unwrap_err().status(), Status::Busy);
        assert_eq!(module.active_count(), 1);
        assert_eq!(pin.value().unwrap(), 17);

        pin.release().unwrap();
        assert_eq!(module.active_count(), 0);
        assert_eq!(module.backend().open_count(), 0);
        pin.release().unwrap();

        drop(pin);
        assert!(!logs_contain("Failed to release ADC pin"));
    }

    #[test]
    #[traced_test]
    fn test_manager_drop_closes_leftovers() {
        let backend = MockAdc::new();
        let probe = backend.clone();
        {
            let adc = AdcManager::new(backend);
            adc.request(&AdcConfig::new(2)).unwrap();
            adc.request(&AdcConfig::new(3)).unwrap();
            assert_eq!(probe.open_count(), 2);
        }
        assert_eq!(probe.open_count(), 0);
        assert!(logs_contain("ADC pin still requested at module teardown"));
    }
}
