//! Module registry.
//!
//! Each subsystem (ADC, GPIO, PWM) is offered as a module whose ops are a
//! trait object. [`ModuleRegistry::request_api_module`] hands out the ops by
//! name and counts references; [`ModuleRegistry::release_api_module`] gives
//! them back. The instance is built on the first request and lives as long
//! as the registry, so a pin held past the last release still belongs to
//! the one instance that owns its key. Dropping the registry and every
//! outstanding pin tears it down, closing anything its callers left open.
//!
//! ```
//! use artik::config::{ArtikConfig, BackendKind};
//! use artik::module::ModuleRegistry;
//!
//! let mut config = ArtikConfig::default();
//! config.platform.model = Some("generic".into());
//! config.adc.backend = Some(BackendKind::Mock);
//!
//! let registry = ModuleRegistry::from_config(&config)?;
//! let ops = registry.request_api_module("adc")?;
//! let adc = ops.as_adc().expect("adc ops");
//! assert_eq!(adc.active_count(), 0);
//! registry.release_api_module(&ops)?;
//! # Ok::<(), artik_core::ArtikError>(())
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use artik_core::mock::{MockAdc, MockGpio, MockPwm};
use artik_core::{
    AdcManager, AdcModule, ArtikError, GpioManager, GpioModule, PwmManager, PwmModule, Result,
};
use artik_driver_sysfs::{IioAdc, SysfsGpio, SysfsPwm};
use artik_driver_tizenrt::TizenRtAdc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{ArtikConfig, BackendKind};
use crate::platform::Platform;

/// Module names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleId {
    /// Analog-to-digital converter
    Adc,
    /// General purpose I/O
    Gpio,
    /// Pulse-width modulation
    Pwm,
}

impl ModuleId {
    /// Every module the SDK knows about.
    pub const ALL: [ModuleId; 3] = [ModuleId::Adc, ModuleId::Gpio, ModuleId::Pwm];

    /// Lookup name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Adc => "adc",
            Self::Gpio => "gpio",
            Self::Pwm => "pwm",
        }
    }

    /// Parse a lookup name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.as_str() == name)
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ops of one requested module.
#[derive(Clone)]
pub enum ModuleOps {
    /// ADC ops
    Adc(Arc<dyn AdcModule>),
    /// GPIO ops
    Gpio(Arc<dyn GpioModule>),
    /// PWM ops
    Pwm(Arc<dyn PwmModule>),
}

impl ModuleOps {
    /// Which module these ops belong to.
    pub fn id(&self) -> ModuleId {
        match self {
            Self::Adc(_) => ModuleId::Adc,
            Self::Gpio(_) => ModuleId::Gpio,
            Self::Pwm(_) => ModuleId::Pwm,
        }
    }

    /// ADC ops, if this is the ADC module.
    pub fn as_adc(&self) -> Option<&Arc<dyn AdcModule>> {
        match self {
            Self::Adc(ops) => Some(ops),
            _ => None,
        }
    }

    /// GPIO ops, if this is the GPIO module.
    pub fn as_gpio(&self) -> Option<&Arc<dyn GpioModule>> {
        match self {
            Self::Gpio(ops) => Some(ops),
            _ => None,
        }
    }

    /// PWM ops, if this is the PWM module.
    pub fn as_pwm(&self) -> Option<&Arc<dyn PwmModule>> {
        match self {
            Self::Pwm(ops) => Some(ops),
            _ => None,
        }
    }

    /// Whether both refer to the same module instance.
    pub fn same_instance(&self, other: &ModuleOps) -> bool {
        match (self, other) {
            (Self::Adc(a), Self::Adc(b)) => Arc::ptr_eq(a, b),
            (Self::Gpio(a), Self::Gpio(b)) => Arc::ptr_eq(a, b),
            (Self::Pwm(a), Self::Pwm(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for ModuleOps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ModuleOps").field(&self.id()).finish()
    }
}

type Factory = Box<dyn Fn() -> ModuleOps + Send + Sync>;

struct Registration {
    backend: &'static str,
    factory: Factory,
}

struct Instance {
    ops: ModuleOps,
    refs: usize,
}

/// Name-keyed registry of module ops with reference counting.
pub struct ModuleRegistry {
    platform: Platform,
    modules: HashMap<ModuleId, Registration>,
    instances: Mutex<HashMap<ModuleId, Instance>>,
}

impl ModuleRegistry {
    /// Registry with no modules.
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            modules: HashMap::new(),
            instances: Mutex::new(HashMap::new()),
        }
    }

    /// Offer module `id`, built by `factory` on first request.
    pub fn with_module<F>(mut self, id: ModuleId, backend: &'static str, factory: F) -> Self
    where
        F: Fn() -> ModuleOps + Send + Sync + 'static,
    {
        self.modules.insert(
            id,
            Registration {
                backend,
                factory: Box::new(factory),
            },
        );
        self
    }

    /// Build the registry the configuration describes.
    ///
    /// Backends left unset follow the platform: sysfs on Linux boards; on
    /// the RTOS board only the ADC is offered, through `/dev/adc<N>`.
    pub fn from_config(config: &ArtikConfig) -> Result<Self> {
        config.validate().map_err(ArtikError::Configuration)?;

        let platform = Platform::resolve(
            config.platform.model.as_deref(),
            &config.platform.proc_root,
        );
        let default_backend = |rtos_default: BackendKind| {
            if platform.is_rtos() {
                rtos_default
            } else {
                BackendKind::Sysfs
            }
        };
        let mut registry = Self::new(platform);

        let sysfs_root = config.platform.sysfs_root.clone();
        let adc_device = config.adc.device;
        registry = match config.adc.backend.unwrap_or(default_backend(BackendKind::Tizenrt)) {
            BackendKind::Sysfs => registry.with_module(ModuleId::Adc, "iio", move || {
                let backend = IioAdc::new().with_root(&sysfs_root).with_device(adc_device);
                ModuleOps::Adc(Arc::new(AdcManager::new(backend)))
            }),
            BackendKind::Tizenrt => {
                let dev_root = config.platform.dev_root.clone();
                let trigger = config.adc.trigger();
                registry.with_module(ModuleId::Adc, "tizenrt", move || {
                    let backend = TizenRtAdc::new()
                        .with_dev_root(&dev_root)
                        .with_device(adc_device)
                        .with_trigger(trigger);
                    ModuleOps::Adc(Arc::new(AdcManager::new(backend)))
                })
            }
            BackendKind::Mock => registry.with_module(ModuleId::Adc, "mock", || {
                ModuleOps::Adc(Arc::new(AdcManager::new(MockAdc::new())))
            }),
            BackendKind::Disabled => registry,
        };

        let sysfs_root = config.platform.sysfs_root.clone();
        registry = match config.gpio.backend.unwrap_or(default_backend(BackendKind::Disabled)) {
            BackendKind::Sysfs => registry.with_module(ModuleId::Gpio, "sysfs", move || {
                ModuleOps::Gpio(Arc::new(GpioManager::new(
                    SysfsGpio::new().with_root(&sysfs_root),
                )))
            }),
            BackendKind::Mock => registry.with_module(ModuleId::Gpio, "mock", || {
                ModuleOps::Gpio(Arc::new(GpioManager::new(MockGpio::new())))
            }),
            BackendKind::Tizenrt | BackendKind::Disabled => registry,
        };

        let sysfs_root = config.platform.sysfs_root.clone();
        let chip = config.pwm.chip;
        registry = match config.pwm.backend.unwrap_or(default_backend(BackendKind::Disabled)) {
            BackendKind::Sysfs => registry.with_module(ModuleId::Pwm, "sysfs", move || {
                ModuleOps::Pwm(Arc::new(PwmManager::new(
                    SysfsPwm::new().with_root(&sysfs_root).with_chip(chip),
                )))
            }),
            BackendKind::Mock => registry.with_module(ModuleId::Pwm, "mock", || {
                ModuleOps::Pwm(Arc::new(PwmManager::new(MockPwm::new())))
            }),
            BackendKind::Tizenrt | BackendKind::Disabled => registry,
        };

        info!(
            platform = platform.name(),
            modules = ?registry.available_modules(),
            "Module registry ready"
        );
        Ok(registry)
    }

    /// Board this registry serves.
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Board name.
    pub fn platform_name(&self) -> &'static str {
        self.platform.name()
    }

    /// Offered modules, in name order.
    pub fn available_modules(&self) -> Vec<ModuleId> {
        let mut ids: Vec<_> = self.modules.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Whether `name` is an offered module.
    pub fn is_module_available(&self, name: &str) -> bool {
        ModuleId::from_name(name).is_some_and(|id| self.modules.contains_key(&id))
    }

    /// Backend name behind module `id`.
    pub fn backend_name(&self, id: ModuleId) -> Option<&'static str> {
        self.modules.get(&id).map(|r| r.backend)
    }

    /// Current number of outstanding requests for module `id`.
    pub fn ref_count(&self, id: ModuleId) -> usize {
        self.instances.lock().get(&id).map_or(0, |i| i.refs)
    }

    /// Ops of module `name`. Repeated requests share one instance.
    pub fn request_api_module(&self, name: &str) -> Result<ModuleOps> {
        let (id, registration) = ModuleId::from_name(name)
            .and_then(|id| self.modules.get(&id).map(|r| (id, r)))
            .ok_or_else(|| ArtikError::ModuleNotAvailable {
                name: name.to_string(),
            })?;

        let mut instances = self.instances.lock();
        let entry = instances.entry(id).or_insert_with(|| {
            info!(module = %id, backend = registration.backend, "Creating module");
            Instance {
                ops: (registration.factory)(),
                refs: 0,
            }
        });
        entry.refs += 1;
        debug!(module = %id, refs = entry.refs, "Module requested");
        Ok(entry.ops.clone())
    }

    /// Give back ops obtained from [`ModuleRegistry::request_api_module`].
    ///
    /// The instance stays built after the last release; requesting the
    /// module again hands out the same ops.
    pub fn release_api_module(&self, ops: &ModuleOps) -> Result<()> {
        self.release(ops.id(), ops)
    }

    fn release(&self, id: ModuleId, ops: &ModuleOps) -> Result<()> {
        let mut instances = self.instances.lock();
        let entry = instances
            .get_mut(&id)
            .filter(|i| i.refs > 0 && i.ops.same_instance(ops))
            .ok_or_else(|| ArtikError::ModuleNotRequested {
                name: id.as_str().to_string(),
            })?;

        entry.refs -= 1;
        debug!(module = %id, refs = entry.refs, "Module released");
        if entry.refs == 0 {
            info!(module = %id, "Module idle");
        }
        Ok(())
    }

    /// Request the ADC module.
    pub fn request_adc(&self) -> Result<Arc<dyn AdcModule>> {
        let ops = self.request_api_module(ModuleId::Adc.as_str())?;
        match ops.as_adc() {
            Some(adc) => Ok(Arc::clone(adc)),
            None => Err(self.mismatch(ModuleId::Adc, &ops)),
        }
    }

    /// Request the GPIO module.
    pub fn request_gpio(&self) -> Result<Arc<dyn GpioModule>> {
        let ops = self.request_api_module(ModuleId::Gpio.as_str())?;
        match ops.as_gpio() {
            Some(gpio) => Ok(Arc::clone(gpio)),
            None => Err(self.mismatch(ModuleId::Gpio, &ops)),
        }
    }

    /// Request the PWM module.
    pub fn request_pwm(&self) -> Result<Arc<dyn PwmModule>> {
        let ops = self.request_api_module(ModuleId::Pwm.as_str())?;
        match ops.as_pwm() {
            Some(pwm) => Ok(Arc::clone(pwm)),
            None => Err(self.mismatch(ModuleId::Pwm, &ops)),
        }
    }

    // A factory registered under the wrong id; undo the request.
    fn mismatch(&self, id: ModuleId, ops: &ModuleOps) -> ArtikError {
        if let Err(e) = self.release(id, ops) {
            warn!(module = %id, error = %e, "Failed to roll back module request");
        }
        ArtikError::NotSupported {
            message: format!("module '{}' returned {} ops", id, ops.id()),
        }
    }
}

impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("platform", &self.platform)
            .field("modules", &self.available_modules())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use artik_core::{AdcConfig, GpioConfig, Status};
    use tracing_test::traced_test;

    fn mock_config() -> ArtikConfig {
        let mut config = ArtikConfig::default();
        config.platform.model = Some("ARTIK 530".to_string());
        config.adc.backend = Some(BackendKind::Mock);
        config.gpio.backend = Some(BackendKind::Mock);
        config.pwm.backend = Some(BackendKind::Mock);
        config
    }

    #[test]
    fn test_module_names() {
        assert_eq!(ModuleId::from_name("pwm"), Some(ModuleId::Pwm));
        assert_eq!(ModuleId::from_name("spi"), None);
        assert_eq!(ModuleId::Gpio.to_string(), "gpio");
    }

    #[test]
    #[traced_test]
    fn test_shared_instance_and_refcount() {
        let registry = ModuleRegistry::from_config(&mock_config()).unwrap();
        let a = registry.request_api_module("adc").unwrap();
        let b = registry.request_api_module("adc").unwrap();
        assert!(a.same_instance(&b));
        assert_eq!(registry.ref_count(ModuleId::Adc), 2);

        let h = a.as_adc().unwrap().request(&AdcConfig::new(0)).unwrap();
        assert_eq!(b.as_adc().unwrap().get_value(h).unwrap(), 0);
        b.as_adc().unwrap().release(h).unwrap();

        registry.release_api_module(&a).unwrap();
        registry.release_api_module(&b).unwrap();
        assert_eq!(registry.ref_count(ModuleId::Adc), 0);
        assert!(logs_contain("Creating module"));
        assert!(logs_contain("Module idle"));

        let err = registry.release_api_module(&a).unwrap_err();
        assert_eq!(err.status(), Status::BadArgs);
    }

    #[test]
    fn test_instance_outlives_final_release() {
        let registry = ModuleRegistry::from_config(&mock_config()).unwrap();
        let first = registry.request_api_module("gpio").unwrap();
        let gpio = first.as_gpio().unwrap().clone();
        let h = gpio.request(&GpioConfig::input(28)).unwrap();
        registry.release_api_module(&first).unwrap();

        let second = registry.request_api_module("gpio").unwrap();
        assert!(first.same_instance(&second));
        assert_eq!(second.as_gpio().unwrap().active_count(), 1);
        assert_eq!(
            second
                .as_gpio()
                .unwrap()
                .request(&GpioConfig::input(28))
                .unwrap_err()
                .status(),
            Status::Busy
        );

        gpio.release(h).unwrap();
        registry.release_api_module(&second).unwrap();
        // more releases than requests
        assert_eq!(
            registry.release_api_module(&first).unwrap_err().status(),
            Status::BadArgs
        );
    }

    #[test]
    fn test_foreign_ops_rejected() {
        let registry = ModuleRegistry::from_config(&mock_config()).unwrap();
        let ops = registry.request_api_module("pwm").unwrap();
        let other = ModuleRegistry::from_config(&mock_config()).unwrap();
        let foreign = other.request_api_module("pwm").unwrap();

        assert_eq!(
            registry.release_api_module(&foreign).unwrap_err().status(),
            Status::BadArgs
        );
        assert_eq!(registry.ref_count(ModuleId::Pwm), 1);
        registry.release_api_module(&ops).unwrap();
        other.release_api_module(&foreign).unwrap();
    }

    #[test]
    fn test_unknown_module_not_supported() {
        let registry = ModuleRegistry::from_config(&mock_config()).unwrap();
        let err = registry.request_api_module("spi").unwrap_err();
        assert_eq!(err.status(), Status::NotSupported);
        assert!(!registry.is_module_available("spi"));
        assert!(registry.is_module_available("pwm"));
    }

    #[test]
    fn test_rtos_board_offers_adc_only() {
        let mut config = ArtikConfig::default();
        config.platform.model = Some("ARTIK 053".to_string());
        let registry = ModuleRegistry::from_config(&config).unwrap();

        assert_eq!(registry.platform(), Platform::Artik05x);
        assert_eq!(registry.available_modules(), vec![ModuleId::Adc]);
        assert_eq!(registry.backend_name(ModuleId::Adc), Some("tizenrt"));
        assert_eq!(
            registry.request_gpio().err().unwrap().status(),
            Status::NotSupported
        );
    }

    #[test]
    fn test_linux_board_defaults_to_sysfs() {
        let mut config = ArtikConfig::default();
        config.platform.model = Some("Samsung ARTIK10 board".to_string());
        let registry = ModuleRegistry::from_config(&config).unwrap();

        assert_eq!(registry.platform_name(), "ARTIK 1020");
        assert_eq!(registry.available_modules(), ModuleId::ALL.to_vec());
        assert_eq!(registry.backend_name(ModuleId::Adc), Some("iio"));
        assert_eq!(registry.backend_name(ModuleId::Pwm), Some("sysfs"));
    }

    #[test]
    fn test_disabled_and_invalid_config() {
        let mut config = mock_config();
        config.pwm.backend = Some(BackendKind::Disabled);
        let registry = ModuleRegistry::from_config(&config).unwrap();
        assert!(!registry.is_module_available("pwm"));

        config.application.log_level = "chatty".to_string();
        let err = ModuleRegistry::from_config(&config).unwrap_err();
        assert_eq!(err.status(), Status::BadArgs);
    }

    #[test]
    fn test_typed_helpers() {
        let registry = ModuleRegistry::from_config(&mock_config()).unwrap();
        let pwm = registry.request_pwm().unwrap();
        assert_eq!(pwm.active_count(), 0);
        assert_eq!(registry.ref_count(ModuleId::Pwm), 1);
        registry
            .release_api_module(&ModuleOps::Pwm(pwm))
            .unwrap();
        assert_eq!(registry.ref_count(ModuleId::Pwm), 0);

        let gpio = registry.request_gpio().unwrap();
        assert!(registry
            .request_api_module("gpio")
            .unwrap()
            .as_pwm()
            .is_none());
        assert_eq!(registry.ref_count(ModuleId::Gpio), 2);
        registry.release_api_module(&ModuleOps::Gpio(gpio.clone())).unwrap();
        registry.release_api_module(&ModuleOps::Gpio(gpio)).unwrap();
    }

    #[test]
    #[traced_test]
    fn test_mismatched_factory_rolls_back() {
        let registry = ModuleRegistry::new(Platform::Generic).with_module(
            ModuleId::Gpio,
            "mock",
            || ModuleOps::Adc(Arc::new(AdcManager::new(MockAdc::new()))),
        );

        let err = registry.request_gpio().err().unwrap();
        assert_eq!(err.status(), Status::NotSupported);
        assert!(err.to_string().contains("adc"));
        assert_eq!(registry.ref_count(ModuleId::Gpio), 0);
        assert!(!logs_contain("Failed to roll back"));
    }
}
