//! PWM module.
//!
//! Periods and duty cycles are in nanoseconds. The manager enforces
//! `duty_cycle <= period` before anything reaches the backend.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ArtikError, Result};
use crate::registry::{Handle, HandleRegistry};

/// Output polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PwmPolarity {
    /// Active high
    #[default]
    Normal,
    /// Active low
    Inversed,
}

impl PwmPolarity {
    /// Sysfs spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Inversed => "inversed",
        }
    }
}

impl fmt::Display for PwmPolarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration of one PWM channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PwmConfig {
    /// Channel number
    pub pin_num: u32,
    /// User-visible name
    #[serde(default)]
    pub name: String,
    /// Period in nanoseconds
    pub period: u32,
    /// Active time per period in nanoseconds
    pub duty_cycle: u32,
    /// Polarity
    #[serde(default)]
    pub polarity: PwmPolarity,
}

impl PwmConfig {
    /// Channel with the given timing and normal polarity.
    pub fn new(pin_num: u32, period: u32, duty_cycle: u32) -> Self {
        Self {
            pin_num,
            name: format!("pwm{}", pin_num),
            period,
            duty_cycle,
            polarity: PwmPolarity::Normal,
        }
    }

    /// Set the polarity.
    pub fn with_polarity(mut self, polarity: PwmPolarity) -> Self {
        self.polarity = polarity;
        self
    }

    /// Set the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn validate(&self) -> Result<()> {
        check_duty(self.period, self.duty_cycle)
    }
}

fn check_duty(period: u32, duty_cycle: u32) -> Result<()> {
    if duty_cycle > period {
        return Err(ArtikError::invalid(format!(
            "duty cycle {} ns exceeds period {} ns",
            duty_cycle, period
        )));
    }
    Ok(())
}

/// OS-specific PWM shim.
pub trait PwmBackend: Send + Sync + 'static {
    /// Open per-channel state.
    type Channel: Send;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Claim the channel and apply period, duty cycle and polarity.
    /// The channel starts disabled.
    fn open(&self, config: &PwmConfig) -> Result<Self::Channel>;

    /// Start or stop the output.
    fn set_enabled(&self, channel: &mut Self::Channel, enabled: bool) -> Result<()>;

    /// Write the period.
    fn set_period(&self, channel: &mut Self::Channel, period: u32) -> Result<()>;

    /// Write the duty cycle.
    fn set_duty_cycle(&self, channel: &mut Self::Channel, duty_cycle: u32) -> Result<()>;

    /// Write the polarity. Only called while the channel is disabled.
    fn set_polarity(&self, channel: &mut Self::Channel, polarity: PwmPolarity) -> Result<()>;

    /// Give the channel back to the OS.
    fn close(&self, _channel: &mut Self::Channel) -> Result<()> {
        Ok(())
    }
}

/// PWM module ops.
pub trait PwmModule: Send + Sync {
    /// Claim a channel. Fails with `Busy` if already requested.
    fn request(&self, config: &PwmConfig) -> Result<Handle>;

    /// Release a channel (disabling it first).
    fn release(&self, handle: Handle) -> Result<()>;

    /// Start the output.
    fn enable(&self, handle: Handle) -> Result<()>;

    /// Stop the output.
    fn disable(&self, handle: Handle) -> Result<()>;

    /// Change the period. Fails with `BadArgs` below the current duty cycle.
    fn set_period(&self, handle: Handle, period: u32) -> Result<()>;

    /// Change the duty cycle. Fails with `BadArgs` above the current period.
    fn set_duty_cycle(&self, handle: Handle, duty_cycle: u32) -> Result<()>;

    /// Change the polarity.
    fn set_polarity(&self, handle: Handle, polarity: PwmPolarity) -> Result<()>;

    /// Current settings of the channel.
    fn config(&self, handle: Handle) -> Result<PwmConfig>;

    /// Whether the channel output is running.
    fn is_enabled(&self, handle: Handle) -> Result<bool>;

    /// Number of live handles.
    fn active_count(&self) -> usize;
}

struct PwmNode<C> {
    config: PwmConfig,
    enabled: bool,
    channel: C,
}

/// [`PwmModule`] implementation over one backend.
pub struct PwmManager<B: PwmBackend> {
    backend: B,
    channels: Mutex<HandleRegistry<u32, PwmNode<B::Channel>>>,
}

impl<B: PwmBackend> PwmManager<B> {
    /// Create a manager with no channels requested.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            channels: Mutex::new(HandleRegistry::new()),
        }
    }

    /// The backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn with_node<R>(
        &self,
        handle: Handle,
        f: impl FnOnce(&B, &mut PwmNode<B::Channel>) -> Result<R>,
    ) -> Result<R> {
        let mut channels = self.channels.lock();
        let node = channels
            .get_mut(handle)
            .ok_or(ArtikError::UnknownHandle { handle })?;
        f(&self.backend, node)
    }
}

impl<B: PwmBackend> PwmModule for PwmManager<B> {
    fn request(&self, config: &PwmConfig) -> Result<Handle> {
        config.validate()?;

        let mut channels = self.channels.lock();
        if channels.contains_key(&config.pin_num) {
            return Err(ArtikError::AlreadyRequested {
                module: "pwm",
                key: config.pin_num,
            });
        }

        let channel = self.backend.open(config)?;
        let node = PwmNode {
            config: config.clone(),
            enabled: false,
            channel,
        };
        let handle = channels
            .insert(config.pin_num, node)
            .map_err(|_| ArtikError::AlreadyRequested {
                module: "pwm",
                key: config.pin_num,
            })?;

        debug!(
            backend = self.backend.name(),
            pin = config.pin_num,
            period = config.period,
            duty_cycle = config.duty_cycle,
            %handle,
            "Requested PWM channel"
        );
        Ok(handle)
    }

    fn release(&self, handle: Handle) -> Result<()> {
        let mut channels = self.channels.lock();
        let node = channels
            .get_mut(handle)
            .ok_or(ArtikError::UnknownHandle { handle })?;
        if node.enabled {
            self.backend.set_enabled(&mut node.channel, false)?;
            node.enabled = false;
        }
        self.backend.close(&mut node.channel)?;

        if let Some((pin, _)) = channels.remove(handle) {
            debug!(backend = self.backend.name(), pin, %handle, "Released PWM channel");
        }
        Ok(())
    }

    fn enable(&self, handle: Handle) -> Result<()> {
        self.with_node(handle, |backend, node| {
            backend.set_enabled(&mut node.channel, true)?;
            node.enabled = true;
            Ok(())
        })
    }

    fn disable(&self, handle: Handle) -> Result<()> {
        self.with_node(handle, |backend, node| {
            backend.set_enabled(&mut node.channel, false)?;
            node.enabled = false;
            Ok(())
        })
    }

    fn set_period(&self, handle: Handle, period: u32) -> Result<()> {
        self.with_node(handle, |backend, node| {
            check_duty(period, node.config.duty_cycle)?;
            backend.set_period(&mut node.channel, period)?;
            node.config.period = period;
            Ok(())
        })
    }

    fn set_duty_cycle(&self, handle: Handle, duty_cycle: u32) -> Result<()> {
        self.with_node(handle, |backend, node| {
            check_duty(node.config.period, duty_cycle)?;
            backend.set_duty_cycle(&mut node.channel, duty_cycle)?;
            node.config.duty_cycle = duty_cycle;
            Ok(())
        })
    }

    fn set_polarity(&self, handle: Handle, polarity: PwmPolarity) -> Result<()> {
        self.with_node(handle, |backend, node| {
            // The kernel rejects polarity changes on a running channel.
            let was_enabled = node.enabled;
            if was_enabled {
                backend.set_enabled(&mut node.channel, false)?;
                node.enabled = false;
            }
            backend.set_polarity(&mut node.channel, polarity)?;
            node.config.polarity = polarity;
            if was_enabled {
                backend.set_enabled(&mut node.channel, true)?;
                node.enabled = true;
            }
            Ok(())
        })
    }

    fn config(&self, handle: Handle) -> Result<PwmConfig> {
        self.with_node(handle, |_, node| Ok(node.config.clone()))
    }

    fn is_enabled(&self, handle: Handle) -> Result<bool> {
        self.with_node(handle, |_, node| Ok(node.enabled))
    }

    fn active_count(&self) -> usize {
        self.channels.lock().len()
    }
}

impl<B: PwmBackend> Drop for PwmManager<B> {
    fn drop(&mut self) {
        for (handle, pin, mut node) in self.channels.get_mut().drain() {
            warn!(pin, %handle, "PWM channel still requested at module teardown");
            if node.enabled {
                if let Err(e) = self.backend.set_enabled(&mut node.channel, false) {
                    warn!(pin, error = %e, "Failed to disable PWM channel");
                }
            }
            if let Err(e) = self.backend.close(&mut node.channel) {
                warn!(pin, error = %e, "Failed to release PWM channel");
            }
        }
    }
}

/// An owned PWM channel, disabled and released on drop.
pub struct PwmPin {
    module: Arc<dyn PwmModule>,
    handle: Handle,
    pin_num: u32,
    released: bool,
}

impl PwmPin {
    /// Request `config` from `module`.
    pub fn request(module: Arc<dyn PwmModule>, config: PwmConfig) -> Result<Self> {
        let handle = module.request(&config)?;
        Ok(Self {
            module,
            handle,
            pin_num: config.pin_num,
            released: false,
        })
    }

    /// Start the output.
    pub fn enable(&self) -> Result<()> {
        self.module.enable(self.handle)
    }

    /// Stop the output.
    pub fn disable(&self) -> Result<()> {
        self.module.disable(self.handle)
    }

    /// Change the period (ns).
    pub fn set_period(&self, period: u32) -> Result<()> {
        self.module.set_period(self.handle, period)
    }

    /// Change the duty cycle (ns).
    pub fn set_duty_cycle(&self, duty_cycle: u32) -> Result<()> {
        self.module.set_duty_cycle(self.handle, duty_cycle)
    }

    /// Change the polarity.
    pub fn set_polarity(&self, polarity: PwmPolarity) -> Result<()> {
        self.module.set_polarity(self.handle, polarity)
    }

    /// Current settings.
    pub fn config(&self) -> Result<PwmConfig> {
        self.module.config(self.handle)
    }

    /// Whether the output is running.
    pub fn is_enabled(&self) -> Result<bool> {
        self.module.is_enabled(self.handle)
    }

    /// Channel number.
    pub fn pin_num(&self) -> u32 {
        self.pin_num
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

impl Drop for PwmPin {
    fn drop(&mut self) {
        if !self.released {
            if let Err(e) = self.module.release(self.handle) {
                warn!(pin = self.pin_num, error = %e, "Failed to release PWM channel");
            }
        }
    }
}

impl fmt::Debug for PwmPin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PwmPin")
            .field("pin_num", &self.pin_num)
            .field("handle", &self.handle)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Status;
    use crate::mock::MockPwm;

    #[test]
    fn test_duty_above_period_rejected() {
        let pwm = PwmManager::new(MockPwm::new());
        let err = pwm.request(&PwmConfig::new(0, 1000, 2000)).unwrap_err();
        assert_eq!(err.status(), Status::BadArgs);
        assert_eq!(pwm.backend().open_count(), 0);

        let h = pwm.request(&PwmConfig::new(0, 1000, 500)).unwrap();
        assert_eq!(pwm.set_duty_cycle(h, 1001).unwrap_err().status(), Status::BadArgs);
        assert_eq!(pwm.set_period(h, 499).unwrap_err().status(), Status::BadArgs);
        pwm.set_period(h, 500).unwrap();
        assert_eq!(pwm.config(h).unwrap().period, 500);
        pwm.release(h).unwrap();
    }

    #[test]
    fn test_enable_disable_tracks_state() {
        let backend = MockPwm::new();
        let probe = backend.clone();
        let pwm = PwmManager::new(backend);
        let h = pwm.request(&PwmConfig::new(2, 20_000_000, 1_500_000)).unwrap();
        assert!(!pwm.is_enabled(h).unwrap());
        pwm.enable(h).unwrap();
        assert!(probe.state(2).unwrap().enabled);
        pwm.disable(h).unwrap();
        assert!(!probe.state(2).unwrap().enabled);
        pwm.release(h).unwrap();
    }

    #[test]
    fn test_polarity_change_on_running_channel() {
        let backend = MockPwm::new();
        let probe = backend.clone();
        let pwm = PwmManager::new(backend);
        let h = pwm.request(&PwmConfig::new(1, 1000, 250)).unwrap();
        pwm.enable(h).unwrap();
        pwm.set_polarity(h, PwmPolarity::Inversed).unwrap();

        let state = probe.state(1).unwrap();
        assert_eq!(state.polarity, PwmPolarity::Inversed);
        assert!(state.enabled);
        assert!(pwm.is_enabled(h).unwrap());
        pwm.release(h).unwrap();
    }

    #[test]
    fn test_release_disables_running_channel() {
        let backend = MockPwm::new();
        let probe = backend.clone();
        let pwm: Arc<dyn PwmModule> = Arc::new(PwmManager::new(backend));
        let mut pin = PwmPin::request(pwm.clone(), PwmConfig::new(3, 1000, 100)).unwrap();
        pin.enable().unwrap();
        assert!(
            PwmPin::request(pwm.clone(), PwmConfig::new(3, 1000, 100))
                .unwrap_err()
                .is_busy()
        );
        pin.release().unwrap();
        assert!(probe.state(3).is_none());
        assert_eq!(probe.open_count(), 0);
    }
}
