//! In-memory backends for tests and hardware-free runs.
//!
//! Each mock is cheaply cloneable; clones share state, so a test can keep a
//! probe while the manager owns the backend.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::adc::{AdcBackend, AdcConfig};
use crate::error::{ArtikError, Result};
use crate::gpio::{GpioBackend, GpioConfig, GpioDirection};
use crate::pwm::{PwmBackend, PwmConfig, PwmPolarity};

fn mock_path(module: &str, key: u32) -> PathBuf {
    PathBuf::from(format!("mock://{}/{}", module, key))
}

#[derive(Default)]
struct AdcState {
    values: HashMap<u32, i32>,
    open: HashSet<u32>,
    fail_next_read: bool,
    fail_next_close: bool,
}

/// Mock ADC with `n_channels` channels reading preset values (0 when unset).
#[derive(Clone)]
pub struct MockAdc {
    n_channels: u32,
    state: Arc<Mutex<AdcState>>,
}

impl Default for MockAdc {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAdc {
    /// Eight channels, all reading zero.
    pub fn new() -> Self {
        Self::with_channels(8)
    }

    /// `n_channels` channels, all reading zero.
    pub fn with_channels(n_channels: u32) -> Self {
        Self {
            n_channels,
            state: Arc::new(Mutex::new(AdcState::default())),
        }
    }

    /// Preset the value read from `pin`.
    pub fn set_value(&self, pin: u32, value: i32) {
        self.state.lock().values.insert(pin, value);
    }

    /// Number of channels currently open.
    pub fn open_count(&self) -> usize {
        self.state.lock().open.len()
    }

    /// Make the next read fail with an I/O error.
    pub fn fail_next_read(&self) {
        self.state.lock().fail_next_read = true;
    }

    /// Make the next close fail with an I/O error.
    pub fn fail_next_close(&self) {
        self.state.lock().fail_next_close = true;
    }
}

impl AdcBackend for MockAdc {
    type Channel = u32;

    fn name(&self) -> &'static str {
        "mock"
    }

    fn open(&self, config: &AdcConfig) -> Result<u32> {
        if config.pin_num >= self.n_channels {
            return Err(ArtikError::DeviceNotFound {
                path: mock_path("adc", config.pin_num),
            });
        }
        self.state.lock().open.insert(config.pin_num);
        Ok(config.pin_num)
    }

    fn read(&self, channel: &mut u32) -> Result<i32> {
        let mut state = self.state.lock();
        if std::mem::take(&mut state.fail_next_read) {
            return Err(ArtikError::ShortRead {
                path: mock_path("adc", *channel),
            });
        }
        Ok(state.values.get(&*channel).copied().unwrap_or(0))
    }

    fn close(&self, channel: &mut u32) -> Result<()> {
        let mut state = self.state.lock();
        if std::mem::take(&mut state.fail_next_close) {
            return Err(ArtikError::from_io(
                mock_path("adc", *channel),
                std::io::Error::new(std::io::ErrorKind::Other, "injected close failure"),
            ));
        }
        state.open.remove(&*channel);
        Ok(())
    }
}

#[derive(Default)]
struct GpioState {
    levels: HashMap<u32, bool>,
    open: HashSet<u32>,
}

/// Mock GPIO controller. Outputs drive their own level, inputs read levels
/// set with [`MockGpio::drive`].
#[derive(Clone, Default)]
pub struct MockGpio {
    state: Arc<Mutex<GpioState>>,
}

impl MockGpio {
    /// Controller with every line low.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the external level seen on line `id`.
    pub fn drive(&self, id: u32, level: bool) {
        self.state.lock().levels.insert(id, level);
    }

    /// Current level of line `id`.
    pub fn level(&self, id: u32) -> bool {
        self.state.lock().levels.get(&id).copied().unwrap_or(false)
    }

    /// Number of lines currently claimed.
    pub fn open_count(&self) -> usize {
        self.state.lock().open.len()
    }
}

impl GpioBackend for MockGpio {
    type Line = u32;

    fn name(&self) -> &'static str {
        "mock"
    }

    fn open(&self, config: &GpioConfig) -> Result<u32> {
        let mut state = self.state.lock();
        if config.direction == GpioDirection::Out {
            state.levels.insert(config.id, config.initial_value);
        }
        state.open.insert(config.id);
        Ok(config.id)
    }

    fn read(&self, line: &mut u32) -> Result<bool> {
        Ok(self.level(*line))
    }

    fn write(&self, line: &mut u32, value: bool) -> Result<()> {
        self.drive(*line, value);
        Ok(())
    }

    fn close(&self, line: &mut u32) -> Result<()> {
        self.state.lock().open.remove(&*line);
        Ok(())
    }
}

/// Settings of one mock PWM channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockPwmState {
    /// Period (ns)
    pub period: u32,
    /// Duty cycle (ns)
    pub duty_cycle: u32,
    /// Polarity
    pub polarity: PwmPolarity,
    /// Output running
    pub enabled: bool,
}

/// Mock PWM chip recording the last written settings per channel.
#[derive(Clone, Default)]
pub struct MockPwm {
    channels: Arc<Mutex<HashMap<u32, MockPwmState>>>,
}

impl MockPwm {
    /// Chip with no channels claimed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Settings of a claimed channel.
    pub fn state(&self, pin: u32) -> Option<MockPwmState> {
        self.channels.lock().get(&pin).copied()
    }

    /// Number of channels currently claimed.
    pub fn open_count(&self) -> usize {
        self.channels.lock().len()
    }

    fn update(&self, pin: u32, f: impl FnOnce(&mut MockPwmState)) -> Result<()> {
        let mut channels = self.channels.lock();
        let state = channels
            .get_mut(&pin)
            .ok_or_else(|| ArtikError::DeviceNotFound {
                path: mock_path("pwm", pin),
            })?;
        f(state);
        Ok(())
    }
}

impl PwmBackend for MockPwm {
    type Channel = u32;

    fn name(&self) -> &'static str {
        "mock"
    }

    fn open(&self, config: &PwmConfig) -> Result<u32> {
        self.channels.lock().insert(
            config.pin_num,
            MockPwmState {
                period: config.period,
                duty_cycle: config.duty_cycle,
                polarity: config.polarity,
                enabled: false,
            },
        );
        Ok(config.pin_num)
    }

    fn set_enabled(&self, channel: &mut u32, enabled: bool) -> Result<()> {
        self.update(*channel, |s| s.enabled = enabled)
    }

    fn set_period(&self, channel: &mut u32, period: u32) -> Result<()> {
        self.update(*channel, |s| s.period = period)
    }

    fn set_duty_cycle(&self, channel: &mut u32, duty_cycle: u32) -> Result<()> {
        self.update(*channel, |s| s.duty_cycle = duty_cycle)
    }

    fn set_polarity(&self, channel: &mut u32, polarity: PwmPolarity) -> Result<()> {
        self.update(*channel, |s| s.polarity = polarity)
    }

    fn close(&self, channel: &mut u32) -> Result<()> {
        self.channels.lock().remove(&*channel);
        Ok(())
    }
}
