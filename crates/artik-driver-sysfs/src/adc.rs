//! ADC over the Linux Industrial I/O (IIO) subsystem.
//!
//! Each pin maps to `<root>/bus/iio/devices/iio:device<D>/in_voltage<N>_raw`.
//! The attribute is opened on request and kept open; every read rewinds it
//! and parses the raw count.

use std::path::{Path, PathBuf};

use artik_core::{AdcBackend, AdcConfig, Result};
use tracing::debug;

use crate::attr::Attribute;
use crate::SYSFS_PATH;

/// IIO-backed ADC.
#[derive(Debug, Clone)]
pub struct IioAdc {
    root: PathBuf,
    device: u32,
}

impl Default for IioAdc {
    fn default() -> Self {
        Self::new()
    }
}

impl IioAdc {
    /// `iio:device0` under `/sys`.
    pub fn new() -> Self {
        Self {
            root: PathBuf::from(SYSFS_PATH),
            device: 0,
        }
    }

    /// Use a different sysfs mount point.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Use `iio:device<device>`.
    pub fn with_device(mut self, device: u32) -> Self {
        self.device = device;
        self
    }

    /// Directory of the IIO device.
    pub fn device_dir(&self) -> PathBuf {
        self.root
            .join("bus/iio/devices")
            .join(format!("iio:device{}", self.device))
    }

    /// Raw attribute of `pin`.
    pub fn channel_path(&self, pin: u32) -> PathBuf {
        self.device_dir().join(format!("in_voltage{}_raw", pin))
    }
}

/// An open IIO channel.
#[derive(Debug)]
pub struct IioChannel {
    pin: u32,
    raw: Attribute,
}

impl IioChannel {
    /// Pin number.
    pub fn pin(&self) -> u32 {
        self.pin
    }

    /// Path of the raw attribute.
    pub fn path(&self) -> &Path {
        self.raw.path()
    }
}

impl AdcBackend for IioAdc {
    type Channel = IioChannel;

    fn name(&self) -> &'static str {
        "iio"
    }

    fn open(&self, config: &AdcConfig) -> Result<IioChannel> {
        let raw = Attribute::open_read(self.channel_path(config.pin_num))?;
        debug!(pin = config.pin_num, path = %raw.path().display(), "Opened IIO channel");
        Ok(IioChannel {
            pin: config.pin_num,
            raw,
        })
    }

    fn read(&self, channel: &mut IioChannel) -> Result<i32> {
        channel.raw.read_i32()
    }

    fn close(&self, channel: &mut IioChannel) -> Result<()> {
        debug!(pin = channel.pin, path = %channel.path().display(), "Closing IIO channel");
        Ok(())
    }
}
