//! PWM over sysfs (`/sys/class/pwm/pwmchip<C>`).
//!
//! Request exports the channel if needed, disables it, zeroes the duty
//! cycle (so any period is accepted), then writes period, duty cycle and
//! polarity.

use std::path::PathBuf;

use artik_core::{PwmBackend, PwmConfig, PwmPolarity, Result};
use tracing::{debug, warn};

use crate::attr::{read_attr, write_attr};
use crate::SYSFS_PATH;

/// One sysfs PWM chip.
#[derive(Debug, Clone)]
pub struct SysfsPwm {
    root: PathBuf,
    chip: u32,
}

impl Default for SysfsPwm {
    fn default() -> Self {
        Self::new()
    }
}

impl SysfsPwm {
    /// `pwmchip0` under `/sys`.
    pub fn new() -> Self {
        Self {
            root: PathBuf::from(SYSFS_PATH),
            chip: 0,
        }
    }

    /// Use a different sysfs mount point.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Use `pwmchip<chip>`.
    pub fn with_chip(mut self, chip: u32) -> Self {
        self.chip = chip;
        self
    }

    /// Directory of the chip.
    pub fn chip_dir(&self) -> PathBuf {
        self.root
            .join("class/pwm")
            .join(format!("pwmchip{}", self.chip))
    }

    /// Directory of channel `pin`.
    pub fn channel_dir(&self, pin: u32) -> PathBuf {
        self.chip_dir().join(format!("pwm{}", pin))
    }

    fn unexport(&self, pin: u32) -> Result<()> {
        write_attr(&self.chip_dir().join("unexport"), pin.to_string())
    }

    fn configure(&self, dir: &std::path::Path, config: &PwmConfig) -> Result<()> {
        let enable = dir.join("enable");
        if read_attr(&enable).map(|v| v != "0").unwrap_or(true) {
            write_attr(&enable, "0")?;
        }
        write_attr(&dir.join("duty_cycle"), "0")?;
        write_attr(&dir.join("period"), config.period.to_string())?;
        write_attr(&dir.join("duty_cycle"), config.duty_cycle.to_string())?;
        write_attr(&dir.join("polarity"), config.polarity.as_str())
    }
}

/// A claimed sysfs PWM channel.
#[derive(Debug)]
pub struct SysfsPwmChannel {
    pin: u32,
    dir: PathBuf,
    exported: bool,
}

impl SysfsPwmChannel {
    /// Channel number.
    pub fn pin(&self) -> u32 {
        self.pin
    }

    /// Whether this process exported the channel.
    pub fn exported(&self) -> bool {
        self.exported
    }
}

impl PwmBackend for SysfsPwm {
    type Channel = SysfsPwmChannel;

    fn name(&self) -> &'static str {
        "sysfs"
    }

    fn open(&self, config: &PwmConfig) -> Result<SysfsPwmChannel> {
        let dir = self.channel_dir(config.pin_num);
        let exported = if dir.exists() {
            false
        } else {
            write_attr(&self.chip_dir().join("export"), config.pin_num.to_string())?;
            debug!(chip = self.chip, pin = config.pin_num, "Exported PWM channel");
            true
        };

        if let Err(e) = self.configure(&dir, config) {
            if exported {
                if let Err(undo) = self.unexport(config.pin_num) {
                    warn!(pin = config.pin_num, error = %undo, "Failed to unexport PWM channel");
                }
            }
            return Err(e);
        }

        Ok(SysfsPwmChannel {
            pin: config.pin_num,
            dir,
            exported,
        })
    }

    fn set_enabled(&self, channel: &mut SysfsPwmChannel, enabled: bool) -> Result<()> {
        write_attr(&channel.dir.join("enable"), if enabled { "1" } else { "0" })
    }

    fn set_period(&self, channel: &mut SysfsPwmChannel, period: u32) -> Result<()> {
        write_attr(&channel.dir.join("period"), period.to_string())
    }

    fn set_duty_cycle(&self, channel: &mut SysfsPwmChannel, duty_cycle: u32) -> Result<()> {
        write_attr(&channel.dir.join("duty_cycle"), duty_cycle.to_string())
    }

    fn set_polarity(&self, channel: &mut SysfsPwmChannel, polarity: PwmPolarity) -> Result<()> {
        write_attr(&channel.dir.join("polarity"), polarity.as_str())
    }

    fn close(&self, channel: &mut SysfsPwmChannel) -> Result<()> {
        if channel.exported {
            self.unexport(channel.pin)?;
            channel.exported = false;
            debug!(chip = self.chip, pin = channel.pin, "Unexported PWM channel");
        }
        Ok(())
    }
}
