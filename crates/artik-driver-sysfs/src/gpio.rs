//! GPIO over the legacy sysfs interface (`/sys/class/gpio`).
//!
//! Request exports the line if the kernel has not exported it yet, writes
//! `direction` (`in`, or `high`/`low` so an output never glitches to the
//! wrong level), writes `edge` for inputs that ask for one, and keeps
//! `value` open. Release unexports only lines this process exported.

use std::path::{Path, PathBuf};

use artik_core::{GpioBackend, GpioConfig, GpioDirection, GpioEdge, Result};
use tracing::{debug, warn};

use crate::attr::{write_attr, Attribute};
use crate::SYSFS_PATH;

/// Sysfs GPIO controller.
#[derive(Debug, Clone)]
pub struct SysfsGpio {
    root: PathBuf,
}

impl Default for SysfsGpio {
    fn default() -> Self {
        Self::new()
    }
}

impl SysfsGpio {
    /// Controller under `/sys`.
    pub fn new() -> Self {
        Self {
            root: PathBuf::from(SYSFS_PATH),
        }
    }

    /// Use a different sysfs mount point.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// `<root>/class/gpio`.
    pub fn class_dir(&self) -> PathBuf {
        self.root.join("class/gpio")
    }

    /// Directory of line `id`.
    pub fn line_dir(&self, id: u32) -> PathBuf {
        self.class_dir().join(format!("gpio{}", id))
    }

    fn unexport(&self, id: u32) -> Result<()> {
        write_attr(&self.class_dir().join("unexport"), id.to_string())
    }

    fn configure(&self, dir: &Path, config: &GpioConfig) -> Result<Attribute> {
        let direction = match (config.direction, config.initial_value) {
            (GpioDirection::In, _) => "in",
            (GpioDirection::Out, true) => "high",
            (GpioDirection::Out, false) => "low",
        };
        write_attr(&dir.join("direction"), direction)?;

        if config.direction == GpioDirection::In && config.edge != GpioEdge::None {
            write_attr(&dir.join("edge"), config.edge.as_str())?;
        }

        match config.direction {
            GpioDirection::In => Attribute::open_read(dir.join("value")),
            GpioDirection::Out => Attribute::open_rw(dir.join("value")),
        }
    }
}

/// A claimed sysfs GPIO line.
#[derive(Debug)]
pub struct SysfsLine {
    id: u32,
    exported: bool,
    value: Attribute,
}

impl SysfsLine {
    /// Line number.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Whether this process exported the line.
    pub fn exported(&self) -> bool {
        self.exported
    }
}

impl GpioBackend for SysfsGpio {
    type Line = SysfsLine;

    fn name(&self) -> &'static str {
        "sysfs"
    }

    fn open(&self, config: &GpioConfig) -> Result<SysfsLine> {
        let dir = self.line_dir(config.id);
        let exported = if dir.exists() {
            false
        } else {
            write_attr(&self.class_dir().join("export"), config.id.to_string())?;
            debug!(id = config.id, "Exported GPIO line");
            true
        };

        match self.configure(&dir, config) {
            Ok(value) => Ok(SysfsLine {
                id: config.id,
                exported,
                value,
            }),
            Err(e) => {
                if exported {
                    if let Err(undo) = self.unexport(config.id) {
                        warn!(id = config.id, error = %undo, "Failed to unexport GPIO line");
                    }
                }
                Err(e)
            }
        }
    }

    fn read(&self, line: &mut SysfsLine) -> Result<bool> {
        let raw = line.value.read_value()?;
        match raw.as_str() {
            "0" => Ok(false),
            "1" => Ok(true),
            _ => Err(artik_core::ArtikError::Parse {
                path: line.value.path().to_path_buf(),
                raw,
            }),
        }
    }

    fn write(&self, line: &mut SysfsLine, value: bool) -> Result<()> {
        line.value.write_value(if value { "1" } else { "0" })
    }

    fn close(&self, line: &mut SysfsLine) -> Result<()> {
        if line.exported {
            self.unexport(line.id)?;
            line.exported = false;
            debug!(id = line.id, "Unexported GPIO line");
        }
        Ok(())
    }
}
