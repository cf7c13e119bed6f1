//! Sysfs attribute access.
//!
//! Attributes are small text files. Values are read whole and trimmed;
//! writes replace the whole value. Every `io::Error` is translated with
//! [`ArtikError::from_io`] so the failing path travels with the error.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use artik_core::{ArtikError, Result};

/// An attribute kept open across reads and writes.
#[derive(Debug)]
pub(crate) struct Attribute {
    path: PathBuf,
    file: File,
}

impl Attribute {
    /// Open read-only.
    pub(crate) fn open_read(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = File::open(&path).map_err(|e| ArtikError::from_io(&path, e))?;
        Ok(Self { path, file })
    }

    /// Open for reading and writing.
    pub(crate) fn open_rw(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| ArtikError::from_io(&path, e))?;
        Ok(Self { path, file })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current value, trimmed. Empty content is a short read.
    pub(crate) fn read_value(&mut self) -> Result<String> {
        self.file
            .seek(SeekFrom::Start(0))
            .map_err(|e| ArtikError::from_io(&self.path, e))?;

        let mut raw = String::new();
        self.file
            .read_to_string(&mut raw)
            .map_err(|e| ArtikError::from_io(&self.path, e))?;

        let value = raw.trim();
        if value.is_empty() {
            return Err(ArtikError::ShortRead {
                path: self.path.clone(),
            });
        }
        Ok(value.to_string())
    }

    /// Read the current value as a signed integer.
    pub(crate) fn read_i32(&mut self) -> Result<i32> {
        let value = self.read_value()?;
        value.parse().map_err(|_| ArtikError::Parse {
            path: self.path.clone(),
            raw: value,
        })
    }

    /// Replace the value.
    pub(crate) fn write_value(&mut self, value: &str) -> Result<()> {
        self.file
            .seek(SeekFrom::Start(0))
            .and_then(|_| self.file.write_all(value.as_bytes()))
            .and_then(|_| self.file.flush())
            .map_err(|e| ArtikError::from_io(&self.path, e))
    }
}

/// One-shot attribute write.
pub(crate) fn write_attr(path: &Path, value: impl AsRef<str>) -> Result<()> {
    fs::write(path, value.as_ref()).map_err(|e| ArtikError::from_io(path, e))
}

/// One-shot attribute read, trimmed.
pub(crate) fn read_attr(path: &Path) -> Result<String> {
    Attribute::open_read(path)?.read_value()
}
