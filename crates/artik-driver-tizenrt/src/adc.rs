//! ADC over the RTOS `/dev/adc<D>` character device.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use artik_core::{AdcBackend, AdcConfig, ArtikError, Result};
use tracing::{debug, trace};

use crate::DEV_PATH;

/// `_ANIOC(0x0001)`: start one conversion on every enabled channel.
pub const ANIOC_TRIGGER: u64 = 0x0b01;

/// Bytes per packed sample: `u8` channel followed by an `i32` value.
pub const SAMPLE_SIZE: usize = 5;

/// Samples fetched per read.
const SAMPLES_PER_READ: usize = 8;

/// One decoded conversion result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdcSample {
    /// Channel the sample belongs to.
    pub channel: u8,
    /// Raw conversion value.
    pub data: i32,
}

/// Decode a buffer of packed samples. A trailing partial record is ignored.
pub fn decode_samples(buf: &[u8]) -> Vec<AdcSample> {
    buf.chunks_exact(SAMPLE_SIZE)
        .map(|rec| AdcSample {
            channel: rec[0],
            data: i32::from_ne_bytes([rec[1], rec[2], rec[3], rec[4]]),
        })
        .collect()
}

/// RTOS ADC device.
///
/// With `trigger_request` set to `None` no ioctl is issued and the device
/// file is rewound before each read instead, which lets a plain file of
/// recorded samples stand in for the device.
#[derive(Debug, Clone)]
pub struct TizenRtAdc {
    dev_root: PathBuf,
    device: u32,
    trigger_request: Option<u64>,
}

impl Default for TizenRtAdc {
    fn default() -> Self {
        Self::new()
    }
}

impl TizenRtAdc {
    /// `/dev/adc0`, triggered with [`ANIOC_TRIGGER`].
    pub fn new() -> Self {
        Self {
            dev_root: PathBuf::from(DEV_PATH),
            device: 0,
            trigger_request: Some(ANIOC_TRIGGER),
        }
    }

    /// Use a different device directory.
    pub fn with_dev_root(mut self, dev_root: impl Into<PathBuf>) -> Self {
        self.dev_root = dev_root.into();
        self
    }

    /// Use `adc<device>`.
    pub fn with_device(mut self, device: u32) -> Self {
        self.device = device;
        self
    }

    /// Override the trigger ioctl request code, or disable triggering.
    pub fn with_trigger(mut self, request: Option<u64>) -> Self {
        self.trigger_request = request;
        self
    }

    /// Path of the device node.
    pub fn device_path(&self) -> PathBuf {
        self.dev_root.join(format!("adc{}", self.device))
    }
}

/// An open ADC device bound to one channel.
#[derive(Debug)]
pub struct TizenRtChannel {
    pin: u32,
    path: PathBuf,
    file: File,
}

impl TizenRtChannel {
    /// Channel number.
    pub fn pin(&self) -> u32 {
        self.pin
    }

    /// Path of the device node.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[allow(unsafe_code)]
fn trigger(file: &File, request: u64) -> std::io::Result<()> {
    // SAFETY: fd is owned by `file` and open for the whole call; the
    // trigger request takes an integer argument, no memory is passed.
    let ret = unsafe { libc::ioctl(file.as_raw_fd(), request as _, 0 as libc::c_ulong) };
    if ret < 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

impl AdcBackend for TizenRtAdc {
    type Channel = TizenRtChannel;

    fn name(&self) -> &'static str {
        "tizenrt"
    }

    fn open(&self, config: &AdcConfig) -> Result<TizenRtChannel> {
        if config.pin_num > u32::from(u8::MAX) {
            return Err(ArtikError::invalid(format!(
                "ADC channel {} does not fit a sample record",
                config.pin_num
            )));
        }
        let path = self.device_path();
        let file = File::open(&path).map_err(|e| ArtikError::from_io(&path, e))?;
        debug!(pin = config.pin_num, path = %path.display(), "Opened RTOS ADC device");
        Ok(TizenRtChannel {
            pin: config.pin_num,
            path,
            file,
        })
    }

    fn read(&self, channel: &mut TizenRtChannel) -> Result<i32> {
        match self.trigger_request {
            Some(request) => trigger(&channel.file, request),
            None => channel.file.seek(SeekFrom::Start(0)).map(|_| ()),
        }
        .map_err(|e| ArtikError::from_io(&channel.path, e))?;

        let mut buf = [0u8; SAMPLE_SIZE * SAMPLES_PER_READ];
        let n = channel
            .file
            .read(&mut buf)
            .map_err(|e| ArtikError::from_io(&channel.path, e))?;
        if n < SAMPLE_SIZE {
            return Err(ArtikError::ShortRead {
                path: channel.path.clone(),
            });
        }

        let samples = decode_samples(&buf[..n]);
        trace!(pin = channel.pin, samples = samples.len(), "Read ADC samples");
        samples
            .iter()
            .find(|s| u32::from(s.channel) == channel.pin)
            .map(|s| s.data)
            .ok_or_else(|| ArtikError::NoSample {
                path: channel.path.clone(),
                channel: channel.pin,
            })
    }

    fn close(&self, channel: &mut TizenRtChannel) -> Result<()> {
        debug!(pin = channel.pin, path = %channel.path.display(), "Closing RTOS ADC device");
        Ok(())
    }
}
