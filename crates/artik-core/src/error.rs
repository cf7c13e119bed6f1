//! Error types and status codes for ARTIK modules.
//!
//! Every module operation returns [`Result`]. Callers that need the flat
//! integer taxonomy of the C API (for logging, exit codes, or FFI) call
//! [`ArtikError::status`], which maps each error variant to exactly one
//! [`Status`].
//!
//! Several read failures (I/O error, short read, unparsable value, missing
//! sample) deliberately share the [`Status::Busy`] code. The variants stay
//! distinct so the cause is visible in messages and logs.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::registry::Handle;

/// Result type alias for ARTIK operations.
pub type Result<T> = std::result::Result<T, ArtikError>;

/// Discrete status codes returned by every module operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum Status {
    /// Operation succeeded.
    Ok = 0,
    /// The module or SDK was used before initialization.
    NotInitialized = -1,
    /// Allocation failed.
    NoMem = -2,
    /// The operation or module is not available on this platform.
    NotSupported = -3,
    /// Initialization of the backend failed.
    InitFailed = -4,
    /// The resource is in use, or the device did not deliver a value.
    Busy = -5,
    /// The OS refused access to the device node.
    AccessDenied = -6,
    /// An argument, handle, or configuration value is invalid.
    BadArgs = -7,
}

impl Status {
    /// Raw integer code.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Convert from a raw integer code.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Ok),
            -1 => Some(Self::NotInitialized),
            -2 => Some(Self::NoMem),
            -3 => Some(Self::NotSupported),
            -4 => Some(Self::InitFailed),
            -5 => Some(Self::Busy),
            -6 => Some(Self::AccessDenied),
            -7 => Some(Self::BadArgs),
            _ => None,
        }
    }

    /// Human-readable message for the code.
    pub fn message(self) -> &'static str {
        match self {
            Self::Ok => "Success",
            Self::NotInitialized => "Not initialized",
            Self::NoMem => "Not enough memory",
            Self::NotSupported => "Not supported",
            Self::InitFailed => "Initialization failed",
            Self::Busy => "Resource busy",
            Self::AccessDenied => "Access denied",
            Self::BadArgs => "Bad arguments",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message(), self.code())
    }
}

/// Errors that can occur while requesting, using, or releasing a resource.
#[derive(Error, Debug)]
pub enum ArtikError {
    /// An argument failed validation.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// The handle is not tracked by this module (never issued, or released).
    #[error("Unknown handle {handle}")]
    UnknownHandle { handle: Handle },

    /// The key (pin, line, channel) already has a live handle.
    #[error("{module} {key} is already requested")]
    AlreadyRequested { module: &'static str, key: u32 },

    /// The device node does not exist.
    #[error("Device '{}' not found", path.display())]
    DeviceNotFound { path: PathBuf },

    /// The OS refused to open the device node.
    #[error("Permission denied for device '{}'", path.display())]
    PermissionDenied { path: PathBuf },

    /// Any other OS error on a device node.
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The device returned no data.
    #[error("Short read from '{}'", path.display())]
    ShortRead { path: PathBuf },

    /// The device returned data that is not a number.
    #[error("Cannot parse '{raw}' read from '{}'", path.display())]
    Parse { path: PathBuf, raw: String },

    /// The device delivered samples, none of them for the requested channel.
    #[error("No sample for channel {channel} from '{}'", path.display())]
    NoSample { path: PathBuf, channel: u32 },

    /// Operation or module not supported.
    #[error("Operation not supported: {message}")]
    NotSupported { message: String },

    /// The named module does not exist or is unavailable on this platform.
    #[error("Module '{name}' is not available")]
    ModuleNotAvailable { name: String },

    /// The module is not currently requested.
    #[error("Module '{name}' was not requested")]
    ModuleNotRequested { name: String },

    /// A configuration value is invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ArtikError {
    /// Translate an `io::Error` raised on `path`.
    pub fn from_io(path: impl AsRef<Path>, source: io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        match source.kind() {
            io::ErrorKind::NotFound => Self::DeviceNotFound { path },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Io { path, source },
        }
    }

    /// Shorthand for [`ArtikError::InvalidArgument`].
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// The status code this error reports.
    pub fn status(&self) -> Status {
        match self {
            Self::InvalidArgument { .. }
            | Self::UnknownHandle { .. }
            | Self::DeviceNotFound { .. }
            | Self::ModuleNotRequested { .. }
            | Self::Configuration(_) => Status::BadArgs,
            Self::AlreadyRequested { .. }
            | Self::Io { .. }
            | Self::ShortRead { .. }
            | Self::Parse { .. }
            | Self::NoSample { .. } => Status::Busy,
            Self::PermissionDenied { .. } => Status::AccessDenied,
            Self::NotSupported { .. } | Self::ModuleNotAvailable { .. } => Status::NotSupported,
        }
    }

    /// Check if the resource was busy.
    pub fn is_busy(&self) -> bool {
        self.status() == Status::Busy
    }

    /// Check if this error reports bad arguments.
    pub fn is_bad_args(&self) -> bool {
        self.status() == Status::BadArgs
    }
}

impl From<ArtikError> for Status {
    fn from(err: ArtikError) -> Self {
        err.status()
    }
}

impl From<&ArtikError> for Status {
    fn from(err: &ArtikError) -> Self {
        err.status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip_codes() {
        for status in [
            Status::Ok,
            Status::NotInitialized,
            Status::NoMem,
            Status::NotSupported,
            Status::InitFailed,
            Status::Busy,
            Status::AccessDenied,
            Status::BadArgs,
        ] {
            assert_eq!(Status::from_code(status.code()), Some(status));
        }
        assert_eq!(Status::from_code(42), None);
    }

    #[test]
    fn test_read_failures_share_busy() {
        let path = PathBuf::from("/sys/bus/iio/devices/iio:device0/in_voltage0_raw");
        let errors = [
            ArtikError::ShortRead { path: path.clone() },
            ArtikError::Parse {
                path: path.clone(),
                raw: "abc".into(),
            },
            ArtikError::from_io(&path, io::Error::new(io::ErrorKind::Other, "boom")),
        ];
        for err in &errors {
            assert_eq!(err.status(), Status::Busy, "{err}");
        }
        assert!(errors[1].to_string().contains("abc"));
    }

    #[test]
    fn test_io_kind_mapping() {
        let nf = ArtikError::from_io("/dev/adc9", io::ErrorKind::NotFound.into());
        assert!(matches!(nf, ArtikError::DeviceNotFound { .. }));
        assert_eq!(nf.status(), Status::BadArgs);

        let denied = ArtikError::from_io("/dev/adc0", io::ErrorKind::PermissionDenied.into());
        assert_eq!(denied.status(), Status::AccessDenied);
        assert!(denied.to_string().contains("/dev/adc0"));
    }

    #[test]
    fn test_status_display() {
        assert_eq!(Status::BadArgs.to_string(), "Bad arguments (-7)");
        assert_eq!(Status::Ok.message(), "Success");
    }
}
