//! Board detection.
//!
//! Linux boards publish their model in the device tree
//! (`/proc/device-tree/model`, NUL-terminated). The ARTIK 05x family runs an
//! RTOS without procfs, so it is only ever selected by configuration.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Known boards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// ARTIK 520
    Artik520,
    /// ARTIK 530
    Artik530,
    /// ARTIK 710
    Artik710,
    /// ARTIK 1020
    Artik1020,
    /// ARTIK 05x (RTOS)
    Artik05x,
    /// Anything else running Linux
    Generic,
}

impl Platform {
    /// Marketing name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Artik520 => "ARTIK 520",
            Self::Artik530 => "ARTIK 530",
            Self::Artik710 => "ARTIK 710",
            Self::Artik1020 => "ARTIK 1020",
            Self::Artik05x => "ARTIK 05x",
            Self::Generic => "Generic",
        }
    }

    /// Whether the board runs the RTOS rather than Linux.
    pub fn is_rtos(self) -> bool {
        self == Self::Artik05x
    }

    /// Match a model string such as `"Samsung ARTIK530 raptor board"` or
    /// `"ARTIK 530"`. Unrecognised models are [`Platform::Generic`].
    pub fn from_model(model: &str) -> Self {
        let model: String = model
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '\0')
            .flat_map(char::to_lowercase)
            .collect();

        // longest names first: "artik530" also contains "artik5"
        if model.contains("artik530") {
            Self::Artik530
        } else if model.contains("artik710") {
            Self::Artik710
        } else if model.contains("artik1020") || model.contains("artik10") {
            Self::Artik1020
        } else if model.contains("artik05") {
            Self::Artik05x
        } else if model.contains("artik520") || model.contains("artik5") {
            Self::Artik520
        } else {
            Self::Generic
        }
    }

    /// Read `<proc_root>/device-tree/model`. Falls back to
    /// [`Platform::Generic`] when the file cannot be read.
    pub fn detect(proc_root: &Path) -> Self {
        let path = proc_root.join("device-tree/model");
        match fs::read_to_string(&path) {
            Ok(model) => {
                let platform = Self::from_model(&model);
                debug!(model = model.trim_end_matches('\0'), platform = platform.name(), "Detected platform");
                platform
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "No device-tree model, assuming generic platform");
                Self::Generic
            }
        }
    }

    /// Detection with an optional configured override.
    pub fn resolve(model: Option<&str>, proc_root: &Path) -> Self {
        match model {
            Some(model) => Self::from_model(model),
            None => Self::detect(proc_root),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_model() {
        assert_eq!(Platform::from_model("Samsung ARTIK5 board"), Platform::Artik520);
        assert_eq!(Platform::from_model("Samsung ARTIK10 board"), Platform::Artik1020);
        assert_eq!(Platform::from_model("Samsung artik710 raptor board"), Platform::Artik710);
        assert_eq!(Platform::from_model("Samsung ARTIK530 raptor board\0"), Platform::Artik530);
        assert_eq!(Platform::from_model("ARTIK 053"), Platform::Artik05x);
        assert_eq!(Platform::from_model("ARTIK 530"), Platform::Artik530);
        assert_eq!(Platform::from_model("Raspberry Pi 3 Model B"), Platform::Generic);
    }

    #[test]
    fn test_detect_from_device_tree() {
        let proc_root = tempfile::tempdir().unwrap();
        assert_eq!(Platform::detect(proc_root.path()), Platform::Generic);

        let dt = proc_root.path().join("device-tree");
        fs::create_dir_all(&dt).unwrap();
        fs::write(dt.join("model"), b"Samsung artik710 raptor board\0").unwrap();
        assert_eq!(Platform::detect(proc_root.path()), Platform::Artik710);

        // override wins over detection
        assert_eq!(
            Platform::resolve(Some("artik05x"), proc_root.path()),
            Platform::Artik05x
        );
    }

    #[test]
    fn test_only_05x_is_rtos() {
        assert!(Platform::Artik05x.is_rtos());
        assert!(!Platform::Artik530.is_rtos());
        assert_eq!(Platform::Artik1020.to_string(), "ARTIK 1020");
    }
}
