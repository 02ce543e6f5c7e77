//! Configuration loading and saving
//!
//! Settings structs (simulation capacities, rigidbody descriptions) derive
//! serde and implement [`Config`] to gain file round-tripping. The format
//! is chosen by file extension: TOML for hand-edited settings, RON for
//! scene-exported data.

use std::path::Path;

use log::warn;
pub use serde::{Deserialize, Serialize};

/// File round-tripping for settings types
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load from a `.toml` or `.ron` file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

        match extension(path) {
            Some("toml") => {
                toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            Some("ron") => ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
            _ => Err(ConfigError::UnsupportedFormat(path.to_string())),
        }
    }

    /// Load from a file, falling back to defaults if it is missing or
    /// malformed
    ///
    /// The fallback is logged; a broken settings file should not keep the
    /// engine from starting.
    fn load_or_default(path: &str) -> Self {
        match Self::load_from_file(path) {
            Ok(config) => config,
            Err(e) => {
                warn!("using default config, could not load {path}: {e}");
                Self::default()
            }
        }
    }

    /// Save to a `.toml` or `.ron` file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = match extension(path) {
            Some("toml") => {
                toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
            }
            Some("ron") => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?,
            _ => return Err(ConfigError::UnsupportedFormat(path.to_string())),
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

fn extension(path: &str) -> Option<&str> {
    Path::new(path).extension().and_then(|e| e.to_str())
}

/// Errors from configuration loading and saving
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The file could not be read or written
    #[error("config IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file contents did not parse as the expected type
    #[error("config parse error: {0}")]
    Parse(String),

    /// The value could not be serialized
    #[error("config serialize error: {0}")]
    Serialize(String),

    /// The file extension maps to no known format
    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Probe {
        name: String,
        steps: u32,
    }

    impl Default for Probe {
        fn default() -> Self {
            Self {
                name: "default".to_string(),
                steps: 60,
            }
        }
    }

    impl Config for Probe {}

    #[test]
    fn test_unknown_extension_is_rejected() {
        let probe = Probe::default();
        assert!(matches!(
            probe.save_to_file("/tmp/probe.yaml"),
            Err(ConfigError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            Probe::load_from_file("/tmp/probe.yaml"),
            Err(ConfigError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_missing_file_falls_back_to_default() {
        let probe = Probe::load_or_default("/tmp/does_not_exist_trestle.toml");
        assert_eq!(probe, Probe::default());
    }

    #[test]
    fn test_ron_roundtrip() {
        let dir = std::env::temp_dir().join("trestle_config_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("probe.ron");
        let path = path.to_str().unwrap();

        let probe = Probe {
            name: "pit".to_string(),
            steps: 144,
        };
        probe.save_to_file(path).unwrap();
        assert_eq!(Probe::load_from_file(path).unwrap(), probe);
    }
}
