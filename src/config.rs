//! Configuration management for jpeg-structure

use crate::reader::{DriveOptions, DEFAULT_CHUNK_SIZE};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Largest accepted read size
pub const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;
/// Smallest accepted read size
pub const MIN_CHUNK_SIZE: usize = 16;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Complete configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub reader: ReaderConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// How input files are read
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Bytes requested per read
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Tolerate bytes after EOI (logged as a warning)
    #[serde(default = "default_true")]
    pub allow_trailing_data: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            allow_trailing_data: true,
        }
    }
}

/// Listing output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// How results are reported
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,

    /// Validate the segment list after listing it
    #[serde(default = "default_true")]
    pub validate: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            validate: true,
        }
    }
}

// Default value functions
fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}
fn default_true() -> bool {
    true
}

impl Config {
    /// Loads configuration from TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Loads configuration from TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates configuration
    fn validate(&self) -> Result<(), ConfigError> {
        let chunk_size = self.reader.chunk_size;
        if !(MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(&chunk_size) {
            return Err(ConfigError::Invalid(format!(
                "chunk_size must be between {} and {}, got {}",
                MIN_CHUNK_SIZE, MAX_CHUNK_SIZE, chunk_size
            )));
        }

        Ok(())
    }

    /// Saves configuration to TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn drive_options(&self) -> DriveOptions {
        DriveOptions {
            chunk_size: self.reader.chunk_size,
            allow_trailing_data: self.reader.allow_trailing_data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.reader.chunk_size, DEFAULT_CHUNK_SIZE);
        assert!(config.reader.allow_trailing_data);
        assert_eq!(config.output.format, OutputFormat::Text);
        assert!(config.output.validate);
    }

    #[test]
    fn test_config_from_toml() {
        let toml = r#"
[reader]
chunk_size = 1024
allow_trailing_data = false

[output]
format = "json"
validate = false
        "#;

        let config = Config::from_str(toml).unwrap();

        assert_eq!(config.reader.chunk_size, 1024);
        assert!(!config.reader.allow_trailing_data);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(!config.output.validate);

        let options = config.drive_options();
        assert_eq!(options.chunk_size, 1024);
        assert!(!options.allow_trailing_data);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config.reader.chunk_size, DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn test_invalid_chunk_size() {
        let toml = r#"
[reader]
chunk_size = 4
        "#;

        assert!(matches!(
            Config::from_str(toml),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_unknown_format() {
        let toml = r#"
[output]
format = "xml"
        "#;

        assert!(matches!(Config::from_str(toml), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_roundtrip() {
        let mut config = Config::default();
        config.output.format = OutputFormat::Json;
        let toml_str = toml::to_string(&config).unwrap();
        let parsed = Config::from_str(&toml_str).unwrap();

        assert_eq!(parsed.output.format, OutputFormat::Json);
        assert_eq!(parsed.reader.chunk_size, config.reader.chunk_size);
    }
}
