use std::path::Path;

use serde::{Deserialize, Serialize};

/// Limits and buffer sizes used by the accessor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Maximum encoded length of any string argument, counting a
    /// terminating null.
    pub max_arg_len: usize,
    /// Initial capacity of the enumeration name buffer, in UTF-16 code units.
    pub name_buffer_units: usize,
    /// Initial capacity of the value read buffer, in bytes.
    pub value_buffer_bytes: usize,
    /// Retry once with the size the store asks for when a buffer is too
    /// small. When `false`, long names end enumeration and long values read
    /// as empty.
    pub grow_buffers: bool,
    /// Upper bound on a grown name buffer, in code units.
    pub max_name_units: usize,
    /// Upper bound on a grown value buffer, in bytes.
    pub max_value_bytes: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_arg_len: 16383,
            name_buffer_units: 512,
            value_buffer_bytes: 512,
            grow_buffers: true,
            max_name_units: 16384,
            max_value_bytes: 1024 * 1024,
        }
    }
}

/// Errors loading a [`RegistryConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl RegistryConfig {
    /// Fixed buffers only: long names and values degrade instead of growing.
    pub fn fixed_buffers() -> Self {
        Self {
            grow_buffers: false,
            ..Default::default()
        }
    }

    /// Parse a TOML document. Missing keys take their default.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Read and parse a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
