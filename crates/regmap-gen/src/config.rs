//! Generator configuration.
//!
//! Settings come from an optional TOML file; every key has a default so an
//! empty file, or no file, is valid. Command-line flags are applied on top.
//!
//! ```toml
//! prefix = "WBEC_REG_"
//! mask_style = "corrected"   # or "legacy"
//! doc_rows = true
//! tab_stop = 60
//! start_address = 0
//! total_regs = 256
//! ```

use std::path::Path;

use regmap_core::MaskStyle;
use serde::Deserialize;
use thiserror::Error;

/// Prefix the original firmware headers use for every constant.
pub const DEFAULT_PREFIX: &str = "WBEC_REG_";
/// Column that constant values are aligned to.
pub const DEFAULT_TAB_STOP: usize = 60;

/// Settings for one generator run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Prepended to every constant name in the header.
    pub prefix: String,
    /// Bitfield mask encoding.
    pub mask_style: MaskStyle,
    /// Emit per-register rows in the documentation table.
    pub doc_rows: bool,
    /// Alignment column for constant values.
    pub tab_stop: usize,
    /// Initial allocator cursor.
    pub start_address: u32,
    /// Size of the register address space, if bounded.
    pub total_regs: Option<u32>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            mask_style: MaskStyle::default(),
            doc_rows: true,
            tab_stop: DEFAULT_TAB_STOP,
            start_address: 0,
            total_regs: None,
        }
    }
}

/// Failure to load a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config '{path}': {source}")]
    Io {
        /// Config file path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The file is not valid configuration TOML.
    #[error("invalid config '{path}': {source}")]
    Toml {
        /// Config file path.
        path: String,
        /// Underlying decode error.
        source: toml::de::Error,
    },
}

impl GeneratorConfig {
    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns the decode error for malformed TOML, unknown keys, or values
    /// of the wrong type.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` when the file cannot be read and
    /// `ConfigError::Toml` when it cannot be decoded.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;
        Self::from_toml_str(&text).map_err(|source| ConfigError::Toml {
            path: display,
            source,
        })
    }
}
