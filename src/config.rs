//! Runtime configuration.
//!
//! Every field has a default, so a JSON file only needs the keys it wants to
//! change:
//!
//! ```json
//! { "compressed_dir": "/var/packerx/store", "decompress": { "max_retries": 4 } }
//! ```

use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::engine::DecompressPolicy;
use crate::layout::Layout;

pub const DEFAULT_COMPRESSED_DIR:   &str = "compressed_output";
pub const DEFAULT_DECOMPRESSED_DIR: &str = "decompressed_output";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("Invalid config {path}: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackerConfig {
    pub compressed_dir:   PathBuf,
    pub decompressed_dir: PathBuf,
    pub decompress:       DecompressPolicy,
}

impl Default for PackerConfig {
    fn default() -> Self {
        Self {
            compressed_dir:   PathBuf::from(DEFAULT_COMPRESSED_DIR),
            decompressed_dir: PathBuf::from(DEFAULT_DECOMPRESSED_DIR),
            decompress:       DecompressPolicy::default(),
        }
    }
}

impl PackerConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::from_json_slice(&bytes).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn layout(&self) -> Layout {
        Layout::new(&self.compressed_dir, &self.decompressed_dir)
    }
}
