//! Deterministic container naming.
//!
//! A container is addressed by the salted SHA-256 of the source file's stem.
//! Both pipelines recompute the name from a file name; nothing is stored, so
//! [`stem_of`] and [`name`] must stay in lock-step between compress and
//! decompress.

use std::fmt;
use std::path::Path;

use sha2::{Digest, Sha256};

/// Fixed salt prepended to every stem before hashing.
pub const SALT: &str = "$packerx_";

/// Extension recorded when the source path has none.
pub const DEFAULT_EXTENSION: &str = "bin";

/// File extension of every container on disk.
pub const CONTAINER_EXTENSION: &str = "bin";

/// Lowercase hex SHA-256 of `SALT + stem` (64 characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HashedName(String);

impl HashedName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `<hex>.bin`
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.0, CONTAINER_EXTENSION)
    }
}

impl fmt::Display for HashedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the container name for `stem`. Empty stems are valid.
pub fn name(stem: &str) -> HashedName {
    let mut hasher = Sha256::new();
    hasher.update(SALT.as_bytes());
    hasher.update(stem.as_bytes());
    HashedName(hex::encode(hasher.finalize()))
}

/// File name without directory and without its final extension.
///
/// `reports/q3.tar.gz` → `q3.tar`. Returns an empty string when the path has
/// no file name component.
pub fn stem_of<P: AsRef<Path>>(path: P) -> String {
    path.as_ref()
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Final extension of `path` without the leading dot, or
/// [`DEFAULT_EXTENSION`] when there is none.
pub fn extension_of<P: AsRef<Path>>(path: P) -> String {
    match path.as_ref().extension() {
        Some(ext) if !ext.is_empty() => ext.to_string_lossy().into_owned(),
        _ => DEFAULT_EXTENSION.to_owned(),
    }
}
