use std::path::PathBuf;

use crate::namer::{self, HashedName};

/// Maps a file stem to the container that holds it.
///
/// Containers carry no manifest: the lookup key is the stem itself, so a typo
/// in the requested name simply resolves to a container that does not exist.
/// Implement this to put a real index in front of the store.
pub trait ContainerResolver: Send + Sync {
    fn resolve_container_path(&self, stem: &str) -> PathBuf;
}

/// Directory convention shared by both pipelines.
///
/// ```text
/// <compressed_dir>/<sha256(SALT + stem)>.bin
/// <decompressed_dir>/<stem>_restored.<ext>
/// ```
///
/// Neither directory is created here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub compressed_dir:   PathBuf,
    pub decompressed_dir: PathBuf,
}

impl Layout {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(compressed_dir: P, decompressed_dir: Q) -> Self {
        Self {
            compressed_dir:   compressed_dir.into(),
            decompressed_dir: decompressed_dir.into(),
        }
    }

    pub fn container_path(&self, name: &HashedName) -> PathBuf {
        self.compressed_dir.join(name.file_name())
    }

    /// Where a restored file lands.  An empty extension yields no trailing dot.
    pub fn restored_path(&self, stem: &str, extension: &str) -> PathBuf {
        let file_name = if extension.is_empty() {
            format!("{stem}_restored")
        } else {
            format!("{stem}_restored.{extension}")
        };
        self.decompressed_dir.join(file_name)
    }
}

impl ContainerResolver for Layout {
    fn resolve_container_path(&self, stem: &str) -> PathBuf {
        self.container_path(&namer::name(stem))
    }
}
