//! High-level [`Packer`] API: compress a file into a container and restore it.
//!
//! ```no_run
//! use packerx::{Packer, PackerConfig};
//!
//! let packer = Packer::new(PackerConfig::default());
//! let packed = packer.compress_file("reports/report.txt")?;
//! println!("stored at {}", packed.output_path.display());
//!
//! // Any path with the stem `report` finds the same container.
//! let restored = packer.decompress_file("report.txt")?;
//! assert_eq!(restored.output_path.file_name().unwrap(), "report_restored.txt");
//! # Ok::<(), packerx::PackError>(())
//! ```
//!
//! Both pipelines read the whole input into memory, and the output file is
//! only created once every step before it has succeeded.  Writes go through a
//! temporary file in the destination directory and are renamed into place,
//! so a failed write never leaves a truncated container or restored file.

use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::config::PackerConfig;
use crate::container::{Container, FORMAT_VERSION};
use crate::engine::{self, DecompressPolicy, EngineError};
use crate::error::{PackError, Result};
use crate::layout::{ContainerResolver, Layout};
use crate::namer;

// ── Reports ───────────────────────────────────────────────────────────────────

/// Outcome of [`Packer::compress_file`].
#[derive(Debug, Clone, Serialize)]
pub struct CompressReport {
    pub output_path:    PathBuf,
    pub hashed_name:    String,
    pub extension:      String,
    pub original_size:  u64,
    pub container_size: u64,
}

/// Outcome of [`Packer::decompress_file`].
#[derive(Debug, Clone, Serialize)]
pub struct DecompressReport {
    pub output_path:   PathBuf,
    pub extension:     String,
    pub restored_size: u64,
    pub checksum:      u32,
}

/// Container metadata returned by [`Packer::inspect`].
#[derive(Debug, Clone, Serialize)]
pub struct ContainerInfo {
    pub hashed_name:    String,
    pub path:           PathBuf,
    pub format_version: u32,
    pub extension:      String,
    pub payload_len:    u64,
    pub container_len:  u64,
    pub checksum:       u32,
}

// ── Packer ────────────────────────────────────────────────────────────────────

pub struct Packer {
    layout:   Layout,
    resolver: Box<dyn ContainerResolver>,
    policy:   DecompressPolicy,
}

impl Packer {
    /// Containers are resolved by the default hashed-name layout.
    pub fn new(config: PackerConfig) -> Self {
        let layout = config.layout();
        Self {
            resolver: Box::new(layout.clone()),
            layout,
            policy: config.decompress,
        }
    }

    /// Use `resolver` to locate containers instead of the hashed-name layout.
    /// Restored files still go to `config.decompressed_dir`.
    pub fn with_resolver(config: PackerConfig, resolver: Box<dyn ContainerResolver>) -> Self {
        Self {
            layout: config.layout(),
            resolver,
            policy: config.decompress,
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn policy(&self) -> &DecompressPolicy {
        &self.policy
    }

    // ── Compress ──────────────────────────────────────────────────────────────

    pub fn compress_file<P: AsRef<Path>>(&self, source: P) -> Result<CompressReport> {
        let source = source.as_ref();
        let data = read_file(source)?;
        if data.is_empty() {
            return Err(PackError::FileEmpty { path: source.to_owned() });
        }

        let compressed = engine::compress(&data)?;
        let extension  = namer::extension_of(source);
        let stem       = namer::stem_of(source);
        let hashed     = namer::name(&stem);

        let container = Container::new(&extension, compressed.payload, compressed.checksum);
        let bytes = container.encode();

        let output_path = self.resolver.resolve_container_path(&stem);
        write_atomic(&output_path, &bytes)?;

        log::info!(
            "compressed {} ({} bytes) -> {} ({} bytes)",
            source.display(), data.len(), output_path.display(), bytes.len()
        );
        Ok(CompressReport {
            output_path,
            hashed_name:    hashed.to_string(),
            extension:      container.extension,
            original_size:  data.len() as u64,
            container_size: bytes.len() as u64,
        })
    }

    // ── Decompress ────────────────────────────────────────────────────────────

    /// Restore the file that was packed under `original_name`'s stem.
    ///
    /// Only the stem of `original_name` matters; the extension written back is
    /// the one stored in the container.
    pub fn decompress_file<P: AsRef<Path>>(&self, original_name: P) -> Result<DecompressReport> {
        let stem = namer::stem_of(original_name);
        let (container_path, container) = self.load(&stem)?;

        let restored = engine::decompress(&container.payload, None, &self.policy)
            .map_err(|e| classify_inflate_error(e, &container.payload))?;

        let actual = engine::checksum(&restored);
        log::debug!("crc32 stored {:08x}, computed {:08x}", container.checksum, actual);
        if actual != container.checksum {
            log::warn!("integrity check failed for {}", container_path.display());
            return Err(PackError::IntegrityMismatch {
                expected: container.checksum,
                actual,
            });
        }

        let output_path = self.layout.restored_path(&stem, &container.extension);
        write_atomic(&output_path, &restored)?;

        log::info!("restored {} -> {}", container_path.display(), output_path.display());
        Ok(DecompressReport {
            output_path,
            extension:     container.extension,
            restored_size: restored.len() as u64,
            checksum:      actual,
        })
    }

    // ── Inspect ───────────────────────────────────────────────────────────────

    /// Decode the container for `original_name` without decompressing it.
    pub fn inspect<P: AsRef<Path>>(&self, original_name: P) -> Result<ContainerInfo> {
        let stem = namer::stem_of(original_name);
        let (path, container) = self.load(&stem)?;
        Ok(ContainerInfo {
            hashed_name:    namer::name(&stem).to_string(),
            path,
            format_version: FORMAT_VERSION,
            payload_len:    container.payload.len() as u64,
            container_len:  container.encoded_len() as u64,
            checksum:       container.checksum,
            extension:      container.extension,
        })
    }

    fn load(&self, stem: &str) -> Result<(PathBuf, Container)> {
        let path = self.resolver.resolve_container_path(stem);
        let bytes = read_file(&path)?;
        let container = Container::decode(&bytes)?;
        log::debug!(
            "decoded {}: extension {:?}, payload {} bytes",
            path.display(), container.extension, container.payload.len()
        );
        Ok((path, container))
    }
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => PackError::FileNotFound { path: path.to_owned() },
        _ => PackError::Read { path: path.to_owned(), source },
    })
}

/// A damaged payload is an integrity failure even when it surfaces as a
/// buffer overrun: a flipped Huffman code can expand far past the policy.
/// Only a stream that inflates cleanly to the end is reported as too large.
fn classify_inflate_error(err: EngineError, payload: &[u8]) -> PackError {
    match err {
        EngineError::DataCorrupt => PackError::PayloadCorrupt { source: EngineError::DataCorrupt },
        EngineError::BufferTooSmall => match engine::verify_stream(payload) {
            Ok(len) => {
                log::debug!("payload is intact but inflates to {} bytes", len);
                PackError::Transform(EngineError::BufferTooSmall)
            }
            Err(source) => PackError::PayloadCorrupt { source },
        },
        other => PackError::Transform(other),
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let write_error = |source: io::Error| PackError::WriteError { path: path.to_owned(), source };
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(write_error)?;
    tmp.write_all(bytes).map_err(write_error)?;
    tmp.persist(path).map_err(|e| write_error(e.error))?;
    Ok(())
}
