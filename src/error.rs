use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::container::FormatError;
use crate::engine::EngineError;

/// Failure class of a [`PackError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or empty source, unreadable input.
    Input,
    /// Compression engine failure.
    Transform,
    /// Container too short or with inconsistent metadata.
    Format,
    /// Restored bytes do not match what was packed.
    Integrity,
    /// Output could not be written.
    Output,
}

#[derive(Error, Debug)]
pub enum PackError {
    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },
    #[error("File is empty: {}", path.display())]
    FileEmpty { path: PathBuf },
    #[error("Cannot read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("Compression engine error: {0}")]
    Transform(#[from] EngineError),
    #[error("Container format error: {0}")]
    Format(#[from] FormatError),
    /// The stored payload was rejected by the decompressor.
    #[error("Container payload is corrupted: {source}")]
    PayloadCorrupt { source: EngineError },
    #[error("CRC32 check failed: stored {expected:08x}, computed {actual:08x}")]
    IntegrityMismatch { expected: u32, actual: u32 },
    #[error("Cannot write {}: {source}", path.display())]
    WriteError { path: PathBuf, source: io::Error },
}

impl PackError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PackError::FileNotFound { .. }
            | PackError::FileEmpty { .. }
            | PackError::Read { .. }
            | PackError::Transform(EngineError::EmptyInput) => ErrorKind::Input,
            PackError::Transform(_) => ErrorKind::Transform,
            PackError::Format(_) => ErrorKind::Format,
            PackError::PayloadCorrupt { .. } | PackError::IntegrityMismatch { .. } => ErrorKind::Integrity,
            PackError::WriteError { .. } => ErrorKind::Output,
        }
    }
}

pub type Result<T> = std::result::Result<T, PackError>;
