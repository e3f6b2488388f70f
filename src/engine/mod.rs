//! Compression engine: zlib with bounded output buffers and CRC-32.
//!
//! # Compression
//! The output buffer is sized once to the zlib worst case for the input
//! length ([`compress_bound`]).  The transform never grows it; running out of
//! room is reported as [`EngineError::BufferTooSmall`] and is not retried.
//!
//! # Decompression
//! The container does not record the original length, so the output buffer
//! is a guess: `size_hint` when the caller has one, otherwise a multiple of
//! the compressed length.  When the transform fills the buffer without
//! reaching the end of the stream, the buffer grows by the policy's factor
//! and the transform is rerun from scratch, at most `max_retries` times.
//!
//! When growth runs out, [`verify_stream`] tells a stream that is merely
//! larger than the policy allows apart from one that is damaged: it inflates
//! through a fixed scratch chunk, discarding the output, so the zlib adler-32
//! trailer gets checked without ever holding the whole result.
//!
//! # Checksum
//! CRC-32 (IEEE 802.3, identical to zlib's `crc32`) over the *uncompressed*
//! bytes.

use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Nothing to compress.  A caller mistake, not a transform failure.
    #[error("Input is empty")]
    EmptyInput,
    #[error("Not enough memory for the output buffer")]
    OutOfMemory,
    #[error("Output buffer too small")]
    BufferTooSmall,
    #[error("Compressed data is corrupt or truncated")]
    DataCorrupt,
    #[error("Transform failed: {0}")]
    Unknown(String),
}

// ── Decompression policy ─────────────────────────────────────────────────────

/// Buffer sizing for [`decompress`].
///
/// The default reproduces the classic behaviour: start at 4× the compressed
/// length and double once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecompressPolicy {
    /// Initial capacity as a multiple of the compressed length.
    pub initial_multiplier: usize,
    /// Capacity multiplier applied after each `BufferTooSmall`.
    pub growth_factor: usize,
    /// Attempts after the first one.  `0` disables growth.
    pub max_retries: u32,
}

impl Default for DecompressPolicy {
    fn default() -> Self {
        Self {
            initial_multiplier: 4,
            growth_factor:      2,
            max_retries:        1,
        }
    }
}

impl DecompressPolicy {
    fn initial_capacity(&self, compressed_len: usize, size_hint: Option<usize>) -> usize {
        size_hint
            .unwrap_or_else(|| compressed_len.saturating_mul(self.initial_multiplier))
            .max(1)
    }
}

// ── Output of `compress` ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compressed {
    pub payload:  Vec<u8>,
    /// CRC-32 of the input, not of `payload`.
    pub checksum: u32,
}

// ── Primitives ───────────────────────────────────────────────────────────────

/// CRC-32 of `data`.
pub fn checksum(data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Largest zlib stream `len` input bytes can produce at any level.
pub fn compress_bound(len: usize) -> usize {
    len + (len >> 12) + (len >> 14) + (len >> 25) + 13
}

/// Allocate a zero-filled buffer, reporting allocation failure instead of
/// aborting the process.
fn alloc_buffer(len: usize) -> Result<Vec<u8>, EngineError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|_| EngineError::OutOfMemory)?;
    buf.resize(len, 0);
    Ok(buf)
}

// ── Compress ─────────────────────────────────────────────────────────────────

/// Compress `data` into a single zlib stream and checksum it.
pub fn compress(data: &[u8]) -> Result<Compressed, EngineError> {
    if data.is_empty() {
        return Err(EngineError::EmptyInput);
    }
    let checksum = checksum(data);

    let mut out = alloc_buffer(compress_bound(data.len()))?;
    let mut z = Compress::new(Compression::default(), true);
    loop {
        let in_pos  = z.total_in() as usize;
        let out_pos = z.total_out() as usize;
        let status = z
            .compress(&data[in_pos..], &mut out[out_pos..], FlushCompress::Finish)
            .map_err(|e| EngineError::Unknown(e.to_string()))?;
        match status {
            Status::StreamEnd => break,
            _ if z.total_out() as usize >= out.len() => return Err(EngineError::BufferTooSmall),
            _ if z.total_in() as usize == in_pos && z.total_out() as usize == out_pos => {
                return Err(EngineError::Unknown("deflate made no progress".into()));
            }
            _ => continue,
        }
    }
    out.truncate(z.total_out() as usize);

    log::debug!("compressed {} -> {} bytes (crc32 {:08x})", data.len(), out.len(), checksum);
    Ok(Compressed { payload: out, checksum })
}

// ── Decompress ───────────────────────────────────────────────────────────────

/// Inflate `payload` into `out`.  Returns the number of bytes produced.
fn inflate_into(payload: &[u8], out: &mut [u8]) -> Result<usize, EngineError> {
    let mut z = Decompress::new(true);
    loop {
        let in_pos  = z.total_in() as usize;
        let out_pos = z.total_out() as usize;
        let status = z
            .decompress(&payload[in_pos..], &mut out[out_pos..], FlushDecompress::Finish)
            .map_err(|_| EngineError::DataCorrupt)?;
        match status {
            Status::StreamEnd => return Ok(z.total_out() as usize),
            _ if z.total_out() as usize >= out.len() => return Err(EngineError::BufferTooSmall),
            // Input exhausted (or stuck) before the end-of-stream marker.
            _ if z.total_in() as usize >= payload.len()
                || (z.total_in() as usize == in_pos && z.total_out() as usize == out_pos) =>
            {
                return Err(EngineError::DataCorrupt);
            }
            _ => continue,
        }
    }
}

/// Inflate a zlib `payload`, growing the output buffer per `policy`.
///
/// `size_hint`, when known, replaces the initial capacity estimate.
pub fn decompress(
    payload:   &[u8],
    size_hint: Option<usize>,
    policy:    &DecompressPolicy,
) -> Result<Vec<u8>, EngineError> {
    let mut capacity = policy.initial_capacity(payload.len(), size_hint);
    let mut attempt  = 0u32;
    loop {
        let mut out = alloc_buffer(capacity)?;
        match inflate_into(payload, &mut out) {
            Ok(produced) => {
                out.truncate(produced);
                log::debug!("decompressed {} -> {} bytes (attempt {})", payload.len(), produced, attempt + 1);
                return Ok(out);
            }
            Err(EngineError::BufferTooSmall) if attempt < policy.max_retries => {
                attempt += 1;
                capacity = capacity
                    .checked_mul(policy.growth_factor.max(1))
                    .ok_or(EngineError::OutOfMemory)?;
                log::debug!("output buffer too small, retrying with {} bytes", capacity);
            }
            Err(e) => return Err(e),
        }
    }
}

/// Scratch chunk used by [`verify_stream`].
const VERIFY_CHUNK: usize = 32 * 1024;

/// Inflate `payload` to the end without keeping the output.
///
/// Returns the decompressed length of a well-formed zlib stream, or
/// [`EngineError::DataCorrupt`] when the stream is malformed, truncated or
/// fails its adler-32 trailer.
pub fn verify_stream(payload: &[u8]) -> Result<u64, EngineError> {
    let mut scratch = vec![0u8; VERIFY_CHUNK];
    let mut z = Decompress::new(true);
    loop {
        let in_pos  = z.total_in() as usize;
        let out_pos = z.total_out();
        let status = z
            .decompress(&payload[in_pos..], &mut scratch, FlushDecompress::None)
            .map_err(|_| EngineError::DataCorrupt)?;
        match status {
            Status::StreamEnd => return Ok(z.total_out()),
            _ if z.total_in() as usize == in_pos && z.total_out() == out_pos => {
                return Err(EngineError::DataCorrupt);
            }
            _ => continue,
        }
    }
}
