//! On-disk container layout.
//!
//! ```text
//! byte 0        extension length N (0-255)
//! 1 ..= N       extension, no leading dot
//! N+1 .. M      compressed payload (opaque to this module)
//! M .. M+4      CRC-32 of the original bytes, little-endian
//! ```
//!
//! There is exactly one layout, [`FORMAT_VERSION`] 1.  It carries no magic
//! and no version byte; byte 0 is always the extension length.  Files
//! written without the checksum trailer are not readable.

use byteorder::{ByteOrder, LittleEndian};
use std::borrow::Cow;
use std::io::{self, Write};
use thiserror::Error;

pub const FORMAT_VERSION: u32 = 1;
/// Length prefix + checksum trailer.
pub const MIN_CONTAINER_LEN: usize = 5;
pub const CHECKSUM_LEN: usize = 4;
pub const MAX_EXTENSION_LEN: usize = u8::MAX as usize;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("Container too short: {len} bytes (minimum {MIN_CONTAINER_LEN})")]
    TooShort { len: usize },
    #[error("Invalid container metadata: {0}")]
    MetadataInvalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub extension: String,
    pub payload:   Vec<u8>,
    pub checksum:  u32,
}

impl Container {
    /// Build a container.  Non-ASCII characters in `extension` become `_`
    /// and the result is truncated to what the 8-bit length field can hold.
    pub fn new(extension: &str, payload: Vec<u8>, checksum: u32) -> Self {
        Self {
            extension: sanitize_extension(extension).into_owned(),
            payload,
            checksum,
        }
    }

    /// Total encoded size in bytes.
    pub fn encoded_len(&self) -> usize {
        1 + sanitize_extension(&self.extension).len() + self.payload.len() + CHECKSUM_LEN
    }

    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        let ext = sanitize_extension(&self.extension);
        writer.write_all(&[ext.len() as u8])?;
        writer.write_all(ext.as_bytes())?;
        writer.write_all(&self.payload)?;
        writer.write_all(&self.checksum_bytes())
    }

    pub fn encode(&self) -> Vec<u8> {
        let ext = sanitize_extension(&self.extension);
        let mut out = Vec::with_capacity(1 + ext.len() + self.payload.len() + CHECKSUM_LEN);
        out.push(ext.len() as u8);
        out.extend_from_slice(ext.as_bytes());
        out.extend_from_slice(&self.payload);
        out.extend_from_slice(&self.checksum_bytes());
        out
    }

    fn checksum_bytes(&self) -> [u8; CHECKSUM_LEN] {
        let mut crc = [0u8; CHECKSUM_LEN];
        LittleEndian::write_u32(&mut crc, self.checksum);
        crc
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, FormatError> {
        if bytes.len() < MIN_CONTAINER_LEN {
            return Err(FormatError::TooShort { len: bytes.len() });
        }
        let ext_len = bytes[0] as usize;
        let ext_end = 1 + ext_len;
        if ext_end + CHECKSUM_LEN > bytes.len() {
            return Err(FormatError::MetadataInvalid(format!(
                "extension length {} does not fit in {} bytes",
                ext_len,
                bytes.len()
            )));
        }

        let ext_bytes = &bytes[1..ext_end];
        if !ext_bytes.is_ascii() {
            return Err(FormatError::MetadataInvalid("extension is not ASCII".into()));
        }
        let extension: String = ext_bytes.iter().map(|&b| b as char).collect();
        if extension.contains(|c: char| matches!(c, '/' | '\\' | '\0')) {
            return Err(FormatError::MetadataInvalid(format!(
                "extension {extension:?} contains a path separator or NUL"
            )));
        }

        let crc_pos = bytes.len() - CHECKSUM_LEN;

        Ok(Self {
            extension,
            payload:   bytes[ext_end..crc_pos].to_vec(),
            checksum:  LittleEndian::read_u32(&bytes[crc_pos..]),
        })
    }
}

fn sanitize_extension(ext: &str) -> Cow<'_, str> {
    if ext.is_ascii() && ext.len() <= MAX_EXTENSION_LEN {
        return Cow::Borrowed(ext);
    }
    Cow::Owned(
        ext.chars()
            .map(|c| if c.is_ascii() { c } else { '_' })
            .take(MAX_EXTENSION_LEN)
            .collect(),
    )
}
