//! `.qdsx` container: fixed header, canonical JSON metadata, payload.
//!
//! # Layout (all integers big-endian)
//! ```text
//! offset 0    magic            4 B   "QDSX"
//! offset 4    format_version   u32
//! offset 8    metadata_length  u32
//! offset 12   metadata         metadata_length B, key-sorted JSON
//! offset 12+L compressed payload (rest of the blob)
//! ```
//!
//! Metadata keys are emitted in sorted order so that identical inputs packed
//! with the same clock produce byte-identical artifacts.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};
use thiserror::Error;

pub const MAGIC: &[u8; 4] = b"QDSX";
pub const FORMAT_VERSION: u32 = 2;
/// Bytes before the metadata: magic, version, metadata length.
pub const HEADER_SIZE: usize = 12;

#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("Blob is {0} bytes, smaller than the {HEADER_SIZE}-byte QDSX header")]
    HeaderTooSmall(usize),
    #[error("Bad QDSX magic {0:02x?}")]
    BadMagic([u8; 4]),
    #[error("Unsupported QDSX format version {0} (this build reads up to {FORMAT_VERSION})")]
    UnsupportedVersion(u32),
    #[error("Corrupt QDSX header length: metadata declares {declared} bytes, {available} available")]
    CorruptHeaderLength { declared: u32, available: usize },
    #[error("Metadata is {0} bytes, too large for a u32 length field")]
    MetadataTooLarge(usize),
    #[error("Metadata error: {0}")]
    Metadata(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

// ── Metadata ─────────────────────────────────────────────────────────────────

fn none_name() -> String {
    "none".to_owned()
}

/// Self-description of one packed artifact.
///
/// Field order mirrors the sorted on-disk key order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerMetadata {
    #[serde(rename = "codec", default = "none_name")]
    pub codec_name:     String,
    #[serde(rename = "orig_name")]
    pub original_name:  String,
    /// Hex SHA-256 of the original, untransformed bytes.
    #[serde(rename = "orig_sha256")]
    pub original_hash:  String,
    #[serde(rename = "orig_size", default)]
    pub original_size:  u64,
    /// ISO-8601 UTC, second precision.
    pub timestamp:      String,
    #[serde(rename = "transform", default = "none_name")]
    pub transform_name: String,
    #[serde(rename = "version")]
    pub format_version: u32,
}

impl ContainerMetadata {
    /// Canonical bytes: compact JSON with keys sorted.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        // `Value` objects are backed by a sorted map.
        serde_json::to_vec(&serde_json::to_value(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

// ── Header ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHeader {
    pub magic:           [u8; 4],
    pub format_version:  u32,
    pub metadata_length: u32,
}

impl ContainerHeader {
    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_all(&self.magic)?;
        writer.write_u32::<BigEndian>(self.format_version)?;
        writer.write_u32::<BigEndian>(self.metadata_length)?;
        Ok(())
    }

    /// Read and validate the fixed header.  `blob_len` is the size of the
    /// whole artifact, used to bounds-check `metadata_length`.
    pub fn read<R: Read>(mut reader: R, blob_len: usize) -> Result<Self, ContainerError> {
        if blob_len < HEADER_SIZE {
            return Err(ContainerError::HeaderTooSmall(blob_len));
        }
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(ContainerError::BadMagic(magic));
        }
        let format_version = reader.read_u32::<BigEndian>()?;
        if format_version > FORMAT_VERSION {
            return Err(ContainerError::UnsupportedVersion(format_version));
        }
        let metadata_length = reader.read_u32::<BigEndian>()?;
        let available = blob_len - HEADER_SIZE;
        if metadata_length as usize > available {
            return Err(ContainerError::CorruptHeaderLength { declared: metadata_length, available });
        }
        Ok(Self { magic, format_version, metadata_length })
    }
}

// ── Encode / decode ──────────────────────────────────────────────────────────

/// A parsed artifact borrowing its payload from the source blob.
#[derive(Debug, Clone)]
pub struct ParsedContainer<'a> {
    pub format_version: u32,
    pub metadata:       ContainerMetadata,
    pub payload:        &'a [u8],
}

pub fn encode(metadata: &ContainerMetadata, payload: &[u8]) -> Result<Vec<u8>, ContainerError> {
    let meta = metadata.to_bytes()?;
    let metadata_length = u32::try_from(meta.len())
        .map_err(|_| ContainerError::MetadataTooLarge(meta.len()))?;
    let header = ContainerHeader {
        magic: *MAGIC,
        format_version: FORMAT_VERSION,
        metadata_length,
    };

    let mut blob = Vec::with_capacity(HEADER_SIZE + meta.len() + payload.len());
    header.write(&mut blob)?;
    blob.extend_from_slice(&meta);
    blob.extend_from_slice(payload);
    Ok(blob)
}

pub fn decode(blob: &[u8]) -> Result<ParsedContainer<'_>, ContainerError> {
    let header = ContainerHeader::read(blob, blob.len())?;
    let meta_end = HEADER_SIZE + header.metadata_length as usize;
    let metadata = ContainerMetadata::from_bytes(&blob[HEADER_SIZE..meta_end])?;
    Ok(ParsedContainer {
        format_version: header.format_version,
        metadata,
        payload: &blob[meta_end..],
    })
}
