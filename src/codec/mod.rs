//! Codec registry: named entropy-coder backends behind one contract.
//!
//! # Identity rules
//! Every codec is identified by its lowercase name.  That name is:
//!   - Written into the container metadata of every artifact.
//!   - The only key used to resolve a backend on unpack.
//!
//! A reader that cannot resolve the recorded name MUST fail; there is no
//! fallback to another backend.
//!
//! # Levels
//! `compress` takes an optional level.  `None` selects the backend's
//! strongest preset, since the search keeps only the smallest output anyway.
//! Backends without tunable levels ignore it.

use byteorder::{ByteOrder, LittleEndian};
use std::io::{Cursor, Read, Write};
use thiserror::Error;

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("{codec} compression error: {reason}")]
    Compression { codec: &'static str, reason: String },
    #[error("{codec} decompression error: {reason}")]
    Decompression { codec: &'static str, reason: String },
}

impl CodecError {
    fn compression(codec: CodecId, e: impl std::fmt::Display) -> Self {
        CodecError::Compression { codec: codec.name(), reason: e.to_string() }
    }

    fn decompression(codec: CodecId, e: impl std::fmt::Display) -> Self {
        CodecError::Decompression { codec: codec.name(), reason: e.to_string() }
    }
}

// ── CodecId enum ─────────────────────────────────────────────────────────────

/// Runtime codec discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecId {
    None,
    Zlib,
    Bz2,
    Lzma,
    Zstd,
    Lz4,
    Brotli,
}

impl CodecId {
    /// Registry in search order.  Ties during strategy search go to the
    /// codec that appears first here.
    pub const ALL: [CodecId; 7] = [
        CodecId::None,
        CodecId::Zlib,
        CodecId::Bz2,
        CodecId::Lzma,
        CodecId::Zstd,
        CodecId::Lz4,
        CodecId::Brotli,
    ];

    /// On-disk name.
    pub fn name(self) -> &'static str {
        match self {
            CodecId::None   => "none",
            CodecId::Zlib   => "zlib",
            CodecId::Bz2    => "bz2",
            CodecId::Zstd   => "zstd",
            CodecId::Lz4    => "lz4",
            CodecId::Brotli => "brotli",
            CodecId::Lzma   => "lzma",
        }
    }

    /// Exact-match lookup of an on-disk name.
    pub fn from_name(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == s)
    }

    pub fn compress(self, data: &[u8], level: Option<i32>) -> Result<Vec<u8>, CodecError> {
        match self {
            CodecId::None   => NoneCodec.compress(data, level),
            CodecId::Zlib   => ZlibCodec.compress(data, level),
            CodecId::Bz2    => Bz2Codec.compress(data, level),
            CodecId::Zstd   => ZstdCodec.compress(data, level),
            CodecId::Lz4    => Lz4Codec.compress(data, level),
            CodecId::Brotli => BrotliCodec.compress(data, level),
            CodecId::Lzma   => LzmaCodec.compress(data, level),
        }
    }

    pub fn decompress(self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        match self {
            CodecId::None   => NoneCodec.decompress(data),
            CodecId::Zlib   => ZlibCodec.decompress(data),
            CodecId::Bz2    => Bz2Codec.decompress(data),
            CodecId::Zstd   => ZstdCodec.decompress(data),
            CodecId::Lz4    => Lz4Codec.decompress(data),
            CodecId::Brotli => BrotliCodec.decompress(data),
            CodecId::Lzma   => LzmaCodec.decompress(data),
        }
    }
}

impl std::fmt::Display for CodecId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ── Codec trait ──────────────────────────────────────────────────────────────

pub trait Codec {
    fn codec_id(&self) -> CodecId;
    fn compress(&self, data: &[u8], level: Option<i32>) -> Result<Vec<u8>, CodecError>;
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError>;
}

// ── Built-in codec implementations ──────────────────────────────────────────

/// Stored verbatim.
pub struct NoneCodec;
impl Codec for NoneCodec {
    fn codec_id(&self) -> CodecId { CodecId::None }
    fn compress(&self, data: &[u8], _: Option<i32>) -> Result<Vec<u8>, CodecError> { Ok(data.to_vec()) }
    fn decompress(&self, data: &[u8])               -> Result<Vec<u8>, CodecError> { Ok(data.to_vec()) }
}

pub struct ZlibCodec;
impl Codec for ZlibCodec {
    fn codec_id(&self) -> CodecId { CodecId::Zlib }
    fn compress(&self, data: &[u8], level: Option<i32>) -> Result<Vec<u8>, CodecError> {
        let level = level.map_or(9, |l| l.clamp(0, 9) as u32);
        let mut enc = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::new(level));
        enc.write_all(data).map_err(|e| CodecError::compression(self.codec_id(), e))?;
        enc.finish().map_err(|e| CodecError::compression(self.codec_id(), e))
    }
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::new();
        flate2::read::ZlibDecoder::new(data)
            .read_to_end(&mut out)
            .map_err(|e| CodecError::decompression(self.codec_id(), e))?;
        Ok(out)
    }
}

/// Single bzip2 stream, 900k blocks by default.
pub struct Bz2Codec;
impl Codec for Bz2Codec {
    fn codec_id(&self) -> CodecId { CodecId::Bz2 }
    fn compress(&self, data: &[u8], level: Option<i32>) -> Result<Vec<u8>, CodecError> {
        let level = level.map_or(9, |l| l.clamp(1, 9) as u32);
        let mut enc = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::new(level));
        enc.write_all(data).map_err(|e| CodecError::compression(self.codec_id(), e))?;
        enc.finish().map_err(|e| CodecError::compression(self.codec_id(), e))
    }
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::new();
        bzip2::read::BzDecoder::new(data)
            .read_to_end(&mut out)
            .map_err(|e| CodecError::decompression(self.codec_id(), e))?;
        Ok(out)
    }
}

pub struct ZstdCodec;
impl Codec for ZstdCodec {
    fn codec_id(&self) -> CodecId { CodecId::Zstd }
    fn compress(&self, data: &[u8], level: Option<i32>) -> Result<Vec<u8>, CodecError> {
        zstd::encode_all(data, level.unwrap_or(19))
            .map_err(|e| CodecError::compression(self.codec_id(), e))
    }
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        zstd::decode_all(data).map_err(|e| CodecError::decompression(self.codec_id(), e))
    }
}

/// LZ4 block with a little-endian u32 size prefix.
pub struct Lz4Codec;

/// Upper bound on the LZ4 block expansion ratio.  A size prefix claiming
/// more than this is corrupt and is refused before anything is allocated.
const LZ4_MAX_RATIO: usize = 255;

impl Codec for Lz4Codec {
    fn codec_id(&self) -> CodecId { CodecId::Lz4 }
    fn compress(&self, data: &[u8], _: Option<i32>) -> Result<Vec<u8>, CodecError> {
        Ok(lz4_flex::compress_prepend_size(data))
    }
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        if data.len() < 4 {
            return Err(CodecError::decompression(self.codec_id(), "missing size prefix"));
        }
        let declared = LittleEndian::read_u32(&data[..4]) as usize;
        if declared > (data.len() - 4).saturating_mul(LZ4_MAX_RATIO) + 16 {
            return Err(CodecError::decompression(
                self.codec_id(),
                format!("size prefix {declared} is implausible for {} input bytes", data.len()),
            ));
        }
        lz4_flex::decompress_size_prepended(data)
            .map_err(|e| CodecError::decompression(self.codec_id(), e))
    }
}

pub struct BrotliCodec;
impl Codec for BrotliCodec {
    fn codec_id(&self) -> CodecId { CodecId::Brotli }
    fn compress(&self, data: &[u8], level: Option<i32>) -> Result<Vec<u8>, CodecError> {
        let quality = level.map_or(11, |l| l.clamp(0, 11) as u32);
        let mut out = Vec::new();
        {
            let mut w = brotli::CompressorWriter::new(&mut out, 4096, quality, 22);
            w.write_all(data).map_err(|e| CodecError::compression(self.codec_id(), e))?;
        }
        Ok(out)
    }
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::new();
        brotli::Decompressor::new(data, 4096)
            .read_to_end(&mut out)
            .map_err(|e| CodecError::decompression(self.codec_id(), e))?;
        Ok(out)
    }
}

/// `.xz` container around an LZMA2 stream.
pub struct LzmaCodec;
impl Codec for LzmaCodec {
    fn codec_id(&self) -> CodecId { CodecId::Lzma }
    fn compress(&self, data: &[u8], _: Option<i32>) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::new();
        lzma_rs::xz_compress(&mut Cursor::new(data), &mut out)
            .map_err(|e| CodecError::compression(self.codec_id(), e))?;
        Ok(out)
    }
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::new();
        lzma_rs::xz_decompress(&mut Cursor::new(data), &mut out)
            .map_err(|e| CodecError::decompression(self.codec_id(), e))?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for c in CodecId::ALL {
            assert_eq!(CodecId::from_name(c.name()), Some(c));
        }
        assert_eq!(CodecId::from_name("bz2"), Some(CodecId::Bz2));
        assert_eq!(CodecId::from_name("LZMA"), None);
        assert_eq!(CodecId::from_name("lzma_alone"), None);
    }

    #[test]
    fn every_backend_round_trips() {
        let text = b"The quick brown fox jumps over the lazy dog. ".repeat(40);
        for c in CodecId::ALL {
            for input in [&b""[..], &b"x"[..], &text[..]] {
                let packed = c.compress(input, None).unwrap();
                assert_eq!(c.decompress(&packed).unwrap(), input, "codec {c}");
            }
        }
    }

    #[test]
    fn explicit_levels_are_clamped() {
        let text = b"abcabcabcabcabc".repeat(20);
        for c in [CodecId::Zlib, CodecId::Bz2, CodecId::Brotli] {
            let packed = c.compress(&text, Some(99)).unwrap();
            assert_eq!(c.decompress(&packed).unwrap(), text);
        }
    }

    #[test]
    fn garbage_fails_to_decompress() {
        let garbage = [0xde, 0xad, 0xbe, 0xef, 0x00, 0x01];
        for c in [CodecId::Zlib, CodecId::Bz2, CodecId::Lzma, CodecId::Zstd, CodecId::Lz4] {
            assert!(c.decompress(&garbage).is_err(), "codec {c} accepted garbage");
        }
    }

    #[test]
    fn lz4_refuses_oversized_prefix() {
        let mut forged = u32::MAX.to_le_bytes().to_vec();
        forged.extend_from_slice(&[0x10, b'a']);
        assert!(matches!(
            CodecId::Lz4.decompress(&forged),
            Err(CodecError::Decompression { codec: "lz4", .. })
        ));
    }

    const FIXTURE_PLAIN: &[u8] = b"qdsx fixture qdsx fixture qdsx fixture qdsx fixture ";

    /// xz stream with a CRC64 check, as liblzma writes by default.
    const XZ_FIXTURE: [u8; 80] = [
        0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00, 0x00, 0x04, 0xe6, 0xd6, 0xb4, 0x46, 0x02, 0x00, 0x21, 0x01,
        0x16, 0x00, 0x00, 0x00, 0x74, 0x2f, 0xe5, 0xa3, 0xe0, 0x00, 0x33, 0x00, 0x14, 0x5d, 0x00, 0x38,
        0x99, 0x0a, 0xce, 0x6e, 0x40, 0x59, 0x7b, 0x0f, 0x71, 0x54, 0xa3, 0x03, 0xe3, 0x58, 0x85, 0x2d,
        0x0e, 0x00, 0x00, 0x00, 0x25, 0x62, 0xd9, 0xb5, 0x76, 0xc3, 0xf6, 0x68, 0x00, 0x01, 0x30, 0x34,
        0x6d, 0x77, 0x74, 0xde, 0x1f, 0xb6, 0xf3, 0x7d, 0x01, 0x00, 0x00, 0x00, 0x00, 0x04, 0x59, 0x5a,
    ];

    /// bzip2 stream, block size 9.
    const BZ2_FIXTURE: [u8; 57] = [
        0x42, 0x5a, 0x68, 0x39, 0x31, 0x41, 0x59, 0x26, 0x53, 0x59, 0x87, 0xbf, 0xc2, 0xe4, 0x00, 0x00,
        0x0d, 0x91, 0x80, 0x40, 0x00, 0x07, 0x20, 0x3e, 0x40, 0x20, 0x00, 0x31, 0x00, 0xd3, 0x4d, 0x01,
        0x55, 0x00, 0xd1, 0xea, 0x43, 0x27, 0x0a, 0x34, 0x70, 0xb9, 0x0a, 0x28, 0x84, 0x21, 0xf1, 0x77,
        0x24, 0x53, 0x85, 0x09, 0x08, 0x7b, 0xfc, 0x2e, 0x40,
    ];

    #[test]
    fn lzma_reads_external_xz_stream() {
        assert_eq!(CodecId::Lzma.decompress(&XZ_FIXTURE).unwrap(), FIXTURE_PLAIN);
        let ours = CodecId::Lzma.compress(FIXTURE_PLAIN, None).unwrap();
        assert_eq!(&ours[..6], &[0xfd, b'7', b'z', b'X', b'Z', 0x00]);
    }

    #[test]
    fn bz2_reads_external_stream() {
        assert_eq!(CodecId::Bz2.decompress(&BZ2_FIXTURE).unwrap(), FIXTURE_PLAIN);
        let ours = CodecId::Bz2.compress(FIXTURE_PLAIN, None).unwrap();
        assert_eq!(&ours[..4], b"BZh9");
    }
}
