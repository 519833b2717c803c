//! Transform registry: reversible byte-level pre-transforms.
//!
//! The set is closed and known at compile time.  Names are the on-disk
//! identity written into container metadata and are never reused.
//!
//! | name          | forward                              |
//! |---------------|--------------------------------------|
//! | `none`        | identity                             |
//! | `delta`       | modulo-256 difference                |
//! | `rle`         | `(byte, run)` pairs, runs capped at 255 |
//! | `bwt_mtf_rle` | BWT, move-to-front, then `rle`       |
//!
//! Every `inverse(forward(x)) == x`, including for the empty input.

pub mod bwt;
pub mod composite;
pub mod delta;
pub mod mtf;
pub mod rle;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("RLE stream has odd length {0}; expected (byte, run) pairs")]
    RleOddLength(usize),
    #[error("RLE pair {0} declares a zero-length run")]
    RleZeroRun(usize),
    #[error("BWT primary index {primary_index} out of range for {len} bytes")]
    PrimaryIndexOutOfRange { primary_index: u32, len: usize },
    #[error("Input of {0} bytes exceeds the u32 range of the BWT primary index")]
    InputTooLarge(usize),
    #[error("Corrupt transform payload: {0}")]
    Corrupt(String),
}

/// Runtime transform discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformId {
    None,
    Delta,
    Rle,
    BwtMtfRle,
}

impl TransformId {
    /// Registry in search order.  Ties during strategy search go to the
    /// transform that appears first here.
    pub const ALL: [TransformId; 4] = [
        TransformId::None,
        TransformId::Delta,
        TransformId::Rle,
        TransformId::BwtMtfRle,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TransformId::None      => "none",
            TransformId::Delta     => "delta",
            TransformId::Rle       => "rle",
            TransformId::BwtMtfRle => "bwt_mtf_rle",
        }
    }

    /// Exact-match lookup of an on-disk name.
    pub fn from_name(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == s)
    }

    pub fn forward(self, data: &[u8]) -> Result<Vec<u8>, TransformError> {
        match self {
            TransformId::None      => Ok(data.to_vec()),
            TransformId::Delta     => Ok(delta::encode(data)),
            TransformId::Rle       => Ok(rle::encode(data)),
            TransformId::BwtMtfRle => composite::encode(data),
        }
    }

    pub fn inverse(self, data: &[u8]) -> Result<Vec<u8>, TransformError> {
        match self {
            TransformId::None      => Ok(data.to_vec()),
            TransformId::Delta     => Ok(delta::decode(data)),
            TransformId::Rle       => rle::decode(data),
            TransformId::BwtMtfRle => composite::decode(data),
        }
    }
}

impl std::fmt::Display for TransformId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
