//! Byte-pair run-length coder.
//!
//! Output is a flat stream of `(byte, run_length)` pairs.  A run never
//! exceeds [`MAX_RUN`]; longer runs are split into several full pairs
//! followed by a shorter trailing pair.

use super::TransformError;

/// Longest run a single pair can describe.
pub const MAX_RUN: usize = 255;

pub fn encode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() / 2 + 2);
    let mut i = 0;
    while i < data.len() {
        let byte = data[i];
        let mut run = 1;
        while i + run < data.len() && data[i + run] == byte && run < MAX_RUN {
            run += 1;
        }
        out.push(byte);
        out.push(run as u8);
        i += run;
    }
    out
}

/// Expand a pair stream produced by [`encode`].
///
/// An odd-length stream, or a pair declaring a zero-length run, is
/// rejected as corrupt.
pub fn decode(data: &[u8]) -> Result<Vec<u8>, TransformError> {
    if data.len() % 2 != 0 {
        return Err(TransformError::RleOddLength(data.len()));
    }
    let expanded: usize = data.chunks_exact(2).map(|p| p[1] as usize).sum();
    let mut out = Vec::with_capacity(expanded);
    for (pair_idx, pair) in data.chunks_exact(2).enumerate() {
        let (byte, run) = (pair[0], pair[1] as usize);
        if run == 0 {
            return Err(TransformError::RleZeroRun(pair_idx));
        }
        out.resize(out.len() + run, byte);
    }
    Ok(out)
}
