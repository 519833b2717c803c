//! `bwt_mtf_rle`: BWT, then move-to-front, then run-length pairs.
//!
//! Payload layout: `primary_index (u32 BE) | rle(mtf(bwt.last_column))`.

use byteorder::{BigEndian, ByteOrder};

use super::{bwt, mtf, rle, TransformError};

/// Width of the big-endian primary-index prefix.
pub const PREFIX_LEN: usize = 4;

pub fn encode(data: &[u8]) -> Result<Vec<u8>, TransformError> {
    if u32::try_from(data.len()).is_err() {
        return Err(TransformError::InputTooLarge(data.len()));
    }
    let bwt = bwt::forward(data);
    let body = rle::encode(&mtf::encode(&bwt.last_column));
    let mut out = Vec::with_capacity(PREFIX_LEN + body.len());
    let mut prefix = [0u8; PREFIX_LEN];
    BigEndian::write_u32(&mut prefix, bwt.primary_index);
    out.extend_from_slice(&prefix);
    out.extend_from_slice(&body);
    Ok(out)
}

pub fn decode(payload: &[u8]) -> Result<Vec<u8>, TransformError> {
    if payload.len() < PREFIX_LEN {
        return Err(TransformError::Corrupt(format!(
            "bwt_mtf_rle payload is {} bytes, shorter than its {PREFIX_LEN}-byte prefix",
            payload.len()
        )));
    }
    let (prefix, body) = payload.split_at(PREFIX_LEN);
    let primary_index = BigEndian::read_u32(prefix);
    let last_column = mtf::decode(&rle::decode(body)?);
    bwt::inverse(&last_column, primary_index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_prefix_only() {
        assert_eq!(encode(b"").unwrap(), vec![0, 0, 0, 0]);
        assert!(decode(&[0, 0, 0, 0]).unwrap().is_empty());
    }

    #[test]
    fn short_payload_is_an_error() {
        for len in 0..PREFIX_LEN {
            let payload = vec![0u8; len];
            assert!(matches!(decode(&payload), Err(TransformError::Corrupt(_))));
        }
    }

    #[test]
    fn banana_layout() {
        let enc = encode(b"banana").unwrap();
        assert_eq!(&enc[..4], &[0, 0, 0, 3]);
        assert_eq!(decode(&enc).unwrap(), b"banana");
    }

    #[test]
    fn long_run_collapses() {
        let data = vec![b'z'; 1000];
        let enc = encode(&data).unwrap();
        // z, then 999 zero ranks: (z,1) (0,255)(0,255)(0,255)(0,234)
        assert_eq!(enc.len(), PREFIX_LEN + 10);
        assert_eq!(decode(&enc).unwrap(), data);
    }
}
