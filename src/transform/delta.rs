//! Byte-wise delta filter under modulo-256 arithmetic, seeded with 0.

pub fn encode(data: &[u8]) -> Vec<u8> {
    let mut prev = 0u8;
    data.iter()
        .map(|&b| {
            let d = b.wrapping_sub(prev);
            prev = b;
            d
        })
        .collect()
}

/// Running modulo-256 sum; exact inverse of [`encode`].
pub fn decode(data: &[u8]) -> Vec<u8> {
    let mut prev = 0u8;
    data.iter()
        .map(|&d| {
            prev = prev.wrapping_add(d);
            prev
        })
        .collect()
}
