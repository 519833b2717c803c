//! Burrows-Wheeler Transform over cyclic rotations.
//!
//! # Forward
//! All `n` rotations of the input are sorted lexicographically by their full
//! circular contents.  Rotations that are byte-for-byte identical (periodic
//! inputs such as `"banana" * 50` or a run of one byte) compare equal as
//! strings, so ties are broken by rotation index.  The sort is therefore
//! total and the output is fully determined by the input.
//!
//! The sort uses prefix doubling: after round `k` every rotation carries a
//! rank that orders its first `2^k` bytes, and a round sorts on the pair
//! `(rank[i], rank[i + 2^k mod n])`.  Once all ranks are distinct, or the
//! compared prefix covers the whole rotation, the order is final.  Memory is
//! O(n) integers.
//!
//! # Inverse
//! LF-mapping.  The `k`-th occurrence of byte `c` in the last column sits in
//! the same rotation as the `k`-th occurrence of `c` in the first column,
//! which is row `C[c] + k` where `C[c]` counts the bytes smaller than `c`.
//! Walking that mapping `n` times from the primary row emits the original
//! string back to front.

use super::TransformError;

/// Last column of the sorted rotation matrix plus the row holding the
/// unrotated input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BwtResult {
    pub last_column:   Vec<u8>,
    pub primary_index: u32,
}

/// Sort all cyclic rotations of `data`; returns rotation start offsets in
/// sorted order.
fn sort_rotations(data: &[u8]) -> Vec<usize> {
    let n = data.len();
    let mut order: Vec<usize> = (0..n).collect();
    let mut rank: Vec<u32> = data.iter().map(|&b| b as u32).collect();
    let mut next = vec![0u32; n];
    let mut span = 1usize;

    loop {
        {
            let key = |i: usize| (rank[i], rank[(i + span) % n]);
            order.sort_unstable_by(|&a, &b| key(a).cmp(&key(b)).then(a.cmp(&b)));

            next[order[0]] = 0;
            for w in 1..n {
                let (prev, cur) = (order[w - 1], order[w]);
                next[cur] = next[prev] + u32::from(key(prev) != key(cur));
            }
        }
        std::mem::swap(&mut rank, &mut next);

        let classes = rank[order[n - 1]] as usize + 1;
        span *= 2;
        if classes == n || span >= n {
            break;
        }
    }
    order
}

pub fn forward(data: &[u8]) -> BwtResult {
    let n = data.len();
    if n == 0 {
        return BwtResult { last_column: Vec::new(), primary_index: 0 };
    }

    let order = sort_rotations(data);
    let mut last_column = Vec::with_capacity(n);
    let mut primary_index = 0u32;
    for (row, &start) in order.iter().enumerate() {
        if start == 0 {
            primary_index = row as u32;
        }
        last_column.push(data[(start + n - 1) % n]);
    }
    BwtResult { last_column, primary_index }
}

/// Rebuild the original string from `last_column` and `primary_index`.
pub fn inverse(last_column: &[u8], primary_index: u32) -> Result<Vec<u8>, TransformError> {
    let n = last_column.len();
    if n == 0 {
        return Ok(Vec::new());
    }
    let primary = primary_index as usize;
    if primary >= n {
        return Err(TransformError::PrimaryIndexOutOfRange { primary_index, len: n });
    }

    // First-column start row for each byte value.
    let mut first_row = [0usize; 256];
    {
        let mut counts = [0usize; 256];
        for &b in last_column {
            counts[b as usize] += 1;
        }
        let mut total = 0;
        for (slot, &c) in first_row.iter_mut().zip(counts.iter()) {
            *slot = total;
            total += c;
        }
    }

    // lf[r] = first-column row matching (last_column[r], its occurrence rank).
    let mut seen = [0usize; 256];
    let lf: Vec<usize> = last_column
        .iter()
        .map(|&b| {
            let row = first_row[b as usize] + seen[b as usize];
            seen[b as usize] += 1;
            row
        })
        .collect();

    let mut out = vec![0u8; n];
    let mut r = primary;
    for slot in out.iter_mut().rev() {
        *slot = last_column[r];
        r = lf[r];
    }
    Ok(out)
}
