//! Move-to-front rank coder.
//!
//! The rank table lives on the stack of each call and starts in ascending
//! order every time, so no state carries over between invocations.

fn fresh_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    for (i, slot) in table.iter_mut().enumerate() {
        *slot = i as u8;
    }
    table
}

/// Promote `table[idx]` to rank 0, shifting everything in front of it back.
#[inline]
fn move_to_front(table: &mut [u8; 256], idx: usize) {
    let sym = table[idx];
    table.copy_within(0..idx, 1);
    table[0] = sym;
}

pub fn encode(data: &[u8]) -> Vec<u8> {
    let mut table = fresh_table();
    let mut out = Vec::with_capacity(data.len());
    for &byte in data {
        // The table always holds all 256 values.
        let idx = table.iter().position(|&s| s == byte).unwrap_or_default();
        out.push(idx as u8);
        move_to_front(&mut table, idx);
    }
    out
}

pub fn decode(ranks: &[u8]) -> Vec<u8> {
    let mut table = fresh_table();
    let mut out = Vec::with_capacity(ranks.len());
    for &rank in ranks {
        let idx = rank as usize;
        out.push(table[idx]);
        move_to_front(&mut table, idx);
    }
    out
}
