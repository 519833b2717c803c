//! Synthetic benchmark payload and the one-line pack summary.
//!
//! The payload mixes four regimes so every transform has something to win
//! on: repeated text, a byte ramp, line-oriented JSON, and noise.

use std::fmt;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

/// Seed for the noise section; fixed so the payload is reproducible.
pub const SYNTH_SEED: u64 = 1234;

const TEXT_LINE: &str = "QDS variance law σ(H)/H=A R^{-p} with p≈0.35";
const TEXT_REPEATS: usize = 200;
const RAMP_LEN: usize = 65_536;
const JSON_LINES: usize = 2_000;
const NOISE_LEN: usize = 65_536;

pub fn synthetic_payload() -> Vec<u8> {
    let text = vec![TEXT_LINE; TEXT_REPEATS].join("\n");
    let ramp: Vec<u8> = (0..RAMP_LEN).map(|i| (i % 256) as u8).collect();
    let json = (0..JSON_LINES)
        .map(|i| serde_json::json!({ "k": i % 7, "v": "abcde".repeat(3) }).to_string())
        .collect::<Vec<_>>()
        .join("\n");
    let mut noise = vec![0u8; NOISE_LEN];
    StdRng::seed_from_u64(SYNTH_SEED).fill_bytes(&mut noise);

    let mut out = Vec::with_capacity(text.len() + ramp.len() + json.len() + noise.len());
    out.extend_from_slice(text.as_bytes());
    out.extend_from_slice(&ramp);
    out.extend_from_slice(json.as_bytes());
    out.extend_from_slice(&noise);
    out
}

/// Title block printed above the benchmark's summary rows.
pub fn report_header() -> String {
    format!("QDSX BENCHMARK\n{}", "-".repeat(60))
}

/// One row of the pack report.
#[derive(Debug, Clone)]
pub struct Summary {
    pub input_name:    String,
    pub artifact_name: String,
    pub original_size: u64,
    pub ratio:         f64,
    pub transform:     String,
    pub codec:         String,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:25} Raw:{:8} → {:20} {:6.3} [{}+{}]",
            self.input_name, self.original_size, self.artifact_name,
            self.ratio, self.transform, self.codec,
        )
    }
}
