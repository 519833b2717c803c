//! Pack/unpack orchestrator.
//!
//! # Pack
//! `Reading → Searching → Selecting → Serializing → SelfVerifying → Done`,
//! or `Failed` from any stage.
//!
//! *Searching* tries every `(transform, codec)` pair from [`PackOptions`] in
//! registry order: transforms outer, codecs inner.  A pair whose transform
//! or codec fails is logged and skipped.  *Selecting* keeps the smallest
//! payload; on an exact size tie the pair that comes first in search order
//! wins.  With the `parallel` feature the pairs run on the rayon pool, but
//! the reduction still keys on search index, never on completion order, so
//! the choice is identical to a sequential run.
//!
//! Empty input skips the search and is stored as `none`+`none`.
//!
//! *SelfVerifying* runs the finished blob back through [`unpack`] in memory
//! and requires byte equality with the input.  Nothing is returned, and
//! nothing is written by [`pack_file`], until that check passes.
//!
//! # Unpack
//! Parse the container, resolve the recorded transform and codec names,
//! decompress, invert the transform, then check the SHA-256 of the result
//! against the stored hash.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

use crate::codec::{CodecError, CodecId};
use crate::container::{self, ContainerError, ContainerMetadata, FORMAT_VERSION};
use crate::digest::sha256_hex;
use crate::transform::{TransformError, TransformId};

/// Suffix appended to packed files.
pub const ARTIFACT_EXTENSION: &str = "qdsx";

// ── Errors ───────────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("No working transform/codec combination for this input")]
    NoViableStrategy,
    #[error("Integrity failure on self-check: {0}")]
    IntegrityFailure(String),
    #[error(transparent)]
    Container(#[from] ContainerError),
    #[error("Unknown transform '{0}'")]
    UnknownTransform(String),
    #[error("Unknown codec '{0}'")]
    UnknownCodec(String),
    #[error("Checksum mismatch while unpacking: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },
    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a single search candidate was dropped.  Never escapes the search.
#[derive(Error, Debug)]
pub enum CandidateError {
    #[error("transform {transform} failed: {source}")]
    Transform { transform: TransformId, source: TransformError },
    #[error("codec {codec} failed after {transform}: {source}")]
    Codec { transform: TransformId, codec: CodecId, source: CodecError },
}

// ── Configuration ────────────────────────────────────────────────────────────

/// Configuration for [`pack_with`].
#[derive(Debug, Clone)]
pub struct PackOptions {
    /// Transforms to try, in tie-break order.
    pub transforms: Vec<TransformId>,
    /// Codecs to try for each transform, in tie-break order.
    pub codecs:     Vec<CodecId>,
    /// Level override handed to every codec; `None` means strongest preset.
    pub level:      Option<i32>,
    /// Fixed clock for reproducible artifacts; `None` stamps the current time.
    pub timestamp:  Option<DateTime<Utc>>,
    /// Run candidates on the rayon pool (needs the `parallel` feature).
    pub parallel:   bool,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            transforms: TransformId::ALL.to_vec(),
            codecs:     CodecId::ALL.to_vec(),
            level:      None,
            timestamp:  None,
            parallel:   cfg!(feature = "parallel"),
        }
    }
}

// ── Pack state machine ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackStage {
    Reading,
    Searching,
    Selecting,
    Serializing,
    SelfVerifying,
    Done,
    Failed,
}

/// One successful trial.  `index` is the pair's position in search order.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub index:     usize,
    pub transform: TransformId,
    pub codec:     CodecId,
    pub payload:   Vec<u8>,
}

/// A verified `.qdsx` blob plus the metadata written into it.
#[derive(Debug, Clone)]
pub struct PackedArtifact {
    pub bytes:       Vec<u8>,
    pub metadata:    ContainerMetadata,
    pub payload_len: usize,
}

impl PackedArtifact {
    pub fn as_bytes(&self) -> &[u8] { &self.bytes }

    pub fn into_bytes(self) -> Vec<u8> { self.bytes }

    /// Compressed payload size over original size (original floored at 1).
    pub fn ratio(&self) -> f64 {
        self.payload_len as f64 / self.metadata.original_size.max(1) as f64
    }
}

/// Header-level view of an artifact, without decoding its payload.
#[derive(Debug, Clone)]
pub struct ArtifactInfo {
    pub format_version: u32,
    pub metadata:       ContainerMetadata,
    pub payload_len:    usize,
}

impl ArtifactInfo {
    pub fn ratio(&self) -> f64 {
        self.payload_len as f64 / self.metadata.original_size.max(1) as f64
    }
}

/// Pack with the default registries.
pub fn pack(raw: &[u8], original_name: &str) -> Result<PackedArtifact, EngineError> {
    pack_with(raw, original_name, &PackOptions::default())
}

pub fn pack_with(
    raw:           &[u8],
    original_name: &str,
    opts:          &PackOptions,
) -> Result<PackedArtifact, EngineError> {
    let result = run_pack(raw, original_name, opts);
    match &result {
        Ok(art) => log::info!(
            "PACK {original_name} using {}+{}, ratio={:.3}",
            art.metadata.transform_name, art.metadata.codec_name, art.ratio()
        ),
        Err(e) => {
            log::debug!("pack {original_name}: {:?}", PackStage::Failed);
            log::error!("PACK {original_name} failed: {e}");
        }
    }
    result
}

fn run_pack(raw: &[u8], original_name: &str, opts: &PackOptions) -> Result<PackedArtifact, EngineError> {
    log::debug!("pack {original_name}: {:?} ({} bytes)", PackStage::Reading, raw.len());

    let chosen = if raw.is_empty() {
        Candidate { index: 0, transform: TransformId::None, codec: CodecId::None, payload: Vec::new() }
    } else {
        log::debug!("pack {original_name}: {:?}", PackStage::Searching);
        let trials = search(raw, opts);
        log::debug!("pack {original_name}: {:?}", PackStage::Selecting);
        select(trials).ok_or(EngineError::NoViableStrategy)?
    };

    log::debug!("pack {original_name}: {:?}", PackStage::Serializing);
    let timestamp = opts
        .timestamp
        .unwrap_or_else(Utc::now)
        .to_rfc3339_opts(SecondsFormat::Secs, true);
    let metadata = ContainerMetadata {
        codec_name:     chosen.codec.name().to_owned(),
        original_name:  original_name.to_owned(),
        original_hash:  sha256_hex(raw),
        original_size:  raw.len() as u64,
        timestamp,
        transform_name: chosen.transform.name().to_owned(),
        format_version: FORMAT_VERSION,
    };
    let bytes = container::encode(&metadata, &chosen.payload)?;

    log::debug!("pack {original_name}: {:?}", PackStage::SelfVerifying);
    self_verify(&bytes, raw)?;

    log::debug!("pack {original_name}: {:?}", PackStage::Done);
    Ok(PackedArtifact { bytes, metadata, payload_len: chosen.payload.len() })
}

/// Try every `(transform, codec)` pair.  Successful trials come back in
/// search order, followed by any transform failures.
pub fn search(raw: &[u8], opts: &PackOptions) -> Vec<Result<Candidate, CandidateError>> {
    let transformed = map_ordered(&opts.transforms, opts.parallel, |&t| (t, t.forward(raw)));

    let per_transform = opts.codecs.len();
    let mut jobs = Vec::with_capacity(opts.transforms.len() * per_transform);
    let mut failures = Vec::new();
    for (t_idx, (transform, outcome)) in transformed.iter().enumerate() {
        match outcome {
            Ok(bytes) => {
                for (c_idx, &codec) in opts.codecs.iter().enumerate() {
                    jobs.push((t_idx * per_transform + c_idx, *transform, codec, bytes.as_slice()));
                }
            }
            Err(source) => {
                let e = CandidateError::Transform { transform: *transform, source: source.clone() };
                log::warn!("  candidate skipped: {e}");
                failures.push(Err(e));
            }
        }
    }

    let level = opts.level;
    let mut trials = map_ordered(&jobs, opts.parallel, |&(index, transform, codec, bytes)| {
        let trial = codec
            .compress(bytes, level)
            .map(|payload| Candidate { index, transform, codec, payload })
            .map_err(|source| CandidateError::Codec { transform, codec, source });
        match &trial {
            Ok(c)  => log::debug!("  candidate {transform}+{codec}: {} bytes", c.payload.len()),
            Err(e) => log::warn!("  candidate skipped: {e}"),
        }
        trial
    });
    trials.extend(failures);
    trials
}

/// Smallest payload wins; exact ties go to the lowest search index.
pub fn select(trials: Vec<Result<Candidate, CandidateError>>) -> Option<Candidate> {
    trials
        .into_iter()
        .flatten()
        .min_by_key(|c| (c.payload.len(), c.index))
}

fn self_verify(blob: &[u8], raw: &[u8]) -> Result<(), EngineError> {
    match unpack(blob) {
        Ok((restored, _)) if restored == raw => Ok(()),
        Ok((restored, _)) => Err(EngineError::IntegrityFailure(format!(
            "restored {} bytes differ from the {}-byte input",
            restored.len(),
            raw.len()
        ))),
        Err(e) => Err(EngineError::IntegrityFailure(e.to_string())),
    }
}

#[cfg(feature = "parallel")]
fn map_ordered<T, R, F>(items: &[T], parallel: bool, f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    use rayon::prelude::*;
    if parallel {
        items.par_iter().map(f).collect()
    } else {
        items.iter().map(f).collect()
    }
}

#[cfg(not(feature = "parallel"))]
fn map_ordered<T, R, F>(items: &[T], _parallel: bool, f: F) -> Vec<R>
where
    F: Fn(&T) -> R,
{
    items.iter().map(f).collect()
}

// ── Unpack ───────────────────────────────────────────────────────────────────

/// Restore the original bytes of an artifact and return them with its
/// metadata.
pub fn unpack(blob: &[u8]) -> Result<(Vec<u8>, ContainerMetadata), EngineError> {
    let parsed = container::decode(blob)?;
    let metadata = parsed.metadata;

    let transform = TransformId::from_name(&metadata.transform_name)
        .ok_or_else(|| EngineError::UnknownTransform(metadata.transform_name.clone()))?;
    let codec = CodecId::from_name(&metadata.codec_name)
        .ok_or_else(|| EngineError::UnknownCodec(metadata.codec_name.clone()))?;

    let raw = if metadata.original_size == 0 && codec == CodecId::None {
        Vec::new()
    } else {
        decode_payload(transform, codec, parsed.payload).map_err(|e| EngineError::ChecksumMismatch {
            expected: metadata.original_hash.clone(),
            actual:   format!("undecodable payload ({e})"),
        })?
    };

    let actual = sha256_hex(&raw);
    if !actual.eq_ignore_ascii_case(&metadata.original_hash) {
        return Err(EngineError::ChecksumMismatch { expected: metadata.original_hash, actual });
    }
    Ok((raw, metadata))
}

/// A payload that no longer decodes is as damaged as one that decodes to the
/// wrong bytes; [`unpack`] reports both as a checksum mismatch.
fn decode_payload(transform: TransformId, codec: CodecId, payload: &[u8]) -> Result<Vec<u8>, EngineError> {
    let decompressed = codec.decompress(payload)?;
    Ok(transform.inverse(&decompressed)?)
}

/// Parse only the container header and metadata.
pub fn inspect(blob: &[u8]) -> Result<ArtifactInfo, EngineError> {
    let parsed = container::decode(blob)?;
    Ok(ArtifactInfo {
        format_version: parsed.format_version,
        metadata:       parsed.metadata,
        payload_len:    parsed.payload.len(),
    })
}

// ── File-level helpers ───────────────────────────────────────────────────────

/// `<path>.qdsx`
pub fn artifact_path(path: &Path) -> PathBuf {
    let mut s = path.as_os_str().to_owned();
    s.push(".");
    s.push(ARTIFACT_EXTENSION);
    PathBuf::from(s)
}

/// Where [`unpack_file`] writes: the artifact path minus its `.qdsx`
/// suffix, or with `.restored` appended when there is no such suffix.
pub fn restored_path(path: &Path) -> PathBuf {
    if path.extension().is_some_and(|e| e == ARTIFACT_EXTENSION) {
        path.with_extension("")
    } else {
        let mut s = path.as_os_str().to_owned();
        s.push(".restored");
        PathBuf::from(s)
    }
}

/// Pack a file to `<path>.qdsx`.  The artifact is written only after it
/// has passed self-verification.
pub fn pack_file(path: &Path, opts: &PackOptions) -> Result<(PathBuf, PackedArtifact), EngineError> {
    let raw = fs::read(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let artifact = pack_with(&raw, &name, opts)?;
    let out = artifact_path(path);
    fs::write(&out, artifact.as_bytes())?;
    log::info!("PACK {} -> {}", path.display(), out.display());
    Ok((out, artifact))
}

/// Unpack an artifact file next to itself; see [`restored_path`].
pub fn unpack_file(path: &Path) -> Result<(PathBuf, ContainerMetadata), EngineError> {
    let blob = fs::read(path)?;
    let (raw, metadata) = unpack(&blob)?;
    let out = restored_path(path);
    fs::write(&out, &raw)?;
    log::info!("UNPACK {} -> {}", path.display(), out.display());
    Ok((out, metadata))
}
