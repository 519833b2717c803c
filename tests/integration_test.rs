use chrono::{TimeZone, Utc};
use qdsx::container::{self, ContainerMetadata, FORMAT_VERSION, HEADER_SIZE};
use qdsx::digest::sha256_hex;
use qdsx::engine::{self, PackOptions};
use qdsx::{pack, pack_with, unpack, CodecId, ContainerError, EngineError, TransformId};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

fn random_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    StdRng::seed_from_u64(seed).fill_bytes(&mut buf);
    buf
}

fn fixed_clock() -> PackOptions {
    PackOptions {
        timestamp: Some(Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap()),
        ..PackOptions::default()
    }
}

#[test]
fn test_empty_input() {
    let art = pack(b"", "empty.bin").unwrap();
    assert_eq!(art.metadata.original_size, 0);
    assert_eq!(art.metadata.transform_name, "none");
    assert_eq!(art.metadata.codec_name, "none");
    assert_eq!(art.payload_len, 0);

    let (restored, meta) = unpack(art.as_bytes()).unwrap();
    assert!(restored.is_empty());
    assert_eq!(meta.original_hash, sha256_hex(b""));
}

#[test]
fn test_short_run_beats_plain_codecs() {
    let raw = b"aaaaaaaaaa";
    let art = pack(raw, "run.txt").unwrap();
    let (restored, _) = unpack(art.as_bytes()).unwrap();
    assert_eq!(restored, raw);

    for codec in CodecId::ALL {
        let plain = codec.compress(raw, None).unwrap();
        assert!(art.payload_len <= plain.len(), "none+{codec} produced {} bytes", plain.len());
    }
}

#[test]
fn test_incompressible_input_still_packs() {
    let raw = random_bytes(65_536, 7);
    let art = pack(&raw, "noise.bin").unwrap();
    assert_eq!(art.metadata.transform_name, "none");
    assert_eq!(art.metadata.codec_name, "none");
    let (restored, meta) = unpack(art.as_bytes()).unwrap();
    assert_eq!(restored, raw);
    assert_eq!(meta.original_size, 65_536);
}

#[test]
fn test_tampered_payload_is_detected() {
    let raw = random_bytes(4096, 99);
    let art = pack(&raw, "tamper.bin").unwrap();
    assert_eq!(art.metadata.codec_name, "none");

    let mut blob = art.into_bytes();
    let payload_start = blob.len() - 4096;
    blob[payload_start + 100] ^= 0x01;
    assert!(matches!(unpack(&blob), Err(EngineError::ChecksumMismatch { .. })));
}

#[test]
fn test_tampered_compressed_payload_is_detected() {
    let raw = b"The rain in Spain stays mainly in the plain. ".repeat(30);
    for codec in CodecId::ALL.into_iter().filter(|&c| c != CodecId::None) {
        let opts = PackOptions { codecs: vec![codec], ..fixed_clock() };
        let art = pack_with(&raw, "spain.txt", &opts).unwrap();
        assert_eq!(art.metadata.codec_name, codec.name());

        let payload_start = art.bytes.len() - art.payload_len;
        for offset in [0, art.payload_len / 2, art.payload_len - 1] {
            let mut blob = art.bytes.clone();
            blob[payload_start + offset] ^= 0x5a;
            match unpack(&blob) {
                Err(EngineError::ChecksumMismatch { .. }) => {}
                Ok((restored, _)) => assert_eq!(restored, raw),
                Err(e) => panic!("{codec} byte {offset}: expected ChecksumMismatch, got {e:?}"),
            }
        }
    }
}

#[test]
fn test_corrupt_headers() {
    let art = pack(b"header corruption target", "h.txt").unwrap();

    let mut bad_magic = art.bytes.clone();
    bad_magic[1] = b'X';
    assert!(matches!(
        unpack(&bad_magic),
        Err(EngineError::Container(ContainerError::BadMagic(_)))
    ));

    let mut bad_len = art.bytes.clone();
    let remaining = (bad_len.len() - HEADER_SIZE) as u32;
    bad_len[8..12].copy_from_slice(&(remaining + 1).to_be_bytes());
    assert!(matches!(
        unpack(&bad_len),
        Err(EngineError::Container(ContainerError::CorruptHeaderLength { .. }))
    ));

    assert!(matches!(
        unpack(&art.bytes[..HEADER_SIZE - 1]),
        Err(EngineError::Container(ContainerError::HeaderTooSmall(11)))
    ));
}

#[test]
fn test_unknown_names_are_fatal() {
    let raw = b"plain";
    let mut meta = ContainerMetadata {
        codec_name:     "none".into(),
        original_name:  "x".into(),
        original_hash:  sha256_hex(raw),
        original_size:  raw.len() as u64,
        timestamp:      "2026-10-18T12:00:00Z".into(),
        transform_name: "lz77".into(),
        format_version: FORMAT_VERSION,
    };
    let blob = container::encode(&meta, raw).unwrap();
    assert!(matches!(unpack(&blob), Err(EngineError::UnknownTransform(t)) if t == "lz77"));

    meta.transform_name = "none".into();
    meta.codec_name = "lzham".into();
    let blob = container::encode(&meta, raw).unwrap();
    assert!(matches!(unpack(&blob), Err(EngineError::UnknownCodec(c)) if c == "lzham"));

    meta.codec_name = "none".into();
    let blob = container::encode(&meta, raw).unwrap();
    assert_eq!(unpack(&blob).unwrap().0, raw);
}

#[test]
fn test_selection_is_deterministic() {
    let raw = b"The rain in Spain stays mainly in the plain. ".repeat(30);
    let a = pack_with(&raw, "spain.txt", &fixed_clock()).unwrap();
    let b = pack_with(&raw, "spain.txt", &fixed_clock()).unwrap();
    assert_eq!(a.metadata.transform_name, b.metadata.transform_name);
    assert_eq!(a.metadata.codec_name, b.metadata.codec_name);
    assert_eq!(a.bytes, b.bytes);
}

#[test]
fn test_every_transform_packs_alone() {
    let raw = b"banana".repeat(50);
    for transform in TransformId::ALL {
        let opts = PackOptions {
            transforms: vec![transform],
            codecs:     vec![CodecId::Zlib],
            ..fixed_clock()
        };
        let art = pack_with(&raw, "banana.txt", &opts).unwrap();
        assert_eq!(art.metadata.transform_name, transform.name());
        assert_eq!(art.metadata.codec_name, "zlib");
        assert_eq!(unpack(art.as_bytes()).unwrap().0, raw);
    }
}

#[test]
fn test_hash_covers_original_bytes() {
    let raw = vec![3u8; 2000];
    let art = pack(&raw, "threes.bin").unwrap();
    assert_eq!(art.metadata.original_hash, sha256_hex(&raw));
}

#[test]
fn test_inspect_reads_header_only() {
    let raw = b"inspect me ".repeat(10);
    let art = pack(&raw, "inspect.txt").unwrap();
    let info = engine::inspect(art.as_bytes()).unwrap();
    assert_eq!(info.format_version, FORMAT_VERSION);
    assert_eq!(info.metadata, art.metadata);
    assert_eq!(info.payload_len, art.payload_len);
}

#[test]
fn test_pack_file_and_unpack_file() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("notes.txt");
    let data = b"file level round trip\n".repeat(64);
    std::fs::write(&src, &data).unwrap();

    let (artifact, packed) = engine::pack_file(&src, &PackOptions::default()).unwrap();
    assert_eq!(artifact, dir.path().join("notes.txt.qdsx"));
    assert_eq!(packed.metadata.original_name, "notes.txt");

    std::fs::remove_file(&src).unwrap();
    let (restored, meta) = engine::unpack_file(&artifact).unwrap();
    assert_eq!(restored, src);
    assert_eq!(meta.original_size, data.len() as u64);
    assert_eq!(std::fs::read(&restored).unwrap(), data);
}

#[test]
fn test_unpack_file_reports_missing_input() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.qdsx");
    assert!(matches!(engine::unpack_file(&missing), Err(EngineError::Io(_))));
}
