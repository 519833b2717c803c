use clap::{Parser, Subcommand};
use qdsx::bench::{report_header, synthetic_payload, Summary};
use qdsx::engine::{self, PackOptions, PackedArtifact};
use qdsx::{CodecId, TransformId};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "qdsx", about = "Pack files with the best transform×codec pair into .qdsx containers")]
struct Cli {
    /// Log search details (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Append log lines to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack each file into <file>.qdsx
    Pack {
        #[arg(required = true, num_args = 1..)]
        input: Vec<PathBuf>,
        /// Transforms to try, comma-separated: none, delta, rle, bwt_mtf_rle
        #[arg(short, long, value_delimiter = ',')]
        transforms: Vec<String>,
        /// Codecs to try, comma-separated: none, zlib, bz2, lzma, zstd, lz4, brotli
        #[arg(short, long, value_delimiter = ',')]
        codecs: Vec<String>,
        /// Level override (zlib 0-9; bz2 1-9; zstd 1-22; brotli 0-11; ignored for lz4/lzma)
        #[arg(short, long)]
        level: Option<i32>,
    },
    /// Restore each .qdsx artifact next to itself
    Unpack {
        #[arg(required = true, num_args = 1..)]
        input: Vec<PathBuf>,
    },
    /// Show container header and metadata
    Info {
        input: PathBuf,
    },
    /// Write the synthetic benchmark payload and pack it
    Bench {
        #[arg(short, long, default_value = "synthetic_payload.bin")]
        output: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_file.as_deref())?;

    match cli.command {

        // ── Pack ─────────────────────────────────────────────────────────────
        Commands::Pack { input, transforms, codecs, level } => {
            let opts = PackOptions {
                transforms: parse_names(&transforms, TransformId::from_name, &TransformId::ALL, "transform")?,
                codecs:     parse_names(&codecs, CodecId::from_name, &CodecId::ALL, "codec")?,
                level,
                ..PackOptions::default()
            };
            let failed = pack_all(&input, &opts);
            if failed > 0 {
                return Err(format!("{failed} of {} file(s) failed to pack", input.len()).into());
            }
        }

        // ── Unpack ───────────────────────────────────────────────────────────
        Commands::Unpack { input } => {
            let mut failed = 0;
            for path in &input {
                match engine::unpack_file(path) {
                    Ok((out, _)) => println!("Unpacked {} -> {}", path.display(), out.display()),
                    Err(e) => {
                        eprintln!("ERROR unpacking {}: {e}", path.display());
                        failed += 1;
                    }
                }
            }
            if failed > 0 {
                return Err(format!("{failed} of {} file(s) failed to unpack", input.len()).into());
            }
        }

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { input } => {
            let info = engine::inspect(&std::fs::read(&input)?)?;
            let m = &info.metadata;
            println!("── .qdsx artifact ───────────────────────────────────────");
            println!("  Path           {}", input.display());
            println!("  Format version {}", info.format_version);
            println!("  Original name  {}", m.original_name);
            println!("  Original size  {} B", m.original_size);
            println!("  Payload size   {} B", info.payload_len);
            println!("  Ratio          {:.3}", info.ratio());
            println!("  Strategy       {}+{}", m.transform_name, m.codec_name);
            println!("  SHA-256        {}", m.original_hash);
            println!("  Packed at      {}", m.timestamp);
        }

        // ── Bench ────────────────────────────────────────────────────────────
        Commands::Bench { output } => {
            std::fs::write(&output, synthetic_payload())?;
            println!("{}", report_header());
            if pack_all(&[output], &PackOptions::default()) > 0 {
                return Err("benchmark pack failed".into());
            }
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

/// Pack every path, printing one summary row each.  Returns the failure count.
fn pack_all(paths: &[PathBuf], opts: &PackOptions) -> usize {
    let mut failed = 0;
    for path in paths {
        match engine::pack_file(path, opts) {
            Ok((out, artifact)) => println!("{}", summary(path, &out, &artifact)),
            Err(e) => {
                eprintln!("ERROR: {} {e}", path.display());
                failed += 1;
            }
        }
    }
    failed
}

fn summary(path: &Path, out: &Path, artifact: &PackedArtifact) -> Summary {
    let file_name = |p: &Path| p.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    Summary {
        input_name:    file_name(path),
        artifact_name: file_name(out),
        original_size: artifact.metadata.original_size,
        ratio:         artifact.ratio(),
        transform:     artifact.metadata.transform_name.clone(),
        codec:         artifact.metadata.codec_name.clone(),
    }
}

/// Resolve CLI names against a registry; an empty list means all of it.
fn parse_names<T: Copy>(
    names:    &[String],
    lookup:   fn(&str) -> Option<T>,
    all:      &[T],
    kind:     &str,
) -> Result<Vec<T>, String> {
    if names.is_empty() {
        return Ok(all.to_vec());
    }
    names
        .iter()
        .map(|n| lookup(&n.trim().to_lowercase()).ok_or_else(|| format!("Unknown {kind} '{n}'")))
        .collect()
}

fn init_logging(verbose: bool, log_file: Option<&Path>) -> std::io::Result<()> {
    let default_level = match (verbose, log_file.is_some()) {
        (true, _)      => "debug",
        (false, true)  => "info",
        (false, false) => "warn",
    };
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level));

    if let Some(path) = log_file {
        let file = OpenOptions::new().append(true).create(true).open(path)?;
        builder.format(|buf, record| {
            writeln!(
                buf,
                "[{}] [{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        });
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    let _ = builder.try_init();
    Ok(())
}
