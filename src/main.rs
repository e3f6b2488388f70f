use clap::{Parser, Subcommand};
use packerx::{Packer, PackerConfig};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "packerx", version, about = "Pack single files into checksummed compressed containers")]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Container directory (default: compressed_output)
    #[arg(long, global = true)]
    compressed_dir: Option<PathBuf>,
    /// Restore directory (default: decompressed_output)
    #[arg(long, global = true)]
    decompressed_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a file into <compressed_dir>/<hash>.bin
    Compress {
        source: PathBuf,
    },
    /// Restore a file by its original name into <decompressed_dir>/<stem>_restored.<ext>
    Decompress {
        original_name: PathBuf,
    },
    /// Print container metadata as JSON
    Inspect {
        original_name: PathBuf,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() { ExitCode::FAILURE } else { ExitCode::SUCCESS };
        }
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&cli)?;
    std::fs::create_dir_all(&config.compressed_dir)?;
    std::fs::create_dir_all(&config.decompressed_dir)?;
    let packer = Packer::new(config);

    match cli.command {

        // ── Compress ─────────────────────────────────────────────────────────
        Commands::Compress { source } => {
            let report = packer.compress_file(&source)?;
            println!("Compression complete.");
            println!("  Output           {}", report.output_path.display());
            println!("  SHA-256 (salted) {}", report.hashed_name);
            println!("  Extension        .{}", report.extension);
            println!("  Original size    {} B", report.original_size);
            println!("  Compressed size  {} B", report.container_size);
        }

        // ── Decompress ───────────────────────────────────────────────────────
        Commands::Decompress { original_name } => {
            let report = packer.decompress_file(&original_name)?;
            println!("Decompression successful.");
            println!("  Restored  {}", report.output_path.display());
            println!("  Extension .{}", report.extension);
            println!("  Size      {} B", report.restored_size);
            println!("  CRC32     {:08x}", report.checksum);
        }

        // ── Inspect ──────────────────────────────────────────────────────────
        Commands::Inspect { original_name } => {
            let info = packer.inspect(&original_name)?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn load_config(cli: &Cli) -> Result<PackerConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => PackerConfig::from_json_file(path)?,
        None       => PackerConfig::default(),
    };
    if let Some(dir) = &cli.compressed_dir {
        config.compressed_dir = dir.clone();
    }
    if let Some(dir) = &cli.decompressed_dir {
        config.decompressed_dir = dir.clone();
    }
    log::debug!("config: {config:?}");
    Ok(config)
}
