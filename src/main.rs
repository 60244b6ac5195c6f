//! Batch JPEG Resizer CLI
//!
//! Command-line interface for upscaling and compressing a tree of JPEGs.

use anyhow::bail;
use batch_resizer::file_ops::{plan, walk, ErrorPolicy, WalkOptions};
use batch_resizer::ResizeConstraints;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Upscale JPEGs to a minimum resolution and fit them under a size budget
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Target directory
    #[arg(default_value = ".")]
    directory: PathBuf,

    /// Minimum width in pixels
    #[arg(long, default_value = "560")]
    min_width: u32,

    /// Minimum height in pixels
    #[arg(long, default_value = "740")]
    min_height: u32,

    /// Maximum file size in KB (1 KB = 1000 bytes)
    #[arg(long, default_value = "500")]
    max_size: u64,

    /// Suffix for processed files, without the underscore
    #[arg(long, default_value = "resized")]
    suffix: String,

    /// Lowest JPEG quality tried before giving up on the size budget
    #[arg(long, default_value = "10")]
    quality_floor: u8,

    /// What to do when a single image fails
    #[arg(long, value_enum, default_value_t = OnError::Stop)]
    on_error: OnError,

    /// List the files that would be written, without writing them
    #[arg(long)]
    dry_run: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OnError {
    /// Abort on the first failing image
    Stop,
    /// Skip failing images and report them at the end
    Continue,
}

impl From<OnError> for ErrorPolicy {
    fn from(value: OnError) -> Self {
        match value {
            OnError::Stop => ErrorPolicy::Stop,
            OnError::Continue => ErrorPolicy::Continue,
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "warn,batch_resizer=debug"
    } else {
        "warn,batch_resizer=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut constraints =
        ResizeConstraints::with_max_size_kb(args.min_width, args.min_height, args.max_size);
    constraints.quality_floor = args.quality_floor;

    let options = WalkOptions {
        constraints,
        suffix: args.suffix,
        on_error: args.on_error.into(),
    };

    println!("Batch JPEG Resizer");
    println!("==================");

    if args.dry_run {
        let planned = plan(&args.directory, &options)?;
        for file in &planned {
            println!("  {} -> {}", file.input.display(), file.output.display());
        }
        println!("\nDry run: {} images would be processed", planned.len());
        return Ok(());
    }

    let summary = walk(&args.directory, &options)?;

    println!(
        "\nDone! Found {} images: {} processed, {} upscaled, {} over budget, {} failed",
        summary.candidates,
        summary.processed,
        summary.upscaled,
        summary.over_budget,
        summary.failures.len()
    );

    if !summary.failures.is_empty() {
        for failure in &summary.failures {
            eprintln!("  {}", failure);
        }
        bail!(
            "{} of {} images failed",
            summary.failures.len(),
            summary.candidates
        );
    }

    Ok(())
}
