use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use fairlyrs::args::{Args, DEFAULT_CHUNK, DEFAULT_COMPRESSION, effective_threads};
use fairlyrs::utils::format_duration;
use fairlyrs::{Config, run};

#[cfg(not(windows))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn init_logging(cfg: &Config) -> Result<()> {
    let log_file = File::create(&cfg.log_file)
        .with_context(|| format!("failed to create log file {}", cfg.log_file.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(false)
                .without_time(),
        )
        .with(
            fmt::layer()
                .with_writer(Mutex::new(log_file))
                .with_ansi(false)
                .with_target(false),
        )
        .init();
    Ok(())
}

fn log_settings(args: &Args, cfg: &Config) {
    info!("___");
    info!(
        "fairlyrs: Rapid removal of FASTQ entries apparently targeting the same coordinates on a template sequence"
    );
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("___");
    info!("Input filename 1: {}", cfg.input_1.display());
    if let Some(input_2) = &cfg.input_2 {
        info!("Input filename 2: {}", input_2.display());
    }
    if cfg.offset != 0 {
        info!("Character offset from 5' end(s): {}", cfg.offset);
    }
    if cfg.chunk_size != DEFAULT_CHUNK {
        info!("'Chunk' size when writing clean output files: {}", cfg.chunk_size);
    }
    if cfg.compression != DEFAULT_COMPRESSION {
        info!(
            "Compression level selected for gzip file (0 is no compression): {}",
            cfg.compression
        );
    }
    info!("Output filename 1: {}", cfg.output_1.display());
    if let Some(output_2) = &cfg.output_2 {
        info!("Output filename 2: {}", output_2.display());
    }
    info!("Mode: {} ({} threads)", cfg.mode(), effective_threads(args));
    info!("___");
}

fn main() -> Result<()> {
    let args = Args::parse();
    let cfg = Config::from_args(&args)?;

    // Only the first pass (paired extraction and the survivor sort) uses the pool
    rayon::ThreadPoolBuilder::new()
        .num_threads(effective_threads(&args))
        .build_global()
        .ok();

    init_logging(&cfg)?;
    log_settings(&args, &cfg);

    let start = std::time::Instant::now();
    let summary = run(&cfg).context("run aborted; any partially written output is invalid")?;

    let (mins, secs) = format_duration(start.elapsed());
    info!(
        "done in {} min {} sec: {} of {} reads kept in {} file(s)",
        mins,
        secs,
        summary.selection.remaining,
        summary.selection.considered,
        summary.outputs.len()
    );
    Ok(())
}
