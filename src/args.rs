// Command-line argument parsing
use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_CHUNK: usize = 1_000_000;
pub const DEFAULT_COMPRESSION: u32 = 1;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "fairlyrs",
    version,
    about = "Rapid removal of FASTQ entries apparently targeting the same coordinates on a template sequence"
)]
pub struct Args {
    /// Input file 1 in FASTQ format (gzip or plain)
    #[arg(short = '1', long = "input-file-1")]
    pub input_1: PathBuf,
    /// Input file 2 in FASTQ format; its presence selects paired mode
    #[arg(short = '2', long = "input-file-2")]
    pub input_2: Option<PathBuf>,
    /// Offset from the 5' end of reads when choosing tags for comparison
    #[arg(short = 's', long, default_value_t = 0)]
    pub shift: usize,
    /// Number of records held in memory per window when writing output files
    #[arg(short = 'c', long, default_value_t = DEFAULT_CHUNK)]
    pub chunk: usize,
    /// Gzip compression level for output (1-9); 0 writes uncompressed text
    #[arg(short = 'g', long = "gzip-compression-level", default_value_t = DEFAULT_COMPRESSION)]
    pub compression: u32,
    /// Output path for file 1 (default: derived from input file 1)
    #[arg(long)]
    pub output_1: Option<PathBuf>,
    /// Output path for file 2 (default: derived from input file 2)
    #[arg(long)]
    pub output_2: Option<PathBuf>,
    /// Table of every record's tag and quality score before filtering
    #[arg(long, default_value = "ONE_OFFSET.csv")]
    pub diagnostics: PathBuf,
    /// Skip writing the diagnostic table
    #[arg(long)]
    pub no_diagnostics: bool,
    /// Log file path (default: derived from input file 1)
    #[arg(long)]
    pub log_file: Option<PathBuf>,
    #[arg(short = 't', long, default_value_t = num_cpus())]
    pub threads: usize,
    /// Force single-threaded mode
    #[arg(long)]
    pub single_threaded: bool,
}

pub fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Get effective thread count based on args and platform
#[inline]
pub fn effective_threads(args: &Args) -> usize {
    if args.single_threaded {
        1
    } else {
        args.threads.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["fairlyrs", "-1", "reads.fq.gz"]);
        assert_eq!(args.input_1, PathBuf::from("reads.fq.gz"));
        assert!(args.input_2.is_none());
        assert_eq!(args.shift, 0);
        assert_eq!(args.chunk, DEFAULT_CHUNK);
        assert_eq!(args.compression, DEFAULT_COMPRESSION);
        assert_eq!(args.diagnostics, PathBuf::from("ONE_OFFSET.csv"));
        assert!(!args.no_diagnostics);
    }

    #[test]
    fn test_paired_flags() {
        let args = Args::parse_from([
            "fairlyrs", "-1", "r1.fq.gz", "-2", "r2.fq.gz", "-s", "5", "-c", "100", "-g", "0",
        ]);
        assert_eq!(args.input_2, Some(PathBuf::from("r2.fq.gz")));
        assert_eq!(args.shift, 5);
        assert_eq!(args.chunk, 100);
        assert_eq!(args.compression, 0);
    }

    #[test]
    fn test_single_threaded_flag() {
        let mut args = Args::parse_from(["fairlyrs", "-1", "r.fq", "-t", "8"]);
        assert_eq!(effective_threads(&args), 8);
        args.single_threaded = true;
        assert_eq!(effective_threads(&args), 1);
    }
}
