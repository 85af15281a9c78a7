//! fairlyrs - removal of FASTQ entries apparently targeting the same template coordinates
//!
//! Reads sharing a 40-character tag (taken at a fixed offset from one file, or
//! 20 characters from each mate in paired mode) are treated as duplicates. For
//! every tag the read with the highest summed quality is kept, and the kept
//! reads are copied verbatim, in their original order, to new files.
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use fairlyrs::{Args, Config, run};
//!
//! let args = Args::parse_from(["fairlyrs", "-1", "R1.fastq.gz", "-2", "R2.fastq.gz"]);
//! let cfg = Config::from_args(&args)?;
//! let summary = run(&cfg)?;
//! println!("{} reads kept", summary.selection.remaining);
//! ```

pub mod algorithm;
pub mod args;
pub mod config;
pub mod error;
pub mod io;
pub mod metadata;
pub mod pipeline;
pub mod utils;

// Re-export commonly used items
pub use algorithm::{Selection, SelectionSummary, is_valid_tag, quality_score, select_survivors};
pub use args::Args;
pub use config::{Config, Mode, TAG_LEN};
pub use error::{DedupError, Result};
pub use io::{RewriteReport, Rewriter, extract_tags};
pub use metadata::{Fragments, TagTable};
pub use pipeline::{RunSummary, run};
