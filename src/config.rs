//! Immutable run configuration
//!
//! Built once from the command line and handed to every component by
//! shared reference.

use crate::args::Args;
use crate::error::{DedupError, Result};
use std::path::{Path, PathBuf};

/// Total tag length compared across a record (or a pair of mates)
pub const TAG_LEN: usize = 40;

pub const MAX_COMPRESSION: u32 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Single,
    Paired,
}

impl Mode {
    /// Characters taken from each file's sequence/quality lines
    pub fn tag_width(self) -> usize {
        match self {
            Mode::Single => TAG_LEN,
            Mode::Paired => TAG_LEN / 2,
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Single => f.write_str("single"),
            Mode::Paired => f.write_str("paired"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub input_1: PathBuf,
    pub input_2: Option<PathBuf>,
    pub output_1: PathBuf,
    pub output_2: Option<PathBuf>,
    pub offset: usize,
    pub chunk_size: usize,
    /// 0 writes plain text, 1-9 writes gzip at that level
    pub compression: u32,
    pub diagnostics: Option<PathBuf>,
    pub log_file: PathBuf,
}

impl Config {
    pub fn from_args(args: &Args) -> Result<Self> {
        if args.chunk == 0 {
            return Err(DedupError::Configuration(
                "chunk size must be at least 1 record".into(),
            ));
        }
        if args.compression > MAX_COMPRESSION {
            return Err(DedupError::Configuration(format!(
                "gzip compression level must be between 0 and {}, got {}",
                MAX_COMPRESSION, args.compression
            )));
        }
        if let Some(input_2) = &args.input_2 {
            if !input_2.is_file() {
                return Err(DedupError::Configuration(format!(
                    "paired mode requires a readable second input, but {} is not a file",
                    input_2.display()
                )));
            }
            if input_2 == &args.input_1 {
                return Err(DedupError::Configuration(format!(
                    "input file 2 is the same as input file 1 ({})",
                    input_2.display()
                )));
            }
        }
        if args.output_2.is_some() && args.input_2.is_none() {
            return Err(DedupError::Configuration(
                "--output-2 given without a second input file".into(),
            ));
        }

        let output_1 = args
            .output_1
            .clone()
            .unwrap_or_else(|| derive_output(&args.input_1, args.compression));
        let output_2 = args.input_2.as_ref().map(|input_2| {
            args.output_2
                .clone()
                .unwrap_or_else(|| derive_output(input_2, args.compression))
        });
        let log_file = args
            .log_file
            .clone()
            .unwrap_or_else(|| sibling(&args.input_1, "_output.log"));

        Ok(Self {
            input_1: args.input_1.clone(),
            input_2: args.input_2.clone(),
            output_1,
            output_2,
            offset: args.shift,
            chunk_size: args.chunk,
            compression: args.compression,
            diagnostics: (!args.no_diagnostics).then(|| args.diagnostics.clone()),
            log_file,
        })
    }

    pub fn mode(&self) -> Mode {
        if self.input_2.is_some() {
            Mode::Paired
        } else {
            Mode::Single
        }
    }

    /// (input, output) pairs, one per file to rewrite
    pub fn file_pairs(&self) -> Vec<(&Path, &Path)> {
        let mut pairs = vec![(self.input_1.as_path(), self.output_1.as_path())];
        if let (Some(input), Some(output)) = (&self.input_2, &self.output_2) {
            pairs.push((input.as_path(), output.as_path()));
        }
        pairs
    }
}

/// Input file name up to its first '.'
fn basename(input: &Path) -> String {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.split('.').next().unwrap_or_default().to_string()
}

fn sibling(input: &Path, suffix: &str) -> PathBuf {
    let name = format!("{}{}", basename(input), suffix);
    match input.parent() {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}

/// `<basename>_fairly_output.FASTQ`, with `.gz` appended when compressing
pub fn derive_output(input: &Path, compression: u32) -> PathBuf {
    if compression == 0 {
        sibling(input, "_fairly_output.FASTQ")
    } else {
        sibling(input, "_fairly_output.FASTQ.gz")
    }
}
