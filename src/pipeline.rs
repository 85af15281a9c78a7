//! Two-pass run: index and select, then rewrite
//!
//! The survivor set must be complete before any output is written, so the
//! rewrite pass only starts once selection has finished.

use crate::algorithm::{Selection, SelectionSummary, select_survivors};
use crate::config::{Config, Mode};
use crate::error::{DedupError, IoContext, Result};
use crate::io::{RewriteReport, Rewriter, extract_tags};
use crate::metadata::{Fragments, TagTable};
use crate::utils::format_elapsed;
use std::fs::File;
use std::io::BufWriter;
use std::thread;
use std::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub selection: SelectionSummary,
    /// One report per output file, in input order
    pub outputs: Vec<RewriteReport>,
}

/// First pass: tag and score every record, then pick the survivors
///
/// Returns the selection together with the number of records indexed.
pub fn index_and_select(cfg: &Config, started: Instant) -> Result<(Selection, u64)> {
    let mode = cfg.mode();
    let width = mode.tag_width();

    let table = match (&cfg.input_2, mode) {
        (Some(input_2), Mode::Paired) => {
            let (first, second) = rayon::join(
                || extract_tags(&cfg.input_1, cfg.offset, width),
                || extract_tags(input_2, cfg.offset, width),
            );
            let (first, second) = (first?, second?);
            warn_short(&first, width, &cfg.input_1.display().to_string());
            warn_short(&second, width, &input_2.display().to_string());
            if first.records() != second.records() {
                warn!(
                    "paired inputs differ in length ({} vs {} records); using the first {}",
                    first.records(),
                    second.records(),
                    first.records().min(second.records())
                );
            }
            let table = TagTable::from_pair(first, second);
            info!("Merged {}-mers from each of the input files.", width);
            table
        }
        (None, Mode::Single) => {
            let fragments = extract_tags(&cfg.input_1, cfg.offset, width)?;
            warn_short(&fragments, width, &cfg.input_1.display().to_string());
            let table = TagTable::from_fragments(fragments);
            info!("{}-mers retrieved from single provided file.", width);
            table
        }
        _ => {
            return Err(DedupError::Configuration(format!(
                "mode {} does not match the inputs given",
                mode
            )));
        }
    };
    info!("Elapsed time: {}.", format_elapsed(started.elapsed()));

    if let Some(path) = &cfg.diagnostics {
        let mut w = BufWriter::new(File::create(path).at("create", path)?);
        table.write_diagnostics(&mut w).at("write", path)?;
    }

    info!("Computing...");
    let record_count = table.len() as u64;
    let selection = select_survivors(&table);
    Ok((selection, record_count))
}

fn warn_short(fragments: &Fragments, width: usize, name: &str) {
    let short = fragments.short_fragments(width);
    if short > 0 {
        warn!(
            "{}: {} records yield a tag shorter than {} characters at this offset and will be dropped",
            name, short, width
        );
    }
}

/// Second pass: one worker per input file, all joined before returning
///
/// Every worker runs to completion; the first failure is returned.
pub fn rewrite_all(
    cfg: &Config,
    selection: &Selection,
    record_count: u64,
    started: Instant,
) -> Result<Vec<RewriteReport>> {
    let survivors = &selection.survivors;
    thread::scope(|s| {
        let handles: Vec<_> = cfg
            .file_pairs()
            .into_iter()
            .map(|(input, output)| {
                let handle = s.spawn(move || {
                    Rewriter::new(survivors, record_count, cfg.chunk_size, cfg.compression)
                        .run(input, output, started)
                });
                (output, handle)
            })
            .collect();

        let mut outputs = Vec::with_capacity(handles.len());
        let mut first_err = None;
        for (output, handle) in handles {
            match handle.join() {
                Ok(Ok(report)) => {
                    info!(
                        "Output file: {} closed. Elapsed time: {}.",
                        report.output.display(),
                        format_elapsed(report.elapsed)
                    );
                    outputs.push(report);
                }
                Ok(Err(e)) => {
                    first_err.get_or_insert(e);
                }
                Err(_) => {
                    first_err.get_or_insert(DedupError::Worker(output.display().to_string()));
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(outputs),
        }
    })
}

/// Run both passes
pub fn run(cfg: &Config) -> Result<RunSummary> {
    let started = Instant::now();
    info!("Loading input sequence tags and quality scores.");
    let (selection, record_count) = index_and_select(cfg, started)?;

    let summary = selection.summary;
    info!("Total FASTQ entries analyzed: {}", summary.considered);
    info!("Total FASTQ entries removed: {}", summary.removed);
    info!(
        "Total FASTQ entries remaining: {}.... writing to disk",
        summary.remaining
    );

    info!("Writing output file(s).");
    let outputs = rewrite_all(cfg, &selection, record_count, started)?;
    Ok(RunSummary {
        selection: summary,
        outputs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::Args;
    use clap::Parser;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::{Read, Write};
    use std::path::Path;

    fn record(name: &str, seq: &str, qual: &str) -> String {
        format!("@{}\n{}\n+\n{}\n", name, seq, qual)
    }

    fn write_gz(path: &Path, text: &str) {
        let mut enc = GzEncoder::new(File::create(path).unwrap(), Compression::new(1));
        enc.write_all(text.as_bytes()).unwrap();
        enc.finish().unwrap();
    }

    fn read_gz(path: &Path) -> String {
        let mut out = String::new();
        flate2::read::MultiGzDecoder::new(File::open(path).unwrap())
            .read_to_string(&mut out)
            .unwrap();
        out
    }

    fn config(dir: &Path, argv: &[&str]) -> Config {
        let diag = dir.join("diag.csv");
        let mut full = vec!["fairlyrs", "--diagnostics", diag.to_str().unwrap()];
        full.extend_from_slice(argv);
        Config::from_args(&Args::parse_from(full)).unwrap()
    }

    /// Quality string of `len` characters summing to `len * base + extra`
    fn qual(len: usize, base: u8, extra: usize) -> String {
        let mut q = vec![base; len];
        for c in q.iter_mut().take(extra) {
            *c += 1;
        }
        String::from_utf8(q).unwrap()
    }

    #[test]
    fn test_single_mode_keeps_highest_quality() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("reads.fastq.gz");
        let tag = "A".repeat(40);
        let r0 = record("r0", &format!("{}CCCC", tag), &qual(44, b'#', 0));
        let r1 = record("r1", &format!("{}GGGG", tag), &qual(44, b'5', 0));
        let r2 = record("r2", &format!("{}TTTT", "C".repeat(40)), &qual(44, b'#', 0));
        write_gz(&input, &[r0, r1.clone(), r2.clone()].concat());

        let cfg = config(dir.path(), &["-1", input.to_str().unwrap()]);
        let summary = run(&cfg).unwrap();

        assert_eq!(summary.selection.considered, 3);
        assert_eq!(summary.selection.removed, 1);
        assert_eq!(summary.selection.remaining, 2);
        assert_eq!(summary.outputs.len(), 1);
        assert_eq!(
            summary.outputs[0].output,
            dir.path().join("reads_fairly_output.FASTQ.gz")
        );
        assert_eq!(read_gz(&summary.outputs[0].output), [r1, r2].concat());

        let diag = std::fs::read_to_string(dir.path().join("diag.csv")).unwrap();
        assert_eq!(diag.lines().count(), 4);
        assert!(diag.starts_with(",MERGE_FASTA,MERGE_Q_number\n0,"));
    }

    #[test]
    fn test_paired_mode_dedups_on_concatenated_tag() {
        let dir = tempfile::tempdir().unwrap();
        let in1 = dir.path().join("s_R1.fq");
        let in2 = dir.path().join("s_R2.fq");
        let a = "A".repeat(20);
        let t = "T".repeat(20);
        let g = "G".repeat(20);

        // 0 and 1 share both halves; 2 shares only the first half with them
        let m1 = [
            record("p0/1", &a, &qual(20, b'#', 0)),
            record("p1/1", &a, &qual(20, b'#', 3)),
            record("p2/1", &a, &qual(20, b'I', 0)),
        ];
        let m2 = [
            record("p0/2", &t, &qual(20, b'#', 0)),
            record("p1/2", &t, &qual(20, b'#', 0)),
            record("p2/2", &g, &qual(20, b'#', 0)),
        ];
        std::fs::write(&in1, m1.concat()).unwrap();
        std::fs::write(&in2, m2.concat()).unwrap();

        let cfg = config(
            dir.path(),
            &["-1", in1.to_str().unwrap(), "-2", in2.to_str().unwrap(), "-g", "0", "-c", "1"],
        );
        let summary = run(&cfg).unwrap();
        assert_eq!(summary.selection.remaining, 2);
        assert_eq!(summary.selection.removed, 1);

        let out1 = dir.path().join("s_R1_fairly_output.FASTQ");
        let out2 = dir.path().join("s_R2_fairly_output.FASTQ");
        assert_eq!(
            std::fs::read_to_string(out1).unwrap(),
            [m1[1].clone(), m1[2].clone()].concat()
        );
        assert_eq!(
            std::fs::read_to_string(out2).unwrap(),
            [m2[1].clone(), m2[2].clone()].concat()
        );
    }

    #[test]
    fn test_paired_mode_truncates_to_shorter_file() {
        let dir = tempfile::tempdir().unwrap();
        let in1 = dir.path().join("x_1.fq");
        let in2 = dir.path().join("x_2.fq");
        let q = qual(20, b'I', 0);
        let m1: Vec<String> = ["AC", "GT", "CA"]
            .iter()
            .map(|p| record("m", &p.repeat(10), &q))
            .collect();
        let m2: Vec<String> = ["TT", "GG"]
            .iter()
            .map(|p| record("m", &p.repeat(10), &q))
            .collect();
        std::fs::write(&in1, m1.concat()).unwrap();
        std::fs::write(&in2, m2.concat()).unwrap();

        let cfg = config(
            dir.path(),
            &["-1", in1.to_str().unwrap(), "-2", in2.to_str().unwrap(), "-g", "0"],
        );
        let summary = run(&cfg).unwrap();
        assert_eq!(summary.selection.considered, 2);
        assert_eq!(
            std::fs::read_to_string(&summary.outputs[0].output).unwrap(),
            [m1[0].clone(), m1[1].clone()].concat()
        );
    }

    #[test]
    fn test_offset_past_line_end_drops_record() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("short.fq");
        let text = record("r0", &"A".repeat(45), &qual(45, b'I', 0));
        std::fs::write(&input, &text).unwrap();

        let cfg = config(
            dir.path(),
            &["-1", input.to_str().unwrap(), "-s", "6", "-g", "0", "--no-diagnostics"],
        );
        let summary = run(&cfg).unwrap();
        assert_eq!(summary.selection.remaining, 0);
        assert_eq!(summary.selection.invalid, 1);
        assert_eq!(std::fs::read(&summary.outputs[0].output).unwrap(), b"");
        assert!(!dir.path().join("diag.csv").exists());
    }

    #[test]
    fn test_missing_input_fails_first_pass() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.fq");
        let cfg = config(dir.path(), &["-1", missing.to_str().unwrap()]);
        let err = run(&cfg).unwrap_err();
        assert!(matches!(err, DedupError::Io { .. }));
    }

    #[test]
    fn test_unwritable_output_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.fq");
        std::fs::write(&input, record("r", &"A".repeat(40), &qual(40, b'I', 0))).unwrap();
        let bad = dir.path().join("no_such_dir").join("out.fq");
        let cfg = config(
            dir.path(),
            &["-1", input.to_str().unwrap(), "--output-1", bad.to_str().unwrap()],
        );
        let err = run(&cfg).unwrap_err();
        assert!(err.to_string().contains("out.fq"));
    }
}
