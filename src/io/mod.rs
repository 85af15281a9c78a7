//! FASTQ file I/O
//!
//! This module provides the gzip-or-plain line streams used by both passes,
//! the tag extractor (first pass) and the chunked selective rewriter
//! (second pass).

use crate::error::{IoContext, Result};
use crate::metadata::Fragments;
use bstr::BString;
use bstr::io::BufReadExt;
use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use roaring::RoaringTreemap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Lines per FASTQ record
pub const LINES_PER_RECORD: usize = 4;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

const IO_BUFFER: usize = 1 << 20;

/// Open a FASTQ file, decompressing it if it starts with the gzip magic
pub fn open_reader(path: &Path) -> Result<Box<dyn BufRead + Send>> {
    let file = File::open(path).at("open", path)?;
    let mut raw = BufReader::with_capacity(IO_BUFFER, file);
    let is_gzip = raw.fill_buf().at("read", path)?.starts_with(&GZIP_MAGIC);
    if is_gzip {
        Ok(Box::new(BufReader::with_capacity(
            IO_BUFFER,
            MultiGzDecoder::new(raw),
        )))
    } else {
        Ok(Box::new(raw))
    }
}

/// Output stream: plain text for level 0, gzip otherwise
pub enum OutputWriter {
    Gzip(GzEncoder<BufWriter<File>>),
    Plain(BufWriter<File>),
}

impl OutputWriter {
    pub fn create(path: &Path, compression: u32) -> Result<Self> {
        let file = File::create(path).at("create", path)?;
        let buffered = BufWriter::with_capacity(IO_BUFFER, file);
        Ok(if compression == 0 {
            OutputWriter::Plain(buffered)
        } else {
            OutputWriter::Gzip(GzEncoder::new(buffered, Compression::new(compression)))
        })
    }

    /// Write the gzip trailer (if any) and flush to disk
    pub fn finish(self) -> io::Result<()> {
        match self {
            OutputWriter::Gzip(encoder) => encoder.finish()?.flush(),
            OutputWriter::Plain(mut backer) => backer.flush(),
        }
    }
}

impl Write for OutputWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            OutputWriter::Gzip(backer) => backer.write(buf),
            OutputWriter::Plain(backer) => backer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            OutputWriter::Gzip(backer) => backer.flush(),
            OutputWriter::Plain(backer) => backer.flush(),
        }
    }
}

/// Bytes `[offset, offset + width)` of a line, cut short at the line's end
#[inline]
fn fragment(line: &[u8], offset: usize, width: usize) -> &[u8] {
    let start = offset.min(line.len());
    let end = offset.saturating_add(width).min(line.len());
    &line[start..end]
}

/// Collect tag (uppercased sequence) and quality fragments from a stream
///
/// Line 2 of every record is the sequence and line 4 the quality; header and
/// separator lines are skipped. Terminators are stripped before slicing.
pub fn extract_fragments<R: BufRead>(
    mut reader: R,
    offset: usize,
    width: usize,
) -> io::Result<Fragments> {
    let mut fragments = Fragments::default();
    let mut line_no: usize = 0;
    reader.for_byte_line(|line| {
        line_no += 1;
        match line_no % LINES_PER_RECORD {
            2 => {
                let mut tag = BString::from(fragment(line, offset, width));
                tag.make_ascii_uppercase();
                fragments.tags.push(tag);
            }
            0 => fragments
                .quals
                .push(BString::from(fragment(line, offset, width))),
            _ => {}
        }
        Ok(true)
    })?;
    Ok(fragments)
}

/// First pass over one file
pub fn extract_tags(path: &Path, offset: usize, width: usize) -> Result<Fragments> {
    let reader = open_reader(path)?;
    extract_fragments(reader, offset, width).at("read", path)
}

#[derive(Debug, Clone)]
pub struct RewriteReport {
    pub output: PathBuf,
    pub records_written: u64,
    /// Time since the start of the run
    pub elapsed: Duration,
}

/// Second pass: copies the surviving records of a file verbatim, in order
///
/// At most `chunk_size` records are buffered at a time.
pub struct Rewriter<'a> {
    survivors: &'a RoaringTreemap,
    record_count: u64,
    chunk_size: usize,
    compression: u32,
}

impl<'a> Rewriter<'a> {
    pub fn new(
        survivors: &'a RoaringTreemap,
        record_count: u64,
        chunk_size: usize,
        compression: u32,
    ) -> Self {
        Self {
            survivors,
            record_count,
            chunk_size: chunk_size.max(1),
            compression,
        }
    }

    pub fn run(&self, input: &Path, output: &Path, started: Instant) -> Result<RewriteReport> {
        let reader = open_reader(input)?;
        let mut writer = OutputWriter::create(output, self.compression)?;
        let records_written = self.rewrite(reader, &mut writer).at("rewrite", input)?;
        writer.finish().at("finish", output)?;
        Ok(RewriteReport {
            output: output.to_path_buf(),
            records_written,
            elapsed: started.elapsed(),
        })
    }

    /// Window-by-window copy; returns the number of records written
    pub fn rewrite<R: BufRead, W: Write>(&self, mut reader: R, writer: &mut W) -> io::Result<u64> {
        let chunk = self.chunk_size as u64;
        let mut lines: Vec<Vec<u8>> = Vec::new();
        let mut pending = self.survivors.iter().peekable();
        let mut written = 0u64;
        let mut window_start = 0u64;

        while window_start < self.record_count {
            let window_end = (window_start + chunk).min(self.record_count);
            let wanted = (window_end - window_start) as usize * LINES_PER_RECORD;
            if lines.len() < wanted {
                lines.resize_with(wanted, Vec::new);
            }

            let mut filled = 0;
            while filled < wanted {
                let line = &mut lines[filled];
                line.clear();
                if reader.read_until(b'\n', line)? == 0 {
                    break;
                }
                filled += 1;
            }

            while let Some(&idx) = pending.peek() {
                if idx >= window_end {
                    break;
                }
                pending.next();
                let first = (idx - window_start) as usize * LINES_PER_RECORD;
                if first + LINES_PER_RECORD > filled {
                    continue;
                }
                for line in &lines[first..first + LINES_PER_RECORD] {
                    writer.write_all(line)?;
                    if !line.ends_with(b"\n") {
                        writer.write_all(b"\n")?;
                    }
                }
                written += 1;
            }

            if filled < wanted {
                break;
            }
            window_start = window_end;
        }
        writer.flush()?;
        Ok(written)
    }
}
