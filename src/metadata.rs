//! Per-record summaries kept between the two passes
//!
//! Only the tag and the quality score of each record live in memory; the
//! records themselves are re-read from disk when the output is written.

use crate::algorithm::quality_score;
use bstr::BString;
use std::io::{self, Write};

/// Tag and quality fragments taken from one file, aligned by record index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragments {
    pub tags: Vec<BString>,
    pub quals: Vec<BString>,
}

impl Fragments {
    /// Records that have both a sequence and a quality fragment
    pub fn records(&self) -> usize {
        self.tags.len().min(self.quals.len())
    }

    /// Fragments shorter than the requested width
    pub fn short_fragments(&self, width: usize) -> usize {
        self.tags.iter().filter(|t| t.len() < width).count()
    }
}

/// Tag and score of every record, indexed by record ordinal
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagTable {
    tags: Vec<BString>,
    scores: Vec<u64>,
}

impl TagTable {
    pub fn from_parts(tags: Vec<BString>, scores: Vec<u64>) -> Self {
        assert_eq!(tags.len(), scores.len(), "tags and scores must be aligned");
        Self { tags, scores }
    }

    /// Build from a single file's fragments
    pub fn from_fragments(fragments: Fragments) -> Self {
        let n = fragments.records();
        let Fragments { mut tags, quals } = fragments;
        tags.truncate(n);
        let scores = quals[..n].iter().map(|q| quality_score(q)).collect();
        Self { tags, scores }
    }

    /// Concatenate mate fragments index by index
    ///
    /// The record count is that of the shorter file; surplus records of the
    /// longer file are dropped.
    pub fn from_pair(first: Fragments, second: Fragments) -> Self {
        let n = first.records().min(second.records());
        let mut tags = Vec::with_capacity(n);
        let mut scores = Vec::with_capacity(n);
        for i in 0..n {
            let mut tag = first.tags[i].clone();
            tag.extend_from_slice(&second.tags[i]);
            tags.push(tag);
            scores.push(quality_score(&first.quals[i]) + quality_score(&second.quals[i]));
        }
        Self { tags, scores }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn tags(&self) -> &[BString] {
        &self.tags
    }

    pub fn scores(&self) -> &[u64] {
        &self.scores
    }

    /// Write one `index,tag,score` row per record, before any filtering
    pub fn write_diagnostics<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(b",MERGE_FASTA,MERGE_Q_number\n")?;
        for (i, (tag, score)) in self.tags.iter().zip(&self.scores).enumerate() {
            write!(w, "{},", i)?;
            write_csv_field(w, tag)?;
            writeln!(w, ",{}", score)?;
        }
        w.flush()
    }
}

fn write_csv_field<W: Write>(w: &mut W, field: &[u8]) -> io::Result<()> {
    if !field.iter().any(|&b| matches!(b, b',' | b'"' | b'\n' | b'\r')) {
        return w.write_all(field);
    }
    w.write_all(b"\"")?;
    for &b in field {
        if b == b'"' {
            w.write_all(b"\"\"")?;
        } else {
            w.write_all(&[b])?;
        }
    }
    w.write_all(b"\"")
}
