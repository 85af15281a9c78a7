//! Quality scoring and survivor selection
//!
//! For every distinct tag exactly one record survives: the one with the
//! highest summed quality, and among equal scores the earliest record.

use crate::config::TAG_LEN;
use crate::metadata::TagTable;
use rayon::prelude::*;
use roaring::RoaringTreemap;
use std::collections::HashSet;

/// Sum of the raw character codes of a quality string
///
/// No Phred offset is removed and the sum is not length-normalized.
#[inline]
pub fn quality_score(qual: &[u8]) -> u64 {
    qual.iter().map(|&q| q as u64).sum()
}

/// A tag takes part in deduplication only if it is full length and has no 'N'
#[inline]
pub fn is_valid_tag(tag: &[u8]) -> bool {
    tag.len() == TAG_LEN && !tag.contains(&b'N')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectionSummary {
    /// Records before any filtering
    pub considered: u64,
    /// Records dropped as invalid or as a lower-ranked duplicate
    pub removed: u64,
    pub remaining: u64,
    /// Records dropped by the length/'N' filter alone
    pub invalid: u64,
}

#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub survivors: RoaringTreemap,
    pub summary: SelectionSummary,
}

/// Compute the survivor set over all records of `table`
///
/// Valid indices are ranked by score descending with the original index as
/// the explicit secondary key, then the first index seen for each tag wins.
pub fn select_survivors(table: &TagTable) -> Selection {
    let tags = table.tags();
    let scores = table.scores();

    let mut ranked: Vec<usize> = (0..table.len())
        .filter(|&i| is_valid_tag(&tags[i]))
        .collect();
    let invalid = (table.len() - ranked.len()) as u64;

    ranked.par_sort_by(|&a, &b| scores[b].cmp(&scores[a]).then(a.cmp(&b)));

    let mut seen: HashSet<&[u8]> = HashSet::with_capacity(ranked.len());
    let mut survivors = RoaringTreemap::new();
    for idx in ranked {
        if seen.insert(tags[idx].as_slice()) {
            survivors.insert(idx as u64);
        }
    }

    let considered = table.len() as u64;
    let remaining = survivors.len();
    Selection {
        survivors,
        summary: SelectionSummary {
            considered,
            removed: considered - remaining,
            remaining,
            invalid,
        },
    }
}
