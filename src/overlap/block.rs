use std::fmt;

use crate::index::interval::{IndexPair, Interval, IntervalPair};
use crate::index::ReadIndex;

/// Which end of the query read the overlap covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReadEnd {
    Suffix,
    Prefix,
}

/// Whether the target read is in the same orientation as the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Strand {
    Same,
    Opposite,
}

impl ReadEnd {
    pub fn code(self) -> char {
        match self {
            ReadEnd::Suffix => 'S',
            ReadEnd::Prefix => 'P',
        }
    }

    pub fn from_code(c: &str) -> Option<Self> {
        match c {
            "S" => Some(ReadEnd::Suffix),
            "P" => Some(ReadEnd::Prefix),
            _ => None,
        }
    }
}

impl Strand {
    pub fn code(self) -> char {
        match self {
            Strand::Same => '+',
            Strand::Opposite => '-',
        }
    }

    pub fn from_code(c: &str) -> Option<Self> {
        match c {
            "+" => Some(Strand::Same),
            "-" => Some(Strand::Opposite),
            _ => None,
        }
    }
}

/// The four suffix-mode searches run for every read.
pub const PASSES: [(ReadEnd, Strand); 4] = [
    (ReadEnd::Suffix, Strand::Same),
    (ReadEnd::Suffix, Strand::Opposite),
    (ReadEnd::Prefix, Strand::Same),
    (ReadEnd::Prefix, Strand::Opposite),
];

/// Searches run against the forward index iff (suffix end) == (same strand).
#[inline]
pub fn primary_is_forward(end: ReadEnd, strand: Strand) -> bool {
    (end == ReadEnd::Suffix) == (strand == Strand::Same)
}

/// Index pair with the block's primary index first.
pub fn indices_for(index: &ReadIndex, end: ReadEnd, strand: Strand) -> IndexPair<'_> {
    if primary_is_forward(end, strand) {
        IndexPair::new(&index.fwd.fm, &index.rev.fm)
    } else {
        IndexPair::new(&index.rev.fm, &index.fwd.fm)
    }
}

/// A set of target reads sharing one match with the query: `pair.primary`
/// spans the `$`-rows of every read whose primary-space prefix matches the
/// last `overlap_len` query symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlapBlock {
    pub pair: IntervalPair,
    pub overlap_len: usize,
    pub num_diffs: usize,
    pub end: ReadEnd,
    pub strand: Strand,
}

impl OverlapBlock {
    pub fn hit(&self, interval: Interval) -> HitBlock {
        HitBlock {
            interval,
            overlap_len: self.overlap_len,
            num_diffs: self.num_diffs,
            end: self.end,
            strand: self.strand,
        }
    }
}

/// The serialised form of a block: only primary `$`-rows survive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HitBlock {
    pub interval: Interval,
    pub overlap_len: usize,
    pub num_diffs: usize,
    pub end: ReadEnd,
    pub strand: Strand,
}

impl HitBlock {
    #[inline]
    pub fn primary_is_forward(&self) -> bool {
        primary_is_forward(self.end, self.strand)
    }

    /// Half-open coordinates of the match on (query, target), target on its forward strand.
    pub fn coords(&self, query_len: usize, target_len: usize) -> ((usize, usize), (usize, usize)) {
        let l = self.overlap_len;
        match (self.end, self.strand) {
            (ReadEnd::Suffix, Strand::Same) => ((query_len - l, query_len), (0, l)),
            (ReadEnd::Prefix, Strand::Same) => ((0, l), (target_len - l, target_len)),
            (ReadEnd::Suffix, Strand::Opposite) => ((query_len - l, query_len), (target_len - l, target_len)),
            (ReadEnd::Prefix, Strand::Opposite) => ((0, l), (0, l)),
        }
    }
}

impl fmt::Display for HitBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {}",
            self.interval.lower,
            self.interval.upper,
            self.overlap_len,
            self.num_diffs,
            self.end.code(),
            self.strand.code()
        )
    }
}

/// One resolved overlap between two reads, in read ordinals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Overlap {
    pub query: usize,
    pub target: usize,
    pub query_range: (usize, usize),
    pub target_range: (usize, usize),
    pub query_len: usize,
    pub target_len: usize,
    pub reverse_complement: bool,
    pub num_diffs: usize,
}

impl Overlap {
    pub fn is_containment(&self) -> bool {
        let l = self.query_range.1 - self.query_range.0;
        l == self.query_len || l == self.target_len
    }
}
