//! Transitive-edge removal performed during discovery.
//!
//! All blocks handed to these functions cover the same end of the query and
//! describe proper overlaps (target longer than the overlap). Targets are
//! viewed in the query frame: the frame in which every candidate extends the
//! query to the right.

use crate::index::interval::{IndexPair, Interval, IntervalPair};
use crate::index::ReadIndex;
use crate::util::dna::{complement_code, complement_codes, BASES, SENTINEL};

use super::block::{indices_for, HitBlock, OverlapBlock, Strand};
use super::search::max_diffs;

/// A block still being extended past the query end.
#[derive(Debug, Clone, Copy)]
struct ActiveBlock<'a> {
    indices: IndexPair<'a>,
    block: OverlapBlock,
    pair: IntervalPair,
    complement: bool,
}

impl<'a> ActiveBlock<'a> {
    fn new(index: &'a ReadIndex, block: OverlapBlock) -> Self {
        Self {
            indices: indices_for(index, block.end, block.strand),
            block,
            pair: block.pair,
            complement: block.strand == Strand::Opposite,
        }
    }

    /// Extends by frame symbol `c`; opposite-strand blocks live in complemented space.
    fn extend(&self, c: u8) -> Option<Self> {
        let sym = if self.complement { complement_code(c) } else { c };
        let pair = self.indices.extend_right(self.pair, sym);
        (!pair.is_empty()).then_some(Self { pair, ..*self })
    }

    fn terminal(&self) -> Option<HitBlock> {
        let term = self.indices.extend_right(self.pair, SENTINEL);
        (!term.is_empty()).then(|| self.block.hit(term.primary))
    }
}

/// Index-only reduction. Every branch of the right-extension tree groups the
/// targets that agree on the symbols past the query end; the first targets to
/// reach their `$` on a branch are irreducible, everything else on that branch
/// overlaps them and is dropped. Assumes no target is contained in the query.
pub fn reduce_exact(index: &ReadIndex, blocks: &[(OverlapBlock, Interval)]) -> Vec<HitBlock> {
    let mut out = Vec::new();
    let root: Vec<ActiveBlock<'_>> = blocks.iter().map(|(b, _)| ActiveBlock::new(index, *b)).collect();
    if root.is_empty() {
        return out;
    }
    let mut stack = vec![root];
    while let Some(branch) = stack.pop() {
        for c in BASES {
            let children: Vec<ActiveBlock<'_>> = branch.iter().filter_map(|b| b.extend(c)).collect();
            if children.is_empty() {
                continue;
            }
            let terminal: Vec<HitBlock> = children.iter().filter_map(ActiveBlock::terminal).collect();
            if terminal.is_empty() {
                stack.push(children);
            } else {
                out.extend(terminal);
            }
        }
    }
    out
}

struct Candidate {
    hit: HitBlock,
    /// target sequence in the query frame
    seq: Vec<u8>,
}

fn candidates(index: &ReadIndex, blocks: &[(OverlapBlock, Interval)]) -> Vec<Candidate> {
    let mut out = Vec::new();
    for (block, rows) in blocks {
        let fm = indices_for(index, block.end, block.strand).primary;
        for row in rows.lower..rows.upper {
            let primary_seq = fm.extract_read(row);
            let seq = if block.strand == Strand::Opposite { complement_codes(&primary_seq) } else { primary_seq };
            out.push(Candidate { hit: block.hit(Interval::new(row, row + 1)), seq });
        }
    }
    out
}

/// Sequence-level reduction. `B` is dropped when some `C` starts earlier on
/// the query, ends before `B` does, and overlaps `B` by at least `min_overlap`
/// within the error rate.
pub fn reduce_general(
    index: &ReadIndex,
    blocks: &[(OverlapBlock, Interval)],
    min_overlap: usize,
    error_rate: f64,
) -> Vec<HitBlock> {
    let cands = candidates(index, blocks);
    let mut kept = Vec::new();
    for b in &cands {
        let lb = b.hit.overlap_len;
        let b_tail = b.seq.len() - lb;
        let reducible = cands.iter().any(|c| {
            let lc = c.hit.overlap_len;
            if lc <= lb || c.seq.len() - lc >= b_tail {
                return false;
            }
            let shift = lc - lb;
            let ov = c.seq.len() - shift;
            if ov < min_overlap {
                return false;
            }
            let diffs = c.seq[shift..].iter().zip(&b.seq[..ov]).filter(|(x, y)| x != y).count();
            diffs <= max_diffs(ov, error_rate)
        });
        if !reducible {
            kept.push(b.hit);
        }
    }
    kept
}
