use anyhow::Result;
use log::debug;

use crate::error::OverlapError;
use crate::index::interval::{IndexPair, Interval};
use crate::index::sa::SuffixArrayIndex;
use crate::index::ReadIndex;
use crate::io::hits::HitLine;
use crate::util::dna::{self, SENTINEL};

use super::block::{indices_for, primary_is_forward, HitBlock, OverlapBlock, ReadEnd, Strand, PASSES};
use super::irreducible::{reduce_exact, reduce_general};
use super::search::{max_diffs, BackwardSearch};
use super::OverlapOpt;

/// How proper overlaps are filtered before they are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    /// keep every overlap
    Exhaustive,
    /// sequence-level transitive reduction, valid for any read set
    General,
    /// index-only reduction, requires a substring-free read set and no errors
    Exact,
}

/// Where an exact copy of a read was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Witness {
    container: u32,
    offset: u32,
}

/// Per-read overlap discovery over a shared, read-only index.
pub struct OverlapAlgorithm<'a> {
    index: &'a ReadIndex,
    search: BackwardSearch,
    reduction: Reduction,
}

fn pass_query(codes: &[u8], end: ReadEnd, strand: Strand) -> Vec<u8> {
    match (end, strand) {
        (ReadEnd::Suffix, Strand::Same) => codes.to_vec(),
        (ReadEnd::Suffix, Strand::Opposite) => dna::complement_codes(codes),
        (ReadEnd::Prefix, Strand::Same) => codes.iter().rev().copied().collect(),
        (ReadEnd::Prefix, Strand::Opposite) => dna::revcomp_codes(codes),
    }
}

impl<'a> OverlapAlgorithm<'a> {
    pub fn new(index: &'a ReadIndex, opt: &OverlapOpt) -> Self {
        let reduction = if opt.exhaustive {
            Reduction::Exhaustive
        } else if opt.exact {
            Reduction::Exact
        } else {
            Reduction::General
        };
        let search = BackwardSearch::new(
            opt.min_overlap,
            opt.error_rate,
            opt.seed_length.max(0) as usize,
            opt.seed_stride.max(0) as usize,
        );
        Self { index, search, reduction }
    }

    pub fn reduction(&self) -> Reduction {
        self.reduction
    }

    fn suffix_index(&self, end: ReadEnd, strand: Strand) -> &SuffixArrayIndex {
        if primary_is_forward(end, strand) { &self.index.fwd.sa } else { &self.index.rev.sa }
    }

    /// Finds every overlap of read `ordinal` (ASCII `seq`) and packs them into a hit line.
    pub fn overlap_read(&self, ordinal: usize, seq: &[u8]) -> Result<HitLine> {
        let codes = dna::encode(seq);
        let n = codes.len();
        let budget = max_diffs(n, self.search.error_rate);
        let ord = ordinal as u32;

        let witness = self.exact_substring(ord, &codes);
        let mut is_substring = witness.is_some();
        if let Some(w) = witness {
            debug!("read {} occurs in read {} at offset {}", ordinal, w.container, w.offset);
        }

        let mut blocks: Vec<HitBlock> = Vec::new();
        let mut contains_other = false;
        // proper overlaps, split by query end
        let mut proper: [Vec<(OverlapBlock, Interval)>; 2] = [Vec::new(), Vec::new()];

        for &(end, strand) in PASSES.iter() {
            let indices = indices_for(self.index, end, strand);
            let sai = self.suffix_index(end, strand);
            let query = pass_query(&codes, end, strand);
            for hit in self.search.search(indices, &query, budget)? {
                let block = OverlapBlock {
                    pair: hit.pair,
                    overlap_len: hit.overlap_len,
                    num_diffs: hit.num_diffs,
                    end,
                    strand,
                };
                let (whole, longer) = split_terminal(indices, &block);
                if hit.overlap_len == n {
                    // 查询整条被覆盖：更长的读段包含它；等长读段按序号决定归属
                    if !longer.is_empty() {
                        is_substring = true;
                    }
                    let others: Vec<u32> = (whole.lower..whole.upper)
                        .filter_map(|row| sai.read_id(row))
                        .filter(|&id| id != ord)
                        .collect();
                    if others.iter().any(|&id| id < ord) {
                        is_substring = true;
                    }
                    if !others.is_empty() {
                        contains_other = true;
                        blocks.push(block.hit(whole));
                    }
                } else {
                    if !whole.is_empty() {
                        contains_other = true;
                        blocks.push(block.hit(whole));
                    }
                    if !longer.is_empty() {
                        let slot = if end == ReadEnd::Suffix { 0 } else { 1 };
                        proper[slot].push((block, longer));
                    }
                }
            }
        }

        if self.reduction == Reduction::Exact && (is_substring || contains_other) {
            let detail = match witness {
                Some(w) => format!("read {} occurs in read {} at offset {}", ordinal, w.container, w.offset),
                None => format!("read {} contains or duplicates another read", ordinal),
            };
            return Err(OverlapError::Precondition(format!(
                "{}; exact irreducibility requires a substring-free read set",
                detail
            ))
            .into());
        }

        for end_blocks in &proper {
            match self.reduction {
                Reduction::Exhaustive => blocks.extend(end_blocks.iter().map(|(b, rows)| b.hit(*rows))),
                Reduction::General => blocks.extend(reduce_general(
                    self.index,
                    end_blocks,
                    self.search.min_overlap,
                    self.search.error_rate,
                )),
                Reduction::Exact => blocks.extend(reduce_exact(self.index, end_blocks)),
            }
        }

        Ok(HitLine { ordinal, is_substring, blocks })
    }

    /// 精确查找读段（及其反向互补）是否出现在更长的读段中，或与更小序号的读段完全相同
    fn exact_substring(&self, ordinal: u32, codes: &[u8]) -> Option<Witness> {
        let fwd = &self.index.fwd;
        let pair = IndexPair::new(&fwd.fm, &self.index.rev.fm);
        for q in [codes.to_vec(), dna::revcomp_codes(codes)] {
            let occ = pair.search_exact(&q);
            if occ.is_empty() {
                continue;
            }
            let at_end = pair.extend_right(occ, SENTINEL);
            let exact = pair.extend_right(pair.extend_left(occ, SENTINEL), SENTINEL);
            if occ.size() > exact.size() {
                // 后面跟碱基的行一定落在更长读段内；否则找一个偏移非零的读段结尾
                let first_inner = occ.primary.lower + at_end.size();
                let row = if first_inner < occ.primary.upper {
                    Some(first_inner)
                } else {
                    (occ.primary.lower..occ.primary.upper).find(|&r| fwd.sa.locate(&fwd.fm, r).pos > 0)
                };
                if let Some(row) = row {
                    let e = fwd.sa.locate(&fwd.fm, row);
                    return Some(Witness { container: e.id, offset: e.pos });
                }
            }
            let twin = (exact.primary.lower..exact.primary.upper)
                .filter_map(|row| fwd.sa.read_id(row))
                .find(|&id| id < ordinal);
            if let Some(id) = twin {
                return Some(Witness { container: id, offset: 0 });
            }
        }
        None
    }
}

/// Splits a block's `$`-rows into targets equal to the overlap and targets extending past it.
fn split_terminal(indices: IndexPair<'_>, block: &OverlapBlock) -> (Interval, Interval) {
    let term = indices.extend_right(block.pair, SENTINEL);
    let lower = block.pair.primary.lower;
    let split = lower + term.size();
    (Interval::new(lower, split), Interval::new(split, block.pair.primary.upper))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlap::resolve::resolve_hit;
    use crate::index::read_info::{ReadInfo, ReadInfoTable};

    fn opt(min_overlap: usize, error_rate: f64) -> OverlapOpt {
        OverlapOpt { min_overlap, error_rate, ..OverlapOpt::default() }
    }

    fn build(reads: &[&[u8]]) -> ReadIndex {
        let encoded: Vec<Vec<u8>> = reads.iter().map(|r| dna::encode(r)).collect();
        ReadIndex::build(&encoded, 4).unwrap()
    }

    fn info(reads: &[&[u8]]) -> ReadInfoTable {
        ReadInfoTable::from_reads(
            reads
                .iter()
                .enumerate()
                .map(|(i, r)| ReadInfo { id: format!("r{}", i), length: r.len() })
                .collect(),
        )
    }

    /// (query, target, overlap length, reverse complement) for every resolved overlap
    fn edges(reads: &[&[u8]], o: &OverlapOpt) -> Vec<(usize, usize, usize, bool)> {
        let idx = build(reads);
        let algo = OverlapAlgorithm::new(&idx, o);
        let table = info(reads);
        let mut out = Vec::new();
        for (i, r) in reads.iter().enumerate() {
            let line = algo.overlap_read(i, r).unwrap();
            for ov in resolve_hit(&line, &idx.fwd.sa, &idx.rev.sa, &table).unwrap() {
                out.push((ov.query, ov.target, ov.query_range.1 - ov.query_range.0, ov.reverse_complement));
            }
        }
        out.sort();
        out.dedup();
        out
    }

    #[test]
    fn three_read_chain_yields_two_edges() {
        let reads: [&[u8]; 3] = [b"AACCGGTT", b"CCGGTTAA", b"TTAAGGCC"];
        let found = edges(&reads, &opt(4, 0.0));
        assert!(found.contains(&(0, 1, 6, false)));
        assert!(found.contains(&(1, 2, 4, false)));
        assert!(!found.iter().any(|&(a, b, _, _)| (a, b) == (0, 2)));
    }

    #[test]
    fn transitive_edge_dropped_unless_exhaustive() {
        // A = S[0..12), B = S[4..16), C = S[8..20)
        let s = b"GATCCTAGGCATTCGAGTCA";
        let reads: [&[u8]; 3] = [&s[0..12], &s[4..16], &s[8..20]];
        let same = |v: Vec<(usize, usize, usize, bool)>| -> Vec<(usize, usize, usize)> {
            v.into_iter().filter(|e| !e.3).map(|e| (e.0, e.1, e.2)).collect()
        };

        let all = same(edges(&reads, &OverlapOpt { exhaustive: true, ..opt(4, 0.0) }));
        assert_eq!(all, vec![(0, 1, 8), (0, 2, 4), (1, 2, 8)]);

        let general = same(edges(&reads, &opt(4, 0.0)));
        assert_eq!(general, vec![(0, 1, 8), (1, 2, 8)]);

        let exact = same(edges(&reads, &OverlapOpt { exact: true, ..opt(4, 0.0) }));
        assert_eq!(exact, general);
    }

    #[test]
    fn containment_is_reported_from_the_container() {
        let reads: [&[u8]; 2] = [b"GTCAAC", b"ATTGGTCAAC"];
        let idx = build(&reads);
        let algo = OverlapAlgorithm::new(&idx, &opt(4, 0.0));

        let small = algo.overlap_read(0, reads[0]).unwrap();
        assert!(small.is_substring);
        let big = algo.overlap_read(1, reads[1]).unwrap();
        assert!(!big.is_substring);

        let table = info(&reads);
        assert!(resolve_hit(&small, &idx.fwd.sa, &idx.rev.sa, &table).unwrap().is_empty());
        let from_big = resolve_hit(&big, &idx.fwd.sa, &idx.rev.sa, &table).unwrap();
        assert_eq!(from_big.len(), 1);
        assert_eq!((from_big[0].query, from_big[0].target), (1, 0));
        assert_eq!(from_big[0].query_range, (4, 10));
        assert_eq!(from_big[0].target_range, (0, 6));
        assert!(from_big[0].is_containment());
    }

    #[test]
    fn interior_substring_is_flagged_without_an_edge() {
        let reads: [&[u8]; 2] = [b"GGTCA", b"ATTGGTCAAC"];
        let idx = build(&reads);
        let algo = OverlapAlgorithm::new(&idx, &opt(4, 0.0));
        assert!(algo.overlap_read(0, reads[0]).unwrap().is_substring);
        assert!(edges(&reads, &opt(4, 0.0)).is_empty());
    }

    #[test]
    fn containment_classification_ignores_input_order() {
        let a: &[u8] = b"GTCAAC";
        let b: &[u8] = b"ATTGGTCAAC";
        let forward = edges(&[a, b], &opt(4, 0.0));
        let backward = edges(&[b, a], &opt(4, 0.0));
        assert_eq!(forward, vec![(1, 0, 6, false)]);
        assert_eq!(backward, vec![(0, 1, 6, false)]);
    }

    #[test]
    fn identical_reads_resolve_to_lower_ordinal() {
        let reads: [&[u8]; 2] = [b"ACGGATTC", b"ACGGATTC"];
        let idx = build(&reads);
        let algo = OverlapAlgorithm::new(&idx, &opt(4, 0.0));
        assert!(!algo.overlap_read(0, reads[0]).unwrap().is_substring);
        assert!(algo.overlap_read(1, reads[1]).unwrap().is_substring);
        assert_eq!(edges(&reads, &opt(4, 0.0)), vec![(0, 1, 8, false)]);
    }

    #[test]
    fn reverse_complement_overlap_is_found() {
        // revcomp(B) = "GTTCAAGG" starts with the suffix "GTTCA" of A
        let reads: [&[u8]; 2] = [b"ACTGGTTCA", b"CCTTGAAC"];
        let found = edges(&reads, &opt(5, 0.0));
        assert_eq!(found, vec![(0, 1, 5, true)]);
    }

    #[test]
    fn mismatch_overlap_needs_error_rate() {
        // suffix of A "GATTACAGT" vs prefix of B "GATTCCAGT": one substitution over 9
        let reads: [&[u8]; 2] = [b"CCCGATTACAGT", b"GATTCCAGTGGG"];
        assert!(edges(&reads, &opt(9, 0.0)).is_empty());
        assert_eq!(edges(&reads, &opt(9, 0.12)), vec![(0, 1, 9, false)]);
    }

    #[test]
    fn opposite_strand_containment_is_reported_from_the_container() {
        // revcomp("GTTGAC") = "GTCAAC", a suffix of the longer read
        let small: &[u8] = b"GTTGAC";
        let big: &[u8] = b"ATTGGTCAAC";
        for reads in [[small, big], [big, small]] {
            let (s, b) = if reads[0] == small { (0, 1) } else { (1, 0) };
            let idx = build(&reads);
            let algo = OverlapAlgorithm::new(&idx, &opt(4, 0.0));
            let table = info(&reads);

            let from_small = algo.overlap_read(s, reads[s]).unwrap();
            assert!(from_small.is_substring);
            assert!(resolve_hit(&from_small, &idx.fwd.sa, &idx.rev.sa, &table).unwrap().is_empty());

            let from_big = resolve_hit(&algo.overlap_read(b, reads[b]).unwrap(), &idx.fwd.sa, &idx.rev.sa, &table)
                .unwrap();
            assert_eq!(from_big.len(), 1);
            let ov = from_big[0];
            assert_eq!((ov.query, ov.target), (b, s));
            assert_eq!((ov.query_range, ov.target_range), ((4, 10), (0, 6)));
            assert!(ov.reverse_complement);
            assert!(ov.is_containment());
        }
    }

    #[test]
    fn general_reduction_handles_mismatched_chain() {
        // B 与 A、C 的重叠各有一处替换；A 与 C 的 10 碱基重叠无差异但可传递
        let a: &[u8] = b"TTTCCTCATGCAATTCAAAACCATGTCCGT";
        let b: &[u8] = b"CAATTCAAAACCATGACCGTAATGTAGGCG";
        let c: &[u8] = b"CCATGTCCGTAATGTAGGCGAAATAATAAA";
        let reads = [a, b, c];

        let all = edges(&reads, &OverlapOpt { exhaustive: true, ..opt(10, 0.1) });
        assert_eq!(all, vec![(0, 1, 20, false), (0, 2, 10, false), (1, 2, 20, false)]);
        assert_eq!(edges(&reads, &opt(10, 0.1)), vec![(0, 1, 20, false), (1, 2, 20, false)]);
        // 不允许差异时只剩 A-C
        assert_eq!(edges(&reads, &opt(10, 0.0)), vec![(0, 2, 10, false)]);
    }

    #[test]
    fn stride_without_seed_length_keeps_gapless_seeds() {
        // 目标前缀与查询末 30 个碱基相差两处替换
        let query: &[u8] = b"GCTAAAGACAATTACATAACATACACGTCAGCACGAAACT";
        let target: &[u8] = b"ATTACCTAACATACACGTCAACACGAAACTTGTTGGCCCA";
        let o = OverlapOpt {
            reads_file: "reads.fa".to_string(),
            seed_stride: 50,
            ..opt(20, 0.1)
        }
        .validate()
        .unwrap();
        assert_eq!(edges(&[query, target], &o), vec![(0, 1, 30, false)]);
    }

    #[test]
    fn exact_mode_rejects_substring_reads() {
        let reads: [&[u8]; 2] = [b"GTCAAC", b"ATTGGTCAAC"];
        let idx = build(&reads);
        let algo = OverlapAlgorithm::new(&idx, &OverlapOpt { exact: true, ..opt(4, 0.0) });
        let err = algo.overlap_read(0, reads[0]).unwrap_err();
        assert!(matches!(err.downcast_ref::<OverlapError>(), Some(OverlapError::Precondition(_))));
        let err = algo.overlap_read(1, reads[1]).unwrap_err();
        assert!(matches!(err.downcast_ref::<OverlapError>(), Some(OverlapError::Precondition(_))));
    }

    #[test]
    fn short_read_contributes_nothing() {
        let reads: [&[u8]; 2] = [b"ACG", b"ACGTTT"];
        let idx = build(&reads);
        let algo = OverlapAlgorithm::new(&idx, &opt(4, 0.0));
        let line = algo.overlap_read(0, reads[0]).unwrap();
        assert!(line.blocks.is_empty());
        assert!(line.is_substring);
    }
}
