use std::collections::HashSet;

use anyhow::Result;

use crate::error::OverlapError;
use crate::index::interval::{IndexPair, IntervalPair};
use crate::util::dna::{BASES, SENTINEL};

/// 长度为 `len` 的重叠允许的最大差异数：floor(e * len)
#[inline]
pub fn max_diffs(len: usize, error_rate: f64) -> usize {
    if error_rate <= 0.0 {
        return 0;
    }
    // 容忍浮点误差，使 0.29 * 100 这类乘积落在正确的整数上
    (error_rate * len as f64 + 1e-9).floor() as usize
}

/// 计算保证完备性的种子长度：不超过 min(m, n) 的最大 s，
/// 使得 [m, n] 内每个重叠长度 L 都有 floor(L / s) >= max_diffs(L) + 1
/// （鸽巢原理：至少一个种子无差异）。
pub fn seed_length_for(query_len: usize, min_overlap: usize, error_rate: f64) -> usize {
    let upper = min_overlap.min(query_len).max(1);
    if error_rate <= 0.0 {
        return upper;
    }
    for s in (1..=upper).rev() {
        if (min_overlap..=query_len).all(|l| l / s > max_diffs(l, error_rate)) {
            return s;
        }
    }
    1
}

/// 一次命中：`pair.primary` 为所有以查询后缀（长度 overlap_len）为前缀的读段的 `$`-行
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchHit {
    pub pair: IntervalPair,
    pub overlap_len: usize,
    pub num_diffs: usize,
}

/// 回溯搜索状态：已匹配查询 [start, end)，累计差异 diffs
#[derive(Debug, Clone, Copy)]
struct Frame {
    pair: IntervalPair,
    start: usize,
    end: usize,
    diffs: usize,
}

/// 后缀模式的反向搜索：找出所有前缀与查询后缀匹配（长度 >= min_overlap）的读段
#[derive(Debug, Clone, Copy)]
pub struct BackwardSearch {
    pub min_overlap: usize,
    pub error_rate: f64,
    /// 0 表示按查询长度自动计算
    pub seed_length: usize,
    pub seed_stride: usize,
}

impl BackwardSearch {
    pub fn new(min_overlap: usize, error_rate: f64, seed_length: usize, seed_stride: usize) -> Self {
        Self { min_overlap, error_rate, seed_length, seed_stride }
    }

    /// `budget` 为整条查询允许的差异数，不能超过误差率给出的上限
    pub fn search(&self, indices: IndexPair<'_>, query: &[u8], budget: usize) -> Result<Vec<SearchHit>> {
        let allowed = max_diffs(query.len(), self.error_rate);
        if budget > allowed {
            return Err(OverlapError::SearchBudget { budget, allowed }.into());
        }
        if budget == 0 {
            return Ok(self.exact_matches(indices, query));
        }
        Ok(self.approximate_matches(indices, query, budget))
    }

    /// 从查询末尾向左精确扩展，每个长度 >= min_overlap 处探测 `$`
    pub fn exact_matches(&self, indices: IndexPair<'_>, query: &[u8]) -> Vec<SearchHit> {
        let n = query.len();
        let mut hits = Vec::new();
        if n < self.min_overlap {
            return hits;
        }
        let mut pair = indices.full();
        for i in (0..n).rev() {
            pair = indices.extend_left(pair, query[i]);
            if pair.is_empty() {
                break;
            }
            let len = n - i;
            if len >= self.min_overlap {
                let probe = indices.extend_left(pair, SENTINEL);
                if !probe.is_empty() {
                    hits.push(SearchHit { pair: probe, overlap_len: len, num_diffs: 0 });
                }
            }
        }
        hits
    }

    fn seeds(&self, n: usize) -> (usize, usize) {
        let s = if self.seed_length > 0 {
            self.seed_length.min(n)
        } else {
            seed_length_for(n, self.min_overlap, self.error_rate)
        };
        let t = if self.seed_stride > 0 { self.seed_stride } else { s };
        (s, t)
    }

    /// 种子 + 双向扩展。种子末端位于 n, n-t, n-2t, ...；每个种子精确匹配后
    /// 先带差异向右扩展到查询末尾，再向左扩展并在每个合法长度探测 `$`。
    fn approximate_matches(&self, indices: IndexPair<'_>, query: &[u8], budget: usize) -> Vec<SearchHit> {
        let n = query.len();
        let mut hits = Vec::new();
        if n < self.min_overlap {
            return hits;
        }
        let (seed_len, stride) = self.seeds(n);
        let mut seen: HashSet<(usize, usize, usize)> = HashSet::new();
        let mut right: Vec<Frame> = Vec::new();
        let mut left: Vec<Frame> = Vec::new();

        let mut seed_end = n;
        while seed_end >= seed_len {
            let seed_start = seed_end - seed_len;
            let pair = indices.search_exact(&query[seed_start..seed_end]);
            if !pair.is_empty() {
                right.push(Frame { pair, start: seed_start, end: seed_end, diffs: 0 });
            }

            while let Some(f) = right.pop() {
                if f.end == n {
                    left.push(f);
                    continue;
                }
                for c in BASES {
                    let diffs = f.diffs + usize::from(c != query[f.end]);
                    if diffs > budget {
                        continue;
                    }
                    let pair = indices.extend_right(f.pair, c);
                    if !pair.is_empty() {
                        right.push(Frame { pair, start: f.start, end: f.end + 1, diffs });
                    }
                }
            }

            while let Some(f) = left.pop() {
                let len = n - f.start;
                if len >= self.min_overlap && f.diffs <= max_diffs(len, self.error_rate) {
                    let probe = indices.extend_left(f.pair, SENTINEL);
                    if !probe.is_empty() && seen.insert((probe.primary.lower, probe.primary.upper, len)) {
                        hits.push(SearchHit { pair: probe, overlap_len: len, num_diffs: f.diffs });
                    }
                }
                if f.start == 0 {
                    continue;
                }
                for c in BASES {
                    let diffs = f.diffs + usize::from(c != query[f.start - 1]);
                    if diffs > budget {
                        continue;
                    }
                    let pair = indices.extend_left(f.pair, c);
                    if !pair.is_empty() {
                        left.push(Frame { pair, start: f.start - 1, end: n, diffs });
                    }
                }
            }

            if seed_end < stride {
                break;
            }
            seed_end -= stride;
        }

        hits.sort_by_key(|h| (h.overlap_len, h.pair.primary.lower));
        hits
    }
}
