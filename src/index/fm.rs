use std::io::{BufReader, BufWriter};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::{check_sample_rate, read_header, write_header};
use crate::error::OverlapError;
use crate::util::dna::{SENTINEL, SIGMA};

const FM_MAGIC: [u8; 4] = *b"FMI1";

/// 索引构建时记录的元信息
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexMeta {
    pub reads_file: Option<String>,
    pub build_args: Option<String>,
    pub build_timestamp: Option<String>,
}

/// 多串 FM 索引（秩结构）：
/// - 字母以 [0..sigma) 编码，0 为 `$`，每条读段各自以 `$` 结尾。
/// - Occ 每 `sample_rate` 个符号采样一次（块内顺扫补偿）；采样间隔必须是 2 的幂，
///   这样块号与块起点只需移位即可求得。
/// - 只保存定长整数数组，无内部指针，可在线程间只读共享。
#[derive(Debug, Serialize, Deserialize)]
pub struct FmIndex {
    pub sigma: u8,
    pub sample_rate: u32,
    pub num_strings: u32,
    /// C[i] = BWT 中字母 < i 的累计数量
    pub c: Vec<u32>,
    /// BWT 序列
    pub bwt: Vec<u8>,
    /// Occ 采样（按块存储，行优先展平）：occ_samples[block_id * sigma + c]，
    /// 记录 BWT[0..block_id * sample_rate) 中 c 的个数
    pub occ_samples: Vec<u32>,
    pub meta: IndexMeta,
}

impl FmIndex {
    pub fn build(bwt: Vec<u8>, num_strings: usize, sigma: u8, sample_rate: u32) -> Result<Self> {
        check_sample_rate(sample_rate)?;
        let sigma_us = sigma as usize;
        if sigma_us == 0 || sigma_us > SIGMA {
            return Err(OverlapError::config(format!("alphabet size must be in 1..={}, got {}", SIGMA, sigma)).into());
        }
        let n = bwt.len();

        // 计算 C 表
        let mut freq = vec![0u32; sigma_us];
        for &ch in &bwt {
            let ci = ch as usize;
            if ci >= sigma_us {
                return Err(OverlapError::index(format!("BWT symbol {} outside alphabet of size {}", ch, sigma)).into());
            }
            freq[ci] += 1;
        }
        if freq[SENTINEL as usize] as usize != num_strings {
            return Err(OverlapError::index(format!(
                "BWT holds {} terminators but {} strings were declared",
                freq[SENTINEL as usize], num_strings
            ))
            .into());
        }
        let mut c = vec![0u32; sigma_us];
        let mut acc = 0u32;
        for i in 0..sigma_us {
            c[i] = acc;
            acc += freq[i];
        }

        // 采样 Occ：块 bi 记录 [0, bi << shift) 的累计，块数覆盖 pos = n
        let shift = sample_rate.trailing_zeros();
        let num_blocks = (n >> shift) + 1;
        let mut occ_samples = vec![0u32; num_blocks * sigma_us];
        let mut running = vec![0u32; sigma_us];
        for bi in 0..num_blocks {
            occ_samples[bi * sigma_us..(bi + 1) * sigma_us].copy_from_slice(&running);
            let start = bi << shift;
            let end = ((bi + 1) << shift).min(n);
            if start < end {
                for &ch in &bwt[start..end] {
                    running[ch as usize] += 1;
                }
            }
        }

        Ok(Self {
            sigma,
            sample_rate,
            num_strings: num_strings as u32,
            c,
            bwt,
            occ_samples,
            meta: IndexMeta::default(),
        })
    }

    pub fn set_meta(&mut self, meta: IndexMeta) {
        self.meta = meta;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bwt.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bwt.is_empty()
    }

    #[inline]
    fn shift(&self) -> u32 {
        self.sample_rate.trailing_zeros()
    }

    /// 返回 BWT[0..pos) 中 c 的出现次数
    #[inline]
    pub fn occ(&self, c: u8, pos: usize) -> u32 {
        let sigma_us = self.sigma as usize;
        let bi = pos >> self.shift();
        let base = self.occ_samples[bi * sigma_us + c as usize];
        let start = bi << self.shift();
        let mut add = 0u32;
        for &ch in &self.bwt[start..pos] {
            if ch == c { add += 1; }
        }
        base + add
    }

    /// 一次扫描得到 BWT[0..pos) 中所有符号的出现次数
    #[inline]
    pub fn occ_all(&self, pos: usize) -> [u32; SIGMA] {
        let sigma_us = self.sigma as usize;
        let bi = pos >> self.shift();
        let mut counts = [0u32; SIGMA];
        counts[..sigma_us].copy_from_slice(&self.occ_samples[bi * sigma_us..(bi + 1) * sigma_us]);
        let start = bi << self.shift();
        for &ch in &self.bwt[start..pos] {
            counts[ch as usize] += 1;
        }
        counts
    }

    #[inline]
    pub fn rank_range(&self, c: u8, l: usize, r: usize) -> (usize, usize) {
        // 返回在区间 [l, r) 上扩展字符 c 后的新区间
        let c0 = self.c[c as usize] as usize;
        let nl = c0 + self.occ(c, l) as usize;
        let nr = c0 + self.occ(c, r) as usize;
        (nl, nr)
    }

    /// LF 映射：行 row 的后缀向左延长一个符号后所在的行
    #[inline]
    pub fn lf(&self, row: usize) -> usize {
        let ch = self.bwt[row];
        self.c[ch as usize] as usize + self.occ(ch, row) as usize
    }

    /// 反向搜索精确匹配，pat 已经是编码后的字母表（不应包含 0）
    pub fn backward_search(&self, pat: &[u8]) -> Option<(usize, usize)> {
        if self.bwt.is_empty() { return None; }
        let mut l = 0usize;
        let mut r = self.bwt.len();
        for &a in pat.iter().rev() {
            let (nl, nr) = self.rank_range(a, l, r);
            if nl >= nr { return None; }
            l = nl; r = nr;
        }
        Some((l, r))
    }

    /// 从某条读段的 `$`-行出发沿 LF 回溯，取出该读段（按本索引的文本方向）
    pub fn extract_read(&self, dollar_row: usize) -> Vec<u8> {
        let mut out = Vec::new();
        let mut row = dollar_row;
        loop {
            let ch = self.bwt[row];
            if ch == SENTINEL {
                break;
            }
            out.push(ch);
            row = self.lf(row);
        }
        out.reverse();
        out
    }

    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let mut f = BufWriter::new(std::fs::File::create(path)?);
        write_header(&mut f, FM_MAGIC, self.sample_rate)?;
        bincode::serialize_into(&mut f, self)?;
        Ok(())
    }

    pub fn load_from_file(path: &str, sample_rate: u32) -> Result<Self> {
        let mut f = BufReader::new(std::fs::File::open(path)?);
        read_header(&mut f, FM_MAGIC, sample_rate, path)?;
        let idx: Self = bincode::deserialize_from(f)
            .map_err(|e| OverlapError::index(format!("corrupt FM index '{}': {}", path, e)))?;
        let sigma_us = idx.sigma as usize;
        let blocks_ok = idx.sample_rate == sample_rate
            && sigma_us <= SIGMA
            && idx.c.len() == sigma_us
            && idx.occ_samples.len() == ((idx.bwt.len() >> idx.shift()) + 1) * sigma_us;
        if !blocks_ok {
            return Err(OverlapError::index(format!("FM index '{}' has inconsistent sampling tables", path)).into());
        }
        Ok(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::build_oriented;
    use crate::util::dna;

    fn build_test_fm(reads: &[&[u8]], rate: u32) -> FmIndex {
        let encoded: Vec<Vec<u8>> = reads.iter().map(|r| dna::encode(r)).collect();
        build_oriented(&encoded, rate).unwrap().fm
    }

    fn naive_occ(bwt: &[u8], c: u8, pos: usize) -> u32 {
        bwt[..pos].iter().filter(|&&x| x == c).count() as u32
    }

    #[test]
    fn occ_matches_naive_for_all_positions() {
        let fm = build_test_fm(&[b"ACGTTGCA", b"GGATCC", b"TTTACGA"], 4);
        for pos in 0..=fm.len() {
            let all = fm.occ_all(pos);
            for c in 0..dna::SIGMA as u8 {
                assert_eq!(fm.occ(c, pos), naive_occ(&fm.bwt, c, pos), "c={} pos={}", c, pos);
                assert_eq!(all[c as usize], naive_occ(&fm.bwt, c, pos));
            }
        }
    }

    #[test]
    fn backward_search_counts_occurrences_across_reads() {
        let fm = build_test_fm(&[b"ACGTACGT", b"TTACGA"], 2);
        let pat = dna::encode(b"ACG");
        let (l, r) = fm.backward_search(&pat).unwrap();
        assert_eq!(r - l, 3);
        assert!(fm.backward_search(&dna::encode(b"GGG")).is_none());
    }

    #[test]
    fn extract_read_recovers_every_read() {
        let reads: [&[u8]; 3] = [b"ACGTTGCA", b"GGATCC", b"ACGT"];
        let fm = build_test_fm(&reads, 8);
        let mut extracted: Vec<Vec<u8>> = (0..fm.num_strings as usize)
            .map(|row| dna::decode(&fm.extract_read(row)))
            .collect();
        extracted.sort();
        let mut expected: Vec<Vec<u8>> = reads.iter().map(|r| r.to_vec()).collect();
        expected.sort();
        assert_eq!(extracted, expected);
    }

    #[test]
    fn build_rejects_bad_sample_rate_and_terminator_count() {
        let err = FmIndex::build(vec![1, 0, 2], 1, dna::SIGMA as u8, 6).unwrap_err();
        assert!(matches!(err.downcast_ref::<OverlapError>(), Some(OverlapError::Config(_))));
        let err = FmIndex::build(vec![1, 0, 2], 2, dna::SIGMA as u8, 4).unwrap_err();
        assert!(matches!(err.downcast_ref::<OverlapError>(), Some(OverlapError::Index(_))));
    }

    #[test]
    fn load_rejects_mismatched_sample_rate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reads.bwt");
        let path = path.to_str().unwrap();
        let fm = build_test_fm(&[b"ACGTACGT"], 4);
        fm.save_to_file(path).unwrap();

        let loaded = FmIndex::load_from_file(path, 4).unwrap();
        assert_eq!(loaded.bwt, fm.bwt);

        let err = FmIndex::load_from_file(path, 8).unwrap_err();
        assert!(matches!(err.downcast_ref::<OverlapError>(), Some(OverlapError::Index(_))));
        let err = FmIndex::load_from_file(path, 5).unwrap_err();
        assert!(matches!(err.downcast_ref::<OverlapError>(), Some(OverlapError::Config(_))));
    }
}
