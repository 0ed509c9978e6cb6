use std::io::{BufReader, BufWriter};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::fm::FmIndex;
use super::{check_sample_rate, read_header, write_header};
use crate::error::OverlapError;
use crate::util::dna::SENTINEL;

const SAI_MAGIC: [u8; 4] = *b"SAI1";

/// 倍增法构建后缀数组：每轮按 (rank[i], rank[i+k]) 排序并重新编号，
/// 所有 rank 互不相同时提前结束。
/// 输入为数值化的文本；多读段集合中每条读段后跟一个互不相同的分隔符，
/// 分隔符取值小于所有碱基，因此比较总会在分隔符处终止。
pub fn build_sa(text: &[u32]) -> Vec<u32> {
    let n = text.len();
    let mut sa: Vec<usize> = (0..n).collect();
    let mut rank: Vec<i64> = text.iter().map(|&b| i64::from(b)).collect();
    let mut next = vec![0i64; n];

    let mut k = 1usize;
    while n > 1 {
        // 越过文本末尾的后缀视为更小
        let key = |i: usize| (rank[i], rank.get(i + k).copied().unwrap_or(-1));
        sa.sort_unstable_by_key(|&i| key(i));

        let mut distinct = 0i64;
        next[sa[0]] = 0;
        for w in sa.windows(2) {
            if key(w[0]) != key(w[1]) {
                distinct += 1;
            }
            next[w[1]] = distinct;
        }
        std::mem::swap(&mut rank, &mut next);

        if distinct as usize == n - 1 || k >= n {
            break;
        }
        k <<= 1;
    }

    sa.into_iter().map(|x| x as u32).collect()
}

/// 后缀数组元素：读段序号 + 读段内偏移
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SaElem {
    pub id: u32,
    pub pos: u32,
}

/// 采样后缀数组索引（位置映射）：
/// - `lexicographic[r]`：第 r 个 `$`-行属于哪条读段（行 0..num_strings 全部保存）
/// - `samples[k]`：第 `k * sample_rate` 行对应的 (读段, 偏移)
///
/// 其余行通过 LF 回溯到最近的采样行或读段起点求得。
#[derive(Debug, Serialize, Deserialize)]
pub struct SuffixArrayIndex {
    pub sample_rate: u32,
    pub lexicographic: Vec<u32>,
    pub samples: Vec<SaElem>,
}

impl SuffixArrayIndex {
    /// `sa` 为完整后缀数组（按行排列），前 `num_strings` 行必须是 `$`-行
    pub fn build(sa: &[SaElem], num_strings: usize, sample_rate: u32) -> Result<Self> {
        check_sample_rate(sample_rate)?;
        if sa.len() < num_strings {
            return Err(OverlapError::index(format!(
                "suffix array has {} rows but {} strings were declared",
                sa.len(),
                num_strings
            ))
            .into());
        }
        let lexicographic = sa[..num_strings].iter().map(|e| e.id).collect();
        let samples = sa.iter().step_by(sample_rate as usize).copied().collect();
        Ok(Self { sample_rate, lexicographic, samples })
    }

    #[inline]
    pub fn num_strings(&self) -> usize {
        self.lexicographic.len()
    }

    /// `$`-行到读段序号；非 `$`-行返回 None
    #[inline]
    pub fn read_id(&self, row: usize) -> Option<u32> {
        self.lexicographic.get(row).copied()
    }

    /// 把任意行映射回 (读段, 偏移)。
    /// LF 在读段内部循环（读段首字符的 LF 回到它自己的 `$`-行），
    /// 所以回溯步数不超过读段长度。
    pub fn locate(&self, fm: &FmIndex, row: usize) -> SaElem {
        let shift = self.sample_rate.trailing_zeros();
        let mask = (self.sample_rate - 1) as usize;
        let mut row = row;
        let mut steps = 0u32;
        loop {
            if row & mask == 0 {
                let s = self.samples[row >> shift];
                return SaElem { id: s.id, pos: s.pos + steps };
            }
            let sym = fm.bwt[row];
            if sym == SENTINEL {
                // 读段起点：其 `$` 的 LF 目标就是该读段的 `$`-行
                let id = self.lexicographic[fm.occ(SENTINEL, row) as usize];
                return SaElem { id, pos: steps };
            }
            row = fm.lf(row);
            steps += 1;
        }
    }

    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let mut f = BufWriter::new(std::fs::File::create(path)?);
        write_header(&mut f, SAI_MAGIC, self.sample_rate)?;
        bincode::serialize_into(&mut f, self)?;
        Ok(())
    }

    pub fn load_from_file(path: &str, sample_rate: u32) -> Result<Self> {
        let mut f = BufReader::new(std::fs::File::open(path)?);
        read_header(&mut f, SAI_MAGIC, sample_rate, path)?;
        let idx: Self = bincode::deserialize_from(f)
            .map_err(|e| OverlapError::index(format!("corrupt suffix array index '{}': {}", path, e)))?;
        if idx.sample_rate != sample_rate {
            return Err(OverlapError::index(format!(
                "suffix array index '{}' body sampled every {} rows, header says {}",
                path, idx.sample_rate, sample_rate
            ))
            .into());
        }
        Ok(idx)
    }
}
