//! 读段集合的双向 FM 索引。
//!
//! 对前缀 `P` 写出四个文件：`P.bwt` / `P.sai` 为正向读段的 FM 索引与采样后缀数组，
//! `P.rbwt` / `P.rsai` 为反转（不互补）读段的同样结构。

pub mod bwt;
pub mod fm;
pub mod interval;
pub mod read_info;
pub mod sa;

use std::io::{Read, Write};

use anyhow::Result;
use log::info;
use serde::{Deserialize, Serialize};

use crate::error::OverlapError;
use crate::io::reader::SeqReader;
use crate::util::dna;
use fm::{FmIndex, IndexMeta};
use sa::{SaElem, SuffixArrayIndex};

pub const DEFAULT_SAMPLE_RATE: u32 = 128;

const FORMAT_VERSION: u32 = 1;

pub const BWT_EXT: &str = "bwt";
pub const RBWT_EXT: &str = "rbwt";
pub const SAI_EXT: &str = "sai";
pub const RSAI_EXT: &str = "rsai";

#[derive(Debug, Serialize, Deserialize)]
struct FileHeader {
    magic: [u8; 4],
    version: u32,
    sample_rate: u32,
}

pub(crate) fn check_sample_rate(sample_rate: u32) -> Result<()> {
    if sample_rate == 0 || !sample_rate.is_power_of_two() {
        return Err(OverlapError::config(format!("sample rate must be a power of two, got {}", sample_rate)).into());
    }
    Ok(())
}

pub(crate) fn write_header<W: Write>(w: &mut W, magic: [u8; 4], sample_rate: u32) -> Result<()> {
    let header = FileHeader { magic, version: FORMAT_VERSION, sample_rate };
    bincode::serialize_into(w, &header)?;
    Ok(())
}

/// 读取并校验文件头。请求的采样率本身不合法是配置错误；文件与请求不一致是索引错误。
pub(crate) fn read_header<R: Read>(r: &mut R, magic: [u8; 4], sample_rate: u32, path: &str) -> Result<()> {
    check_sample_rate(sample_rate)?;
    let header: FileHeader = bincode::deserialize_from(r)
        .map_err(|e| OverlapError::index(format!("cannot read header of '{}': {}", path, e)))?;
    if header.magic != magic {
        return Err(OverlapError::index(format!("'{}' is not a {} file", path, String::from_utf8_lossy(&magic))).into());
    }
    if header.version != FORMAT_VERSION {
        return Err(OverlapError::index(format!(
            "'{}' has format version {}, expected {}",
            path, header.version, FORMAT_VERSION
        ))
        .into());
    }
    if header.sample_rate != sample_rate {
        return Err(OverlapError::index(format!(
            "'{}' was built with sample rate {} but {} was requested",
            path, header.sample_rate, sample_rate
        ))
        .into());
    }
    Ok(())
}

/// 单一方向的索引：FM 索引 + 采样后缀数组
#[derive(Debug)]
pub struct OrientedIndex {
    pub fm: FmIndex,
    pub sa: SuffixArrayIndex,
}

/// 从数值化读段（1..SIGMA）构建单一方向的索引。
///
/// 拼接文本中碱基取值 `code + n`，读段 i 之后的分隔符取值 `rank(i)`，
/// 其中 rank 按 (内容, 序号) 对读段排序。这样 `$`-行恰为前 n 行并按 rank 排列，
/// 且读段首字符的 LF 落回自己的 `$`-行。
pub fn build_oriented(reads: &[Vec<u8>], sample_rate: u32) -> Result<OrientedIndex> {
    check_sample_rate(sample_rate)?;
    let n = reads.len();
    if let Some(i) = reads.iter().position(|r| r.is_empty()) {
        return Err(OverlapError::config(format!("read {} is empty", i)).into());
    }
    let total: usize = reads.iter().map(|r| r.len() + 1).sum();
    if total + n + crate::util::dna::SIGMA > u32::MAX as usize {
        anyhow::bail!("read set too large to index ({} symbols)", total);
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| reads[a].cmp(&reads[b]).then(a.cmp(&b)));
    let mut rank = vec![0u32; n];
    for (r, &id) in order.iter().enumerate() {
        rank[id] = r as u32;
    }

    let mut text: Vec<u32> = Vec::with_capacity(total);
    let mut coords: Vec<SaElem> = Vec::with_capacity(total);
    for (id, read) in reads.iter().enumerate() {
        for (pos, &b) in read.iter().enumerate() {
            text.push(b as u32 + n as u32);
            coords.push(SaElem { id: id as u32, pos: pos as u32 });
        }
        text.push(rank[id]);
        coords.push(SaElem { id: id as u32, pos: read.len() as u32 });
    }

    let sa_text = sa::build_sa(&text);
    drop(text);
    let sa_elems: Vec<SaElem> = sa_text.iter().map(|&p| coords[p as usize]).collect();
    drop(coords);

    let bwt_arr = bwt::build_bwt(reads, &sa_elems);
    let fm = FmIndex::build(bwt_arr, n, crate::util::dna::SIGMA as u8, sample_rate)?;
    let sa = SuffixArrayIndex::build(&sa_elems, n, sample_rate)?;
    Ok(OrientedIndex { fm, sa })
}

/// 正向 + 反向两套索引
#[derive(Debug)]
pub struct ReadIndex {
    pub fwd: OrientedIndex,
    pub rev: OrientedIndex,
}

impl ReadIndex {
    pub fn build(reads: &[Vec<u8>], sample_rate: u32) -> Result<Self> {
        let fwd = build_oriented(reads, sample_rate)?;
        let reversed: Vec<Vec<u8>> = reads.iter().map(|r| r.iter().rev().copied().collect()).collect();
        let rev = build_oriented(&reversed, sample_rate)?;
        Ok(Self { fwd, rev })
    }

    #[inline]
    pub fn num_strings(&self) -> usize {
        self.fwd.fm.num_strings as usize
    }

    pub fn set_meta(&mut self, meta: IndexMeta) {
        self.fwd.fm.set_meta(meta.clone());
        self.rev.fm.set_meta(meta);
    }

    pub fn write(&self, prefix: &str) -> Result<()> {
        for (ext, fm) in [(BWT_EXT, &self.fwd.fm), (RBWT_EXT, &self.rev.fm)] {
            let path = index_path(prefix, ext);
            fm.save_to_file(&path)
                .map_err(|e| anyhow::anyhow!("cannot write index to '{}': {}", path, e))?;
        }
        for (ext, sa) in [(SAI_EXT, &self.fwd.sa), (RSAI_EXT, &self.rev.sa)] {
            let path = index_path(prefix, ext);
            sa.save_to_file(&path)
                .map_err(|e| anyhow::anyhow!("cannot write index to '{}': {}", path, e))?;
        }
        Ok(())
    }

    pub fn load(prefix: &str, sample_rate: u32) -> Result<Self> {
        check_sample_rate(sample_rate)?;
        let fwd = OrientedIndex {
            fm: FmIndex::load_from_file(&index_path(prefix, BWT_EXT), sample_rate)?,
            sa: SuffixArrayIndex::load_from_file(&index_path(prefix, SAI_EXT), sample_rate)?,
        };
        let rev = OrientedIndex {
            fm: FmIndex::load_from_file(&index_path(prefix, RBWT_EXT), sample_rate)?,
            sa: SuffixArrayIndex::load_from_file(&index_path(prefix, RSAI_EXT), sample_rate)?,
        };
        let idx = Self { fwd, rev };
        idx.check_consistency(prefix)?;
        info!(
            "loaded index '{}': {} reads, {} symbols, sample rate {}",
            prefix,
            idx.num_strings(),
            idx.fwd.fm.len(),
            sample_rate
        );
        Ok(idx)
    }

    fn check_consistency(&self, prefix: &str) -> Result<()> {
        let n = self.fwd.fm.num_strings as usize;
        let same = self.rev.fm.num_strings as usize == n
            && self.fwd.sa.num_strings() == n
            && self.rev.sa.num_strings() == n
            && self.fwd.fm.len() == self.rev.fm.len();
        if !same {
            return Err(OverlapError::index(format!(
                "forward and reverse index files for '{}' describe different read sets",
                prefix
            ))
            .into());
        }
        Ok(())
    }

    /// 发现阶段结束后只需保留位置映射
    pub fn into_suffix_indices(self) -> (SuffixArrayIndex, SuffixArrayIndex) {
        (self.fwd.sa, self.rev.sa)
    }
}

pub fn index_path(prefix: &str, ext: &str) -> String {
    format!("{}.{}", prefix, ext)
}

/// 从读段文件构建并写出四个索引文件，返回读段数
pub fn run_index(reads_file: &str, prefix: &str, sample_rate: u32) -> Result<usize> {
    check_sample_rate(sample_rate)?;
    let mut reads: Vec<Vec<u8>> = Vec::new();
    let mut total_len = 0usize;
    for rec in SeqReader::open(reads_file)? {
        let rec = rec?;
        if rec.seq.is_empty() {
            return Err(OverlapError::config(format!("read '{}' in '{}' is empty", rec.id, reads_file)).into());
        }
        total_len += rec.seq.len();
        reads.push(dna::encode(&rec.seq));
    }
    if reads.is_empty() {
        anyhow::bail!("reads file '{}' contains no sequences", reads_file);
    }
    info!("reads: {} ({} bases) from {}", reads.len(), total_len, reads_file);

    let mut idx = ReadIndex::build(&reads, sample_rate)?;
    idx.set_meta(IndexMeta {
        reads_file: Some(reads_file.to_string()),
        build_args: Some(std::env::args().collect::<Vec<_>>().join(" ")),
        build_timestamp: Some(chrono::Utc::now().to_rfc3339()),
    });
    idx.write(prefix)?;
    info!("index written: {}.{{{},{},{},{}}}", prefix, BWT_EXT, RBWT_EXT, SAI_EXT, RSAI_EXT);
    Ok(reads.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::dna;

    fn encode_all(reads: &[&[u8]]) -> Vec<Vec<u8>> {
        reads.iter().map(|r| dna::encode(r)).collect()
    }

    #[test]
    fn dollar_rows_follow_content_then_ordinal() {
        let reads = encode_all(&[b"GATT", b"ACGT", b"GATT", b"AC"]);
        let idx = build_oriented(&reads, 2).unwrap();
        assert_eq!(idx.sa.lexicographic, vec![3, 1, 0, 2]);
        for row in 0..4 {
            let read = &reads[idx.sa.lexicographic[row] as usize];
            assert_eq!(idx.fm.bwt[row], read[read.len() - 1]);
        }
    }

    #[test]
    fn lf_of_read_start_wraps_to_own_dollar_row() {
        let reads = encode_all(&[b"CCA", b"CC", b"TAC"]);
        let idx = build_oriented(&reads, 1).unwrap();
        for row in 0..idx.fm.len() {
            if idx.fm.bwt[row] == dna::SENTINEL {
                let target = idx.fm.lf(row);
                let id = idx.sa.locate(&idx.fm, row).id;
                assert_eq!(idx.sa.read_id(target), Some(id));
            }
        }
    }

    #[test]
    fn locate_matches_brute_force_for_every_row() {
        let raw: [&[u8]; 4] = [b"ACGTTGCA", b"GGATCC", b"TTTACGA", b"ACGT"];
        let reads = encode_all(&raw);
        for rate in [1u32, 2, 4, 16] {
            let idx = build_oriented(&reads, rate).unwrap();
            let mut seen = std::collections::HashSet::new();
            for row in 0..idx.fm.len() {
                let e = idx.sa.locate(&idx.fm, row);
                let read = &reads[e.id as usize];
                // 该行的后缀必须与 (读段, 偏移) 处的后缀一致：回溯 extract 验证首字符
                if (e.pos as usize) < read.len() {
                    let (l, r) = idx.fm.backward_search(&read[e.pos as usize..]).unwrap();
                    assert!(l <= row && row < r, "rate={} row={}", rate, row);
                } else {
                    assert!(row < reads.len());
                }
                assert!(seen.insert(e), "duplicate locate result {:?}", e);
            }
        }
    }

    #[test]
    fn build_rejects_empty_read() {
        let reads = encode_all(&[b"ACGT", b""]);
        let err = build_oriented(&reads, 4).unwrap_err();
        assert!(matches!(err.downcast_ref::<OverlapError>(), Some(OverlapError::Config(_))));
    }

    #[test]
    fn write_then_load_round_trips_and_checks_rate() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("reads");
        let prefix = prefix.to_str().unwrap();
        let reads = encode_all(&[b"AACCGGTT", b"CCGGTTAA", b"TTAAGGCC"]);
        let idx = ReadIndex::build(&reads, 4).unwrap();
        idx.write(prefix).unwrap();

        let loaded = ReadIndex::load(prefix, 4).unwrap();
        assert_eq!(loaded.num_strings(), 3);
        assert_eq!(loaded.fwd.fm.bwt, idx.fwd.fm.bwt);
        assert_eq!(loaded.rev.sa.lexicographic, idx.rev.sa.lexicographic);

        let err = ReadIndex::load(prefix, 8).unwrap_err();
        assert!(matches!(err.downcast_ref::<OverlapError>(), Some(OverlapError::Index(_))));
        let err = ReadIndex::load(prefix, 3).unwrap_err();
        assert!(matches!(err.downcast_ref::<OverlapError>(), Some(OverlapError::Config(_))));
    }

    #[test]
    fn load_rejects_mismatched_halves() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        let (a, b) = (a.to_str().unwrap(), b.to_str().unwrap());
        ReadIndex::build(&encode_all(&[b"ACGT"]), 4).unwrap().write(a).unwrap();
        ReadIndex::build(&encode_all(&[b"ACGT", b"GG"]), 4).unwrap().write(b).unwrap();
        std::fs::copy(index_path(b, RBWT_EXT), index_path(a, RBWT_EXT)).unwrap();
        let err = ReadIndex::load(a, 4).unwrap_err();
        assert!(matches!(err.downcast_ref::<OverlapError>(), Some(OverlapError::Index(_))));
    }
}
