use anyhow::{anyhow, Result};
use log::info;

use crate::error::OverlapError;
use crate::index::read_info::ReadInfoTable;
use crate::index::sa::SuffixArrayIndex;
use crate::io::asqg::{AsqgWriter, EdgeRecord};
use crate::io::hits::{HitLine, HitReader};

use super::block::{Overlap, Strand};

/// 把一行命中记录的 `$`-行映射成读段，并按归属规则筛选：
/// 真重叠只由序号较小的一方输出；包含关系由包含者输出；完全相同的读段由序号较小者输出。
pub fn resolve_hit(
    line: &HitLine,
    fwd: &SuffixArrayIndex,
    rev: &SuffixArrayIndex,
    reads: &ReadInfoTable,
) -> Result<Vec<Overlap>> {
    let query = line.ordinal;
    let query_len = reads
        .get(query)
        .ok_or_else(|| OverlapError::HitFormat(format!("read ordinal {} out of range", query)))?
        .length;

    let mut out = Vec::new();
    for block in &line.blocks {
        let sai = if block.primary_is_forward() { fwd } else { rev };
        for row in block.interval.lower..block.interval.upper {
            let target = sai
                .read_id(row)
                .ok_or_else(|| OverlapError::HitFormat(format!("row {} is not a read start", row)))?
                as usize;
            if target == query {
                continue;
            }
            let target_len = reads
                .get(target)
                .ok_or_else(|| OverlapError::HitFormat(format!("read ordinal {} out of range", target)))?
                .length;
            let l = block.overlap_len;
            if l > query_len || l > target_len {
                return Err(OverlapError::HitFormat(format!(
                    "overlap of {} exceeds read lengths {} / {}",
                    l, query_len, target_len
                ))
                .into());
            }
            let keep = if l < query_len && l < target_len {
                query < target
            } else if l == target_len && l < query_len {
                true
            } else if l == query_len && l == target_len {
                query < target
            } else {
                // 查询被更长的读段包含，由对方输出
                false
            };
            if !keep {
                continue;
            }
            let (query_range, target_range) = block.coords(query_len, target_len);
            out.push(Overlap {
                query,
                target,
                query_range,
                target_range,
                query_len,
                target_len,
                reverse_complement: block.strand == Strand::Opposite,
                num_diffs: block.num_diffs,
            });
        }
    }
    out.sort();
    out.dedup();
    Ok(out)
}

pub fn edge_record(ov: &Overlap, reads: &ReadInfoTable) -> Result<EdgeRecord> {
    let name = |i: usize| -> Result<String> {
        reads
            .get(i)
            .map(|r| r.id.clone())
            .ok_or_else(|| anyhow!("read ordinal {} out of range", i))
    };
    Ok(EdgeRecord {
        ids: [name(ov.query)?, name(ov.target)?],
        start: [ov.query_range.0, ov.target_range.0],
        end: [ov.query_range.1 - 1, ov.target_range.1 - 1],
        len: [ov.query_len, ov.target_len],
        reverse_complement: ov.reverse_complement,
        num_diffs: ov.num_diffs,
        containment: ov.is_containment(),
    })
}

/// 依次读取每个命中文件，写出边记录，处理完即删除该文件。返回写出的边数。
pub fn convert_hits_to_asqg(
    hit_files: &[String],
    fwd: &SuffixArrayIndex,
    rev: &SuffixArrayIndex,
    reads: &ReadInfoTable,
    writer: &mut AsqgWriter,
) -> Result<usize> {
    let mut edges = 0usize;
    for path in hit_files {
        info!("parsing {}", path);
        for line in HitReader::open(path)? {
            let line = line?;
            for ov in resolve_hit(&line, fwd, rev, reads)? {
                writer.write_edge(&edge_record(&ov, reads)?)?;
                edges += 1;
            }
        }
        std::fs::remove_file(path).map_err(|e| anyhow!("cannot remove hit file '{}': {}", path, e))?;
    }
    Ok(edges)
}
