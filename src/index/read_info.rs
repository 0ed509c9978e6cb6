use anyhow::Result;

use crate::error::OverlapError;
use crate::io::reader::SeqReader;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadInfo {
    pub id: String,
    pub length: usize,
}

/// 读段序号 -> (外部 id, 长度)。只在结果解析阶段使用，构建后只读。
#[derive(Debug, Default)]
pub struct ReadInfoTable {
    reads: Vec<ReadInfo>,
}

impl ReadInfoTable {
    /// 重新扫描读段文件；读段数必须与索引中的串数一致
    pub fn from_reads_file(path: &str, expected: usize) -> Result<Self> {
        let mut reads = Vec::with_capacity(expected);
        for rec in SeqReader::open(path)? {
            let rec = rec?;
            reads.push(ReadInfo { id: rec.id, length: rec.seq.len() });
        }
        let table = Self { reads };
        table.check_count(expected)?;
        Ok(table)
    }

    pub fn from_reads(reads: Vec<ReadInfo>) -> Self {
        Self { reads }
    }

    fn check_count(&self, expected: usize) -> Result<()> {
        if self.reads.len() != expected {
            return Err(OverlapError::index(format!(
                "reads file holds {} reads but the index holds {}",
                self.reads.len(),
                expected
            ))
            .into());
        }
        Ok(())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.reads.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.reads.is_empty()
    }

    #[inline]
    pub fn get(&self, ordinal: usize) -> Option<&ReadInfo> {
        self.reads.get(ordinal)
    }
}
