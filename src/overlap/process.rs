use anyhow::Result;

use crate::io::asqg::{AsqgWriter, VertexRecord};
use crate::io::hits::HitWriter;
use crate::process::{PostProcessor, Processor, SequenceWorkItem};
use crate::util::dna;

use super::algorithm::OverlapAlgorithm;

/// What the discovery worker hands on for each read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlapOutput {
    pub is_substring: bool,
    pub num_blocks: usize,
}

/// Discovery worker: runs the overlap algorithm and appends to its private hit file.
pub struct OverlapProcess<'a> {
    algorithm: &'a OverlapAlgorithm<'a>,
    hits: HitWriter,
}

impl<'a> OverlapProcess<'a> {
    pub fn create(algorithm: &'a OverlapAlgorithm<'a>, hits_path: &str) -> Result<Self> {
        Ok(Self { algorithm, hits: HitWriter::create(hits_path)? })
    }

    /// Closes the hit file and returns its path.
    pub fn finish(self) -> Result<String> {
        self.hits.finish()
    }
}

impl Processor for OverlapProcess<'_> {
    type Output = OverlapOutput;

    fn process(&mut self, item: &SequenceWorkItem) -> Result<OverlapOutput> {
        let line = self.algorithm.overlap_read(item.idx, &item.record.seq)?;
        self.hits.write_line(&line)?;
        Ok(OverlapOutput { is_substring: line.is_substring, num_blocks: line.blocks.len() })
    }
}

/// Writes one vertex per read, in input order, and keeps totals.
pub struct OverlapPostProcess<'w> {
    writer: &'w mut AsqgWriter,
    pub num_reads: usize,
    pub num_substrings: usize,
    pub num_blocks: usize,
}

impl<'w> OverlapPostProcess<'w> {
    pub fn new(writer: &'w mut AsqgWriter) -> Self {
        Self { writer, num_reads: 0, num_substrings: 0, num_blocks: 0 }
    }
}

impl PostProcessor<OverlapOutput> for OverlapPostProcess<'_> {
    fn process(&mut self, item: &SequenceWorkItem, output: OverlapOutput) -> Result<()> {
        let seq = String::from_utf8_lossy(&dna::normalize_seq(&item.record.seq)).into_owned();
        self.writer.write_vertex(&VertexRecord {
            id: item.record.id.clone(),
            seq,
            substring: output.is_substring,
        })?;
        self.num_reads += 1;
        self.num_substrings += usize::from(output.is_substring);
        self.num_blocks += output.num_blocks;
        Ok(())
    }
}
