pub mod algorithm;
pub mod block;
pub mod irreducible;
pub mod process;
pub mod resolve;
pub mod search;

use anyhow::Result;
use log::{info, warn};

use crate::error::OverlapError;
use crate::index::read_info::ReadInfoTable;
use crate::index::{check_sample_rate, ReadIndex, DEFAULT_SAMPLE_RATE};
use crate::io::asqg::{AsqgWriter, HeaderRecord};
use crate::io::reader::SeqReader;
use crate::process::{process_parallel, process_serial, work_items, DEFAULT_BATCH_SIZE};
use crate::util::default_prefix;

use algorithm::{OverlapAlgorithm, Reduction};
use process::{OverlapPostProcess, OverlapProcess};

/// Options of the `overlap` command, validated once and passed down unchanged.
#[derive(Debug, Clone)]
pub struct OverlapOpt {
    pub reads_file: String,
    pub threads: usize,
    pub min_overlap: usize,
    pub error_rate: f64,
    /// 0 = computed from the error rate; negative values clamp to 0
    pub seed_length: i32,
    /// 0 = same as the seed length; ignored unless `seed_length` is set
    pub seed_stride: i32,
    /// empty = derived from the reads file name
    pub prefix: String,
    /// empty = `<prefix>.asqg.gz`
    pub outfile: String,
    pub exhaustive: bool,
    pub exact: bool,
    pub sample_rate: u32,
    pub batch_size: usize,
}

impl Default for OverlapOpt {
    fn default() -> Self {
        Self {
            reads_file: String::new(),
            threads: 1,
            min_overlap: 45,
            error_rate: 0.0,
            seed_length: 0,
            seed_stride: 0,
            prefix: String::new(),
            outfile: String::new(),
            exhaustive: false,
            exact: false,
            sample_rate: DEFAULT_SAMPLE_RATE,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl OverlapOpt {
    /// Rejects invalid combinations and fills in defaults; returns the normalised copy.
    pub fn validate(&self) -> Result<Self> {
        let mut opt = self.clone();
        if opt.reads_file.is_empty() {
            return Err(OverlapError::config("missing reads file").into());
        }
        if opt.threads == 0 {
            return Err(OverlapError::config("thread count must be at least 1").into());
        }
        check_sample_rate(opt.sample_rate)?;
        if opt.error_rate.is_nan() || opt.error_rate >= 1.0 {
            return Err(OverlapError::config(format!("error rate must be in [0, 1), got {}", opt.error_rate)).into());
        }
        if opt.error_rate < 0.0 {
            opt.error_rate = 0.0;
        }
        if opt.min_overlap == 0 {
            return Err(OverlapError::config("minimum overlap must be at least 1").into());
        }
        if opt.exact && opt.error_rate > 0.0 {
            return Err(OverlapError::config("exact irreducibility mode requires an error rate of 0").into());
        }
        if opt.seed_length < 0 {
            opt.seed_length = 0;
        }
        if opt.seed_stride < 0 {
            opt.seed_stride = 0;
        }
        // 步长只在显式给出种子长度时生效；计算出的种子长度总是配合等长步长
        if opt.seed_length == 0 {
            opt.seed_stride = 0;
        } else if opt.seed_stride == 0 {
            opt.seed_stride = opt.seed_length;
        }
        if opt.seed_length > 0 && opt.error_rate > 0.0 {
            warn!(
                "seed length {} set explicitly; overlaps with the full error budget may be missed",
                opt.seed_length
            );
        }
        if opt.prefix.is_empty() {
            opt.prefix = default_prefix(&opt.reads_file);
        }
        if opt.outfile.is_empty() {
            opt.outfile = format!("{}.asqg.gz", opt.prefix);
        }
        opt.batch_size = opt.batch_size.max(1);
        Ok(opt)
    }

    pub fn hits_path(&self, worker: Option<usize>) -> String {
        match worker {
            Some(i) => format!("{}-thread{}.hits.gz", self.prefix, i),
            None => format!("{}.hits.gz", self.prefix),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlapSummary {
    pub reads: usize,
    pub substrings: usize,
    pub edges: usize,
    pub outfile: String,
}

/// Discovery over every read, then resolution of the hit files into graph edges.
pub fn run_overlap(opt: &OverlapOpt) -> Result<OverlapSummary> {
    let opt = opt.validate()?;

    let index = ReadIndex::load(&opt.prefix, opt.sample_rate)?;

    let mut writer = AsqgWriter::create(&opt.outfile)?;
    writer.write_header(&HeaderRecord {
        error_rate: opt.error_rate,
        min_overlap: opt.min_overlap,
        input_file: opt.reads_file.clone(),
        containments: true,
        transitive: opt.exhaustive,
    })?;

    let (processed, substrings, hit_files) = {
        let algorithm = OverlapAlgorithm::new(&index, &opt);
        if algorithm.reduction() == Reduction::Exact {
            info!("exact irreducibility mode: reads must be free of substrings");
        }
        let items = work_items(SeqReader::open(&opt.reads_file)?);
        let mut post = OverlapPostProcess::new(&mut writer);
        let (processed, hit_files) = if opt.threads == 1 {
            info!("processing serially");
            let mut worker = OverlapProcess::create(&algorithm, &opt.hits_path(None))?;
            let processed = process_serial(items, &mut worker, &mut post)?;
            (processed, vec![worker.finish()?])
        } else {
            let mut workers = (0..opt.threads)
                .map(|i| OverlapProcess::create(&algorithm, &opt.hits_path(Some(i))))
                .collect::<Result<Vec<_>>>()?;
            let processed = process_parallel(items, &mut workers, &mut post, opt.batch_size)?;
            let files = workers.into_iter().map(OverlapProcess::finish).collect::<Result<Vec<_>>>()?;
            (processed, files)
        };
        info!(
            "processed {} reads ({} substrings, {} overlap blocks)",
            post.num_reads, post.num_substrings, post.num_blocks
        );
        (processed, post.num_substrings, hit_files)
    };

    if processed != index.num_strings() {
        return Err(OverlapError::index(format!(
            "read {} sequences from '{}' but the index holds {}",
            processed,
            opt.reads_file,
            index.num_strings()
        ))
        .into());
    }

    // 发现阶段结束，FM 索引不再需要
    let (fwd_sa, rev_sa) = index.into_suffix_indices();
    let reads = ReadInfoTable::from_reads_file(&opt.reads_file, processed)?;
    let edges = resolve::convert_hits_to_asqg(&hit_files, &fwd_sa, &rev_sa, &reads, &mut writer)?;
    writer.finish()?;
    info!("wrote {} edges to {}", edges, opt.outfile);

    Ok(OverlapSummary { reads: processed, substrings, edges, outfile: opt.outfile })
}
