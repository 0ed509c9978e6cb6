//! Generic work distribution: stream reads to one or more processors and feed
//! their results to a single post-processor in input order.

use anyhow::{anyhow, bail, Result};
use log::info;

use crate::error::OverlapError;
use crate::io::SeqRecord;

pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// One read travelling through the pipeline.
#[derive(Debug, Clone)]
pub struct SequenceWorkItem {
    pub idx: usize,
    pub record: SeqRecord,
}

/// Number records in stream order.
pub fn work_items<I>(records: I) -> impl Iterator<Item = Result<SequenceWorkItem>>
where
    I: Iterator<Item = Result<SeqRecord>>,
{
    records
        .enumerate()
        .map(|(idx, rec)| rec.map(|record| SequenceWorkItem { idx, record }))
}

pub trait Processor {
    type Output: Send;

    fn process(&mut self, item: &SequenceWorkItem) -> Result<Self::Output>;
}

pub trait PostProcessor<O> {
    fn process(&mut self, item: &SequenceWorkItem, output: O) -> Result<()>;
}

/// Reference semantics: one processor, items handled in order.
pub fn process_serial<I, P, Q>(items: I, processor: &mut P, post: &mut Q) -> Result<usize>
where
    I: Iterator<Item = Result<SequenceWorkItem>>,
    P: Processor,
    Q: PostProcessor<P::Output>,
{
    let mut count = 0usize;
    for item in items {
        let item = item?;
        let output = processor.process(&item)?;
        post.process(&item, output)?;
        count += 1;
    }
    Ok(count)
}

/// Reads up to `batch_size * workers` items at a time and deals them out
/// round-robin; each processor handles its share of the batch as one job on a
/// dedicated pool thread. Outputs are handed to `post` in input order.
pub fn process_parallel<I, P, Q>(items: I, processors: &mut [P], post: &mut Q, batch_size: usize) -> Result<usize>
where
    I: Iterator<Item = Result<SequenceWorkItem>>,
    P: Processor + Send,
    Q: PostProcessor<P::Output>,
{
    let workers = processors.len();
    if workers == 0 {
        return Err(OverlapError::config("parallel processing needs at least one worker").into());
    }
    let batch_size = batch_size.max(1);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("overlap-worker-{}", i))
        .build()?;
    info!("processing with {} worker threads", workers);

    let mut items = items;
    let mut counts = vec![0usize; workers];
    let mut total_read = 0usize;
    loop {
        let mut batch = Vec::with_capacity(batch_size * workers);
        for item in items.by_ref().take(batch_size * workers) {
            batch.push(item?);
        }
        if batch.is_empty() {
            break;
        }
        total_read += batch.len();

        let mut outputs: Vec<Vec<Result<P::Output>>> = (0..workers).map(|_| Vec::new()).collect();
        let shared = &batch;
        pool.scope(|s| {
            for (w, ((processor, out), count)) in processors
                .iter_mut()
                .zip(outputs.iter_mut())
                .zip(counts.iter_mut())
                .enumerate()
            {
                s.spawn(move |_| {
                    for item in shared.iter().skip(w).step_by(workers) {
                        out.push(processor.process(item));
                        *count += 1;
                    }
                });
            }
        });

        let mut per_worker: Vec<_> = outputs.into_iter().map(Vec::into_iter).collect();
        for (k, item) in batch.iter().enumerate() {
            let output = per_worker[k % workers]
                .next()
                .ok_or_else(|| anyhow!("worker {} returned too few results", k % workers))??;
            post.process(item, output)?;
        }
    }

    let processed: usize = counts.iter().sum();
    if processed != total_read {
        bail!("workers processed {} items but {} were read", processed, total_read);
    }
    Ok(processed)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reports the read length and which thread saw it.
    struct LengthProcessor {
        seen: Vec<usize>,
    }

    impl Processor for LengthProcessor {
        type Output = usize;

        fn process(&mut self, item: &SequenceWorkItem) -> Result<usize> {
            self.seen.push(item.idx);
            if item.record.id == "bad" {
                bail!("bad record {}", item.idx);
            }
            Ok(item.record.seq.len())
        }
    }

    #[derive(Default)]
    struct Collect {
        out: Vec<(usize, usize)>,
    }

    impl PostProcessor<usize> for Collect {
        fn process(&mut self, item: &SequenceWorkItem, output: usize) -> Result<()> {
            self.out.push((item.idx, output));
            Ok(())
        }
    }

    fn records(n: usize) -> Vec<Result<SeqRecord>> {
        (0..n)
            .map(|i| Ok(SeqRecord { id: format!("r{}", i), desc: None, seq: vec![b'A'; i % 7 + 1] }))
            .collect()
    }

    #[test]
    fn parallel_matches_serial_order_and_count() {
        let mut serial_proc = LengthProcessor { seen: Vec::new() };
        let mut serial = Collect::default();
        let n = process_serial(work_items(records(53).into_iter()), &mut serial_proc, &mut serial).unwrap();
        assert_eq!(n, 53);

        for workers in [1usize, 2, 3, 8] {
            let mut procs: Vec<LengthProcessor> = (0..workers).map(|_| LengthProcessor { seen: Vec::new() }).collect();
            let mut post = Collect::default();
            let n = process_parallel(work_items(records(53).into_iter()), &mut procs, &mut post, 4).unwrap();
            assert_eq!(n, 53);
            assert_eq!(post.out, serial.out, "workers={}", workers);
            let total: usize = procs.iter().map(|p| p.seen.len()).sum();
            assert_eq!(total, 53);
            // each worker keeps its own subsequence in order
            for p in &procs {
                assert!(p.seen.windows(2).all(|w| w[0] < w[1]));
            }
        }
    }

    #[test]
    fn worker_errors_surface() {
        let mut recs = records(10);
        recs[6] = Ok(SeqRecord { id: "bad".to_string(), desc: None, seq: b"A".to_vec() });
        let mut procs: Vec<LengthProcessor> = (0..3).map(|_| LengthProcessor { seen: Vec::new() }).collect();
        let mut post = Collect::default();
        assert!(process_parallel(work_items(recs.into_iter()), &mut procs, &mut post, 2).is_err());
    }

    #[test]
    fn zero_workers_is_a_config_error() {
        let mut procs: Vec<LengthProcessor> = Vec::new();
        let mut post = Collect::default();
        let err = process_parallel(work_items(records(3).into_iter()), &mut procs, &mut post, 2).unwrap_err();
        assert!(matches!(err.downcast_ref::<OverlapError>(), Some(OverlapError::Config(_))));
    }
}
