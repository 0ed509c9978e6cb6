use criterion::{black_box, criterion_group, criterion_main, Criterion};

use sga_overlap::index::interval::IndexPair;
use sga_overlap::index::{sa, ReadIndex};
use sga_overlap::overlap::algorithm::OverlapAlgorithm;
use sga_overlap::overlap::search::{max_diffs, BackwardSearch};
use sga_overlap::overlap::OverlapOpt;
use sga_overlap::util::dna;

fn make_genome(len: usize) -> Vec<u8> {
    let bases = [b'A', b'C', b'G', b'T'];
    let mut seq = Vec::with_capacity(len);
    let mut x: u32 = 42;
    for _ in 0..len {
        x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        seq.push(bases[(x >> 16) as usize % 4]);
    }
    seq
}

/// Reads tiled along a random genome every `step` bases.
fn make_reads(genome: &[u8], read_len: usize, step: usize) -> Vec<Vec<u8>> {
    (0..genome.len().saturating_sub(read_len))
        .step_by(step)
        .map(|i| genome[i..i + read_len].to_vec())
        .collect()
}

fn build_index(reads: &[Vec<u8>]) -> ReadIndex {
    let encoded: Vec<Vec<u8>> = reads.iter().map(|r| dna::encode(r)).collect();
    ReadIndex::build(&encoded, 64).unwrap()
}

fn bench_exact_search(c: &mut Criterion) {
    let reads = make_reads(&make_genome(5_000), 100, 25);
    let idx = build_index(&reads);
    let pair = IndexPair::new(&idx.fwd.fm, &idx.rev.fm);
    let engine = BackwardSearch::new(45, 0.0, 0, 0);
    let query = dna::encode(&reads[10]);

    c.bench_function("exact_search_100bp", |b| {
        b.iter(|| {
            black_box(engine.exact_matches(pair, black_box(&query)));
        })
    });
}

fn bench_approximate_search(c: &mut Criterion) {
    let reads = make_reads(&make_genome(5_000), 100, 25);
    let idx = build_index(&reads);
    let pair = IndexPair::new(&idx.fwd.fm, &idx.rev.fm);
    let engine = BackwardSearch::new(45, 0.02, 0, 0);
    let query = dna::encode(&reads[10]);
    let budget = max_diffs(query.len(), 0.02);

    c.bench_function("approximate_search_100bp_e0.02", |b| {
        b.iter(|| {
            black_box(engine.search(pair, black_box(&query), budget).unwrap());
        })
    });
}

fn bench_overlap_read(c: &mut Criterion) {
    let reads = make_reads(&make_genome(5_000), 100, 25);
    let idx = build_index(&reads);
    let opt = OverlapOpt { min_overlap: 45, ..OverlapOpt::default() };
    let algo = OverlapAlgorithm::new(&idx, &opt);

    c.bench_function("overlap_read_irreducible", |b| {
        b.iter(|| {
            black_box(algo.overlap_read(10, black_box(&reads[10])).unwrap());
        })
    });
}

fn bench_build_sa(c: &mut Criterion) {
    let genome = make_genome(10_000);
    let mut text: Vec<u32> = dna::encode(&genome).iter().map(|&b| b as u32 + 1).collect();
    text.push(0);

    c.bench_function("build_sa_10kb", |b| {
        b.iter(|| {
            black_box(sa::build_sa(black_box(&text)));
        })
    });
}

criterion_group!(
    benches,
    bench_exact_search,
    bench_approximate_search,
    bench_overlap_read,
    bench_build_sa,
);
criterion_main!(benches);
