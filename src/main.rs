use anyhow::Result;
use clap::{Parser, Subcommand};

use sga_overlap::index::{self, DEFAULT_SAMPLE_RATE};
use sga_overlap::overlap::{self, OverlapOpt};
use sga_overlap::util::default_prefix;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "sga-overlap", author, version, about = "FM-index based read overlap discovery for string graph assembly", arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the forward and reverse FM-indices of a reads file
    Index {
        /// Reads file (FASTA/FASTQ, optionally gzipped)
        reads: String,
        /// Prefix for the index files (default: reads filename without extension)
        #[arg(short, long)]
        prefix: Option<String>,
        /// Sample every N symbols/rows; must be a power of two
        #[arg(short = 'd', long = "sample-rate", default_value_t = DEFAULT_SAMPLE_RATE)]
        sample_rate: u32,
        #[arg(short, long)]
        verbose: bool,
    },
    /// Compute pairwise overlaps between all reads and write an ASQG graph
    Overlap {
        /// Reads file the index was built from
        reads: String,
        /// Number of worker threads
        #[arg(short = 't', long = "threads", default_value_t = 1)]
        threads: usize,
        /// Minimum overlap length
        #[arg(short = 'm', long = "min-overlap", default_value_t = 45)]
        min_overlap: usize,
        /// Maximum fraction of differences in an overlap
        #[arg(short = 'e', long = "error-rate", default_value_t = 0.0)]
        error_rate: f64,
        /// Seed length for inexact search (0 = computed from error rate and minimum overlap)
        #[arg(short = 'l', long = "seed-length", default_value_t = 0, allow_negative_numbers = true)]
        seed_length: i32,
        /// Distance between seeds (0 = seed length)
        #[arg(short = 's', long = "seed-stride", default_value_t = 0, allow_negative_numbers = true)]
        seed_stride: i32,
        /// Index prefix (default: reads filename without extension)
        #[arg(short, long)]
        prefix: Option<String>,
        /// Output graph (default: <prefix>.asqg.gz)
        #[arg(short = 'o', long = "outfile")]
        outfile: Option<String>,
        /// Output all overlaps, including transitive edges
        #[arg(short = 'x', long)]
        exhaustive: bool,
        /// Index-only irreducibility check; reads must contain no substrings
        #[arg(long)]
        exact: bool,
        /// Sample rate the index was built with
        #[arg(short = 'd', long = "sample-rate", default_value_t = DEFAULT_SAMPLE_RATE)]
        sample_rate: u32,
        #[arg(short, long)]
        verbose: bool,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Index { reads, prefix, sample_rate, verbose } => {
            init_logging(verbose);
            let prefix = prefix.unwrap_or_else(|| default_prefix(&reads));
            index::run_index(&reads, &prefix, sample_rate)?;
            Ok(())
        }
        Commands::Overlap {
            reads,
            threads,
            min_overlap,
            error_rate,
            seed_length,
            seed_stride,
            prefix,
            outfile,
            exhaustive,
            exact,
            sample_rate,
            verbose,
        } => {
            init_logging(verbose);
            let opt = OverlapOpt {
                reads_file: reads,
                threads,
                min_overlap,
                error_rate,
                seed_length,
                seed_stride,
                prefix: prefix.unwrap_or_default(),
                outfile: outfile.unwrap_or_default(),
                exhaustive,
                exact,
                sample_rate,
                ..OverlapOpt::default()
            };
            let summary = overlap::run_overlap(&opt)?;
            log::info!(
                "{} reads, {} substrings, {} edges -> {}",
                summary.reads,
                summary.substrings,
                summary.edges,
                summary.outfile
            );
            Ok(())
        }
    }
}
