use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;

use microcall::params::Params;
use microcall::utils::{cputime, humanized};

#[derive(Parser)]
#[command(name = "microcall")]
#[command(
    about = "Somatic variant discovery by windowed de Bruijn graph micro-assembly of tumor/normal alignments",
    long_about = None
)]
#[command(version)]
struct Cli {
    /// Tumor BAM/CRAM file (indexed)
    #[arg(long, value_name = "FILE")]
    tumor: PathBuf,

    /// Normal BAM/CRAM file (indexed)
    #[arg(long, value_name = "FILE")]
    normal: PathBuf,

    /// Reference FASTA (with .fai index)
    #[arg(long, value_name = "FILE")]
    reference: PathBuf,

    /// Output VCF path (.gz for compressed output)
    #[arg(long = "out-vcf", value_name = "FILE")]
    out_vcf: PathBuf,

    /// Samtools-style region to process, e.g. chr1:1000-2000 (repeatable)
    #[arg(long = "region", value_name = "STR")]
    regions: Vec<String>,

    /// BED file of regions to process (3 columns, 0-based half-open)
    #[arg(long, value_name = "FILE")]
    bed: Option<PathBuf>,

    /// Directory to write per-window graphs in DOT format
    #[arg(long = "out-graphs-dir", value_name = "DIR")]
    out_graphs_dir: Option<PathBuf>,

    /// Number of microassembler worker threads (default: all cores)
    #[arg(long = "num-threads", value_name = "INT")]
    num_threads: Option<usize>,

    /// Length of each assembly window in base pairs
    #[arg(long = "window-length", value_name = "INT", default_value_t = 600)]
    window_length: u32,

    /// Overlap between consecutive windows, in percent
    #[arg(long = "pct-overlap", value_name = "INT", default_value_t = 84)]
    pct_overlap: u32,

    /// Maximum indel length to report
    #[arg(long = "max-indel-length", value_name = "INT", default_value_t = 50)]
    max_indel_length: u32,

    /// Padding added to both ends of each input region
    #[arg(long = "region-pad", value_name = "INT", default_value_t = 250)]
    region_pad: u32,

    /// Odd k-mer length for graph construction
    #[arg(long = "kmer-length", value_name = "INT", default_value_t = 25)]
    kmer_length: usize,

    /// Minimum base quality for quality-passing coverage
    #[arg(long = "min-base-qual", value_name = "INT", default_value_t = 17)]
    min_base_qual: u8,

    /// Minimum read mapping quality for recruitment
    #[arg(long = "min-mapq", value_name = "INT", default_value_t = 10)]
    min_mapq: u8,

    /// Minimum tumor alt-allele support to report a variant
    #[arg(long = "min-tumor-alt", value_name = "INT", default_value_t = 3)]
    min_tumor_alt: u16,

    /// Maximum normal alt-allele support for a somatic call
    #[arg(long = "max-normal-alt", value_name = "INT", default_value_t = 1)]
    max_normal_alt: u16,

    /// Skip windows whose reference sequence is truncated instead of failing
    #[arg(long = "skip-truncated")]
    skip_truncated: bool,

    /// Linked-read mode: count support per barcode instead of per read
    #[arg(long = "linked-reads")]
    linked_reads: bool,

    /// Verbose level: 1=error, 2=warning, 3=message, 4+=debugging
    #[arg(short = 'v', long, value_name = "INT", default_value_t = 3)]
    verbosity: i32,
}

fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbosity {
        v if v <= 1 => log::LevelFilter::Error,
        2 => log::LevelFilter::Warn,
        3 => log::LevelFilter::Info,
        4 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp(None)
        .format_target(false)
        .init();

    let params = Params {
        tumor_path: cli.tumor,
        normal_path: cli.normal,
        reference_path: cli.reference,
        out_vcf_path: cli.out_vcf,
        bed_path: cli.bed,
        in_regions: cli.regions,
        out_graphs_dir: cli.out_graphs_dir,
        num_worker_threads: cli.num_threads.unwrap_or_else(num_cpus::get).max(1),
        window_length: cli.window_length,
        pct_overlap: cli.pct_overlap,
        max_indel_length: cli.max_indel_length,
        region_padding: cli.region_pad,
        kmer_length: cli.kmer_length,
        min_base_qual: cli.min_base_qual,
        min_read_mapq: cli.min_mapq,
        min_tumor_alt: cli.min_tumor_alt,
        max_normal_alt: cli.max_normal_alt,
        skip_trunc_seqs: cli.skip_truncated,
        linked_reads: cli.linked_reads,
    };

    if let Err(err) = params.validate() {
        log::error!("{}", err);
        std::process::exit(1);
    }
    log::info!("Successfully validated input command line parameters");

    let timer = Instant::now();
    if let Err(err) = microcall::run_pipeline(params) {
        log::error!("{}", err);
        std::process::exit(1);
    }

    log::info!(
        "Total runtime: {} wall, {:.3}s cpu",
        humanized(timer.elapsed()),
        cputime()
    );
}
