//! Run parameters shared by the driver and every worker.

use std::path::PathBuf;

use crate::error::{McError, Result};
use crate::window;

/// Validated parameters for one pipeline run. Built from the CLI surface in
/// `main.rs`; workers hold it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Params {
    pub tumor_path: PathBuf,
    pub normal_path: PathBuf,
    pub reference_path: PathBuf,
    pub out_vcf_path: PathBuf,
    pub bed_path: Option<PathBuf>,
    pub in_regions: Vec<String>,
    pub out_graphs_dir: Option<PathBuf>,

    pub num_worker_threads: usize,
    pub window_length: u32,
    pub pct_overlap: u32,
    pub max_indel_length: u32,
    pub region_padding: u32,
    pub kmer_length: usize,

    pub min_base_qual: u8,
    pub min_read_mapq: u8,
    pub min_tumor_alt: u16,
    pub max_normal_alt: u16,

    pub skip_trunc_seqs: bool,
    pub linked_reads: bool,
}

impl Params {
    /// Reject parameter combinations that cannot produce a meaningful run.
    pub fn validate(&self) -> Result<()> {
        for (path, what) in [
            (&self.tumor_path, "tumor alignment file"),
            (&self.normal_path, "normal alignment file"),
            (&self.reference_path, "reference fasta"),
        ] {
            if !path.exists() {
                return Err(McError::InvalidArgument(format!(
                    "{} {} does not exist",
                    what,
                    path.display()
                )));
            }
        }

        if let Some(bed) = &self.bed_path {
            if !bed.exists() {
                return Err(McError::InvalidArgument(format!(
                    "bed file {} does not exist",
                    bed.display()
                )));
            }
        }

        if self.window_length < 100 {
            return Err(McError::InvalidArgument(format!(
                "window length {} is too small; at least 100 is required",
                self.window_length
            )));
        }

        if self.pct_overlap >= 100 {
            return Err(McError::InvalidArgument(format!(
                "pct-overlap {} must be below 100",
                self.pct_overlap
            )));
        }

        if window::step_size(self.pct_overlap, self.window_length) <= 0 {
            return Err(McError::InvalidArgument(format!(
                "pct-overlap {} with window length {} leaves a zero window step",
                self.pct_overlap, self.window_length
            )));
        }

        if self.kmer_length % 2 == 0 {
            return Err(McError::InvalidArgument(format!(
                "kmer length {} must be odd so a word never equals its reverse complement",
                self.kmer_length
            )));
        }

        if self.kmer_length < 11 || self.kmer_length as u32 >= self.window_length {
            return Err(McError::InvalidArgument(format!(
                "kmer length {} must be in [11, window length)",
                self.kmer_length
            )));
        }

        if self.num_worker_threads == 0 {
            return Err(McError::InvalidArgument(
                "at least one worker thread is required".to_string(),
            ));
        }

        Ok(())
    }
}
