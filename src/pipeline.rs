//! Parallel windowed assembly pipeline.
//!
//! The driver preloads every window onto a bounded channel, spawns N
//! micro-assembler workers, then consumes completion records. Variants are
//! flushed to the output VCF strictly in window-index order: a window is
//! flushed only once every window up to `index + B` is done, where the
//! look-ahead buffer `B` is sized so no variant discovered later can precede
//! an already-flushed record.

use std::fs;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::bounded;

use crate::assembler::MicroAssembler;
use crate::error::{McError, Result};
use crate::hts;
use crate::params::Params;
use crate::reference::{FastaReader, ReferenceReader};
use crate::utils::humanized;
use crate::variant::{build_vcf_header, VariantStore};
use crate::vcf_writer::VcfWriter;
use crate::window::{step_size, WindowBuilder};

/// Completion record pushed by a worker after each window.
#[derive(Debug, Clone)]
pub struct WindowResult {
    pub window_idx: usize,
    pub runtime: Duration,
}

/// Number of windows past the flush pointer that must be complete before
/// the pointer's window can be flushed: `ceil(3 * max(maxIndelLen,
/// windowLen) / stepSize)`.
pub fn required_buffer_windows(params: &Params) -> usize {
    let max_flank = f64::from(params.max_indel_length.max(params.window_length));
    let step = step_size(params.pct_overlap, params.window_length).max(1) as f64;
    (3.0 * max_flank / step).ceil() as usize
}

/// Tracks completed windows and decides which prefix is safe to flush.
#[derive(Debug)]
pub struct FlushTracker {
    done: Vec<bool>,
    idx_to_flush: usize,
    num_buffer: usize,
}

impl FlushTracker {
    pub fn new(num_windows: usize, num_buffer: usize) -> Self {
        FlushTracker {
            done: vec![false; num_windows],
            idx_to_flush: 0,
            num_buffer,
        }
    }

    /// Record a completion and return the window indices that are now safe
    /// to flush, in ascending order.
    pub fn mark_done(&mut self, window_idx: usize) -> Vec<usize> {
        self.done[window_idx] = true;

        let mut to_flush = Vec::new();
        while self.idx_to_flush < self.done.len()
            && self.all_done_through(self.idx_to_flush + self.num_buffer)
        {
            to_flush.push(self.idx_to_flush);
            self.idx_to_flush += 1;
        }
        to_flush
    }

    /// True iff windows `0..=last` (clamped to the window count) are done.
    fn all_done_through(&self, last: usize) -> bool {
        let end = (last + 1).min(self.done.len());
        self.done[..end].iter().all(|&d| d)
    }
}

/// Run the full pipeline: build windows, spawn workers, flush variants in
/// reference coordinate order.
pub fn run_pipeline(params: Params) -> Result<()> {
    let timer = Instant::now();
    log::info!("Starting main thread for processing the assembly pipeline");

    if let Some(dir) = &params.out_graphs_dir {
        fs::create_dir_all(dir).map_err(|e| {
            McError::Fatal(format!(
                "could not create output graphs dir {}: {}",
                dir.display(),
                e
            ))
        })?;
    }

    let normal_names = hts::sample_names(&params.normal_path)?;
    let tumor_names = hts::sample_names(&params.tumor_path)?;
    if normal_names.len() != 1 || tumor_names.len() != 1 {
        return Err(McError::InvalidArgument(format!(
            "expected exactly one sample name per alignment file, got {} (normal) and {} (tumor)",
            normal_names.len(),
            tumor_names.len()
        )));
    }

    let fasta = FastaReader::open(&params.reference_path)?;
    let contig_ids = fasta.contig_ids();
    let contigs = fasta.contigs().to_vec();

    let mut builder = WindowBuilder::new(
        fasta,
        params.region_padding,
        params.window_length,
        params.pct_overlap,
    );
    for region in &params.in_regions {
        builder.add_samtools_region(region)?;
    }
    if let Some(bed) = &params.bed_path {
        builder.add_bed_regions(bed)?;
    }
    if builder.is_empty() {
        log::info!("No input regions provided; using all reference contigs as input");
        builder.add_all_ref_contigs();
    }

    log::info!(
        "Building reference windows from {} input region(s)",
        builder.num_regions()
    );
    let windows = builder.build_windows(&contig_ids, params.skip_trunc_seqs)?;

    let mut out_vcf = VcfWriter::create(&params.out_vcf_path)?;
    let command_line: String = std::env::args().collect::<Vec<_>>().join(" ");
    out_vcf
        .write_header(&build_vcf_header(
            &normal_names[0],
            &tumor_names[0],
            &params.reference_path.display().to_string(),
            &contigs,
            &command_line,
        ))
        .map_err(|e| {
            McError::Fatal(format!(
                "could not write header to output vcf {}: {}",
                params.out_vcf_path.display(),
                e
            ))
        })?;

    if windows.is_empty() {
        log::warn!("No windows to process; wrote header only");
        return out_vcf.flush();
    }

    let num_total = windows.len();
    let num_threads = params.num_worker_threads;
    let num_buffer = required_buffer_windows(&params);
    log::info!(
        "Processing {} windows in {} microassembler thread(s)",
        num_total,
        num_threads
    );

    let (window_tx, window_rx) = bounded(num_total);
    let (result_tx, result_rx) = bounded(num_total);
    for window in &windows {
        window_tx
            .send(Arc::clone(window))
            .map_err(|_| McError::Internal("window queue closed during preload".to_string()))?;
    }
    drop(window_tx);

    let store = Arc::new(VariantStore::new(num_total));
    let params = Arc::new(params);
    let mut workers = Vec::with_capacity(num_threads);
    for _ in 0..num_threads {
        let assembler = MicroAssembler::new(
            Arc::clone(&params),
            window_rx.clone(),
            result_tx.clone(),
            Arc::clone(&store),
        )?;
        workers.push(thread::spawn(move || assembler.process()));
    }
    drop(window_rx);
    drop(result_tx);

    let mut tracker = FlushTracker::new(num_total, num_buffer);
    let mut num_done = 0usize;
    while num_done < num_total {
        let result = result_rx
            .recv()
            .map_err(|_| McError::Internal("all workers exited before completion".to_string()))?;
        num_done += 1;

        log::info!(
            "Progress: {:.3}% | {} of {} done | Window {} processed in {}",
            100.0 * num_done as f64 / num_total as f64,
            num_done,
            num_total,
            windows[result.window_idx].region_string(),
            humanized(result.runtime)
        );

        for idx in tracker.mark_done(result.window_idx) {
            if store.flush_window(idx, &mut out_vcf)? {
                log::debug!(
                    "Flushed variants from {} to output vcf",
                    windows[idx].region_string()
                );
                out_vcf.flush()?;
            }
        }
    }

    store.flush_all(&mut out_vcf)?;

    for worker in workers {
        let _ = worker.join();
    }

    log::info!(
        "Successfully completed the assembly pipeline | Runtime={}",
        humanized(timer.elapsed())
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_order_completions_flush_in_order() {
        let mut tracker = FlushTracker::new(5, 1);
        assert!(tracker.mark_done(2).is_empty());
        assert!(tracker.mark_done(0).is_empty());
        assert_eq!(tracker.mark_done(1), vec![0, 1]);
        assert!(tracker.mark_done(4).is_empty());
        assert_eq!(tracker.mark_done(3), vec![2, 3, 4]);
    }

    #[test]
    fn test_flush_sequence_is_contiguous_from_zero() {
        let order = [7usize, 3, 0, 5, 1, 6, 2, 4];
        let mut tracker = FlushTracker::new(8, 2);
        let mut flushed = Vec::new();
        for idx in order {
            flushed.extend(tracker.mark_done(idx));
        }
        assert_eq!(flushed, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn test_zero_buffer_flushes_eagerly() {
        let mut tracker = FlushTracker::new(3, 0);
        assert_eq!(tracker.mark_done(0), vec![0]);
        assert!(tracker.mark_done(2).is_empty());
        assert_eq!(tracker.mark_done(1), vec![1, 2]);
    }

    #[test]
    fn test_buffer_larger_than_run_clamps() {
        let mut tracker = FlushTracker::new(2, 100);
        assert!(tracker.mark_done(0).is_empty());
        assert_eq!(tracker.mark_done(1), vec![0, 1]);
    }

    fn buffer_params(window_length: u32, pct_overlap: u32, max_indel: u32) -> Params {
        Params {
            tumor_path: "t.bam".into(),
            normal_path: "n.bam".into(),
            reference_path: "r.fa".into(),
            out_vcf_path: "o.vcf".into(),
            bed_path: None,
            in_regions: Vec::new(),
            out_graphs_dir: None,
            num_worker_threads: 1,
            window_length,
            pct_overlap,
            max_indel_length: max_indel,
            region_padding: 250,
            kmer_length: 25,
            min_base_qual: 17,
            min_read_mapq: 10,
            min_tumor_alt: 3,
            max_normal_alt: 1,
            skip_trunc_seqs: false,
            linked_reads: false,
        }
    }

    #[test]
    fn test_required_buffer_windows() {
        // window 600, step 600: ceil(3 * 600 / 600) = 3
        assert_eq!(required_buffer_windows(&buffer_params(600, 0, 30)), 3);
        // window 600, step 100: ceil(3 * 600 / 100) = 18
        assert_eq!(required_buffer_windows(&buffer_params(600, 84, 30)), 18);
        // max indel dominates when larger than the window
        assert_eq!(required_buffer_windows(&buffer_params(600, 0, 1200)), 6);
    }
}
