//! Reference window construction.
//!
//! Input regions come from samtools-style region strings, a BED file, or
//! (when neither is given) every contig in the reference. Each region is
//! padded, sliced into fixed-length windows advancing by a step rounded to
//! multiples of 100, then the full set is sorted by reference coordinate and
//! assigned dense indices that drive the ordered output flush.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use crate::error::{McError, Result};
use crate::reference::ReferenceReader;

/// One padded genomic interval, processed independently by a worker.
#[derive(Debug, Clone, Default)]
pub struct RefWindow {
    chrom: String,
    start: i64,
    end: i64,
    seq: Vec<u8>,
    window_index: usize,
}

impl RefWindow {
    pub fn new(chrom: impl Into<String>, start: i64, end: i64) -> Self {
        RefWindow {
            chrom: chrom.into(),
            start,
            end,
            seq: Vec::new(),
            window_index: 0,
        }
    }

    pub fn chrom(&self) -> &str {
        &self.chrom
    }

    /// 0-based inclusive start.
    pub fn start(&self) -> i64 {
        self.start
    }

    /// 0-based exclusive end.
    pub fn end(&self) -> i64 {
        self.end
    }

    pub fn length(&self) -> i64 {
        self.end - self.start
    }

    pub fn seq(&self) -> &[u8] {
        &self.seq
    }

    pub fn set_seq(&mut self, seq: Vec<u8>) {
        self.seq = seq;
    }

    pub fn window_index(&self) -> usize {
        self.window_index
    }

    /// Samtools-style 1-based region string, for logs.
    pub fn region_string(&self) -> String {
        format!("{}:{}-{}", self.chrom, self.start + 1, self.end)
    }
}

/// Builds the sorted, dense-indexed window list for one run.
pub struct WindowBuilder<R: ReferenceReader> {
    ref_rdr: R,
    region_padding: u32,
    window_length: u32,
    pct_overlap: u32,
    input_regions: Vec<RefWindow>,
}

impl<R: ReferenceReader> WindowBuilder<R> {
    pub fn new(ref_rdr: R, region_padding: u32, window_length: u32, pct_overlap: u32) -> Self {
        WindowBuilder {
            ref_rdr,
            region_padding,
            window_length,
            pct_overlap,
            input_regions: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.input_regions.is_empty()
    }

    pub fn num_regions(&self) -> usize {
        self.input_regions.len()
    }

    pub fn add_samtools_region(&mut self, region_str: &str) -> Result<()> {
        let region = parse_region(region_str)?;
        self.input_regions.push(region);
        Ok(())
    }

    pub fn add_bed_regions<P: AsRef<Path>>(&mut self, bed: P) -> Result<()> {
        let mut regions = parse_bed(bed)?;
        self.input_regions.append(&mut regions);
        Ok(())
    }

    /// Use every reference contig as an input region.
    pub fn add_all_ref_contigs(&mut self) {
        for ctg in self.ref_rdr.contigs() {
            self.input_regions
                .push(RefWindow::new(ctg.name.clone(), 0, ctg.length));
        }
    }

    /// Slice all input regions into windows, fetch their sequences, sort by
    /// (contig ordinal, start, end) and assign dense indices.
    pub fn build_windows(
        mut self,
        contig_ids: &HashMap<String, i64>,
        skip_trunc_seqs: bool,
    ) -> Result<Vec<Arc<RefWindow>>> {
        if self.input_regions.is_empty() {
            return Err(McError::FailedPrecondition(
                "no input regions provided to build windows".to_string(),
            ));
        }

        let step_size = step_size(self.pct_overlap, self.window_length);
        if step_size <= 0 {
            return Err(McError::InvalidArgument(format!(
                "pct-overlap {} leaves a zero window step",
                self.pct_overlap
            )));
        }

        let mut results: Vec<RefWindow> = Vec::new();
        let input_regions = std::mem::take(&mut self.input_regions);

        for region in &input_regions {
            if !contig_ids.contains_key(region.chrom()) {
                return Err(McError::InvalidArgument(format!(
                    "contig {} is not present in reference",
                    region.chrom()
                )));
            }

            let ctg_len = self.ref_rdr.contig_length(region.chrom())?;
            let padded = self.pad_window(region, ctg_len);

            if padded.length() <= i64::from(self.window_length) {
                let seq =
                    self.ref_rdr
                        .region_sequence(padded.chrom(), padded.start(), padded.end())?;
                let mut window = padded;
                window.set_seq(seq);
                results.push(window);
                continue;
            }

            let mut curr_start = padded.start();
            // An open-ended region means "to the end of the contig"; an
            // explicit end past the contig is a user mistake handled below.
            let max_window_pos = if region.end() == i64::MAX {
                ctg_len
            } else {
                region.end()
            };

            while curr_start < max_window_pos {
                let curr_end = curr_start + i64::from(self.window_length);
                let mut window = RefWindow::new(region.chrom(), curr_start, curr_end);

                match self
                    .ref_rdr
                    .region_sequence(window.chrom(), curr_start, curr_end)
                {
                    Ok(seq) => {
                        window.set_seq(seq);
                        results.push(window);
                    }
                    Err(err) if err.is_failed_precondition() && skip_trunc_seqs => {
                        // Every later start on this region is also past the
                        // contig end.
                        log::warn!(
                            "Skipping window {} with truncated reference sequence",
                            window.region_string()
                        );
                        break;
                    }
                    Err(err) => return Err(err),
                }
                curr_start += step_size;
            }
        }

        results.sort_by(|a, b| {
            (contig_ids[a.chrom()], a.start(), a.end()).cmp(&(
                contig_ids[b.chrom()],
                b.start(),
                b.end(),
            ))
        });

        // Dense 0..N-1 indices, assigned with a plain running counter.
        Ok(results
            .into_iter()
            .enumerate()
            .map(|(idx, mut window)| {
                window.window_index = idx;
                Arc::new(window)
            })
            .collect())
    }

    /// Extend both ends by the configured padding, clamped to the contig.
    fn pad_window(&self, window: &RefWindow, ctg_len: i64) -> RefWindow {
        let padding = i64::from(self.region_padding);
        let start = window.start();
        let end = window.end();

        let padded_start = if start < padding { 0 } else { start - padding };
        let padded_end = if end >= ctg_len || ctg_len - end < padding {
            ctg_len
        } else {
            end + padding
        };
        RefWindow::new(window.chrom(), padded_start, padded_end)
    }
}

/// Step between window starts: `(100 - pct) / 100 * window_length`, rounded
/// to a multiple of 100 so nearby overlap percentages produce identical
/// tilings.
pub fn step_size(pct_overlap: u32, window_length: u32) -> i64 {
    let raw = (f64::from(100 - pct_overlap) / 100.0) * f64::from(window_length);
    ((raw / 100.0).round() * 100.0) as i64
}

/// Parse a samtools-style region string: `name`, `name:start` or
/// `name:start-end`, with 1-based inclusive coordinates.
pub fn parse_region(region_str: &str) -> Result<RefWindow> {
    let tokens: Vec<&str> = region_str.split([':', '-']).collect();
    if tokens.is_empty() || tokens.len() > 3 || tokens[0].is_empty() {
        return Err(McError::InvalidArgument(format!(
            "invalid samtools region string: {}",
            region_str
        )));
    }

    let mut win_start: i64 = 0;
    let mut win_end: i64 = i64::MAX;

    if tokens.len() >= 2 {
        let raw: u64 = tokens[1].parse().map_err(|_| {
            McError::InvalidArgument(format!("invalid samtools region string: {}", region_str))
        })?;
        win_start = (raw as i64 - 1).max(0);
    }

    if tokens.len() == 3 {
        let raw: u64 = tokens[2].parse().map_err(|_| {
            McError::InvalidArgument(format!("invalid samtools region string: {}", region_str))
        })?;
        win_end = raw as i64 - 1;
    }

    Ok(RefWindow::new(tokens[0], win_start, win_end))
}

/// Parse a 3-column BED file with 0-based half-open coordinates. Blank lines
/// are skipped; any other column count is an error.
pub fn parse_bed<P: AsRef<Path>>(bed: P) -> Result<Vec<RefWindow>> {
    let reader = BufReader::new(File::open(bed.as_ref())?);
    let mut results = Vec::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let tokens: Vec<&str> = line.split('\t').filter(|t| !t.is_empty()).collect();
        if tokens.len() != 3 {
            return Err(McError::InvalidArgument(format!(
                "invalid bed line with {} columns at line num {}",
                tokens.len(),
                line_num + 1
            )));
        }

        let start: i64 = tokens[1]
            .parse()
            .map_err(|_| McError::Internal(format!("could not parse bed line: {}", line)))?;
        let end: i64 = tokens[2]
            .parse()
            .map_err(|_| McError::Internal(format!("could not parse bed line: {}", line)))?;

        results.push(RefWindow::new(tokens[0], start, end));
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_region_full() {
        let w = parse_region("chr1:100-200").unwrap();
        assert_eq!(w.chrom(), "chr1");
        assert_eq!(w.start(), 99);
        assert_eq!(w.end(), 199);
    }

    #[test]
    fn test_parse_region_open_end() {
        let w = parse_region("chr1:50").unwrap();
        assert_eq!((w.chrom(), w.start(), w.end()), ("chr1", 49, i64::MAX));
    }

    #[test]
    fn test_parse_region_whole_contig() {
        let w = parse_region("chrX").unwrap();
        assert_eq!((w.chrom(), w.start(), w.end()), ("chrX", 0, i64::MAX));
    }

    #[test]
    fn test_parse_region_rejects_garbage() {
        assert!(parse_region(":").is_err());
        assert!(parse_region("chr1:a-b").is_err());
        assert!(parse_region("chr1:1-2-3").is_err());
    }

    #[test]
    fn test_parse_region_clamps_start() {
        let w = parse_region("chr1:0-10").unwrap();
        assert_eq!(w.start(), 0);
    }

    #[test]
    fn test_step_size_rounds_to_hundreds() {
        assert_eq!(step_size(0, 600), 600);
        assert_eq!(step_size(50, 600), 300);
        assert_eq!(step_size(25, 600), 500);
        assert_eq!(step_size(99, 600), 0);
    }

    #[test]
    fn test_step_size_is_multiple_of_100() {
        for pct in 0..100 {
            for len in [100u32, 500, 600, 1000, 2500] {
                let step = step_size(pct, len);
                assert!(step >= 0);
                assert_eq!(step % 100, 0, "pct={} len={}", pct, len);
            }
        }
    }

    #[test]
    fn test_region_string_is_one_based() {
        let w = RefWindow::new("chr2", 99, 199);
        assert_eq!(w.region_string(), "chr2:100-199");
    }
}
