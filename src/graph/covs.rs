//! Per-base, per-sample, per-strand coverage of a graph node.
//!
//! Raw counts track every recruited read; base-quality-passing counts only
//! the positions whose aggregated quality clears the configured minimum.

use crate::graph::labels::SampleLabel;
use crate::graph::slab::merge_slab;
use crate::graph::Strand;
use crate::kmer::BuddyPosition;

/// Coverage of a single base for one sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BaseCov {
    pub fwd_raw: u16,
    pub rev_raw: u16,
    pub fwd_bq: u16,
    pub rev_bq: u16,
}

impl BaseCov {
    pub fn raw_total(&self) -> u16 {
        self.fwd_raw.saturating_add(self.rev_raw)
    }

    pub fn bq_pass_total(&self) -> u16 {
        self.fwd_bq.saturating_add(self.rev_bq)
    }

    pub fn strand_raw(&self, strand: Strand) -> u16 {
        match strand {
            Strand::Fwd => self.fwd_raw,
            Strand::Rev => self.rev_raw,
        }
    }

    fn bump(&mut self, strand: Strand, bq_pass: bool) {
        match strand {
            Strand::Fwd => {
                self.fwd_raw = self.fwd_raw.saturating_add(1);
                if bq_pass {
                    self.fwd_bq = self.fwd_bq.saturating_add(1);
                }
            }
            Strand::Rev => {
                self.rev_raw = self.rev_raw.saturating_add(1);
                if bq_pass {
                    self.rev_bq = self.rev_bq.saturating_add(1);
                }
            }
        }
    }

    fn set_strand(&mut self, strand: Strand, count: u16, bq_pass: bool) {
        match strand {
            Strand::Fwd => {
                self.fwd_raw = count;
                if bq_pass {
                    self.fwd_bq = count;
                }
            }
            Strand::Rev => {
                self.rev_raw = count;
                if bq_pass {
                    self.rev_bq = count;
                }
            }
        }
    }

    fn add(&mut self, other: &BaseCov) {
        self.fwd_raw = self.fwd_raw.saturating_add(other.fwd_raw);
        self.rev_raw = self.rev_raw.saturating_add(other.rev_raw);
        self.fwd_bq = self.fwd_bq.saturating_add(other.fwd_bq);
        self.rev_bq = self.rev_bq.saturating_add(other.rev_bq);
    }
}

/// Per-base coverage slab, one `[BaseCov; 2]` cell (tumor, normal) per base.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeCov {
    cells: Vec<[BaseCov; 2]>,
}

impl NodeCov {
    pub fn new(len: usize) -> Self {
        NodeCov {
            cells: vec![[BaseCov::default(); 2]; len],
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Credit one read on `strand` for `label`, at every base; `bq_pass`
    /// gates the quality-passing counters per position.
    pub fn update(&mut self, label: SampleLabel, strand: Strand, bq_pass: &[bool]) {
        debug_assert_eq!(bq_pass.len(), self.cells.len());
        let sample = label.idx();
        for (cell, &pass) in self.cells.iter_mut().zip(bq_pass) {
            cell[sample].bump(strand, pass);
        }
    }

    /// Linked-read credit: pin the strand counters to the number of distinct
    /// barcodes seen so amplification duplicates cannot inflate support.
    pub fn update_by_barcode_count(
        &mut self,
        count: u16,
        label: SampleLabel,
        strand: Strand,
        bq_pass: &[bool],
    ) {
        debug_assert_eq!(bq_pass.len(), self.cells.len());
        let sample = label.idx();
        for (cell, &pass) in self.cells.iter_mut().zip(bq_pass) {
            cell[sample].set_strand(strand, count, pass);
        }
    }

    pub fn base_cov(&self, label: SampleLabel, pos: usize) -> BaseCov {
        self.cells[pos][label.idx()]
    }

    pub fn base_covs(&self, label: SampleLabel) -> Vec<BaseCov> {
        let sample = label.idx();
        self.cells.iter().map(|cell| cell[sample]).collect()
    }

    /// Representative per-node read support for `label`: the maximum raw
    /// total across positions.
    pub fn total_cov(&self, label: SampleLabel) -> u16 {
        let sample = label.idx();
        self.cells
            .iter()
            .map(|cell| cell[sample].raw_total())
            .max()
            .unwrap_or(0)
    }

    pub fn strand_cov(&self, label: SampleLabel, strand: Strand) -> u16 {
        let sample = label.idx();
        self.cells
            .iter()
            .map(|cell| cell[sample].strand_raw(strand))
            .max()
            .unwrap_or(0)
    }

    /// Smallest combined tumor+normal coverage across all bases.
    pub fn min_sample_base_cov(&self, bq_pass: bool) -> u16 {
        self.cells
            .iter()
            .map(|cell| {
                if bq_pass {
                    cell[0].bq_pass_total().saturating_add(cell[1].bq_pass_total())
                } else {
                    cell[0].raw_total().saturating_add(cell[1].raw_total())
                }
            })
            .min()
            .unwrap_or(0)
    }

    pub fn merge_buddy(
        &mut self,
        buddy: &NodeCov,
        position: BuddyPosition,
        reverse_buddy: bool,
        k: usize,
    ) {
        merge_slab(
            &mut self.cells,
            &buddy.cells,
            position,
            reverse_buddy,
            k,
            |own, other| {
                own[0].add(&other[0]);
                own[1].add(&other[1]);
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_counts_raw_and_bq() {
        let mut covs = NodeCov::new(3);
        covs.update(SampleLabel::Tumor, Strand::Fwd, &[true, false, true]);
        covs.update(SampleLabel::Tumor, Strand::Rev, &[true, true, true]);
        covs.update(SampleLabel::Normal, Strand::Fwd, &[false, false, false]);

        let t0 = covs.base_cov(SampleLabel::Tumor, 0);
        assert_eq!(t0.raw_total(), 2);
        assert_eq!(t0.bq_pass_total(), 2);

        let t1 = covs.base_cov(SampleLabel::Tumor, 1);
        assert_eq!(t1.raw_total(), 2);
        assert_eq!(t1.bq_pass_total(), 1);

        let n0 = covs.base_cov(SampleLabel::Normal, 0);
        assert_eq!(n0.raw_total(), 1);
        assert_eq!(n0.bq_pass_total(), 0);

        assert_eq!(covs.total_cov(SampleLabel::Tumor), 2);
        assert_eq!(covs.min_sample_base_cov(false), 3);
        assert_eq!(covs.min_sample_base_cov(true), 1);
    }

    #[test]
    fn test_barcode_count_credit_does_not_accumulate() {
        let mut covs = NodeCov::new(2);
        covs.update_by_barcode_count(3, SampleLabel::Tumor, Strand::Fwd, &[true, true]);
        covs.update_by_barcode_count(3, SampleLabel::Tumor, Strand::Fwd, &[true, true]);
        assert_eq!(covs.base_cov(SampleLabel::Tumor, 0).fwd_raw, 3);
    }

    #[test]
    fn test_merge_sums_overlap() {
        let mut a = NodeCov::new(5);
        a.update(SampleLabel::Tumor, Strand::Fwd, &[true; 5]);
        let mut b = NodeCov::new(5);
        b.update(SampleLabel::Tumor, Strand::Fwd, &[true; 5]);
        b.update(SampleLabel::Normal, Strand::Rev, &[false; 5]);

        a.merge_buddy(&b, BuddyPosition::Back, false, 5);
        assert_eq!(a.len(), 6);
        assert_eq!(a.base_cov(SampleLabel::Tumor, 0).raw_total(), 1);
        assert_eq!(a.base_cov(SampleLabel::Tumor, 2).raw_total(), 2);
        assert_eq!(a.base_cov(SampleLabel::Normal, 5).raw_total(), 1);
    }
}
