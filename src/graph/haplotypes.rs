//! Per-base haplotype support of a graph node.
//!
//! Counts, per base and per sample, how many reads supported haplotype 0
//! (unassigned), 1 or 2. Populated only in linked-read mode, and only once
//! per (sample, barcode) pair; the node keeps the slab empty until the first
//! update so untagged runs pay nothing.

use crate::graph::covs::NodeCov;
use crate::graph::labels::SampleLabel;
use crate::graph::slab::merge_slab;
use crate::kmer::BuddyPosition;

/// Number of tracked haplotype bins: unassigned, hap 1, hap 2.
pub const NUM_HAPLOTYPES: usize = 3;

type HpCell = [[u16; NUM_HAPLOTYPES]; 2];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeHP {
    cells: Vec<HpCell>,
}

impl NodeHP {
    /// Empty slab; acts as the identity element for merges.
    pub fn new() -> Self {
        NodeHP::default()
    }

    /// All-zero slab matching the base dimension of `covs`.
    pub fn from_cov_geometry(covs: &NodeCov) -> Self {
        NodeHP {
            cells: vec![HpCell::default(); covs.len()],
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Credit one read on `haplotype` for `label` at every base passing the
    /// quality mask.
    pub fn update(&mut self, haplotype: u8, label: SampleLabel, bq_pass: &[bool]) {
        debug_assert_eq!(bq_pass.len(), self.cells.len());
        let hp = (haplotype as usize).min(NUM_HAPLOTYPES - 1);
        let sample = label.idx();
        for (cell, &pass) in self.cells.iter_mut().zip(bq_pass) {
            if pass {
                cell[sample][hp] = cell[sample][hp].saturating_add(1);
            }
        }
    }

    pub fn support(&self, haplotype: u8, label: SampleLabel, pos: usize) -> u16 {
        let hp = (haplotype as usize).min(NUM_HAPLOTYPES - 1);
        self.cells[pos][label.idx()][hp]
    }

    pub fn merge_buddy(
        &mut self,
        buddy: &NodeHP,
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
                for sample in 0..2 {
                    for hp in 0..NUM_HAPLOTYPES {
                        own[sample][hp] = own[sample][hp].saturating_add(other[sample][hp]);
                    }
                }
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_respects_quality_mask() {
        let covs = NodeCov::new(3);
        let mut hp = NodeHP::from_cov_geometry(&covs);
        hp.update(1, SampleLabel::Tumor, &[true, false, true]);
        assert_eq!(hp.support(1, SampleLabel::Tumor, 0), 1);
        assert_eq!(hp.support(1, SampleLabel::Tumor, 1), 0);
        assert_eq!(hp.support(2, SampleLabel::Tumor, 0), 0);
    }

    #[test]
    fn test_out_of_range_haplotype_clamps_to_last_bin() {
        let covs = NodeCov::new(1);
        let mut hp = NodeHP::from_cov_geometry(&covs);
        hp.update(7, SampleLabel::Normal, &[true]);
        assert_eq!(hp.support(2, SampleLabel::Normal, 0), 1);
    }

    #[test]
    fn test_merge_sums_counts() {
        let covs = NodeCov::new(5);
        let mut a = NodeHP::from_cov_geometry(&covs);
        a.update(1, SampleLabel::Tumor, &[true; 5]);
        let mut b = NodeHP::from_cov_geometry(&covs);
        b.update(1, SampleLabel::Tumor, &[true; 5]);

        a.merge_buddy(&b, BuddyPosition::Back, false, 5);
        assert_eq!(a.len(), 6);
        assert_eq!(a.support(1, SampleLabel::Tumor, 2), 2);
        assert_eq!(a.support(1, SampleLabel::Tumor, 0), 1);
    }
}
