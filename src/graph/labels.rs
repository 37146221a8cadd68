//! Per-base sample labels ("colors") of a graph node.

use crate::graph::slab::merge_slab;
use crate::kmer::BuddyPosition;

/// Which alignment file a read came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleLabel {
    Tumor,
    Normal,
}

impl SampleLabel {
    /// Dense index used by the coverage and haplotype slabs.
    #[inline]
    pub(crate) fn idx(self) -> usize {
        match self {
            SampleLabel::Tumor => 0,
            SampleLabel::Normal => 1,
        }
    }
}

/// Origin of a k-mer observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KmerLabel {
    Tumor,
    Normal,
    Reference,
}

impl KmerLabel {
    #[inline]
    fn bit(self) -> u8 {
        match self {
            KmerLabel::Tumor => 0b001,
            KmerLabel::Normal => 0b010,
            KmerLabel::Reference => 0b100,
        }
    }
}

/// Per-position set of observed labels, one bitmask byte per base.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeLabel {
    masks: Vec<u8>,
}

impl NodeLabel {
    pub fn new(len: usize) -> Self {
        NodeLabel {
            masks: vec![0; len],
        }
    }

    pub fn len(&self) -> usize {
        self.masks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }

    /// Record `label` at every base of the node.
    pub fn push(&mut self, label: KmerLabel) {
        let bit = label.bit();
        for mask in &mut self.masks {
            *mask |= bit;
        }
    }

    /// True iff any base carries `label`.
    pub fn has_label(&self, label: KmerLabel) -> bool {
        let bit = label.bit();
        self.masks.iter().any(|m| m & bit != 0)
    }

    /// True iff every base carries `label` and nothing else.
    pub fn is_label_only(&self, label: KmerLabel) -> bool {
        let bit = label.bit();
        !self.masks.is_empty() && self.masks.iter().all(|&m| m == bit)
    }

    /// Fraction of bases carrying `label`.
    pub fn label_ratio(&self, label: KmerLabel) -> f64 {
        if self.masks.is_empty() {
            return 0.0;
        }
        let bit = label.bit();
        let hits = self.masks.iter().filter(|&&m| m & bit != 0).count();
        hits as f64 / self.masks.len() as f64
    }

    /// Graphviz fill color used by the DOT dump.
    pub fn fill_color(&self) -> &'static str {
        let tumor = self.has_label(KmerLabel::Tumor);
        let normal = self.has_label(KmerLabel::Normal);
        match (tumor, normal) {
            (true, false) => "indianred1",
            (false, true) => "palegreen",
            (true, true) => "plum",
            (false, false) => "lightblue",
        }
    }

    pub fn merge_buddy(
        &mut self,
        buddy: &NodeLabel,
        position: BuddyPosition,
        reverse_buddy: bool,
        k: usize,
    ) {
        merge_slab(
            &mut self.masks,
            &buddy.masks,
            position,
            reverse_buddy,
            k,
            |own, other| *own |= *other,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_sets_all_positions() {
        let mut labels = NodeLabel::new(4);
        labels.push(KmerLabel::Tumor);
        assert!(labels.has_label(KmerLabel::Tumor));
        assert!(!labels.has_label(KmerLabel::Normal));
        assert!(labels.is_label_only(KmerLabel::Tumor));
        assert_eq!(labels.label_ratio(KmerLabel::Tumor), 1.0);
    }

    #[test]
    fn test_label_only_rejects_mixed() {
        let mut labels = NodeLabel::new(4);
        labels.push(KmerLabel::Tumor);
        labels.push(KmerLabel::Reference);
        assert!(!labels.is_label_only(KmerLabel::Tumor));
        assert!(labels.has_label(KmerLabel::Reference));
    }

    #[test]
    fn test_merge_unions_overlap() {
        let mut a = NodeLabel::new(5);
        a.push(KmerLabel::Tumor);
        let mut b = NodeLabel::new(5);
        b.push(KmerLabel::Normal);
        a.merge_buddy(&b, BuddyPosition::Back, false, 5);
        assert_eq!(a.len(), 6);
        assert!(a.has_label(KmerLabel::Tumor));
        assert!(a.has_label(KmerLabel::Normal));
        // First base never saw the buddy; last base never saw the original.
        assert_eq!(a.masks[0], 0b001);
        assert_eq!(a.masks[5], 0b010);
        assert_eq!(a.masks[1], 0b011);
    }
}
