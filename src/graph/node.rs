//! Vertex of the colored de Bruijn graph.
//!
//! A node owns one canonical word plus parallel per-base annotation slabs
//! and a deduplicating edge set. The identity assigned at construction never
//! changes; chain compaction rewrites the sequence and slabs in place.

use std::collections::BTreeSet;

use crate::graph::barcodes::BarcodeSet;
use crate::graph::covs::NodeCov;
use crate::graph::edge::{Edge, EdgeKind, Strand, ALL_EDGE_KINDS};
use crate::graph::haplotypes::NodeHP;
use crate::graph::labels::{KmerLabel, NodeLabel, SampleLabel};
use crate::graph::quals::NodeQual;
use crate::graph::{ReadInfo, MOCK_SINK_ID, MOCK_SOURCE_ID};
use crate::kmer::{BuddyPosition, Kmer, Orientation};
use crate::utils::rev_comp;

#[derive(Debug, Clone)]
pub struct Node {
    mer: Kmer,
    id: u64,
    edge_set: BTreeSet<Edge>,
    ordered_edges: Vec<Edge>,
    num_mock_edges: usize,
    num_self_edges: usize,
    pub quals: NodeQual,
    pub covs: NodeCov,
    pub labels: NodeLabel,
    pub bx: BarcodeSet,
    pub hp: NodeHP,
}

impl Node {
    pub fn new(mer: Kmer) -> Self {
        let id = mer.id();
        let len = mer.len();
        Node {
            mer,
            id,
            edge_set: BTreeSet::new(),
            ordered_edges: Vec::new(),
            num_mock_edges: 0,
            num_self_edges: 0,
            quals: NodeQual::new(len),
            covs: NodeCov::new(len),
            labels: NodeLabel::new(len),
            bx: BarcodeSet::new(),
            hp: NodeHP::new(),
        }
    }

    /// Sentinel vertex with a reserved identity and no sequence.
    pub fn mock(id: u64) -> Self {
        debug_assert!(id == MOCK_SOURCE_ID || id == MOCK_SINK_ID);
        let mut node = Node::new(Kmer::empty());
        node.id = id;
        node
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn length(&self) -> usize {
        self.mer.len()
    }

    pub fn seq(&self) -> &[u8] {
        self.mer.seq()
    }

    /// Stored sequence as seen when traversing the node on `dir`.
    pub fn oriented_seq(&self, dir: Strand) -> Vec<u8> {
        match dir {
            Strand::Fwd => self.mer.seq().to_vec(),
            Strand::Rev => rev_comp(self.mer.seq()),
        }
    }

    pub fn orientation(&self) -> Orientation {
        self.mer.orientation()
    }

    pub fn is_mock(&self) -> bool {
        self.id == MOCK_SOURCE_ID || self.id == MOCK_SINK_ID
    }

    pub fn is_source(&self) -> bool {
        self.id == MOCK_SOURCE_ID
    }

    pub fn is_sink(&self) -> bool {
        self.id == MOCK_SINK_ID
    }

    // ------------------------------------------------------------------
    // Edge set
    // ------------------------------------------------------------------

    /// Insert an edge; duplicates leave the set and all counters untouched.
    pub fn emplace_edge(&mut self, dst_id: u64, kind: EdgeKind) {
        let edge = Edge::new(dst_id, kind);
        if self.edge_set.insert(edge) {
            if dst_id == MOCK_SOURCE_ID || dst_id == MOCK_SINK_ID {
                self.num_mock_edges += 1;
            }
            if dst_id == self.id {
                self.num_self_edges += 1;
            }
            self.ordered_edges.push(edge);
            self.ordered_edges.sort_unstable();
        }
    }

    /// Remove a single edge; removing a non-existent edge is a no-op.
    pub fn erase_edge(&mut self, dst_id: u64, kind: EdgeKind) {
        let edge = Edge::new(dst_id, kind);
        if self.edge_set.remove(&edge) {
            if dst_id == MOCK_SOURCE_ID || dst_id == MOCK_SINK_ID {
                self.num_mock_edges -= 1;
            }
            if dst_id == self.id {
                self.num_self_edges -= 1;
            }
            self.ordered_edges.clear();
            self.ordered_edges.extend(self.edge_set.iter().copied());
        }
    }

    /// Remove all four kinds of edges to `dst_id`.
    pub fn erase_edges_to(&mut self, dst_id: u64) {
        for kind in ALL_EDGE_KINDS {
            self.erase_edge(dst_id, kind);
        }
    }

    pub fn clear_edges(&mut self) {
        self.edge_set.clear();
        self.ordered_edges.clear();
        self.num_mock_edges = 0;
        self.num_self_edges = 0;
    }

    pub fn has_connection(&self, dst_id: u64) -> bool {
        ALL_EDGE_KINDS
            .iter()
            .any(|&kind| self.edge_set.contains(&Edge::new(dst_id, kind)))
    }

    pub fn has_self_loop(&self) -> bool {
        self.num_self_edges > 0
    }

    /// Sorted edges, for deterministic iteration.
    pub fn ordered_edges(&self) -> &[Edge] {
        &self.ordered_edges
    }

    pub fn num_mock_edges(&self) -> usize {
        self.num_mock_edges
    }

    pub fn num_self_edges(&self) -> usize {
        self.num_self_edges
    }

    /// Edges excluding sentinel anchors.
    pub fn num_edges(&self) -> usize {
        self.edge_set.len() - self.num_mock_edges
    }

    /// Edges leaving on `direction`, excluding sentinel anchors.
    pub fn num_edges_dir(&self, direction: Strand) -> usize {
        self.edge_set
            .iter()
            .filter(|e| {
                e.src_dir() == direction
                    && e.dst_id() != MOCK_SOURCE_ID
                    && e.dst_id() != MOCK_SINK_ID
            })
            .count()
    }

    // ------------------------------------------------------------------
    // Annotation updates
    // ------------------------------------------------------------------

    /// Push one read's Phred qualities aligned to the node's bases.
    pub fn update_qual(&mut self, quals: &[u8]) {
        self.quals.push(quals);
    }

    /// Record an observed sample label at every base.
    pub fn update_label(&mut self, label: KmerLabel) {
        self.labels.push(label);
    }

    /// Credit coverage for one read; in linked-read mode the credit is the
    /// number of distinct barcodes seen rather than the raw read count.
    pub fn update_cov_info(&mut self, read: &ReadInfo, min_base_qual: u8, linked_reads: bool) {
        let bq_pass = self.quals.high_qual_positions(f64::from(min_base_qual));
        if linked_reads {
            let count = self.bx.count(read.label, read.strand);
            self.covs
                .update_by_barcode_count(count, read.label, read.strand, &bq_pass);
        } else {
            self.covs.update(read.label, read.strand, &bq_pass);
        }
    }

    /// Record haplotype support, at most once per (sample, barcode).
    pub fn update_hp_info(&mut self, read: &ReadInfo, min_base_qual: u8) {
        let bq_pass = self.quals.high_qual_positions(f64::from(min_base_qual));
        if self.hp.is_empty() {
            self.hp = NodeHP::from_cov_geometry(&self.covs);
        }
        if let Some(barcode) = &read.barcode {
            if self.bx.is_missing(read.label, barcode) {
                self.bx.add(read.label, read.strand, barcode);
                self.hp.update(read.haplotype, read.label, &bq_pass);
            }
        }
    }

    pub fn total_sample_count(&self) -> u16 {
        self.sample_count(SampleLabel::Tumor)
            .saturating_add(self.sample_count(SampleLabel::Normal))
    }

    pub fn sample_count(&self, label: SampleLabel) -> u16 {
        self.covs.total_cov(label)
    }

    // ------------------------------------------------------------------
    // Chain compaction
    // ------------------------------------------------------------------

    /// The (up to two) neighbors that qualify for a buddy merge from this
    /// node's side: no self-loop and exactly two non-sentinel edges.
    pub fn find_mergeable_neighbours(&self) -> Vec<Edge> {
        if self.is_mock() || self.num_self_edges != 0 {
            return Vec::new();
        }

        let real: Vec<Edge> = self
            .ordered_edges
            .iter()
            .filter(|e| e.dst_id() != MOCK_SOURCE_ID && e.dst_id() != MOCK_SINK_ID)
            .copied()
            .collect();

        if real.len() != 2 {
            return Vec::new();
        }
        real
    }

    /// True iff `buddy` overlaps this node by `k - 1` bases at `position`,
    /// accounting for the relative orientation of the two stored sequences.
    pub fn can_merge(&self, buddy: &Node, position: BuddyPosition, k: usize) -> bool {
        if self.is_mock() || buddy.is_mock() {
            return false;
        }
        let reverse_buddy = buddy.orientation() != self.orientation();
        self.mer.can_merge_kmers(&buddy.mer, position, reverse_buddy, k)
    }

    /// Absorb `buddy` at `position`. Everything except edges is merged; the
    /// compactor rewires edges afterwards.
    pub fn merge_buddy(&mut self, buddy: &Node, position: BuddyPosition, k: usize) {
        let reverse_buddy = buddy.orientation() != self.orientation();

        // Haplotype slabs must be materialized against the pre-merge
        // coverage geometry so base dimensions line up.
        let merge_hp = !self.hp.is_empty() || !buddy.hp.is_empty();
        if merge_hp && self.hp.is_empty() {
            self.hp = NodeHP::from_cov_geometry(&self.covs);
        }
        let buddy_hp = if merge_hp && buddy.hp.is_empty() {
            Some(NodeHP::from_cov_geometry(&buddy.covs))
        } else {
            None
        };

        self.mer.merge_buddy(&buddy.mer, position, reverse_buddy, k);
        self.quals
            .merge_buddy(&buddy.quals, position, reverse_buddy, k);
        self.covs
            .merge_buddy(&buddy.covs, position, reverse_buddy, k);
        self.labels
            .merge_buddy(&buddy.labels, position, reverse_buddy, k);

        if !self.bx.is_empty() || !buddy.bx.is_empty() {
            self.bx.merge(&buddy.bx);
        }

        if merge_hp {
            let other = buddy_hp.as_ref().unwrap_or(&buddy.hp);
            self.hp.merge_buddy(other, position, reverse_buddy, k);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted_set(node: &Node) -> Vec<Edge> {
        let mut edges: Vec<Edge> = node.edge_set.iter().copied().collect();
        edges.sort_unstable();
        edges
    }

    #[test]
    fn test_new_node_vector_lengths_match() {
        let node = Node::new(Kmer::new(b"ACGTACGTACG"));
        assert_eq!(node.length(), 11);
        assert_eq!(node.quals.len(), 11);
        assert_eq!(node.covs.len(), 11);
        assert_eq!(node.labels.len(), 11);
        assert!(node.hp.is_empty());
    }

    #[test]
    fn test_emplace_keeps_ordered_edges_sorted() {
        let mut node = Node::new(Kmer::new(b"ACGTA"));
        node.emplace_edge(9, EdgeKind::FF);
        node.emplace_edge(3, EdgeKind::RR);
        node.emplace_edge(3, EdgeKind::FF);
        node.emplace_edge(3, EdgeKind::FF); // duplicate

        assert_eq!(node.ordered_edges().len(), 3);
        assert_eq!(sorted_set(&node), node.ordered_edges().to_vec());
        assert_eq!(node.num_edges(), 3);
    }

    #[test]
    fn test_mock_and_self_counters() {
        let mut node = Node::new(Kmer::new(b"ACGTA"));
        let own = node.id();
        node.emplace_edge(MOCK_SOURCE_ID, EdgeKind::FF);
        node.emplace_edge(MOCK_SINK_ID, EdgeKind::FF);
        node.emplace_edge(own, EdgeKind::FR);
        node.emplace_edge(42, EdgeKind::FF);

        assert_eq!(node.num_mock_edges(), 2);
        assert_eq!(node.num_self_edges(), 1);
        assert!(node.has_self_loop());
        assert_eq!(node.num_edges(), 2);
        assert_eq!(node.num_edges_dir(Strand::Fwd), 2);
        assert_eq!(node.num_edges_dir(Strand::Rev), 0);

        node.erase_edge(own, EdgeKind::FR);
        assert!(!node.has_self_loop());
        node.erase_edge(MOCK_SINK_ID, EdgeKind::FF);
        assert_eq!(node.num_mock_edges(), 1);
        assert_eq!(sorted_set(&node), node.ordered_edges().to_vec());
    }

    #[test]
    fn test_erase_missing_edge_is_noop() {
        let mut node = Node::new(Kmer::new(b"ACGTA"));
        node.emplace_edge(7, EdgeKind::FF);
        let before = node.ordered_edges().to_vec();

        node.erase_edge(7, EdgeKind::RR);
        node.erase_edge(11, EdgeKind::FF);
        assert_eq!(node.ordered_edges(), before.as_slice());
        assert_eq!(node.num_edges(), 1);
    }

    #[test]
    fn test_erase_all_kinds() {
        let mut node = Node::new(Kmer::new(b"ACGTA"));
        for kind in ALL_EDGE_KINDS {
            node.emplace_edge(5, kind);
        }
        node.emplace_edge(6, EdgeKind::FF);
        node.erase_edges_to(5);
        assert_eq!(node.num_edges(), 1);
        assert!(!node.has_connection(5));
        assert!(node.has_connection(6));
    }

    #[test]
    fn test_find_mergeable_neighbours_requires_two_real_edges() {
        let mut node = Node::new(Kmer::new(b"ACGTA"));
        node.emplace_edge(5, EdgeKind::FF);
        assert!(node.find_mergeable_neighbours().is_empty());

        node.emplace_edge(6, EdgeKind::RR);
        assert_eq!(node.find_mergeable_neighbours().len(), 2);

        // Sentinel anchors do not count toward the two.
        node.emplace_edge(MOCK_SOURCE_ID, EdgeKind::FF);
        assert_eq!(node.find_mergeable_neighbours().len(), 2);

        node.emplace_edge(7, EdgeKind::FF);
        assert!(node.find_mergeable_neighbours().is_empty());
    }

    #[test]
    fn test_self_loop_blocks_merging() {
        let mut node = Node::new(Kmer::new(b"ACGTA"));
        node.emplace_edge(5, EdgeKind::FF);
        node.emplace_edge(node.id(), EdgeKind::FR);
        assert!(node.find_mergeable_neighbours().is_empty());
    }

    #[test]
    fn test_merge_buddy_keeps_vectors_aligned() {
        let mut a = Node::new(Kmer::new(b"ACGTA"));
        let mut b = Node::new(Kmer::new(b"CGTAC"));
        a.update_qual(&[30; 5]);
        a.update_label(KmerLabel::Tumor);
        b.update_qual(&[20; 5]);
        b.update_label(KmerLabel::Normal);

        assert!(a.can_merge(&b, BuddyPosition::Back, 5));
        let a_id = a.id();
        a.merge_buddy(&b, BuddyPosition::Back, 5);

        assert_eq!(a.seq(), b"ACGTAC");
        assert_eq!(a.id(), a_id);
        assert_eq!(a.quals.len(), 6);
        assert_eq!(a.covs.len(), 6);
        assert_eq!(a.labels.len(), 6);
        assert!(a.labels.has_label(KmerLabel::Tumor));
        assert!(a.labels.has_label(KmerLabel::Normal));
    }

    #[test]
    fn test_merge_buddy_materializes_haplotypes() {
        let mut a = Node::new(Kmer::new(b"ACGTA"));
        let mut b = Node::new(Kmer::new(b"CGTAC"));
        let read = ReadInfo {
            label: SampleLabel::Tumor,
            strand: Strand::Fwd,
            barcode: Some("AACC-1".to_string()),
            haplotype: 1,
        };
        b.update_qual(&[40; 5]);
        b.update_hp_info(&read, 20);
        assert!(!b.hp.is_empty());
        assert!(a.hp.is_empty());

        a.merge_buddy(&b, BuddyPosition::Back, 5);
        assert_eq!(a.hp.len(), 6);
        assert_eq!(a.hp.support(1, SampleLabel::Tumor, 5), 1);
    }
}
