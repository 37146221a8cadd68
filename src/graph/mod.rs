//! Colored de Bruijn graph built per reference window.
//!
//! Nodes are keyed by the stable identity of their canonical k-mer; edges
//! refer to neighbors by identity only, so there is no ownership between
//! vertices. Two reserved identities act as source/sink sentinels anchoring
//! path enumeration at the reference window ends.

pub mod barcodes;
pub mod compactor;
pub mod covs;
pub mod edge;
pub mod haplotypes;
pub mod labels;
pub mod node;
pub mod paths;
pub mod quals;
mod slab;

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub use edge::{Edge, EdgeKind, Strand};
pub use labels::{KmerLabel, SampleLabel};
pub use node::Node;

use crate::error::Result;
use crate::kmer::{Kmer, Orientation};

/// Reserved identity of the source sentinel.
pub const MOCK_SOURCE_ID: u64 = u64::MIN;
/// Reserved identity of the sink sentinel.
pub const MOCK_SINK_ID: u64 = u64::MAX;

/// Everything the graph needs to know about one recruited read.
#[derive(Debug, Clone)]
pub struct ReadInfo {
    pub label: SampleLabel,
    pub strand: Strand,
    pub barcode: Option<String>,
    pub haplotype: u8,
}

/// Per-window colored de Bruijn graph.
#[derive(Debug)]
pub struct Graph {
    k: usize,
    pub(crate) nodes: HashMap<u64, Node>,
}

impl Graph {
    pub fn new(k: usize) -> Self {
        Graph {
            k,
            nodes: HashMap::new(),
        }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: u64) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn node_mut(&mut self, id: u64) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// Node identities in ascending order, for reproducible iteration.
    pub fn sorted_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.nodes.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Thread `seq` through the graph: one node per canonical k-mer, one
    /// edge per consecutive pair. Windows containing non-ACGT bases break
    /// the chain. For reads, per-base qualities and coverage are credited;
    /// the reference contributes labels only.
    pub fn add_sequence(
        &mut self,
        seq: &[u8],
        label: KmerLabel,
        read: Option<(&ReadInfo, &[u8])>,
        min_base_qual: u8,
        linked_reads: bool,
    ) {
        let k = self.k;
        if seq.len() < k {
            return;
        }
        if let Some((_, quals)) = read {
            debug_assert_eq!(quals.len(), seq.len());
        }

        let mut prev: Option<(u64, Orientation)> = None;
        for i in 0..=seq.len() - k {
            let window = &seq[i..i + k];
            if !Kmer::has_canonical_bases(window) {
                prev = None;
                continue;
            }

            let kmer = Kmer::new(window);
            let orient = kmer.orientation();
            let id = kmer.id();

            let node = self.nodes.entry(id).or_insert_with(|| Node::new(kmer));
            node.update_label(label);
            if let Some((info, quals)) = read {
                let mut slice = quals[i..i + k].to_vec();
                if orient == Orientation::Reverse {
                    slice.reverse();
                }
                node.update_qual(&slice);
                if linked_reads {
                    node.update_hp_info(info, min_base_qual);
                }
                node.update_cov_info(info, min_base_qual, linked_reads);
            }

            if let Some((src_id, src_orient)) = prev {
                let kind = EdgeKind::from_orientations(src_orient, orient);
                if let Some(src) = self.nodes.get_mut(&src_id) {
                    src.emplace_edge(id, kind);
                }
                if let Some(dst) = self.nodes.get_mut(&id) {
                    dst.emplace_edge(src_id, kind.reversed());
                }
            }
            prev = Some((id, orient));
        }
    }

    /// Anchor the source sentinel at the first reference k-mer and the sink
    /// sentinel at the last one. Returns false when the reference has no
    /// clean k-mer at either end.
    pub fn anchor_reference_ends(&mut self, ref_seq: &[u8]) -> bool {
        let k = self.k;
        if ref_seq.len() < k {
            return false;
        }

        let first = (0..=ref_seq.len() - k)
            .find(|&i| Kmer::has_canonical_bases(&ref_seq[i..i + k]))
            .map(|i| Kmer::new(&ref_seq[i..i + k]));
        let last = (0..=ref_seq.len() - k)
            .rev()
            .find(|&i| Kmer::has_canonical_bases(&ref_seq[i..i + k]))
            .map(|i| Kmer::new(&ref_seq[i..i + k]));

        let (first, last) = match (first, last) {
            (Some(f), Some(l)) => (f, l),
            _ => return false,
        };

        let src_kind = EdgeKind::new(Strand::Fwd, first.orientation().into());
        let snk_kind = EdgeKind::new(last.orientation().into(), Strand::Fwd);
        let (first_id, last_id) = (first.id(), last.id());

        let source = self
            .nodes
            .entry(MOCK_SOURCE_ID)
            .or_insert_with(|| Node::mock(MOCK_SOURCE_ID));
        source.emplace_edge(first_id, src_kind);
        if let Some(anchor) = self.nodes.get_mut(&first_id) {
            anchor.emplace_edge(MOCK_SOURCE_ID, src_kind.reversed());
        }

        let sink = self
            .nodes
            .entry(MOCK_SINK_ID)
            .or_insert_with(|| Node::mock(MOCK_SINK_ID));
        sink.emplace_edge(last_id, snk_kind.reversed());
        if let Some(anchor) = self.nodes.get_mut(&last_id) {
            anchor.emplace_edge(MOCK_SINK_ID, snk_kind);
        }
        true
    }

    /// Serialize the graph as Graphviz DOT for inspection.
    pub fn write_dot<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        writeln!(out, "digraph window {{")?;
        writeln!(out, "  node [shape=box, style=filled];")?;

        for id in self.sorted_ids() {
            let node = &self.nodes[&id];
            let color = if node.is_source() {
                "cyan3"
            } else if node.is_sink() {
                "yellow2"
            } else {
                node.labels.fill_color()
            };
            let label = if node.is_mock() {
                if node.is_source() {
                    "source".to_string()
                } else {
                    "sink".to_string()
                }
            } else {
                format!("len={} cov={}", node.length(), node.total_sample_count())
            };
            writeln!(out, "  n{} [label=\"{}\", fillcolor={}];", id, label, color)?;
        }

        for id in self.sorted_ids() {
            let node = &self.nodes[&id];
            for edge in node.ordered_edges() {
                // Each connection is mirrored on both endpoints; emit once.
                if id <= edge.dst_id() {
                    writeln!(
                        out,
                        "  n{} -> n{} [label=\"{:?}\"];",
                        id,
                        edge.dst_id(),
                        edge.kind()
                    )?;
                }
            }
        }

        writeln!(out, "}}")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_sequence_builds_chain() {
        let mut graph = Graph::new(5);
        graph.add_sequence(b"TCAGGAC", KmerLabel::Reference, None, 10, false);
        // TCAGG, CAGGA, AGGAC: three distinct canonical words.
        assert_eq!(graph.num_nodes(), 3);

        let middle = Kmer::new(b"CAGGA");
        let node = graph.node(middle.id()).unwrap();
        assert_eq!(node.num_edges(), 2);
        assert!(node.labels.has_label(KmerLabel::Reference));
    }

    #[test]
    fn test_add_sequence_skips_ambiguous_bases() {
        let mut graph = Graph::new(5);
        graph.add_sequence(b"ACGTNACGT", KmerLabel::Reference, None, 10, false);
        assert_eq!(graph.num_nodes(), 0);

        graph.add_sequence(b"TCAGGNAGGAC", KmerLabel::Reference, None, 10, false);
        // Only TCAGG (left of the N) and AGGAC (right of it) are clean.
        assert_eq!(graph.num_nodes(), 2);
        let left = graph.node(Kmer::new(b"TCAGG").id()).unwrap();
        assert_eq!(left.num_edges(), 0);
    }

    #[test]
    fn test_strand_collapsing_reuses_nodes() {
        let mut graph = Graph::new(5);
        graph.add_sequence(b"TCAGGAC", KmerLabel::Reference, None, 10, false);
        let before = graph.num_nodes();
        // The reverse complement visits the same canonical nodes.
        graph.add_sequence(&crate::utils::rev_comp(b"TCAGGAC"), KmerLabel::Tumor, None, 10, false);
        assert_eq!(graph.num_nodes(), before);
    }

    #[test]
    fn test_anchor_reference_ends() {
        let mut graph = Graph::new(5);
        graph.add_sequence(b"TCAGGAC", KmerLabel::Reference, None, 10, false);
        assert!(graph.anchor_reference_ends(b"TCAGGAC"));

        let source = graph.node(MOCK_SOURCE_ID).unwrap();
        assert!(source.is_source() && source.is_mock());
        assert_eq!(source.ordered_edges().len(), 1);

        let first = graph.node(Kmer::new(b"TCAGG").id()).unwrap();
        assert_eq!(first.num_mock_edges(), 1);
        // Sentinel anchors are excluded from the real edge count.
        assert_eq!(first.num_edges(), 1);
    }
}
