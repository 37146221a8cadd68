//! Bounded source-to-sink path enumeration.
//!
//! Walks the compacted graph from the source sentinel to the sink sentinel,
//! following edges whose source strand matches the current traversal
//! direction and entering each node on the strand named by the edge's
//! destination bit. Every emitted base remembers which node and stored
//! position it came from, so downstream variant extraction can query the
//! per-base coverage slabs.

use crate::graph::{Graph, Strand, MOCK_SINK_ID, MOCK_SOURCE_ID};

/// One assembled source-to-sink sequence with per-base provenance.
#[derive(Debug, Clone)]
pub struct GraphPath {
    /// Assembled nucleotides.
    pub seq: Vec<u8>,
    /// For each base: (node identity, position in the node's stored
    /// sequence).
    pub provenance: Vec<(u64, u32)>,
}

struct Frame {
    edges: Vec<(u64, Strand)>,
    next: usize,
    seq_len_before: usize,
}

/// Traversal limits; paths beyond these bounds are silently dropped.
#[derive(Debug, Clone, Copy)]
pub struct PathLimits {
    pub max_paths: usize,
    pub max_nodes: usize,
    pub max_seq_len: usize,
}

impl Default for PathLimits {
    fn default() -> Self {
        PathLimits {
            max_paths: 256,
            max_nodes: 512,
            max_seq_len: 100_000,
        }
    }
}

impl Graph {
    /// Enumerate source-to-sink paths, depth-first with deterministic edge
    /// order. Returns an empty list when the sentinels are missing or not
    /// connected.
    pub fn enumerate_paths(&self, limits: PathLimits) -> Vec<GraphPath> {
        let Some(source) = self.node(MOCK_SOURCE_ID) else {
            return Vec::new();
        };

        let k = self.k();
        let mut paths = Vec::new();
        let mut seq: Vec<u8> = Vec::new();
        let mut provenance: Vec<(u64, u32)> = Vec::new();
        let mut stack = vec![Frame {
            edges: followable(source, Strand::Fwd),
            next: 0,
            seq_len_before: 0,
        }];

        while let Some(frame) = stack.last_mut() {
            if paths.len() >= limits.max_paths {
                break;
            }
            if frame.next >= frame.edges.len() {
                let trim = frame.seq_len_before;
                seq.truncate(trim);
                provenance.truncate(trim);
                stack.pop();
                continue;
            }

            let (next_id, enter_dir) = frame.edges[frame.next];
            frame.next += 1;

            if next_id == MOCK_SOURCE_ID {
                continue;
            }
            if next_id == MOCK_SINK_ID {
                paths.push(GraphPath {
                    seq: seq.clone(),
                    provenance: provenance.clone(),
                });
                continue;
            }

            let Some(node) = self.node(next_id) else {
                continue;
            };
            if stack.len() >= limits.max_nodes {
                continue;
            }

            let oriented = node.oriented_seq(enter_dir);
            let skip = if seq.is_empty() { 0 } else { k - 1 };
            if oriented.len() < skip || seq.len() + oriented.len() - skip > limits.max_seq_len {
                continue;
            }

            let seq_len_before = seq.len();
            for (offset, &base) in oriented[skip..].iter().enumerate() {
                let oriented_pos = skip + offset;
                let stored_pos = match enter_dir {
                    Strand::Fwd => oriented_pos,
                    Strand::Rev => node.length() - 1 - oriented_pos,
                };
                seq.push(base);
                provenance.push((next_id, stored_pos as u32));
            }

            stack.push(Frame {
                edges: followable(node, enter_dir),
                next: 0,
                seq_len_before,
            });
        }

        paths
    }
}

fn followable(node: &crate::graph::Node, dir: Strand) -> Vec<(u64, Strand)> {
    node.ordered_edges()
        .iter()
        .filter(|e| e.src_dir() == dir)
        .map(|e| (e.dst_id(), e.dst_dir()))
        .collect()
}
