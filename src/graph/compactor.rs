//! Linear-chain compaction ("buddy merge").
//!
//! Interior nodes of a non-branching chain are collapsed pairwise until no
//! candidate remains: the surviving node absorbs its buddy's sequence and
//! per-base slabs, and the buddy's edges are re-emplaced on the survivor
//! with kinds transformed for any reverse-complementation of the buddy.

use crate::graph::{Graph, Strand};
use crate::kmer::BuddyPosition;

impl Graph {
    /// Compact every mergeable chain in the graph. Returns the number of
    /// nodes absorbed. Candidates are visited in ascending identity order so
    /// the result is reproducible; the ordering invariant of the buddy merge
    /// makes the final sequences independent of that choice.
    pub fn compress(&mut self) -> usize {
        let mut absorbed = 0;
        loop {
            let merged_this_round = self.compress_round();
            if merged_this_round == 0 {
                break;
            }
            absorbed += merged_this_round;
        }
        absorbed
    }

    fn compress_round(&mut self) -> usize {
        let mut merged = 0;
        for id in self.sorted_ids() {
            while self.try_merge_at(id) {
                merged += 1;
            }
        }
        merged
    }

    /// Absorb one qualifying buddy into `id`, if any. Returns true when a
    /// merge happened so the caller can re-examine the grown node.
    fn try_merge_at(&mut self, id: u64) -> bool {
        let k = self.k;

        let candidate = {
            let Some(node) = self.nodes.get(&id) else {
                return false;
            };
            let mut found = None;
            for edge in node.find_mergeable_neighbours() {
                let buddy_id = edge.dst_id();
                if buddy_id == id {
                    continue;
                }
                let Some(buddy) = self.nodes.get(&buddy_id) else {
                    continue;
                };
                // The merge condition is symmetric: the buddy must also be a
                // chain interior node, linked back to us.
                let buddy_neighbours = buddy.find_mergeable_neighbours();
                if !buddy_neighbours.iter().any(|e| e.dst_id() == id) {
                    continue;
                }
                let position = match edge.src_dir() {
                    Strand::Fwd => BuddyPosition::Back,
                    Strand::Rev => BuddyPosition::Front,
                };
                if !node.can_merge(buddy, position, k) {
                    continue;
                }
                found = Some((buddy_id, position));
                break;
            }
            found
        };

        let Some((buddy_id, position)) = candidate else {
            return false;
        };
        let Some(buddy) = self.nodes.remove(&buddy_id) else {
            return false;
        };

        let reverse_buddy = {
            let Some(node) = self.nodes.get_mut(&id) else {
                return false;
            };
            let reverse = buddy.orientation() != node.orientation();
            node.merge_buddy(&buddy, position, k);
            node.erase_edges_to(buddy_id);
            reverse
        };

        // Rewire: every edge of the buddy (except the pair linking it to the
        // survivor) moves onto the survivor, with the source strand flipped
        // when the buddy was absorbed reverse-complemented. Neighbors drop
        // their mirror edges to the buddy and gain mirrors to the survivor.
        let buddy_edges: Vec<_> = buddy.ordered_edges().to_vec();
        for edge in buddy_edges {
            let neighbour_id = edge.dst_id();
            if neighbour_id == id {
                continue;
            }
            let kind = if reverse_buddy {
                edge.kind().with_src_flipped()
            } else {
                edge.kind()
            };
            if let Some(node) = self.nodes.get_mut(&id) {
                node.emplace_edge(neighbour_id, kind);
            }
            if let Some(neighbour) = self.nodes.get_mut(&neighbour_id) {
                neighbour.erase_edges_to(buddy_id);
                neighbour.emplace_edge(id, kind.reversed());
            }
        }
        true
    }
}
