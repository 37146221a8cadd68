//! Shared geometry for merging per-base annotation slabs.
//!
//! Every parallel vector on a node (qualities, coverage, labels, haplotype
//! counts) merges under chain compaction by the same rule: the `k - 1`
//! overlap region is combined element-wise and the non-overlapping remainder
//! is appended or prepended. Only the element combiner differs per slab.

use crate::kmer::BuddyPosition;

/// Merge `buddy` into `own` at `position` with a `k - 1` element overlap,
/// combining overlapping elements with `fold`. When `reverse_buddy` is set
/// the buddy slab is consumed in reverse element order, mirroring the
/// reverse-complementation of its sequence.
pub(crate) fn merge_slab<T, F>(
    own: &mut Vec<T>,
    buddy: &[T],
    position: BuddyPosition,
    reverse_buddy: bool,
    k: usize,
    fold: F,
) where
    T: Clone,
    F: Fn(&mut T, &T),
{
    debug_assert!(own.len() >= k - 1 && buddy.len() >= k - 1);
    let overlap = k - 1;

    let oriented: Vec<T> = if reverse_buddy {
        buddy.iter().rev().cloned().collect()
    } else {
        buddy.to_vec()
    };

    match position {
        BuddyPosition::Back => {
            let own_len = own.len();
            for (idx, elem) in oriented[..overlap].iter().enumerate() {
                fold(&mut own[own_len - overlap + idx], elem);
            }
            own.extend_from_slice(&oriented[overlap..]);
        }
        BuddyPosition::Front => {
            let split = oriented.len() - overlap;
            for (idx, elem) in oriented[split..].iter().enumerate() {
                fold(&mut own[idx], elem);
            }
            let mut merged = oriented[..split].to_vec();
            merged.append(own);
            *own = merged;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_back_sums_overlap() {
        let mut own = vec![1u32, 2, 3, 4, 5];
        let buddy = vec![10u32, 20, 30, 40, 50];
        merge_slab(&mut own, &buddy, BuddyPosition::Back, false, 5, |a, b| {
            *a += *b
        });
        assert_eq!(own, vec![1, 12, 23, 34, 45, 50]);
    }

    #[test]
    fn test_merge_front_sums_overlap() {
        let mut own = vec![1u32, 2, 3, 4, 5];
        let buddy = vec![10u32, 20, 30, 40, 50];
        merge_slab(&mut own, &buddy, BuddyPosition::Front, false, 5, |a, b| {
            *a += *b
        });
        assert_eq!(own, vec![10, 21, 32, 43, 54, 5]);
    }

    #[test]
    fn test_merge_reversed_buddy() {
        let mut own = vec![0u32; 5];
        let buddy = vec![1u32, 2, 3, 4, 5];
        merge_slab(&mut own, &buddy, BuddyPosition::Back, true, 5, |a, b| {
            *a += *b
        });
        // Reversed buddy is [5,4,3,2,1]; last element survives past the end.
        assert_eq!(own, vec![0, 5, 4, 3, 2, 1]);
    }
}
