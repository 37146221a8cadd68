//! Canonical nucleotide words.
//!
//! A `Kmer` stores the lexicographically smaller of a sequence and its
//! reverse complement, together with an orientation flag recording which of
//! the two was observed. Identity is a stable 64-bit hash of the canonical
//! form, so a word and its reverse complement collapse onto one graph node.

use crate::utils::{hash_seq, is_canonical_base, rev_comp};

/// Which of {sequence, reverse complement} the canonical form corresponds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Canonical form equals the observed sequence.
    Forward,
    /// Canonical form is the reverse complement of the observed sequence.
    Reverse,
}

impl Orientation {
    pub fn flipped(self) -> Self {
        match self {
            Orientation::Forward => Orientation::Reverse,
            Orientation::Reverse => Orientation::Forward,
        }
    }
}

/// End of a node at which a buddy is attached during chain compaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuddyPosition {
    /// Buddy is prepended before the first base.
    Front,
    /// Buddy is appended after the last base.
    Back,
}

/// A canonical nucleotide word. After chain compaction the stored sequence
/// grows past the original k while the identity stays fixed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Kmer {
    seq: Vec<u8>,
    orient: Orientation,
}

impl Kmer {
    /// Canonicalize `seq` and record which orientation was chosen. The input
    /// must be uppercase {A,C,G,T}; `has_canonical_bases` gates that upstream.
    pub fn new(seq: &[u8]) -> Self {
        let rc = rev_comp(seq);
        if rc.as_slice() < seq {
            Kmer {
                seq: rc,
                orient: Orientation::Reverse,
            }
        } else {
            Kmer {
                seq: seq.to_vec(),
                orient: Orientation::Forward,
            }
        }
    }

    /// Placeholder word for the source/sink sentinels; no sequence content.
    pub fn empty() -> Self {
        Kmer {
            seq: Vec::new(),
            orient: Orientation::Forward,
        }
    }

    /// True iff every base of `seq` is in {A,C,G,T}.
    pub fn has_canonical_bases(seq: &[u8]) -> bool {
        seq.iter().all(|&b| is_canonical_base(b))
    }

    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    /// Stored (canonical at construction time) sequence.
    pub fn seq(&self) -> &[u8] {
        &self.seq
    }

    pub fn orientation(&self) -> Orientation {
        self.orient
    }

    /// Stable identity of the stored sequence.
    pub fn id(&self) -> u64 {
        hash_seq(&self.seq)
    }

    /// The sequence as observed before canonicalization.
    pub fn observed(&self) -> Vec<u8> {
        match self.orient {
            Orientation::Forward => self.seq.clone(),
            Orientation::Reverse => rev_comp(&self.seq),
        }
    }

    /// True iff `buddy` can be glued onto this word at `position` with a
    /// `k - 1` base overlap, reverse-complementing the buddy when
    /// `reverse_buddy` is set.
    pub fn can_merge_kmers(
        &self,
        buddy: &Kmer,
        position: BuddyPosition,
        reverse_buddy: bool,
        k: usize,
    ) -> bool {
        if self.len() < k || buddy.len() < k {
            return false;
        }

        let overlap = k - 1;
        let other = if reverse_buddy {
            rev_comp(&buddy.seq)
        } else {
            buddy.seq.clone()
        };

        match position {
            BuddyPosition::Back => self.seq[self.len() - overlap..] == other[..overlap],
            BuddyPosition::Front => self.seq[..overlap] == other[other.len() - overlap..],
        }
    }

    /// Glue `buddy` onto this word at `position`, dropping the `k - 1`
    /// overlap. The caller must have verified `can_merge_kmers` first.
    pub fn merge_buddy(
        &mut self,
        buddy: &Kmer,
        position: BuddyPosition,
        reverse_buddy: bool,
        k: usize,
    ) {
        let overlap = k - 1;
        let other = if reverse_buddy {
            rev_comp(&buddy.seq)
        } else {
            buddy.seq.clone()
        };

        match position {
            BuddyPosition::Back => self.seq.extend_from_slice(&other[overlap..]),
            BuddyPosition::Front => {
                let mut merged = other[..other.len() - overlap].to_vec();
                merged.extend_from_slice(&self.seq);
                self.seq = merged;
            }
        }
    }
}

/// Canonicalize a raw sequence, returning the canonical form and the chosen
/// orientation.
pub fn canonicalize(seq: &[u8]) -> (Vec<u8>, Orientation) {
    let kmer = Kmer::new(seq);
    let orient = kmer.orientation();
    (kmer.seq, orient)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_canonicalize_picks_smaller() {
        let (canon, orient) = canonicalize(b"TTTTA");
        assert_eq!(canon, b"TAAAA".to_vec());
        assert_eq!(orient, Orientation::Reverse);

        let (canon, orient) = canonicalize(b"ACGTC");
        assert_eq!(canon, b"ACGTC".to_vec());
        assert_eq!(orient, Orientation::Forward);
    }

    #[test]
    fn test_canonicalization_is_strand_agnostic() {
        let mut rng = StdRng::seed_from_u64(7);
        let bases = [b'A', b'C', b'G', b'T'];
        for _ in 0..200 {
            let seq: Vec<u8> = (0..25).map(|_| bases[rng.gen_range(0..4)]).collect();
            let rc = rev_comp(&seq);
            let fwd = Kmer::new(&seq);
            let rev = Kmer::new(&rc);
            assert_eq!(fwd.seq(), rev.seq());
            assert_eq!(fwd.id(), rev.id());
        }
    }

    #[test]
    fn test_observed_round_trips() {
        let kmer = Kmer::new(b"TTTTA");
        assert_eq!(kmer.observed(), b"TTTTA".to_vec());
    }

    #[test]
    fn test_can_merge_back_forward() {
        let a = Kmer::new(b"ACGTA");
        let b = Kmer::new(b"CGTAC");
        assert_eq!(b.orientation(), Orientation::Forward);
        assert!(a.can_merge_kmers(&b, BuddyPosition::Back, false, 5));
        assert!(!a.can_merge_kmers(&b, BuddyPosition::Front, false, 5));
    }

    #[test]
    fn test_can_merge_back_reversed_buddy() {
        // Observed successor CGTAT canonicalizes to ATACG (Reverse); the
        // overlap only lines up once the buddy is reverse-complemented back.
        let a = Kmer::new(b"ACGTA");
        let b = Kmer::new(b"CGTAT");
        assert_eq!(b.seq(), b"ATACG");
        assert_eq!(b.orientation(), Orientation::Reverse);
        assert!(!a.can_merge_kmers(&b, BuddyPosition::Back, false, 5));
        assert!(a.can_merge_kmers(&b, BuddyPosition::Back, true, 5));
    }

    #[test]
    fn test_merge_buddy_back() {
        let mut a = Kmer::new(b"ACGTA");
        let b = Kmer::new(b"CGTAC");
        a.merge_buddy(&b, BuddyPosition::Back, false, 5);
        assert_eq!(a.seq(), b"ACGTAC");
    }

    #[test]
    fn test_merge_buddy_front() {
        let mut a = Kmer::new(b"CGTAC");
        let b = Kmer::new(b"ACGTA");
        assert!(a.can_merge_kmers(&b, BuddyPosition::Front, false, 5));
        a.merge_buddy(&b, BuddyPosition::Front, false, 5);
        assert_eq!(a.seq(), b"ACGTAC");
    }

    #[test]
    fn test_merge_buddy_reversed() {
        let mut a = Kmer::new(b"ACGTA");
        let b = Kmer::new(b"CGTAT");
        a.merge_buddy(&b, BuddyPosition::Back, true, 5);
        assert_eq!(a.seq(), b"ACGTAT");
    }
}
