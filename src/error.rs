//! Crate-wide error kinds.
//!
//! Setup-phase failures (bad arguments, unwritable outputs, missing contigs)
//! abort the run; per-window failures are logged by the worker and the
//! window completes with no variants.

use thiserror::Error;

/// Errors surfaced by the microcall pipeline.
#[derive(Debug, Error)]
pub enum McError {
    /// Malformed user input: region strings, BED column counts, parameter
    /// combinations.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A requested range could not be satisfied, e.g. a window starting past
    /// the end of its contig.
    #[error("failed precondition: {0}")]
    FailedPrecondition(String),

    /// A named entity (contig, sample) is absent from its source.
    #[error("not found: {0}")]
    NotFound(String),

    /// A well-formed input failed to decode (integer parse on a BED line).
    #[error("internal: {0}")]
    Internal(String),

    /// Infrastructure failure that makes continuing pointless.
    #[error("fatal: {0}")]
    Fatal(String),

    /// I/O error from the filesystem or an output sink.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error bubbled up from htslib (BAM/CRAM/FASTA access).
    #[error("htslib error: {0}")]
    Hts(#[from] rust_htslib::errors::Error),
}

impl McError {
    /// True for reference lookups that ran off the end of a contig; the
    /// window builder uses this to honor `--skip-truncated`.
    pub fn is_failed_precondition(&self) -> bool {
        matches!(self, McError::FailedPrecondition(_))
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, McError>;
