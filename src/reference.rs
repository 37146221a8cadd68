//! Reference genome access.
//!
//! The pipeline only ever needs three things from the reference: the contig
//! table (names in file order), contig lengths, and region sequences. The
//! trait keeps the window builder testable without a FASTA on disk; the
//! production implementation wraps an indexed FASTA (`samtools faidx`).

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use bio::io::fasta;

use crate::error::{McError, Result};

/// One reference contig, in file order.
#[derive(Debug, Clone)]
pub struct ContigInfo {
    pub name: String,
    pub length: i64,
}

/// Read-only reference lookups used by window construction and workers.
pub trait ReferenceReader {
    /// Contigs in file order.
    fn contigs(&self) -> &[ContigInfo];

    /// Length of `name`, or `NotFound`.
    fn contig_length(&self, name: &str) -> Result<i64>;

    /// Sequence of `[start, end)` on `chrom`, uppercased. The end is clamped
    /// to the contig length; a start at or beyond the contig end is a
    /// `FailedPrecondition` (the caller decides whether truncation is fatal).
    fn region_sequence(&mut self, chrom: &str, start: i64, end: i64) -> Result<Vec<u8>>;

    /// Contig name to ordinal map, defining the output sort order.
    fn contig_ids(&self) -> HashMap<String, i64> {
        self.contigs()
            .iter()
            .enumerate()
            .map(|(ordinal, ctg)| (ctg.name.clone(), ordinal as i64))
            .collect()
    }
}

/// Indexed FASTA reader; requires a `.fai` sidecar next to the file.
pub struct FastaReader {
    inner: fasta::IndexedReader<File>,
    contigs: Vec<ContigInfo>,
}

impl FastaReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let inner = fasta::IndexedReader::from_file(&path).map_err(|e| {
            McError::Fatal(format!(
                "could not open indexed fasta {}: {}",
                path.display(),
                e
            ))
        })?;
        let contigs = inner
            .index
            .sequences()
            .iter()
            .map(|seq| ContigInfo {
                name: seq.name.clone(),
                length: seq.len as i64,
            })
            .collect();
        Ok(FastaReader { inner, contigs })
    }
}

impl ReferenceReader for FastaReader {
    fn contigs(&self) -> &[ContigInfo] {
        &self.contigs
    }

    fn contig_length(&self, name: &str) -> Result<i64> {
        self.contigs
            .iter()
            .find(|ctg| ctg.name == name)
            .map(|ctg| ctg.length)
            .ok_or_else(|| McError::NotFound(format!("contig {} is not in the reference", name)))
    }

    fn region_sequence(&mut self, chrom: &str, start: i64, end: i64) -> Result<Vec<u8>> {
        let ctg_len = self.contig_length(chrom)?;
        if start < 0 || start >= ctg_len {
            return Err(McError::FailedPrecondition(format!(
                "window {}:{}-{} starts beyond the end of the contig ({} bp)",
                chrom,
                start + 1,
                end,
                ctg_len
            )));
        }

        let stop = end.min(ctg_len);
        self.inner
            .fetch(chrom, start as u64, stop as u64)
            .map_err(|e| McError::Internal(format!("fasta fetch {}: {}", chrom, e)))?;
        let mut seq = Vec::with_capacity((stop - start) as usize);
        self.inner
            .read(&mut seq)
            .map_err(|e| McError::Internal(format!("fasta read {}: {}", chrom, e)))?;
        seq.make_ascii_uppercase();
        Ok(seq)
    }
}
