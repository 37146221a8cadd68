//! Tumor/normal alignment file access.
//!
//! Each worker owns its own indexed readers; the driver only touches the
//! headers (sample names). Recruitment pulls every usable read overlapping a
//! window: mapped, primary, non-duplicate, and at or above the configured
//! mapping quality.

use std::path::Path;

use rust_htslib::bam::{self, record::Aux, Read as BamRead};

use crate::error::{McError, Result};
use crate::graph::{ReadInfo, SampleLabel, Strand};

/// One read pulled from an alignment file for a window.
#[derive(Debug, Clone)]
pub struct RecruitedRead {
    pub seq: Vec<u8>,
    pub quals: Vec<u8>,
    pub info: ReadInfo,
}

/// Sample names from the @RG SM tags of an alignment file header, first
/// occurrence order, deduplicated.
pub fn sample_names<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let reader = bam::Reader::from_path(path.as_ref())?;
    let header = bam::Header::from_template(reader.header());

    let mut names: Vec<String> = Vec::new();
    for (key, records) in header.to_hashmap() {
        if key != "RG" {
            continue;
        }
        for record in records {
            if let Some(sample) = record.get("SM") {
                if !names.iter().any(|n| n == sample) {
                    names.push(sample.clone());
                }
            }
        }
    }
    Ok(names)
}

/// Window-scoped read access to one alignment file.
pub struct HtsReader {
    reader: bam::IndexedReader,
    label: SampleLabel,
    min_mapq: u8,
}

impl HtsReader {
    /// Open an indexed BAM/CRAM. The reference is attached so CRAM decoding
    /// works; it is ignored for BAM.
    pub fn open<P: AsRef<Path>>(
        path: P,
        reference: &Path,
        label: SampleLabel,
        min_mapq: u8,
    ) -> Result<Self> {
        let mut reader = bam::IndexedReader::from_path(path.as_ref())?;
        reader.set_reference(reference)?;
        Ok(HtsReader {
            reader,
            label,
            min_mapq,
        })
    }

    /// All usable reads overlapping `[start, end)` on `chrom`.
    pub fn recruit(&mut self, chrom: &str, start: i64, end: i64) -> Result<Vec<RecruitedRead>> {
        self.reader
            .fetch((chrom, start, end))
            .map_err(|e| McError::NotFound(format!("fetch {}:{}-{}: {}", chrom, start, end, e)))?;

        let mut reads = Vec::new();
        let mut record = bam::Record::new();
        while let Some(result) = self.reader.read(&mut record) {
            result?;
            if record.is_unmapped()
                || record.is_secondary()
                || record.is_supplementary()
                || record.is_duplicate()
                || record.is_quality_check_failed()
                || record.mapq() < self.min_mapq
            {
                continue;
            }

            let seq = record.seq().as_bytes();
            if seq.is_empty() {
                continue;
            }

            let strand = if record.is_reverse() {
                Strand::Rev
            } else {
                Strand::Fwd
            };
            let info = ReadInfo {
                label: self.label,
                strand,
                barcode: aux_string(&record, b"BX"),
                haplotype: aux_int(&record, b"HP").unwrap_or(0).clamp(0, 2) as u8,
            };

            reads.push(RecruitedRead {
                seq,
                quals: record.qual().to_vec(),
                info,
            });
        }
        Ok(reads)
    }
}

fn aux_string(record: &bam::Record, tag: &[u8]) -> Option<String> {
    match record.aux(tag) {
        Ok(Aux::String(value)) => Some(value.to_string()),
        _ => None,
    }
}

fn aux_int(record: &bam::Record, tag: &[u8]) -> Option<i64> {
    match record.aux(tag) {
        Ok(Aux::I8(v)) => Some(i64::from(v)),
        Ok(Aux::U8(v)) => Some(i64::from(v)),
        Ok(Aux::I16(v)) => Some(i64::from(v)),
        Ok(Aux::U16(v)) => Some(i64::from(v)),
        Ok(Aux::I32(v)) => Some(i64::from(v)),
        Ok(Aux::U32(v)) => Some(i64::from(v)),
        _ => None,
    }
}
