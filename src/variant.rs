//! Candidate variants and the shared per-window variant store.
//!
//! Workers append variants under their window's index from any thread; the
//! driver alone flushes windows, strictly in index order. Overlapping
//! windows can re-discover the same allele, so flushed variant keys are
//! remembered and repeats dropped.

use std::collections::HashSet;
use std::fmt;
use std::sync::Mutex;

use crate::error::Result;
use crate::reference::ContigInfo;
use crate::utils::{hash_64, hash_seq};
use crate::vcf_writer::VcfWriter;

/// Variant class, reported in the INFO column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantKind {
    Snv,
    Ins,
    Del,
}

impl fmt::Display for VariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariantKind::Snv => write!(f, "snv"),
            VariantKind::Ins => write!(f, "ins"),
            VariantKind::Del => write!(f, "del"),
        }
    }
}

/// Reference/alternate read support for one sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlleleSupport {
    pub ref_cov: u16,
    pub alt_cov: u16,
}

impl AlleleSupport {
    pub fn depth(&self) -> u32 {
        u32::from(self.ref_cov) + u32::from(self.alt_cov)
    }
}

/// One candidate somatic variant in VCF-anchored representation.
#[derive(Debug, Clone)]
pub struct Variant {
    pub chrom: String,
    /// 0-based position of the first reference allele base.
    pub pos: i64,
    pub ref_allele: String,
    pub alt_allele: String,
    pub kind: VariantKind,
    pub tumor: AlleleSupport,
    pub normal: AlleleSupport,
    pub qual: u32,
}

impl Variant {
    /// Length of the event: 1 for SNVs, inserted/deleted bases for indels.
    pub fn event_length(&self) -> usize {
        match self.kind {
            VariantKind::Snv => 1,
            VariantKind::Ins => self.alt_allele.len() - self.ref_allele.len(),
            VariantKind::Del => self.ref_allele.len() - self.alt_allele.len(),
        }
    }

    /// Stable identity of the allele, independent of the window that found
    /// it.
    pub fn key(&self) -> u64 {
        let mut state = hash_seq(self.chrom.as_bytes());
        state = hash_64(state ^ self.pos as u64);
        state = hash_64(state ^ hash_seq(self.ref_allele.as_bytes()));
        hash_64(state ^ hash_seq(self.alt_allele.as_bytes()))
    }

    fn genotype(support: &AlleleSupport) -> &'static str {
        if support.alt_cov == 0 {
            "0/0"
        } else if support.ref_cov == 0 {
            "1/1"
        } else {
            "0/1"
        }
    }

    fn sample_column(support: &AlleleSupport) -> String {
        format!(
            "{}:{},{}:{}",
            Self::genotype(support),
            support.ref_cov,
            support.alt_cov,
            support.depth()
        )
    }

    /// Tab-separated VCF record, without trailing newline.
    pub fn vcf_record(&self) -> String {
        format!(
            "{}\t{}\t.\t{}\t{}\t{}\tPASS\tSOMATIC;TYPE={};LEN={}\tGT:AD:DP\t{}\t{}",
            self.chrom,
            self.pos + 1,
            self.ref_allele,
            self.alt_allele,
            self.qual,
            self.kind,
            self.event_length(),
            Self::sample_column(&self.normal),
            Self::sample_column(&self.tumor),
        )
    }
}

/// Shared store of per-window variant buckets.
pub struct VariantStore {
    buckets: Mutex<Vec<Vec<Variant>>>,
    emitted: Mutex<HashSet<u64>>,
}

impl VariantStore {
    pub fn new(num_windows: usize) -> Self {
        VariantStore {
            buckets: Mutex::new(vec![Vec::new(); num_windows]),
            emitted: Mutex::new(HashSet::new()),
        }
    }

    /// Append `variants` to the bucket of `window_idx`. Safe to call from
    /// any worker; buckets for different windows are independent.
    pub fn add_variants_for_window(&self, window_idx: usize, mut variants: Vec<Variant>) {
        if variants.is_empty() {
            return;
        }
        let mut buckets = self.buckets.lock().expect("variant store poisoned");
        buckets[window_idx].append(&mut variants);
    }

    /// Write the bucket of `window_idx` in coordinate order, dropping alleles
    /// already emitted by an earlier (overlapping) window. Returns true iff
    /// anything was written. Driver-only.
    pub fn flush_window(&self, window_idx: usize, writer: &mut VcfWriter) -> Result<bool> {
        let mut bucket = {
            let mut buckets = self.buckets.lock().expect("variant store poisoned");
            std::mem::take(&mut buckets[window_idx])
        };
        if bucket.is_empty() {
            return Ok(false);
        }

        bucket.sort_by(|a, b| {
            (a.pos, &a.ref_allele, &a.alt_allele).cmp(&(b.pos, &b.ref_allele, &b.alt_allele))
        });

        let mut wrote = false;
        let mut emitted = self.emitted.lock().expect("variant store poisoned");
        for variant in bucket {
            if emitted.insert(variant.key()) {
                writer.write_record(&variant.vcf_record())?;
                wrote = true;
            }
        }
        Ok(wrote)
    }

    /// Flush every remaining bucket in index order. Driver-only, after the
    /// last completion.
    pub fn flush_all(&self, writer: &mut VcfWriter) -> Result<()> {
        let num_windows = self.buckets.lock().expect("variant store poisoned").len();
        for idx in 0..num_windows {
            self.flush_window(idx, writer)?;
        }
        writer.flush()
    }
}

/// VCF header for one run. Sample columns are normal first, tumor second.
pub fn build_vcf_header(
    normal_name: &str,
    tumor_name: &str,
    reference_path: &str,
    contigs: &[ContigInfo],
    command_line: &str,
) -> String {
    let mut header = String::new();
    header.push_str("##fileformat=VCFv4.2\n");
    header.push_str(&format!(
        "##source=microcall v{}\n",
        env!("CARGO_PKG_VERSION")
    ));
    header.push_str(&format!("##reference={}\n", reference_path));
    header.push_str(&format!("##microcallCommand={}\n", command_line));
    for ctg in contigs {
        header.push_str(&format!(
            "##contig=<ID={},length={}>\n",
            ctg.name, ctg.length
        ));
    }
    header.push_str("##INFO=<ID=SOMATIC,Number=0,Type=Flag,Description=\"Somatic event\">\n");
    header.push_str(
        "##INFO=<ID=TYPE,Number=1,Type=String,Description=\"Variant type: snv, ins or del\">\n",
    );
    header.push_str("##INFO=<ID=LEN,Number=1,Type=Integer,Description=\"Event length\">\n");
    header.push_str("##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">\n");
    header.push_str(
        "##FORMAT=<ID=AD,Number=R,Type=Integer,Description=\"Allele depths (ref, alt)\">\n",
    );
    header.push_str("##FORMAT=<ID=DP,Number=1,Type=Integer,Description=\"Total depth\">\n");
    header.push_str(&format!(
        "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\t{}\t{}\n",
        normal_name, tumor_name
    ));
    header
}
