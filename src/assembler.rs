//! Per-window micro-assembly worker.
//!
//! Each worker owns its own alignment readers and loops: take a window off
//! the queue, build the colored graph from the window reference plus the
//! recruited tumor/normal reads, compact it, enumerate source-to-sink paths,
//! align every non-reference path back to the window reference and turn the
//! differences into candidate somatic variants. A failed window is logged
//! and completed with no variants so the run keeps moving.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use bio::alignment::pairwise::Aligner;
use bio::alignment::AlignmentOperation;
use crossbeam_channel::{Receiver, Sender};

use crate::error::Result;
use crate::graph::paths::{GraphPath, PathLimits};
use crate::graph::{Graph, KmerLabel, SampleLabel};
use crate::hts::{HtsReader, RecruitedRead};
use crate::params::Params;
use crate::pipeline::WindowResult;
use crate::variant::{AlleleSupport, Variant, VariantKind, VariantStore};
use crate::window::RefWindow;

// Path-vs-reference alignment scoring, affine gaps.
const MATCH_SCORE: i32 = 1;
const MISMATCH_SCORE: i32 = -4;
const GAP_OPEN: i32 = -6;
const GAP_EXTEND: i32 = -1;

pub struct MicroAssembler {
    params: Arc<Params>,
    tumor: HtsReader,
    normal: HtsReader,
    window_rx: Receiver<Arc<RefWindow>>,
    result_tx: Sender<WindowResult>,
    store: Arc<VariantStore>,
}

impl MicroAssembler {
    pub fn new(
        params: Arc<Params>,
        window_rx: Receiver<Arc<RefWindow>>,
        result_tx: Sender<WindowResult>,
        store: Arc<VariantStore>,
    ) -> Result<Self> {
        let tumor = HtsReader::open(
            &params.tumor_path,
            &params.reference_path,
            SampleLabel::Tumor,
            params.min_read_mapq,
        )?;
        let normal = HtsReader::open(
            &params.normal_path,
            &params.reference_path,
            SampleLabel::Normal,
            params.min_read_mapq,
        )?;
        Ok(MicroAssembler {
            params,
            tumor,
            normal,
            window_rx,
            result_tx,
            store,
        })
    }

    /// Worker loop; returns when the window queue is drained.
    pub fn process(mut self) {
        while let Ok(window) = self.window_rx.recv() {
            let timer = Instant::now();
            let window_idx = window.window_index();

            match self.process_window(&window) {
                Ok(variants) => {
                    if !variants.is_empty() {
                        log::debug!(
                            "Window {} produced {} candidate variant(s)",
                            window.region_string(),
                            variants.len()
                        );
                    }
                    self.store.add_variants_for_window(window_idx, variants);
                }
                Err(err) => {
                    log::error!(
                        "Window {} failed, emitting no variants: {}",
                        window.region_string(),
                        err
                    );
                }
            }

            let _ = self.result_tx.send(WindowResult {
                window_idx,
                runtime: timer.elapsed(),
            });
        }
    }

    fn process_window(&mut self, window: &RefWindow) -> Result<Vec<Variant>> {
        let params = &self.params;
        let ref_seq = window.seq();
        if ref_seq.len() < params.kmer_length {
            return Ok(Vec::new());
        }

        let mut graph = Graph::new(params.kmer_length);
        graph.add_sequence(
            ref_seq,
            KmerLabel::Reference,
            None,
            params.min_base_qual,
            params.linked_reads,
        );

        let tumor_reads = self
            .tumor
            .recruit(window.chrom(), window.start(), window.end())?;
        let normal_reads = self
            .normal
            .recruit(window.chrom(), window.start(), window.end())?;
        add_reads(&mut graph, &tumor_reads, KmerLabel::Tumor, params);
        add_reads(&mut graph, &normal_reads, KmerLabel::Normal, params);

        if !graph.anchor_reference_ends(ref_seq) {
            return Ok(Vec::new());
        }
        graph.compress();

        if let Some(dir) = &params.out_graphs_dir {
            write_window_graph(&graph, dir, window);
        }

        let limits = PathLimits {
            max_paths: 128,
            max_nodes: 1024,
            max_seq_len: ref_seq.len() * 2 + 512,
        };
        let paths = graph.enumerate_paths(limits);
        if paths.is_empty() {
            return Ok(Vec::new());
        }

        let ref_path = paths.iter().find(|p| p.seq == ref_seq);
        let mut by_key: HashMap<u64, Variant> = HashMap::new();
        for path in &paths {
            if path.seq == ref_seq {
                continue;
            }
            for variant in self.call_path(window, &graph, path, ref_path) {
                by_key
                    .entry(variant.key())
                    .and_modify(|existing| {
                        if variant.tumor.alt_cov > existing.tumor.alt_cov {
                            *existing = variant.clone();
                        }
                    })
                    .or_insert(variant);
            }
        }

        Ok(by_key.into_values().collect())
    }

    /// Align one assembled path to the window reference and extract the
    /// somatic candidates it implies.
    fn call_path(
        &self,
        window: &RefWindow,
        graph: &Graph,
        path: &GraphPath,
        ref_path: Option<&GraphPath>,
    ) -> Vec<Variant> {
        let ref_seq = window.seq();
        let score = |a: u8, b: u8| {
            if a == b {
                MATCH_SCORE
            } else {
                MISMATCH_SCORE
            }
        };
        let mut aligner =
            Aligner::with_capacity(path.seq.len(), ref_seq.len(), GAP_OPEN, GAP_EXTEND, &score);
        let alignment = aligner.global(&path.seq, ref_seq);

        let mut variants = Vec::new();
        let mut x = 0usize; // cursor in path.seq
        let mut y = 0usize; // cursor in ref_seq
        let ops = &alignment.operations;
        let mut i = 0usize;

        while i < ops.len() {
            match ops[i] {
                AlignmentOperation::Match => {
                    x += 1;
                    y += 1;
                    i += 1;
                }
                AlignmentOperation::Subst => {
                    if let Some(v) = self.snv_at(window, graph, path, ref_path, x, y) {
                        variants.push(v);
                    }
                    x += 1;
                    y += 1;
                    i += 1;
                }
                AlignmentOperation::Ins => {
                    let run = run_length(ops, i, AlignmentOperation::Ins);
                    if let Some(v) = self.insertion_at(window, graph, path, ref_path, x, y, run) {
                        variants.push(v);
                    }
                    x += run;
                    i += run;
                }
                AlignmentOperation::Del => {
                    let run = run_length(ops, i, AlignmentOperation::Del);
                    if let Some(v) = self.deletion_at(window, graph, path, ref_path, x, y, run) {
                        variants.push(v);
                    }
                    y += run;
                    i += run;
                }
                AlignmentOperation::Xclip(n) => {
                    x += n;
                    i += 1;
                }
                AlignmentOperation::Yclip(n) => {
                    y += n;
                    i += 1;
                }
            }
        }

        variants
    }

    fn snv_at(
        &self,
        window: &RefWindow,
        graph: &Graph,
        path: &GraphPath,
        ref_path: Option<&GraphPath>,
        x: usize,
        y: usize,
    ) -> Option<Variant> {
        let ref_seq = window.seq();
        let (tumor_alt, normal_alt) = alt_support(graph, path, x..x + 1);
        let (tumor_ref, normal_ref) = ref_support(graph, ref_path, y..y + 1);

        self.build_variant(
            window,
            y,
            (ref_seq[y] as char).to_string(),
            (path.seq[x] as char).to_string(),
            VariantKind::Snv,
            AlleleSupport {
                ref_cov: tumor_ref,
                alt_cov: tumor_alt,
            },
            AlleleSupport {
                ref_cov: normal_ref,
                alt_cov: normal_alt,
            },
        )
    }

    fn insertion_at(
        &self,
        window: &RefWindow,
        graph: &Graph,
        path: &GraphPath,
        ref_path: Option<&GraphPath>,
        x: usize,
        y: usize,
        run: usize,
    ) -> Option<Variant> {
        // VCF indels are left-anchored on the preceding reference base.
        if x == 0 || y == 0 {
            return None;
        }
        let ref_seq = window.seq();
        let anchor = ref_seq[y - 1] as char;
        let inserted = String::from_utf8_lossy(&path.seq[x..x + run]).to_string();

        let (tumor_alt, normal_alt) = alt_support(graph, path, x..x + run);
        let (tumor_ref, normal_ref) = ref_support(graph, ref_path, y - 1..y);

        self.build_variant(
            window,
            y - 1,
            anchor.to_string(),
            format!("{}{}", anchor, inserted),
            VariantKind::Ins,
            AlleleSupport {
                ref_cov: tumor_ref,
                alt_cov: tumor_alt,
            },
            AlleleSupport {
                ref_cov: normal_ref,
                alt_cov: normal_alt,
            },
        )
    }

    fn deletion_at(
        &self,
        window: &RefWindow,
        graph: &Graph,
        path: &GraphPath,
        ref_path: Option<&GraphPath>,
        x: usize,
        y: usize,
        run: usize,
    ) -> Option<Variant> {
        if x == 0 || y == 0 || y + run > window.seq().len() {
            return None;
        }
        let ref_seq = window.seq();
        let anchor = ref_seq[y - 1] as char;
        let deleted = String::from_utf8_lossy(&ref_seq[y..y + run]).to_string();

        // Deleted bases have no path positions; support comes from the
        // junction bases flanking the event on the path.
        let flank = x - 1..(x + 1).min(path.seq.len());
        let (tumor_alt, normal_alt) = alt_support(graph, path, flank);
        let (tumor_ref, normal_ref) = ref_support(graph, ref_path, y..y + run);

        self.build_variant(
            window,
            y - 1,
            format!("{}{}", anchor, deleted),
            anchor.to_string(),
            VariantKind::Del,
            AlleleSupport {
                ref_cov: tumor_ref,
                alt_cov: tumor_alt,
            },
            AlleleSupport {
                ref_cov: normal_ref,
                alt_cov: normal_alt,
            },
        )
    }

    /// Apply the somatic filter and assemble the final record.
    fn build_variant(
        &self,
        window: &RefWindow,
        ref_offset: usize,
        ref_allele: String,
        alt_allele: String,
        kind: VariantKind,
        tumor: AlleleSupport,
        normal: AlleleSupport,
    ) -> Option<Variant> {
        if matches!(kind, VariantKind::Ins | VariantKind::Del) {
            let event_len = ref_allele.len().abs_diff(alt_allele.len());
            if event_len > self.params.max_indel_length as usize {
                return None;
            }
        }
        if tumor.alt_cov < self.params.min_tumor_alt || normal.alt_cov > self.params.max_normal_alt
        {
            return None;
        }

        Some(Variant {
            chrom: window.chrom().to_string(),
            pos: window.start() + ref_offset as i64,
            ref_allele,
            alt_allele,
            kind,
            tumor,
            normal,
            qual: u32::from(tumor.alt_cov.min(300)) * 10,
        })
    }
}

fn add_reads(graph: &mut Graph, reads: &[RecruitedRead], label: KmerLabel, params: &Params) {
    for read in reads {
        graph.add_sequence(
            &read.seq,
            label,
            Some((&read.info, &read.quals)),
            params.min_base_qual,
            params.linked_reads,
        );
    }
}

/// Minimum base-quality-passing support across `range` of path bases, per
/// sample, read off the per-base coverage slabs of the contributing nodes.
fn alt_support(graph: &Graph, path: &GraphPath, range: std::ops::Range<usize>) -> (u16, u16) {
    let mut tumor = u16::MAX;
    let mut normal = u16::MAX;
    for idx in range {
        let Some(&(node_id, pos)) = path.provenance.get(idx) else {
            return (0, 0);
        };
        let Some(node) = graph.node(node_id) else {
            return (0, 0);
        };
        let pos = pos as usize;
        tumor = tumor.min(node.covs.base_cov(SampleLabel::Tumor, pos).bq_pass_total());
        normal = normal.min(node.covs.base_cov(SampleLabel::Normal, pos).bq_pass_total());
    }
    if tumor == u16::MAX {
        (0, 0)
    } else {
        (tumor, normal)
    }
}

/// Same lookup along the reference path; zero support when the reference
/// path was not assembled (broken reference chain).
fn ref_support(
    graph: &Graph,
    ref_path: Option<&GraphPath>,
    range: std::ops::Range<usize>,
) -> (u16, u16) {
    match ref_path {
        Some(path) => alt_support(graph, path, range),
        None => (0, 0),
    }
}

fn run_length(ops: &[AlignmentOperation], from: usize, op: AlignmentOperation) -> usize {
    ops[from..].iter().take_while(|&&o| o == op).count()
}

fn write_window_graph(graph: &Graph, dir: &Path, window: &RefWindow) {
    let name = format!(
        "{}_{}_{}.dot",
        window.chrom(),
        window.start() + 1,
        window.end()
    );
    if let Err(err) = graph.write_dot(dir.join(&name)) {
        log::warn!("Could not write graph {} to {}: {}", name, dir.display(), err);
    }
}
