// Variant store: ordered flush across out-of-order completions, duplicate
// suppression across overlapping windows.

use std::fs;
use std::sync::Arc;
use std::thread;

use microcall::pipeline::FlushTracker;
use microcall::variant::{AlleleSupport, Variant, VariantKind, VariantStore};
use microcall::vcf_writer::VcfWriter;

fn snv(pos: i64, alt: &str) -> Variant {
    Variant {
        chrom: "chr1".to_string(),
        pos,
        ref_allele: "A".to_string(),
        alt_allele: alt.to_string(),
        kind: VariantKind::Snv,
        tumor: AlleleSupport {
            ref_cov: 20,
            alt_cov: 8,
        },
        normal: AlleleSupport {
            ref_cov: 22,
            alt_cov: 0,
        },
        qual: 80,
    }
}

fn written_positions(path: &std::path::Path) -> Vec<i64> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .filter(|l| !l.starts_with('#'))
        .map(|l| l.split('\t').nth(1).unwrap().parse::<i64>().unwrap() - 1)
        .collect()
}

#[test]
fn test_flush_order_follows_window_indices() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.vcf");

    let store = Arc::new(VariantStore::new(5));
    // Workers complete out of order; each window holds one variant whose
    // position mirrors its index.
    let completion_order = [2usize, 0, 1, 4, 3];
    let handles: Vec<_> = completion_order
        .iter()
        .map(|&idx| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                store.add_variants_for_window(idx, vec![snv(idx as i64 * 100, "T")]);
                idx
            })
        })
        .collect();
    let done_order: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let mut writer = VcfWriter::create(&out).unwrap();
    let mut tracker = FlushTracker::new(5, 1);
    let mut flushed = Vec::new();
    for idx in done_order {
        for flush_idx in tracker.mark_done(idx) {
            store.flush_window(flush_idx, &mut writer).unwrap();
            flushed.push(flush_idx);
        }
    }
    store.flush_all(&mut writer).unwrap();

    // Strictly increasing flush sequence starting at zero.
    assert!(!flushed.is_empty());
    assert_eq!(flushed[0], 0);
    assert!(flushed.windows(2).all(|w| w[0] < w[1]));

    assert_eq!(written_positions(&out), vec![0, 100, 200, 300, 400]);
}

#[test]
fn test_overlapping_windows_emit_each_allele_once() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.vcf");

    let store = VariantStore::new(2);
    store.add_variants_for_window(0, vec![snv(150, "T"), snv(180, "G")]);
    // The overlapping neighbor re-discovers one allele and adds a new one.
    store.add_variants_for_window(1, vec![snv(180, "G"), snv(240, "T")]);

    let mut writer = VcfWriter::create(&out).unwrap();
    assert!(store.flush_window(0, &mut writer).unwrap());
    assert!(store.flush_window(1, &mut writer).unwrap());
    writer.flush().unwrap();

    assert_eq!(written_positions(&out), vec![150, 180, 240]);
}

#[test]
fn test_empty_window_flushes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.vcf");

    let store = VariantStore::new(1);
    let mut writer = VcfWriter::create(&out).unwrap();
    assert!(!store.flush_window(0, &mut writer).unwrap());
    store.flush_all(&mut writer).unwrap();
    assert!(written_positions(&out).is_empty());
}

#[test]
fn test_records_within_window_are_coordinate_sorted() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.vcf");

    let store = VariantStore::new(1);
    store.add_variants_for_window(0, vec![snv(300, "T"), snv(100, "G"), snv(200, "C")]);

    let mut writer = VcfWriter::create(&out).unwrap();
    store.flush_window(0, &mut writer).unwrap();
    writer.flush().unwrap();

    assert_eq!(written_positions(&out), vec![100, 200, 300]);
}
