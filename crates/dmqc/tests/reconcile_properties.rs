//! Reconciliation table properties.
//!
//! Fixed cases pin the documented examples; the proptest block checks the
//! table invariants over random manifests and acquisitions.

use dmqc::{reconcile, AcquiredFile, ExpectedEntry, ExpectedManifest, ReconciliationRow, RowNote};
use proptest::prelude::*;
use std::collections::HashMap;

/// Tag pool for generated sessions. The last tag is never put in a manifest.
const TAGS: &[&str] = &["T1", "T2", "RST", "DTI60-1000", "FMAP", "LOC"];

fn manifest(entries: &[(&str, u32, i64)]) -> ExpectedManifest {
    let entries = entries
        .iter()
        .map(|(tag, count, order)| ExpectedEntry::new(*tag, *count, *order))
        .collect();
    ExpectedManifest::from_entries("CMH", entries).expect("valid manifest")
}

fn file(tag: &str, series: u32) -> AcquiredFile {
    AcquiredFile::new(format!("SPN01_CMH_0001_01_01_{}_{:02}_desc.nii.gz", tag, series), tag, series)
}

fn summary(rows: &[ReconciliationRow]) -> Vec<(String, String, RowNote)> {
    rows.iter()
        .map(|r| (r.tag.clone(), r.bookmark_id.clone(), r.note))
        .collect()
}

/// Manifests over a subset of the tag pool with small counts and shared
/// order keys.
fn arb_manifest() -> impl Strategy<Value = ExpectedManifest> {
    prop::collection::vec(prop::option::of((0u32..4, -2i64..4)), TAGS.len() - 1).prop_map(|slots| {
        let entries = slots
            .into_iter()
            .zip(TAGS)
            .filter_map(|(slot, tag)| slot.map(|(count, order)| ExpectedEntry::new(*tag, count, order)))
            .collect();
        ExpectedManifest::from_entries("CMH", entries).expect("pool tags are distinct")
    })
}

/// Acquisitions in arbitrary order; series numbers may repeat.
fn arb_files() -> impl Strategy<Value = Vec<AcquiredFile>> {
    prop::collection::vec((0..TAGS.len(), 1u32..30), 0..14).prop_map(|picks| {
        picks
            .into_iter()
            .enumerate()
            .map(|(i, (tag, series))| {
                AcquiredFile::new(
                    format!("SPN01_CMH_0001_01_01_{}_{:02}_scan{}.nii.gz", TAGS[tag], series, i),
                    TAGS[tag],
                    series,
                )
            })
            .collect()
    })
}

fn series_of(files: &[AcquiredFile], row: &ReconciliationRow) -> Option<u32> {
    files
        .iter()
        .find(|f| f.filename == row.filename)
        .map(|f| f.series_number)
}

#[test]
fn test_repeated_second_scan() {
    let rows = reconcile(&manifest(&[("T1", 1, 0)]), &[file("T1", 1), file("T1", 2)]);
    assert_eq!(
        summary(&rows),
        vec![
            ("T1".to_string(), "T11".to_string(), RowNote::None),
            ("T1".to_string(), "T12".to_string(), RowNote::Repeated),
        ]
    );
}

#[test]
fn test_missing_with_full_count() {
    let rows = reconcile(&manifest(&[("DTI", 2, 0)]), &[]);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].note, RowNote::Missing(2));
    assert!(rows[0].filename.is_empty());
    assert!(rows[0].bookmark_id.is_empty());
}

#[test]
fn test_order_key_beats_series_number() {
    let rows = reconcile(
        &manifest(&[("T1", 1, 0), ("DTI", 1, 1)]),
        &[file("DTI", 5), file("T1", 3)],
    );
    let tags: Vec<&str> = rows.iter().map(|r| r.tag.as_str()).collect();
    assert_eq!(tags, vec!["T1", "DTI"]);
}

#[test]
fn test_mixed_session_listing() {
    let m = manifest(&[
        ("T1", 1, 0),
        ("RST", 2, 1),
        ("DTI60-1000", 1, 2),
        ("FMAP", 0, 1),
        ("T2", 1, 3),
    ]);
    let files = vec![
        file("RST", 7),
        file("LOC", 1),
        file("T1", 3),
        file("FMAP", 4),
        file("T1", 9),
        file("DTI60-1000", 5),
        file("FMAP", 6),
    ];
    let rows = reconcile(&m, &files);

    let listing: Vec<(&str, &str, RowNote)> = rows
        .iter()
        .map(|r| (r.tag.as_str(), r.bookmark_id.as_str(), r.note))
        .collect();
    assert_eq!(
        listing,
        vec![
            ("T1", "T11", RowNote::None),
            ("T1", "T12", RowNote::Repeated),
            ("FMAP", "FMAP1", RowNote::Repeated),
            ("FMAP", "FMAP2", RowNote::Repeated),
            ("RST", "RST1", RowNote::None),
            ("RST", "", RowNote::Missing(1)),
            ("DTI60-1000", "DTI60-10001", RowNote::None),
            ("T2", "", RowNote::Missing(1)),
        ]
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2_000))]

    #[test]
    fn test_missing_and_repeated_rows_match_counts(manifest in arb_manifest(), files in arb_files()) {
        let rows = reconcile(&manifest, &files);

        for entry in manifest.entries() {
            let acquired = files.iter().filter(|f| f.tag == entry.tag).count() as u32;
            let missing: Vec<&ReconciliationRow> = rows
                .iter()
                .filter(|r| r.tag == entry.tag && r.is_missing())
                .collect();
            let repeated = rows
                .iter()
                .filter(|r| r.tag == entry.tag && r.note == RowNote::Repeated)
                .count() as u32;

            prop_assert!(missing.len() <= 1, "{} has {} missing rows", entry.tag, missing.len());
            if acquired < entry.expected_count {
                prop_assert_eq!(missing.len(), 1);
                prop_assert_eq!(missing[0].note, RowNote::Missing(entry.expected_count - acquired));
            } else {
                prop_assert!(missing.is_empty());
            }
            prop_assert_eq!(repeated, acquired.saturating_sub(entry.expected_count));
        }
    }

    #[test]
    fn test_only_manifest_tags_appear(manifest in arb_manifest(), files in arb_files()) {
        let rows = reconcile(&manifest, &files);

        for row in &rows {
            prop_assert!(manifest.contains(&row.tag), "row for untracked tag {}", row.tag);
        }
        let tracked = files.iter().filter(|f| manifest.contains(&f.tag)).count();
        let file_rows = rows.iter().filter(|r| r.has_file()).count();
        prop_assert_eq!(file_rows, tracked);
    }

    #[test]
    fn test_rows_ordered_by_key_then_series(manifest in arb_manifest(), files in arb_files()) {
        let rows = reconcile(&manifest, &files);

        for pair in rows.windows(2) {
            prop_assert!(pair[0].order_key <= pair[1].order_key);
            if pair[0].order_key != pair[1].order_key {
                continue;
            }
            // Within a key, missing rows come after every acquired file.
            prop_assert!(!(pair[0].is_missing() && pair[1].has_file()));
            if let (Some(a), Some(b)) = (series_of(&files, &pair[0]), series_of(&files, &pair[1])) {
                prop_assert!(a <= b, "{} before {}", pair[0].filename, pair[1].filename);
            }
        }
    }

    #[test]
    fn test_bookmarks_number_each_tag_from_one(manifest in arb_manifest(), files in arb_files()) {
        let rows = reconcile(&manifest, &files);

        let mut seen: HashMap<&str, u32> = HashMap::new();
        let mut by_series: Vec<&ReconciliationRow> = rows.iter().filter(|r| r.has_file()).collect();
        by_series.sort_by_key(|r| series_of(&files, r));
        for row in by_series {
            let ordinal = seen.entry(row.tag.as_str()).or_default();
            *ordinal += 1;
            prop_assert_eq!(&row.bookmark_id, &format!("{}{}", row.tag, ordinal));
        }
    }

    #[test]
    fn test_deterministic(manifest in arb_manifest(), files in arb_files()) {
        prop_assert_eq!(reconcile(&manifest, &files), reconcile(&manifest, &files));
    }
}
