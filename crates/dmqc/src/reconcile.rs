//! Expected-scan reconciliation
//!
//! Matches the files acquired for a subject against the site's
//! [`ExpectedManifest`] and produces the ordered table the report is built
//! from. Every acquired file with a tracked tag gets a row; every tag that
//! came up short gets one extra "missing" row. Files whose tag is not in the
//! manifest are auxiliary scans and are left out of the table.

use crate::error::Result;
use crate::manifest::ExpectedManifest;
use crate::naming;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// A scan file found in the subject's folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquiredFile {
    pub filename: String,
    pub tag: String,
    pub series_number: u32,
}

impl AcquiredFile {
    pub fn new(filename: impl Into<String>, tag: impl Into<String>, series_number: u32) -> Self {
        Self {
            filename: filename.into(),
            tag: tag.into(),
            series_number,
        }
    }

    /// Build from a file name using the naming convention.
    pub fn from_filename(filename: &str) -> Result<Self> {
        let parsed = naming::parse_filename(filename)?;
        Ok(Self::new(filename, parsed.tag, parsed.series))
    }
}

/// Classification of a table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "count", rename_all = "lowercase")]
pub enum RowNote {
    None,
    /// More files of this tag than the site expects.
    Repeated,
    /// This many expected files were not found.
    Missing(u32),
}

impl fmt::Display for RowNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowNote::None => Ok(()),
            RowNote::Repeated => write!(f, "Repeated Scan"),
            RowNote::Missing(n) => write!(f, "missing({})", n),
        }
    }
}

/// One line of the reconciliation table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationRow {
    pub tag: String,
    /// Empty for missing rows.
    pub filename: String,
    /// Report anchor, `tag` + per-tag ordinal. Empty for missing rows.
    pub bookmark_id: String,
    pub note: RowNote,
    pub order_key: i64,
}

impl ReconciliationRow {
    pub fn is_missing(&self) -> bool {
        matches!(self.note, RowNote::Missing(_))
    }

    pub fn has_file(&self) -> bool {
        !self.filename.is_empty()
    }
}

/// Counts over a reconciliation table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationSummary {
    pub present: usize,
    pub repeated: usize,
    /// Sum of all missing-row deficits.
    pub missing: u32,
}

impl ReconciliationSummary {
    pub fn from_rows(rows: &[ReconciliationRow]) -> Self {
        rows.iter().fold(Self::default(), |mut acc, row| {
            match row.note {
                RowNote::None => acc.present += 1,
                RowNote::Repeated => {
                    acc.present += 1;
                    acc.repeated += 1;
                }
                RowNote::Missing(n) => acc.missing += n,
            }
            acc
        })
    }
}

/// Build the ordered reconciliation table.
///
/// Rows are sorted by the manifest's order key. Within a key, real files
/// keep acquisition (series number) order and missing rows follow in
/// manifest declaration order. Equal series numbers keep the order of
/// `acquired`.
pub fn reconcile(manifest: &ExpectedManifest, acquired: &[AcquiredFile]) -> Vec<ReconciliationRow> {
    let mut by_series: Vec<&AcquiredFile> = acquired.iter().collect();
    by_series.sort_by_key(|file| file.series_number);

    let mut seen = vec![0u32; manifest.len()];
    let mut rows = Vec::with_capacity(acquired.len() + manifest.len());

    for file in by_series {
        let Some(position) = manifest.position(&file.tag) else {
            debug!("{}: tag {} is not tracked for site {}", file.filename, file.tag, manifest.site());
            continue;
        };
        let entry = &manifest.entries()[position];
        seen[position] += 1;
        let ordinal = seen[position];

        rows.push(ReconciliationRow {
            tag: entry.tag.clone(),
            filename: file.filename.clone(),
            bookmark_id: format!("{}{}", entry.tag, ordinal),
            note: if ordinal > entry.expected_count {
                RowNote::Repeated
            } else {
                RowNote::None
            },
            order_key: entry.order_key,
        });
    }

    for (entry, &count) in manifest.entries().iter().zip(&seen) {
        if count < entry.expected_count {
            rows.push(ReconciliationRow {
                tag: entry.tag.clone(),
                filename: String::new(),
                bookmark_id: String::new(),
                note: RowNote::Missing(entry.expected_count - count),
                order_key: entry.order_key,
            });
        }
    }

    rows.sort_by_key(|row| row.order_key);
    rows
}
