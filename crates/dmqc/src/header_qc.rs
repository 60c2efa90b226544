//! DICOM header comparison against gold standards
//!
//! Each acquired DICOM is diffed against the site's reference file for the
//! same tag with `qc-headers`, which appends any differences to a shared
//! log. Report sections then pull the lines that mention their scan.

use crate::error::Result;
use crate::naming;
use crate::subject::{self, DICOM_EXTENSIONS};
use crate::tools::{ToolCommand, ToolRunner};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Name of the per-subject header diff log.
pub const HEADER_DIFF_LOG: &str = "header-diff.log";

/// Outcome of one header comparison pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderQcSummary {
    pub compared: usize,
    /// Tags with no gold standard for the subject's site
    pub missing_standards: Vec<String>,
    /// Commands that exited non-zero
    pub failed: Vec<String>,
}

/// Diff every DICOM in `dicom_dir` against its gold standard, appending to
/// `log_file`.
pub fn run_header_qc(
    runner: &dyn ToolRunner,
    dicom_dir: &Path,
    standards_dir: &Path,
    log_file: &Path,
) -> Result<HeaderQcSummary> {
    let mut summary = HeaderQcSummary::default();

    let dicoms = subject::list_series(dicom_dir, DICOM_EXTENSIONS)?;
    let Some(first) = dicoms.first() else {
        debug!("No DICOMs in {}, skipping header QC", dicom_dir.display());
        return Ok(summary);
    };
    let site = first.parsed.ident.site.clone();
    let standards = standards_for_site(standards_dir, &site);

    for dicom in &dicoms {
        let tag = &dicom.parsed.tag;
        let Some(standard) = standards.get(tag) else {
            warn!("No standard with tag {} found in {}", tag, standards_dir.display());
            if !summary.missing_standards.contains(tag) {
                summary.missing_standards.push(tag.clone());
            }
            continue;
        };

        let command = ToolCommand::new("qc-headers")
            .arg(dicom.path.display())
            .arg(standard.display())
            .arg(log_file.display());
        match runner.run(&command) {
            Ok(_) => summary.compared += 1,
            Err(err) => {
                warn!("Header check failed for {}: {}", dicom.file_name, err);
                summary.failed.push(command.to_string());
            }
        }
    }

    Ok(summary)
}

/// Gold standards for `site`, keyed by tag. Files that do not follow the
/// naming convention are ignored.
fn standards_for_site(standards_dir: &Path, site: &str) -> BTreeMap<String, PathBuf> {
    let mut standards = BTreeMap::new();
    let Ok(entries) = std::fs::read_dir(standards_dir) else {
        warn!("Standards folder {} is not readable", standards_dir.display());
        return standards;
    };
    let mut paths: Vec<PathBuf> = entries.filter_map(|e| e.ok()).map(|e| e.path()).collect();
    paths.sort();

    for path in paths {
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        match naming::parse_filename(&name) {
            Ok(parsed) if parsed.ident.site == site => {
                standards.insert(parsed.tag, path);
            }
            Ok(_) => {}
            Err(_) => debug!("Ignoring {} in standards folder", name),
        }
    }
    standards
}

fn note_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^.*?: *").expect("note prefix pattern is valid"))
}

/// Header differences logged for the scan whose file stem is `stem`.
pub fn header_notes(log: &str, stem: &str) -> Vec<String> {
    if stem.is_empty() {
        return Vec::new();
    }
    log.lines()
        .filter(|line| line.contains(stem))
        .map(|line| note_prefix().replace(line, "").into_owned())
        .collect()
}

/// Read the log and pull the notes for `file`. A missing log has no notes.
pub fn header_notes_for_file(log_file: &Path, file: &Path) -> Vec<String> {
    match std::fs::read_to_string(log_file) {
        Ok(log) => header_notes(&log, &naming::file_stem(file)),
        Err(_) => Vec::new(),
    }
}
