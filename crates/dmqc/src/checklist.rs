//! Project QC checklist
//!
//! `<meta>/checklist.csv` holds one line per generated report: the report
//! name without extension, optionally followed by a reviewer's sign-off.

use crate::error::Result;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use tracing::debug;

/// Add the report to the checklist unless a line already starts with its
/// name. Returns whether a line was appended.
pub fn record_report(checklist: &Path, report: &Path) -> Result<bool> {
    let name = report
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let existing = match fs::read_to_string(checklist) {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => String::new(),
        Err(err) => return Err(err.into()),
    };

    if is_listed(&existing, &name) {
        debug!("{} already in {}", name, checklist.display());
        return Ok(false);
    }

    let mut file = OpenOptions::new().create(true).append(true).open(checklist)?;
    if !existing.is_empty() && !existing.ends_with('\n') {
        writeln!(file)?;
    }
    writeln!(file, "{}", name)?;
    Ok(true)
}

fn is_listed(content: &str, name: &str) -> bool {
    content
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .any(|first| first == name)
}
