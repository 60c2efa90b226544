//! Per-row QC dispatch
//!
//! Walks a reconciliation table in order and runs the handler registered
//! for each present scan. Outcomes come back in the same order so the
//! report can reference each scan's artifacts under its bookmark.
//!
//! A failing tool never stops the walk: the row records the failure and the
//! next row is processed.

use crate::handlers::{HandlerRegistry, ReportImage, ScanFamily, StepFailure};
use crate::header_qc;
use crate::reconcile::{ReconciliationRow, ReconciliationSummary};
use crate::tools::ToolRunner;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// What happened when a row was dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// Every artifact exists, whether produced now or by an earlier run.
    ArtifactsWritten {
        family: ScanFamily,
        generated: usize,
        reused: usize,
    },
    /// The tag is tracked but has no QC handler.
    SkippedNoHandler,
    /// At least one tool exited non-zero.
    Failed {
        family: ScanFamily,
        exit_code: Option<i32>,
        failures: Vec<StepFailure>,
    },
}

/// A reconciliation row after dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessedRow {
    pub row: ReconciliationRow,
    /// `None` for missing-scan rows, which are never dispatched.
    pub outcome: Option<DispatchOutcome>,
    pub images: Vec<ReportImage>,
    /// Header differences against the site's gold standard
    pub header_notes: Vec<String>,
}

/// Counts over a driven table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
    pub missing_rows: usize,
}

impl DispatchSummary {
    pub fn from_processed(rows: &[ProcessedRow]) -> Self {
        rows.iter().fold(Self::default(), |mut acc, processed| {
            match &processed.outcome {
                Some(DispatchOutcome::ArtifactsWritten { .. }) => acc.written += 1,
                Some(DispatchOutcome::SkippedNoHandler) => acc.skipped += 1,
                Some(DispatchOutcome::Failed { .. }) => acc.failed += 1,
                None => acc.missing_rows += 1,
            }
            acc
        })
    }
}

/// Runs handlers for one subject's table.
pub struct SubjectReportDriver<'a> {
    registry: &'a HandlerRegistry,
    runner: &'a dyn ToolRunner,
    scan_dir: PathBuf,
    qc_dir: PathBuf,
    header_log: Option<PathBuf>,
}

impl<'a> SubjectReportDriver<'a> {
    /// `scan_dir` holds the subject's scans; artifacts go to `qc_dir`.
    pub fn new(
        registry: &'a HandlerRegistry,
        runner: &'a dyn ToolRunner,
        scan_dir: &Path,
        qc_dir: &Path,
    ) -> Self {
        Self {
            registry,
            runner,
            scan_dir: scan_dir.to_path_buf(),
            qc_dir: qc_dir.to_path_buf(),
            header_log: None,
        }
    }

    /// Annotate rows with notes from this header diff log.
    pub fn with_header_log(mut self, log: PathBuf) -> Self {
        self.header_log = Some(log);
        self
    }

    /// Dispatch every row, strictly in table order.
    pub fn drive(&self, rows: Vec<ReconciliationRow>) -> Vec<ProcessedRow> {
        rows.into_iter().map(|row| self.process(row)).collect()
    }

    fn process(&self, row: ReconciliationRow) -> ProcessedRow {
        if !row.has_file() {
            return ProcessedRow {
                row,
                outcome: None,
                images: Vec::new(),
                header_notes: Vec::new(),
            };
        }

        let path = self.scan_dir.join(&row.filename);
        info!("QC scan {}", path.display());

        let Some(handler) = self.registry.get(&row.tag) else {
            warn!("No QC tag {} for scan {}. Skipping.", row.tag, path.display());
            return ProcessedRow {
                row,
                outcome: Some(DispatchOutcome::SkippedNoHandler),
                images: Vec::new(),
                header_notes: Vec::new(),
            };
        };

        let header_notes = self
            .header_log
            .as_deref()
            .map(|log| header_qc::header_notes_for_file(log, &path))
            .unwrap_or_default();

        let report = handler.run(self.runner, &path, &self.qc_dir);
        let outcome = match report.failures.first() {
            None => DispatchOutcome::ArtifactsWritten {
                family: handler.family(),
                generated: report.generated,
                reused: report.reused,
            },
            Some(first) => {
                warn!(
                    "{} of {} QC steps failed for {}",
                    report.failures.len(),
                    report.failures.len() + report.generated + report.reused,
                    row.filename
                );
                DispatchOutcome::Failed {
                    family: handler.family(),
                    exit_code: first.exit_code,
                    failures: report.failures.clone(),
                }
            }
        };

        ProcessedRow {
            row,
            outcome: Some(outcome),
            images: report.images,
            header_notes,
        }
    }
}

/// Reconciliation and dispatch counts for one subject.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SubjectSummary {
    pub reconciliation: ReconciliationSummary,
    pub dispatch: DispatchSummary,
}
