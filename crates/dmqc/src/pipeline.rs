//! One subject, end to end
//!
//! Clears zero-byte leftovers, reconciles the subject's scans against the
//! site manifest, runs the header diff and per-scan QC, then writes the
//! report and its checklist entry. Phantom sessions only get per-scan QC.

use crate::checklist;
use crate::config::{ProjectConfig, RunOptions};
use crate::driver::{DispatchSummary, ProcessedRow, SubjectReportDriver, SubjectSummary};
use crate::error::Result;
use crate::handlers::HandlerRegistry;
use crate::header_qc::{self, HEADER_DIFF_LOG};
use crate::manifest::ExpectedManifest;
use crate::reconcile::{self, AcquiredFile, ReconciliationRow, ReconciliationSummary, RowNote};
use crate::report::{self, TechNotes};
use crate::subject::{self, SeriesFile, Subject, NIFTI_EXTENSIONS};
use crate::tools::ToolRunner;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// How a subject run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubjectRun {
    /// The report exists and rewrite is off.
    AlreadyReported { report: PathBuf },
    Reported {
        report: PathBuf,
        summary: SubjectSummary,
        rows: Vec<ProcessedRow>,
    },
    /// Phantom session: per-scan QC only.
    Phantom {
        summary: DispatchSummary,
        rows: Vec<ProcessedRow>,
    },
}

/// Reconcile `subject`'s NIfTIs against its site manifest without running
/// anything.
pub fn reconcile_subject(config: &ProjectConfig, subject: &Subject) -> Result<Vec<ReconciliationRow>> {
    let manifest = ExpectedManifest::build(config, subject.site())?;
    let series = subject::list_series(&subject.nii_dir(&config.paths), NIFTI_EXTENSIONS)?;
    let acquired: Vec<AcquiredFile> = series.iter().map(acquired_file).collect();
    Ok(reconcile::reconcile(&manifest, &acquired))
}

/// Run QC for one subject.
pub fn run_subject(
    config: &ProjectConfig,
    subject: &Subject,
    options: &RunOptions,
    runner: &dyn ToolRunner,
) -> Result<SubjectRun> {
    let paths = &config.paths;
    let qc_dir = subject.qc_dir(paths);
    let nii_dir = subject.nii_dir(paths);

    subject::remove_empty_files(&qc_dir)?;

    if subject.is_phantom() {
        return run_phantom(subject, &nii_dir, &qc_dir, options, runner);
    }

    let report_path = subject.report_path(paths);
    if report_path.exists() && !options.rewrite {
        debug!("{} exists, skipping", report_path.display());
        return Ok(SubjectRun::AlreadyReported { report: report_path });
    }

    // Everything that can fail the subject happens before any output.
    let site = config.site(subject.site())?;
    let rows = reconcile_subject(config, subject)?;
    let reconciliation = ReconciliationSummary::from_rows(&rows);

    ensure_dir(&qc_dir, options)?;

    let header_log = qc_dir.join(HEADER_DIFF_LOG);
    if !header_log.exists() {
        let summary =
            header_qc::run_header_qc(runner, &subject.dcm_dir(paths), &paths.std, &header_log)?;
        debug!("Header QC for {}: {:?}", subject.id, summary);
    }

    let registry = HandlerRegistry::human();
    let processed = SubjectReportDriver::new(&registry, runner, &nii_dir, &qc_dir)
        .with_header_log(header_log)
        .drive(rows);

    // Resource folders are named per session.
    let tech_notes = match (&paths.resources, site.tech_notes) {
        (Some(resources), true) => {
            match subject::find_tech_notes(resources, &subject.ident.with_session()) {
                Some(pdf) => TechNotes::Found(pdf),
                None => TechNotes::NotFound,
            }
        }
        _ => TechNotes::NotLinked,
    };

    let html = report::render(&subject.id, &qc_dir, &processed, &tech_notes);
    if options.dry_run {
        info!("Dry run, not writing {}", report_path.display());
    } else {
        fs::write(&report_path, html)?;
        info!("Wrote {}", report_path.display());
        checklist::record_report(&paths.checklist_file(), &report_path)?;
    }

    Ok(SubjectRun::Reported {
        report: report_path,
        summary: SubjectSummary {
            reconciliation,
            dispatch: DispatchSummary::from_processed(&processed),
        },
        rows: processed,
    })
}

fn run_phantom(
    subject: &Subject,
    nii_dir: &Path,
    qc_dir: &Path,
    options: &RunOptions,
    runner: &dyn ToolRunner,
) -> Result<SubjectRun> {
    info!("{} is a phantom, running phantom QC", subject.id);
    let mut series = subject::list_series(nii_dir, NIFTI_EXTENSIONS)?;
    series.sort_by_key(|s| s.parsed.series);
    ensure_dir(qc_dir, options)?;

    let rows: Vec<ReconciliationRow> = series
        .iter()
        .map(|s| ReconciliationRow {
            tag: s.parsed.tag.clone(),
            filename: s.file_name.clone(),
            bookmark_id: String::new(),
            note: RowNote::None,
            order_key: 0,
        })
        .collect();

    let registry = HandlerRegistry::phantom();
    let processed = SubjectReportDriver::new(&registry, runner, nii_dir, qc_dir).drive(rows);
    Ok(SubjectRun::Phantom {
        summary: DispatchSummary::from_processed(&processed),
        rows: processed,
    })
}

fn acquired_file(series: &SeriesFile) -> AcquiredFile {
    AcquiredFile::new(
        series.file_name.clone(),
        series.parsed.tag.clone(),
        series.parsed.series,
    )
}

fn ensure_dir(dir: &Path, options: &RunOptions) -> Result<()> {
    if !options.dry_run {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}
