//! Report command - Run QC and build reports
//!
//! With `--subject` the subject is processed in this process. Without it,
//! every subject folder under `paths.nii` is queued as its own batch job.

use crate::cli::output::{color_for_note, outcome_label, print_json, print_table, print_table_colored};
use crate::cli::{find_subject, load_config};
use anyhow::Context;
use chrono::Local;
use dmqc::batch::{self, BatchJob};
use dmqc::config::RunOptions;
use dmqc::driver::ProcessedRow;
use dmqc::pipeline::{self, SubjectRun};
use dmqc::subject;
use dmqc::tools::ProcessRunner;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Arguments for the report command
#[derive(Debug)]
pub struct ReportArgs {
    pub config: PathBuf,
    pub subject: Option<String>,
    pub walltime: String,
    pub rewrite: bool,
    pub dry_run: bool,
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct SubjectResult<'a> {
    subject: &'a str,
    #[serde(flatten)]
    run: &'a SubjectRun,
}

#[derive(Debug, Serialize)]
struct BatchResult {
    submitted: usize,
    dry_run: bool,
    jobs: Vec<BatchJob>,
}

pub fn run(args: ReportArgs) -> anyhow::Result<()> {
    let config = load_config(&args.config)?;
    let options = RunOptions {
        dry_run: args.dry_run,
        rewrite: args.rewrite,
        walltime: args.walltime.clone(),
    };
    let runner = ProcessRunner::new(options.dry_run);

    let Some(subject_id) = args.subject.as_deref() else {
        return run_batch(&args, &config.paths.nii, &options, &runner);
    };

    let subject = find_subject(&config, subject_id)?;
    let run = pipeline::run_subject(&config, &subject, &options, &runner)
        .with_context(|| format!("QC failed for {}", subject.id))?;

    if args.json {
        return print_json(&SubjectResult {
            subject: &subject.id,
            run: &run,
        });
    }

    match &run {
        SubjectRun::AlreadyReported { report } => {
            println!("Report exists: {} (use --rewrite to regenerate)", report.display());
        }
        SubjectRun::Reported { report, summary, rows } => {
            print_rows(rows);
            println!(
                "{}: {} present, {} repeated, {} missing, {} QC failure(s)",
                subject.id,
                summary.reconciliation.present,
                summary.reconciliation.repeated,
                summary.reconciliation.missing,
                summary.dispatch.failed
            );
            if options.dry_run {
                println!("Dry run: {} not written", report.display());
            } else {
                println!("Report: {}", report.display());
            }
        }
        SubjectRun::Phantom { summary, rows } => {
            print_rows(rows);
            println!(
                "{}: phantom QC, {} scan(s) processed, {} QC failure(s)",
                subject.id, summary.written, summary.failed
            );
        }
    }
    Ok(())
}

fn run_batch(
    args: &ReportArgs,
    nii_root: &Path,
    options: &RunOptions,
    runner: &ProcessRunner,
) -> anyhow::Result<()> {
    let subjects = subject::list_subject_dirs(nii_root)
        .with_context(|| format!("Failed to list subjects in {}", nii_root.display()))?;
    let exe = std::env::current_exe().context("Failed to locate the dmqc executable")?;
    // Jobs may start in another working directory.
    let config_path = args.config.canonicalize().unwrap_or_else(|_| args.config.clone());
    let stamp = batch::job_stamp(Local::now());
    let jobs = batch::plan_jobs(&exe, &config_path, &subjects, options, &stamp);

    let submitted = batch::submit_all(runner, &jobs, &options.walltime)
        .context("Batch submission aborted")?;
    info!("Queued {} job(s)", submitted);

    if args.json {
        return print_json(&BatchResult {
            submitted,
            dry_run: options.dry_run,
            jobs,
        });
    }

    let rows = jobs
        .iter()
        .map(|job| vec![job.name.clone(), job.subject.clone()])
        .collect();
    print_table(&["Job", "Subject"], rows);
    println!("{} job(s) queued", submitted);
    Ok(())
}

fn print_rows(rows: &[ProcessedRow]) {
    let table_rows = rows
        .iter()
        .map(|processed| {
            let row = &processed.row;
            vec![
                (row.tag.clone(), None),
                (row.filename.clone(), None),
                (row.note.to_string(), color_for_note(&row.note)),
                outcome_label(processed.outcome.as_ref()),
            ]
        })
        .collect();
    print_table_colored(&["Tag", "File", "Note", "QC"], table_rows);
}
