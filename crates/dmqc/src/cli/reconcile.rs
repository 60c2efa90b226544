//! Reconcile command - Show the expected-vs-acquired table for a subject
//!
//! Read-only: no QC tools are run and nothing is written.

use crate::cli::output::{color_for_note, print_json, print_table_colored};
use crate::cli::{find_subject, load_config, require_site};
use dmqc::pipeline;
use dmqc::reconcile::{ReconciliationRow, ReconciliationSummary};
use serde::Serialize;
use std::path::PathBuf;

/// Arguments for the reconcile command
#[derive(Debug)]
pub struct ReconcileArgs {
    pub config: PathBuf,
    pub subject: String,
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct ReconcileResult {
    subject: String,
    site: String,
    rows: Vec<ReconciliationRow>,
    summary: ReconciliationSummary,
}

pub fn run(args: ReconcileArgs) -> anyhow::Result<()> {
    let config = load_config(&args.config)?;
    let subject = find_subject(&config, &args.subject)?;
    require_site(&config, subject.site())?;

    let rows = pipeline::reconcile_subject(&config, &subject)?;
    let result = ReconcileResult {
        subject: subject.id.clone(),
        site: subject.site().to_string(),
        summary: ReconciliationSummary::from_rows(&rows),
        rows,
    };

    if args.json {
        return print_json(&result);
    }

    let table_rows = result
        .rows
        .iter()
        .map(|row| {
            vec![
                (row.tag.clone(), None),
                (row.filename.clone(), None),
                (row.bookmark_id.clone(), None),
                (row.note.to_string(), color_for_note(&row.note)),
            ]
        })
        .collect();
    print_table_colored(&["Tag", "File", "Bookmark", "Note"], table_rows);
    println!(
        "{}: {} present, {} repeated, {} missing",
        result.subject, result.summary.present, result.summary.repeated, result.summary.missing
    );
    Ok(())
}
