//! Output formatting utilities for CLI commands
//!
//! Tables for humans, pretty JSON for `--json`.

use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Color, ContentArrangement, Table};
use dmqc::driver::DispatchOutcome;
use dmqc::reconcile::RowNote;
use serde::Serialize;

/// Print a table with headers and rows
pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut table = new_table(headers);
    for row in rows {
        table.add_row(row);
    }
    println!("{}", table);
}

/// Print a table with custom column colors
pub fn print_table_colored(headers: &[&str], rows: Vec<Vec<(String, Option<Color>)>>) {
    let mut table = new_table(headers);
    for row in rows {
        let cells: Vec<Cell> = row
            .into_iter()
            .map(|(text, color)| match color {
                Some(c) => Cell::new(text).fg(c),
                None => Cell::new(text),
            })
            .collect();
        table.add_row(cells);
    }
    println!("{}", table);
}

fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let header_cells: Vec<Cell> = headers
        .iter()
        .map(|h| Cell::new(h).fg(Color::Cyan))
        .collect();
    table.set_header(header_cells);
    table
}

/// Serialize `value` as pretty JSON on stdout
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Color for a reconciliation note
pub fn color_for_note(note: &RowNote) -> Option<Color> {
    match note {
        RowNote::None => None,
        RowNote::Repeated => Some(Color::Yellow),
        RowNote::Missing(_) => Some(Color::Red),
    }
}

/// Short label and color for a dispatch outcome
pub fn outcome_label(outcome: Option<&DispatchOutcome>) -> (String, Option<Color>) {
    match outcome {
        None => ("-".to_string(), None),
        Some(DispatchOutcome::ArtifactsWritten { family, generated, reused }) => (
            format!("{} ({} new, {} reused)", family, generated, reused),
            Some(Color::Green),
        ),
        Some(DispatchOutcome::SkippedNoHandler) => ("skipped".to_string(), Some(Color::Grey)),
        Some(DispatchOutcome::Failed { family, exit_code, failures }) => {
            let code = exit_code.map_or_else(|| "signal".to_string(), |c| c.to_string());
            (
                format!("{} failed (exit {}, {} step(s))", family, code, failures.len()),
                Some(Color::Red),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dmqc::handlers::ScanFamily;

    #[test]
    fn test_color_for_note() {
        assert_eq!(color_for_note(&RowNote::None), None);
        assert_eq!(color_for_note(&RowNote::Repeated), Some(Color::Yellow));
        assert_eq!(color_for_note(&RowNote::Missing(2)), Some(Color::Red));
    }

    #[test]
    fn test_outcome_label() {
        assert_eq!(outcome_label(None).0, "-");
        let written = DispatchOutcome::ArtifactsWritten {
            family: ScanFamily::Functional,
            generated: 5,
            reused: 0,
        };
        assert_eq!(outcome_label(Some(&written)).0, "functional (5 new, 0 reused)");
        let failed = DispatchOutcome::Failed {
            family: ScanFamily::Diffusion,
            exit_code: None,
            failures: Vec::new(),
        };
        assert_eq!(outcome_label(Some(&failed)).0, "diffusion failed (exit signal, 0 step(s))");
    }
}
