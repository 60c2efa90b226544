//! HTML report rendering
//!
//! Pure: takes the processed table and returns the document text. Writing
//! the file and the checklist entry is the caller's job.

use crate::driver::{DispatchOutcome, ProcessedRow};
use std::fmt::Write as _;
use std::path::{Component, Path, PathBuf};

const STYLE: &str = "\
body { font-family: sans-serif; }
table { border-collapse: collapse; }
td, th { border: 1px solid #999; padding: 2px 8px; text-align: left; }
img { max-width: 100%; }
.note { color: red; }
";

/// Tech notes state for the report header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TechNotes {
    /// The site does not link tech notes.
    NotLinked,
    Found(PathBuf),
    NotFound,
}

/// Render the report for `subject_id`. Image and tech notes links are made
/// relative to `report_dir`, the folder the report will be written to.
pub fn render(
    subject_id: &str,
    report_dir: &Path,
    rows: &[ProcessedRow],
    tech_notes: &TechNotes,
) -> String {
    let mut html = String::new();
    let subject = escape_html(subject_id);

    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
    let _ = writeln!(html, "<meta charset=\"utf-8\">");
    let _ = writeln!(html, "<title>QC report: {}</title>", subject);
    let _ = writeln!(html, "<style>\n{}</style>", STYLE);
    html.push_str("</head>\n<body>\n");
    let _ = writeln!(html, "<h1>QC report for {}</h1>", subject);

    write_table(&mut html, rows);
    write_tech_notes(&mut html, report_dir, tech_notes);

    for processed in rows {
        if let Some(outcome) = &processed.outcome {
            write_section(&mut html, report_dir, processed, outcome);
        }
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn write_table(html: &mut String, rows: &[ProcessedRow]) {
    html.push_str("<table>\n<tr><th>Tag</th><th>File</th><th>Notes</th></tr>\n");
    for processed in rows {
        let row = &processed.row;
        let file = if row.has_file() {
            format!(
                "<a href=\"#{}\">{}</a>",
                escape_html(&row.bookmark_id),
                escape_html(&row.filename)
            )
        } else {
            String::new()
        };
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td>{}</td><td class=\"note\">{}</td></tr>",
            escape_html(&row.tag),
            file,
            escape_html(&row.note.to_string())
        );
    }
    html.push_str("</table>\n");
}

fn write_tech_notes(html: &mut String, report_dir: &Path, tech_notes: &TechNotes) {
    match tech_notes {
        TechNotes::NotLinked => {}
        TechNotes::Found(pdf) => {
            let _ = writeln!(
                html,
                "<p><a href=\"{}\">Click Here to open Tech Notes</a></p>",
                escape_html(&relative_link(pdf, report_dir))
            );
        }
        TechNotes::NotFound => html.push_str("<p>Tech Notes not found</p>\n"),
    }
}

fn write_section(
    html: &mut String,
    report_dir: &Path,
    processed: &ProcessedRow,
    outcome: &DispatchOutcome,
) {
    let row = &processed.row;
    let _ = writeln!(
        html,
        "<h2 id=\"{}\">{}</h2>",
        escape_html(&row.bookmark_id),
        escape_html(&row.filename)
    );

    if !processed.header_notes.is_empty() {
        html.push_str("<table>\n");
        for note in &processed.header_notes {
            let _ = writeln!(html, "<tr><td class=\"note\">{}</td></tr>", escape_html(note));
        }
        html.push_str("</table>\n");
    }

    match outcome {
        DispatchOutcome::SkippedNoHandler => {
            let _ = writeln!(
                html,
                "<p>QC not configured for tag {}. Skipped.</p>",
                escape_html(&row.tag)
            );
        }
        DispatchOutcome::Failed { failures, .. } => {
            for failure in failures {
                let _ = writeln!(
                    html,
                    "<p class=\"note\">QC step failed: {}</p>",
                    escape_html(&failure.message)
                );
            }
        }
        DispatchOutcome::ArtifactsWritten { .. } => {}
    }

    for image in &processed.images {
        if let Some(title) = &image.title {
            let _ = writeln!(html, "<p>{}</p>", escape_html(title));
        }
        let _ = writeln!(
            html,
            "<img src=\"{}\">",
            escape_html(&relative_link(&image.path, report_dir))
        );
    }
}

/// Escape text for element content and double-quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// `target` as seen from `base`, with `/` separators. Relative inputs are
/// resolved against the working directory first. Falls back to the target
/// as given when the two share no root.
pub fn relative_link(target: &Path, base: &Path) -> String {
    let target = absolute(target);
    let base = absolute(base);
    let target_parts: Vec<Component> = target.components().collect();
    let base_parts: Vec<Component> = base.components().collect();

    let common = target_parts
        .iter()
        .zip(&base_parts)
        .take_while(|(a, b)| a == b)
        .count();
    if common == 0 {
        return target.display().to_string();
    }

    let mut parts: Vec<String> = Vec::new();
    for _ in common..base_parts.len() {
        parts.push("..".to_string());
    }
    for part in &target_parts[common..] {
        parts.push(part.as_os_str().to_string_lossy().into_owned());
    }
    parts.join("/")
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::{ReportImage, ScanFamily, StepFailure};
    use crate::reconcile::{ReconciliationRow, RowNote};

    fn processed(
        tag: &str,
        filename: &str,
        bookmark: &str,
        note: RowNote,
        outcome: Option<DispatchOutcome>,
    ) -> ProcessedRow {
        ProcessedRow {
            row: ReconciliationRow {
                tag: tag.to_string(),
                filename: filename.to_string(),
                bookmark_id: bookmark.to_string(),
                note,
                order_key: 0,
            },
            outcome,
            images: Vec::new(),
            header_notes: Vec::new(),
        }
    }

    fn written() -> Option<DispatchOutcome> {
        Some(DispatchOutcome::ArtifactsWritten {
            family: ScanFamily::Anatomical,
            generated: 1,
            reused: 0,
        })
    }

    #[test]
    fn test_table_rows_and_sections() {
        let qc_dir = Path::new("/qc/S");
        let mut t1 = processed("T1", "S_T1_02_sag.nii.gz", "T11", RowNote::None, written());
        t1.images.push(ReportImage::new(qc_dir.join("S_T1_02_sag.png")));
        t1.header_notes.push("EchoTime: 2.1 != 2.3".to_string());
        let t1_repeat = processed("T1", "S_T1_03_sag.nii.gz", "T12", RowNote::Repeated, written());
        let dti = processed("DTI", "", "", RowNote::Missing(2), None);

        let html = render("S", qc_dir, &[t1, t1_repeat, dti], &TechNotes::NotLinked);

        assert!(html.contains("<title>QC report: S</title>"));
        assert!(html.contains("<td>T1</td><td><a href=\"#T11\">S_T1_02_sag.nii.gz</a></td><td class=\"note\"></td>"));
        assert!(html.contains("<td class=\"note\">Repeated Scan</td>"));
        assert!(html.contains("<td>DTI</td><td></td><td class=\"note\">missing(2)</td>"));
        assert!(html.contains("<h2 id=\"T11\">S_T1_02_sag.nii.gz</h2>"));
        assert!(html.contains("<h2 id=\"T12\">"));
        assert!(html.contains("<img src=\"S_T1_02_sag.png\">"));
        assert!(html.contains("EchoTime: 2.1 != 2.3"));
        assert!(!html.contains("Tech Notes"));
        // missing rows get no section
        assert_eq!(html.matches("<h2").count(), 2);
    }

    #[test]
    fn test_sections_follow_table_order() {
        let rows = vec![
            processed("T1", "a.nii.gz", "T11", RowNote::None, written()),
            processed("RST", "b.nii.gz", "RST1", RowNote::None, written()),
        ];
        let html = render("S", Path::new("/qc/S"), &rows, &TechNotes::NotLinked);
        let t1 = html.find("<h2 id=\"T11\">").unwrap();
        let rst = html.find("<h2 id=\"RST1\">").unwrap();
        assert!(t1 < rst);
    }

    #[test]
    fn test_skip_and_failure_notices() {
        let skipped = processed(
            "FMAP",
            "S_FMAP_05_fm.nii.gz",
            "FMAP1",
            RowNote::None,
            Some(DispatchOutcome::SkippedNoHandler),
        );
        let failed = processed(
            "RST",
            "S_RST_04_rest.nii.gz",
            "RST1",
            RowNote::None,
            Some(DispatchOutcome::Failed {
                family: ScanFamily::Functional,
                exit_code: Some(2),
                failures: vec![StepFailure {
                    command: "qc-fmri x".to_string(),
                    exit_code: Some(2),
                    message: "'qc-fmri x' exited with code 2".to_string(),
                }],
            }),
        );
        let html = render("S", Path::new("/qc/S"), &[skipped, failed], &TechNotes::NotLinked);
        assert!(html.contains("QC not configured for tag FMAP. Skipped."));
        assert!(html.contains("QC step failed: &#39;qc-fmri x&#39; exited with code 2"));
    }

    #[test]
    fn test_tech_notes() {
        let found = TechNotes::Found(PathBuf::from("/data/RESOURCES/S_MR/notes/tech.pdf"));
        let html = render("S", Path::new("/data/qc/S"), &[], &found);
        assert!(html.contains("<a href=\"../../RESOURCES/S_MR/notes/tech.pdf\">"));

        let html = render("S", Path::new("/data/qc/S"), &[], &TechNotes::NotFound);
        assert!(html.contains("Tech Notes not found"));
    }

    #[test]
    fn test_text_is_escaped() {
        let row = processed("T1", "a<b>&.nii.gz", "T11", RowNote::None, written());
        let html = render("<S>", Path::new("/qc"), &[row], &TechNotes::NotLinked);
        assert!(html.contains("QC report for &lt;S&gt;"));
        assert!(html.contains("a&lt;b&gt;&amp;.nii.gz"));
        assert!(!html.contains("a<b>"));
    }

    #[test]
    fn test_relative_link() {
        assert_eq!(relative_link(Path::new("/qc/S/a.png"), Path::new("/qc/S")), "a.png");
        assert_eq!(relative_link(Path::new("/x/y/a.pdf"), Path::new("/x/z/w")), "../../y/a.pdf");
    }

    #[test]
    fn test_relative_link_between_relative_paths() {
        assert_eq!(
            relative_link(Path::new("RESOURCES/S_01/notes/a.pdf"), Path::new("qc/S")),
            "../../RESOURCES/S_01/notes/a.pdf"
        );
        assert_eq!(relative_link(Path::new("qc/S/a.png"), Path::new("qc/S")), "a.png");

        let found = TechNotes::Found(PathBuf::from("RESOURCES/S_01/notes/a.pdf"));
        let html = render("S", Path::new("qc/S"), &[], &found);
        assert!(html.contains("<a href=\"../../RESOURCES/S_01/notes/a.pdf\">"));
    }
}
