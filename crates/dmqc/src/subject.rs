//! Subject folders
//!
//! Locates a subject's NIfTI/DICOM folders and QC output, lists the series
//! files in them, and handles the small filesystem chores around a run.

use crate::config::ProjectPaths;
use crate::error::{QcError, Result};
use crate::naming::{self, Identifier, ParsedName};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

pub const NIFTI_EXTENSIONS: &[&str] = &[".nii", ".nii.gz"];
pub const DICOM_EXTENSIONS: &[&str] = &[".dcm"];

/// Tech notes sit at `<resources>/<subject>*/*/*/*.pdf`.
const TECH_NOTES_DEPTH: usize = 4;

/// A subject session, named by the folder it lives in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    /// Folder name, e.g. `SPN01_CMH_0001_01`
    pub id: String,
    pub ident: Identifier,
}

impl Subject {
    pub fn parse(id: &str) -> Result<Self> {
        Ok(Self {
            id: id.to_string(),
            ident: Identifier::parse(id)?,
        })
    }

    pub fn site(&self) -> &str {
        &self.ident.site
    }

    pub fn is_phantom(&self) -> bool {
        self.ident.is_phantom()
    }

    pub fn nii_dir(&self, paths: &ProjectPaths) -> PathBuf {
        paths.nii.join(&self.id)
    }

    pub fn dcm_dir(&self, paths: &ProjectPaths) -> PathBuf {
        paths.dcm.join(&self.id)
    }

    pub fn qc_dir(&self, paths: &ProjectPaths) -> PathBuf {
        paths.qc.join(&self.id)
    }

    /// `<qc>/<subject>/qc_<subject>.html`
    pub fn report_path(&self, paths: &ProjectPaths) -> PathBuf {
        self.qc_dir(paths).join(format!("qc_{}.html", self.id))
    }
}

/// A series file that follows the naming convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesFile {
    pub path: PathBuf,
    pub file_name: String,
    pub parsed: ParsedName,
}

/// List the series files directly inside `dir` whose extension is one of
/// `extensions`, sorted by file name.
///
/// A missing folder lists as empty. Any file with a matching extension
/// that does not follow the naming convention fails the whole listing.
pub fn list_series(dir: &Path, extensions: &[&str]) -> Result<Vec<SeriesFile>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!("{} does not exist", dir.display());
            return Ok(Vec::new());
        }
        Err(err) => return Err(err.into()),
    };

    let mut series = Vec::new();
    let mut misnamed = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().into_owned();
        let (_, ext) = naming::split_extension(&file_name);
        if !extensions.contains(&ext) {
            continue;
        }
        match naming::parse_filename(&file_name) {
            Ok(parsed) => series.push(SeriesFile {
                path: entry.path(),
                file_name,
                parsed,
            }),
            Err(_) => misnamed.push(entry.path().display().to_string()),
        }
    }

    if !misnamed.is_empty() {
        misnamed.sort();
        return Err(QcError::NameFormat(format!("File(s) misnamed: {}", misnamed.join(", "))));
    }

    series.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    Ok(series)
}

/// Delete zero-byte files under `dir`; they are left behind by killed runs
/// and would otherwise pass the artifact-exists check.
pub fn remove_empty_files(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }
    let mut removed = 0;
    for entry in WalkDir::new(dir) {
        let entry = entry?;
        if entry.file_type().is_file() && entry.metadata()?.len() == 0 {
            info!("Removing empty file {}", entry.path().display());
            fs::remove_file(entry.path())?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// First tech-notes PDF under a `resources` folder whose name starts with
/// `session_id`, if any.
pub fn find_tech_notes(resources: &Path, session_id: &str) -> Option<PathBuf> {
    let mut session_dirs: Vec<PathBuf> = fs::read_dir(resources)
        .ok()?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(session_id))
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    session_dirs.sort();

    session_dirs.iter().find_map(|dir| {
        let mut pdfs: Vec<PathBuf> = WalkDir::new(dir)
            .max_depth(TECH_NOTES_DEPTH - 1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| p.extension().map_or(false, |ext| ext.eq_ignore_ascii_case("pdf")))
            .collect();
        pdfs.sort();
        pdfs.into_iter().next()
    })
}

/// Subject folder names under the NIfTI root, sorted.
pub fn list_subject_dirs(nii_root: &Path) -> Result<Vec<String>> {
    let mut subjects = Vec::new();
    for entry in fs::read_dir(nii_root)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            subjects.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    subjects.sort();
    Ok(subjects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn paths(root: &Path) -> ProjectPaths {
        ProjectPaths {
            dcm: root.join("dcm"),
            nii: root.join("nii"),
            qc: root.join("qc"),
            std: root.join("std"),
            meta: root.join("meta"),
            log: None,
            resources: None,
        }
    }

    #[test]
    fn test_subject_paths() {
        let subject = Subject::parse("SPN01_CMH_0001_01").unwrap();
        let p = paths(Path::new("/archive"));
        assert_eq!(subject.site(), "CMH");
        assert!(!subject.is_phantom());
        assert_eq!(subject.nii_dir(&p), PathBuf::from("/archive/nii/SPN01_CMH_0001_01"));
        assert_eq!(
            subject.report_path(&p),
            PathBuf::from("/archive/qc/SPN01_CMH_0001_01/qc_SPN01_CMH_0001_01.html")
        );
        assert!(Subject::parse("SPN01_CMH_PHA_FBN0001").unwrap().is_phantom());
        assert!(Subject::parse("not-a-subject").is_err());
    }

    #[test]
    fn test_list_series_filters_extensions() {
        let dir = TempDir::new().unwrap();
        for name in [
            "SPN01_CMH_0001_01_01_T1_02_sag.nii.gz",
            "SPN01_CMH_0001_01_01_DTI_05_ax.nii",
            "SPN01_CMH_0001_01_01_DTI_05_ax.bvec",
            "notes.txt",
        ] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("sub.nii")).unwrap();

        let series = list_series(dir.path(), NIFTI_EXTENSIONS).unwrap();
        let names: Vec<&str> = series.iter().map(|s| s.file_name.as_str()).collect();
        assert_eq!(
            names,
            vec!["SPN01_CMH_0001_01_01_DTI_05_ax.nii", "SPN01_CMH_0001_01_01_T1_02_sag.nii.gz"]
        );
        assert_eq!(series[1].parsed.tag, "T1");
    }

    #[test]
    fn test_list_series_reports_all_misnamed() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("SPN01_CMH_0001_01_01_T1_02_sag.nii.gz"), b"x").unwrap();
        fs::write(dir.path().join("scan1.nii.gz"), b"x").unwrap();
        fs::write(dir.path().join("scan2.nii"), b"x").unwrap();

        let err = list_series(dir.path(), NIFTI_EXTENSIONS).unwrap_err();
        let QcError::NameFormat(msg) = err else {
            panic!("expected name format error");
        };
        assert!(msg.contains("scan1.nii.gz"));
        assert!(msg.contains("scan2.nii"));
    }

    #[test]
    fn test_list_series_missing_dir() {
        let dir = TempDir::new().unwrap();
        assert!(list_series(&dir.path().join("nope"), DICOM_EXTENSIONS).unwrap().is_empty());
    }

    #[test]
    fn test_remove_empty_files() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("keep.png"), b"png").unwrap();
        fs::write(dir.path().join("empty.png"), b"").unwrap();
        fs::write(dir.path().join("nested/empty.csv"), b"").unwrap();

        assert_eq!(remove_empty_files(dir.path()).unwrap(), 2);
        assert!(dir.path().join("keep.png").exists());
        assert!(!dir.path().join("empty.png").exists());
        assert!(!dir.path().join("nested/empty.csv").exists());
        assert_eq!(remove_empty_files(&dir.path().join("missing")).unwrap(), 0);
    }

    #[test]
    fn test_find_tech_notes() {
        let dir = TempDir::new().unwrap();
        let deep = dir.path().join("SPN01_CMH_0001_01_01_SE01_MR/scans/notes");
        fs::create_dir_all(&deep).unwrap();
        fs::write(deep.join("technotes.pdf"), b"%PDF").unwrap();

        let found = find_tech_notes(dir.path(), "SPN01_CMH_0001_01").unwrap();
        assert_eq!(found, deep.join("technotes.pdf"));
        assert!(find_tech_notes(dir.path(), "SPN01_CMH_0002_01").is_none());
    }

    #[test]
    fn test_list_subject_dirs() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("SPN01_CMH_0002_01")).unwrap();
        fs::create_dir(dir.path().join("SPN01_CMH_0001_01")).unwrap();
        fs::write(dir.path().join("README"), b"x").unwrap();
        assert_eq!(
            list_subject_dirs(dir.path()).unwrap(),
            vec!["SPN01_CMH_0001_01", "SPN01_CMH_0002_01"]
        );
    }
}
