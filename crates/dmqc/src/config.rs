//! Project configuration
//!
//! Loaded from the project's YAML settings file. Only the keys the QC run
//! needs are modelled; everything else in the file is ignored.

use crate::error::{QcError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Path keys every project file must define under `paths:`.
pub const REQUIRED_PATH_KEYS: &[&str] = &["dcm", "nii", "qc", "std", "meta"];

/// Parsed project configuration.
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    pub paths: ProjectPaths,
    pub sites: BTreeMap<String, SiteConfig>,
}

/// Resolved project directories.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectPaths {
    /// Per-subject DICOM folders
    pub dcm: PathBuf,
    /// Per-subject NIfTI folders
    pub nii: PathBuf,
    /// QC output root; one folder per subject
    pub qc: PathBuf,
    /// Gold-standard DICOM headers
    pub std: PathBuf,
    /// Project metadata (checklist.csv)
    pub meta: PathBuf,
    /// Log directory
    pub log: Option<PathBuf>,
    /// Non-scan resources (tech notes)
    pub resources: Option<PathBuf>,
}

/// One acquisition site.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Link scanner tech notes into the report
    #[serde(rename = "TechNotes", default)]
    pub tech_notes: bool,

    /// Raw `ExportInfo` block; interpreted by [`crate::manifest`].
    #[serde(rename = "ExportInfo", default)]
    pub export_info: Option<serde_yaml::Value>,
}

#[derive(Debug, Deserialize)]
struct RawProjectConfig {
    #[serde(default)]
    paths: BTreeMap<String, PathBuf>,
    #[serde(rename = "Sites", default)]
    sites: BTreeMap<String, SiteConfig>,
}

impl ProjectConfig {
    /// Load and validate a project file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse and validate project YAML.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let raw: RawProjectConfig = serde_yaml::from_str(content)?;
        let paths = ProjectPaths::from_raw(raw.paths)?;
        Ok(Self {
            paths,
            sites: raw.sites,
        })
    }

    /// Look up a site block.
    pub fn site(&self, name: &str) -> Result<&SiteConfig> {
        self.sites
            .get(name)
            .ok_or_else(|| QcError::Config(format!("site '{}' is not defined under Sites", name)))
    }
}

impl ProjectPaths {
    fn from_raw(mut raw: BTreeMap<String, PathBuf>) -> Result<Self> {
        if let Some(missing) = REQUIRED_PATH_KEYS.iter().find(|key| !raw.contains_key(**key)) {
            return Err(QcError::Config(format!("paths:{} not defined", missing)));
        }
        Ok(Self {
            dcm: raw.remove("dcm").unwrap_or_default(),
            nii: raw.remove("nii").unwrap_or_default(),
            qc: raw.remove("qc").unwrap_or_default(),
            std: raw.remove("std").unwrap_or_default(),
            meta: raw.remove("meta").unwrap_or_default(),
            log: raw.remove("log"),
            resources: raw.remove("resources"),
        })
    }

    /// `<meta>/checklist.csv`
    pub fn checklist_file(&self) -> PathBuf {
        self.meta.join("checklist.csv")
    }
}

/// Run-wide switches, passed explicitly to every entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Log external commands instead of running them
    pub dry_run: bool,
    /// Regenerate reports that already exist
    pub rewrite: bool,
    /// Walltime requested for batch jobs
    pub walltime: String,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            rewrite: false,
            walltime: "1:00:00".to_string(),
        }
    }
}
