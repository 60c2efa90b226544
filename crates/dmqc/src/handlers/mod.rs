//! Per-tag QC handlers
//!
//! Every scan family knows which artifacts it derives from a scan and which
//! external command produces each one. [`QcHandler::run`] executes those
//! steps idempotently: a step whose artifact already exists is not run
//! again, so rebuilding a report or resubmitting a half-finished job only
//! pays for what is missing.
//!
//! Which family handles which tag is fixed by the routing tables below,
//! one for human sessions and one for phantoms.

mod anatomical;
mod diffusion;
mod functional;
mod phantom;

pub use anatomical::AnatomicalQc;
pub use diffusion::DiffusionQc;
pub use functional::FunctionalQc;
pub use phantom::{PhantomAnatomicalQc, PhantomDiffusionQc, PhantomFunctionalQc};

use crate::naming;
use crate::tools::{ToolCommand, ToolRunner};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Closed set of QC pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanFamily {
    Anatomical,
    Functional,
    Diffusion,
    /// Tracked in the manifest but deliberately not QC'd (field maps).
    Ignored,
    PhantomAnatomical,
    PhantomFunctional,
    PhantomDiffusion,
}

impl ScanFamily {
    pub fn handler(self) -> Box<dyn QcHandler> {
        match self {
            ScanFamily::Anatomical => Box::new(AnatomicalQc),
            ScanFamily::Functional => Box::new(FunctionalQc),
            ScanFamily::Diffusion => Box::new(DiffusionQc),
            ScanFamily::Ignored => Box::new(IgnoreQc),
            ScanFamily::PhantomAnatomical => Box::new(PhantomAnatomicalQc),
            ScanFamily::PhantomFunctional => Box::new(PhantomFunctionalQc),
            ScanFamily::PhantomDiffusion => Box::new(PhantomDiffusionQc),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScanFamily::Anatomical => "anatomical",
            ScanFamily::Functional => "functional",
            ScanFamily::Diffusion => "diffusion",
            ScanFamily::Ignored => "ignored",
            ScanFamily::PhantomAnatomical => "phantom_anatomical",
            ScanFamily::PhantomFunctional => "phantom_functional",
            ScanFamily::PhantomDiffusion => "phantom_diffusion",
        }
    }
}

impl fmt::Display for ScanFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tag routing for human sessions.
pub const HUMAN_ROUTES: &[(&str, ScanFamily)] = &[
    ("T1", ScanFamily::Anatomical),
    ("T2", ScanFamily::Anatomical),
    ("PD", ScanFamily::Anatomical),
    ("PDT2", ScanFamily::Anatomical),
    ("FLAIR", ScanFamily::Anatomical),
    ("FMAP", ScanFamily::Ignored),
    ("FMAP-6.5", ScanFamily::Ignored),
    ("FMAP-8.5", ScanFamily::Ignored),
    ("RST", ScanFamily::Functional),
    ("EPI", ScanFamily::Functional),
    ("SPRL", ScanFamily::Functional),
    ("OBS", ScanFamily::Functional),
    ("IMI", ScanFamily::Functional),
    ("NBK", ScanFamily::Functional),
    ("EMP", ScanFamily::Functional),
    ("VN-SPRL", ScanFamily::Functional),
    ("SID", ScanFamily::Functional),
    ("MID", ScanFamily::Functional),
    ("DTI", ScanFamily::Diffusion),
    ("DTI21", ScanFamily::Diffusion),
    ("DTI22", ScanFamily::Diffusion),
    ("DTI23", ScanFamily::Diffusion),
    ("DTI60-29-1000", ScanFamily::Diffusion),
    ("DTI60-20-1000", ScanFamily::Diffusion),
    ("DTI60-1000", ScanFamily::Diffusion),
    ("DTI60-b1000", ScanFamily::Diffusion),
    ("DTI33-1000", ScanFamily::Diffusion),
    ("DTI33-b1000", ScanFamily::Diffusion),
    ("DTI33-3000", ScanFamily::Diffusion),
    ("DTI33-b3000", ScanFamily::Diffusion),
    ("DTI33-4500", ScanFamily::Diffusion),
    ("DTI33-b4500", ScanFamily::Diffusion),
    ("DTI23-1000", ScanFamily::Diffusion),
    ("DTI69-1000", ScanFamily::Diffusion),
];

/// Tag routing for phantom sessions.
pub const PHANTOM_ROUTES: &[(&str, ScanFamily)] = &[
    ("T1", ScanFamily::PhantomAnatomical),
    ("RST", ScanFamily::PhantomFunctional),
    ("DTI60-1000", ScanFamily::PhantomDiffusion),
];

/// Paths derived from one scan file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPaths {
    pub file: PathBuf,
    /// File name without `.nii`/`.nii.gz`
    pub stem: String,
    /// Subject QC output directory
    pub qc_dir: PathBuf,
}

impl ScanPaths {
    pub fn new(file: &Path, qc_dir: &Path) -> Self {
        Self {
            file: file.to_path_buf(),
            stem: naming::file_stem(file),
            qc_dir: qc_dir.to_path_buf(),
        }
    }

    /// `<qc_dir>/<stem><suffix>`
    pub fn output(&self, suffix: &str) -> PathBuf {
        self.qc_dir.join(format!("{}{}", self.stem, suffix))
    }

    /// `<qc_dir>/<stem>`, the prefix QC tools write their outputs under.
    pub fn output_prefix(&self) -> PathBuf {
        self.qc_dir.join(&self.stem)
    }

    /// Sibling of the scan with the same stem and another extension.
    pub fn sibling(&self, extension: &str) -> PathBuf {
        let dir = self.file.parent().unwrap_or_else(|| Path::new(""));
        dir.join(format!("{}.{}", self.stem, extension))
    }

    pub fn bvec(&self) -> PathBuf {
        self.sibling("bvec")
    }

    pub fn bval(&self) -> PathBuf {
        self.sibling("bval")
    }
}

/// One derived artifact and the command that produces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactStep {
    pub artifact: PathBuf,
    pub command: ToolCommand,
}

impl ArtifactStep {
    pub fn new(artifact: PathBuf, command: ToolCommand) -> Self {
        Self { artifact, command }
    }
}

/// `slicer <input> -S <gap> <width> <png>` montage step.
pub(crate) fn slicer_step(input: &Path, png: PathBuf, gap: u32, width: u32) -> ArtifactStep {
    let command = ToolCommand::new("slicer")
        .arg(input.display())
        .arg("-S")
        .arg(gap)
        .arg(width)
        .arg(png.display());
    ArtifactStep::new(png, command)
}

/// An image placed in the report under the scan's heading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportImage {
    pub path: PathBuf,
    pub title: Option<String>,
}

impl ReportImage {
    pub fn new(path: PathBuf) -> Self {
        Self { path, title: None }
    }

    pub fn titled(path: PathBuf, title: &str) -> Self {
        Self {
            path,
            title: Some(title.to_string()),
        }
    }
}

/// A step whose command failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepFailure {
    pub command: String,
    pub exit_code: Option<i32>,
    pub message: String,
}

/// What one handler invocation did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HandlerReport {
    pub images: Vec<ReportImage>,
    /// Steps whose command was run
    pub generated: usize,
    /// Steps skipped because the artifact already existed
    pub reused: usize,
    pub failures: Vec<StepFailure>,
}

/// A QC pipeline for one scan family.
pub trait QcHandler {
    fn family(&self) -> ScanFamily;

    /// Artifacts to derive from `scan`, in execution order.
    fn steps(&self, scan: &ScanPaths) -> Vec<ArtifactStep>;

    /// Images to show in the report for `scan`.
    fn images(&self, _scan: &ScanPaths) -> Vec<ReportImage> {
        Vec::new()
    }

    /// Produce every missing artifact for `file` under `qc_dir`.
    ///
    /// All steps are attempted even when one fails; failures are collected
    /// in the returned report.
    fn run(&self, runner: &dyn ToolRunner, file: &Path, qc_dir: &Path) -> HandlerReport {
        let scan = ScanPaths::new(file, qc_dir);
        let mut report = HandlerReport::default();

        for step in self.steps(&scan) {
            if step.artifact.is_file() {
                debug!("{} exists, skipping {}", step.artifact.display(), step.command.program);
                report.reused += 1;
                continue;
            }
            match runner.run(&step.command) {
                Ok(_) => report.generated += 1,
                Err(err) => {
                    warn!("{} step failed for {}: {}", self.family(), scan.stem, err);
                    report.failures.push(StepFailure {
                        command: step.command.to_string(),
                        exit_code: err.exit_code(),
                        message: err.to_string(),
                    });
                }
            }
        }

        report.images = self.images(&scan);
        report
    }
}

/// Field maps and other tracked-but-unchecked scans.
#[derive(Debug, Clone, Copy, Default)]
pub struct IgnoreQc;

impl QcHandler for IgnoreQc {
    fn family(&self) -> ScanFamily {
        ScanFamily::Ignored
    }

    fn steps(&self, _scan: &ScanPaths) -> Vec<ArtifactStep> {
        Vec::new()
    }
}

/// Tag → handler dispatch table.
pub struct HandlerRegistry {
    handlers: BTreeMap<String, Box<dyn QcHandler>>,
}

impl HandlerRegistry {
    pub fn from_routes(routes: &[(&str, ScanFamily)]) -> Self {
        let handlers = routes
            .iter()
            .map(|(tag, family)| (tag.to_string(), family.handler()))
            .collect();
        Self { handlers }
    }

    pub fn human() -> Self {
        Self::from_routes(HUMAN_ROUTES)
    }

    pub fn phantom() -> Self {
        Self::from_routes(PHANTOM_ROUTES)
    }

    /// An empty table.
    pub fn empty() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }

    /// Route `tag` to `handler`, replacing any existing route.
    pub fn with_handler(mut self, tag: &str, handler: Box<dyn QcHandler>) -> Self {
        self.handlers.insert(tag.to_string(), handler);
        self
    }

    pub fn get(&self, tag: &str) -> Option<&dyn QcHandler> {
        self.handlers.get(tag).map(|h| h.as_ref())
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.handlers.iter().map(|(tag, h)| (tag, h.family())))
            .finish()
    }
}
