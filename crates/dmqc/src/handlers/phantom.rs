//! Phantom (calibration object) pipelines
//!
//! Phantom sessions produce statistics only; nothing is added to a report.

use super::{ArtifactStep, QcHandler, ScanFamily, ScanPaths};
use crate::tools::ToolCommand;

/// ADNI phantom contrast measurements.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhantomAnatomicalQc;

impl QcHandler for PhantomAnatomicalQc {
    fn family(&self) -> ScanFamily {
        ScanFamily::PhantomAnatomical
    }

    fn steps(&self, scan: &ScanPaths) -> Vec<ArtifactStep> {
        let contrasts = scan.output("_adni-contrasts.csv");
        vec![ArtifactStep::new(
            contrasts.clone(),
            ToolCommand::new("qc-adni")
                .arg(scan.file.display())
                .arg(contrasts.display()),
        )]
    }
}

/// fBIRN phantom fMRI stability pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhantomFunctionalQc;

impl QcHandler for PhantomFunctionalQc {
    fn family(&self) -> ScanFamily {
        ScanFamily::PhantomFunctional
    }

    fn steps(&self, scan: &ScanPaths) -> Vec<ArtifactStep> {
        vec![ArtifactStep::new(
            scan.output("_stats.csv"),
            ToolCommand::new("qc-fbirn-fmri")
                .arg(scan.file.display())
                .arg(scan.output_prefix().display()),
        )]
    }
}

/// fBIRN phantom DTI pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhantomDiffusionQc;

impl QcHandler for PhantomDiffusionQc {
    fn family(&self) -> ScanFamily {
        ScanFamily::PhantomDiffusion
    }

    fn steps(&self, scan: &ScanPaths) -> Vec<ArtifactStep> {
        vec![ArtifactStep::new(
            scan.output("_stats.csv"),
            ToolCommand::new("qc-fbirn-dti")
                .arg(scan.file.display())
                .arg(scan.bvec().display())
                .arg(scan.bval().display())
                .arg(scan.output_prefix().display())
                // no accelerated acquisition
                .arg("n"),
        )]
    }
}
