//! Diffusion-weighted scans

use super::{slicer_step, ArtifactStep, QcHandler, ReportImage, ScanFamily, ScanPaths};
use crate::tools::ToolCommand;

/// Diffusion statistics, spike count and a b0 montage. The bvec/bval files
/// sit next to the NIfTI.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffusionQc;

impl QcHandler for DiffusionQc {
    fn family(&self) -> ScanFamily {
        ScanFamily::Diffusion
    }

    fn steps(&self, scan: &ScanPaths) -> Vec<ArtifactStep> {
        let spikecount = scan.output("_spikecount.csv");
        vec![
            ArtifactStep::new(
                scan.output("_stats.csv"),
                ToolCommand::new("qc-dti")
                    .arg(scan.file.display())
                    .arg(scan.bvec().display())
                    .arg(scan.bval().display())
                    .arg(scan.output_prefix().display()),
            ),
            ArtifactStep::new(
                spikecount.clone(),
                ToolCommand::new("qc-spikecount")
                    .arg(scan.file.display())
                    .arg(spikecount.display())
                    .arg(scan.bval().display()),
            ),
            slicer_step(&scan.file, scan.output("_b0.png"), 2, 1600),
        ]
    }

    fn images(&self, scan: &ScanPaths) -> Vec<ReportImage> {
        vec![
            ReportImage::titled(scan.output("_b0.png"), "b0 montage"),
            // written by qc-dti
            ReportImage::titled(scan.output("_directions.png"), "bvec directions"),
        ]
    }
}
