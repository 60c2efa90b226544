//! Structural scans (T1, T2, PD, FLAIR)

use super::{slicer_step, ArtifactStep, QcHandler, ReportImage, ScanFamily, ScanPaths};

const MONTAGE_GAP: u32 = 5;
const MONTAGE_WIDTH: u32 = 1600;

/// Slice montage of the structural volume.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnatomicalQc;

impl QcHandler for AnatomicalQc {
    fn family(&self) -> ScanFamily {
        ScanFamily::Anatomical
    }

    fn steps(&self, scan: &ScanPaths) -> Vec<ArtifactStep> {
        vec![slicer_step(&scan.file, scan.output(".png"), MONTAGE_GAP, MONTAGE_WIDTH)]
    }

    fn images(&self, scan: &ScanPaths) -> Vec<ReportImage> {
        vec![ReportImage::new(scan.output(".png"))]
    }
}
