//! BOLD fMRI scans

use super::{slicer_step, ArtifactStep, QcHandler, ReportImage, ScanFamily, ScanPaths};
use crate::tools::ToolCommand;

const MONTAGE_GAP: u32 = 2;
const MONTAGE_WIDTH: u32 = 1600;

/// Scan length check, signal statistics and three montages: the raw
/// series, the SFNR map and the correlation map written by `qc-fmri`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FunctionalQc;

impl QcHandler for FunctionalQc {
    fn family(&self) -> ScanFamily {
        ScanFamily::Functional
    }

    fn steps(&self, scan: &ScanPaths) -> Vec<ArtifactStep> {
        let scanlengths = scan.output("_scanlengths.csv");
        let stats = scan.output("_stats.csv");
        vec![
            ArtifactStep::new(
                scanlengths.clone(),
                ToolCommand::new("qc-scanlength")
                    .arg(scan.file.display())
                    .arg(scanlengths.display()),
            ),
            ArtifactStep::new(
                stats,
                ToolCommand::new("qc-fmri")
                    .arg(scan.file.display())
                    .arg(scan.output_prefix().display()),
            ),
            slicer_step(&scan.file, scan.output("_raw.png"), MONTAGE_GAP, MONTAGE_WIDTH),
            slicer_step(
                &scan.output("_sfnr.nii.gz"),
                scan.output("_sfnr.png"),
                MONTAGE_GAP,
                MONTAGE_WIDTH,
            ),
            slicer_step(
                &scan.output("_corr.nii.gz"),
                scan.output("_corr.png"),
                MONTAGE_GAP,
                MONTAGE_WIDTH,
            ),
        ]
    }

    fn images(&self, scan: &ScanPaths) -> Vec<ReportImage> {
        vec![
            ReportImage::titled(scan.output("_raw.png"), "BOLD montage"),
            ReportImage::titled(scan.output("_sfnr.png"), "SFNR map"),
            ReportImage::titled(scan.output("_corr.png"), "correlation map"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_steps_in_order() {
        let scan = ScanPaths::new(Path::new("/nii/S/S_RST_04_rest.nii.gz"), Path::new("/qc/S"));
        let commands: Vec<String> = FunctionalQc
            .steps(&scan)
            .iter()
            .map(|s| s.command.to_string())
            .collect();
        assert_eq!(
            commands,
            vec![
                "qc-scanlength /nii/S/S_RST_04_rest.nii.gz /qc/S/S_RST_04_rest_scanlengths.csv",
                "qc-fmri /nii/S/S_RST_04_rest.nii.gz /qc/S/S_RST_04_rest",
                "slicer /nii/S/S_RST_04_rest.nii.gz -S 2 1600 /qc/S/S_RST_04_rest_raw.png",
                "slicer /qc/S/S_RST_04_rest_sfnr.nii.gz -S 2 1600 /qc/S/S_RST_04_rest_sfnr.png",
                "slicer /qc/S/S_RST_04_rest_corr.nii.gz -S 2 1600 /qc/S/S_RST_04_rest_corr.png",
            ]
        );
    }

    #[test]
    fn test_image_titles() {
        let scan = ScanPaths::new(Path::new("/nii/S/S_RST_04_rest.nii.gz"), Path::new("/qc/S"));
        let titles: Vec<Option<String>> =
            FunctionalQc.images(&scan).into_iter().map(|i| i.title).collect();
        assert_eq!(
            titles,
            vec![
                Some("BOLD montage".to_string()),
                Some("SFNR map".to_string()),
                Some("correlation map".to_string()),
            ]
        );
    }
}
