//! CLI module for dmqc
//!
//! One submodule per subcommand, plus shared error and output helpers.

pub mod error;
pub mod manifest;
pub mod output;
pub mod reconcile;
pub mod report;

use crate::cli::error::HelpfulError;
use dmqc::config::ProjectConfig;
use dmqc::subject::Subject;
use std::path::Path;

/// Load the project settings, turning the common mistakes into hints.
pub fn load_config(path: &Path) -> anyhow::Result<ProjectConfig> {
    if !path.is_file() {
        return Err(HelpfulError::config_not_found(path).into());
    }
    ProjectConfig::load(path)
        .map_err(|err| HelpfulError::invalid_config(path, &err.to_string()).into())
}

/// Parse a subject ID and make sure its NIfTI folder exists.
pub fn find_subject(config: &ProjectConfig, id: &str) -> anyhow::Result<Subject> {
    let subject = Subject::parse(id).map_err(|_| HelpfulError::invalid_subject_id(id))?;
    if !subject.nii_dir(&config.paths).is_dir() {
        return Err(HelpfulError::subject_not_found(id, &config.paths.nii).into());
    }
    Ok(subject)
}

/// Fail with a hint when `site` is not configured.
pub fn require_site(config: &ProjectConfig, site: &str) -> anyhow::Result<()> {
    if config.sites.contains_key(site) {
        Ok(())
    } else {
        Err(HelpfulError::unknown_site(site).into())
    }
}
