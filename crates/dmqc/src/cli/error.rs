//! Helpful error types for CLI commands
//!
//! Every error includes:
//! - What went wrong
//! - Context about the situation
//! - Suggestions for how to fix it

use serde_json::json;
use std::fmt;
use std::path::Path;

/// An error with helpful context and suggestions
#[derive(Debug)]
pub struct HelpfulError {
    /// The main error message
    pub message: String,
    /// Additional context about what was happening
    pub context: Option<String>,
    /// Suggestions for how to fix the error
    pub suggestions: Vec<String>,
}

impl HelpfulError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_suggestions(mut self, suggestions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.suggestions.extend(suggestions.into_iter().map(|s| s.into()));
        self
    }

    // === Common error constructors ===

    /// Project settings file does not exist
    pub fn config_not_found(path: &Path) -> Self {
        Self::new(format!("Config file not found: {}", path.display()))
            .with_context("The project settings file does not exist")
            .with_suggestions([
                format!("TRY: Check that the file exists: ls -la {}", path.display()),
                "TRY: Pass the project's settings YAML, e.g. SPINS_settings.yml".to_string(),
            ])
    }

    /// Settings file exists but could not be used
    pub fn invalid_config(path: &Path, reason: &str) -> Self {
        Self::new(format!("Invalid config file: {}", path.display()))
            .with_context(reason.to_string())
            .with_suggestions([
                "TRY: Define paths: dcm, nii, qc, std and meta".to_string(),
                "TRY: Check the YAML syntax of the settings file".to_string(),
            ])
    }

    /// Subject folder name does not follow the naming convention
    pub fn invalid_subject_id(id: &str) -> Self {
        Self::new(format!("Invalid subject ID: '{}'", id))
            .with_context("Subject IDs look like STUDY_SITE_SUBJECT_TIMEPOINT[_SESSION]")
            .with_suggestions([
                "TRY: Use the subject's folder name under the nii directory".to_string(),
                "TRY: Example: --subject SPN01_CMH_0001_01".to_string(),
            ])
    }

    /// No folder for the subject under the NIfTI root
    pub fn subject_not_found(id: &str, nii_root: &Path) -> Self {
        Self::new(format!("Subject not found: {}", id))
            .with_context(format!("No folder for the subject in {}", nii_root.display()))
            .with_suggestions([
                format!("TRY: List available subjects: ls {}", nii_root.display()),
                "TRY: Check that the subject has been converted to NIfTI".to_string(),
            ])
    }

    /// Site has no configuration block
    pub fn unknown_site(site: &str) -> Self {
        Self::new(format!("Site not configured: {}", site))
            .with_context("The site has no entry under Sites in the settings file")
            .with_suggestion("TRY: Add the site with an ExportInfo block to the settings file")
    }

    fn to_json(&self) -> serde_json::Value {
        json!({
            "error": {
                "message": self.message,
                "context": self.context,
                "suggestions": self.suggestions,
            }
        })
    }
}

impl fmt::Display for HelpfulError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ERROR: {}", self.message)?;

        if let Some(ctx) = &self.context {
            writeln!(f, "CONTEXT: {}", ctx)?;
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            for suggestion in &self.suggestions {
                writeln!(f, "  {}", suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for HelpfulError {}

/// Print a command failure as `{"error": {...}}` on stdout.
pub fn print_json_error(err: &anyhow::Error) {
    let value = match err.downcast_ref::<HelpfulError>() {
        Some(helpful) => helpful.to_json(),
        None => json!({
            "error": {
                "message": format!("{:#}", err),
                "context": null,
                "suggestions": [],
            }
        }),
    };
    println!("{}", value);
}
