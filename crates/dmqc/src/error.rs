//! Error types for QC runs

use std::io;
use thiserror::Error;

use crate::tools::ToolError;

/// QC error type
#[derive(Error, Debug)]
pub enum QcError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Name format error: {0}")]
    NameFormat(String),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, QcError>;
