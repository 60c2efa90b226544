//! dmqc: MRI acquisition QC
//!
//! Reconciles each subject's acquired scans against the site's expected
//! protocol, runs per-scan QC tools, and assembles an HTML report.
//!
//! - [`manifest`]: expected scans per site, from the project config
//! - [`reconcile`]: the ordered present/repeated/missing table
//! - [`driver`]: per-row QC dispatch
//! - [`pipeline`]: one subject end to end

pub mod batch;
pub mod checklist;
pub mod config;
pub mod driver;
pub mod error;
pub mod handlers;
pub mod header_qc;
pub mod manifest;
pub mod naming;
pub mod pipeline;
pub mod reconcile;
pub mod report;
pub mod subject;
pub mod tools;

pub use config::{ProjectConfig, RunOptions};
pub use driver::{DispatchOutcome, ProcessedRow, SubjectReportDriver};
pub use error::{QcError, Result};
pub use manifest::{ExpectedEntry, ExpectedManifest};
pub use reconcile::{reconcile, AcquiredFile, ReconciliationRow, RowNote};
pub use tools::{ProcessRunner, ToolCommand, ToolError, ToolOutput, ToolRunner};
