//! Queue submission
//!
//! Without a subject, `dmqc report` fans out one queue job per subject
//! folder. Each job re-runs this binary for a single subject.

use crate::config::RunOptions;
use crate::error::Result;
use crate::tools::{ToolCommand, ToolRunner};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Queue the jobs are sent to.
pub const QUEUE: &str = "main.q";

/// One per-subject job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchJob {
    pub name: String,
    pub subject: String,
    /// Command line the job runs, fed to `qsub` on stdin
    pub command_line: String,
}

impl BatchJob {
    /// The `qsub` invocation that queues this job.
    pub fn submit_command(&self, walltime: &str) -> ToolCommand {
        ToolCommand::new("qsub")
            .arg("-V")
            .arg("-q")
            .arg(QUEUE)
            .arg("-l")
            .arg(format!("h_rt={}", walltime))
            .arg("-o")
            .arg(format!("/tmp/{}.log", self.name))
            .arg("-e")
            .arg(format!("/tmp/{}.err", self.name))
            .arg("-N")
            .arg(&self.name)
            .stdin(self.command_line.clone())
    }
}

/// `YYYYmmdd-HHMMSS` stamp shared by the jobs of one submission.
pub fn job_stamp(now: DateTime<Local>) -> String {
    now.format("%Y%m%d-%H%M%S").to_string()
}

/// Build one job per subject, named `qc_report_<stamp>_<i>`.
pub fn plan_jobs(
    exe: &Path,
    config_path: &Path,
    subjects: &[String],
    options: &RunOptions,
    stamp: &str,
) -> Vec<BatchJob> {
    subjects
        .iter()
        .enumerate()
        .map(|(i, subject)| {
            let mut command_line = format!(
                "{} report {} --subject {}",
                exe.display(),
                config_path.display(),
                subject
            );
            if options.rewrite {
                command_line.push_str(" --rewrite");
            }
            BatchJob {
                name: format!("qc_report_{}_{}", stamp, i),
                subject: subject.clone(),
                command_line,
            }
        })
        .collect()
}

/// Submit every job in order. The first failed submission aborts the rest.
pub fn submit_all(runner: &dyn ToolRunner, jobs: &[BatchJob], walltime: &str) -> Result<usize> {
    for job in jobs {
        info!("Queueing {} for {}", job.name, job.subject);
        runner.run(&job.submit_command(walltime))?;
    }
    Ok(jobs.len())
}
