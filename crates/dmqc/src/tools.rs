//! External tool invocation
//!
//! QC handlers, the header diff and batch submission all shell out to
//! external programs. They do it through [`ToolRunner`] so a run can be made
//! dry, and so tests can substitute a recording runner.

use std::fmt;
use std::io::{self, Write};
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::{debug, error};

/// A program invocation. Arguments are passed as-is, never through a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Text written to the child's stdin.
    pub stdin: Option<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
        }
    }

    pub fn arg(mut self, arg: impl fmt::Display) -> Self {
        self.args.push(arg.to_string());
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Captured output of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Tool failure
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("'{command}' exited with {}", describe_code(.code))]
    Failed {
        command: String,
        /// `None` when the process was killed by a signal.
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("failed to launch '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
}

impl ToolError {
    /// Exit code of the failed process, if it exited normally.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ToolError::Failed { code, .. } => *code,
            ToolError::Spawn { .. } => None,
        }
    }
}

fn describe_code(code: &Option<i32>) -> String {
    match *code {
        Some(code) => format!("code {}", code),
        None => "a signal".to_string(),
    }
}

/// Runs external programs.
pub trait ToolRunner {
    fn run(&self, command: &ToolCommand) -> Result<ToolOutput, ToolError>;
}

/// Runs tools as child processes, blocking until they exit.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner {
    dry_run: bool,
}

impl ProcessRunner {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }
}

impl ToolRunner for ProcessRunner {
    fn run(&self, command: &ToolCommand) -> Result<ToolOutput, ToolError> {
        debug!("exec: {}", command);
        if self.dry_run {
            return Ok(ToolOutput::default());
        }

        let spawn_err = |source: io::Error| ToolError::Spawn {
            program: command.program.clone(),
            source,
        };

        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(if command.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_err)?;

        if let (Some(input), Some(mut pipe)) = (&command.stdin, child.stdin.take()) {
            pipe.write_all(input.as_bytes()).map_err(spawn_err)?;
        }

        let output = child.wait_with_output().map_err(spawn_err)?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            let code = output.status.code();
            error!("Error {} while executing: {}", describe_code(&code), command);
            if !stdout.is_empty() {
                error!("stdout: \n{}", quote_output(&stdout));
            }
            if !stderr.is_empty() {
                error!("stderr: \n{}", quote_output(&stderr));
            }
            return Err(ToolError::Failed {
                command: command.to_string(),
                code,
                stdout,
                stderr,
            });
        }

        debug!("rtnval: {:?}", output.status.code());
        if !stdout.is_empty() {
            debug!("stdout: \n{}", quote_output(&stdout));
        }
        if !stderr.is_empty() {
            debug!("stderr: \n{}", quote_output(&stderr));
        }
        Ok(ToolOutput { stdout, stderr })
    }
}

/// Prefix every line with `>\t` so tool output stands out in the log.
fn quote_output(text: &str) -> String {
    text.trim_end()
        .lines()
        .map(|line| format!(">\t{}", line))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_display() {
        let cmd = ToolCommand::new("slicer").arg("in.nii.gz").arg("-S").arg(5).arg(1600);
        assert_eq!(cmd.to_string(), "slicer in.nii.gz -S 5 1600");
        assert_eq!(cmd.stdin, None);
    }

    #[test]
    fn test_dry_run_does_not_spawn() {
        let runner = ProcessRunner::new(true);
        let output = runner
            .run(&ToolCommand::new("definitely-not-a-real-qc-binary"))
            .unwrap();
        assert_eq!(output, ToolOutput::default());
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let runner = ProcessRunner::new(false);
        let err = runner
            .run(&ToolCommand::new("definitely-not-a-real-qc-binary"))
            .unwrap_err();
        assert!(matches!(err, ToolError::Spawn { .. }));
        assert_eq!(err.exit_code(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_captures_output() {
        let runner = ProcessRunner::new(false);
        let cmd = ToolCommand::new("sh").arg("-c").arg("echo out; echo err >&2; exit 3");
        let err = runner.run(&cmd).unwrap_err();
        match &err {
            ToolError::Failed { code, stdout, stderr, .. } => {
                assert_eq!(*code, Some(3));
                assert_eq!(stdout.trim(), "out");
                assert_eq!(stderr.trim(), "err");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(err.to_string().contains("code 3"));
    }

    #[cfg(unix)]
    #[test]
    fn test_stdin_is_forwarded() {
        let runner = ProcessRunner::new(false);
        let output = runner.run(&ToolCommand::new("cat").stdin("queued job\n")).unwrap();
        assert_eq!(output.stdout, "queued job\n");
    }

    #[test]
    fn test_quote_output() {
        assert_eq!(quote_output("a\nb\n"), ">\ta\n>\tb");
    }
}
