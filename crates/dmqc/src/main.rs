//! dmqc command-line entry point
//!
//! - `report`: run QC and write reports, one subject or the whole project
//! - `reconcile`: show a subject's expected-vs-acquired table
//! - `manifest`: show a site's expected scans

use anyhow::Result;
use clap::{Parser, Subcommand};
use dmqc::config::ProjectConfig;
use dmqc_logging::{init_logging, LogConfig};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

mod cli;

#[derive(Parser, Debug)]
#[command(name = "dmqc", version, about = "MRI acquisition QC reports")]
struct Cli {
    /// Enable verbose logging (tool commands and exit codes)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run QC and build the HTML report for one subject, or queue every subject
    Report {
        /// Project settings YAML
        config: PathBuf,

        /// Subject folder name; omit to submit one batch job per subject
        #[arg(short, long)]
        subject: Option<String>,

        /// Walltime requested for batch jobs
        #[arg(long, default_value = "1:00:00")]
        walltime: String,

        /// Regenerate reports that already exist
        #[arg(long)]
        rewrite: bool,

        /// Log external commands without running them or writing reports
        #[arg(long)]
        dry_run: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the expected-vs-acquired scan table for a subject
    Reconcile {
        /// Project settings YAML
        config: PathBuf,

        /// Subject folder name
        #[arg(short, long)]
        subject: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the expected scans for a site
    Manifest {
        /// Project settings YAML
        config: PathBuf,

        /// Site code, e.g. CMH
        #[arg(long)]
        site: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Commands {
    fn wants_json(&self) -> bool {
        match self {
            Commands::Report { json, .. }
            | Commands::Reconcile { json, .. }
            | Commands::Manifest { json, .. } => *json,
        }
    }

    fn config_path(&self) -> &Path {
        match self {
            Commands::Report { config, .. }
            | Commands::Reconcile { config, .. }
            | Commands::Manifest { config, .. } => config,
        }
    }
}

fn run_command(command: Commands) -> Result<()> {
    match command {
        Commands::Report {
            config,
            subject,
            walltime,
            rewrite,
            dry_run,
            json,
        } => cli::report::run(cli::report::ReportArgs {
            config,
            subject,
            walltime,
            rewrite,
            dry_run,
            json,
        }),
        Commands::Reconcile {
            config,
            subject,
            json,
        } => cli::reconcile::run(cli::reconcile::ReconcileArgs {
            config,
            subject,
            json,
        }),
        Commands::Manifest { config, site, json } => {
            cli::manifest::run(cli::manifest::ManifestArgs { config, site, json })
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let json_mode = cli.command.wants_json();

    // The project may name its own log directory; a bad config is reported
    // by the command itself.
    let log_dir = ProjectConfig::load(cli.command.config_path())
        .ok()
        .and_then(|config| config.paths.log);
    if let Err(err) = init_logging(LogConfig {
        app_name: "dmqc",
        verbose: cli.verbose,
        log_dir: log_dir.as_deref(),
    }) {
        eprintln!("Warning: failed to initialize logging: {:#}", err);
    }

    match run_command(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if json_mode {
                cli::error::print_json_error(&err);
            } else {
                eprintln!("{:?}", err);
            }
            ExitCode::from(1)
        }
    }
}
