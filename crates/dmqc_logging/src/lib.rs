//! Shared logging setup for the dmqc binary.
//!
//! Log lines go to stderr and to a size-rotated file. The file lives in the
//! project's configured log directory when one is given, otherwise under
//! `~/.dmqc/logs`.

use anyhow::{anyhow, Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "dmqc=info,dmqc_logging=info";
const VERBOSE_LOG_FILTER: &str = "dmqc=debug,dmqc_logging=debug";
const MAX_LOG_FILES: usize = 5;
const MAX_LOG_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Logging configuration for one process.
#[derive(Debug, Clone, Copy)]
pub struct LogConfig<'a> {
    pub app_name: &'a str,
    /// Raise the default filter to debug (tool commands, exit codes).
    pub verbose: bool,
    /// Directory for the rolling log file; `None` uses [`logs_dir`].
    pub log_dir: Option<&'a Path>,
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over both the default and the verbose filter.
pub fn init_logging(config: LogConfig<'_>) -> Result<()> {
    let log_dir = match config.log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
            dir.to_path_buf()
        }
        None => ensure_logs_dir().context("Failed to ensure log directory")?,
    };
    let appender = RollingFileAppender::new(log_dir, config.app_name, MAX_LOG_FILES, MAX_LOG_FILE_SIZE)
        .with_context(|| format!("Failed to open log file for {}", config.app_name))?;

    let fallback = if config.verbose {
        VERBOSE_LOG_FILTER
    } else {
        DEFAULT_LOG_FILTER
    };
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(appender))
                .with_ansi(false)
                .with_filter(filter()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(filter()),
        )
        .try_init()
        .map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))?;

    Ok(())
}

/// The dmqc home directory: `$DMQC_HOME`, else `~/.dmqc`.
pub fn dmqc_home() -> Result<PathBuf> {
    if let Ok(override_path) = std::env::var("DMQC_HOME") {
        return Ok(PathBuf::from(override_path));
    }
    dirs::home_dir()
        .map(|home| home.join(".dmqc"))
        .ok_or_else(|| anyhow!("Could not determine home directory; set DMQC_HOME"))
}

/// Default log directory: `<dmqc home>/logs`.
pub fn logs_dir() -> Result<PathBuf> {
    Ok(dmqc_home()?.join("logs"))
}

/// Ensure the default log directory exists.
pub fn ensure_logs_dir() -> Result<PathBuf> {
    let logs = logs_dir()?;
    fs::create_dir_all(&logs)
        .with_context(|| format!("Failed to create logs directory: {}", logs.display()))?;
    Ok(logs)
}

/// Size-capped log file. A write that would overflow `<name>.log` first
/// shifts the files to `<name>.log.1`, `<name>.log.2`, ... dropping the
/// oldest, so at most `keep` files exist.
struct RollingFileAppender {
    dir: PathBuf,
    base_name: String,
    keep: usize,
    max_size: u64,
    file: Option<File>,
    written: u64,
}

impl RollingFileAppender {
    fn new(dir: PathBuf, base_name: &str, keep: usize, max_size: u64) -> io::Result<Self> {
        fs::create_dir_all(&dir)?;
        let mut appender = Self {
            dir,
            base_name: sanitize_name(base_name),
            keep: keep.max(1),
            max_size,
            file: None,
            written: 0,
        };
        appender.reopen()?;
        if appender.written > appender.max_size {
            appender.roll()?;
        }
        Ok(appender)
    }

    /// `<name>.log` for index 0, `<name>.log.<index>` otherwise.
    fn path(&self, index: usize) -> PathBuf {
        match index {
            0 => self.dir.join(format!("{}.log", self.base_name)),
            n => self.dir.join(format!("{}.log.{}", self.base_name, n)),
        }
    }

    fn reopen(&mut self) -> io::Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(self.path(0))?;
        self.written = file.metadata()?.len();
        self.file = Some(file);
        Ok(())
    }

    fn roll(&mut self) -> io::Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush()?;
        }

        let last = self.keep - 1;
        if last > 0 {
            let oldest = self.path(last);
            if oldest.exists() {
                fs::remove_file(oldest)?;
            }
            for index in (0..last).rev() {
                let from = self.path(index);
                if from.exists() {
                    fs::rename(from, self.path(index + 1))?;
                }
            }
        }
        self.reopen()
    }
}

impl Write for RollingFileAppender {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written + buf.len() as u64 > self.max_size {
            self.roll()?;
        }
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "log file is closed"))?;
        let n = file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

/// Log file base names are used verbatim on disk.
fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => c,
            _ => '_',
        })
        .collect()
}
