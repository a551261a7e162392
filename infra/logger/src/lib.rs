//! # Logger
//!
//! Installs the process-wide `tracing` subscriber used by the Sluice binaries.
//!
//! * Console output (compact, ANSI) and/or a daily rolling file written through a
//!   non-blocking worker.
//! * JSON formatting for every enabled sink via [`LoggerBuilder::json`].
//! * `RUST_LOG` is honoured unless an explicit [`LoggerBuilder::env_filter`] is given.
//!
//! ## Example
//!
//! ```rust
//! # use sluice_logger::{Logger, LevelFilter};
//! let _logger = Logger::builder()
//!     .name("sluice")
//!     .console(true)
//!     .level(LevelFilter::DEBUG)
//!     .init()
//!     .unwrap();
//! ```

mod error;

pub use crate::error::{LoggerError, LoggerErrorExt, LoggerErrorKind};
pub use tracing::level_filters::LevelFilter;
pub use tracing_appender::rolling::Rotation;

use std::fs;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::fmt::layer;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

const DEFAULT_MAX_FILES: usize = 10;
const LOG_FILE_SUFFIX: &str = "log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

#[derive(Debug)]
struct LoggerConfig {
    console: bool,
    stderr: bool,
    directory: Option<PathBuf>,
    level: LevelFilter,
    rotation: Rotation,
    max_files: usize,
    json: bool,
    env_filter: Option<String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            console: true,
            stderr: false,
            directory: None,
            level: LevelFilter::INFO,
            rotation: Rotation::DAILY,
            max_files: DEFAULT_MAX_FILES,
            json: false,
            env_filter: None,
        }
    }
}

#[derive(Debug)]
pub struct NoName;
#[derive(Debug)]
pub struct WithName(String);

mod private {
    pub trait Sealed {}
}
impl private::Sealed for NoName {}
impl private::Sealed for WithName {}

/// Configures the global subscriber. A name is required before [`LoggerBuilder::init`].
#[allow(private_bounds)]
#[derive(Debug)]
pub struct LoggerBuilder<N: private::Sealed = NoName> {
    config: LoggerConfig,
    name: N,
}

impl LoggerBuilder<NoName> {
    /// Sets the logger name, also used as the rolling file prefix.
    pub fn name(self, name: impl Into<String>) -> LoggerBuilder<WithName> {
        LoggerBuilder { config: self.config, name: WithName(name.into()) }
    }
}

#[allow(private_bounds)]
impl<N: private::Sealed> LoggerBuilder<N> {
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn level(mut self, level: LevelFilter) -> Self {
        self.config.level = level;
        self
    }

    /// Programmatic filter directives (e.g., `sluice_upload=debug`). Overrides `RUST_LOG`.
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub fn env_filter(mut self, filter: impl Into<String>) -> Self {
        self.config.env_filter = Some(filter.into());
        self
    }

    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn console(mut self, enabled: bool) -> Self {
        self.config.console = enabled;
        self
    }

    /// Sends console output to stderr instead of stdout.
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn stderr(mut self, enabled: bool) -> Self {
        self.config.stderr = enabled;
        self
    }

    /// Writes logs into `directory` with daily rotation.
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub fn directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.config.directory = Some(directory.into());
        self
    }

    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn json(mut self, enabled: bool) -> Self {
        self.config.json = enabled;
        self
    }

    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn rotation(mut self, rotation: Rotation) -> Self {
        self.config.rotation = rotation;
        self
    }

    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn max_files(mut self, max: usize) -> Self {
        self.config.max_files = max;
        self
    }
}

impl LoggerBuilder<WithName> {
    /// Consumes the builder and installs the global subscriber.
    ///
    /// Keep the returned [`Logger`] alive until shutdown, it owns the file worker guard.
    ///
    /// # Errors
    /// * [`LoggerError::InvalidConfiguration`] for an empty name, `max_files == 0`,
    ///   no enabled sink, or an unparsable filter.
    /// * [`LoggerError::Directory`] / [`LoggerError::Appender`] when the file sink fails.
    /// * [`LoggerError::Subscriber`] when a global subscriber is already set.
    pub fn init(self) -> Result<Logger, LoggerError> {
        let LoggerBuilder { config, name: WithName(name) } = self;
        validate(&config, &name)?;

        let filter = env_filter(&config)?;
        let mut layers: Vec<BoxedLayer> = Vec::new();

        if config.console {
            let writer = if config.stderr {
                BoxMakeWriter::new(std::io::stderr)
            } else {
                BoxMakeWriter::new(std::io::stdout)
            };
            let console = layer().with_ansi(true).with_writer(writer);
            layers.push(if config.json { console.json().boxed() } else { console.compact().boxed() });
        }

        let guard = match &config.directory {
            Some(dir) => {
                fs::create_dir_all(dir)
                    .context(format!("Failed to create log directory: {}", dir.display()))?;

                let appender = RollingFileAppender::builder()
                    .rotation(config.rotation.clone())
                    .filename_prefix(&name)
                    .filename_suffix(LOG_FILE_SUFFIX)
                    .max_log_files(config.max_files)
                    .build(dir)?;
                let (writer, guard) = tracing_appender::non_blocking(appender);

                let file = layer().with_writer(writer).with_ansi(false);
                layers.push(if config.json { file.json().boxed() } else { file.boxed() });
                Some(guard)
            },
            None => None,
        };

        tracing_subscriber::registry().with(layers).with(filter).try_init()?;

        Ok(Logger { name, guard })
    }
}

/// Handle to the installed logging system.
#[must_use = "Dropping this handle stops the background file writer."]
#[derive(Debug)]
pub struct Logger {
    name: String,
    guard: Option<WorkerGuard>,
}

impl Logger {
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder { config: LoggerConfig::default(), name: NoName }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `true` when a file sink is active.
    #[must_use]
    pub const fn has_file_sink(&self) -> bool {
        self.guard.is_some()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        if self.guard.is_some() {
            tracing::info!(logger = %self.name, "Logging system shutting down, flushing buffers...");
        }
    }
}

fn validate(config: &LoggerConfig, name: &str) -> Result<(), LoggerError> {
    let problem = if name.trim().is_empty() {
        Some("Logger name cannot be empty")
    } else if config.max_files == 0 {
        Some("max_files must be greater than zero")
    } else if !config.console && config.directory.is_none() {
        Some("No logging sink enabled, enable the console or a log directory")
    } else {
        None
    };

    problem.map_or(Ok(()), |message| {
        Err(LoggerError::InvalidConfiguration { message: message.into(), context: None })
    })
}

fn env_filter(config: &LoggerConfig) -> Result<EnvFilter, LoggerError> {
    let builder = EnvFilter::builder().with_default_directive(config.level.into());
    match &config.env_filter {
        None => Ok(builder.from_env_lossy()),
        Some(directives) => builder.parse(directives).map_err(|e| {
            LoggerError::InvalidConfiguration {
                message: format!("Invalid env filter '{directives}': {e}").into(),
                context: None,
            }
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn builder_defaults() {
        let builder = Logger::builder().name("sluice-test");
        assert!(builder.config.console);
        assert!(!builder.config.stderr);
        assert!(!builder.config.json);
        assert_eq!(builder.config.level, LevelFilter::INFO);
        assert_eq!(builder.config.max_files, DEFAULT_MAX_FILES);
        assert!(builder.config.directory.is_none());
    }

    #[test]
    fn builder_collects_settings() {
        let builder = Logger::builder()
            .name("sluice-test")
            .console(false)
            .stderr(true)
            .directory("/var/log/sluice")
            .json(true)
            .max_files(3)
            .env_filter("sluice_upload=debug")
            .level(LevelFilter::DEBUG);

        assert!(!builder.config.console);
        assert!(builder.config.stderr);
        assert!(builder.config.json);
        assert_eq!(builder.config.max_files, 3);
        assert_eq!(builder.config.level, LevelFilter::DEBUG);
        assert_eq!(builder.config.env_filter.as_deref(), Some("sluice_upload=debug"));
        assert_eq!(builder.config.directory.as_deref(), Some(std::path::Path::new("/var/log/sluice")));
    }

    #[test]
    #[serial]
    fn rejects_blank_name() {
        let err = Logger::builder().name("  ").init().expect_err("blank name");
        assert_eq!(err.kind(), LoggerErrorKind::InvalidConfiguration);
    }

    #[test]
    #[serial]
    fn rejects_no_sinks() {
        let err = Logger::builder().name("quiet").console(false).init().expect_err("no sink");
        assert_eq!(err.kind(), LoggerErrorKind::InvalidConfiguration);
    }

    #[test]
    #[serial]
    fn rejects_bad_filter() {
        let err = Logger::builder()
            .name("filtered")
            .env_filter("sluice=[not a level")
            .init()
            .expect_err("bad filter");
        assert_eq!(err.kind(), LoggerErrorKind::InvalidConfiguration);
    }
}
