use serde::Deserialize;
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::sync::Arc;

/// Top-level application configuration.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfigInner {
    pub upload: UploadConfig,
    pub logging: LoggingConfig,
}

/// Thin Arc-wrapped config for inexpensive cloning into subsystems.
#[derive(Default, Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(flatten, default)]
    inner: Arc<AppConfigInner>,
}

impl Deref for AppConfig {
    type Target = AppConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for AppConfig {
    fn deref_mut(&mut self) -> &mut AppConfigInner {
        Arc::make_mut(&mut self.inner)
    }
}

/// Upload root and validation limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Trusted directory every upload is stored under.
    pub root: PathBuf,
    /// Create `root` at startup when it does not exist.
    pub create_root: bool,
    pub max_size_bytes: u64,
    /// Declared content types accepted by validation. Matched case-insensitively.
    pub allowed_content_types: Vec<String>,
    /// Reject caller filenames containing `..`, NUL, or a leading separator.
    pub reject_unsafe_filenames: bool,
    /// Age after which abandoned temporary files are removed.
    pub stale_tmp_secs: u64,
}

/// Log sinks and verbosity.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `trace`, `debug`, `info`, `warn`, `error` or `off`.
    pub level: String,
    /// Full filter directives, e.g. `sluice_upload=debug,info`. Wins over `level` and `RUST_LOG`.
    pub filter: Option<String>,
    /// Enables the rolling file sink.
    pub directory: Option<PathBuf>,
    pub json: bool,
    pub console: bool,
    /// Console output goes to stderr, keeping stdout for command results.
    pub stderr: bool,
}

// --- Default ---

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("uploads"),
            create_root: true,
            max_size_bytes: 5 * 1024 * 1024,
            allowed_content_types: ["text/csv", "application/json", "image/png", "image/jpeg"]
                .into_iter()
                .map(str::to_owned)
                .collect(),
            reject_unsafe_filenames: true,
            stale_tmp_secs: 300,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            filter: None,
            directory: None,
            json: false,
            console: true,
            stderr: true,
        }
    }
}
