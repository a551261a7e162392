//! Turns plain configuration into live subsystems.
//!
//! The upload core never reads configuration itself; every value is threaded through here
//! as an explicit argument.

use sluice_domain::config::{LoggingConfig, UploadConfig};
use sluice_logger::{LevelFilter, Logger, LoggerError};
use sluice_upload::{Ingestor, UploadError, ValidationPolicy};
use std::time::Duration;

/// Builds the shared validation policy from the `upload` section.
///
/// # Errors
/// [`UploadError::InvalidPolicy`] when the limit is zero or the allowed set is empty or blank.
pub fn policy_from_config(config: &UploadConfig) -> Result<ValidationPolicy, UploadError> {
    Ok(ValidationPolicy::new(config.max_size_bytes, &config.allowed_content_types)?
        .with_filename_check(config.reject_unsafe_filenames))
}

/// Prepares the upload root and returns a connected [`Ingestor`].
///
/// # Errors
/// Policy errors from [`policy_from_config`], root errors from
/// [`sluice_upload::IngestorBuilder::connect`].
pub async fn connect_ingestor(config: &UploadConfig) -> Result<Ingestor, UploadError> {
    Ingestor::builder()
        .root(&config.root)
        .create(config.create_root)
        .stale_after(Duration::from_secs(config.stale_tmp_secs))
        .policy(policy_from_config(config)?)
        .connect()
        .await
}

/// Installs the global subscriber described by the `logging` section.
///
/// # Errors
/// [`LoggerError::InvalidConfiguration`] for an unknown level or no enabled sink; other
/// [`LoggerError`] kinds when the file sink or the subscriber cannot be set up.
pub fn init_logger(name: &str, config: &LoggingConfig) -> Result<Logger, LoggerError> {
    let level = config.level.parse::<LevelFilter>().map_err(|e| LoggerError::InvalidConfiguration {
        message: format!("Invalid log level '{}': {e}", config.level).into(),
        context: None,
    })?;

    let mut builder = Logger::builder()
        .name(name)
        .level(level)
        .console(config.console)
        .stderr(config.stderr)
        .json(config.json);
    if let Some(filter) = &config.filter {
        builder = builder.env_filter(filter);
    }
    if let Some(directory) = &config.directory {
        builder = builder.directory(directory);
    }
    builder.init()
}
