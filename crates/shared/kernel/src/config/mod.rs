use config::{Config, Environment, File};
use serde::de::DeserializeOwned;
use sluice_domain::config::AppConfig;
use std::borrow::Cow;
use std::path::Path;
use tracing::info;
use tracing::level_filters::LevelFilter;

/// Base name probed (`sluice.toml`, `sluice.json`, ...) when no file is given.
pub const DEFAULT_CONFIG_NAME: &str = "sluice";
pub const ENV_PREFIX: &str = "SLUICE";

/// Custom error type for config loading.
#[sluice_derive::sluice_error]
pub enum ConfigError {
    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },

    #[error("Invalid configuration{}: {message}", format_context(.context))]
    Invalid { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

/// Loads configuration from an optional file with environment overrides on top.
///
/// 1. **Base File**: `path` when given (must exist, format picked by extension). Otherwise
///    `sluice.{toml,json,yaml,...}` in the working directory, if present.
/// 2. **Environment Overrides**: variables prefixed with `SLUICE__`, nested with `__`
///    (`SLUICE__UPLOAD__MAX_SIZE_BYTES` maps to `upload.max_size_bytes`).
///    `SLUICE__UPLOAD__ALLOWED_CONTENT_TYPES` takes a comma-separated list.
///
/// Missing keys fall back to the target's `Default` when it uses `#[serde(default)]`.
///
/// # Errors
/// [`ConfigError::Config`] when the given file is missing or any source fails to parse
/// into `T`.
///
/// # Example
/// ```rust
/// use sluice_kernel::config::load_config;
/// use sluice_kernel::domain::config::AppConfig;
///
/// let cfg: AppConfig = load_config(None::<&str>).unwrap_or_default();
/// assert!(cfg.upload.max_size_bytes > 0);
/// ```
pub fn load_config<T>(path: Option<impl AsRef<Path>>) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let path: Option<&Path> = path.as_ref().map(|p| p.as_ref());
    load_with(path, environment())
}

/// Fail-fast checks for values that would otherwise only surface on the first upload.
///
/// Every problem found is reported in one message.
///
/// # Errors
/// [`ConfigError::Invalid`] listing each offending key.
pub fn validate(config: &AppConfig) -> Result<(), ConfigError> {
    let mut problems = Vec::new();
    let upload = &config.upload;
    let logging = &config.logging;

    if upload.root.as_os_str().is_empty() {
        problems.push("upload.root must not be empty".to_owned());
    }
    if upload.max_size_bytes == 0 {
        problems.push("upload.max_size_bytes must be positive".to_owned());
    }
    if upload.allowed_content_types.is_empty() {
        problems.push("upload.allowed_content_types must not be empty".to_owned());
    } else if upload.allowed_content_types.iter().any(|t| t.trim().is_empty()) {
        problems.push("upload.allowed_content_types contains a blank entry".to_owned());
    }
    if logging.level.parse::<LevelFilter>().is_err() {
        problems.push(format!("logging.level '{}' is not a level", logging.level));
    }
    if !logging.console && logging.directory.is_none() {
        problems.push("logging needs the console or a directory".to_owned());
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Invalid { message: problems.join("; ").into(), context: None })
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("upload.allowed_content_types")
}

fn load_with<T>(path: Option<&Path>, env: Environment) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let file = match path {
        Some(path) => {
            info!("Loading config from {}", path.display());
            File::from(path).required(true)
        },
        None => File::with_name(DEFAULT_CONFIG_NAME).required(false),
    };

    let config = Config::builder()
        .add_source(file)
        .add_source(env)
        .build()
        .context("Failed to build config")?
        .try_deserialize::<T>()
        .context("Failed to deserialize config")?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> Environment {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
        environment().source(Some(vars))
    }

    #[test]
    fn file_then_environment() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("sluice.toml");
        std::fs::write(
            &file,
            "[upload]\nroot = \"/srv/uploads\"\nmax_size_bytes = 2048\n\n[logging]\nlevel = \"debug\"\n",
        )
        .unwrap();

        let env = env_of(&[
            ("SLUICE__UPLOAD__MAX_SIZE_BYTES", "4096"),
            ("SLUICE__UPLOAD__ALLOWED_CONTENT_TYPES", "image/png,image/jpeg"),
        ]);
        let cfg: AppConfig = load_with(Some(&file), env).unwrap();

        assert_eq!(cfg.upload.root, Path::new("/srv/uploads"));
        assert_eq!(cfg.upload.max_size_bytes, 4096);
        assert_eq!(cfg.upload.allowed_content_types, ["image/png", "image/jpeg"]);
        assert_eq!(cfg.logging.level, "debug");
        assert!(cfg.upload.create_root);
    }

    #[test]
    fn explicit_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_with::<AppConfig>(Some(&dir.path().join("absent.toml")), env_of(&[])).unwrap_err();
        assert_eq!(err.kind(), ConfigErrorKind::Config);
    }

    #[test]
    fn defaults_pass_validation() {
        assert!(validate(&AppConfig::default()).is_ok());
    }

    #[test]
    fn validation_reports_every_problem() {
        let mut cfg = AppConfig::default();
        cfg.upload.max_size_bytes = 0;
        cfg.upload.allowed_content_types = vec!["text/csv".to_owned(), "  ".to_owned()];
        cfg.logging.level = "loud".to_owned();

        let err = validate(&cfg).unwrap_err();
        assert_eq!(err.kind(), ConfigErrorKind::Invalid);
        let text = err.to_string();
        assert!(text.contains("max_size_bytes"), "{text}");
        assert!(text.contains("blank entry"), "{text}");
        assert!(text.contains("logging.level"), "{text}");
    }

    #[test]
    fn validation_rejects_silent_logging() {
        let mut cfg = AppConfig::default();
        cfg.logging.console = false;
        assert!(validate(&cfg).is_err());

        cfg.logging.directory = Some("logs".into());
        assert!(validate(&cfg).is_ok());
    }
}
