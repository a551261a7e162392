//! Kernel utilities shared by the Sluice binaries.
//! Keep this crate lightweight: it loads configuration and wires it into the upload and
//! logging subsystems. No upload logic lives here.
//!
//! ## Config loading
//! ```rust,no_run
//! use sluice_kernel::config::{load_config, validate};
//! use sluice_kernel::domain::config::AppConfig;
//!
//! let cfg: AppConfig = load_config(Some("sluice.toml")).unwrap();
//! validate(&cfg).unwrap();
//! ```
//!
//! ## Bootstrap
//! ```rust,no_run
//! # async fn run(cfg: sluice_kernel::domain::config::AppConfig) {
//! let _logger = sluice_kernel::bootstrap::init_logger("sluice", &cfg.logging).unwrap();
//! let ingestor = sluice_kernel::bootstrap::connect_ingestor(&cfg.upload).await.unwrap();
//! # }
//! ```

pub mod bootstrap;
pub mod config;

pub use sluice_domain as domain;
