//! Command handlers.
//!
//! Results go to stdout, one line per command. A refused upload prints `rejected: <kind>`
//! and exits with [`REJECTED`]; faults of the host environment surface as errors. Output
//! never includes the location of the upload root.

use anyhow::{Context, Result};
use sluice_kernel::bootstrap::{connect_ingestor, policy_from_config};
use sluice_kernel::domain::config::{AppConfig, UploadConfig};
use sluice_upload::{
    ContentSignature, PurgeReport, SNIFF_LEN, SafeDestination, UploadCandidate, UploadError,
    check_root, has_jpeg_trailer, purge_stale,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, SystemTime};
use tracing::{info, warn};

/// Exit status for an upload refused on its merits.
pub(crate) const REJECTED: u8 = 3;

/// Content type given to candidates whose label is irrelevant to the command.
const OPAQUE: &str = "application/octet-stream";

pub(crate) fn sniff(file: &Path) -> Result<ExitCode> {
    let mut candidate = UploadCandidate::open(file, OPAQUE)?;
    let signature = ContentSignature::sniff(&candidate.head(SNIFF_LEN)?);

    if signature == ContentSignature::Jpeg {
        let size = candidate.len()?;
        let complete = has_jpeg_trailer(&candidate.read_all(size)?);
        println!("{signature} (end-of-image marker {})", if complete { "present" } else { "missing" });
    } else {
        println!("{signature}");
    }
    Ok(ExitCode::SUCCESS)
}

pub(crate) fn validate(
    cfg: &AppConfig,
    file: &Path,
    content_type: &str,
    max_size: Option<u64>,
    allow: &[String],
) -> Result<ExitCode> {
    let mut policy = policy_from_config(&cfg.upload)?;
    if let Some(max_size) = max_size {
        policy = policy.with_max_size(max_size).context("Invalid --max-size")?;
    }
    if !allow.is_empty() {
        policy = policy.with_allowed_types(allow).context("Invalid --allow")?;
    }

    let mut candidate = UploadCandidate::open(file, content_type)?;
    settle(sluice_upload::validate(&mut candidate, &policy), |()| println!("ok"))
}

pub(crate) async fn persist(
    cfg: &AppConfig,
    file: &Path,
    root: Option<PathBuf>,
    namespace: Option<&str>,
) -> Result<ExitCode> {
    let upload = UploadConfig { root: root.unwrap_or_else(|| cfg.upload.root.clone()), ..cfg.upload.clone() };

    let outcome = async {
        let ingestor = connect_ingestor(&upload).await?;
        let bytes = UploadCandidate::open(file, OPAQUE)?.read_all(ingestor.policy().max_size_bytes())?;
        match namespace {
            Some(name) => ingestor.namespace(name)?.persist(bytes).await,
            None => ingestor.persist(bytes).await,
        }
    }
    .await;

    settle(outcome, print_destination)
}

pub(crate) async fn ingest(
    cfg: &AppConfig,
    file: &Path,
    content_type: &str,
    namespace: Option<&str>,
) -> Result<ExitCode> {
    let outcome = async {
        let ingestor = connect_ingestor(&cfg.upload).await?;
        let candidate = UploadCandidate::open(file, content_type)?;
        match namespace {
            Some(name) => ingestor.namespace(name)?.ingest(candidate).await,
            None => ingestor.ingest(candidate).await,
        }
    }
    .await;

    settle(outcome, print_destination)
}

pub(crate) async fn purge(cfg: &AppConfig, older_than: Option<u64>) -> Result<ExitCode> {
    let root = cfg.upload.root.clone();
    let threshold = Duration::from_secs(older_than.unwrap_or(cfg.upload.stale_tmp_secs));

    let outcome = tokio::task::spawn_blocking(move || {
        check_root(&root)?;
        let root = root.canonicalize().map_err(|e| UploadError::RootUnavailable {
            message: e.to_string().into(),
            context: Some("Resolving upload root".into()),
        })?;
        Ok::<_, UploadError>(purge_stale(&root, SystemTime::now(), threshold))
    })
    .await
    .context("Purge task failed")?;

    settle(outcome, |PurgeReport { removed, failed }| {
        info!(removed, failed, "Purge finished");
        println!("removed {removed}, failed {failed}");
    })
}

fn print_destination(saved: SafeDestination) {
    println!("{}", saved.relative().display());
}

/// Prints the accepted value, or maps the error onto an exit status.
fn settle<T>(outcome: Result<T, UploadError>, accepted: impl FnOnce(T)) -> Result<ExitCode> {
    match outcome {
        Ok(value) => {
            accepted(value);
            Ok(ExitCode::SUCCESS)
        },
        Err(err) if err.is_environment_fault() => Err(err.into()),
        Err(err) => {
            warn!(kind = %err.kind(), "Upload rejected");
            println!("rejected: {}", err.kind());
            Ok(ExitCode::from(REJECTED))
        },
    }
}
