//! Async handle that ties validation and persistence to one trusted root.

use crate::builder::IngestorBuilder;
use crate::candidate::UploadCandidate;
use crate::error::UploadError;
use crate::maintenance::{self, PurgeReport};
use crate::namespace::Namespace;
use crate::persist::{self, SafeDestination};
use crate::policy::ValidationPolicy;
use crate::validate;
use std::io::{Read, Seek};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, error, info, warn};

/// Shared state behind an [`Ingestor`].
#[derive(Debug)]
pub struct IngestorInner {
    /// Canonical root, resolved once at connect time.
    pub(crate) root: PathBuf,
    pub(crate) policy: ValidationPolicy,
    pub(crate) stale_after: Duration,
}

/// A thread-safe handle for validating and storing uploads under one root.
///
/// Cloning is cheap (`Arc`). Filesystem work runs on the blocking pool, so the handle can
/// be used from any async task.
///
/// Only PNG and JPEG bytes are persistable. Other allowed types (CSV, JSON) pass
/// [`Ingestor::validate`] but are refused by [`Ingestor::ingest`] with
/// [`UploadError::UnrecognizedType`].
///
/// # Example
///
/// ```rust
/// use sluice_upload::{Ingestor, UploadCandidate, UploadError, PNG_MAGIC};
///
/// #[tokio::main]
/// async fn main() -> Result<(), UploadError> {
///     # let tmp = tempfile::tempdir().unwrap();
///     # let root = tmp.path().join("uploads");
///     let ingestor = Ingestor::builder().root(&root).connect().await?;
///
///     let candidate = UploadCandidate::from_bytes(PNG_MAGIC.to_vec(), "image/png");
///     let saved = ingestor.ingest(candidate).await?;
///     assert!(saved.file_name().ends_with(".png"));
///
///     let decks = ingestor.namespace("deck_7")?;
///     let saved = decks.persist(PNG_MAGIC.to_vec()).await?;
///     assert!(saved.relative().starts_with("deck_7"));
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Ingestor {
    pub(crate) inner: Arc<IngestorInner>,
}

impl Deref for Ingestor {
    type Target = IngestorInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl Ingestor {
    #[must_use = "The ingestor is not initialized until you call .connect()"]
    pub fn builder() -> IngestorBuilder {
        IngestorBuilder::new()
    }

    /// Canonical upload root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    /// A view whose saves land in `<root>/<name>/`.
    ///
    /// # Errors
    /// [`UploadError::InvalidFilename`] for an empty or overlong name,
    /// [`UploadError::TraversalDetected`] for one with anything but alphanumerics and `_`.
    pub fn namespace<N>(&self, name: N) -> Result<NamespacedIngestor, UploadError>
    where
        N: TryInto<Namespace, Error = UploadError>,
    {
        Ok(NamespacedIngestor { ingestor: self.clone(), namespace: Arc::new(name.try_into()?) })
    }

    /// Gates `candidate` against this ingestor's policy. Runs inline: it only measures the
    /// stream and reads its first bytes.
    ///
    /// # Errors
    /// See [`validate::validate`].
    pub fn validate<R: Read + Seek>(
        &self,
        candidate: &mut UploadCandidate<R>,
    ) -> Result<(), UploadError> {
        validate::validate(candidate, &self.policy)
            .inspect(|()| debug!(op = "validate", "Upload accepted"))
            .inspect_err(|e| log_failure("validate", None, e))
    }

    /// Persists already-buffered bytes directly under the root.
    ///
    /// # Errors
    /// See [`persist::persist`]. A panicked blocking task is [`UploadError::Internal`].
    pub async fn persist(&self, bytes: Vec<u8>) -> Result<SafeDestination, UploadError> {
        self.persist_internal(None, bytes).await
    }

    /// Validates, reads at most `max_size_bytes` from the stream, then persists.
    ///
    /// # Errors
    /// Any error from [`validate::validate`] or [`persist::persist`].
    pub async fn ingest<R>(&self, candidate: UploadCandidate<R>) -> Result<SafeDestination, UploadError>
    where
        R: Read + Seek + Send + 'static,
    {
        self.ingest_internal(None, candidate).await
    }

    /// Removes abandoned temporary files under the root. Never fails; problems are logged
    /// and counted.
    pub async fn purge_tmp(&self) -> PurgeReport {
        let root = self.root.clone();
        let stale_after = self.stale_after;
        let now = SystemTime::now();

        match tokio::task::spawn_blocking(move || maintenance::purge_stale(&root, now, stale_after)).await {
            Ok(report) => {
                if report.failed > 0 {
                    warn!(removed = report.removed, failed = report.failed, "Some temporary files could not be removed");
                } else if report.removed > 0 {
                    info!(removed = report.removed, "Cleaned up temporary files");
                }
                report
            },
            Err(e) => {
                error!(error = %e, "Temp file cleanup task panicked");
                PurgeReport::default()
            },
        }
    }

    async fn persist_internal(
        &self,
        namespace: Option<Arc<Namespace>>,
        bytes: Vec<u8>,
    ) -> Result<SafeDestination, UploadError> {
        let root = self.root.clone();
        let max_size = self.policy.max_size_bytes();
        let ns = namespace.clone();

        let outcome = run_blocking(move || {
            persist::persist_at(&root, ns.as_deref(), &bytes, max_size)
        })
        .await;

        observe("persist", namespace.as_deref(), outcome)
    }

    async fn ingest_internal<R>(
        &self,
        namespace: Option<Arc<Namespace>>,
        candidate: UploadCandidate<R>,
    ) -> Result<SafeDestination, UploadError>
    where
        R: Read + Seek + Send + 'static,
    {
        let root = self.root.clone();
        let policy = self.policy.clone();
        let ns = namespace.clone();

        let outcome = run_blocking(move || {
            let mut candidate = candidate;
            validate::validate(&mut candidate, &policy)?;
            let bytes = candidate.read_all(policy.max_size_bytes())?;
            persist::persist_at(&root, ns.as_deref(), &bytes, policy.max_size_bytes())
        })
        .await;

        observe("ingest", namespace.as_deref(), outcome)
    }
}

/// A view of an [`Ingestor`] scoped to one [`Namespace`].
#[derive(Debug, Clone)]
pub struct NamespacedIngestor {
    ingestor: Ingestor,
    namespace: Arc<Namespace>,
}

impl NamespacedIngestor {
    #[must_use]
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    #[must_use]
    pub const fn ingestor(&self) -> &Ingestor {
        &self.ingestor
    }

    /// # Errors
    /// See [`Ingestor::persist`].
    pub async fn persist(&self, bytes: Vec<u8>) -> Result<SafeDestination, UploadError> {
        self.ingestor.persist_internal(Some(self.namespace.clone()), bytes).await
    }

    /// # Errors
    /// See [`Ingestor::ingest`].
    pub async fn ingest<R>(&self, candidate: UploadCandidate<R>) -> Result<SafeDestination, UploadError>
    where
        R: Read + Seek + Send + 'static,
    {
        self.ingestor.ingest_internal(Some(self.namespace.clone()), candidate).await
    }
}

pub(crate) async fn run_blocking<T, F>(task: F) -> Result<T, UploadError>
where
    F: FnOnce() -> Result<T, UploadError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task).await.map_err(|e| UploadError::Internal {
        message: e.to_string().into(),
        context: Some("Blocking upload task failed".into()),
    })?
}

/// Logs the outcome by kind code. Destination paths never reach the log.
fn observe(
    op: &'static str,
    namespace: Option<&Namespace>,
    outcome: Result<SafeDestination, UploadError>,
) -> Result<SafeDestination, UploadError> {
    outcome
        .inspect(|dest| {
            debug!(
                op,
                ns = namespace.map(Namespace::as_str),
                file = dest.file_name(),
                size = dest.size(),
                signature = %dest.signature(),
                "Upload stored"
            );
        })
        .inspect_err(|e| log_failure(op, namespace, e))
}

fn log_failure(op: &'static str, namespace: Option<&Namespace>, err: &UploadError) {
    let ns = namespace.map(Namespace::as_str);
    if err.is_environment_fault() {
        error!(op, ns, kind = %err.kind(), error = %err, "Upload failed");
    } else {
        warn!(op, ns, kind = %err.kind(), "Upload rejected");
    }
}
