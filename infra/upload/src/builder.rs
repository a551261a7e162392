use crate::error::UploadError;
use crate::guard;
use crate::ingestor::{Ingestor, IngestorInner, run_blocking};
use crate::policy::ValidationPolicy;
use private::Sealed;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tracing::info;

/// Temporary files older than this are considered abandoned.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct IngestorConfig {
    policy: ValidationPolicy,
    create: bool,
    stale_after: Duration,
}

impl Default for IngestorConfig {
    fn default() -> Self {
        Self { policy: ValidationPolicy::default(), create: true, stale_after: DEFAULT_STALE_AFTER }
    }
}

#[derive(Debug, Default)]
pub struct NoRoot;
#[derive(Debug)]
pub struct WithRoot(PathBuf);

mod private {
    pub(super) trait Sealed {}
}
impl Sealed for NoRoot {}
impl Sealed for WithRoot {}

/// Configures an [`Ingestor`]. A root is required before [`IngestorBuilder::connect`].
#[allow(private_bounds)]
#[derive(Debug, Default)]
pub struct IngestorBuilder<S: Sealed = NoRoot> {
    state: S,
    config: IngestorConfig,
}

#[allow(private_bounds)]
impl<S: Sealed> IngestorBuilder<S> {
    #[must_use = "Sets the validation policy applied by the ingestor"]
    pub fn policy(mut self, policy: ValidationPolicy) -> Self {
        self.config.policy = policy;
        self
    }

    #[must_use = "Sets whether the upload root should be created if it does not exist"]
    pub const fn create(mut self, enable: bool) -> Self {
        self.config.create = enable;
        self
    }

    #[must_use = "Sets the age after which temporary files are purged"]
    pub const fn stale_after(mut self, age: Duration) -> Self {
        self.config.stale_after = age;
        self
    }

    fn transition<N: Sealed>(self, state: N) -> IngestorBuilder<N> {
        IngestorBuilder { state, config: self.config }
    }
}

impl IngestorBuilder<NoRoot> {
    #[must_use = "Creates a new ingestor builder with default configuration"]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "Sets the trusted upload root"]
    pub fn root(self, path: impl Into<PathBuf>) -> IngestorBuilder<WithRoot> {
        self.transition(WithRoot(path.into()))
    }
}

impl IngestorBuilder<WithRoot> {
    /// Prepares the root and returns a shareable handle.
    ///
    /// 1. Creates the root when `create(true)` is set (the default).
    /// 2. Refuses a root that is a symbolic link or not a directory.
    /// 3. Canonicalizes the root once; every save is checked against this path.
    /// 4. Purges abandoned temporary files. A failed purge is logged, not returned.
    ///
    /// # Errors
    /// * [`UploadError::RootUnavailable`] when the root is missing (and not created),
    ///   cannot be created, or cannot be resolved.
    /// * [`UploadError::SymlinkDetected`] when the root is a symbolic link.
    pub async fn connect(self) -> Result<Ingestor, UploadError> {
        let IngestorBuilder { state: WithRoot(root), config } = self;

        if config.create {
            fs::create_dir_all(&root).await.map_err(|e| UploadError::RootUnavailable {
                message: e.to_string().into(),
                context: Some("Creating upload root".into()),
            })?;
        }

        let canonical = run_blocking(move || {
            guard::check_root(&root)?;
            root.canonicalize().map_err(|e| UploadError::RootUnavailable {
                message: e.to_string().into(),
                context: Some("Resolving upload root".into()),
            })
        })
        .await?;

        info!(
            max_size_bytes = config.policy.max_size_bytes(),
            allowed = ?config.policy.allowed_types(),
            "Upload root ready"
        );

        let ingestor = Ingestor {
            inner: Arc::new(IngestorInner {
                root: canonical,
                policy: config.policy,
                stale_after: config.stale_after,
            }),
        };

        ingestor.purge_tmp().await;

        Ok(ingestor)
    }
}
