use crate::error::UploadError;
use fxhash::FxHashSet;
use std::sync::Arc;

/// 5 MiB.
pub const DEFAULT_MAX_SIZE_BYTES: u64 = 5 * 1024 * 1024;
pub const DEFAULT_ALLOWED_TYPES: &[&str] =
    &["text/csv", "application/json", "image/png", "image/jpeg"];

/// Trims and lowercases a content type for comparison.
#[must_use]
pub fn normalize_content_type(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

/// Size and declared-type limits for uploads.
///
/// Immutable once built. The allowed set sits behind an `Arc`, so clones and per-call
/// overrides are cheap and the policy can be shared across threads without locking.
#[derive(Debug, Clone)]
pub struct ValidationPolicy {
    max_size_bytes: u64,
    allowed: Arc<FxHashSet<String>>,
    reject_unsafe_filenames: bool,
}

impl ValidationPolicy {
    /// Builds a policy from a positive size limit and a non-empty set of content types.
    ///
    /// # Errors
    /// [`UploadError::InvalidPolicy`] when the limit is zero, the set is empty, or an
    /// entry is blank.
    pub fn new<I, S>(max_size_bytes: u64, allowed: I) -> Result<Self, UploadError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            max_size_bytes: checked_limit(max_size_bytes)?,
            allowed: Arc::new(normalized_set(allowed)?),
            reject_unsafe_filenames: true,
        })
    }

    /// A copy of this policy with another size limit.
    ///
    /// # Errors
    /// [`UploadError::InvalidPolicy`] when `max_size_bytes` is zero.
    pub fn with_max_size(&self, max_size_bytes: u64) -> Result<Self, UploadError> {
        Ok(Self { max_size_bytes: checked_limit(max_size_bytes)?, ..self.clone() })
    }

    /// A copy of this policy with another allowed set.
    ///
    /// # Errors
    /// [`UploadError::InvalidPolicy`] when the set is empty or an entry is blank.
    pub fn with_allowed_types<I, S>(&self, allowed: I) -> Result<Self, UploadError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self { allowed: Arc::new(normalized_set(allowed)?), ..self.clone() })
    }

    /// Toggles the check on caller-supplied filenames (on by default).
    #[must_use]
    pub const fn with_filename_check(mut self, enabled: bool) -> Self {
        self.reject_unsafe_filenames = enabled;
        self
    }

    #[must_use]
    pub const fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    #[must_use]
    pub const fn rejects_unsafe_filenames(&self) -> bool {
        self.reject_unsafe_filenames
    }

    /// Case-insensitive membership test.
    #[must_use]
    pub fn allows(&self, content_type: &str) -> bool {
        self.allowed.contains(&normalize_content_type(content_type))
    }

    pub(crate) fn allows_normalized(&self, content_type: &str) -> bool {
        self.allowed.contains(content_type)
    }

    /// Allowed types in sorted order.
    #[must_use]
    pub fn allowed_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.allowed.iter().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            max_size_bytes: DEFAULT_MAX_SIZE_BYTES,
            allowed: Arc::new(DEFAULT_ALLOWED_TYPES.iter().map(|t| (*t).to_owned()).collect()),
            reject_unsafe_filenames: true,
        }
    }
}

fn checked_limit(max_size_bytes: u64) -> Result<u64, UploadError> {
    if max_size_bytes == 0 {
        return Err(UploadError::InvalidPolicy {
            message: "size limit must be positive".into(),
            context: None,
        });
    }
    Ok(max_size_bytes)
}

fn normalized_set<I, S>(allowed: I) -> Result<FxHashSet<String>, UploadError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut set = FxHashSet::default();
    for raw in allowed {
        let normalized = normalize_content_type(raw.as_ref());
        if normalized.is_empty() {
            return Err(UploadError::InvalidPolicy {
                message: "blank content type in allowed set".into(),
                context: None,
            });
        }
        set.insert(normalized);
    }

    if set.is_empty() {
        return Err(UploadError::InvalidPolicy {
            message: "allowed content types cannot be empty".into(),
            context: None,
        });
    }
    Ok(set)
}
