use crate::error::UploadError;
use std::fmt;

/// Longest accepted namespace, in bytes.
pub const MAX_NAMESPACE_LEN: usize = 64;

/// A single directory level under the upload root, e.g. a tenant or deck id.
///
/// Lowercase ASCII alphanumerics and `_` only, so a namespace can never spell a
/// separator, a parent reference or a hidden file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace(String);

impl Namespace {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for Namespace {
    type Error = UploadError;

    fn try_from(value: &str) -> Result<Self, UploadError> {
        let name = value.to_ascii_lowercase();

        if name.is_empty() {
            return Err(UploadError::InvalidFilename {
                message: "namespace is empty".into(),
                context: Some("Validating namespace".into()),
            });
        }

        if name.len() > MAX_NAMESPACE_LEN {
            return Err(UploadError::InvalidFilename {
                message: format!("namespace is {} bytes, limit is {MAX_NAMESPACE_LEN}", name.len()).into(),
                context: Some("Validating namespace".into()),
            });
        }

        if !name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
            return Err(UploadError::TraversalDetected {
                message: name.into(),
                context: Some("Namespace contains illegal characters".into()),
            });
        }

        Ok(Self(name))
    }
}

impl TryFrom<String> for Namespace {
    type Error = UploadError;

    fn try_from(value: String) -> Result<Self, UploadError> {
        Self::try_from(value.as_str())
    }
}

impl AsRef<str> for Namespace {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
