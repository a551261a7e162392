//! Secure ingestion of untrusted uploads.
//!
//! An upload crosses two gates before anything touches the disk:
//!
//! 1. **Validation** ([`validate()`]): size, declared content type against a
//!    [`ValidationPolicy`], and for image types the leading bytes against the declared type.
//! 2. **Persistence** ([`persist()`], [`persist_in`]): the signature is re-derived from the
//!    bytes, a random name with a signature-derived extension is generated, the destination
//!    is proven to sit strictly inside the canonical root with no symbolic link in between
//!    ([`guard`]), and the bytes are committed through a temporary file and a rename.
//!
//! Caller-supplied filenames and content types never influence where or under which name
//! bytes are stored.
//!
//! [`Ingestor`] wraps both gates in a cloneable async handle bound to one root.
//!
//! # Examples
//!
//! ```rust
//! use sluice_upload::{UploadCandidate, UploadErrorKind, ValidationPolicy, persist, validate, PNG_MAGIC};
//!
//! # let tmp = tempfile::tempdir().unwrap();
//! let policy = ValidationPolicy::new(1024, ["text/csv", "image/png"]).unwrap();
//!
//! let mut csv = UploadCandidate::from_bytes(b"name,score\n".to_vec(), "text/csv");
//! assert!(validate(&mut csv, &policy).is_ok());
//!
//! let mut spoofed = UploadCandidate::from_bytes(b"<svg/>".to_vec(), "image/png");
//! let err = validate(&mut spoofed, &policy).unwrap_err();
//! assert_eq!(err.kind(), UploadErrorKind::SignatureMismatch);
//!
//! let saved = persist(tmp.path(), &PNG_MAGIC, 1024).unwrap();
//! assert!(saved.file_name().ends_with(".png"));
//! ```

mod builder;
mod candidate;
mod error;
pub mod guard;
mod ingestor;
mod maintenance;
mod namespace;
mod persist;
mod policy;
mod signature;
mod validate;

pub use builder::{DEFAULT_STALE_AFTER, IngestorBuilder, NoRoot, WithRoot};
pub use candidate::UploadCandidate;
pub use error::{UploadError, UploadErrorExt, UploadErrorKind};
pub use guard::{GuardedPath, check_root, is_contained};
pub use ingestor::{Ingestor, IngestorInner, NamespacedIngestor};
pub use maintenance::{PurgeReport, purge_stale};
pub use namespace::{MAX_NAMESPACE_LEN, Namespace};
pub use persist::{SafeDestination, TMP_MARKER, persist, persist_in};
pub use policy::{DEFAULT_ALLOWED_TYPES, DEFAULT_MAX_SIZE_BYTES, ValidationPolicy, normalize_content_type};
pub use signature::{ContentSignature, JPEG_EOI, JPEG_SOI, PNG_MAGIC, SNIFF_LEN, has_jpeg_trailer, sniff};
pub use validate::{validate, validate_filename};
