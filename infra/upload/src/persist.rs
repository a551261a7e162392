use crate::error::{UploadError, UploadErrorExt};
use crate::guard::{self, GuardedPath};
use crate::namespace::Namespace;
use crate::signature::ContentSignature;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Marker carried by every in-flight temporary file.
pub const TMP_MARKER: &str = ".sluicetmp";

/// Lowercase, without look-alikes (0/o, 1/l/i), so names survive case-insensitive filesystems.
const NAME_ALPHABET: [char; 31] = [
    '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'j', 'k', 'm',
    'n', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];
/// 24 symbols over a 31-letter alphabet: about 118 bits.
const NAME_LEN: usize = 24;
const NONCE_LEN: usize = 8;

/// Where a persisted upload ended up.
///
/// The path was verified to sit strictly below [`SafeDestination::root`] immediately
/// before the write. It is a report, not a handle: nothing keeps it valid afterwards.
#[derive(Debug, PartialEq, Eq)]
pub struct SafeDestination {
    path: PathBuf,
    root: PathBuf,
    signature: ContentSignature,
    size: u64,
}

impl SafeDestination {
    /// Absolute, canonical path of the written file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Canonical root the destination was verified against.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path below the root, e.g. `deck_7/k3v...q.png`.
    #[must_use]
    pub fn relative(&self) -> &Path {
        self.path.strip_prefix(&self.root).unwrap_or(&self.path)
    }

    /// Generated file name including the extension.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.path.file_name().and_then(|n| n.to_str()).unwrap_or_default()
    }

    #[must_use]
    pub const fn signature(&self) -> ContentSignature {
        self.signature
    }

    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    #[must_use]
    pub fn into_path_buf(self) -> PathBuf {
        self.path
    }
}

/// Stores `bytes` directly under `root` with a generated name.
///
/// Only the bytes decide the outcome: the signature is re-derived here and picks the
/// extension. Nothing from the caller's declared type or filename reaches the path.
/// Exactly one file exists afterwards on success; none on failure.
///
/// # Errors
/// * [`UploadError::TooLarge`] when `bytes` is longer than `max_size`.
/// * [`UploadError::UnrecognizedType`] when the bytes are neither PNG nor JPEG.
/// * [`UploadError::RootUnavailable`], [`UploadError::SymlinkDetected`],
///   [`UploadError::TraversalDetected`] from the path guard, unchanged.
/// * [`UploadError::WriteFailed`] when the file cannot be written.
pub fn persist(
    root: impl AsRef<Path>,
    bytes: &[u8],
    max_size: u64,
) -> Result<SafeDestination, UploadError> {
    persist_at(root.as_ref(), None, bytes, max_size)
}

/// Like [`persist`], one directory deeper: `<root>/<namespace>/<generated>`.
///
/// The namespace directory is created (without following links) when missing.
///
/// # Errors
/// Same as [`persist`]. A namespace path that exists as a link is
/// [`UploadError::SymlinkDetected`].
pub fn persist_in(
    root: impl AsRef<Path>,
    namespace: &Namespace,
    bytes: &[u8],
    max_size: u64,
) -> Result<SafeDestination, UploadError> {
    persist_at(root.as_ref(), Some(namespace), bytes, max_size)
}

pub(crate) fn persist_at(
    root: &Path,
    namespace: Option<&Namespace>,
    bytes: &[u8],
    max_size: u64,
) -> Result<SafeDestination, UploadError> {
    let size = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
    if size > max_size {
        return Err(UploadError::TooLarge { size, limit: max_size, context: None });
    }

    let signature = ContentSignature::sniff(bytes);
    let Some(extension) = signature.extension() else {
        return Err(UploadError::UnrecognizedType { context: None });
    };

    let file_name = format!("{}.{extension}", nanoid::nanoid!(NAME_LEN, &NAME_ALPHABET));
    let relative = match namespace {
        Some(ns) => {
            // Created after the root check but before the full guard. A later refusal can
            // leave this directory behind, empty; it never leaves a file.
            guard::check_root(root)?;
            ensure_namespace_dir(&root.join(ns.as_str()))?;
            Path::new(ns.as_str()).join(&file_name)
        },
        None => PathBuf::from(&file_name),
    };

    let guarded = guard::guard(root, &relative)?;
    commit(&guarded, bytes)?;

    let (root, path) = guarded.into_parts();
    Ok(SafeDestination { path, root, signature, size })
}

fn ensure_namespace_dir(dir: &Path) -> Result<(), UploadError> {
    match dir.symlink_metadata() {
        Ok(meta) if meta.file_type().is_symlink() => Err(UploadError::SymlinkDetected {
            message: "namespace directory is a symbolic link".into(),
            context: None,
        }),
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => match fs::create_dir(dir) {
            // Lost a race with a concurrent save; the guard re-inspects it.
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(()),
            other => other.context("Creating namespace directory"),
        },
        Err(e) => Err(e).context("Inspecting namespace directory"),
    }
}

/// Temp file in the verified directory, fsync, then rename onto the final name.
/// The temp file is removed on every failure path.
fn commit(guarded: &GuardedPath, bytes: &[u8]) -> Result<(), UploadError> {
    let target = guarded.target();
    let Some(dir) = target.parent() else {
        return Err(UploadError::Internal { message: "destination has no parent".into(), context: None });
    };
    let tmp = tmp_path(target);

    if let Err(err) = write_tmp(&tmp, bytes).and_then(|()| publish(&tmp, target)) {
        let _ = fs::remove_file(&tmp);
        return Err(err);
    }

    // Durability of the directory entry is best effort.
    let _ = File::open(dir).and_then(|d| d.sync_all());
    Ok(())
}

fn write_tmp(tmp: &Path, bytes: &[u8]) -> Result<(), UploadError> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o640);
    }

    let mut file = options.open(tmp).context("Creating temporary file")?;
    file.write_all(bytes).context("Writing upload")?;
    file.sync_all().context("Syncing upload")
}

fn publish(tmp: &Path, target: &Path) -> Result<(), UploadError> {
    if target.symlink_metadata().is_ok() {
        return Err(io::Error::from(io::ErrorKind::AlreadyExists)).context("Destination already exists");
    }
    fs::rename(tmp, target).context("Publishing upload")
}

fn tmp_path(target: &Path) -> PathBuf {
    let name = target.file_name().and_then(|n| n.to_str()).unwrap_or("upload");
    let nonce = nanoid::nanoid!(NONCE_LEN, &NAME_ALPHABET);
    target.with_file_name(format!(".{name}.{nonce}{TMP_MARKER}"))
}
