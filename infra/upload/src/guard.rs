//! Destination verification under a trusted root.
//!
//! Two symlink sweeps bracket canonicalization: the first runs on the lexical path, before
//! `canonicalize` can silently resolve links; the second runs on the canonical result, to
//! catch a directory swapped for a link in between. This narrows the check-to-use window,
//! it does not close it. A process that can write to the root's parent hierarchy while a
//! save is in flight is out of reach.

use crate::error::UploadError;
use std::ffi::OsStr;
use std::io;
use std::path::{Component, Path, PathBuf};

/// A target path that was proven, when checked, to sit strictly below a canonical root
/// with no symbolic link anywhere in between.
#[derive(Debug, PartialEq, Eq)]
pub struct GuardedPath {
    root: PathBuf,
    target: PathBuf,
}

impl GuardedPath {
    /// Canonical root the target was checked against.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Canonical parent joined with the requested leaf name.
    #[must_use]
    pub fn target(&self) -> &Path {
        &self.target
    }

    pub(crate) fn into_parts(self) -> (PathBuf, PathBuf) {
        (self.root, self.target)
    }
}

/// Verifies `relative` (one or more plain components) as a destination under `root`.
///
/// Every directory between `root` and the target's parent must already exist. The leaf
/// itself may or may not exist; an existing leaf that is a symbolic link is rejected.
///
/// # Errors
/// * [`UploadError::TraversalDetected`] when `relative` has anything but plain
///   components, or the canonical target is not strictly inside the canonical root.
/// * [`UploadError::SymlinkDetected`] when the root, any ancestor up to the target, or the
///   leaf is a symbolic link, before or after canonicalization.
/// * [`UploadError::RootUnavailable`] when the root or an intermediate directory is
///   missing, is not a directory, or cannot be resolved.
pub fn guard(root: &Path, relative: &Path) -> Result<GuardedPath, UploadError> {
    let (dirs, leaf) = split_relative(relative)?;

    check_root(root)?;

    let mut lexical = root.to_path_buf();
    for dir in &dirs {
        lexical.push(dir);
        check_directory(&lexical)?;
    }

    let canonical_root = canonicalize(root, "Resolving upload root")?;
    let canonical_parent = if dirs.is_empty() {
        canonical_root.clone()
    } else {
        canonicalize(&lexical, "Resolving destination directory")?
    };
    let target = canonical_parent.join(leaf);

    if !is_contained(&canonical_root, &target) {
        return Err(UploadError::TraversalDetected {
            message: "resolved destination is outside the upload root".into(),
            context: None,
        });
    }

    sweep_canonical(&canonical_root, &target)?;

    Ok(GuardedPath { root: canonical_root, target })
}

/// `true` when `target` is a strict descendant of `root`, compared component by component.
///
/// `/data/up` contains `/data/up/a.png` but not `/data/upload-evil/a.png`, and never
/// contains itself.
#[must_use]
pub fn is_contained(root: &Path, target: &Path) -> bool {
    target != root && target.starts_with(root)
}

/// The root must exist, be a directory and not be a symbolic link.
///
/// Run it on the path as configured, before anything canonicalizes it.
///
/// # Errors
/// [`UploadError::SymlinkDetected`] for a linked root, [`UploadError::RootUnavailable`]
/// when it is missing or not a directory.
pub fn check_root(root: &Path) -> Result<(), UploadError> {
    match root.symlink_metadata() {
        Ok(meta) if meta.file_type().is_symlink() => Err(UploadError::SymlinkDetected {
            message: "upload root is a symbolic link".into(),
            context: None,
        }),
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(UploadError::RootUnavailable {
            message: "upload root is not a directory".into(),
            context: None,
        }),
        Err(e) => Err(unavailable(&e, "upload root")),
    }
}

fn split_relative(relative: &Path) -> Result<(Vec<&OsStr>, &OsStr), UploadError> {
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::CurDir
            | Component::ParentDir
            | Component::RootDir
            | Component::Prefix(_) => {
                return Err(UploadError::TraversalDetected {
                    message: "destination must be a plain relative path".into(),
                    context: None,
                });
            },
        }
    }

    let Some(leaf) = parts.pop() else {
        return Err(UploadError::TraversalDetected {
            message: "destination is empty".into(),
            context: None,
        });
    };
    Ok((parts, leaf))
}

fn check_directory(path: &Path) -> Result<(), UploadError> {
    match path.symlink_metadata() {
        Ok(meta) if meta.file_type().is_symlink() => Err(UploadError::SymlinkDetected {
            message: "destination directory is a symbolic link".into(),
            context: None,
        }),
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(UploadError::RootUnavailable {
            message: "destination directory is not a directory".into(),
            context: None,
        }),
        Err(e) => Err(unavailable(&e, "destination directory")),
    }
}

/// Second sweep: the target's parent up to and including the canonical root, then the leaf.
fn sweep_canonical(root: &Path, target: &Path) -> Result<(), UploadError> {
    let parents = target.ancestors().skip(1).take_while(|p| p.starts_with(root));
    for dir in parents {
        if dir.symlink_metadata().is_ok_and(|m| m.file_type().is_symlink()) {
            return Err(UploadError::SymlinkDetected {
                message: "destination directory became a symbolic link".into(),
                context: None,
            });
        }
    }

    match target.symlink_metadata() {
        Ok(meta) if meta.file_type().is_symlink() => Err(UploadError::SymlinkDetected {
            message: "destination is a symbolic link".into(),
            context: None,
        }),
        _ => Ok(()),
    }
}

fn canonicalize(path: &Path, what: &'static str) -> Result<PathBuf, UploadError> {
    path.canonicalize().map_err(|e| UploadError::RootUnavailable {
        message: e.to_string().into(),
        context: Some(what.into()),
    })
}

fn unavailable(err: &io::Error, what: &str) -> UploadError {
    let message = if err.kind() == io::ErrorKind::NotFound {
        format!("{what} does not exist")
    } else {
        format!("{what} cannot be inspected: {err}")
    };
    UploadError::RootUnavailable { message: message.into(), context: None }
}
