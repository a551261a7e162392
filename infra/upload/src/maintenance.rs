use crate::persist::TMP_MARKER;
use std::path::Path;
use std::time::{Duration, SystemTime};
use walkdir::{DirEntry, WalkDir};

/// Outcome of a temporary-file sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub removed: usize,
    pub failed: usize,
}

impl PurgeReport {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.removed == 0 && self.failed == 0
    }
}

/// Removes temporary files left behind by interrupted saves, if they are older than
/// `threshold`. Links are never followed and directories are left in place.
///
/// Blocking; run it on a blocking pool from async code.
#[must_use]
pub fn purge_stale(root: &Path, now: SystemTime, threshold: Duration) -> PurgeReport {
    let mut report = PurgeReport::default();

    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .flatten()
        .filter(|entry| is_tmp(entry) && is_stale(entry, now, threshold))
        .for_each(|entry| match std::fs::remove_file(entry.path()) {
            Ok(()) => report.removed += 1,
            Err(_) => report.failed += 1,
        });

    report
}

fn is_tmp(entry: &DirEntry) -> bool {
    entry.file_type().is_file()
        && entry.file_name().to_str().is_some_and(|name| name.starts_with('.') && name.ends_with(TMP_MARKER))
}

fn is_stale(entry: &DirEntry, now: SystemTime, threshold: Duration) -> bool {
    // No timestamp at all counts as stale; a timestamp in the future does not.
    match entry.metadata().ok().and_then(|m| m.modified().ok()) {
        Some(modified) => now.duration_since(modified).is_ok_and(|age| age >= threshold),
        None => true,
    }
}
