//! Recursive file finder

use crate::types::{ExclusionList, SyncError};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Walk `root` and return every file beneath it, as paths relative to
/// `root`, in stable ascending lexicographic order by relative pathname.
///
/// Directories are never returned. Exclusion matching happens during the
/// walk, so an excluded subtree is never descended into. Symlinks are
/// reported but not followed; whether a link target is usable is the
/// caller's concern. A root with no matching files yields an empty list.
///
/// Nested roots get no special handling here; a caller syncing overlapping
/// trees avoids the overlap through `exclusions`.
pub fn find_files(root: &Path, exclusions: &ExclusionList) -> Result<Vec<PathBuf>, SyncError> {
    let filter_root = root.to_path_buf();
    let filter_exclusions = exclusions.clone();

    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .filter_entry(move |entry| {
            match entry.path().strip_prefix(&filter_root) {
                Ok(relative) if relative.as_os_str().is_empty() => true,
                Ok(relative) => !filter_exclusions.matches(&relative.to_string_lossy()),
                // outside the root (should not happen without follow_links)
                Err(_) => false,
            }
        })
        .build();

    let mut found = Vec::new();
    for result in walker {
        let entry = result.map_err(|e| walk_error(root, e))?;

        let Some(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| SyncError::io(entry.path(), std::io::Error::other(e)))?;
        found.push(relative.to_path_buf());
    }

    found.sort_by(|a, b| a.to_string_lossy().cmp(&b.to_string_lossy()));
    found.dedup();
    Ok(found)
}

fn walk_error(root: &Path, error: ignore::Error) -> SyncError {
    let message = error.to_string();
    match error.into_io_error() {
        Some(io) => SyncError::io(root, io),
        None => SyncError::io(root, std::io::Error::other(message)),
    }
}
