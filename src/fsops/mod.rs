//! Filesystem operations collaborator
//!
//! The native engine mutates trees only through [`FsOps`], so tests can
//! substitute a failing or recording implementation.

use crate::types::SyncError;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

/// The filesystem surface the native engine consumes.
pub trait FsOps {
    fn exists(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    fn is_file(&self, path: &Path) -> bool;
    fn is_symlink(&self, path: &Path) -> bool;

    /// True when `path` is a directory with no entries, or not a directory
    /// at all. Used to decide whether a deletion pass is worth running.
    fn is_empty_dir(&self, path: &Path) -> bool;

    /// Create a directory and any missing intermediates. Idempotent.
    fn mkdir(&self, path: &Path) -> Result<(), SyncError>;

    /// Copy a single file, overwriting any existing destination file.
    /// Must never be invoked on a directory.
    fn copy_file(&self, src: &Path, dest: &Path) -> Result<u64, SyncError>;

    /// Remove a file, or a directory and everything beneath it.
    fn remove(&self, path: &Path) -> Result<(), SyncError>;
}

/// Production implementation over `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFs;

impl FsOps for StdFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_symlink(&self, path: &Path) -> bool {
        fs::symlink_metadata(path)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false)
    }

    fn is_empty_dir(&self, path: &Path) -> bool {
        match fs::read_dir(path) {
            Ok(mut entries) => entries.next().is_none(),
            Err(_) => true,
        }
    }

    fn mkdir(&self, path: &Path) -> Result<(), SyncError> {
        fs::create_dir_all(path).map_err(|e| SyncError::io(path, e))
    }

    fn copy_file(&self, src: &Path, dest: &Path) -> Result<u64, SyncError> {
        copy_file_atomic(src, dest)
    }

    fn remove(&self, path: &Path) -> Result<(), SyncError> {
        let metadata = fs::symlink_metadata(path).map_err(|e| SyncError::io(path, e))?;
        if metadata.file_type().is_dir() {
            fs::remove_dir_all(path).map_err(|e| SyncError::io(path, e))
        } else {
            fs::remove_file(path).map_err(|e| SyncError::io(path, e))
        }
    }
}

/// Copy `src` over `dest` using write-then-rename.
///
/// The content streams into a sibling `.part` file which is synced,
/// stamped with the source's permissions and mtime, and renamed into
/// place, so a crashed copy never leaves a half-written file under the
/// destination name.
pub fn copy_file_atomic(src: &Path, dest: &Path) -> Result<u64, SyncError> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| SyncError::io(parent, e))?;
    }

    let part_path = dest.with_extension("part");

    let mut src_file = File::open(src).map_err(|e| SyncError::io(src, e))?;
    let mut part_file = File::create(&part_path).map_err(|e| SyncError::io(&part_path, e))?;

    let mut buffer = vec![0u8; 128 * 1024];
    let mut total_bytes = 0u64;
    loop {
        let bytes_read = src_file
            .read(&mut buffer)
            .map_err(|e| SyncError::io(src, e))?;
        if bytes_read == 0 {
            break;
        }
        part_file
            .write_all(&buffer[0..bytes_read])
            .map_err(|e| SyncError::io(&part_path, e))?;
        total_bytes += bytes_read as u64;
    }

    part_file
        .sync_all()
        .map_err(|e| SyncError::io(&part_path, e))?;
    // release the handle before rename (required on Windows)
    drop(part_file);

    let src_metadata = fs::metadata(src).map_err(|e| SyncError::io(src, e))?;
    fs::set_permissions(&part_path, src_metadata.permissions())
        .map_err(|e| SyncError::io(&part_path, e))?;
    if let Ok(mtime) = src_metadata.modified() {
        let mtime = filetime::FileTime::from_system_time(mtime);
        filetime::set_file_mtime(&part_path, mtime).map_err(|e| SyncError::io(&part_path, e))?;
    }

    fs::rename(&part_path, dest).map_err(|e| SyncError::io(dest, e))?;

    Ok(total_bytes)
}
