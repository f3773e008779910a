//! Dependency-free mirroring engine

use super::{subtree_rel, SyncRequest, SyncStrategy};
use crate::finder::find_files;
use crate::fsops::{FsOps, StdFs};
use crate::types::{emit, ExclusionList, OutputChunk, OutputSink, SyncError};
use indicatif::HumanBytes;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Mirrors the source tree onto the destination by walking both trees
/// itself: a deletion pass removes destination files with no source
/// counterpart, then a copy pass overwrites every source file into place.
///
/// Files are always fully overwritten; no modification-time or content
/// comparison is made, since for many-small-files workloads the comparison
/// cost rarely pays off.
///
/// When the trees are nested the engine excludes the inner tree from the
/// walk over the outer one, in both directions, so it never copies the
/// destination into itself or deletes the source out from under the copy.
#[derive(Debug, Clone, Default)]
pub struct NativeEngine<F: FsOps = StdFs> {
    fs: F,
}

impl NativeEngine {
    pub fn new() -> Self {
        Self { fs: StdFs }
    }
}

impl<F: FsOps> NativeEngine<F> {
    /// Engine over a substitute filesystem, for tests.
    pub fn with_fs(fs: F) -> Self {
        Self { fs }
    }

    fn delete_pass(
        &self,
        source: &Path,
        destination: &Path,
        source_abs: &str,
        destination_abs: &str,
        exclusions: &ExclusionList,
        sink: Option<&OutputSink>,
        deadline: &Deadline,
    ) -> Result<(), SyncError> {
        if self.fs.is_empty_dir(destination) {
            return Ok(());
        }

        let mut exclusions = exclusions.clone();
        // a source nested under the destination must never be a deletion
        // candidate
        if let Some(rel) = subtree_rel(destination_abs, source_abs) {
            exclusions.add(rel);
        }

        for relative in find_files(destination, &exclusions)? {
            deadline.check()?;
            if !self.fs.exists(&source.join(&relative)) {
                emit(
                    sink,
                    OutputChunk::stdout(format!("delete {}", relative.display())),
                );
                self.fs.remove(&destination.join(&relative))?;
            }
        }
        Ok(())
    }

    fn copy_pass(
        &self,
        source: &Path,
        destination: &Path,
        source_abs: &str,
        destination_abs: &str,
        exclusions: &ExclusionList,
        sink: Option<&OutputSink>,
        deadline: &Deadline,
    ) -> Result<(), SyncError> {
        let mut exclusions = exclusions.clone();
        // a destination nested under the source would otherwise be copied
        // into itself
        if let Some(rel) = subtree_rel(source_abs, destination_abs) {
            exclusions.add(rel);
        }

        for relative in find_files(source, &exclusions)? {
            deadline.check()?;
            let from = source.join(&relative);
            let to = destination.join(&relative);

            if self.fs.is_file(&from) {
                if let Some(parent) = to.parent() {
                    self.fs.mkdir(parent)?;
                }
                let bytes = self.fs.copy_file(&from, &to)?;
                emit(
                    sink,
                    OutputChunk::stdout(format!(
                        "copy {} ({})",
                        relative.display(),
                        HumanBytes(bytes)
                    )),
                );
            } else if self.fs.is_dir(&from) {
                self.fs.mkdir(&to)?;
            } else {
                return Err(SyncError::UnrecognizedEntry { path: from });
            }
        }
        Ok(())
    }
}

impl<F: FsOps + Send + Sync> SyncStrategy for NativeEngine<F> {
    fn sync(&self, request: &SyncRequest, sink: Option<&OutputSink>) -> Result<(), SyncError> {
        let source_abs = request.source.absolute();
        let destination_abs = request.destination.absolute();

        if source_abs == destination_abs {
            return Err(SyncError::SamePath {
                path: PathBuf::from(source_abs),
            });
        }

        let source = PathBuf::from(&source_abs);
        let destination = PathBuf::from(&destination_abs);

        if !self.fs.exists(&source) {
            return Err(SyncError::SourceMissing { path: source });
        }
        self.fs.mkdir(&destination)?;

        let deadline = Deadline::starting_now(request.timeout);
        self.delete_pass(
            &source,
            &destination,
            &source_abs,
            &destination_abs,
            &request.exclusions,
            sink,
            &deadline,
        )?;
        self.copy_pass(
            &source,
            &destination,
            &source_abs,
            &destination_abs,
            &request.exclusions,
            sink,
            &deadline,
        )
    }

    fn name(&self) -> &'static str {
        "native"
    }
}

/// Advisory wall-clock limit, fixed before the operation starts and checked
/// between per-file operations. An in-flight copy is never interrupted.
#[derive(Debug, Clone, Copy)]
struct Deadline {
    end: Option<(Instant, Duration)>,
}

impl Deadline {
    fn starting_now(limit: Option<Duration>) -> Self {
        Self {
            end: limit.map(|limit| (Instant::now() + limit, limit)),
        }
    }

    fn check(&self) -> Result<(), SyncError> {
        match self.end {
            Some((end, limit)) if Instant::now() >= end => Err(SyncError::Timeout { limit }),
            _ => Ok(()),
        }
    }
}
