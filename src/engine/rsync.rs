//! Delegating engine over the external `rsync` tool

use super::{subtree_rel, SyncRequest, SyncStrategy};
use crate::process::{ProcessRunner, StdProcessRunner};
use crate::types::{OutputSink, SyncError};
use std::fs;
use std::path::PathBuf;

/// Program name probed by the factory.
pub const RSYNC_PROGRAM: &str = "rsync";

/// Builds one `rsync` invocation instead of walking the trees itself.
///
/// Archive mode carries the recursion plus permission/timestamp/link/owner
/// preservation the native engine approximates, and `--delete-after` defers
/// deletions until copying completes: with nested trees a file can appear
/// to vanish mid-transfer, and deleting up front turns that into a spurious
/// failure.
#[derive(Debug, Clone)]
pub struct RsyncEngine<R: ProcessRunner = StdProcessRunner> {
    program: PathBuf,
    runner: R,
}

impl RsyncEngine {
    /// Engine invoking the tool at `program` (usually the factory's probe
    /// result).
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            runner: StdProcessRunner,
        }
    }
}

impl<R: ProcessRunner> RsyncEngine<R> {
    /// Engine over a substitute runner, for tests.
    pub fn with_runner(program: impl Into<PathBuf>, runner: R) -> Self {
        Self {
            program: program.into(),
            runner,
        }
    }

    fn build_argv(&self, request: &SyncRequest) -> Vec<String> {
        let source_abs = request.source.absolute();
        let destination_abs = request.destination.absolute();

        let mut exclusions = request.exclusions.clone();
        // a source nested under the destination would otherwise be deleted
        // as extraneous while it is still being read; the reverse nesting
        // needs nothing, since delete only considers entries already inside
        // the destination
        if let Some(rel) = subtree_rel(&destination_abs, &source_abs) {
            exclusions.add(rel);
        }

        let mut argv = vec![
            self.program.to_string_lossy().into_owned(),
            "--archive".to_string(),
            "--verbose".to_string(),
            "--delete-after".to_string(),
        ];
        argv.extend(exclusions.iter().map(|entry| format!("--exclude={entry}")));

        // transfer the source's contents, not the directory itself
        if source_abs.ends_with(['/', '\\']) {
            argv.push(source_abs);
        } else {
            argv.push(format!("{source_abs}/"));
        }
        argv.push(destination_abs);
        argv
    }
}

impl<R: ProcessRunner + Send + Sync> SyncStrategy for RsyncEngine<R> {
    fn sync(&self, request: &SyncRequest, sink: Option<&OutputSink>) -> Result<(), SyncError> {
        let destination = PathBuf::from(request.destination.absolute());
        // give the tool somewhere to write on a from-empty first sync
        fs::create_dir_all(&destination).map_err(|e| SyncError::io(&destination, e))?;

        let argv = self.build_argv(request);
        self.runner.run(&argv, sink, request.timeout)
    }

    fn name(&self) -> &'static str {
        "rsync"
    }
}
