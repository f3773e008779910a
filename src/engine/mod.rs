//! Synchronization strategies
//!
//! One [`SyncStrategy`] contract, two implementations: [`NativeEngine`]
//! walks and mutates the trees itself, [`RsyncEngine`] builds a single
//! invocation of the external `rsync` tool. [`create`] picks between them
//! based on whether the tool is installed.

mod factory;
mod native;
mod rsync;

pub use factory::{create, create_with};
pub use native::NativeEngine;
pub use rsync::{RsyncEngine, RSYNC_PROGRAM};

use crate::path::TreePath;
use crate::types::{ExclusionList, OutputSink, SyncError};
use std::time::Duration;

/// One mirroring job: make `destination` identical to `source`, minus
/// exclusions. Lives only for the duration of a single call.
#[derive(Debug, Clone)]
pub struct SyncRequest {
    pub source: TreePath,
    pub destination: TreePath,
    pub exclusions: ExclusionList,
    /// Wall-clock bound for the call. Enforced on the child process by the
    /// delegating engine; advisory (checked between per-file operations) in
    /// the native engine.
    pub timeout: Option<Duration>,
}

impl SyncRequest {
    pub fn new(source: TreePath, destination: TreePath) -> Self {
        Self {
            source,
            destination,
            exclusions: ExclusionList::new(),
            timeout: None,
        }
    }

    pub fn with_exclusions(mut self, exclusions: ExclusionList) -> Self {
        self.exclusions = exclusions;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// A tree-mirroring implementation.
///
/// Implementations hold no per-call state: one instance is safely reusable
/// across calls, though concurrent calls over the *same* trees remain
/// undefined by design. `sync` blocks until completion or failure, and all
/// sink output is delivered before it returns.
pub trait SyncStrategy: Send + Sync {
    fn sync(&self, request: &SyncRequest, sink: Option<&OutputSink>) -> Result<(), SyncError>;

    /// Short identifier for diagnostics ("native" or "rsync").
    fn name(&self) -> &'static str;
}

/// Where `child` lies beneath `parent`, the child's location relative to
/// the parent, with `/` separators. `None` when the trees do not nest.
/// Both arguments must already be normalized absolute strings.
pub(crate) fn subtree_rel(parent: &str, child: &str) -> Option<String> {
    let rest = child.strip_prefix(parent)?;
    if rest.is_empty() {
        return None;
    }

    let trimmed = if parent.ends_with(['/', '\\']) {
        rest
    } else {
        rest.strip_prefix(['/', '\\'])?
    };
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.replace('\\', "/"))
}
