//! # stagesync - Working-Copy Synchronization Engine
//!
//! Stage, mutate, commit.
//!
//! The synchronization core behind a staged-editing workflow for live
//! directory trees: mirror a source tree onto a destination tree, delete
//! whatever the source no longer has, honor caller exclusions, and stay
//! correct when one tree is nested inside the other.

// Module declarations
pub mod engine;
pub mod finder;
pub mod fsops;
pub mod path;
pub mod process;
pub mod types;

// Re-export commonly used types
pub use engine::{NativeEngine, RsyncEngine, SyncRequest, SyncStrategy};
pub use path::{PathDialect, TreePath};
pub use types::{ExclusionList, OutputChunk, OutputSink, StreamKind, SyncError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
