//! Core type definitions for stagesync

mod error;
mod exclude;
mod sink;

pub use error::SyncError;
pub use exclude::ExclusionList;
pub use sink::{emit, OutputChunk, OutputSink, StreamKind};
