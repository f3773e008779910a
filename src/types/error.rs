//! Error types for stagesync

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Domain failures raised by the synchronization engines.
///
/// Lower-level failures are caught at the engine boundary and re-raised as
/// one of these kinds, carrying the original failure as context. Nothing is
/// retried automatically; every failure is fatal to the in-flight call and
/// the destination may be left partially updated.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Source directory does not exist
    #[error("source directory not found: {path}")]
    SourceMissing { path: PathBuf },

    /// Source and destination resolve to the same directory
    #[error("source and destination are the same directory: {path}")]
    SamePath { path: PathBuf },

    /// A filesystem mutation (copy, remove, mkdir) or walk failed
    #[error("I/O failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The external tool exited non-zero or could not be started
    #[error("{program} failed: {reason}")]
    Process { program: String, reason: String },

    /// Copy pass hit an entry that is neither a file nor a directory
    #[error("unrecognized entry type (not a file or directory): {path}")]
    UnrecognizedEntry { path: PathBuf },

    /// The call exceeded its wall-clock time limit
    #[error("sync exceeded time limit of {limit:?}")]
    Timeout { limit: Duration },
}

impl SyncError {
    /// Wrap an `io::Error` with the path the mutation targeted.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SyncError::Io {
            path: path.into(),
            source,
        }
    }

    /// Check if this error came from the external tool
    pub fn is_process_failure(&self) -> bool {
        matches!(self, SyncError::Process { .. })
    }

    /// Check if this error is a precondition failure (bad request, not a
    /// failed mutation)
    pub fn is_precondition_failure(&self) -> bool {
        matches!(
            self,
            SyncError::SourceMissing { .. } | SyncError::SamePath { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoError, ErrorKind};

    #[test]
    fn test_io_wrapper_keeps_path_and_cause() {
        let err = SyncError::io("work/file.txt", IoError::new(ErrorKind::NotFound, "gone"));

        match &err {
            SyncError::Io { path, source } => {
                assert_eq!(path, &PathBuf::from("work/file.txt"));
                assert_eq!(source.kind(), ErrorKind::NotFound);
            }
            other => panic!("expected Io, got {:?}", other),
        }
        assert!(err.to_string().contains("work/file.txt"));
    }

    #[test]
    fn test_source_missing_display() {
        let err = SyncError::SourceMissing {
            path: PathBuf::from("/stage/app"),
        };
        assert!(err.to_string().contains("source directory not found"));
        assert!(err.to_string().contains("/stage/app"));
        assert!(err.is_precondition_failure());
    }

    #[test]
    fn test_same_path_display() {
        let err = SyncError::SamePath {
            path: PathBuf::from("/work"),
        };
        assert!(err.to_string().contains("same directory"));
        assert!(err.is_precondition_failure());
    }

    #[test]
    fn test_process_failure_display() {
        let err = SyncError::Process {
            program: "rsync".to_string(),
            reason: "exited with status 23".to_string(),
        };
        assert!(err.to_string().contains("rsync failed"));
        assert!(err.to_string().contains("status 23"));
        assert!(err.is_process_failure());
    }

    #[test]
    fn test_unrecognized_entry_display() {
        let err = SyncError::UnrecognizedEntry {
            path: PathBuf::from("work/broken-link"),
        };
        assert!(err.to_string().contains("unrecognized entry type"));
        assert!(err.to_string().contains("broken-link"));
        assert!(!err.is_process_failure());
    }

    #[test]
    fn test_timeout_display() {
        let err = SyncError::Timeout {
            limit: Duration::from_secs(30),
        };
        assert!(err.to_string().contains("time limit"));
    }

    #[test]
    fn test_error_trait_implementation() {
        use std::error::Error;

        let err = SyncError::io("x", IoError::other("boom"));
        let _as_dyn: &dyn Error = &err;
        assert!(err.source().is_some(), "Io should expose its cause");
    }

    #[test]
    fn test_result_propagation() {
        fn inner() -> Result<(), SyncError> {
            Err(SyncError::SamePath {
                path: PathBuf::from("/work"),
            })
        }

        fn outer() -> Result<(), SyncError> {
            inner()?;
            Ok(())
        }

        assert!(matches!(outer().unwrap_err(), SyncError::SamePath { .. }));
    }
}
