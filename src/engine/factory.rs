//! Capability-probed engine selection

use super::{NativeEngine, RsyncEngine, SyncStrategy, RSYNC_PROGRAM};
use crate::process::{ExecutableLookup, PathLookup};

/// Pick the sync strategy for this host: the delegating engine when the
/// external tool is installed, the native engine otherwise.
///
/// The probe happens once per call; callers typically call this once per
/// process and reuse the returned strategy.
pub fn create() -> Box<dyn SyncStrategy> {
    create_with(&PathLookup)
}

/// Selection over an explicit lookup, the pure half of [`create`].
pub fn create_with(lookup: &dyn ExecutableLookup) -> Box<dyn SyncStrategy> {
    match lookup.locate(RSYNC_PROGRAM) {
        Some(program) => Box::new(RsyncEngine::new(program)),
        None => Box::new(NativeEngine::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct FixedLookup(Option<PathBuf>);

    impl ExecutableLookup for FixedLookup {
        fn locate(&self, _program: &str) -> Option<PathBuf> {
            self.0.clone()
        }
    }

    #[test]
    fn test_delegating_engine_when_tool_is_present() {
        let strategy = create_with(&FixedLookup(Some(PathBuf::from("/usr/bin/rsync"))));
        assert_eq!(strategy.name(), "rsync");
    }

    #[test]
    fn test_native_engine_when_tool_is_absent() {
        let strategy = create_with(&FixedLookup(None));
        assert_eq!(strategy.name(), "native");
    }

    #[test]
    fn test_create_returns_some_strategy() {
        let strategy = create();
        assert!(matches!(strategy.name(), "native" | "rsync"));
    }
}
