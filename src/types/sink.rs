//! Streamed output delivered to the caller during a sync

/// Which stream a chunk of engine output belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

/// One stream-tagged piece of output.
///
/// The native engine emits its own per-file diagnostics here; the delegating
/// engine forwards the external tool's stdout/stderr. Chunks are delivered
/// incrementally while a sync runs and in full before `sync()` returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputChunk {
    pub stream: StreamKind,
    pub text: String,
}

impl OutputChunk {
    pub fn stdout(text: impl Into<String>) -> Self {
        Self {
            stream: StreamKind::Stdout,
            text: text.into(),
        }
    }

    pub fn stderr(text: impl Into<String>) -> Self {
        Self {
            stream: StreamKind::Stderr,
            text: text.into(),
        }
    }
}

/// Callback receiving engine output as it is produced.
pub type OutputSink = dyn Fn(&OutputChunk) + Send + Sync;

/// Deliver a chunk when a sink is present.
pub fn emit(sink: Option<&OutputSink>, chunk: OutputChunk) {
    if let Some(sink) = sink {
        sink(&chunk);
    }
}
