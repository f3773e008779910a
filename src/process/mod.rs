//! Process execution and executable lookup
//!
//! The delegating engine runs the external mirroring tool through
//! [`ProcessRunner`] and the factory probes for it through
//! [`ExecutableLookup`]. Child stdout/stderr are forwarded line by line to
//! the caller's output sink while the child runs.

use crate::types::{emit, OutputChunk, OutputSink, StreamKind, SyncError};
use std::env;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Runs an external tool to completion.
pub trait ProcessRunner {
    /// Run `argv` (program first), forwarding stream-tagged output to
    /// `sink`. A non-zero exit or a failure to start is a domain failure;
    /// exceeding `timeout` kills the child.
    fn run(
        &self,
        argv: &[String],
        sink: Option<&OutputSink>,
        timeout: Option<Duration>,
    ) -> Result<(), SyncError>;
}

/// Locates a program on the host.
pub trait ExecutableLookup {
    /// The program's location, or `None` when it is not installed or not
    /// executable.
    fn locate(&self, program: &str) -> Option<PathBuf>;
}

/// Production runner over `std::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdProcessRunner;

impl ProcessRunner for StdProcessRunner {
    fn run(
        &self,
        argv: &[String],
        sink: Option<&OutputSink>,
        timeout: Option<Duration>,
    ) -> Result<(), SyncError> {
        let Some((program, args)) = argv.split_first() else {
            return Err(SyncError::Process {
                program: String::new(),
                reason: "empty command line".to_string(),
            });
        };

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SyncError::Process {
                program: program.clone(),
                reason: format!("failed to start: {e}"),
            })?;

        let (sender, receiver) = mpsc::channel();
        let mut readers = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_reader(stdout, StreamKind::Stdout, sender.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_reader(stderr, StreamKind::Stderr, sender.clone()));
        }
        drop(sender);

        let deadline = timeout.map(|limit| (Instant::now() + limit, limit));

        loop {
            let received = match deadline {
                Some((end, limit)) => {
                    let remaining = end.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Err(kill_on_timeout(&mut child, readers, limit));
                    }
                    match receiver.recv_timeout(remaining) {
                        Ok(chunk) => chunk,
                        Err(RecvTimeoutError::Timeout) => {
                            return Err(kill_on_timeout(&mut child, readers, limit));
                        }
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                None => match receiver.recv() {
                    Ok(chunk) => chunk,
                    Err(_) => break,
                },
            };
            emit(sink, received);
        }

        join_readers(readers);

        let status = child.wait().map_err(|e| SyncError::Process {
            program: program.clone(),
            reason: format!("failed to reap: {e}"),
        })?;

        if status.success() {
            Ok(())
        } else {
            Err(SyncError::Process {
                program: program.clone(),
                reason: match status.code() {
                    Some(code) => format!("exited with status {code}"),
                    None => "terminated by signal".to_string(),
                },
            })
        }
    }
}

fn spawn_reader<R: Read + Send + 'static>(
    stream: R,
    kind: StreamKind,
    sender: Sender<OutputChunk>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let reader = BufReader::new(stream);
        for line in reader.lines() {
            let Ok(line) = line else { break };
            let chunk = OutputChunk {
                stream: kind,
                text: line,
            };
            if sender.send(chunk).is_err() {
                break;
            }
        }
    })
}

fn join_readers(readers: Vec<JoinHandle<()>>) {
    for reader in readers {
        let _ = reader.join();
    }
}

fn kill_on_timeout(child: &mut Child, readers: Vec<JoinHandle<()>>, limit: Duration) -> SyncError {
    let _ = child.kill();
    let _ = child.wait();
    join_readers(readers);
    SyncError::Timeout { limit }
}

/// PATH-walking lookup, the production [`ExecutableLookup`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PathLookup;

impl ExecutableLookup for PathLookup {
    fn locate(&self, program: &str) -> Option<PathBuf> {
        let direct = Path::new(program);
        if direct.components().count() > 1 {
            return candidates_for(direct.to_path_buf())
                .into_iter()
                .find(|c| is_executable(c));
        }

        let path_env = env::var_os("PATH")?;
        for dir in env::split_paths(&path_env) {
            if dir.as_os_str().is_empty() {
                continue;
            }
            for candidate in candidates_for(dir.join(direct)) {
                if is_executable(&candidate) {
                    return Some(candidate);
                }
            }
        }
        None
    }
}

#[cfg(not(windows))]
fn candidates_for(base: PathBuf) -> Vec<PathBuf> {
    vec![base]
}

/// On Windows a bare program name expands across `PATHEXT` suffixes,
/// mirroring what the shell (and `std::process::Command`) would launch.
#[cfg(windows)]
fn candidates_for(base: PathBuf) -> Vec<PathBuf> {
    let mut candidates = vec![base.clone()];
    let pathext =
        env::var("PATHEXT").unwrap_or_else(|_| ".EXE;.COM;.BAT;.CMD".to_string());
    for ext in pathext.split(';').map(str::trim).filter(|e| !e.is_empty()) {
        let ext = ext.strip_prefix('.').unwrap_or(ext);
        candidates.push(base.with_extension(ext));
    }
    candidates
}

fn is_executable(path: &Path) -> bool {
    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }

    #[cfg(not(unix))]
    {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn collecting_sink() -> (Arc<Mutex<Vec<OutputChunk>>>, impl Fn(&OutputChunk) + Send + Sync)
    {
        let seen: Arc<Mutex<Vec<OutputChunk>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_ref = Arc::clone(&seen);
        let sink = move |chunk: &OutputChunk| {
            seen_ref.lock().expect("lock chunk log").push(chunk.clone());
        };
        (seen, sink)
    }

    #[test]
    #[cfg(unix)]
    fn test_run_forwards_tagged_streams() {
        let (seen, sink) = collecting_sink();
        let argv = vec![
            "sh".to_string(),
            "-c".to_string(),
            "echo out-line; echo err-line >&2".to_string(),
        ];

        StdProcessRunner.run(&argv, Some(&sink), None).expect("run");

        let chunks = seen.lock().expect("lock chunk log snapshot").clone();
        assert!(chunks
            .iter()
            .any(|c| c.stream == StreamKind::Stdout && c.text == "out-line"));
        assert!(chunks
            .iter()
            .any(|c| c.stream == StreamKind::Stderr && c.text == "err-line"));
    }

    #[test]
    #[cfg(unix)]
    fn test_run_nonzero_exit_is_process_failure() {
        let argv = vec!["sh".to_string(), "-c".to_string(), "exit 3".to_string()];
        let err = StdProcessRunner
            .run(&argv, None, None)
            .expect_err("run should fail");

        match err {
            SyncError::Process { program, reason } => {
                assert_eq!(program, "sh");
                assert!(reason.contains('3'), "reason should carry the code: {reason}");
            }
            other => panic!("expected Process, got {:?}", other),
        }
    }

    #[test]
    fn test_run_missing_program_is_process_failure() {
        let argv = vec!["/definitely/not/a/real/tool".to_string()];
        let err = StdProcessRunner
            .run(&argv, None, None)
            .expect_err("run should fail");
        assert!(err.is_process_failure());
        assert!(err.to_string().contains("failed to start"));
    }

    #[test]
    fn test_run_empty_argv_is_process_failure() {
        let err = StdProcessRunner
            .run(&[], None, None)
            .expect_err("run should fail");
        assert!(err.is_process_failure());
    }

    #[test]
    #[cfg(unix)]
    fn test_run_timeout_kills_the_child() {
        let argv = vec!["sh".to_string(), "-c".to_string(), "sleep 30".to_string()];
        let started = Instant::now();
        let err = StdProcessRunner
            .run(&argv, None, Some(Duration::from_millis(200)))
            .expect_err("run should time out");

        assert!(matches!(err, SyncError::Timeout { .. }));
        assert!(
            started.elapsed() < Duration::from_secs(10),
            "timed-out child should be killed promptly"
        );
    }

    #[test]
    #[cfg(unix)]
    fn test_locate_finds_sh_on_path() {
        let located = PathLookup.locate("sh").expect("sh should be on PATH");
        assert!(located.is_absolute());
        assert!(is_executable(&located));
    }

    #[test]
    fn test_locate_missing_program_is_none() {
        assert!(PathLookup
            .locate("stagesync-no-such-tool-expected")
            .is_none());
    }

    #[test]
    #[cfg(unix)]
    fn test_locate_explicit_path_checks_executability() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().expect("create tempdir");
        let tool = dir.path().join("tool");
        std::fs::write(&tool, b"#!/bin/sh\n").expect("write tool");

        // not yet executable
        assert!(PathLookup.locate(&tool.to_string_lossy()).is_none());

        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755))
            .expect("chmod tool");
        assert_eq!(
            PathLookup.locate(&tool.to_string_lossy()),
            Some(tool.clone())
        );
    }
}
