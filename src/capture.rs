//! Keeping target output off the protocol channel.
//!
//! Stdout carries exactly one JSON line per command, so anything a target writes to fd 1 would
//! corrupt it. Around each invocation an [`OutputGuard`] either buffers both streams (when
//! `captureOutput` is on) or points fd 1 at stderr for the duration of the call.
//!
//! Redirection is process-wide and one-at-a-time. When a redirect is already active the guard
//! falls back to the next mode rather than failing the test. Output written by a worker that
//! outlives its guard (an abandoned timed-out call) is not covered.

use std::io::{self, Read, Write};

use gag::{BufferRedirect, Redirect};
use tracing::debug;

/// What a target wrote while a capturing guard was active.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
}

impl CapturedOutput {
    pub fn has_output(&self) -> bool {
        !self.stdout.is_empty() || !self.stderr.is_empty()
    }

    /// One entry per non-empty stream, each prefixed with its stream tag.
    pub fn as_logs(&self) -> Vec<String> {
        let mut logs = Vec::new();
        if !self.stdout.is_empty() {
            logs.push(format!("[stdout]\n{}", self.stdout));
        }
        if !self.stderr.is_empty() {
            logs.push(format!("[stderr]\n{}", self.stderr));
        }
        logs
    }
}

/// Held across one invocation; [`OutputGuard::finish`] restores the streams.
pub enum OutputGuard {
    Capture { stdout: BufferRedirect, stderr: BufferRedirect },
    Divert(Redirect<io::Stderr>),
    Passthrough,
}

impl std::fmt::Debug for OutputGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mode = match self {
            OutputGuard::Capture { .. } => "Capture",
            OutputGuard::Divert(_) => "Divert",
            OutputGuard::Passthrough => "Passthrough",
        };
        f.debug_tuple("OutputGuard").field(&mode).finish()
    }
}

impl OutputGuard {
    pub fn start(capture: bool) -> Self {
        flush_std();
        if capture {
            match (BufferRedirect::stdout(), BufferRedirect::stderr()) {
                (Ok(stdout), Ok(stderr)) => return OutputGuard::Capture { stdout, stderr },
                (Err(e), _) | (_, Err(e)) => debug!(error = %e, "output capture unavailable; diverting instead"),
            }
        }
        match Redirect::stdout(io::stderr()) {
            Ok(redirect) => OutputGuard::Divert(redirect),
            Err(e) => {
                debug!(error = %e, "stdout redirect unavailable; passing through");
                OutputGuard::Passthrough
            }
        }
    }

    /// Restore the streams and hand back anything buffered.
    pub fn finish(self) -> CapturedOutput {
        flush_std();
        match self {
            OutputGuard::Capture { mut stdout, mut stderr } => CapturedOutput {
                stdout: drain("stdout", &mut stdout),
                stderr: drain("stderr", &mut stderr),
            },
            OutputGuard::Divert(_) | OutputGuard::Passthrough => CapturedOutput::default(),
        }
    }
}

fn flush_std() {
    if let Err(e) = io::stdout().flush() {
        debug!(error = %e, "flushing stdout");
    }
    if let Err(e) = io::stderr().flush() {
        debug!(error = %e, "flushing stderr");
    }
}

fn drain(stream: &str, buffer: &mut BufferRedirect) -> String {
    let mut text = String::new();
    if let Err(e) = buffer.read_to_string(&mut text) {
        debug!(stream, error = %e, "reading captured output");
    }
    text
}
