//! Process-execution adapter.
//!
//! All three external tool call sites (voice downloader, piper, ffmpeg)
//! go through the [`ToolRunner`] trait, so tests can substitute a
//! scripted fake without spawning real processes.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Captured result of one external tool invocation.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Exit code; `None` when the process was killed by a signal.
    pub status_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status_code == Some(0)
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }
}

#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run `program` with `args`, optionally writing `stdin` to the
    /// child's standard input (then closing it), and wait for exit.
    async fn run(
        &self,
        program: &Path,
        args: &[String],
        stdin: Option<&[u8]>,
    ) -> std::io::Result<ToolOutput>;
}

/// Production runner backed by `tokio::process`.
///
/// With `timeout` unset the call blocks for as long as the tool runs.
/// When set, a tool that overruns the deadline is killed and the
/// invocation fails with `ErrorKind::TimedOut`.
#[derive(Debug, Clone, Default)]
pub struct ExecRunner {
    pub timeout: Option<Duration>,
}

#[async_trait]
impl ToolRunner for ExecRunner {
    async fn run(
        &self,
        program: &Path,
        args: &[String],
        stdin: Option<&[u8]>,
    ) -> std::io::Result<ToolOutput> {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if self.timeout.is_some() {
            cmd.kill_on_drop(true);
        }
        debug!(target: "process", command = ?cmd, "Running external tool");

        let mut child = cmd.spawn()?;
        if let Some(bytes) = stdin {
            if let Some(mut pipe) = child.stdin.take() {
                pipe.write_all(bytes).await?;
                // pipe drops here, closing the child's stdin
            }
        }

        let wait = child.wait_with_output();
        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, wait).await {
                Ok(out) => out?,
                Err(_) => {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        format!(
                            "{} did not finish within {}ms",
                            program.display(),
                            limit.as_millis()
                        ),
                    ));
                }
            },
            None => wait.await?,
        };

        Ok(ToolOutput {
            status_code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

/// Trailing `max` bytes of tool diagnostics, adjusted to a char boundary.
/// Keeps error payloads bounded no matter how verbose the tool is.
pub fn tail(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    s[start..].to_string()
}
