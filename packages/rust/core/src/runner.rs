//! External program execution with captured output.
//!
//! A [`ProcessRunner`] spawns one program, writes the source text to its
//! stdin, waits for it to exit and returns both output streams decoded
//! permissively. Spawn failures and timeouts come back as errors so the
//! caller can decide how to record them.

use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use silinspector_shared::{Result, SilInspectorError};

/// Synthetic exit code recorded when a program could not be started.
pub const SPAWN_FAILURE_EXIT_CODE: i32 = 127;

/// Synthetic exit code recorded when a program was killed for running too long.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// Exit code and decoded output streams of a finished program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }

    /// The stream shown to users.
    ///
    /// stdout on success. On failure, stderr unless it is empty, in which
    /// case stdout.
    pub fn into_visible_output(self) -> String {
        if self.succeeded() || self.stderr.is_empty() {
            self.stdout
        } else {
            self.stderr
        }
    }
}

/// Spawns programs and collects their output, with an optional time limit.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner {
    timeout: Option<Duration>,
}

impl ProcessRunner {
    /// Create a runner. `None` lets programs run until they exit.
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Run `program` with `args`, feeding `input` on stdin.
    ///
    /// A non-zero exit is returned as data, not as an error.
    ///
    /// # Errors
    ///
    /// [`SilInspectorError::Spawn`] if the program cannot be started or
    /// waited on, [`SilInspectorError::Timeout`] if it outlives the limit
    /// (the process is killed).
    #[instrument(skip_all, fields(program = %program))]
    pub async fn run(
        &self,
        program: &str,
        args: &[String],
        input: &str,
    ) -> Result<ProcessOutput> {
        let start = Instant::now();

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SilInspectorError::spawn(program, e))?;

        // Feed stdin from its own task so a chatty child cannot block us
        // while its stdout pipe is full.
        let stdin = child.stdin.take();
        let input = input.as_bytes().to_vec();
        let feeder = tokio::spawn(async move {
            let Some(mut stdin) = stdin else {
                return;
            };
            if let Err(e) = stdin.write_all(&input).await {
                // A child that exits without reading its input is fine.
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    debug!(error = %e, "failed to write program input");
                }
            }
        });

        let waited = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(waited) => waited,
                Err(_) => {
                    feeder.abort();
                    warn!(timeout_ms = limit.as_millis(), "program timed out, killed");
                    return Err(SilInspectorError::Timeout {
                        program: program.to_string(),
                        after: limit,
                    });
                }
            },
            None => child.wait_with_output().await,
        };
        let _ = feeder.await;

        let output = waited.map_err(|e| SilInspectorError::spawn(program, e))?;
        let result = ProcessOutput {
            exit_code: exit_code(output.status),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        debug!(
            exit_code = result.exit_code,
            stdout_len = result.stdout.len(),
            stderr_len = result.stderr.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "program finished"
        );

        Ok(result)
    }
}

/// Exit code, or the negated signal number for a signal-terminated process.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    -1
}
