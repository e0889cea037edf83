//! Shared subprocess management.
//!
//! Provides [`run_command`], used by every invocation strategy. Each
//! strategy builds a [`tokio::process::Command`] with its program and
//! arguments and delegates spawn, capture, and timeout handling here.

use std::process::Stdio;
use std::time::Instant;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use super::executor::{RawResult, ScriptError, ScriptInput, ScriptOutput};

/// Maximum stdout or stderr size captured per stream (10 MiB).
pub const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Spawn `cmd` as a child process, capture stdout/stderr in full, and wait
/// for it to exit (or for the optional timeout to expire).
///
/// Environment variables and working directory from [`ScriptInput`] are
/// applied here. Stdin is closed so scripts never block on input.
pub async fn run_command(cmd: &mut Command, input: ScriptInput) -> RawResult {
    // `kill_on_drop(true)` kills the child if it is dropped (timeout, or the
    // awaiting future being dropped).
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    for (key, value) in &input.env_vars {
        cmd.env(key, value);
    }

    if let Some(dir) = &input.working_directory {
        cmd.current_dir(dir);
    }

    let start = Instant::now();

    let mut child = cmd.spawn()?;

    // Read the pipes in spawned tasks so `child.wait()` can borrow `child`.
    let stdout_handle = child.stdout.take();
    let stderr_handle = child.stderr.take();

    let stdout_task = tokio::spawn(async move { read_stream(stdout_handle).await });
    let stderr_task = tokio::spawn(async move { read_stream(stderr_handle).await });

    let status = match input.timeout {
        Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
            Ok(status) => status?,
            Err(_elapsed) => {
                return Err(ScriptError::Timeout {
                    elapsed_ms: start.elapsed().as_millis() as u64,
                });
            }
        },
        None => child.wait().await?,
    };

    let duration_ms = start.elapsed().as_millis() as u64;
    let stdout = stdout_task.await.unwrap_or_default();
    let stderr = stderr_task.await.unwrap_or_default();

    for (stream, captured) in [("stdout", &stdout), ("stderr", &stderr)] {
        if captured.overflowed {
            return Err(ScriptError::OutputTooLarge {
                stream,
                limit: MAX_OUTPUT_BYTES,
            });
        }
    }

    Ok(ScriptOutput {
        stdout: String::from_utf8_lossy(&stdout.bytes).into_owned(),
        stderr: String::from_utf8_lossy(&stderr.bytes).into_owned(),
        exit_code: status.code().unwrap_or(-1),
        duration_ms,
    })
}

/// One captured stream.
#[derive(Debug, Default)]
struct Captured {
    bytes: Vec<u8>,
    /// The stream produced more than [`MAX_OUTPUT_BYTES`].
    overflowed: bool,
}

/// Read an entire output stream, keeping the first [`MAX_OUTPUT_BYTES`].
///
/// Bytes past the cap are drained and discarded so the child never blocks
/// on, or is killed by, a pipe nobody reads.
async fn read_stream<R: AsyncRead + Unpin>(handle: Option<R>) -> Captured {
    let mut captured = Captured::default();
    if let Some(mut h) = handle {
        let _ = (&mut h)
            .take(MAX_OUTPUT_BYTES as u64)
            .read_to_end(&mut captured.bytes)
            .await;
        if let Ok(extra) = tokio::io::copy(&mut h, &mut tokio::io::sink()).await {
            captured.overflowed = extra > 0;
        }
    }
    captured
}
