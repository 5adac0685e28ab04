//! Bounded execution of the external FFmpeg tools.
//!
//! `ffprobe` and `ffmpeg` are run as child processes with their output
//! captured. A child that outlives its budget is killed and reaped, so a
//! hung tool can never stall a worker indefinitely.

use std::ffi::OsStr;
use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::ClipError;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Captured result of a finished child process.
#[derive(Debug)]
pub(crate) struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// Turn a non-zero exit into [`ClipError::ExternalTool`].
    pub fn into_success(self, program: &str) -> Result<ToolOutput, ClipError> {
        if self.status.success() {
            Ok(self)
        } else {
            Err(ClipError::ExternalTool {
                program: program.to_string(),
                status: self.status.to_string(),
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

/// Run `program` with `args`, waiting at most `timeout` for it to exit.
///
/// Both output pipes are drained on helper threads while the child runs,
/// so a chatty tool cannot block on a full pipe.
///
/// # Errors
///
/// - [`ClipError::IoError`] if the program cannot be spawned.
/// - [`ClipError::Timeout`] if it is still running when the budget runs
///   out. The child is killed before returning.
pub(crate) fn run_with_timeout<I, S>(
    program: &str,
    args: I,
    timeout: Duration,
) -> Result<ToolOutput, ClipError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = match wait_with_deadline(&mut child, timeout)? {
        Some(status) => status,
        None => {
            log::warn!("{program} exceeded {timeout:?}, killing pid {}", child.id());
            // The child may have exited between the last poll and now.
            let _ = child.kill();
            let _ = child.wait();
            return Err(ClipError::Timeout {
                program: program.to_string(),
                timeout,
            });
        }
    };

    Ok(ToolOutput {
        status,
        stdout: collect(stdout),
        stderr: collect(stderr),
    })
}

fn wait_with_deadline(child: &mut Child, timeout: Duration) -> Result<Option<ExitStatus>, ClipError> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut bytes = Vec::new();
            let _ = pipe.read_to_end(&mut bytes);
            String::from_utf8_lossy(&bytes).into_owned()
        })
    })
}

fn collect(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}
