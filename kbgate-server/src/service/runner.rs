//! Job runner
//!
//! Runs one external command behind the execution gate and streams its
//! output to the caller while it runs:
//! - Acquiring the gate (or failing fast with [`JobError::Contention`])
//! - Spawning the process before returning, so a missing program is an
//!   error of [`JobRunner::start`] rather than of the stream
//! - Forwarding each stdout line the moment it is read
//! - Flushing a trailing partial line when the stream closes
//! - Mapping the exit status onto a [`JobResult`]
//! - Killing the child when the request is cancelled
//!
//! The gate permit is owned by the job task and dropped before the terminal
//! [`JobEvent::Completed`] is sent, so once a caller has seen the outcome the
//! gate is already free again.

use kbgate_core::domain::job::{JobEvent, JobResult, JobSpec, JobStatus};
use std::collections::VecDeque;
use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::gate::{ExecutionGate, GatePermit};

/// Lines of stderr kept for the failure message
const STDERR_TAIL_LINES: usize = 20;

/// Longest chunk forwarded as one line; longer runs are split
const MAX_LINE_BYTES: usize = 64 * 1024;

/// How long to wait for the stderr drain after the child has exited
const STDERR_DRAIN_GRACE: Duration = Duration::from_secs(1);

/// Why a job did not succeed
#[derive(Debug, Error)]
pub enum JobError {
    #[error("already in indexing process")]
    Contention,

    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{}", exit_message(.status, .stderr))]
    Exit { status: ExitStatus, stderr: String },

    #[error("failed to read job output: {0}")]
    Stream(#[source] io::Error),

    #[error("job cancelled")]
    Cancelled,
}

fn exit_message(status: &ExitStatus, stderr: &str) -> String {
    if stderr.is_empty() {
        status.to_string()
    } else {
        format!("{}: {}", status, stderr)
    }
}

impl JobError {
    /// Terminal result reported to the caller for this failure
    pub fn to_result(&self) -> JobResult {
        let exit_code = match self {
            JobError::Exit { status, .. } => status.code(),
            _ => None,
        };
        JobResult::failed(self.to_string()).with_exit_code(exit_code)
    }
}

/// Starts gated jobs
#[derive(Debug, Clone)]
pub struct JobRunner {
    gate: ExecutionGate,
    buffer: usize,
}

impl JobRunner {
    /// Creates a runner over `gate`, buffering up to `buffer` undelivered events
    pub fn new(gate: ExecutionGate, buffer: usize) -> Self {
        Self {
            gate,
            buffer: buffer.max(1),
        }
    }

    pub fn gate(&self) -> &ExecutionGate {
        &self.gate
    }

    /// `Running` while a job holds the gate, `Idle` otherwise
    pub fn status(&self) -> JobStatus {
        if self.gate.is_held() {
            JobStatus::Running
        } else {
            JobStatus::Idle
        }
    }

    /// Starts `spec` if no other job is running
    ///
    /// Returns the job's event stream: zero or more [`JobEvent::Line`]s in
    /// output order, then exactly one [`JobEvent::Completed`]. Dropping the
    /// receiver or firing `cancel` kills the child.
    ///
    /// Fails with [`JobError::Spawn`] if the program cannot be started; the
    /// gate is free again by then.
    pub fn start(
        &self,
        spec: JobSpec,
        cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<JobEvent>, JobError> {
        let permit = self.gate.try_acquire().ok_or_else(|| {
            debug!(cmd = %spec.display(), status = ?self.status(), "gate held, rejecting job");
            JobError::Contention
        })?;

        info!(
            cmd = %spec.display(),
            cwd = %spec.working_dir.display(),
            "starting job"
        );

        let child = spawn_child(&spec).inspect_err(|err| {
            error!(cmd = %spec.display(), error = %err, "job failed to start");
        })?;

        let (events, rx) = mpsc::channel(self.buffer);
        tokio::spawn(run_job(spec, child, permit, events, cancel));

        Ok(rx)
    }
}

fn spawn_child(spec: &JobSpec) -> Result<Child, JobError> {
    Command::new(&spec.program)
        .args(&spec.args)
        .current_dir(&spec.working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| JobError::Spawn {
            program: spec.program.clone(),
            source,
        })
}

async fn run_job(
    spec: JobSpec,
    child: Child,
    permit: GatePermit,
    events: mpsc::Sender<JobEvent>,
    cancel: CancellationToken,
) {
    let result = match drive(&spec, child, &events, &cancel).await {
        Ok(()) => {
            info!(cmd = %spec.display(), "job succeeded");
            JobResult::succeeded()
        }
        Err(JobError::Cancelled) => {
            warn!(cmd = %spec.display(), "job cancelled");
            JobError::Cancelled.to_result()
        }
        Err(err) => {
            error!(cmd = %spec.display(), error = %err, "job failed");
            err.to_result()
        }
    };

    drop(permit);

    // The caller may already be gone; nobody is left to tell.
    let _ = events.send(JobEvent::Completed(result)).await;
}

async fn drive(
    spec: &JobSpec,
    mut child: Child,
    events: &mpsc::Sender<JobEvent>,
    cancel: &CancellationToken,
) -> Result<(), JobError> {
    let stderr_tail = child.stderr.take().map(drain_stderr);
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| JobError::Stream(io::Error::other("stdout was not captured")))?;

    if let Err(err) = forward_lines(stdout, events, cancel).await {
        kill(&mut child).await;
        return Err(err);
    }

    let status = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            kill(&mut child).await;
            return Err(JobError::Cancelled);
        }
        status = child.wait() => status.map_err(JobError::Stream)?,
    };

    debug!(cmd = %spec.display(), %status, "job process exited");

    if status.success() {
        return Ok(());
    }

    let stderr = match stderr_tail {
        Some(handle) => tokio::time::timeout(STDERR_DRAIN_GRACE, handle)
            .await
            .ok()
            .and_then(Result::ok)
            .unwrap_or_default(),
        None => String::new(),
    };

    Err(JobError::Exit { status, stderr })
}

/// Reads `stdout` to the end, sending each line as soon as it is complete
///
/// A last line without a terminating newline is still delivered. A line
/// longer than [`MAX_LINE_BYTES`] is forwarded in pieces.
async fn forward_lines<R>(
    stdout: R,
    events: &mpsc::Sender<JobEvent>,
    cancel: &CancellationToken,
) -> Result<(), JobError>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stdout);
    let mut buf = Vec::new();

    loop {
        buf.clear();

        let mut limited = (&mut reader).take(MAX_LINE_BYTES as u64);
        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(JobError::Cancelled),
            read = limited.read_until(b'\n', &mut buf) => read.map_err(JobError::Stream)?,
        };

        if read == 0 {
            return Ok(());
        }

        let line = decode_line(&buf);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(JobError::Cancelled),
            sent = events.send(JobEvent::Line(line)) => {
                if sent.is_err() {
                    debug!("job output receiver dropped");
                    return Err(JobError::Cancelled);
                }
            }
        }
    }
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

/// Logs stderr at debug and keeps its last lines for the failure message
fn drain_stderr<R>(stderr: R) -> JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);

        while let Ok(Some(line)) = lines.next_line().await {
            debug!("stderr: {}", line);
            if tail.len() == STDERR_TAIL_LINES {
                tail.pop_front();
            }
            tail.push_back(line);
        }

        Vec::from(tail).join("\n").trim().to_string()
    })
}

async fn kill(child: &mut Child) {
    if let Err(e) = child.kill().await {
        warn!(error = %e, "failed to kill job process");
    }
}
