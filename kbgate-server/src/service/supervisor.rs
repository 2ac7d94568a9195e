//! Worker supervisor
//!
//! Launches the long-lived worker process once at startup and checks that it
//! came up:
//! - Spawning the worker with its host/port arguments
//! - Waiting a warm-up delay, then probing its health endpoint a bounded
//!   number of times
//! - Publishing the worker's status for readers
//! - Parking until the worker exits on its own or the supervisor is stopped
//!
//! The supervisor never restarts or kills the worker, and by default never
//! fails the host either. With [`ExhaustionPolicy::FailFast`] an unhealthy
//! worker trips [`Supervisor::fatal`] so the host can shut down gracefully.

use async_trait::async_trait;
use kbgate_client::{ClientError, WorkerClient};
use kbgate_core::domain::worker::{WorkerHealth, WorkerStatus};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// What to do when the worker never passes a health probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExhaustionPolicy {
    /// Log it and keep serving
    Log,
    /// Ask the host to shut down
    FailFast,
}

/// How to launch and check the worker
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    pub health_path: String,
    pub warmup: Duration,
    pub attempts: u32,
    pub interval: Duration,
    pub on_exhausted: ExhaustionPolicy,
}

/// A single health check against the worker
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// `Ok` iff the worker answered with a success status
    async fn probe(&self) -> Result<(), ClientError>;
}

/// Probes the worker over HTTP through the worker client
pub struct HttpHealthProbe {
    client: WorkerClient,
    path: String,
}

impl HttpHealthProbe {
    pub fn new(client: WorkerClient, path: impl Into<String>) -> Self {
        Self {
            client,
            path: path.into(),
        }
    }
}

#[async_trait]
impl HealthProbe for HttpHealthProbe {
    async fn probe(&self) -> Result<(), ClientError> {
        self.client.health(&self.path).await
    }
}

/// Result of the bounded probe loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Healthy { attempts: u32 },
    Exhausted { attempts: u32 },
}

/// Handle to the running supervisor task
pub struct Supervisor {
    status: watch::Receiver<WorkerStatus>,
    fatal: CancellationToken,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl Supervisor {
    /// Spawns the supervisor task; returns immediately
    pub fn start<P>(config: SupervisorConfig, probe: P) -> Self
    where
        P: HealthProbe + 'static,
    {
        let (status_tx, status) = watch::channel(WorkerStatus::starting());
        let fatal = CancellationToken::new();
        let shutdown = CancellationToken::new();

        let task = tokio::spawn(supervise(
            config,
            probe,
            status_tx,
            fatal.clone(),
            shutdown.clone(),
        ));

        Self {
            status,
            fatal,
            shutdown,
            task,
        }
    }

    /// Latest known worker status
    pub fn status(&self) -> WorkerStatus {
        self.status.borrow().clone()
    }

    /// Resolves once the fail-fast policy has been tripped
    pub fn fatal(&self) -> impl Future<Output = ()> + Send + 'static {
        self.fatal.clone().cancelled_owned()
    }

    pub fn is_fatal(&self) -> bool {
        self.fatal.is_cancelled()
    }

    /// Stops probing or parking and waits for the task to finish
    ///
    /// The worker process itself is left running.
    pub async fn stop(self) {
        self.shutdown.cancel();
        if let Err(e) = self.task.await {
            warn!(error = %e, "supervisor task panicked");
        }
    }
}

async fn supervise<P: HealthProbe>(
    config: SupervisorConfig,
    probe: P,
    status: watch::Sender<WorkerStatus>,
    fatal: CancellationToken,
    shutdown: CancellationToken,
) {
    let mut child = match spawn_worker(&config) {
        Ok(child) => child,
        Err(e) => {
            error!(
                program = %config.program,
                error = %e,
                "failed to start worker"
            );
            status.send_modify(|s| s.health = WorkerHealth::Unreachable);
            if config.on_exhausted == ExhaustionPolicy::FailFast {
                fatal.cancel();
            }
            return;
        }
    };

    let pid = child.id();
    status.send_modify(|s| {
        s.pid = pid;
        s.started_at = Some(chrono::Utc::now());
    });
    info!(pid, "worker started");

    let outcome = tokio::select! {
        _ = shutdown.cancelled() => {
            info!("supervisor stopped during health probing");
            return;
        }
        outcome = probe_until_healthy(&config, &probe) => outcome,
    };

    match outcome {
        ProbeOutcome::Healthy { attempts } => {
            info!(attempts, "worker is ready");
            status.send_modify(|s| s.health = WorkerHealth::Healthy);
        }
        ProbeOutcome::Exhausted { attempts } => {
            error!(attempts, "worker never became healthy");
            status.send_modify(|s| s.health = WorkerHealth::Unreachable);
            if config.on_exhausted == ExhaustionPolicy::FailFast {
                fatal.cancel();
            }
        }
    }

    tokio::select! {
        _ = shutdown.cancelled() => {
            info!("supervisor stopped");
        }
        exit = child.wait() => {
            match exit {
                Ok(exit) => warn!(%exit, "worker exited"),
                Err(e) => warn!(error = %e, "failed to wait for worker"),
            }
            status.send_modify(|s| s.health = WorkerHealth::Unreachable);
        }
    }
}

fn spawn_worker(config: &SupervisorConfig) -> std::io::Result<Child> {
    Command::new(&config.program)
        .args(&config.args)
        .current_dir(&config.working_dir)
        .stdin(Stdio::null())
        .kill_on_drop(false)
        .spawn()
}

/// Warm up, then probe up to `attempts` times, stopping at the first success
pub async fn probe_until_healthy<P>(config: &SupervisorConfig, probe: &P) -> ProbeOutcome
where
    P: HealthProbe + ?Sized,
{
    tokio::time::sleep(config.warmup).await;

    for attempt in 1..=config.attempts {
        match probe.probe().await {
            Ok(()) => return ProbeOutcome::Healthy { attempts: attempt },
            Err(e) => {
                warn!(
                    attempt,
                    max_attempts = config.attempts,
                    error = %e,
                    "worker health check failed"
                );
            }
        }

        if attempt < config.attempts {
            tokio::time::sleep(config.interval).await;
        }
    }

    ProbeOutcome::Exhausted {
        attempts: config.attempts,
    }
}
