//! Gateway configuration
//!
//! Every setting is a command-line flag with an environment fallback. After
//! parsing, [`Config::resolve`] validates the values and turns them into the
//! [`Settings`] the rest of the service runs with.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::service::supervisor::{ExhaustionPolicy, SupervisorConfig};

/// kbgate configuration
#[derive(Debug, Clone, Parser)]
#[command(name = "kbgate")]
#[command(about = "Gateway in front of the GraphRAG indexer and its worker", long_about = None)]
pub struct Config {
    /// Address the HTTP API listens on
    #[arg(long, env = "KBGATE_BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind_addr: String,

    /// Project directory; defaults to the current directory
    #[arg(long, env = "KBGATE_WORK_DIR")]
    pub work_dir: Option<PathBuf>,

    /// Knowledge-base root, relative to the work directory
    #[arg(long, env = "KBGATE_KB_DIR", default_value = "kb")]
    pub kb_dir: PathBuf,

    /// Python interpreter; looked up through conda when not given
    #[arg(long, env = "KBGATE_PYTHON")]
    pub python: Option<String>,

    /// Conda environment used to find the interpreter
    #[arg(long, env = "KBGATE_CONDA_ENV", default_value = "graphrag-go")]
    pub conda_env: String,

    #[arg(long, env = "KBGATE_WORKER_HOST", default_value = "127.0.0.1")]
    pub worker_host: String,

    #[arg(long, env = "KBGATE_WORKER_PORT", default_value_t = 8081)]
    pub worker_port: u16,

    /// Worker entry point, relative to the work directory
    #[arg(long, env = "KBGATE_WORKER_SCRIPT", default_value = "py/py_server.py")]
    pub worker_script: PathBuf,

    #[arg(long, env = "KBGATE_WORKER_HEALTH_PATH", default_value = "/docs")]
    pub worker_health_path: String,

    /// Seconds to wait after spawning the worker before the first probe
    #[arg(long, env = "KBGATE_WORKER_WARMUP", default_value_t = 5)]
    pub worker_warmup_secs: u64,

    #[arg(long, env = "KBGATE_PROBE_ATTEMPTS", default_value_t = 10)]
    pub probe_attempts: u32,

    /// Seconds between two health probes
    #[arg(long, env = "KBGATE_PROBE_INTERVAL", default_value_t = 5)]
    pub probe_interval_secs: u64,

    /// What to do when the worker never becomes healthy
    #[arg(long, env = "KBGATE_ON_PROBE_EXHAUSTED", value_enum, default_value_t = ExhaustionPolicy::Log)]
    pub on_probe_exhausted: ExhaustionPolicy,

    /// Seconds a proxied worker call may take
    #[arg(long, env = "KBGATE_PROXY_TIMEOUT", default_value_t = 5)]
    pub proxy_timeout_secs: u64,

    /// Output lines buffered between a running job and a slow reader
    #[arg(long, env = "KBGATE_JOB_BUFFER", default_value_t = 64)]
    pub job_buffer: usize,
}

impl Config {
    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.bind_addr.is_empty() {
            anyhow::bail!("bind_addr cannot be empty");
        }

        if self.worker_host.is_empty() {
            anyhow::bail!("worker_host cannot be empty");
        }

        if self.worker_port == 0 {
            anyhow::bail!("worker_port must be greater than 0");
        }

        if !self.worker_health_path.starts_with('/') {
            anyhow::bail!("worker_health_path must start with '/'");
        }

        if self.probe_attempts == 0 {
            anyhow::bail!("probe_attempts must be greater than 0");
        }

        if self.proxy_timeout_secs == 0 {
            anyhow::bail!("proxy_timeout_secs must be greater than 0");
        }

        if self.job_buffer == 0 {
            anyhow::bail!("job_buffer must be greater than 0");
        }

        Ok(())
    }

    /// Validates and resolves the work directory and interpreter
    pub fn resolve(self) -> Result<Settings> {
        self.validate()?;

        let work_dir = match &self.work_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().context("Failed to get work directory")?,
        };

        let python = match &self.python {
            Some(python) => python.clone(),
            None => conda_python(&self.conda_env)?,
        };

        Ok(Settings::new(self, work_dir, python))
    }

    pub fn worker_url(&self) -> String {
        format!("http://{}:{}", self.worker_host, self.worker_port)
    }
}

/// Asks conda where the environment's interpreter lives
fn conda_python(env: &str) -> Result<String> {
    let output = std::process::Command::new("conda")
        .args(["run", "-n", env, "which", "python"])
        .output()
        .context("Failed to execute 'conda run'. Is conda installed?")?;

    if !output.status.success() {
        anyhow::bail!(
            "conda could not locate python in environment '{}': {}",
            env,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    let python = String::from_utf8_lossy(&output.stdout).trim_end().to_string();
    if python.is_empty() {
        anyhow::bail!("conda returned an empty python path for '{}'", env);
    }

    info!(env, python = %python, "resolved python interpreter");
    Ok(python)
}

/// True for a single ordinary path component: no separators, no `..`
pub fn is_plain_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Why a knowledge-base name could not be turned into a directory
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KbPathError {
    #[error("invalid knowledge base name '{0}'")]
    InvalidName(String),

    #[error("knowledge base '{0}' does not exist")]
    NotFound(String),
}

/// Resolved runtime settings shared by all handlers
#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_addr: String,
    pub work_dir: PathBuf,
    pub kb_root: PathBuf,
    pub python: String,
    pub worker_url: String,
    pub proxy_timeout: Duration,
    pub job_buffer: usize,
    pub supervisor: SupervisorConfig,
}

impl Settings {
    fn new(config: Config, work_dir: PathBuf, python: String) -> Self {
        let worker_url = config.worker_url();
        let supervisor = SupervisorConfig {
            program: python.clone(),
            args: vec![
                work_dir.join(&config.worker_script).to_string_lossy().into_owned(),
                "--host".to_string(),
                config.worker_host.clone(),
                "--port".to_string(),
                config.worker_port.to_string(),
            ],
            working_dir: work_dir.clone(),
            health_path: config.worker_health_path.clone(),
            warmup: Duration::from_secs(config.worker_warmup_secs),
            attempts: config.probe_attempts,
            interval: Duration::from_secs(config.probe_interval_secs),
            on_exhausted: config.on_probe_exhausted,
        };

        Self {
            bind_addr: config.bind_addr,
            kb_root: work_dir.join(&config.kb_dir),
            work_dir,
            python,
            worker_url,
            proxy_timeout: Duration::from_secs(config.proxy_timeout_secs),
            job_buffer: config.job_buffer,
            supervisor,
        }
    }

    /// Directory of an existing knowledge base
    ///
    /// The name must be a single plain path component.
    pub fn kb_path(&self, name: &str) -> std::result::Result<PathBuf, KbPathError> {
        if !is_plain_name(name) {
            return Err(KbPathError::InvalidName(name.to_string()));
        }

        let path = self.kb_root.join(name);
        if !path.is_dir() {
            return Err(KbPathError::NotFound(name.to_string()));
        }

        Ok(path)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Settings rooted at `work_dir` with an explicit interpreter
    pub(crate) fn settings_in(work_dir: &Path, python: &str) -> Settings {
        let config = Config::parse_from(["kbgate", "--python", python]);
        Settings::new(config, work_dir.to_path_buf(), python.to_string())
    }

    #[test]
    fn test_default_config() {
        let config = Config::parse_from(["kbgate"]);

        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.worker_url(), "http://127.0.0.1:8081");
        assert_eq!(config.worker_health_path, "/docs");
        assert_eq!(config.probe_attempts, 10);
        assert_eq!(config.probe_interval_secs, 5);
        assert_eq!(config.proxy_timeout_secs, 5);
        assert_eq!(config.on_probe_exhausted, ExhaustionPolicy::Log);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::parse_from(["kbgate"]);

        config.probe_attempts = 0;
        assert!(config.validate().is_err());
        config.probe_attempts = 3;

        config.worker_health_path = "docs".to_string();
        assert!(config.validate().is_err());
        config.worker_health_path = "/docs".to_string();

        config.proxy_timeout_secs = 0;
        assert!(config.validate().is_err());
        config.proxy_timeout_secs = 1;

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_fail_fast_flag() {
        let config = Config::parse_from(["kbgate", "--on-probe-exhausted", "fail-fast"]);
        assert_eq!(config.on_probe_exhausted, ExhaustionPolicy::FailFast);
    }

    #[test]
    fn test_worker_command_line() {
        let settings = settings_in(Path::new("/srv/kbgate"), "/opt/conda/bin/python");

        assert_eq!(settings.kb_root, PathBuf::from("/srv/kbgate/kb"));
        assert_eq!(settings.supervisor.program, "/opt/conda/bin/python");
        assert_eq!(
            settings.supervisor.args,
            vec![
                "/srv/kbgate/py/py_server.py",
                "--host",
                "127.0.0.1",
                "--port",
                "8081"
            ]
        );
    }

    #[test]
    fn test_kb_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("kb/news")).unwrap();
        let settings = settings_in(dir.path(), "python");

        assert_eq!(
            settings.kb_path("news").unwrap(),
            dir.path().join("kb/news")
        );
        assert_eq!(
            settings.kb_path("missing"),
            Err(KbPathError::NotFound("missing".to_string()))
        );
        for bad in ["", "..", "../etc", "a/b", "/abs"] {
            assert_eq!(
                settings.kb_path(bad),
                Err(KbPathError::InvalidName(bad.to_string())),
                "name {bad:?}"
            );
        }
    }
}
