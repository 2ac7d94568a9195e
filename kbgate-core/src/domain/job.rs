//! Job domain types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One invocation of an external command
///
/// Created when a request is accepted, dropped when the runner returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

impl JobSpec {
    pub fn new(program: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Human-readable command line, for logs only
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Job lifecycle status
///
/// `Idle` and `Running` describe whether a job currently holds the runner;
/// a [`JobResult`] only ever carries `Succeeded` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Idle,
    Running,
    Succeeded,
    Failed,
}

/// Terminal outcome of a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    pub status: JobStatus,
    pub exit_code: Option<i32>,
    pub message: String,
}

impl JobResult {
    pub fn succeeded() -> Self {
        Self {
            status: JobStatus::Succeeded,
            exit_code: Some(0),
            message: "success".to_string(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Failed,
            exit_code: None,
            message: message.into(),
        }
    }

    pub fn with_exit_code(mut self, code: Option<i32>) -> Self {
        self.exit_code = code;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Succeeded
    }
}

/// Everything a running job reports to its caller, in order
///
/// A job emits any number of `Line`s followed by exactly one `Completed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobEvent {
    Line(String),
    Completed(JobResult),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_builder() {
        let spec = JobSpec::new("python", "/srv")
            .args(["-m", "graphrag.index"])
            .arg("--root");

        assert_eq!(spec.args, vec!["-m", "graphrag.index", "--root"]);
        assert_eq!(spec.working_dir, PathBuf::from("/srv"));
        assert_eq!(spec.display(), "python -m graphrag.index --root");
    }

    #[test]
    fn test_result_constructors() {
        assert!(JobResult::succeeded().is_success());

        let failed = JobResult::failed("exit status: 2").with_exit_code(Some(2));
        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(failed.exit_code, Some(2));
        assert!(!failed.is_success());
    }
}
