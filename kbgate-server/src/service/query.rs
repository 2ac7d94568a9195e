//! Query runner
//!
//! Answers a question against an indexed knowledge base by running the
//! GraphRAG query command to completion. Queries are light compared to
//! indexing and do not take the execution gate.

use kbgate_core::domain::job::JobSpec;
use kbgate_core::dto::gateway::QueryRequest;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

use crate::service::runner::JobError;

/// Marker the query command prints before its answer
const RESPONSE_MARKER: &str = "Search Response:";

/// Builds the query command for the knowledge base at `kb_path`
pub fn query_spec(python: &str, work_dir: &Path, kb_path: &Path, req: &QueryRequest) -> JobSpec {
    let config = kb_path.join("settings.yaml");
    let data = kb_path.join("output").join(&req.db).join("artifacts");

    JobSpec::new(python, work_dir)
        .args(["-m", "graphrag.query", "--config"])
        .arg(config.to_string_lossy())
        .arg("--data")
        .arg(data.to_string_lossy())
        .args(["--method".to_string(), req.method.to_string()])
        .args(["--response_type", "Single Paragraph"])
        .arg(req.text.as_str())
}

/// Runs `spec` to completion and returns the answer text
///
/// The answer is read from stdout only; stderr is logged and, on failure,
/// becomes the error message. Dropping the returned future kills the child.
pub async fn run_query(spec: &JobSpec) -> Result<String, JobError> {
    info!(cmd = %spec.display(), "running query");

    let child = Command::new(&spec.program)
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
        })?;

    let output = child.wait_with_output().await.map_err(JobError::Stream)?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    debug!(status = %output.status, stdout_len = stdout.len(), "query process exited");
    for line in stderr.lines() {
        debug!("stderr: {}", line);
    }

    if !output.status.success() {
        return Err(JobError::Exit {
            status: output.status,
            stderr: stderr.trim().to_string(),
        });
    }

    Ok(extract_answer(&stdout).to_string())
}

/// Text after the response marker, or everything when the marker is absent
fn extract_answer(output: &str) -> &str {
    match output.find(RESPONSE_MARKER) {
        Some(n) => output[n + RESPONSE_MARKER.len()..].trim_start_matches([' ', '\n', '\r']),
        None => output,
    }
}
