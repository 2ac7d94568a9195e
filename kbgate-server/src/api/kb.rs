//! Knowledge Base API Handlers
//!
//! Indexing streams the indexer's output back as plain text while it runs,
//! one line per output line, and finishes with the job's envelope as a
//! final JSON line.

use axum::{
    Json,
    body::{Body, Bytes},
    extract::{State, rejection::JsonRejection},
    http::header,
    response::{IntoResponse, Response},
};
use kbgate_core::domain::job::{JobEvent, JobSpec};
use kbgate_core::dto::envelope::Envelope;
use kbgate_core::dto::gateway::IndexingRequest;
use std::convert::Infallible;
use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::Stream;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{error, info};

use super::AppState;
use super::error::ApiResult;

/// Builds the indexing command for the knowledge base at `kb_path`
pub fn indexing_spec(python: &str, work_dir: &Path, kb_path: &Path) -> JobSpec {
    JobSpec::new(python, work_dir)
        .args(["-m", "graphrag.index", "--root"])
        .arg(kb_path.to_string_lossy())
}

/// POST /api/kb/indexing
pub async fn index_kb(
    State(state): State<AppState>,
    payload: Result<Json<IndexingRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(req) = payload?;
    let kb_path = state.settings.kb_path(&req.name)?;

    let spec = indexing_spec(&state.settings.python, &state.settings.work_dir, &kb_path);
    let cancel = CancellationToken::new();
    let events = state.runner.start(spec, cancel.clone())?;

    info!(kb = %req.name, "indexing started");

    let body = Body::from_stream(JobOutput {
        events,
        _cancel_on_drop: cancel.drop_guard(),
    });

    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response())
}

/// Response body of a running job
///
/// Dropping it (the client went away) cancels the job.
struct JobOutput {
    events: mpsc::Receiver<JobEvent>,
    _cancel_on_drop: DropGuard,
}

impl Stream for JobOutput {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut()
            .events
            .poll_recv(cx)
            .map(|event| event.map(|event| Ok(render(event))))
    }
}

fn render(event: JobEvent) -> Bytes {
    match event {
        JobEvent::Line(line) => Bytes::from(format!("{}\n", line)),
        JobEvent::Completed(result) => {
            let envelope = Envelope::from(&result);
            let json = serde_json::to_string(&envelope).unwrap_or_else(|e| {
                error!("Failed to serialize job result: {}", e);
                r#"{"code":-1,"msg":"internal error"}"#.to_string()
            });
            Bytes::from(format!("{}\n", json))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kbgate_core::domain::job::JobResult;

    #[test]
    fn test_indexing_spec() {
        let spec = indexing_spec("/opt/py", Path::new("/srv"), Path::new("/srv/kb/news"));

        assert_eq!(spec.program, "/opt/py");
        assert_eq!(spec.working_dir, Path::new("/srv"));
        assert_eq!(spec.args, vec!["-m", "graphrag.index", "--root", "/srv/kb/news"]);
    }

    #[test]
    fn test_render_events() {
        assert_eq!(
            render(JobEvent::Line("Loading input".to_string())),
            Bytes::from("Loading input\n")
        );
        assert_eq!(
            render(JobEvent::Completed(JobResult::succeeded())),
            Bytes::from("{\"code\":0,\"msg\":\"success\"}\n")
        );
        assert_eq!(
            render(JobEvent::Completed(JobResult::failed("exit status: 1"))),
            Bytes::from("{\"code\":-1,\"msg\":\"exit status: 1\"}\n")
        );
    }
}
