use crate::state::AppState;
use crate::workspace::Workspace;
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use bridge::models::event::WireEvent;
use bridge::models::request::{InvocationRequest, SessionInfo};
use bytes::Bytes;
use futures::{
    future,
    stream::{BoxStream, StreamExt},
    Stream,
};
use serde_json::json;
use std::{
    convert::Infallible,
    pin::Pin,
    task::{Context, Poll},
};

const SESSION_ID_HEADER: &str = "x-amzn-bedrock-agentcore-runtime-session-id";
const TRACE_ID_HEADER: &str = "x-amzn-trace-id";

/// Newline-delimited `{"event": ...}` body. Owns the invocation workspace, so the
/// directory is removed once the body is finished or dropped.
pub struct EventStreamResponse {
    lines: BoxStream<'static, Bytes>,
    _workspace: Workspace,
}

impl EventStreamResponse {
    fn new(events: BoxStream<'static, WireEvent>, workspace: Workspace) -> Self {
        let lines = events
            .filter_map(|event| {
                future::ready(match event.to_ndjson() {
                    Ok(line) => Some(Bytes::from(line)),
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to serialize event");
                        None
                    }
                })
            })
            .boxed();
        Self {
            lines,
            _workspace: workspace,
        }
    }
}

impl Stream for EventStreamResponse {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.lines.poll_next_unpin(cx).map(|opt| opt.map(Ok))
    }
}

impl IntoResponse for EventStreamResponse {
    fn into_response(self) -> Response {
        (
            [
                (header::CONTENT_TYPE, "text/event-stream"),
                (header::CACHE_CONTROL, "no-cache"),
            ],
            Body::from_stream(self),
        )
            .into_response()
    }
}

/// Synchronous `{"error": ..., "status": "error"}` reply
#[derive(Debug)]
pub struct ErrorResponse {
    status: StatusCode,
    message: String,
}

impl ErrorResponse {
    fn new<S: Into<String>>(status: StatusCode, message: S) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({
                "error": self.message,
                "status": "error",
            })),
        )
            .into_response()
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(String::from)
}

async fn handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<EventStreamResponse, ErrorResponse> {
    let request = InvocationRequest::from_slice(&body)
        .and_then(|request| request.validate().map(|_| request))
        .map_err(|e| {
            tracing::warn!(error = %e, "Rejected invocation");
            ErrorResponse::new(StatusCode::BAD_REQUEST, e.to_string())
        })?;

    let session = SessionInfo::new(
        header_value(&headers, SESSION_ID_HEADER),
        header_value(&headers, TRACE_ID_HEADER),
    );

    let workspace = Workspace::acquire(&state.workspace_root).map_err(|e| {
        tracing::error!(root = %state.workspace_root.display(), error = %e, "Failed to create workspace");
        ErrorResponse::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create workspace directory")
    })?;

    let events = state
        .orchestrator
        .stream(request, session, Some(workspace.path().to_path_buf()));

    Ok(EventStreamResponse::new(events, workspace))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/invocations", post(handler))
        .with_state(state)
}
