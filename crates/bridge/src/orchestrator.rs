//! Drives one invocation: prepares the engine request, consumes the engine's
//! messages and re-emits them as wire events inside a well-terminated stream.

use futures::stream::{BoxStream, StreamExt};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

use crate::converter::ContentBlockConverter;
use crate::engine::base::{AgentEngine, EngineRequest};
use crate::engine::claude_cli::DEFAULT_PERMISSION_MODE;
use crate::iteration::{IterationGuard, DEFAULT_MAX_ITERATIONS};
use crate::mcp::{McpResolver, AWS_KNOWLEDGE, BRAVE_SEARCH, TAVILY_REMOTE, TIME};
use crate::mode_prompt::ModePrompts;
use crate::models::event::WireEvent;
use crate::models::request::{InvocationRequest, SessionInfo};
use crate::prompt::{compose_prompt, normalize_history, normalize_prompt};

pub const DEFAULT_MAX_TURNS: u32 = 200;
pub const DEFAULT_MODE: &str = "technical-research";

const AWS_DOCUMENTATION: &str = "awslabs.aws-documentation-mcp-server";

const BRAVE_TOOLS: &[&str] = &[
    "brave_web_search",
    "brave_local_search",
    "brave_video_search",
    "brave_image_search",
    "brave_news_search",
    "brave_summarizer",
];
const AWS_KNOWLEDGE_TOOLS: &[&str] = &[
    "aws___search_documentation",
    "aws___read_documentation",
    "aws___recommend",
    "aws___get_regional_availability",
    "aws___list_regions",
];
const AWS_DOCUMENTATION_TOOLS: &[&str] = &["search_documentation", "get_documentation"];
const TIME_TOOLS: &[&str] = &[
    "get_current_time",
    "get_datetime",
    "convert_time",
    "get_current_unix_timestamp",
];
const TAVILY_TOOLS: &[&str] = &["tavily_search", "tavily_extract", "tavily_crawl"];
const BUILTIN_TOOLS: &[&str] = &["Task", "TodoWrite", "WebFetch"];

/// Tools the engine may invoke without asking, as `mcp__<server>__<tool>` plus built-ins
pub fn default_allowed_tools() -> Vec<String> {
    let servers: [(&str, &[&str]); 5] = [
        (BRAVE_SEARCH, BRAVE_TOOLS),
        (AWS_KNOWLEDGE, AWS_KNOWLEDGE_TOOLS),
        (AWS_DOCUMENTATION, AWS_DOCUMENTATION_TOOLS),
        (TIME, TIME_TOOLS),
        (TAVILY_REMOTE, TAVILY_TOOLS),
    ];

    servers
        .iter()
        .flat_map(|(server, tools)| {
            tools
                .iter()
                .map(move |tool| format!("mcp__{}__{}", server, tool))
        })
        .chain(BUILTIN_TOOLS.iter().map(|tool| tool.to_string()))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorSettings {
    pub max_iterations: usize,
    pub max_turns: u32,
    pub default_mode: String,
    pub permission_mode: String,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_turns: DEFAULT_MAX_TURNS,
            default_mode: DEFAULT_MODE.to_string(),
            permission_mode: DEFAULT_PERMISSION_MODE.to_string(),
        }
    }
}

/// Shared across requests; each call to [`Orchestrator::stream`] builds its own
/// converter and iteration guard.
#[derive(Clone)]
pub struct Orchestrator {
    engine: Arc<dyn AgentEngine>,
    mcp: McpResolver,
    prompts: ModePrompts,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    pub fn new(
        engine: Arc<dyn AgentEngine>,
        mcp: McpResolver,
        prompts: ModePrompts,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            engine,
            mcp,
            prompts,
            settings,
        }
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    fn prepare(
        &self,
        request: &InvocationRequest,
        session: &SessionInfo,
        cwd: Option<PathBuf>,
    ) -> EngineRequest {
        let history = normalize_history(&request.messages);
        let prompt = normalize_prompt(&request.prompt);
        let mcp_servers = self.mcp.resolve(request.mcp_servers.as_deref(), session);
        let mode = request
            .mode
            .as_deref()
            .filter(|mode| !mode.is_empty())
            .unwrap_or(&self.settings.default_mode);
        let system_prompt = self.prompts.load(mode);

        tracing::info!(
            mode,
            prompt_chars = prompt.len(),
            history_chars = history.len(),
            mcp_servers = mcp_servers.len(),
            "Prepared invocation"
        );

        EngineRequest {
            prompt: compose_prompt(&history, &prompt),
            system_prompt,
            model: request.model(),
            max_turns: self.settings.max_turns,
            mcp_servers,
            allowed_tools: default_allowed_tools(),
            permission_mode: self.settings.permission_mode.clone(),
            cwd,
        }
    }

    /// Run one invocation as a stream of wire events.
    ///
    /// The stream always starts with `messageStart`. It ends either with
    /// `contentBlockStop`, `messageStop` and `metadata`, or with a single
    /// `internalServerException`. Dropping it abandons the engine invocation.
    pub fn stream(
        &self,
        request: InvocationRequest,
        session: SessionInfo,
        cwd: Option<PathBuf>,
    ) -> BoxStream<'static, WireEvent> {
        let session = session.with_payload_session(request.session_id.as_deref());
        let span = tracing::info_span!(
            "invocation",
            session_id = session.session_id.as_deref().unwrap_or("-"),
            trace_id = session.trace_id.as_deref().unwrap_or("-"),
            invocation_id = %Uuid::new_v4(),
        );
        let engine_request = span.in_scope(|| self.prepare(&request, &session, cwd));
        let engine = Arc::clone(&self.engine);
        let max_iterations = self.settings.max_iterations;

        Box::pin(async_stream::stream! {
            yield WireEvent::message_start();

            let mut messages = match engine.query(engine_request).instrument(span.clone()).await {
                Ok(messages) => messages,
                Err(e) => {
                    span.in_scope(|| tracing::error!(error = %e, "Failed to start agent engine"));
                    yield WireEvent::internal_server_exception(e.to_string());
                    return;
                }
            };

            let mut converter = ContentBlockConverter::new();
            let mut guard = IterationGuard::new(max_iterations);

            while let Some(next) = messages.next().instrument(span.clone()).await {
                let message = match next.and_then(|message| guard.observe(&message).map(|_| message)) {
                    Ok(message) => message,
                    Err(e) => {
                        span.in_scope(|| tracing::error!(error = %e, "Invocation aborted"));
                        yield WireEvent::internal_server_exception(e.to_string());
                        return;
                    }
                };

                for event in span.in_scope(|| converter.convert(&message)) {
                    yield event;
                }
            }

            span.in_scope(|| {
                tracing::info!(
                    blocks = converter.current_index(),
                    iterations = guard.count(),
                    "Invocation completed"
                )
            });
            yield WireEvent::ContentBlockStop { index: converter.current_index() };
            yield WireEvent::message_stop();
            yield WireEvent::metadata();
        })
    }
}
