//! Agent runner with the bounded tool-calling loop.

use super::ingest::FileIngestor;
use super::resources::ResourceTracker;
use crate::backend::{
    ActiveTool, FileBackend, ModelBackend, ModelRequest, OpenAiBackend, OutputItem, Sampling,
    ToolChoice,
};
use crate::config::{Prompts, Settings};
use crate::conversation::{History, ToolInvocation};
use crate::error::{GaiaError, Result};
use crate::tools::{default_registry, ToolError, ToolRegistry};
use futures::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Returned whenever no genuine answer could be produced.
pub const NO_ANSWER: &str = "No answer found.";

/// Literal that introduces the answer in the model's final text.
pub const FINAL_ANSWER_MARKER: &str = "FINAL ANSWER:";

const PREVIEW_CHARS: usize = 120;

/// Explicit configuration for one agent.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub model: String,
    pub max_iterations: usize,
    pub sampling: Sampling,
    pub instructions: String,
    pub transcript_label: String,
}

impl AgentConfig {
    pub fn from_settings(settings: &Settings, prompts: &Prompts) -> Self {
        Self {
            model: settings.agent.model.clone(),
            max_iterations: settings.agent.max_iterations,
            sampling: Sampling::deterministic(settings.agent.top_p),
            instructions: prompts.instructions.clone(),
            transcript_label: prompts.transcript_label.clone(),
        }
    }
}

/// Question-answering agent.
///
/// Holds no per-invocation state, so one instance can serve concurrent runs.
#[derive(Clone)]
pub struct Agent {
    model: Arc<dyn ModelBackend>,
    files: Arc<dyn FileBackend>,
    tools: Arc<ToolRegistry>,
    config: AgentConfig,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The model produced a final answer.
    Answered,
    /// The iteration budget ran out.
    Exhausted,
    /// The run was abandoned after an error.
    Failed(String),
}

/// Record of one tool call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCallRecord {
    pub name: String,
    pub arguments: String,
    pub result: String,
}

/// Response from an agent run.
#[derive(Debug, Clone, Serialize)]
pub struct AgentResponse {
    /// The final answer, or [`NO_ANSWER`].
    pub answer: String,
    pub outcome: Outcome,
    /// Number of model requests made.
    pub iterations: usize,
    /// Tool calls made, in order.
    pub tool_calls: Vec<ToolCallRecord>,
}

/// Loop state that must survive an abandoned run.
#[derive(Debug, Default)]
struct Progress {
    iterations: usize,
    tool_calls: Vec<ToolCallRecord>,
}

impl Agent {
    pub fn new(
        model: Arc<dyn ModelBackend>,
        files: Arc<dyn FileBackend>,
        tools: Arc<ToolRegistry>,
        config: AgentConfig,
    ) -> Self {
        Self {
            model,
            files,
            tools,
            config,
        }
    }

    /// Build an agent on the OpenAI backend with the standard tool set.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let prompts = Prompts::load(settings.prompts.custom_dir.as_deref())?;
        let backend = Arc::new(OpenAiBackend::new(settings)?);
        let tools = default_registry(settings, &prompts, backend.clone())?;

        Ok(Self::new(
            backend.clone(),
            backend,
            Arc::new(tools),
            AgentConfig::from_settings(settings, &prompts),
        ))
    }

    /// Use a different model for the main loop.
    pub fn with_model(mut self, model: &str) -> Self {
        self.config.model = model.to_string();
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Answer a question. Always returns text: the answer or [`NO_ANSWER`].
    pub async fn run(&self, question: &str, attachment: Option<&Path>, max_iterations: usize) -> String {
        self.run_detailed(question, attachment, max_iterations)
            .await
            .answer
    }

    /// Answer a question and report how the run went.
    ///
    /// Transient remote resources created for the attachment are released
    /// exactly once before returning, whatever the outcome.
    pub async fn run_detailed(
        &self,
        question: &str,
        attachment: Option<&Path>,
        max_iterations: usize,
    ) -> AgentResponse {
        let mut tracker = ResourceTracker::new();
        let mut progress = Progress::default();

        let result = AssertUnwindSafe(self.converse(
            question,
            attachment,
            max_iterations,
            &mut tracker,
            &mut progress,
        ))
        .catch_unwind()
        .await;

        tracker.release(self.files.as_ref()).await;

        let (answer, outcome) = match result {
            Ok(Ok(Some(answer))) => (answer, Outcome::Answered),
            Ok(Ok(None)) => {
                warn!(
                    "No final answer after {} iterations",
                    progress.iterations
                );
                (NO_ANSWER.to_string(), Outcome::Exhausted)
            }
            Ok(Err(e)) => {
                error!("Agent run failed: {}", e);
                (NO_ANSWER.to_string(), Outcome::Failed(e.to_string()))
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!("Agent run panicked: {}", message);
                (NO_ANSWER.to_string(), Outcome::Failed(message))
            }
        };

        AgentResponse {
            answer,
            outcome,
            iterations: progress.iterations,
            tool_calls: progress.tool_calls,
        }
    }

    /// The reasoning loop. `Ok(None)` means the budget ran out.
    async fn converse(
        &self,
        question: &str,
        attachment: Option<&Path>,
        max_iterations: usize,
        tracker: &mut ResourceTracker,
        progress: &mut Progress,
    ) -> Result<Option<String>> {
        let question = question.trim();
        if question.is_empty() {
            return Err(GaiaError::InvalidInput("question is empty".to_string()));
        }

        let mut active_tools: Vec<ActiveTool> = self
            .tools
            .descriptors()
            .into_iter()
            .map(ActiveTool::Function)
            .collect();

        let attachment = match attachment {
            Some(path) => {
                let ingestion = FileIngestor::new(self.files.as_ref(), &self.config.transcript_label)
                    .ingest(path, tracker)
                    .await?;
                active_tools.extend(ingestion.supplemental_tool);
                Some(ingestion.attachment)
            }
            None => None,
        };

        let mut history = History::new(&self.config.instructions, question, attachment);

        while progress.iterations < max_iterations {
            progress.iterations += 1;
            info!("Agent iteration {}/{}", progress.iterations, max_iterations);

            let request = ModelRequest {
                model: &self.config.model,
                history: &history,
                tools: &active_tools,
                sampling: self.config.sampling,
                tool_choice: ToolChoice::Auto,
            };
            let response = self.model.respond(&request).await?;

            let (invocations, others) = response.partition();
            for item in others {
                match item {
                    OutputItem::Text(text) => debug!("Model text: {}", truncate(text, PREVIEW_CHARS)),
                    OutputItem::Other { kind } => debug!("Model output item: {}", kind),
                    OutputItem::ToolInvocation(_) => {}
                }
            }

            if invocations.is_empty() {
                let text = response.output_text();
                info!("Final response: {}", truncate(&text, PREVIEW_CHARS));
                return Ok(Some(extract_final_answer(&text)));
            }

            history.record_model_text(&response.output_text());

            let mut round = Vec::with_capacity(invocations.len());
            for invocation in invocations {
                let result = self.execute_tool_call(&invocation).await;
                progress.tool_calls.push(ToolCallRecord {
                    name: invocation.name.clone(),
                    arguments: invocation.arguments.clone(),
                    result: result.clone(),
                });
                round.push((invocation, result));
            }
            history.record_round(round);
            debug!(
                "History: {} turns, {} tool requests",
                history.len(),
                history.tool_request_count()
            );
        }

        Ok(None)
    }

    /// Execute one tool call. Every failure becomes text for the model.
    async fn execute_tool_call(&self, invocation: &ToolInvocation) -> String {
        info!("Agent calling tool: {}", truncate(&invocation.to_string(), PREVIEW_CHARS));

        let output = match parse_arguments(&invocation.arguments) {
            Ok(args) => self.tools.invoke(&invocation.name, args).await,
            Err(e) => Err(e),
        };

        match output {
            Ok(text) => {
                debug!("Tool {} returned: {}", invocation.name, truncate(&text, PREVIEW_CHARS));
                text
            }
            Err(e) => {
                warn!("Tool {} failed: {}", invocation.name, e);
                e.to_tool_text()
            }
        }
    }
}

fn parse_arguments(raw: &str) -> std::result::Result<serde_json::Value, ToolError> {
    if raw.trim().is_empty() {
        return Ok(serde_json::Value::Object(serde_json::Map::new()));
    }
    serde_json::from_str(raw)
        .map_err(|e| ToolError::InvalidArguments(format!("arguments are not valid JSON: {}", e)))
}

/// Text after the last [`FINAL_ANSWER_MARKER`], trimmed; the whole text if the marker is absent.
pub fn extract_final_answer(text: &str) -> String {
    match text.rfind(FINAL_ANSWER_MARKER) {
        Some(pos) => text[pos + FINAL_ANSWER_MARKER.len()..].trim().to_string(),
        None => text.to_string(),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut preview: String = text.chars().take(max_chars).collect();
    preview.push_str("...");
    preview
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("panic: {}", message)
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("panic: {}", message)
    } else {
        "panic".to_string()
    }
}
