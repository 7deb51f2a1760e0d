//! Web search through the model backend's hosted search tool.

use super::{parse_args, ParamKind, ParameterSpec, Tool, ToolDescriptor, ToolError, ToolOutput};
use crate::backend::{ActiveTool, ModelBackend, ModelRequest, Sampling, ToolChoice};
use crate::conversation::History;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

/// `web_search` tool: asks a search-enabled model and returns its grounded answer.
pub struct WebSearch {
    descriptor: ToolDescriptor,
    backend: Arc<dyn ModelBackend>,
    model: String,
    instructions: String,
}

#[derive(Debug, Deserialize)]
struct WebSearchArgs {
    question: String,
}

impl WebSearch {
    pub fn new(backend: Arc<dyn ModelBackend>, model: &str, instructions: &str) -> Self {
        Self {
            descriptor: ToolDescriptor::new(
                "web_search",
                "Search the web and return a concise answer grounded in the results. \
                Use this for recent events or facts not covered by Wikipedia.",
                vec![ParameterSpec::required(
                    "question",
                    ParamKind::String,
                    "The question to answer with a web search",
                )],
            ),
            backend,
            model: model.to_string(),
            instructions: instructions.to_string(),
        }
    }
}

#[async_trait]
impl Tool for WebSearch {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn invoke(&self, args: serde_json::Value) -> ToolOutput {
        let args: WebSearchArgs = parse_args(args)?;
        let history = History::new(&self.instructions, &args.question, None);
        let tools = [ActiveTool::WebSearch];

        let request = ModelRequest {
            model: &self.model,
            history: &history,
            tools: &tools,
            sampling: Sampling::deterministic(1.0),
            tool_choice: ToolChoice::Required,
        };

        let response = self
            .backend
            .respond(&request)
            .await
            .map_err(|e| ToolError::Upstream(e.to_string()))?;

        let text = response.output_text();
        debug!("web_search returned {} chars", text.len());
        if text.trim().is_empty() {
            return Err(ToolError::NotFound(format!(
                "no web results for '{}'",
                args.question
            )));
        }
        Ok(text)
    }
}
