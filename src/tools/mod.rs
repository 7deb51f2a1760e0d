//! Tools the agent can call during the reasoning loop.
//!
//! Each tool is an immutable record implementing [`Tool`]: it carries its own
//! [`ToolDescriptor`] and its callable. The [`ToolRegistry`] is built once at
//! startup from a static list and looked up by name for every invocation.
//! Tools report domain failures through [`ToolError`] instead of panicking, so
//! the loop can hand the message back to the model and keep going.

mod calculator;
mod html;
mod registry;
mod web_fetch;
mod web_search;
mod wikipedia;
mod youtube;

pub use calculator::{evaluate, Calculator};
pub use registry::{default_registry, ToolRegistry};
pub use web_fetch::WebFetch;
pub use web_search::WebSearch;
pub use wikipedia::{
    CachedPage, PageCache, Section, WikipediaClient, WikipediaPageSearch, WikipediaSectionContent,
    WikipediaSections,
};
pub use youtube::{YoutubeVideoAnalysis, VIDEO_API_KEY_ENVS};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Error returned by a tool. Rendered to text before it reaches the model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("{0}")]
    Evaluation(String),

    #[error("Upstream service failed: {0}")]
    Upstream(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl ToolError {
    /// Text placed in the tool-result turn.
    pub fn to_tool_text(&self) -> String {
        format!("Error: {}", self)
    }
}

/// Result of one tool call.
pub type ToolOutput = std::result::Result<String, ToolError>;

/// JSON type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Number,
    Integer,
    Boolean,
}

/// One parameter of a tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    pub name: String,
    pub kind: ParamKind,
    pub description: String,
    pub required: bool,
}

impl ParameterSpec {
    pub fn required(name: &str, kind: ParamKind, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            description: description.to_string(),
            required: true,
        }
    }

    pub fn optional(name: &str, kind: ParamKind, description: &str) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind, description)
        }
    }
}

/// Name, description and parameter schema the model sees for a tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParameterSpec>,
}

impl ToolDescriptor {
    pub fn new(name: &str, description: &str, parameters: Vec<ParameterSpec>) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters,
        }
    }

    /// Render the parameters as a JSON schema object.
    pub fn json_schema(&self) -> serde_json::Value {
        let properties: serde_json::Map<String, serde_json::Value> = self
            .parameters
            .iter()
            .map(|p| {
                (
                    p.name.clone(),
                    serde_json::json!({
                        "type": p.kind,
                        "description": p.description,
                    }),
                )
            })
            .collect();

        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// A callable tool.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Descriptor offered to the model.
    fn descriptor(&self) -> &ToolDescriptor;

    /// Run the tool with decoded JSON arguments.
    async fn invoke(&self, args: serde_json::Value) -> ToolOutput;
}

/// Decode a tool's typed arguments from the JSON payload.
pub(crate) fn parse_args<T: DeserializeOwned>(args: serde_json::Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

/// Cut tool output that would flood the conversation.
pub(crate) fn clamp_output(text: String, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text;
    }
    let mut clamped: String = text.chars().take(max_chars).collect();
    clamped.push_str("\n...[truncated]");
    clamped
}
