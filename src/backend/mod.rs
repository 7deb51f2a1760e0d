//! Model and file backends.
//!
//! The agent talks to the language model and to remote file storage through
//! two narrow traits, [`ModelBackend`] and [`FileBackend`]. The OpenAI
//! implementation of both lives in [`openai`]; tests use in-memory stubs.

pub mod openai;
mod wire;

pub use openai::OpenAiBackend;

use crate::conversation::{History, ToolInvocation};
use crate::error::Result;
use crate::tools::ToolDescriptor;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// How freely the model may pick tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolChoice {
    /// The model decides whether to call zero or more tools.
    Auto,
    /// The model must call a tool.
    Required,
}

/// Sampling parameters for a request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampling {
    pub temperature: f32,
    pub top_p: f32,
}

impl Sampling {
    /// Lowest-variance sampling: temperature zero.
    pub fn deterministic(top_p: f32) -> Self {
        Self {
            temperature: 0.0,
            top_p,
        }
    }
}

/// A tool offered to the model for one request.
#[derive(Debug, Clone, PartialEq)]
pub enum ActiveTool {
    /// Locally executed function tool.
    Function(ToolDescriptor),
    /// Hosted code execution bound to a container holding the attachment.
    CodeInterpreter { container_id: String },
    /// Hosted web search.
    WebSearch,
}

impl ActiveTool {
    pub fn name(&self) -> &str {
        match self {
            ActiveTool::Function(d) => &d.name,
            ActiveTool::CodeInterpreter { .. } => "code_interpreter",
            ActiveTool::WebSearch => "web_search",
        }
    }
}

/// One request to the model backend.
#[derive(Debug, Clone)]
pub struct ModelRequest<'a> {
    pub model: &'a str,
    pub history: &'a History,
    pub tools: &'a [ActiveTool],
    pub sampling: Sampling,
    pub tool_choice: ToolChoice,
}

/// One item of model output.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputItem {
    /// Freeform text.
    Text(String),
    /// Request to call a local tool.
    ToolInvocation(ToolInvocation),
    /// Anything else the backend reports (reasoning, hosted tool calls, ...).
    Other { kind: String },
}

/// Model output, in the order the backend produced it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelResponse {
    pub items: Vec<OutputItem>,
}

impl ModelResponse {
    pub fn new(items: Vec<OutputItem>) -> Self {
        Self { items }
    }

    /// All freeform text, concatenated.
    pub fn output_text(&self) -> String {
        self.items
            .iter()
            .filter_map(|item| match item {
                OutputItem::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Split into tool invocations and the remaining (non-tool) items.
    pub fn partition(&self) -> (Vec<ToolInvocation>, Vec<&OutputItem>) {
        let mut invocations = Vec::new();
        let mut others = Vec::new();
        for item in &self.items {
            match item {
                OutputItem::ToolInvocation(inv) => invocations.push(inv.clone()),
                other => others.push(other),
            }
        }
        (invocations, others)
    }
}

/// Produces the next model turn for a conversation.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn respond(&self, request: &ModelRequest<'_>) -> Result<ModelResponse>;
}

/// Why a file is uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPurpose {
    /// Image understanding.
    Vision,
    /// General document use, including code execution.
    Assistants,
}

/// Kind of a remote resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    File,
    Container,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::File => write!(f, "file"),
            ResourceKind::Container => write!(f, "container"),
        }
    }
}

/// A remote object created on the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteResource {
    pub kind: ResourceKind,
    pub id: String,
}

impl RemoteResource {
    pub fn file(id: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::File,
            id: id.into(),
        }
    }

    pub fn container(id: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::Container,
            id: id.into(),
        }
    }
}

impl std::fmt::Display for RemoteResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}

/// Remote file storage, execution containers and transcription.
#[async_trait]
pub trait FileBackend: Send + Sync {
    /// Upload bytes and return the file id.
    async fn upload(&self, file_name: &str, bytes: Vec<u8>, purpose: UploadPurpose) -> Result<String>;

    /// Create an execution container holding the given files; returns its id.
    async fn create_container(&self, file_ids: &[String]) -> Result<String>;

    /// Transcribe audio bytes to text. Creates no remote resource.
    async fn transcribe(&self, file_name: &str, bytes: Vec<u8>) -> Result<String>;

    /// Delete a remote resource.
    async fn delete(&self, resource: &RemoteResource) -> Result<()>;

    /// Ids of every resource of `kind` owned by the credential.
    async fn list_owned(&self, kind: ResourceKind) -> Result<Vec<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invocation(id: &str) -> ToolInvocation {
        ToolInvocation {
            call_id: id.to_string(),
            name: "web_search".to_string(),
            arguments: "{}".to_string(),
        }
    }

    #[test]
    fn test_output_text_concatenates_text_items() {
        let response = ModelResponse::new(vec![
            OutputItem::Text("Thinking. ".to_string()),
            OutputItem::Other {
                kind: "reasoning".to_string(),
            },
            OutputItem::Text("FINAL ANSWER: 3".to_string()),
        ]);
        assert_eq!(response.output_text(), "Thinking. FINAL ANSWER: 3");
    }

    #[test]
    fn test_partition_keeps_invocation_order() {
        let response = ModelResponse::new(vec![
            OutputItem::ToolInvocation(invocation("b")),
            OutputItem::Text("let me check".to_string()),
            OutputItem::ToolInvocation(invocation("a")),
        ]);
        let (invocations, others) = response.partition();
        let ids: Vec<&str> = invocations.iter().map(|i| i.call_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(others.len(), 1);
    }

    #[test]
    fn test_remote_resource_display() {
        assert_eq!(RemoteResource::container("cntr_1").to_string(), "container cntr_1");
    }
}
