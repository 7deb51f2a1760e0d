//! In-memory backends and tools for exercising the agent without network access.

use crate::backend::{
    FileBackend, ModelBackend, ModelRequest, ModelResponse, OutputItem, RemoteResource,
    ResourceKind, Sampling, ToolChoice, UploadPurpose,
};
use crate::conversation::{History, ToolInvocation};
use crate::error::{GaiaError, Result};
use crate::tools::{ParamKind, ParameterSpec, Tool, ToolDescriptor, ToolOutput};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

pub fn text_response(text: &str) -> ModelResponse {
    ModelResponse::new(vec![OutputItem::Text(text.to_string())])
}

pub fn tool_call(call_id: &str, name: &str, arguments: &str) -> OutputItem {
    OutputItem::ToolInvocation(ToolInvocation {
        call_id: call_id.to_string(),
        name: name.to_string(),
        arguments: arguments.to_string(),
    })
}

pub fn tool_call_response(call_id: &str, name: &str, arguments: &str) -> ModelResponse {
    ModelResponse::new(vec![tool_call(call_id, name, arguments)])
}

/// One scripted backend reaction.
pub enum Step {
    Respond(ModelResponse),
    Fail(String),
    Panic,
}

/// What the model backend was sent.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub model: String,
    pub history: History,
    pub tools: Vec<String>,
    pub sampling: Sampling,
    pub tool_choice: ToolChoice,
}

/// Model backend that replays a script, then repeats a fallback response.
pub struct ScriptedModel {
    steps: Mutex<VecDeque<Step>>,
    fallback: Option<ModelResponse>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedModel {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer every request with the same response.
    pub fn always(response: ModelResponse) -> Self {
        Self {
            fallback: Some(response),
            ..Self::new(Vec::new())
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ModelBackend for ScriptedModel {
    async fn respond(&self, request: &ModelRequest<'_>) -> Result<ModelResponse> {
        self.requests.lock().unwrap().push(RecordedRequest {
            model: request.model.to_string(),
            history: request.history.clone(),
            tools: request.tools.iter().map(|t| t.name().to_string()).collect(),
            sampling: request.sampling,
            tool_choice: request.tool_choice,
        });

        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Respond(response)) => Ok(response),
            Some(Step::Fail(message)) => Err(GaiaError::Backend(message)),
            Some(Step::Panic) => panic!("scripted backend panic"),
            None => self
                .fallback
                .clone()
                .ok_or_else(|| GaiaError::Backend("script exhausted".to_string())),
        }
    }
}

/// File backend that records every call and never touches the network.
#[derive(Default)]
pub struct RecordingFiles {
    uploads: Mutex<Vec<(String, UploadPurpose)>>,
    containers: Mutex<Vec<Vec<String>>>,
    transcriptions: Mutex<Vec<String>>,
    deleted: Mutex<Vec<RemoteResource>>,
    owned: HashMap<ResourceKind, Vec<String>>,
    transcript: String,
    fail_deletes: bool,
    fail_containers: bool,
}

impl RecordingFiles {
    pub fn with_transcript(mut self, text: &str) -> Self {
        self.transcript = text.to_string();
        self
    }

    pub fn with_owned(mut self, kind: ResourceKind, ids: &[&str]) -> Self {
        self.owned
            .insert(kind, ids.iter().map(|id| id.to_string()).collect());
        self
    }

    pub fn failing_deletes(mut self) -> Self {
        self.fail_deletes = true;
        self
    }

    pub fn failing_containers(mut self) -> Self {
        self.fail_containers = true;
        self
    }

    pub fn uploads(&self) -> Vec<(String, UploadPurpose)> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn containers(&self) -> Vec<Vec<String>> {
        self.containers.lock().unwrap().clone()
    }

    pub fn transcriptions(&self) -> Vec<String> {
        self.transcriptions.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<RemoteResource> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl FileBackend for RecordingFiles {
    async fn upload(&self, file_name: &str, _bytes: Vec<u8>, purpose: UploadPurpose) -> Result<String> {
        let mut uploads = self.uploads.lock().unwrap();
        uploads.push((file_name.to_string(), purpose));
        Ok(format!("file-{}", uploads.len()))
    }

    async fn create_container(&self, file_ids: &[String]) -> Result<String> {
        if self.fail_containers {
            return Err(GaiaError::Backend("container quota exceeded".to_string()));
        }
        let mut containers = self.containers.lock().unwrap();
        containers.push(file_ids.to_vec());
        Ok(format!("cntr-{}", containers.len()))
    }

    async fn transcribe(&self, file_name: &str, _bytes: Vec<u8>) -> Result<String> {
        self.transcriptions.lock().unwrap().push(file_name.to_string());
        Ok(self.transcript.clone())
    }

    async fn delete(&self, resource: &RemoteResource) -> Result<()> {
        self.deleted.lock().unwrap().push(resource.clone());
        if self.fail_deletes {
            return Err(GaiaError::Backend(format!("cannot delete {}", resource)));
        }
        Ok(())
    }

    async fn list_owned(&self, kind: ResourceKind) -> Result<Vec<String>> {
        Ok(self.owned.get(&kind).cloned().unwrap_or_default())
    }
}

/// Tool that echoes its `text` argument.
pub struct EchoTool {
    descriptor: ToolDescriptor,
}

impl EchoTool {
    pub fn new() -> Self {
        Self {
            descriptor: ToolDescriptor::new(
                "echo",
                "Echo the input",
                vec![ParameterSpec::required("text", ParamKind::String, "Text to echo")],
            ),
        }
    }
}

#[async_trait]
impl Tool for EchoTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn invoke(&self, args: serde_json::Value) -> ToolOutput {
        #[derive(serde::Deserialize)]
        struct Args {
            text: String,
        }
        let args: Args = crate::tools::parse_args(args)?;
        Ok(format!("echo: {}", args.text))
    }
}
