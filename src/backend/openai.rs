//! OpenAI implementation of the model and file backends.
//!
//! Model turns go through the Responses API, containers through the
//! Containers API (both plain REST via `reqwest`). File uploads, deletion,
//! listing and audio transcription use the `async-openai` SDK.

use super::wire::{ContainerList, ContainerObject, CreateContainerRequest, ResponsesReply, ResponsesRequest};
use super::{FileBackend, ModelBackend, ModelRequest, ModelResponse, RemoteResource, ResourceKind, UploadPurpose};
use crate::config::Settings;
use crate::error::{GaiaError, Result};
use crate::openai::{api_key, create_client_with_timeout, create_http_client};
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    AudioInput, AudioResponseFormat, CreateFileRequestArgs, CreateTranscriptionRequestArgs,
    FileInput, FilePurpose,
};
use async_openai::Client;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// OpenAI-backed model and file backend.
pub struct OpenAiBackend {
    client: Client<OpenAIConfig>,
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    transcription_model: String,
    transcription_language: Option<String>,
}

impl OpenAiBackend {
    /// Create a backend from settings. Requires `OPENAI_API_KEY`.
    pub fn new(settings: &Settings) -> Result<Self> {
        let timeout = Duration::from_secs(settings.agent.request_timeout_secs);
        let api_base = settings.agent.api_base.trim_end_matches('/').to_string();

        Ok(Self {
            client: create_client_with_timeout(&api_base, timeout)?,
            http: create_http_client(timeout)?,
            api_base,
            api_key: api_key()?,
            transcription_model: settings.transcription.model.clone(),
            transcription_language: settings.transcription.language.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path)
    }

    /// Turn a non-success HTTP status into an error carrying the body.
    async fn check_status(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(GaiaError::OpenAI(format!("{} failed with {}: {}", what, status, body)))
    }

    async fn list_containers(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(self.url("containers"))
                .bearer_auth(&self.api_key)
                .query(&[("limit", "100")]);
            if let Some(cursor) = &after {
                request = request.query(&[("after", cursor.as_str())]);
            }

            let response = Self::check_status(request.send().await?, "Container listing").await?;
            let page: ContainerList = response.json().await?;
            ids.extend(page.data.into_iter().map(|c| c.id));

            match (page.has_more, page.last_id) {
                (true, Some(last)) => after = Some(last),
                _ => break,
            }
        }

        Ok(ids)
    }
}

#[async_trait]
impl ModelBackend for OpenAiBackend {
    #[instrument(skip(self, request), fields(model = request.model, turns = request.history.len()))]
    async fn respond(&self, request: &ModelRequest<'_>) -> Result<ModelResponse> {
        let body = ResponsesRequest::from_request(request);

        let response = self
            .http
            .post(self.url("responses"))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let response = Self::check_status(response, "Responses request").await?;

        let reply: ResponsesReply = response.json().await?;
        let response = reply.into_response()?;
        debug!("Model returned {} output items", response.items.len());
        Ok(response)
    }
}

#[async_trait]
impl FileBackend for OpenAiBackend {
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn upload(&self, file_name: &str, bytes: Vec<u8>, purpose: UploadPurpose) -> Result<String> {
        let purpose = match purpose {
            UploadPurpose::Vision => FilePurpose::Vision,
            UploadPurpose::Assistants => FilePurpose::Assistants,
        };

        let request = CreateFileRequestArgs::default()
            .file(FileInput::from_vec_u8(file_name.to_string(), bytes))
            .purpose(purpose)
            .build()
            .map_err(|e| GaiaError::OpenAI(format!("Failed to build upload request: {}", e)))?;

        let file = self
            .client
            .files()
            .create(request)
            .await
            .map_err(|e| GaiaError::OpenAI(format!("File upload failed: {}", e)))?;

        debug!("Uploaded {} as {}", file_name, file.id);
        Ok(file.id)
    }

    #[instrument(skip(self))]
    async fn create_container(&self, file_ids: &[String]) -> Result<String> {
        let body = CreateContainerRequest {
            name: format!("gaia-{}", uuid::Uuid::new_v4()),
            file_ids,
        };

        let response = self
            .http
            .post(self.url("containers"))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let response = Self::check_status(response, "Container creation").await?;
        let container: ContainerObject = response.json().await?;

        debug!("Created container {}", container.id);
        Ok(container.id)
    }

    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn transcribe(&self, file_name: &str, bytes: Vec<u8>) -> Result<String> {
        let mut request_builder = CreateTranscriptionRequestArgs::default();
        request_builder
            .file(AudioInput::from_vec_u8(file_name.to_string(), bytes))
            .model(&self.transcription_model)
            .response_format(AudioResponseFormat::Json);

        if let Some(lang) = &self.transcription_language {
            request_builder.language(lang);
        }

        let request = request_builder.build().map_err(|e| {
            GaiaError::OpenAI(format!("Failed to build transcription request: {}", e))
        })?;

        let response = self
            .client
            .audio()
            .transcribe(request)
            .await
            .map_err(|e| GaiaError::OpenAI(format!("{} API error: {}", self.transcription_model, e)))?;

        Ok(response.text.trim().to_string())
    }

    #[instrument(skip(self), fields(resource = %resource))]
    async fn delete(&self, resource: &RemoteResource) -> Result<()> {
        match resource.kind {
            ResourceKind::File => {
                self.client
                    .files()
                    .delete(&resource.id)
                    .await
                    .map_err(|e| GaiaError::OpenAI(format!("File deletion failed: {}", e)))?;
            }
            ResourceKind::Container => {
                let response = self
                    .http
                    .delete(self.url(&format!("containers/{}", resource.id)))
                    .bearer_auth(&self.api_key)
                    .send()
                    .await?;
                Self::check_status(response, "Container deletion").await?;
            }
        }
        Ok(())
    }

    async fn list_owned(&self, kind: ResourceKind) -> Result<Vec<String>> {
        match kind {
            ResourceKind::File => {
                let files = self
                    .client
                    .files()
                    .list(&[("limit", "10000")])
                    .await
                    .map_err(|e| GaiaError::OpenAI(format!("File listing failed: {}", e)))?;
                Ok(files.data.into_iter().map(|f| f.id).collect())
            }
            ResourceKind::Container => self.list_containers().await,
        }
    }
}
