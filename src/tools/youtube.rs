//! Video question answering through a multimodal model that accepts video URLs.

use super::{parse_args, ParamKind, ParameterSpec, Tool, ToolDescriptor, ToolError, ToolOutput};
use crate::error::{GaiaError, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Environment variables checked, in order, for the video model key.
pub const VIDEO_API_KEY_ENVS: [&str; 2] = ["GEMINI_API_KEY", "GOOGLE_API_KEY"];

/// `analyze_youtube_video` tool.
pub struct YoutubeVideoAnalysis {
    descriptor: ToolDescriptor,
    http: reqwest::Client,
    endpoint: String,
    video_id: Regex,
}

#[derive(Debug, Deserialize)]
struct VideoArgs {
    question: String,
    youtube_url: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    File { file_data: FileData },
    Text { text: String },
}

#[derive(Debug, Serialize)]
struct FileData {
    file_uri: String,
}

#[derive(Debug, Deserialize)]
struct GenerateReply {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ReplyPart>,
}

#[derive(Debug, Deserialize)]
struct ReplyPart {
    text: Option<String>,
}

impl GenerateReply {
    fn text(&self) -> String {
        self.candidates
            .iter()
            .filter_map(|c| c.content.as_ref())
            .flat_map(|c| c.parts.iter())
            .filter_map(|p| p.text.as_deref())
            .collect()
    }
}

impl YoutubeVideoAnalysis {
    pub fn new(api_base: &str, model: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let video_id = Regex::new(r"^[A-Za-z0-9_-]{11}$")
            .map_err(|e| GaiaError::Config(format!("invalid regex: {}", e)))?;

        Ok(Self {
            descriptor: ToolDescriptor::new(
                "analyze_youtube_video",
                "Answer a question about the content of a YouTube video, including what is \
                shown and said in it.",
                vec![
                    ParameterSpec::required("question", ParamKind::String, "Question about the video"),
                    ParameterSpec::required("youtube_url", ParamKind::String, "Full YouTube video URL"),
                ],
            ),
            http,
            endpoint: format!(
                "{}/models/{}:generateContent",
                api_base.trim_end_matches('/'),
                model
            ),
            video_id,
        })
    }

    /// Canonical watch URL for a YouTube link, or an error for anything else.
    fn canonical_url(&self, raw: &str) -> std::result::Result<String, ToolError> {
        let url = Url::parse(raw.trim())
            .map_err(|e| ToolError::InvalidArguments(format!("'{}' is not a valid URL: {}", raw, e)))?;
        let host = url.host_str().unwrap_or_default().trim_start_matches("www.");

        let id = match host {
            "youtube.com" | "m.youtube.com" | "music.youtube.com" => {
                if url.path() == "/watch" {
                    url.query_pairs()
                        .find(|(k, _)| k == "v")
                        .map(|(_, v)| v.into_owned())
                } else {
                    url.path()
                        .strip_prefix("/shorts/")
                        .or_else(|| url.path().strip_prefix("/embed/"))
                        .map(|id| id.trim_end_matches('/').to_string())
                }
            }
            "youtu.be" => Some(url.path().trim_start_matches('/').to_string()),
            _ => {
                return Err(ToolError::Unsupported(format!(
                    "'{}' is not a YouTube URL",
                    raw
                )))
            }
        };

        match id {
            Some(id) if self.video_id.is_match(&id) => {
                Ok(format!("https://www.youtube.com/watch?v={}", id))
            }
            _ => Err(ToolError::InvalidArguments(format!(
                "no video id in '{}'",
                raw
            ))),
        }
    }
}

fn video_api_key() -> std::result::Result<String, ToolError> {
    VIDEO_API_KEY_ENVS
        .iter()
        .find_map(|name| std::env::var(name).ok().filter(|v| !v.is_empty()))
        .ok_or_else(|| {
            ToolError::Unsupported(format!(
                "video analysis needs {} to be set",
                VIDEO_API_KEY_ENVS.join(" or ")
            ))
        })
}

#[async_trait]
impl Tool for YoutubeVideoAnalysis {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    #[instrument(skip(self, args))]
    async fn invoke(&self, args: serde_json::Value) -> ToolOutput {
        let args: VideoArgs = parse_args(args)?;
        let video_url = self.canonical_url(&args.youtube_url)?;
        let key = video_api_key()?;

        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::File {
                        file_data: FileData {
                            file_uri: video_url.clone(),
                        },
                    },
                    Part::Text {
                        text: args.question,
                    },
                ],
            }],
        };

        let response = self
            .http
            .post(&self.endpoint)
            .header("x-goog-api-key", key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ToolError::Upstream(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ToolError::Upstream(format!("HTTP {}: {}", status, detail)));
        }

        let reply: GenerateReply = response
            .json()
            .await
            .map_err(|e| ToolError::Upstream(format!("unexpected reply: {}", e)))?;
        let text = reply.text();
        debug!("Video analysis of {} returned {} chars", video_url, text.len());

        if text.trim().is_empty() {
            return Err(ToolError::NotFound(format!("no answer about {}", video_url)));
        }
        Ok(text)
    }
}
