//! Wire types for the OpenAI Responses and Containers REST endpoints.

use super::{ActiveTool, ModelRequest, ModelResponse, OutputItem, ToolChoice};
use crate::conversation::{Attachment, ModelTurn, ToolInvocation, Turn};
use crate::error::{GaiaError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Serialize)]
pub struct ResponsesRequest<'a> {
    pub model: &'a str,
    pub input: Vec<InputItem>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<&'static str>,
    pub temperature: f32,
    pub top_p: f32,
    pub store: bool,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputItem {
    Message {
        role: &'static str,
        content: MessageContent,
    },
    FunctionCall {
        call_id: String,
        name: String,
        arguments: String,
    },
    FunctionCallOutput {
        call_id: String,
        output: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    InputText { text: String },
    InputImage { file_id: String, detail: &'static str },
    InputFile { file_id: String },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolSpec {
    Function {
        name: String,
        description: String,
        parameters: serde_json::Value,
        strict: bool,
    },
    CodeInterpreter {
        container: String,
    },
    WebSearchPreview {},
}

impl<'a> ResponsesRequest<'a> {
    /// Translate a backend-neutral request into the Responses API body.
    pub fn from_request(request: &ModelRequest<'a>) -> Self {
        let input = request
            .history
            .turns()
            .iter()
            .flat_map(input_items)
            .collect();

        let tools: Vec<ToolSpec> = request.tools.iter().map(tool_spec).collect();
        let tool_choice = if tools.is_empty() {
            None
        } else {
            Some(match request.tool_choice {
                ToolChoice::Auto => "auto",
                ToolChoice::Required => "required",
            })
        };

        Self {
            model: request.model,
            input,
            tools,
            tool_choice,
            temperature: request.sampling.temperature,
            top_p: request.sampling.top_p,
            store: false,
        }
    }
}

fn input_items(turn: &Turn) -> Vec<InputItem> {
    match turn {
        Turn::Instruction(text) => vec![InputItem::Message {
            role: "developer",
            content: MessageContent::Text(text.clone()),
        }],
        Turn::User {
            question,
            attachment,
        } => {
            let mut parts = vec![ContentPart::InputText {
                text: question.clone(),
            }];
            match attachment {
                Some(Attachment::Transcript(text)) => {
                    parts.push(ContentPart::InputText { text: text.clone() })
                }
                Some(Attachment::Image { file_id }) => parts.push(ContentPart::InputImage {
                    file_id: file_id.clone(),
                    detail: "auto",
                }),
                Some(Attachment::Document { file_id }) => parts.push(ContentPart::InputFile {
                    file_id: file_id.clone(),
                }),
                None => {}
            }
            vec![InputItem::Message {
                role: "user",
                content: MessageContent::Parts(parts),
            }]
        }
        Turn::Model(ModelTurn::Text(text)) => vec![InputItem::Message {
            role: "assistant",
            content: MessageContent::Text(text.clone()),
        }],
        Turn::Model(ModelTurn::ToolRequests(requests)) => requests
            .iter()
            .map(|r| InputItem::FunctionCall {
                call_id: r.call_id.clone(),
                name: r.name.clone(),
                arguments: r.arguments.clone(),
            })
            .collect(),
        Turn::ToolResult { call_id, output } => vec![InputItem::FunctionCallOutput {
            call_id: call_id.clone(),
            output: output.clone(),
        }],
    }
}

fn tool_spec(tool: &ActiveTool) -> ToolSpec {
    match tool {
        ActiveTool::Function(descriptor) => ToolSpec::Function {
            name: descriptor.name.clone(),
            description: descriptor.description.clone(),
            parameters: descriptor.json_schema(),
            strict: false,
        },
        ActiveTool::CodeInterpreter { container_id } => ToolSpec::CodeInterpreter {
            container: container_id.clone(),
        },
        ActiveTool::WebSearch => ToolSpec::WebSearchPreview {},
    }
}

/// Body of a Responses API reply. Output items are decoded one by one.
#[derive(Debug, Deserialize)]
pub struct ResponsesReply {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error: Option<ApiError>,
    #[serde(default)]
    pub output: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub code: Option<String>,
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct MessageEntry {
    #[serde(default)]
    content: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct FunctionCallEntry {
    call_id: String,
    name: String,
    #[serde(default)]
    arguments: String,
}

impl ResponsesReply {
    pub fn into_response(self) -> Result<ModelResponse> {
        if let Some(error) = self.error {
            return Err(GaiaError::Backend(format!(
                "{} ({})",
                error.message,
                error.code.unwrap_or_else(|| "no code".to_string())
            )));
        }
        if self.status.as_deref() == Some("failed") {
            return Err(GaiaError::Backend("response failed without error detail".to_string()));
        }

        let mut items = Vec::new();
        for entry in self.output {
            let kind = entry["type"].as_str().unwrap_or("unknown").to_string();
            match kind.as_str() {
                "message" => {
                    let message: MessageEntry = serde_json::from_value(entry)?;
                    for part in message.content {
                        let text = match part["type"].as_str() {
                            Some("output_text") => part["text"].as_str(),
                            Some("refusal") => part["refusal"].as_str(),
                            _ => None,
                        };
                        if let Some(text) = text {
                            items.push(OutputItem::Text(text.to_string()));
                        }
                    }
                }
                "function_call" => {
                    let call: FunctionCallEntry = serde_json::from_value(entry)?;
                    items.push(OutputItem::ToolInvocation(ToolInvocation {
                        call_id: call.call_id,
                        name: call.name,
                        arguments: call.arguments,
                    }));
                }
                _ => {
                    debug!("Skipping output item of type {}", kind);
                    items.push(OutputItem::Other { kind });
                }
            }
        }

        Ok(ModelResponse::new(items))
    }
}

#[derive(Debug, Serialize)]
pub struct CreateContainerRequest<'a> {
    pub name: String,
    pub file_ids: &'a [String],
}

#[derive(Debug, Deserialize)]
pub struct ContainerObject {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct ContainerList {
    #[serde(default)]
    pub data: Vec<ContainerObject>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub last_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Sampling;
    use crate::conversation::History;
    use crate::tools::{ParamKind, ParameterSpec, ToolDescriptor};

    fn sample_history() -> History {
        let mut history = History::new(
            "Finish with FINAL ANSWER:",
            "What is in the file?",
            Some(Attachment::Document {
                file_id: "file-abc".to_string(),
            }),
        );
        history.record_round(vec![(
            ToolInvocation {
                call_id: "call_1".to_string(),
                name: "evaluate_expression".to_string(),
                arguments: r#"{"expression":"2+2"}"#.to_string(),
            },
            "4".to_string(),
        )]);
        history
    }

    #[test]
    fn test_request_body_shape() {
        let history = sample_history();
        let tools = vec![
            ActiveTool::Function(ToolDescriptor::new(
                "evaluate_expression",
                "Math",
                vec![ParameterSpec::required("expression", ParamKind::String, "Expr")],
            )),
            ActiveTool::CodeInterpreter {
                container_id: "cntr_9".to_string(),
            },
        ];
        let request = ModelRequest {
            model: "gpt-4.1-mini",
            history: &history,
            tools: &tools,
            sampling: Sampling::deterministic(0.95),
            tool_choice: ToolChoice::Auto,
        };

        let body = serde_json::to_value(ResponsesRequest::from_request(&request)).unwrap();

        assert_eq!(body["model"], "gpt-4.1-mini");
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["tool_choice"], "auto");
        assert_eq!(body["store"], false);

        let input = body["input"].as_array().unwrap();
        assert_eq!(input.len(), 4);
        assert_eq!(input[0]["role"], "developer");
        assert_eq!(input[1]["content"][1]["type"], "input_file");
        assert_eq!(input[1]["content"][1]["file_id"], "file-abc");
        assert_eq!(input[2]["type"], "function_call");
        assert_eq!(input[3]["type"], "function_call_output");
        assert_eq!(input[3]["call_id"], "call_1");

        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["parameters"]["required"][0], "expression");
        assert_eq!(body["tools"][1]["type"], "code_interpreter");
        assert_eq!(body["tools"][1]["container"], "cntr_9");
    }

    #[test]
    fn test_web_search_tool_spec() {
        let spec = serde_json::to_value(tool_spec(&ActiveTool::WebSearch)).unwrap();
        assert_eq!(spec, serde_json::json!({"type": "web_search_preview"}));
    }

    #[test]
    fn test_reply_decoding() {
        let reply: ResponsesReply = serde_json::from_value(serde_json::json!({
            "status": "completed",
            "output": [
                {"type": "reasoning", "summary": []},
                {"type": "message", "role": "assistant", "content": [
                    {"type": "output_text", "text": "FINAL ANSWER: 4", "annotations": []}
                ]},
                {"type": "function_call", "call_id": "call_2", "name": "web_search",
                 "arguments": "{\"question\":\"x\"}", "id": "fc_1"}
            ]
        }))
        .unwrap();

        let response = reply.into_response().unwrap();
        assert_eq!(response.items.len(), 3);
        assert_eq!(response.output_text(), "FINAL ANSWER: 4");
        let (invocations, others) = response.partition();
        assert_eq!(invocations[0].call_id, "call_2");
        assert_eq!(
            others[0],
            &OutputItem::Other {
                kind: "reasoning".to_string()
            }
        );
    }

    #[test]
    fn test_reply_error_is_surfaced() {
        let reply: ResponsesReply = serde_json::from_value(serde_json::json!({
            "status": "failed",
            "error": {"code": "server_error", "message": "boom"},
            "output": []
        }))
        .unwrap();
        assert!(matches!(reply.into_response(), Err(GaiaError::Backend(_))));
    }
}
