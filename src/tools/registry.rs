//! Tool registry: name-keyed lookup over an ordered list of tools.

use super::{
    clamp_output, Calculator, Tool, ToolDescriptor, ToolError, ToolOutput, WebFetch, WebSearch,
    WikipediaClient, WikipediaPageSearch, WikipediaSectionContent, WikipediaSections,
    YoutubeVideoAnalysis,
};
use crate::backend::ModelBackend;
use crate::config::{Prompts, Settings};
use crate::error::{GaiaError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Registry of tools available to the agent.
///
/// Registration order is kept so the model always sees the same tool list.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
    max_result_chars: usize,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
            max_result_chars: usize::MAX,
        }
    }

    /// Cap the length of tool output handed back to the model.
    pub fn with_max_result_chars(mut self, max: usize) -> Self {
        self.max_result_chars = max;
        self
    }

    /// Register a tool. Fails if the name is already taken.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.descriptor().name.clone();
        if self.index.contains_key(&name) {
            return Err(GaiaError::Config(format!("Tool registered twice: {}", name)));
        }
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.index.get(name).map(|&i| self.tools[i].clone())
    }

    /// Descriptors of all registered tools, in registration order.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|t| t.descriptor().clone()).collect()
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.descriptor().name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Invoke a tool by name.
    pub async fn invoke(&self, name: &str, args: serde_json::Value) -> ToolOutput {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        let output = tool.invoke(args).await?;
        Ok(clamp_output(output, self.max_result_chars))
    }
}

/// Build the standard tool set.
pub fn default_registry(
    settings: &Settings,
    prompts: &Prompts,
    backend: Arc<dyn ModelBackend>,
) -> Result<ToolRegistry> {
    let timeout = Duration::from_secs(settings.tools.http_timeout_secs);
    let wikipedia = Arc::new(WikipediaClient::new(
        &settings.tools.wikipedia_language,
        timeout,
    )?);

    let tools: Vec<Arc<dyn Tool>> = vec![
        Arc::new(Calculator::new()),
        Arc::new(WebSearch::new(
            backend,
            &settings.tools.web_search_model,
            &prompts.web_search,
        )),
        Arc::new(WikipediaPageSearch::new(
            wikipedia.clone(),
            settings.tools.wikipedia_search_limit,
        )),
        Arc::new(WikipediaSections::new(wikipedia.clone())),
        Arc::new(WikipediaSectionContent::new(wikipedia)),
        Arc::new(WebFetch::new(timeout)?),
        Arc::new(YoutubeVideoAnalysis::new(
            &settings.tools.gemini_api_base,
            &settings.tools.video_model,
            Duration::from_secs(settings.agent.request_timeout_secs),
        )?),
    ];

    let mut registry = ToolRegistry::new().with_max_result_chars(settings.tools.max_result_chars);
    for tool in tools {
        registry.register(tool)?;
    }
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{ParamKind, ParameterSpec};
    use async_trait::async_trait;

    struct Shout {
        descriptor: ToolDescriptor,
    }

    impl Shout {
        fn new() -> Self {
            Self {
                descriptor: ToolDescriptor::new(
                    "shout",
                    "Upper-case the text",
                    vec![ParameterSpec::required("text", ParamKind::String, "Text")],
                ),
            }
        }
    }

    #[async_trait]
    impl Tool for Shout {
        fn descriptor(&self) -> &ToolDescriptor {
            &self.descriptor
        }

        async fn invoke(&self, args: serde_json::Value) -> ToolOutput {
            args["text"]
                .as_str()
                .map(|s| s.to_uppercase())
                .ok_or_else(|| ToolError::InvalidArguments("missing 'text'".to_string()))
        }
    }

    #[tokio::test]
    async fn test_invoke_by_name() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Shout::new())).unwrap();

        let output = registry.invoke("shout", serde_json::json!({"text": "hi"})).await;
        assert_eq!(output, Ok("HI".to_string()));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_an_error_value() {
        let registry = ToolRegistry::new();
        let output = registry.invoke("nope", serde_json::json!({})).await;
        assert_eq!(output, Err(ToolError::UnknownTool("nope".to_string())));
    }

    #[tokio::test]
    async fn test_output_is_clamped() {
        let mut registry = ToolRegistry::new().with_max_result_chars(3);
        registry.register(Arc::new(Shout::new())).unwrap();

        let output = registry
            .invoke("shout", serde_json::json!({"text": "abcdef"}))
            .await
            .unwrap();
        assert!(output.starts_with("ABC\n"));
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Shout::new())).unwrap();
        assert!(registry.register(Arc::new(Shout::new())).is_err());
        assert_eq!(registry.tool_names(), vec!["shout".to_string()]);
    }
}
