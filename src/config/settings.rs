//! Configuration settings for the agent.

use crate::openai::{DEFAULT_API_BASE, DEFAULT_TIMEOUT_SECS};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub agent: AgentSettings,
    pub transcription: TranscriptionSettings,
    pub tools: ToolSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
        }
    }
}

/// Reasoning loop and model backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Model used for the reasoning loop.
    pub model: String,
    /// Maximum number of model calls per question.
    pub max_iterations: usize,
    /// Nucleus sampling cutoff. Temperature is always zero.
    pub top_p: f32,
    /// Base URL of the OpenAI-compatible API.
    pub api_base: String,
    /// Timeout for a single backend request, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4.1-mini".to_string(),
            max_iterations: 5,
            top_p: 0.95,
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Audio attachment transcription settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    /// Transcription model.
    pub model: String,
    /// Optional language hint (ISO-639-1).
    pub language: Option<String>,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            model: "whisper-1".to_string(),
            language: None,
        }
    }
}

/// Settings for the built-in tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    /// Model backing the `web_search` tool.
    pub web_search_model: String,
    /// Gemini model backing the `analyze_youtube_video` tool.
    pub video_model: String,
    /// Base URL of the Gemini API.
    pub gemini_api_base: String,
    /// Wikipedia language edition (e.g. "en").
    pub wikipedia_language: String,
    /// Number of results returned by `wikipedia_page_search`.
    pub wikipedia_search_limit: u32,
    /// Timeout for tool HTTP requests, in seconds.
    pub http_timeout_secs: u64,
    /// Tool output longer than this is cut before it reaches the model.
    pub max_result_chars: usize,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            web_search_model: "gpt-4.1-mini".to_string(),
            video_model: "gemini-2.0-flash".to_string(),
            gemini_api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            wikipedia_language: "en".to_string(),
            wikipedia_search_limit: 10,
            http_timeout_secs: 10,
            max_result_chars: 40_000,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::GaiaError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gaia")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [agent]
            model = "gpt-4o"
            max_iterations = 8
            "#,
        )
        .unwrap();

        assert_eq!(settings.agent.model, "gpt-4o");
        assert_eq!(settings.agent.max_iterations, 8);
        assert_eq!(settings.agent.top_p, 0.95);
        assert_eq!(settings.tools.wikipedia_language, "en");
        assert_eq!(settings.transcription.model, "whisper-1");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut settings = Settings::default();
        settings.agent.top_p = 0.5;
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.agent.top_p, 0.5);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let path = PathBuf::from("/definitely/not/here/config.toml");
        let settings = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(settings.agent.max_iterations, 5);
    }
}
