//! Prompt templates for the agent.
//!
//! Prompts can be customized by placing an `agent.toml` file in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Prompts {
    /// Instruction turn that opens every conversation.
    pub instructions: String,
    /// Label placed before an audio transcript in the user turn.
    pub transcript_label: String,
    /// Instructions for the model behind the `web_search` tool.
    pub web_search: String,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            instructions: "You are a general AI assistant. I will ask you a question. Report your thoughts, and finish your answer with the following template: FINAL ANSWER: [YOUR FINAL ANSWER]. YOUR FINAL ANSWER should be a number OR as few words as possible OR a comma separated list of numbers and/or strings. If you are asked for a number, don't use comma to write your number neither use units such as $ or percent sign unless specified otherwise. If you are asked for a string, don't use articles, neither abbreviations (e.g. for cities), and write the digits in plain text unless specified otherwise. If you are asked for a comma separated list, apply the above rules depending of whether the element to be put in the list is a number or a string.".to_string(),

            transcript_label: "Audio transcript:".to_string(),

            web_search: "Answer the question of the user based on the web search results. Make sure your answer is grounded in the information you find on the web. If you cannot find the information, say so. Don't be too verbose, answer the question in a concise manner.".to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts, applying overrides from `custom_dir/agent.toml` when present.
    pub fn load(custom_dir: Option<&str>) -> crate::error::Result<Self> {
        let Some(dir) = custom_dir else {
            return Ok(Self::default());
        };

        let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string()).join("agent.toml");
        if custom_path.exists() {
            let content = std::fs::read_to_string(&custom_path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }
}
