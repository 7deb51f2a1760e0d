//! Configuration module for the agent.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::Prompts;
pub use settings::{
    AgentSettings, GeneralSettings, PromptSettings, Settings, ToolSettings,
    TranscriptionSettings,
};
