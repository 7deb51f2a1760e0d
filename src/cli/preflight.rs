//! Pre-flight checks before expensive operations.
//!
//! Validates that required credentials are available before starting
//! operations that would otherwise fail midway.

use crate::error::{GaiaError, Result};
use crate::openai::API_KEY_ENV;
use crate::tools::VIDEO_API_KEY_ENVS;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Answering questions needs the model API key.
    Ask,
    /// The server answers questions too.
    Serve,
    /// Purging needs the model API key.
    Purge,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation) -> Result<()> {
    match operation {
        Operation::Ask | Operation::Serve | Operation::Purge => {
            check_api_key(std::env::var(API_KEY_ENV).ok().as_deref())?;
        }
    }
    Ok(())
}

/// Problems that do not block the operation but disable some tools.
pub fn warnings(operation: Operation) -> Vec<String> {
    match operation {
        Operation::Ask | Operation::Serve => {
            let video_key = VIDEO_API_KEY_ENVS
                .iter()
                .any(|name| std::env::var(name).map(|v| !v.is_empty()).unwrap_or(false));
            if video_key {
                Vec::new()
            } else {
                vec![format!(
                    "{} not set; video analysis will be unavailable",
                    VIDEO_API_KEY_ENVS.join(" / ")
                )]
            }
        }
        Operation::Purge => Vec::new(),
    }
}

/// Check that the OpenAI API key is configured.
fn check_api_key(value: Option<&str>) -> Result<()> {
    match value {
        Some(key) if !key.is_empty() => Ok(()),
        Some(_) => Err(GaiaError::Config(format!(
            "{} is empty. Set it with: export {}='sk-...'",
            API_KEY_ENV, API_KEY_ENV
        ))),
        None => Err(GaiaError::Config(format!(
            "{} not set. Set it with: export {}='sk-...'",
            API_KEY_ENV, API_KEY_ENV
        ))),
    }
}
