//! OpenAI client configuration with sensible defaults.

use crate::error::{GaiaError, Result};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Default timeout for OpenAI API requests (5 minutes).
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Default base URL of the OpenAI REST API.
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Environment variable holding the OpenAI API key.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Read the OpenAI API key from the environment.
pub fn api_key() -> Result<String> {
    match std::env::var(API_KEY_ENV) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        Ok(_) => Err(GaiaError::Config(format!("{} is empty", API_KEY_ENV))),
        Err(_) => Err(GaiaError::Config(format!("{} not set", API_KEY_ENV))),
    }
}

/// Build the HTTP client shared by the SDK client and raw REST calls.
pub fn create_http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(GaiaError::Http)
}

/// Create an OpenAI SDK client against `api_base` with a custom timeout.
pub fn create_client_with_timeout(api_base: &str, timeout: Duration) -> Result<Client<OpenAIConfig>> {
    let http_client = create_http_client(timeout)?;
    let config = OpenAIConfig::default().with_api_base(api_base.trim_end_matches('/'));

    Ok(Client::with_config(config).with_http_client(http_client))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_client_with_custom_base() {
        let client = create_client_with_timeout("http://localhost:8080/v1/", Duration::from_secs(5));
        assert!(client.is_ok());
    }
}
