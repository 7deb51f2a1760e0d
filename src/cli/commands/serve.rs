//! HTTP API server for integration with other systems.
//!
//! Exposes the agent over REST. One agent is shared by all requests; each
//! request is its own invocation with its own attachment resources.

use crate::agent::{Agent, AgentResponse};
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Shared application state.
struct AppState {
    agent: Agent,
    max_iterations: usize,
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(Operation::Serve) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }
    for warning in preflight::warnings(Operation::Serve) {
        Output::warning(&warning);
    }

    let state = Arc::new(AppState {
        agent: Agent::from_settings(&settings)?,
        max_iterations: settings.agent.max_iterations,
    });

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("gaia API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Ask", "POST /ask");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, router(state)).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/ask", post(ask))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Debug, Deserialize)]
struct AskRequest {
    question: String,
    /// Path of a file on the server's filesystem to attach
    #[serde(default)]
    file_path: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    max_iterations: Option<usize>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn bad_request(error: String) -> axum::response::Response {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error })).into_response()
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn ask(State(state): State<Arc<AppState>>, Json(req): Json<AskRequest>) -> impl IntoResponse {
    let max_iterations = req.max_iterations.unwrap_or(state.max_iterations);
    if max_iterations == 0 {
        return bad_request("max_iterations must be at least 1".to_string());
    }

    let file = req.file_path.as_deref().map(Settings::expand_path);
    if let Some(path) = &file {
        if !path.is_file() {
            return bad_request(format!("Attachment not found: {}", path.display()));
        }
    }

    let agent = match &req.model {
        Some(model) => state.agent.clone().with_model(model),
        None => state.agent.clone(),
    };

    info!("POST /ask ({} iterations max)", max_iterations);
    let response: AgentResponse = agent
        .run_detailed(&req.question, file.as_deref(), max_iterations)
        .await;

    Json(response).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ask_request_defaults() {
        let req: AskRequest = serde_json::from_str(r#"{"question": "Who?"}"#).unwrap();
        assert_eq!(req.question, "Who?");
        assert!(req.file_path.is_none());
        assert!(req.model.is_none());
        assert!(req.max_iterations.is_none());
    }

    #[test]
    fn test_ask_request_requires_question() {
        assert!(serde_json::from_str::<AskRequest>(r#"{"model": "x"}"#).is_err());
    }

    #[tokio::test]
    async fn test_health() {
        let body = health().await.into_response();
        assert_eq!(body.status(), StatusCode::OK);
    }
}
