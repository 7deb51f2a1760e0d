//! Ask command implementation.

use crate::agent::{Agent, Outcome};
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;
use std::path::PathBuf;

/// Run the ask command.
pub async fn run_ask(
    question: &str,
    file: Option<PathBuf>,
    model: Option<String>,
    max_iterations: Option<usize>,
    verbose: bool,
    settings: Settings,
) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Ask) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }
    for warning in preflight::warnings(Operation::Ask) {
        Output::warning(&warning);
    }

    let file = file.map(|path| Settings::expand_path(&path.to_string_lossy()));
    if let Some(path) = &file {
        if !path.is_file() {
            Output::error(&format!("Attachment not found: {}", path.display()));
            anyhow::bail!("attachment not found: {}", path.display());
        }
    }

    let mut agent = Agent::from_settings(&settings)?;
    if let Some(model) = model {
        agent = agent.with_model(&model);
    }
    let max_iterations = max_iterations.unwrap_or(settings.agent.max_iterations);
    if max_iterations == 0 {
        Output::error("max_iterations must be at least 1");
        anyhow::bail!("max_iterations must be at least 1");
    }

    // Log lines and the spinner would interleave
    let spinner = (!verbose).then(|| Output::spinner("Thinking..."));
    let response = agent
        .run_detailed(question, file.as_deref(), max_iterations)
        .await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    if verbose && !response.tool_calls.is_empty() {
        Output::header(&format!("Tool calls ({})", response.tool_calls.len()));
        for call in &response.tool_calls {
            Output::tool_call(&call.name, &call.arguments, &call.result);
        }
    }

    Output::answer(&response.answer);

    match &response.outcome {
        Outcome::Answered => Output::info(&format!(
            "Completed in {} iteration(s) using {}",
            response.iterations,
            agent.config().model
        )),
        Outcome::Exhausted => Output::warning(&format!(
            "No final answer within {} iteration(s)",
            max_iterations
        )),
        Outcome::Failed(reason) => Output::warning(&format!("Run abandoned: {}", reason)),
    }

    Ok(())
}
