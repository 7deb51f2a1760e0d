//! Purge command implementation.

use crate::agent::collect_owned;
use crate::backend::{OpenAiBackend, ResourceKind};
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;
use chrono::Local;
use std::io::{BufRead, Write};

/// Run the purge command.
pub async fn run_purge(yes: bool, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Purge) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let backend = OpenAiBackend::new(&settings)?;

    let spinner = Output::spinner("Listing remote resources...");
    let listed = collect_owned(&backend).await;
    spinner.finish_and_clear();
    let tracker = listed?;

    Output::header("Remote resources owned by this API key");
    Output::kv("Files", &tracker.count(ResourceKind::File).to_string());
    Output::kv("Containers", &tracker.count(ResourceKind::Container).to_string());

    if tracker.is_empty() {
        Output::success("Nothing to delete.");
        return Ok(());
    }

    Output::warning(
        "This deletes every file and container owned by the key, including those of \
        runs in progress elsewhere.",
    );
    if !yes && !confirm("Delete them all?")? {
        Output::info("Aborted.");
        return Ok(());
    }

    let started = Local::now();
    let spinner = Output::spinner(&format!("Deleting {} resources...", tracker.len()));
    let report = tracker.release(&backend).await;
    spinner.finish_and_clear();

    Output::kv("Deleted", &report.deleted.to_string());
    Output::kv("Failed", &report.failed.to_string());
    Output::kv(
        "Took",
        &format!("{:.1}s", (Local::now() - started).num_milliseconds() as f64 / 1000.0),
    );

    if report.failed > 0 {
        Output::warning("Some deletions failed; run with -v for details.");
    } else {
        Output::success(&format!(
            "Purged at {}",
            started.format("%Y-%m-%d %H:%M:%S")
        ));
    }

    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(is_yes(&line))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes(""));
        assert!(!is_yes("no"));
    }
}
