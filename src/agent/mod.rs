//! Question-answering agent.
//!
//! The [`Agent`] runs a bounded reason-and-act loop against a model backend:
//! the model either answers or asks for tool calls, the agent runs them and
//! feeds the results back. An optional file attachment is ingested first and
//! any remote resources it needed are released when the run ends.

mod ingest;
mod resources;
mod runner;

#[cfg(test)]
pub(crate) mod testing;

pub use ingest::{FileIngestor, Ingestion, Strategy, AUDIO_EXTENSIONS, IMAGE_EXTENSIONS};
pub use resources::{collect_owned, purge_owned, ReleaseReport, ResourceTracker};
pub use runner::{
    extract_final_answer, Agent, AgentConfig, AgentResponse, Outcome, ToolCallRecord,
    FINAL_ANSWER_MARKER, NO_ANSWER,
};
