//! gaia - question answering with tools and file attachments
//!
//! A reason-and-act agent: a question, optionally with one attached file, is
//! sent to a language model that may call tools until it emits a final answer
//! or runs out of iterations.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `conversation` - Conversation history exchanged with the model
//! - `backend` - Model and file backends (OpenAI)
//! - `tools` - Tool registry and tool implementations
//! - `agent` - The bounded tool-calling loop, attachments and cleanup
//! - `cli` - Command-line interface and HTTP server
//!
//! # Example
//!
//! ```rust,no_run
//! use gaia_agent::agent::Agent;
//! use gaia_agent::config::Settings;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let agent = Agent::from_settings(&settings)?;
//!
//!     let answer = agent
//!         .run("What is the square root of 1764?", None, settings.agent.max_iterations)
//!         .await;
//!     println!("{}", answer);
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod backend;
pub mod cli;
pub mod config;
pub mod conversation;
pub mod error;
pub mod openai;
pub mod tools;

pub use error::{GaiaError, Result};
