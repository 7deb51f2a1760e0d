//! CLI module for gaia.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// gaia - question answering with tools and file attachments
///
/// Sends a question, and optionally a file, to a language model that can call
/// a calculator, web search, Wikipedia, a web page reader and a video
/// analyzer until it settles on a final answer.
#[derive(Parser, Debug)]
#[command(name = "gaia")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask a question and print the final answer
    Ask {
        /// The question to answer
        #[arg(short, long)]
        question: String,

        /// File to attach (audio is transcribed, images are shown to the model,
        /// anything else is made available to code execution)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Model to use for the reasoning loop
        #[arg(short, long)]
        model: Option<String>,

        /// Maximum number of model requests before giving up
        #[arg(short = 'n', long, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
        max_iterations: Option<usize>,
    },

    /// Start HTTP API server for integration with other systems
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },

    /// Delete every uploaded file and container owned by the API key
    Purge {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}
