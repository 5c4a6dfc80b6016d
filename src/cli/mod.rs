//! CLI module for Ordne.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Ordne - AI coding agent for your project directory
///
/// A CLI tool that lets a Gemini model read, write, and run code inside one
/// working directory. The name "Ordne" comes from the Norwegian word for
/// "to sort out."
#[derive(Parser, Debug)]
#[command(name = "ordne")]
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
    /// Run the agent on a task
    Run {
        /// The request or question for the agent (e.g., "fix the bug in main.py")
        prompt: String,

        /// Directory the agent works in (defaults to the current directory)
        #[arg(short, long)]
        dir: Option<String>,

        /// Model to use for this run
        #[arg(short, long)]
        model: Option<String>,

        /// Maximum number of model rounds before giving up
        #[arg(long)]
        max_rounds: Option<usize>,
    },

    /// Check system requirements and configuration
    Doctor,

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

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "gemini.model")
        key: String,
        /// Configuration value
        value: String,
    },

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
