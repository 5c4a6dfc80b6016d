//! Ordne - AI coding agent for a single working directory
//!
//! A CLI tool that lets a Gemini model read, write, and run code inside one
//! sandboxed project directory through a small set of functions.
//!
//! The name "Ordne" comes from the Norwegian word for "to sort out" or
//! "to put in order."
//!
//! # Overview
//!
//! Ordne allows you to:
//! - Ask an AI agent to explore, explain, and modify the files of a project
//! - Let the model run Python scripts with captured output and a hard timeout
//! - Keep every file operation confined to the chosen working directory
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `workspace` - The sandboxed working directory and its file operations
//! - `model` - Model service abstraction and the Gemini client
//! - `agent` - The function-calling loop
//! - `cli` - Command-line interface
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use ordne::agent::Agent;
//! use ordne::config::Settings;
//! use ordne::model::GeminiClient;
//! use ordne::workspace::Workspace;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let api_key = std::env::var("GEMINI_API_KEY")?;
//!
//!     let workspace = Workspace::new(".")?;
//!     let client = GeminiClient::new(api_key, &settings.gemini)?;
//!     let agent = Agent::new(Arc::new(client), workspace);
//!
//!     let response = agent.run("List the Python files in this project").await?;
//!     println!("{}", response.content);
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod workspace;

pub use error::{OrdneError, Result};
