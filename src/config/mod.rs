//! Configuration module for Ordne.
//!
//! Handles loading and managing application settings.

mod settings;

pub use settings::{AgentSettings, GeminiSettings, GeneralSettings, Settings, WorkspaceSettings};
