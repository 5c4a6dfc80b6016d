//! Configuration settings for Ordne.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub gemini: GeminiSettings,
    pub agent: AgentSettings,
    pub workspace: WorkspaceSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Log level used when no -v flag is given (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
        }
    }
}

/// Gemini API settings.
///
/// The API key is deliberately not part of the file; it comes from the
/// `GEMINI_API_KEY` environment variable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiSettings {
    /// Model to use for agent runs.
    pub model: String,
    /// API endpoint base URL.
    pub base_url: String,
    /// HTTP timeout for a single generateContent request, in seconds.
    pub timeout_seconds: u64,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            base_url: crate::model::DEFAULT_BASE_URL.to_string(),
            timeout_seconds: 120,
        }
    }
}

/// Agent loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Maximum number of model rounds per run.
    pub max_rounds: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self { max_rounds: 20 }
    }
}

/// Limits for operations inside the working directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceSettings {
    /// Maximum characters returned when reading a file.
    pub max_read_chars: usize,
    /// Wall-clock limit for a script run, in seconds.
    pub script_timeout_seconds: u64,
    /// Interpreter binary used to run Python scripts.
    pub python_bin: String,
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self {
            max_read_chars: crate::workspace::DEFAULT_MAX_READ_CHARS,
            script_timeout_seconds: crate::workspace::DEFAULT_SCRIPT_TIMEOUT.as_secs(),
            python_bin: crate::workspace::DEFAULT_PYTHON_BIN.to_string(),
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or the default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::OrdneError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ordne")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_apply_for_missing_sections() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(settings.gemini.model, "gemini-2.5-flash");
        assert_eq!(settings.agent.max_rounds, 20);
        assert_eq!(settings.workspace.max_read_chars, 10_000);
        assert_eq!(settings.workspace.script_timeout_seconds, 30);
        assert_eq!(settings.workspace.python_bin, "python3");
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let settings: Settings = toml::from_str("[agent]\nmax_rounds = 5\n").unwrap();
        assert_eq!(settings.agent.max_rounds, 5);
        assert_eq!(settings.workspace.max_read_chars, 10_000);
    }
}
