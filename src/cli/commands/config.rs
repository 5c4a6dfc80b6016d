//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use anyhow::Result;

/// Run the config command.
pub fn run_config(action: &ConfigAction, settings: Settings) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let toml_str = toml::to_string_pretty(&settings)
                .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;
            println!("{}", toml_str);
        }

        ConfigAction::Set { key, value } => {
            let mut settings = settings;
            apply_set(&mut settings, key, value)?;
            settings.save()?;
            Output::success(&format!("Set {} = {}", key, value));
        }

        ConfigAction::Edit => {
            let config_path = Settings::default_config_path();

            // Create default config if it doesn't exist
            if !config_path.exists() {
                settings.save()?;
                Output::info(&format!("Created default config at {:?}", config_path));
            }

            // Try to open in editor
            let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vim".to_string());

            Output::info(&format!("Opening config in {}...", editor));

            let status = std::process::Command::new(&editor)
                .arg(&config_path)
                .status();

            match status {
                Ok(s) if s.success() => {
                    Output::success("Config saved.");
                }
                Ok(_) => {
                    Output::warning("Editor exited with non-zero status.");
                }
                Err(e) => {
                    Output::error(&format!("Failed to open editor: {}", e));
                    Output::info(&format!("Config file is at: {:?}", config_path));
                }
            }
        }

        ConfigAction::Path => {
            let config_path = Settings::default_config_path();
            println!("{}", config_path.display());
        }
    }

    Ok(())
}

/// Apply a "section.field" assignment to the settings.
fn apply_set(settings: &mut Settings, key: &str, value: &str) -> Result<()> {
    match key {
        "general.log_level" => settings.general.log_level = value.to_string(),
        "gemini.model" => settings.gemini.model = value.to_string(),
        "gemini.base_url" => settings.gemini.base_url = value.to_string(),
        "gemini.timeout_seconds" => settings.gemini.timeout_seconds = value.parse()?,
        "agent.max_rounds" => settings.agent.max_rounds = value.parse()?,
        "workspace.max_read_chars" => settings.workspace.max_read_chars = value.parse()?,
        "workspace.script_timeout_seconds" => {
            settings.workspace.script_timeout_seconds = value.parse()?
        }
        "workspace.python_bin" => settings.workspace.python_bin = value.to_string(),
        _ => anyhow::bail!(
            "Unknown configuration key: {} (see 'ordne config show' for available keys)",
            key
        ),
    }
    Ok(())
}
