//! Doctor command - verify system requirements and configuration.

use crate::cli::Output;
use crate::config::Settings;
use console::style;
use std::process::Command;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("Ordne Doctor");
    println!();
    println!("Checking system requirements and configuration...\n");

    let mut checks = Vec::new();

    // Check the Python interpreter used by run_python_file
    println!("{}", style("Python Interpreter").bold());
    let python_check = check_python(&settings.workspace.python_bin);
    python_check.print();
    checks.push(python_check);

    println!();

    // Check API keys
    println!("{}", style("API Configuration").bold());
    let api_check = check_gemini_api_key();
    api_check.print();
    checks.push(api_check);

    println!();

    // Check configuration
    println!("{}", style("Configuration").bold());
    let config_check = check_config_file();
    config_check.print();
    checks.push(config_check);

    println!();

    // Summary
    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Ordne.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!(
            "All checks passed with {} warning(s).",
            warnings
        ));
    } else {
        Output::success("All checks passed! Ordne is ready to use.");
    }

    Ok(())
}

/// Check if the configured Python interpreter is available.
///
/// Missing interpreters are warnings, not errors: only run_python_file
/// needs one.
fn check_python(bin: &str) -> CheckResult {
    match Command::new(bin).arg("--version").output() {
        Ok(output) if output.status.success() => {
            // Try to extract version from first line
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .unwrap_or("installed")
                .trim()
                .to_string();

            // Truncate long version strings
            let version_display = if version.len() > 50 {
                format!("{}...", &version[..50])
            } else {
                version
            };

            CheckResult::ok(bin, &version_display)
        }
        Ok(_) => CheckResult::warning(bin, "installed but not working", install_hint_python()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => CheckResult::warning(
            bin,
            "not found (run_python_file will return errors)",
            install_hint_python(),
        ),
        Err(e) => CheckResult::warning(bin, &format!("error: {}", e), install_hint_python()),
    }
}

/// Check if the Gemini API key is configured.
fn check_gemini_api_key() -> CheckResult {
    match std::env::var("GEMINI_API_KEY") {
        Ok(key) if key.starts_with("AIza") && key.len() > 20 => {
            let masked = format!("{}...{}", &key[..7], &key[key.len() - 4..]);
            CheckResult::ok("GEMINI_API_KEY", &format!("configured ({})", masked))
        }
        Ok(key) if key.is_empty() => CheckResult::error(
            "GEMINI_API_KEY",
            "empty",
            "Set with: export GEMINI_API_KEY='...'",
        ),
        Ok(_) => CheckResult::warning(
            "GEMINI_API_KEY",
            "set but format looks unusual",
            "Expected format: AIza... (Google AI Studio key)",
        ),
        Err(_) => CheckResult::error(
            "GEMINI_API_KEY",
            "not set",
            "Set with: export GEMINI_API_KEY='...'",
        ),
    }
}

/// Check if config file exists.
fn check_config_file() -> CheckResult {
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: ordne config edit",
        )
    }
}

/// Platform-specific install hint for Python.
fn install_hint_python() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install python3"
    } else if cfg!(target_os = "linux") {
        "Install with: sudo apt install python3 (or your package manager)"
    } else {
        "Install from: https://www.python.org/downloads/"
    }
}
