//! Run command implementation.

use crate::agent::Agent;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::model::GeminiClient;
use crate::workspace::Workspace;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

/// Run the agent on a user prompt.
pub async fn run_agent(
    prompt: &str,
    dir: Option<String>,
    model: Option<String>,
    max_rounds: Option<usize>,
    verbose: bool,
    settings: Settings,
) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Run) {
        Output::error(&format!("{}", e));
        Output::info("Run 'ordne doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    // Pre-flight guarantees the key is present and non-empty
    let api_key = std::env::var("GEMINI_API_KEY")?;

    let root = match dir {
        Some(d) => Settings::expand_path(&d),
        None => std::env::current_dir()?,
    };
    let workspace = Workspace::new(&root)?
        .with_max_read_chars(settings.workspace.max_read_chars)
        .with_script_timeout(Duration::from_secs(
            settings.workspace.script_timeout_seconds,
        ))
        .with_python_bin(settings.workspace.python_bin.as_str());

    let mut client = GeminiClient::new(api_key, &settings.gemini)?;
    if let Some(model) = model {
        client = client.with_model(model);
    }

    // Create and run agent
    let agent = Agent::new(Arc::new(client), workspace)
        .with_max_rounds(max_rounds.unwrap_or(settings.agent.max_rounds));

    let spinner = Output::spinner("Agent working...");

    match agent.run(prompt).await {
        Ok(response) => {
            spinner.finish_and_clear();

            // Show the agent's answer
            println!("\n{}\n", response.content);

            // Show function calls summary
            if !response.tool_calls.is_empty() {
                Output::header(&format!("Function calls ({})", response.tool_calls.len()));
                for call in &response.tool_calls {
                    let status = if call.is_error { " [error]" } else { "" };
                    Output::info(&format!(
                        "  {} {}{}",
                        call.name,
                        truncate(&call.arguments, 60),
                        status
                    ));
                }
                println!();
            }

            if verbose {
                Output::kv("Prompt tokens", &response.usage.prompt_tokens.to_string());
                Output::kv(
                    "Response tokens",
                    &response.usage.response_tokens.to_string(),
                );
            }

            Output::info(&format!("Completed in {} round(s)", response.rounds));
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Agent failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
