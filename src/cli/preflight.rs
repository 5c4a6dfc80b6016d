//! Pre-flight checks before expensive operations.
//!
//! Validates that required configuration is available before starting
//! operations that would otherwise fail midway.

use crate::error::{OrdneError, Result};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Running the agent requires an API key.
    Run,
    /// Doctor reports problems instead of failing on them.
    Doctor,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation) -> Result<()> {
    match operation {
        Operation::Run => {
            check_api_key()?;
        }
        Operation::Doctor => {
            // No requirements; doctor diagnoses whatever is missing
        }
    }
    Ok(())
}

/// Check if the Gemini API key is configured.
fn check_api_key() -> Result<()> {
    match std::env::var("GEMINI_API_KEY") {
        Ok(key) if !key.is_empty() => Ok(()),
        Ok(_) => Err(OrdneError::Config(
            "GEMINI_API_KEY is empty. Set it with: export GEMINI_API_KEY='...'".to_string(),
        )),
        Err(_) => Err(OrdneError::Config(
            "GEMINI_API_KEY not set. Set it with: export GEMINI_API_KEY='...'".to_string(),
        )),
    }
}
