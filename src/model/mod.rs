//! Model service abstraction and the Gemini implementation.
//!
//! The agent loop only depends on [`ModelClient`], which keeps it
//! testable with a scripted stand-in.

mod gemini;
pub mod types;

pub use gemini::{GeminiClient, DEFAULT_BASE_URL};

use async_trait::async_trait;

use crate::error::Result;
use types::{Content, FunctionDeclaration, UsageMetadata};

/// One model turn: the content to append to the conversation, plus token
/// accounting when the service reports it.
#[derive(Debug, Clone)]
pub struct ModelReply {
    pub content: Content,
    pub usage: Option<UsageMetadata>,
}

/// Abstraction over the conversational model service.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Requests the next model turn for the given conversation.
    async fn generate(
        &self,
        system: &str,
        conversation: &[Content],
        tools: &[FunctionDeclaration],
    ) -> Result<ModelReply>;
}
