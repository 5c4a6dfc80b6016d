//! REST client for the Gemini `generateContent` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::types::{Content, FunctionDeclaration, UsageMetadata};
use super::{ModelClient, ModelReply};
use crate::config::GeminiSettings;
use crate::error::{OrdneError, Result};

/// Default Gemini API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Client for Google's Gemini API.
///
/// Issues one `generateContent` request per call with no retry; a
/// transient service failure fails the run.
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: &'a [Content],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolConfig<'a>>,
    system_instruction: SystemInstruction<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolConfig<'a> {
    function_declarations: &'a [FunctionDeclaration],
}

#[derive(Serialize)]
struct SystemInstruction<'a> {
    parts: Vec<TextPart<'a>>,
}

#[derive(Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GeminiClient {
    /// Creates a client from the `[gemini]` settings section.
    ///
    /// The API key comes from the environment, never the settings file.
    pub fn new(api_key: impl Into<String>, settings: &GeminiSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()?;

        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: settings.model.clone(),
        })
    }

    /// Overrides the model name for this client.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn generate(
        &self,
        system: &str,
        conversation: &[Content],
        tools: &[FunctionDeclaration],
    ) -> Result<ModelReply> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let request = GenerateRequest {
            contents: conversation,
            tools: if tools.is_empty() {
                Vec::new()
            } else {
                vec![ToolConfig {
                    function_declarations: tools,
                }]
            },
            system_instruction: SystemInstruction {
                parts: vec![TextPart { text: system }],
            },
        };

        debug!(
            "Requesting completion from {} ({} conversation turns)",
            self.model,
            conversation.len()
        );

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OrdneError::Model(format!(
                "Gemini API returned {}: {}",
                status,
                snippet(&body)
            )));
        }

        let reply: GenerateResponse = response.json().await?;
        let content = reply
            .candidates
            .into_iter()
            .find_map(|c| c.content)
            .ok_or_else(|| OrdneError::Model("response contained no candidates".to_string()))?;

        Ok(ModelReply {
            content,
            usage: reply.usage_metadata,
        })
    }
}

/// Shortens an error body so one bad response does not flood the logs.
fn snippet(body: &str) -> String {
    match body.char_indices().nth(600) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}
