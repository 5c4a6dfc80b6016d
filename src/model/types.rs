//! Conversation and wire types for the Gemini API.
//!
//! Field names follow the REST API's camelCase spelling on the wire.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Who produced a piece of conversation content.
///
/// The API only accepts `user` and `model`; function results travel as
/// `user` content whose parts carry a function response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One turn of conversation: a role plus one or more parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub role: Role,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    /// A user turn holding plain text.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::text(text)],
        }
    }

    /// A turn carrying function results back to the model.
    pub fn function_results(responses: Vec<FunctionResponse>) -> Self {
        Self {
            role: Role::User,
            parts: responses.into_iter().map(Part::function_response).collect(),
        }
    }

    /// Concatenated text of all text parts.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect::<Vec<_>>()
            .join("")
    }

    /// All function calls requested in this content, in emission order.
    pub fn function_calls(&self) -> Vec<&FunctionCall> {
        self.parts
            .iter()
            .filter_map(|p| p.function_call.as_ref())
            .collect()
    }
}

/// A single content part. Exactly one field is populated per part.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_response: Option<FunctionResponse>,
}

impl Part {
    /// A plain text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// A part carrying one function result.
    pub fn function_response(response: FunctionResponse) -> Self {
        Self {
            function_response: Some(response),
            ..Default::default()
        }
    }
}

/// A structured request from the model to invoke one named function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: serde_json::Map<String, Value>,
}

/// The payload sent back for one dispatched function call, keyed for
/// the model as either `output` or `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    pub name: String,
    pub response: Value,
}

impl FunctionResponse {
    /// A successful function result.
    pub fn output(name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            response: serde_json::json!({ "output": output.into() }),
        }
    }

    /// A failed function result.
    pub fn error(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            response: serde_json::json!({ "error": message.into() }),
        }
    }
}

/// Schema of one callable function, advertised to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Token accounting returned with each model response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UsageMetadata {
    pub prompt_token_count: u32,
    pub candidates_token_count: u32,
    pub total_token_count: u32,
}
