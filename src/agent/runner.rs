//! Agent runner with the function calling loop.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::tools::{dispatch, tool_declarations, FunctionResult};
use crate::error::{OrdneError, Result};
use crate::model::types::{Content, FunctionCall};
use crate::model::ModelClient;
use crate::workspace::Workspace;

/// Default system prompt for the agent.
const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a helpful AI coding agent working inside a fixed project directory.

When the user asks a question or makes a request, plan the function calls
that answer it. You can perform the following operations:

- List files and directories (immediate contents only, so you may need to explore subdirectories)
- Read file contents
- Write or overwrite files
- Run Python scripts

All paths you provide must be relative to the working directory. You do not
need to specify the working directory in your calls; it is injected
automatically for security reasons. When looking for something, list the
root directory first, then explore the subdirectories you find. Be
thorough: users expect complete results across the entire project
structure.

When you have gathered enough information, reply with plain text and no
function calls to finish."#;

/// Default ceiling on model rounds per run.
const DEFAULT_MAX_ROUNDS: usize = 20;

/// Agent that lets the model operate on a workspace through function
/// calls.
pub struct Agent {
    client: Arc<dyn ModelClient>,
    workspace: Workspace,
    system_prompt: String,
    max_rounds: usize,
}

impl Agent {
    /// Create a new agent for the given model client and workspace.
    pub fn new(client: Arc<dyn ModelClient>, workspace: Workspace) -> Self {
        Self {
            client,
            workspace,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    /// Set a custom system prompt.
    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.system_prompt = prompt.to_string();
        self
    }

    /// Set the maximum number of model rounds per run.
    pub fn with_max_rounds(mut self, max: usize) -> Self {
        self.max_rounds = max;
        self
    }

    /// Run the agent on a user prompt until the model answers in plain
    /// text or the round limit is hit.
    ///
    /// Function calls within a round are dispatched strictly in the
    /// order the model emitted them, and every result lands in the
    /// conversation before the next model request.
    pub async fn run(&self, prompt: &str) -> Result<AgentResponse> {
        let tools = tool_declarations();
        let mut conversation = vec![Content::user(prompt)];
        let mut records = Vec::new();
        let mut usage = TokenUsage::default();

        for round in 1..=self.max_rounds {
            debug!("Agent round {}", round);

            let reply = self
                .client
                .generate(&self.system_prompt, &conversation, &tools)
                .await?;

            if let Some(metadata) = reply.usage {
                debug!(
                    "Prompt tokens: {}, response tokens: {}",
                    metadata.prompt_token_count, metadata.candidates_token_count
                );
                usage.prompt_tokens += u64::from(metadata.prompt_token_count);
                usage.response_tokens += u64::from(metadata.candidates_token_count);
            }

            let calls: Vec<FunctionCall> = reply
                .content
                .function_calls()
                .into_iter()
                .cloned()
                .collect();
            let text = reply.content.text();
            conversation.push(reply.content);

            if calls.is_empty() {
                return Ok(AgentResponse {
                    content: text,
                    tool_calls: records,
                    rounds: round,
                    usage,
                });
            }

            let mut responses = Vec::with_capacity(calls.len());
            for call in &calls {
                let result = dispatch(call, &self.workspace).await;
                responses.push(result.to_response());
                records.push(ToolCallRecord::new(call, &result));
            }
            conversation.push(Content::function_results(responses));
        }

        Err(OrdneError::RoundLimit {
            rounds: self.max_rounds,
        })
    }
}

/// Accumulated token counts across a run.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub response_tokens: u64,
}

/// Response from an agent run.
#[derive(Debug)]
pub struct AgentResponse {
    /// The final plain-text answer from the model.
    pub content: String,
    /// Record of all function calls made during the run.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Number of model calls used.
    pub rounds: usize,
    /// Token accounting summed over all rounds.
    pub usage: TokenUsage,
}

/// Record of one function call made by the agent.
#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    /// Name of the function called.
    pub name: String,
    /// JSON arguments the model supplied.
    pub arguments: String,
    /// Result text fed back to the model.
    pub result: String,
    /// Whether the result was an error.
    pub is_error: bool,
}

impl ToolCallRecord {
    fn new(call: &FunctionCall, result: &FunctionResult) -> Self {
        Self {
            name: call.name.clone(),
            arguments: Value::Object(call.args.clone()).to_string(),
            result: result.output.clone(),
            is_error: result.is_error,
        }
    }
}

impl std::fmt::Display for ToolCallRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::{FunctionDeclaration, Part, Role, UsageMetadata};
    use crate::model::ModelReply;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Model stand-in that replays a fixed sequence of turns and records
    /// every conversation it was shown.
    struct ScriptedModel {
        replies: Mutex<Vec<Content>>,
        conversations: Mutex<Vec<Vec<Content>>>,
    }

    impl ScriptedModel {
        fn new(replies: Vec<Content>) -> Self {
            Self {
                replies: Mutex::new(replies),
                conversations: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ModelClient for ScriptedModel {
        async fn generate(
            &self,
            _system: &str,
            conversation: &[Content],
            _tools: &[FunctionDeclaration],
        ) -> Result<ModelReply> {
            self.conversations
                .lock()
                .unwrap()
                .push(conversation.to_vec());
            let content = self.replies.lock().unwrap().remove(0);
            Ok(ModelReply {
                content,
                usage: Some(UsageMetadata {
                    prompt_token_count: 10,
                    candidates_token_count: 5,
                    total_token_count: 15,
                }),
            })
        }
    }

    /// Model stand-in that asks for the same function call forever.
    #[derive(Default)]
    struct LoopingModel {
        generate_calls: Mutex<usize>,
    }

    #[async_trait]
    impl ModelClient for LoopingModel {
        async fn generate(
            &self,
            _system: &str,
            _conversation: &[Content],
            _tools: &[FunctionDeclaration],
        ) -> Result<ModelReply> {
            *self.generate_calls.lock().unwrap() += 1;
            Ok(ModelReply {
                content: model_call("get_files_info", serde_json::json!({})),
                usage: None,
            })
        }
    }

    struct FailingModel;

    #[async_trait]
    impl ModelClient for FailingModel {
        async fn generate(
            &self,
            _system: &str,
            _conversation: &[Content],
            _tools: &[FunctionDeclaration],
        ) -> Result<ModelReply> {
            Err(OrdneError::Model("service unavailable".to_string()))
        }
    }

    fn model_call(name: &str, args: serde_json::Value) -> Content {
        let args = match args {
            serde_json::Value::Object(map) => map,
            _ => panic!("expected an object"),
        };
        Content {
            role: Role::Model,
            parts: vec![Part {
                function_call: Some(FunctionCall {
                    name: name.to_string(),
                    args,
                }),
                ..Default::default()
            }],
        }
    }

    fn model_text(text: &str) -> Content {
        Content {
            role: Role::Model,
            parts: vec![Part::text(text)],
        }
    }

    #[tokio::test]
    async fn test_run_finishes_when_the_model_answers_in_text() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hello.txt"), "hei").unwrap();
        let workspace = Workspace::new(dir.path()).unwrap();

        let model = Arc::new(ScriptedModel::new(vec![
            model_call("get_files_info", serde_json::json!({})),
            model_text("done"),
        ]));
        let agent = Agent::new(model.clone(), workspace);

        let response = agent.run("what files are there?").await.unwrap();
        assert_eq!(response.content, "done");
        assert_eq!(response.rounds, 2);
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].name, "get_files_info");
        assert!(!response.tool_calls[0].is_error);
        assert!(response.tool_calls[0].result.contains("hello.txt"));
        assert_eq!(response.usage.prompt_tokens, 20);
        assert_eq!(response.usage.response_tokens, 10);

        // The second request must carry the model turn followed by its
        // function result, in that order.
        let conversations = model.conversations.lock().unwrap();
        assert_eq!(conversations[0].len(), 1);
        assert_eq!(conversations[1].len(), 3);
        assert_eq!(conversations[1][1].role, Role::Model);
        assert_eq!(conversations[1][2].role, Role::User);
        let part = conversations[1][2].parts[0].function_response.as_ref().unwrap();
        assert_eq!(part.name, "get_files_info");
    }

    #[tokio::test]
    async fn test_run_feeds_error_results_back_to_the_model() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::new(dir.path()).unwrap();

        let model = Arc::new(ScriptedModel::new(vec![
            model_call("frobnicate", serde_json::json!({})),
            model_text("recovered"),
        ]));
        let agent = Agent::new(model.clone(), workspace);

        let response = agent.run("try something odd").await.unwrap();
        assert_eq!(response.content, "recovered");
        assert!(response.tool_calls[0].is_error);

        let conversations = model.conversations.lock().unwrap();
        let part = conversations[1][2].parts[0].function_response.as_ref().unwrap();
        assert_eq!(part.response["error"], "Error: unknown function 'frobnicate'");
    }

    #[tokio::test]
    async fn test_run_stops_at_the_round_limit() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::new(dir.path()).unwrap();

        let model = Arc::new(LoopingModel::default());
        let agent = Agent::new(model.clone(), workspace).with_max_rounds(4);

        let err = agent.run("never finish").await.unwrap_err();
        match err {
            OrdneError::RoundLimit { rounds } => assert_eq!(rounds, 4),
            other => panic!("expected RoundLimit, got {:?}", other),
        }
        assert_eq!(*model.generate_calls.lock().unwrap(), 4);
    }

    #[tokio::test]
    async fn test_run_propagates_model_failures() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::new(dir.path()).unwrap();

        let agent = Agent::new(Arc::new(FailingModel), workspace);
        assert!(matches!(
            agent.run("hi").await.unwrap_err(),
            OrdneError::Model(_)
        ));
    }

    #[test]
    fn test_tool_call_record_display() {
        let record = ToolCallRecord {
            name: "get_file_content".to_string(),
            arguments: r#"{"file_path":"main.py"}"#.to_string(),
            result: "print('hi')".to_string(),
            is_error: false,
        };
        assert_eq!(
            format!("{}", record),
            r#"get_file_content({"file_path":"main.py"})"#
        );
    }
}
