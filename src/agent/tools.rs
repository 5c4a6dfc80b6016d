//! The callable functions and the dispatcher that executes them.

use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::model::types::{FunctionCall, FunctionDeclaration, FunctionResponse};
use crate::workspace::{Workspace, WorkspaceError};

/// A validated function call, one variant per supported function.
///
/// Adding or removing a function is a compile-time change here rather
/// than a string-keyed lookup at the call sites.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    /// List the immediate contents of a directory.
    GetFilesInfo { directory: Option<String> },

    /// Read a file as text.
    GetFileContent { file_path: String },

    /// Write or overwrite a file.
    WriteFile { file_path: String, content: String },

    /// Run a Python script with optional CLI arguments.
    RunPythonFile {
        file_path: String,
        args: Vec<String>,
    },
}

/// Outcome of one dispatched function call, fed back to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionResult {
    /// Name of the function that produced the result.
    pub name: String,
    /// Result text: function output, or an error message the model can
    /// react to.
    pub output: String,
    /// Whether `output` describes a failure.
    pub is_error: bool,
}

impl FunctionResult {
    /// A successful result.
    pub fn success(name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            output: output.into(),
            is_error: false,
        }
    }

    /// A failed result. The message carries the `Error: ` prefix the
    /// model is taught to recognize.
    pub fn error(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            output: message.into(),
            is_error: true,
        }
    }

    /// Wire form of this result for the conversation.
    pub fn to_response(&self) -> FunctionResponse {
        if self.is_error {
            FunctionResponse::error(self.name.as_str(), self.output.as_str())
        } else {
            FunctionResponse::output(self.name.as_str(), self.output.as_str())
        }
    }
}

/// Executes one model-issued function call against the workspace.
///
/// Every failure mode (unknown name, bad argument shape, workspace
/// errors, non-zero script exits) becomes an error result for the
/// conversation. This boundary never returns a library error.
pub async fn dispatch(call: &FunctionCall, workspace: &Workspace) -> FunctionResult {
    info!(
        "Agent calling function: {} with args: {}",
        call.name,
        serde_json::Value::Object(call.args.clone())
    );

    let result = match parse_tool_call(&call.name, &call.args) {
        Ok(tool) => match execute(&tool, workspace).await {
            Ok((output, failed)) => FunctionResult {
                name: call.name.clone(),
                output,
                is_error: failed,
            },
            Err(e) => FunctionResult::error(call.name.as_str(), format!("Error: {}", e)),
        },
        Err(message) => FunctionResult::error(call.name.as_str(), format!("Error: {}", message)),
    };

    debug!(
        "Function result: {} chars, error: {}",
        result.output.chars().count(),
        result.is_error
    );
    result
}

/// Runs a parsed call, returning the output text plus whether it
/// describes a failure. Scripts that exit non-zero report their output
/// with the failure flag set.
async fn execute(tool: &ToolCall, workspace: &Workspace) -> Result<(String, bool), WorkspaceError> {
    match tool {
        ToolCall::GetFilesInfo { directory } => workspace
            .list_directory(directory.as_deref())
            .map(|listing| (listing, false)),
        ToolCall::GetFileContent { file_path } => workspace
            .read_file(file_path)
            .map(|content| (content, false)),
        ToolCall::WriteFile { file_path, content } => workspace
            .write_file(file_path, content)
            .map(|message| (message, false)),
        ToolCall::RunPythonFile { file_path, args } => workspace
            .run_python_file(file_path, args)
            .await
            .map(|output| (output.to_string(), output.is_failure())),
    }
}

/// Parse a function call from the model's name and argument mapping.
///
/// Errors are plain messages destined for the model, not library errors;
/// a hallucinated name or a malformed argument must stay recoverable.
pub fn parse_tool_call(name: &str, args: &Map<String, Value>) -> Result<ToolCall, String> {
    match name {
        "get_files_info" => {
            let directory = match args.get("directory") {
                Some(value) => Some(
                    value
                        .as_str()
                        .ok_or_else(|| {
                            "'directory' argument for get_files_info must be a string".to_string()
                        })?
                        .to_string(),
                ),
                None => None,
            };
            Ok(ToolCall::GetFilesInfo { directory })
        }
        "get_file_content" => {
            let file_path = args
                .get("file_path")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    "missing or invalid 'file_path' argument for get_file_content".to_string()
                })?
                .to_string();
            Ok(ToolCall::GetFileContent { file_path })
        }
        "write_file" => {
            let file_path = args
                .get("file_path")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    "missing or invalid 'file_path' argument for write_file".to_string()
                })?
                .to_string();
            let content = args
                .get("content")
                .and_then(Value::as_str)
                .ok_or_else(|| "missing or invalid 'content' argument for write_file".to_string())?
                .to_string();
            Ok(ToolCall::WriteFile { file_path, content })
        }
        "run_python_file" => {
            let file_path = args
                .get("file_path")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    "missing or invalid 'file_path' argument for run_python_file".to_string()
                })?
                .to_string();
            let args = match args.get("args") {
                Some(value) => value
                    .as_array()
                    .ok_or_else(|| {
                        "'args' argument for run_python_file must be an array of strings"
                            .to_string()
                    })?
                    .iter()
                    .map(|v| {
                        v.as_str().map(str::to_string).ok_or_else(|| {
                            "'args' argument for run_python_file must be an array of strings"
                                .to_string()
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?,
                None => Vec::new(),
            };
            Ok(ToolCall::RunPythonFile { file_path, args })
        }
        _ => Err(format!("unknown function '{}'", name)),
    }
}

/// Function declarations advertised to the model.
pub fn tool_declarations() -> Vec<FunctionDeclaration> {
    vec![
        FunctionDeclaration {
            name: "get_files_info".to_string(),
            description: "Lists files in the specified directory along with their sizes, \
                constrained to the working directory."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "directory": {
                        "type": "string",
                        "description": "The directory to list files from, relative to the \
                            working directory. If not provided, lists files in the working \
                            directory itself."
                    }
                }
            }),
        },
        FunctionDeclaration {
            name: "get_file_content".to_string(),
            description: "Gets the contents of the given file as a string, constrained to \
                the working directory. Long files are truncated."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "file_path": {
                        "type": "string",
                        "description": "The path to the file, relative to the working directory."
                    }
                },
                "required": ["file_path"]
            }),
        },
        FunctionDeclaration {
            name: "write_file".to_string(),
            description: "Writes or overwrites a file with the given content, creating \
                parent directories as needed. Constrained to the working directory."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "file_path": {
                        "type": "string",
                        "description": "Path to the file to write, relative to the working directory."
                    },
                    "content": {
                        "type": "string",
                        "description": "The content to write to the file, as a string."
                    }
                },
                "required": ["file_path", "content"]
            }),
        },
        FunctionDeclaration {
            name: "run_python_file".to_string(),
            description: "Runs a Python file with the Python interpreter, constrained to \
                the working directory. Accepts additional CLI args as an optional array."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "file_path": {
                        "type": "string",
                        "description": "The file to run, relative to the working directory."
                    },
                    "args": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "An optional array of strings to be used as the CLI \
                            args for the Python file."
                    }
                },
                "required": ["file_path"]
            }),
        },
    ]
}
