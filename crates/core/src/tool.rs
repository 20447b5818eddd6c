//! Tool domain types: definitions, typed invocations and the executor seam.
//!
//! The model sends each call as a name plus an opaque JSON object. At the
//! executor boundary that pair is parsed into a [`ToolInvocation`], one
//! variant per known tool with its own argument record, so the rest of the
//! system never handles loosely-typed arguments.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ToolError;

/// Tool names as published to the model.
pub mod names {
    pub const LIST_TOOLS: &str = "list_tools";
    pub const LIST_DIRECTORY: &str = "list_directory";
    pub const READ_FILE: &str = "read_file";
    pub const READ_FILE_LINES: &str = "read_file_lines";
    pub const SEARCH_FILES: &str = "search_files";
    pub const GET_FILE_INFO: &str = "get_file_info";
    pub const CREATE_DIRECTORY: &str = "create_directory";
    pub const MOVE_FILE: &str = "move_file";
    pub const DELETE_FILE: &str = "delete_file";
    pub const STR_REPLACE: &str = "str_replace";
    pub const WRITE_FILE: &str = "write_file";
    pub const RUN_COMMAND: &str = "run_command";
}

/// A tool definition sent to the LLM so it knows what tools it can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PathArgs {
    pub path: String,
}

/// 1-based line range. Either field may arrive as a JSON number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReadFileLinesArgs {
    pub path: String,
    #[serde(deserialize_with = "loose_integer")]
    pub start_line: i64,
    #[serde(deserialize_with = "loose_integer")]
    pub num_lines: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchFilesArgs {
    pub path: String,
    pub pattern: String,
    #[serde(default)]
    pub glob: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MoveFileArgs {
    pub source: String,
    pub destination: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StrReplaceArgs {
    pub path: String,
    pub old_str: String,
    pub new_str: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WriteFileArgs {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RunCommandArgs {
    pub command: String,
    #[serde(default)]
    pub working_dir: Option<String>,
}

/// A parsed, strongly-typed tool call.
///
/// `list_tools` is deliberately absent: it is answered by the agent loop from
/// the active tool set and never reaches an executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolInvocation {
    ListDirectory(PathArgs),
    ReadFile(PathArgs),
    ReadFileLines(ReadFileLinesArgs),
    SearchFiles(SearchFilesArgs),
    GetFileInfo(PathArgs),
    CreateDirectory(PathArgs),
    MoveFile(MoveFileArgs),
    DeleteFile(PathArgs),
    StrReplace(StrReplaceArgs),
    WriteFile(WriteFileArgs),
    RunCommand(RunCommandArgs),
}

impl ToolInvocation {
    /// Parse a tool name and its JSON-encoded arguments.
    pub fn parse(name: &str, arguments: &str) -> Result<Self, ToolError> {
        use names::*;

        // Some servers send an empty string for tools without parameters.
        let arguments = if arguments.trim().is_empty() { "{}" } else { arguments };

        let invocation = match name {
            LIST_DIRECTORY => Self::ListDirectory(args(name, arguments)?),
            READ_FILE => Self::ReadFile(args(name, arguments)?),
            READ_FILE_LINES => Self::ReadFileLines(args(name, arguments)?),
            SEARCH_FILES => Self::SearchFiles(args(name, arguments)?),
            GET_FILE_INFO => Self::GetFileInfo(args(name, arguments)?),
            CREATE_DIRECTORY => Self::CreateDirectory(args(name, arguments)?),
            MOVE_FILE => Self::MoveFile(args(name, arguments)?),
            DELETE_FILE => Self::DeleteFile(args(name, arguments)?),
            STR_REPLACE => Self::StrReplace(args(name, arguments)?),
            WRITE_FILE => Self::WriteFile(args(name, arguments)?),
            RUN_COMMAND => Self::RunCommand(args(name, arguments)?),
            other => return Err(ToolError::UnknownTool(other.to_string())),
        };
        Ok(invocation)
    }

    pub fn name(&self) -> &'static str {
        use names::*;
        match self {
            Self::ListDirectory(_) => LIST_DIRECTORY,
            Self::ReadFile(_) => READ_FILE,
            Self::ReadFileLines(_) => READ_FILE_LINES,
            Self::SearchFiles(_) => SEARCH_FILES,
            Self::GetFileInfo(_) => GET_FILE_INFO,
            Self::CreateDirectory(_) => CREATE_DIRECTORY,
            Self::MoveFile(_) => MOVE_FILE,
            Self::DeleteFile(_) => DELETE_FILE,
            Self::StrReplace(_) => STR_REPLACE,
            Self::WriteFile(_) => WRITE_FILE,
            Self::RunCommand(_) => RUN_COMMAND,
        }
    }
}

fn args<T: for<'de> Deserialize<'de>>(tool: &str, arguments: &str) -> Result<T, ToolError> {
    serde_json::from_str(arguments)
        .map_err(|e| ToolError::InvalidArgument(format!("{tool}: {e}")))
}

fn loose_integer<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose {
        Int(i64),
        Float(f64),
        Str(String),
    }

    match Loose::deserialize(deserializer)? {
        Loose::Int(n) => Ok(n),
        Loose::Float(f) if f.fract() == 0.0 => Ok(f as i64),
        Loose::Float(f) => Err(serde::de::Error::custom(format!("{f} is not an integer"))),
        Loose::Str(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| serde::de::Error::custom(format!("'{s}' is not an integer"))),
    }
}

/// Executes a parsed tool invocation inside a workspace root.
///
/// Implementations must reject any path that escapes `workspace_root` before
/// performing I/O, and must be safe to call repeatedly.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(
        &self,
        invocation: &ToolInvocation,
        workspace_root: &Path,
    ) -> Result<String, ToolError>;

    /// Parse and execute a raw call.
    async fn execute_call(
        &self,
        name: &str,
        arguments: &str,
        workspace_root: &Path,
    ) -> Result<String, ToolError> {
        let invocation = ToolInvocation::parse(name, arguments)?;
        self.execute(&invocation, workspace_root).await
    }
}
