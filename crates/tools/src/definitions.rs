//! Tool schemas published to the model, and the per-mode tool sets.

use qogito_core::mode::Mode;
use qogito_core::tool::{ToolDefinition, names};
use serde_json::json;

use crate::file_read::MAX_READ_CHARS;

fn definition(name: &str, description: &str, parameters: serde_json::Value) -> ToolDefinition {
    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        parameters,
    }
}

fn object(properties: serde_json::Value, required: &[&str]) -> serde_json::Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

fn string_param(description: &str) -> serde_json::Value {
    json!({ "type": "string", "description": description })
}

pub fn list_tools() -> ToolDefinition {
    definition(
        names::LIST_TOOLS,
        "List the names of all tools currently available to you. Always call this tool first \
         before responding to any user request, to confirm you have the tools needed to fulfil it.",
        object(json!({}), &[]),
    )
}

pub fn list_directory() -> ToolDefinition {
    definition(
        names::LIST_DIRECTORY,
        "Get a detailed listing of all files and directories in a specified path. \
         Directories are indicated with a trailing /.",
        object(
            json!({ "path": string_param("Absolute path to the directory to list.") }),
            &["path"],
        ),
    )
}

pub fn read_file() -> ToolDefinition {
    definition(
        names::READ_FILE,
        &format!(
            "Read the contents of a file. Large files are truncated at {MAX_READ_CHARS} characters; \
             use read_file_lines to read specific ranges of large files."
        ),
        object(
            json!({ "path": string_param("Absolute path to the file to read.") }),
            &["path"],
        ),
    )
}

pub fn read_file_lines() -> ToolDefinition {
    definition(
        names::READ_FILE_LINES,
        "Read a range of lines from a file. Line numbers are 1-based.",
        object(
            json!({
                "path": string_param("Absolute path to the file to read."),
                "start_line": string_param("Line number to start reading from (1-based)."),
                "num_lines": string_param("Number of lines to read."),
            }),
            &["path", "start_line", "num_lines"],
        ),
    )
}

pub fn search_files() -> ToolDefinition {
    definition(
        names::SEARCH_FILES,
        "Search for a regex pattern across files in a directory. Returns matching lines as \
         path:line:content.",
        object(
            json!({
                "path": string_param("Absolute path to the directory to search in."),
                "pattern": string_param("Regular expression pattern to search for."),
                "glob": string_param(
                    "Optional filename glob to restrict which files are searched, e.g. \"*.rs\"."
                ),
            }),
            &["path", "pattern"],
        ),
    )
}

pub fn get_file_info() -> ToolDefinition {
    definition(
        names::GET_FILE_INFO,
        "Get metadata for a file or directory: type, size, and last modified time.",
        object(
            json!({ "path": string_param("Absolute path to the file or directory.") }),
            &["path"],
        ),
    )
}

pub fn create_directory() -> ToolDefinition {
    definition(
        names::CREATE_DIRECTORY,
        "Create a directory and any missing parent directories.",
        object(
            json!({ "path": string_param("Absolute path of the directory to create.") }),
            &["path"],
        ),
    )
}

pub fn move_file() -> ToolDefinition {
    definition(
        names::MOVE_FILE,
        "Move or rename a file or directory.",
        object(
            json!({
                "source": string_param("Absolute path of the file or directory to move."),
                "destination": string_param("Absolute destination path."),
            }),
            &["source", "destination"],
        ),
    )
}

pub fn delete_file() -> ToolDefinition {
    definition(
        names::DELETE_FILE,
        "Delete a file.",
        object(
            json!({ "path": string_param("Absolute path to the file to delete.") }),
            &["path"],
        ),
    )
}

pub fn str_replace() -> ToolDefinition {
    definition(
        names::STR_REPLACE,
        "Replace an exact string in a file with new content. old_str must match exactly once in \
         the file, including whitespace and indentation.",
        object(
            json!({
                "path": string_param("Absolute path to the file to edit."),
                "old_str": string_param("The exact string to find and replace."),
                "new_str": string_param("The string to replace it with."),
            }),
            &["path", "old_str", "new_str"],
        ),
    )
}

pub fn write_file() -> ToolDefinition {
    definition(
        names::WRITE_FILE,
        "Create a new file or overwrite an existing file with new content.",
        object(
            json!({
                "path": string_param("Absolute path to the file to write."),
                "content": string_param("Text content to write to the file."),
            }),
            &["path", "content"],
        ),
    )
}

pub fn run_command() -> ToolDefinition {
    definition(
        names::RUN_COMMAND,
        "Execute a shell command. Use this as a LAST RESORT only — prefer dedicated tools for all \
         file operations (search_files, read_file, write_file, str_replace, list_directory, etc.). \
         Do not use this tool to invoke grep, find, cat, ls, cp, mv, rm, or any operation already \
         covered by the available tools. Every invocation requires explicit user approval before \
         it runs.",
        object(
            json!({
                "command": string_param("The shell command to execute."),
                "working_dir": string_param(
                    "Working directory for the command. Defaults to the workspace root."
                ),
            }),
            &["command"],
        ),
    )
}

/// Read-only tools available in passive mode.
pub fn passive_tools() -> Vec<ToolDefinition> {
    vec![
        list_tools(),
        list_directory(),
        read_file(),
        read_file_lines(),
        search_files(),
        get_file_info(),
    ]
}

/// Passive tools plus mutation tools; `run_command` only when allowed.
pub fn active_tools(allow_run_command: bool) -> Vec<ToolDefinition> {
    let mut tools = passive_tools();
    tools.extend([
        create_directory(),
        move_file(),
        delete_file(),
        str_replace(),
        write_file(),
    ]);
    if allow_run_command {
        tools.push(run_command());
    }
    tools
}

/// The tool set offered to the model in `mode`.
pub fn tools_for_mode(mode: Mode, allow_run_command: bool) -> Vec<ToolDefinition> {
    match mode {
        Mode::Passive => passive_tools(),
        Mode::Active => active_tools(allow_run_command),
    }
}
