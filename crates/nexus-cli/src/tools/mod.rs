//! Built-in tools for the coding agent

mod list;
mod read;
mod shell;
mod write;

pub use list::ListDirectoryTool;
pub use read::ReadFileTool;
pub use shell::RunShellTool;
pub use write::WriteFileTool;

use nexus_agent::{BoxedTool, ToolError};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// All built-in tools, rooted at `working_directory`
pub fn builtin_tools(working_directory: PathBuf, shell_timeout: Duration) -> Vec<BoxedTool> {
    vec![
        Arc::new(ReadFileTool::new(working_directory.clone())),
        Arc::new(WriteFileTool::new(working_directory.clone())),
        Arc::new(ListDirectoryTool::new(working_directory.clone())),
        Arc::new(RunShellTool::new(working_directory, shell_timeout)),
    ]
}

/// Required string argument. Schema validation runs first, so a miss here
/// means the schema and the tool disagree.
fn required_str<'a>(args: &'a serde_json::Value, key: &str) -> Result<&'a str, ToolError> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ToolError::invalid_arguments(format!("missing '{}' argument", key)))
}
