//! File writing tool

use async_trait::async_trait;
use nexus_agent::{Tool, ToolError, ToolOutput};
use serde_json::json;
use std::path::PathBuf;
use tokio::fs;

use super::required_str;
use crate::utils::resolve_path;

/// Tool for writing file contents; reports the written path as modified
pub struct WriteFileTool {
    root: PathBuf,
}

impl WriteFileTool {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write content to a file. Creates the file if it doesn't exist, overwrites if it does. Automatically creates parent directories."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to the file to write (relative or absolute)"
                },
                "content": {
                    "type": "string",
                    "description": "Content to write to the file"
                }
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let path_str = required_str(&args, "path")?;
        let content = required_str(&args, "content")?;

        if path_str == "~" {
            return Err(ToolError::invalid_arguments(
                "Cannot write to home directory itself",
            ));
        }
        let path = resolve_path(&self.root, path_str);
        if path.is_dir() {
            return Err(ToolError::execution(format!(
                "{} is a directory",
                path.display()
            )));
        }

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    ToolError::execution(format!("Failed to create directory: {}", e))
                })?;
            }
        }

        fs::write(&path, content)
            .await
            .map_err(|e| ToolError::execution(format!("Failed to write file: {}", e)))?;

        Ok(ToolOutput::text(format!(
            "Successfully wrote {} bytes to {}",
            content.len(),
            path_str
        ))
        .with_modified_file(path))
    }
}
