//! List directory tool

use async_trait::async_trait;
use nexus_agent::{Tool, ToolError, ToolOutput};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

use crate::utils::resolve_path;

const DEFAULT_LIMIT: usize = 100;
const SKIPPED_DIRS: [&str; 3] = ["node_modules", "target", ".git"];

/// Tool for listing directory contents
pub struct ListDirectoryTool {
    root: PathBuf,
}

impl ListDirectoryTool {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

#[derive(Clone, Copy)]
struct ListOptions {
    show_hidden: bool,
    limit: usize,
}

#[async_trait]
impl Tool for ListDirectoryTool {
    fn name(&self) -> &str {
        "list_directory"
    }

    fn description(&self) -> &str {
        "List contents of a directory with file sizes. Defaults to the working directory."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Directory path to list (defaults to the working directory)"
                },
                "recursive": {
                    "type": "boolean",
                    "description": "Whether to list recursively (default: false)"
                },
                "show_hidden": {
                    "type": "boolean",
                    "description": "Whether to show hidden files (default: false)"
                },
                "limit": {
                    "type": "integer",
                    "minimum": 1,
                    "description": "Maximum number of entries to return (default: 100)"
                }
            }
        })
    }

    async fn execute(&self, args: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let path = match args.get("path").and_then(|v| v.as_str()) {
            Some(p) => resolve_path(&self.root, p),
            None => self.root.clone(),
        };
        let recursive = args
            .get("recursive")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        let options = ListOptions {
            show_hidden: args
                .get("show_hidden")
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
            limit: args
                .get("limit")
                .and_then(|v| v.as_u64())
                .map(|l| l as usize)
                .unwrap_or(DEFAULT_LIMIT),
        };

        if !path.exists() {
            return Err(ToolError::execution(format!(
                "Path does not exist: {}",
                path.display()
            )));
        }
        if !path.is_dir() {
            return Err(ToolError::execution(format!(
                "Path is not a directory: {}",
                path.display()
            )));
        }

        // Directory walks are blocking; keep them off the runtime threads.
        let entries = tokio::task::spawn_blocking(move || {
            let mut entries = Vec::new();
            collect(&path, &path, recursive, options, &mut entries)?;
            Ok::<_, std::io::Error>(entries)
        })
        .await
        .map_err(|e| ToolError::execution(format!("Listing task failed: {}", e)))?
        .map_err(|e| ToolError::execution(format!("Error reading directory: {}", e)))?;

        if entries.is_empty() {
            return Ok(ToolOutput::text("(empty directory)"));
        }

        let mut output = entries.join("\n");
        if entries.len() >= options.limit {
            output.push_str(&format!("\n\n(showing first {} entries)", options.limit));
        }
        Ok(ToolOutput::text(output))
    }
}

fn collect(
    base: &Path,
    path: &Path,
    recursive: bool,
    options: ListOptions,
    entries: &mut Vec<String>,
) -> std::io::Result<()> {
    let mut items: Vec<_> = fs::read_dir(path)?.flatten().collect();
    items.sort_by_key(|e| e.path());

    for entry in items {
        if entries.len() >= options.limit {
            break;
        }

        let name = entry.file_name().to_string_lossy().to_string();
        if !options.show_hidden && name.starts_with('.') {
            continue;
        }
        if recursive && SKIPPED_DIRS.contains(&name.as_str()) {
            continue;
        }

        let full_path = entry.path();
        let relative = full_path.strip_prefix(base).unwrap_or(&full_path);
        entries.push(format_entry(
            &relative.to_string_lossy(),
            &full_path,
            entry.metadata().ok().as_ref(),
        ));

        if recursive && full_path.is_dir() {
            // Unreadable subdirectories are skipped rather than failing the listing
            let _ = collect(base, &full_path, recursive, options, entries);
        }
    }
    Ok(())
}

fn format_entry(name: &str, path: &Path, metadata: Option<&fs::Metadata>) -> String {
    let type_indicator = if path.is_dir() { "/" } else { "" };

    match metadata {
        Some(m) => {
            let size = if path.is_file() {
                format_size(m.len())
            } else {
                "-".to_string()
            };
            format!("{}{}\t{}", name, type_indicator, size)
        }
        None => format!("{}{}", name, type_indicator),
    }
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1}G", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1}M", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1}K", bytes as f64 / KB as f64)
    } else {
        format!("{}B", bytes)
    }
}
