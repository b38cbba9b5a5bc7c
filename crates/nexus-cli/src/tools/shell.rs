//! Shell command execution tool

use async_trait::async_trait;
use nexus_agent::{Tool, ToolError, ToolOutput};
use serde_json::json;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

use super::required_str;

/// Maximum output size in bytes before truncation
const MAX_OUTPUT_SIZE: usize = 100_000; // 100KB
/// Maximum number of lines before truncation
const MAX_OUTPUT_LINES: usize = 1000;

/// Tool for executing shell commands in the working directory
pub struct RunShellTool {
    root: PathBuf,
    default_timeout: Duration,
}

impl RunShellTool {
    pub fn new(root: PathBuf, default_timeout: Duration) -> Self {
        Self {
            root,
            default_timeout,
        }
    }
}

/// Lines read from one stream, capped at the output limits
#[derive(Default)]
struct Captured {
    text: String,
    lines: usize,
    truncated: bool,
}

impl Captured {
    fn truncation_notice(&self, stream: &str) -> String {
        format!(
            "\n\n... ({} truncated at {} lines / {}KB)",
            stream,
            self.lines,
            MAX_OUTPUT_SIZE / 1024
        )
    }
}

/// Drain a stream to EOF, keeping at most the output limits
async fn capture<R: AsyncRead + Unpin>(reader: Option<R>) -> Captured {
    let mut captured = Captured::default();
    let Some(reader) = reader else {
        return captured;
    };
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if captured.truncated {
                    continue;
                }
                if captured.lines >= MAX_OUTPUT_LINES
                    || captured.text.len() + line.len() > MAX_OUTPUT_SIZE
                {
                    captured.truncated = true;
                    continue;
                }
                if !captured.text.is_empty() {
                    captured.text.push('\n');
                }
                captured.text.push_str(&line);
                captured.lines += 1;
            }
            Ok(None) => break,
            Err(e) => {
                captured.text.push_str(&format!("\nRead error: {}", e));
                break;
            }
        }
    }
    captured
}

#[async_trait]
impl Tool for RunShellTool {
    fn name(&self) -> &str {
        "run_shell"
    }

    fn description(&self) -> &str {
        "Execute a shell command in the working directory. Returns stdout and stderr."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command to execute"
                },
                "timeout": {
                    "type": "integer",
                    "minimum": 1,
                    "description": "Timeout in seconds (optional)"
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let command = required_str(&args, "command")?;
        let timeout = args
            .get("timeout")
            .and_then(|v| v.as_u64())
            .map(Duration::from_secs)
            .unwrap_or(self.default_timeout);

        let (shell, shell_arg) = if cfg!(target_os = "windows") {
            ("cmd", "/C")
        } else {
            ("sh", "-c")
        };

        let mut child = Command::new(shell)
            .arg(shell_arg)
            .arg(command)
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ToolError::execution(format!("Failed to spawn command: {}", e)))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let finished = tokio::time::timeout(timeout, async {
            tokio::join!(capture(stdout), capture(stderr), child.wait())
        })
        .await;

        let (stdout, stderr, status) = match finished {
            Ok(done) => done,
            Err(_) => {
                let _ = child.kill().await;
                tracing::warn!("run_shell timed out after {:?}: {}", timeout, command);
                return Err(ToolError::Timeout {
                    name: self.name().to_string(),
                    timeout,
                });
            }
        };
        let status =
            status.map_err(|e| ToolError::execution(format!("Failed to wait for command: {}", e)))?;

        let mut result = stdout.text.clone();
        if stdout.truncated {
            result.push_str(&stdout.truncation_notice("stdout"));
        }
        if !stderr.text.is_empty() {
            if !result.is_empty() {
                result.push('\n');
            }
            result.push_str(&stderr.text);
            if stderr.truncated {
                result.push_str(&stderr.truncation_notice("stderr"));
            }
        }
        if result.is_empty() {
            result = "(no output)".to_string();
        }

        if status.success() {
            Ok(ToolOutput::text(result))
        } else {
            let code = status.code().unwrap_or(-1);
            Err(ToolError::execution(format!(
                "{}\n\nCommand exited with code {}",
                result, code
            )))
        }
    }
}
