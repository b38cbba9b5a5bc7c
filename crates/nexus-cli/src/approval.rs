//! Console approval channel

use async_trait::async_trait;
use nexus_agent::ApprovalChannel;
use nexus_ai::ToolCall;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::sync::Arc;

use crate::input::LineReader;
use crate::render::EventPrinter;
use crate::utils::truncate_chars;

const ARGS_PREVIEW_CHARS: usize = 300;

/// How an empty answer at the approval prompt is treated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalDefault {
    Approve,
    Deny,
    /// Re-prompt until the user answers
    #[default]
    Ask,
}

impl fmt::Display for ApprovalDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ApprovalDefault::Approve => "approve",
            ApprovalDefault::Deny => "deny",
            ApprovalDefault::Ask => "ask",
        })
    }
}

/// Interpret one answer. None means ask again.
pub fn parse_answer(input: &str, default: ApprovalDefault) -> Option<bool> {
    match input.trim().to_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        "" => match default {
            ApprovalDefault::Approve => Some(true),
            ApprovalDefault::Deny => Some(false),
            ApprovalDefault::Ask => None,
        },
        _ => None,
    }
}

fn prompt_suffix(default: ApprovalDefault) -> &'static str {
    match default {
        ApprovalDefault::Approve => "[Y/n]",
        ApprovalDefault::Deny => "[y/N]",
        ApprovalDefault::Ask => "[y/n]",
    }
}

/// Describe pending calls for the approval prompt
pub fn describe_calls(tool_calls: &[ToolCall]) -> String {
    let mut out = format!("The agent wants to run {} tool call(s):", tool_calls.len());
    for (i, call) in tool_calls.iter().enumerate() {
        out.push_str(&format!(
            "\n  {}. {} {}",
            i + 1,
            call.name,
            truncate_chars(&call.args.to_string(), ARGS_PREVIEW_CHARS)
        ));
    }
    out
}

/// Asks on the terminal; end of input counts as a denial
pub struct ConsoleApproval {
    default: ApprovalDefault,
    printer: Arc<EventPrinter>,
    input: Arc<LineReader>,
}

impl ConsoleApproval {
    pub fn new(default: ApprovalDefault, printer: Arc<EventPrinter>, input: Arc<LineReader>) -> Self {
        Self {
            default,
            printer,
            input,
        }
    }
}

#[async_trait]
impl ApprovalChannel for ConsoleApproval {
    async fn request_approval(&self, tool_calls: &[ToolCall]) -> bool {
        self.printer.flush().await;
        println!("\n{}", describe_calls(tool_calls));

        loop {
            print!("Approve? {} ", prompt_suffix(self.default));
            let _ = std::io::stdout().flush();

            let Some(line) = self.input.read_line().await else {
                println!();
                tracing::info!("Input closed during approval, denying");
                return false;
            };
            if let Some(approved) = parse_answer(&line, self.default) {
                return approved;
            }
            println!("Please answer 'y' or 'n'.");
        }
    }
}
