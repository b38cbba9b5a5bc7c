//! Conversation state carried through the control loop and checkpointed

use nexus_ai::{Message, ToolCall};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::memory::ConversationMemory;

/// Operational mode of the agent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    #[default]
    Code,
    Architect,
    Ask,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Code, Mode::Architect, Mode::Ask];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Code => "CODE",
            Mode::Architect => "ARCHITECT",
            Mode::Ask => "ASK",
        }
    }

    /// Instruction appended to the system prompt while this mode is active
    pub fn directive(&self) -> &'static str {
        match self {
            Mode::Code => {
                "Current mode: CODE. You may read, write and run code to complete the task."
            }
            Mode::Architect => {
                "Current mode: ARCHITECT. Focus on design and planning; describe changes before making them."
            }
            Mode::Ask => {
                "Current mode: ASK. Answer questions; do not modify files or run commands unless asked."
            }
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing a [`Mode`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid mode: {0} (expected code, architect or ask)")]
pub struct ParseModeError(pub String);

impl FromStr for Mode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CODE" => Ok(Mode::Code),
            "ARCHITECT" => Ok(Mode::Architect),
            "ASK" => Ok(Mode::Ask),
            _ => Err(ParseModeError(s.to_string())),
        }
    }
}

/// How a recorded tool call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolOutcome {
    Succeeded,
    Failed,
    Rejected,
}

/// Audit entry for one tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub id: String,
    pub name: String,
    pub args: serde_json::Value,
    pub outcome: ToolOutcome,
    #[serde(default)]
    pub timestamp: i64,
}

impl ToolCallRecord {
    pub fn new(call: &ToolCall, outcome: ToolOutcome) -> Self {
        Self {
            id: call.id.clone(),
            name: call.name.clone(),
            args: call.args.clone(),
            outcome,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Full state of one conversation thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationState {
    /// Ordered history
    pub messages: ConversationMemory,
    /// Reasoning steps taken in the current turn
    pub iteration_count: u32,
    /// Decision on the last approval request, unset until one is made
    pub approval_granted: Option<bool>,
    /// Tool calls from the last assistant message await a human decision
    pub pending_approval: bool,
    pub current_mode: Mode,
    pub working_directory: PathBuf,
    /// Append-only audit of every executed or rejected call
    pub tool_calls_made: Vec<ToolCallRecord>,
    /// Append-only list of paths tools reported as modified
    pub files_modified: Vec<PathBuf>,
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new(PathBuf::from("."))
    }
}

impl ConversationState {
    /// Fresh state rooted at a working directory
    pub fn new(working_directory: impl Into<PathBuf>) -> Self {
        Self {
            messages: ConversationMemory::new(),
            iteration_count: 0,
            approval_granted: None,
            pending_approval: false,
            current_mode: Mode::default(),
            working_directory: working_directory.into(),
            tool_calls_made: Vec::new(),
            files_modified: Vec::new(),
        }
    }

    /// Next state for a new user turn: the per-turn counters reset and the
    /// user message is appended.
    pub fn begin_turn(&self, user_message: Message) -> Self {
        let mut next = self.clone();
        next.iteration_count = 0;
        next.approval_granted = None;
        next.messages.push(user_message);
        next
    }

    /// Tool calls of the last message, if it is an assistant message
    pub fn last_tool_calls(&self) -> &[ToolCall] {
        self.messages.last().map(Message::tool_calls).unwrap_or(&[])
    }

    /// The calls awaiting a human decision, if any
    pub fn pending_tool_calls(&self) -> Option<&[ToolCall]> {
        if self.pending_approval {
            Some(self.last_tool_calls())
        } else {
            None
        }
    }

    /// Text of the most recent assistant message
    pub fn last_assistant_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| matches!(m, Message::Assistant { .. }))
            .map(Message::content)
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
