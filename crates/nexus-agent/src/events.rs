//! Orchestrator event types

use nexus_ai::{Message, ToolCall};
use serde::{Deserialize, Serialize};

use crate::routing::Route;

/// Events emitted while the orchestrator drives a thread
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// A user turn started
    TurnStart { thread_id: String },

    /// A reasoning step is about to call the reasoning capability
    ReasoningStart { thread_id: String, iteration: u32 },

    /// The assistant response was appended
    MessageEnd { thread_id: String, message: Message },

    /// Routing picked the next transition
    Routed { thread_id: String, route: Route },

    /// Tool calls are waiting for a human decision
    ApprovalRequested {
        thread_id: String,
        tool_calls: Vec<ToolCall>,
    },

    /// A human decision was applied
    ApprovalResolved { thread_id: String, approved: bool },

    /// Tool execution started
    ToolExecutionStart {
        thread_id: String,
        tool_call_id: String,
        tool_name: String,
        arguments: serde_json::Value,
    },

    /// Tool execution completed
    ToolExecutionEnd {
        thread_id: String,
        tool_call_id: String,
        tool_name: String,
        result: String,
        is_error: bool,
    },

    /// A state was committed to the checkpoint store
    Checkpointed { thread_id: String, sequence: u64 },

    /// The loop stopped, either finished or suspended for approval
    TurnEnd { thread_id: String, iterations: u32 },

    /// Error occurred
    Error { thread_id: String, message: String },
}

impl AgentEvent {
    /// Check if this is a terminal event
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentEvent::TurnEnd { .. } | AgentEvent::Error { .. })
    }

    /// Thread the event belongs to
    pub fn thread_id(&self) -> &str {
        match self {
            AgentEvent::TurnStart { thread_id }
            | AgentEvent::ReasoningStart { thread_id, .. }
            | AgentEvent::MessageEnd { thread_id, .. }
            | AgentEvent::Routed { thread_id, .. }
            | AgentEvent::ApprovalRequested { thread_id, .. }
            | AgentEvent::ApprovalResolved { thread_id, .. }
            | AgentEvent::ToolExecutionStart { thread_id, .. }
            | AgentEvent::ToolExecutionEnd { thread_id, .. }
            | AgentEvent::Checkpointed { thread_id, .. }
            | AgentEvent::TurnEnd { thread_id, .. }
            | AgentEvent::Error { thread_id, .. } => thread_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_tagged_serialization() {
        let event = AgentEvent::Routed {
            thread_id: "t".into(),
            route: Route::End,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "routed");
        assert_eq!(value["route"], "END");
    }

    #[test]
    fn test_terminal_events() {
        assert!(
            AgentEvent::TurnEnd {
                thread_id: "t".into(),
                iterations: 1
            }
            .is_terminal()
        );
        assert!(
            !AgentEvent::TurnStart {
                thread_id: "t".into()
            }
            .is_terminal()
        );
        assert_eq!(
            AgentEvent::Checkpointed {
                thread_id: "abc".into(),
                sequence: 3
            }
            .thread_id(),
            "abc"
        );
    }
}
