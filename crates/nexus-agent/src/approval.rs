//! Human approval gate
//!
//! Approval is a suspended state: [`request`] marks the thread as waiting,
//! the orchestrator persists it and returns, and [`resolve`] applies the
//! decision once it arrives.

use async_trait::async_trait;
use nexus_ai::{Message, ToolCall};

use crate::state::{ConversationState, ToolCallRecord, ToolOutcome};

/// Source of human approval decisions
#[async_trait]
pub trait ApprovalChannel: Send + Sync {
    /// Approve or deny the given calls as a whole
    async fn request_approval(&self, tool_calls: &[ToolCall]) -> bool;
}

/// Channel that always answers the same way
#[derive(Debug, Clone, Copy)]
pub struct StaticApproval(pub bool);

#[async_trait]
impl ApprovalChannel for StaticApproval {
    async fn request_approval(&self, _tool_calls: &[ToolCall]) -> bool {
        self.0
    }
}

/// Content of the tool message answering a denied call
pub fn rejection_text(tool_name: &str) -> String {
    format!(
        "Tool call '{}' was rejected by the user. It was not executed.",
        tool_name
    )
}

/// One error tool message per call, in call order
pub fn rejection_messages(tool_calls: &[ToolCall]) -> Vec<Message> {
    tool_calls
        .iter()
        .map(|call| Message::tool_result(&call.id, &call.name, rejection_text(&call.name), true))
        .collect()
}

/// Next state with the thread suspended for approval
pub fn request(state: &ConversationState) -> ConversationState {
    let mut next = state.clone();
    next.pending_approval = true;
    next
}

/// Next state with the decision applied.
///
/// A denial appends the rejection messages and audit records in the same
/// transition so history never holds unanswered calls.
pub fn resolve(state: &ConversationState, approved: bool) -> ConversationState {
    let mut next = state.clone();
    next.approval_granted = Some(approved);
    next.pending_approval = false;

    if !approved {
        let calls = state.last_tool_calls().to_vec();
        next.messages.extend(rejection_messages(&calls));
        next.tool_calls_made.extend(
            calls
                .iter()
                .map(|call| ToolCallRecord::new(call, ToolOutcome::Rejected)),
        );
    }
    next
}
