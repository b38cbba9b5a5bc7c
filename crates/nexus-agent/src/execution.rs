//! Tool execution step

use nexus_ai::{Message, ToolCall};
use tokio::sync::broadcast;

use crate::events::AgentEvent;
use crate::state::{ConversationState, ToolCallRecord, ToolOutcome};
use crate::tool::{ToolError, ToolOutput, ToolRegistry};

/// Outcome of one call, tagged with the call it answers
#[derive(Debug, Clone)]
pub struct ToolCallResult {
    pub call: ToolCall,
    pub result: Result<ToolOutput, ToolError>,
}

impl ToolCallResult {
    pub fn is_error(&self) -> bool {
        self.result.is_err()
    }

    /// Text of the tool message answering the call
    pub fn content(&self) -> String {
        match &self.result {
            Ok(output) => output.content.clone(),
            Err(e) => format!("Error: {}", e),
        }
    }

    fn to_message(&self) -> Message {
        Message::tool_result(&self.call.id, &self.call.name, self.content(), self.is_error())
    }

    fn to_record(&self) -> ToolCallRecord {
        let outcome = if self.is_error() {
            ToolOutcome::Failed
        } else {
            ToolOutcome::Succeeded
        };
        ToolCallRecord::new(&self.call, outcome)
    }
}

/// Runs the calls of one assistant response
pub struct ToolExecutionStep<'a> {
    pub registry: &'a ToolRegistry,
    pub parallel: bool,
    pub thread_id: &'a str,
    pub events: &'a broadcast::Sender<AgentEvent>,
}

impl ToolExecutionStep<'_> {
    /// Next state with one tool message per call of the last assistant
    /// message appended in call order, plus the audit records.
    pub async fn run(&self, state: &ConversationState) -> ConversationState {
        let calls = state.last_tool_calls().to_vec();
        let results = self.execute_calls(&calls).await;
        apply_results(state, &results)
    }

    /// Execute calls and return results in call order, whatever order they
    /// finished in.
    pub async fn execute_calls(&self, calls: &[ToolCall]) -> Vec<ToolCallResult> {
        if self.parallel && calls.len() > 1 {
            // join_all yields outputs in input order
            let futures: Vec<_> = calls.iter().map(|call| self.execute_one(call)).collect();
            futures::future::join_all(futures).await
        } else {
            let mut results = Vec::with_capacity(calls.len());
            for call in calls {
                results.push(self.execute_one(call).await);
            }
            results
        }
    }

    async fn execute_one(&self, call: &ToolCall) -> ToolCallResult {
        let _ = self.events.send(AgentEvent::ToolExecutionStart {
            thread_id: self.thread_id.to_string(),
            tool_call_id: call.id.clone(),
            tool_name: call.name.clone(),
            arguments: call.args.clone(),
        });

        let result = self.registry.execute(&call.name, call.args.clone()).await;
        if let Err(e) = &result {
            tracing::warn!(tool = %call.name, call_id = %call.id, "Tool call failed: {}", e);
        }

        let result = ToolCallResult {
            call: call.clone(),
            result,
        };

        let _ = self.events.send(AgentEvent::ToolExecutionEnd {
            thread_id: self.thread_id.to_string(),
            tool_call_id: call.id.clone(),
            tool_name: call.name.clone(),
            result: result.content(),
            is_error: result.is_error(),
        });

        result
    }
}

/// Next state with the ordered results appended
pub fn apply_results(state: &ConversationState, results: &[ToolCallResult]) -> ConversationState {
    let mut next = state.clone();
    for result in results {
        next.messages.push(result.to_message());
        next.tool_calls_made.push(result.to_record());
        if let Ok(output) = &result.result {
            next.files_modified.extend(output.modified_files.iter().cloned());
        }
    }
    next
}
