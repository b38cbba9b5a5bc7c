//! Next-transition decision after a reasoning step

use serde::{Deserialize, Serialize};

use crate::config::AgentConfig;
use crate::state::ConversationState;

/// Where the control loop goes next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Route {
    /// Run the requested tools without asking
    ContinueAuto,
    /// Suspend until a human approves or denies the requested tools
    RequestApproval,
    /// Stop the turn
    End,
}

/// Decide the next transition. Pure: reads nothing but its arguments.
///
/// The iteration cap wins over pending tool calls.
pub fn route(state: &ConversationState, config: &AgentConfig) -> Route {
    if state.iteration_count >= config.max_iterations {
        return Route::End;
    }
    match state.messages.last() {
        Some(last) if last.has_tool_calls() => {
            if config.approval_required {
                Route::RequestApproval
            } else {
                Route::ContinueAuto
            }
        }
        _ => Route::End,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexus_ai::{Message, ToolCall};
    use serde_json::json;

    fn with_tool_call(iterations: u32) -> ConversationState {
        let mut state = ConversationState::default();
        state.messages.push(Message::user("list files"));
        state.messages.push(Message::assistant_with_tools(
            "",
            vec![ToolCall::new("c1", "list_directory", json!({"path": "."}))],
        ));
        state.iteration_count = iterations;
        state
    }

    #[test]
    fn test_cap_ends_regardless_of_tool_calls() {
        let config = AgentConfig::default().with_max_iterations(3);
        assert_eq!(route(&with_tool_call(3), &config), Route::End);
        assert_eq!(route(&with_tool_call(4), &config), Route::End);
    }

    #[test]
    fn test_tool_calls_request_approval() {
        let config = AgentConfig::default();
        assert_eq!(route(&with_tool_call(1), &config), Route::RequestApproval);
    }

    #[test]
    fn test_tool_calls_continue_without_approval() {
        let config = AgentConfig::default().with_approval_required(false);
        assert_eq!(route(&with_tool_call(1), &config), Route::ContinueAuto);
    }

    #[test]
    fn test_plain_answer_ends() {
        let mut state = ConversationState::default();
        state.messages.push(Message::user("hi"));
        state.messages.push(Message::assistant("hello"));
        state.iteration_count = 1;
        assert_eq!(route(&state, &AgentConfig::default()), Route::End);
    }

    #[test]
    fn test_last_message_not_assistant_ends() {
        let mut state = with_tool_call(1);
        state.messages.push(Message::tool_result("c1", "list_directory", "a.rs", false));
        assert_eq!(route(&state, &AgentConfig::default()), Route::End);
        assert_eq!(route(&ConversationState::default(), &AgentConfig::default()), Route::End);
    }

    #[test]
    fn test_route_is_pure() {
        let state = with_tool_call(2);
        let before = state.clone();
        let config = AgentConfig::default();
        let first = route(&state, &config);
        for _ in 0..10 {
            assert_eq!(route(&state, &config), first);
        }
        assert_eq!(state, before);
    }

    #[test]
    fn test_route_serializes_screaming() {
        assert_eq!(
            serde_json::to_value(Route::RequestApproval).unwrap(),
            json!("REQUEST_APPROVAL")
        );
    }
}
