//! Reasoning step: one call to the reasoning capability

use nexus_ai::{ChatModel, Context, ToolSchema};

use crate::context::ContextWindow;
use crate::state::{ConversationState, Mode};

/// Base prompt with the directive for the active mode appended
pub fn compose_system_prompt(base: &str, mode: Mode) -> String {
    let base = base.trim_end();
    if base.is_empty() {
        mode.directive().to_string()
    } else {
        format!("{}\n\n{}", base, mode.directive())
    }
}

/// Invokes the reasoning capability with the windowed history
pub struct ReasoningStep<'a> {
    pub model: &'a dyn ChatModel,
    pub window: ContextWindow,
    pub system_prompt: &'a str,
    pub tools: &'a [ToolSchema],
}

impl ReasoningStep<'_> {
    /// Next state with the response appended and `iteration_count` advanced
    /// by one. The truncation rewrite of the window is carried into the
    /// returned history.
    ///
    /// On failure `state` is untouched and nothing should be committed.
    pub async fn run(&self, state: &ConversationState) -> nexus_ai::Result<ConversationState> {
        let mut next = state.clone();
        let system_prompt = compose_system_prompt(self.system_prompt, next.current_mode);
        let messages = self.window.build(&mut next.messages, &system_prompt);

        let context = Context {
            system_prompt,
            messages,
            tools: self.tools.to_vec(),
        };

        tracing::debug!(
            model = self.model.model_id(),
            iteration = state.iteration_count + 1,
            messages = context.messages.len(),
            tools = context.tools.len(),
            "Invoking reasoning capability"
        );

        let completion = self.model.invoke(&context).await?;

        next.messages.push(completion.into_message());
        next.iteration_count += 1;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TRUNCATION_MARKER;
    use crate::test_support::ScriptedModel;
    use nexus_ai::{Completion, Message, ToolCall};
    use serde_json::json;

    fn step<'a>(model: &'a ScriptedModel, tools: &'a [ToolSchema]) -> ReasoningStep<'a> {
        ReasoningStep {
            model,
            window: ContextWindow::new(10_000, 15),
            system_prompt: "You are Nexus.",
            tools,
        }
    }

    #[tokio::test]
    async fn test_appends_response_and_counts() {
        let model = ScriptedModel::new([Completion::text("hello")]);
        let mut state = ConversationState::default();
        state.messages.push(Message::user("hi"));

        let next = step(&model, &[]).run(&state).await.unwrap();
        assert_eq!(next.iteration_count, 1);
        assert_eq!(next.messages.len(), 2);
        assert_eq!(next.messages.last().unwrap().content(), "hello");
        assert_eq!(state.messages.len(), 1);
    }

    #[tokio::test]
    async fn test_failure_leaves_state_untouched() {
        let model = ScriptedModel::failing("provider down");
        let mut state = ConversationState::default();
        state.messages.push(Message::user("x".repeat(20_000)));
        let before = state.clone();

        let err = step(&model, &[]).run(&state).await.unwrap_err();
        assert!(err.to_string().contains("provider down"));
        assert_eq!(state, before);
    }

    #[tokio::test]
    async fn test_truncation_carried_into_next_state() {
        let model = ScriptedModel::new([Completion::text("ok")]);
        let mut state = ConversationState::default();
        state.messages.push(Message::user("x".repeat(12_000)));

        let next = step(&model, &[]).run(&state).await.unwrap();
        let stored = next.messages.messages()[0].content();
        assert_eq!(stored.chars().count(), 10_000 + TRUNCATION_MARKER.chars().count());
    }

    #[tokio::test]
    async fn test_context_carries_prompt_mode_and_tools() {
        let model = ScriptedModel::new([Completion::with_tool_calls(
            "",
            vec![ToolCall::new("c1", "read_file", json!({"path": "a"}))],
        )]);
        let tools = vec![ToolSchema::new("read_file", "Read a file", json!({"type": "object"}))];
        let mut state = ConversationState::default();
        state.current_mode = Mode::Ask;
        state.messages.push(Message::user("what's in a?"));

        let next = step(&model, &tools).run(&state).await.unwrap();
        assert!(next.messages.last().unwrap().has_tool_calls());

        let seen = model.contexts();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].system_prompt.starts_with("You are Nexus."));
        assert!(seen[0].system_prompt.contains("Current mode: ASK"));
        assert!(seen[0].messages[0].is_system());
        assert_eq!(seen[0].tools.len(), 1);
    }

    #[test]
    fn test_compose_without_base() {
        assert_eq!(compose_system_prompt("  ", Mode::Code), Mode::Code.directive());
    }
}
