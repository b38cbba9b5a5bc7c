//! Checkpoint history display, shared by /history and `nexus history`

use nexus_agent::ThreadCheckpoint;
use nexus_ai::Message;

use crate::utils::preview;

pub const DEFAULT_HISTORY_LIMIT: usize = 10;

const USER_PREVIEW_CHARS: usize = 200;
const OTHER_PREVIEW_CHARS: usize = 100;

fn message_line(message: &Message) -> String {
    match message {
        Message::User { content, .. } => format!("User: {}", preview(content, USER_PREVIEW_CHARS)),
        Message::Assistant {
            content,
            tool_calls,
            ..
        } => {
            let mut line = format!("Assistant: {}", preview(content, USER_PREVIEW_CHARS));
            if !tool_calls.is_empty() {
                let names: Vec<&str> = tool_calls.iter().map(|c| c.name.as_str()).collect();
                line.push_str(&format!(" [calls: {}]", names.join(", ")));
            }
            line
        }
        Message::Tool {
            name,
            content,
            is_error,
            ..
        } => format!(
            "Tool {}{}: {}",
            name,
            if *is_error { " (error)" } else { "" },
            preview(content, OTHER_PREVIEW_CHARS)
        ),
        Message::System { content, .. } => {
            format!("System: {}", preview(content, OTHER_PREVIEW_CHARS))
        }
    }
}

/// Render checkpoints (already newest first) with a preview of the message
/// each one added
pub fn format_checkpoints(thread_id: &str, checkpoints: &[ThreadCheckpoint]) -> String {
    if checkpoints.is_empty() {
        return format!("No history found for thread '{}'", thread_id);
    }

    let mut out = format!(
        "Conversation history for thread '{}' ({} checkpoints shown, newest first)\n",
        thread_id,
        checkpoints.len()
    );
    for checkpoint in checkpoints {
        let state = &checkpoint.state;
        out.push_str(&format!(
            "\n#{}  {}  mode={} iteration={} messages={}{}\n",
            checkpoint.sequence,
            checkpoint.created_at_display(),
            state.current_mode,
            state.iteration_count,
            state.messages.len(),
            if state.pending_approval {
                "  (awaiting approval)"
            } else {
                ""
            }
        ));
        match state.messages.last() {
            Some(message) => out.push_str(&format!("  {}\n", message_line(message))),
            None => out.push_str("  (no messages)\n"),
        }
    }
    out.truncate(out.trim_end().len());
    out
}
