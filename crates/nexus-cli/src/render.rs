//! Console rendering of orchestrator events

use nexus_agent::AgentEvent;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::utils::{preview, truncate_chars};

const RESULT_PREVIEW_CHARS: usize = 200;
const ARGS_PREVIEW_CHARS: usize = 120;

/// Format one event for the console. Events with no visible effect return None.
///
/// Errors are reported by the caller from the returned `Result`, so the
/// error event is only logged here.
pub fn render_event(event: &AgentEvent) -> Option<String> {
    match event {
        AgentEvent::MessageEnd { message, .. } => {
            let text = message.content().trim();
            if text.is_empty() {
                None
            } else {
                Some(format!("\n{}", text))
            }
        }
        AgentEvent::ToolExecutionStart {
            tool_name,
            arguments,
            ..
        } => Some(format!(
            "[Running {} {}]",
            tool_name,
            truncate_chars(&arguments.to_string(), ARGS_PREVIEW_CHARS)
        )),
        AgentEvent::ToolExecutionEnd {
            tool_name,
            result,
            is_error,
            ..
        } => {
            let status = if *is_error { " failed" } else { "" };
            Some(format!(
                "[{}{}: {}]",
                tool_name,
                status,
                preview(result, RESULT_PREVIEW_CHARS)
            ))
        }
        AgentEvent::ApprovalResolved { approved, .. } => Some(if *approved {
            "[Approved]".to_string()
        } else {
            "[Rejected: tool calls were not executed]".to_string()
        }),
        AgentEvent::Error { thread_id, message } => {
            tracing::debug!(thread_id, "Turn error: {}", message);
            None
        }
        AgentEvent::Checkpointed {
            thread_id,
            sequence,
        } => {
            tracing::debug!(thread_id, sequence, "Checkpoint committed");
            None
        }
        _ => None,
    }
}

fn print_event(event: &AgentEvent) {
    if let Some(text) = render_event(event) {
        println!("{}", text);
    }
}

/// Background task printing events as they arrive.
///
/// [`EventPrinter::flush`] returns once every event sent before the call has
/// been printed, so prompts written afterwards never interleave with output.
pub struct EventPrinter {
    flush_tx: mpsc::UnboundedSender<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl EventPrinter {
    pub fn spawn(mut receiver: broadcast::Receiver<AgentEvent>) -> Self {
        let (flush_tx, mut flush_rx) = mpsc::unbounded_channel::<oneshot::Sender<()>>();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    event = receiver.recv() => match event {
                        Ok(event) => print_event(&event),
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!("Event printer lagged, skipped {} events", skipped);
                        }
                        Err(RecvError::Closed) => break,
                    },
                    Some(done) = flush_rx.recv() => {
                        loop {
                            match receiver.try_recv() {
                                Ok(event) => print_event(&event),
                                Err(TryRecvError::Lagged(skipped)) => {
                                    tracing::warn!("Event printer lagged, skipped {} events", skipped);
                                }
                                Err(_) => break,
                            }
                        }
                        let _ = done.send(());
                    }
                }
            }
        });

        Self { flush_tx, handle }
    }

    /// Wait until everything already emitted has been printed
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.flush_tx.send(done_tx).is_ok() {
            let _ = done_rx.await;
        }
    }
}

impl Drop for EventPrinter {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexus_ai::Message;
    use serde_json::json;

    #[test]
    fn test_render_assistant_message() {
        let event = AgentEvent::MessageEnd {
            thread_id: "t".into(),
            message: Message::assistant("Done."),
        };
        assert_eq!(render_event(&event).as_deref(), Some("\nDone."));

        let empty = AgentEvent::MessageEnd {
            thread_id: "t".into(),
            message: Message::assistant("  "),
        };
        assert_eq!(render_event(&empty), None);
    }

    #[test]
    fn test_render_tool_lines() {
        let start = AgentEvent::ToolExecutionStart {
            thread_id: "t".into(),
            tool_call_id: "c1".into(),
            tool_name: "read_file".into(),
            arguments: json!({"path": "a.rs"}),
        };
        assert_eq!(
            render_event(&start).as_deref(),
            Some(r#"[Running read_file {"path":"a.rs"}]"#)
        );

        let failed = AgentEvent::ToolExecutionEnd {
            thread_id: "t".into(),
            tool_call_id: "c1".into(),
            tool_name: "read_file".into(),
            result: "Error: missing\nmore".into(),
            is_error: true,
        };
        assert_eq!(
            render_event(&failed).as_deref(),
            Some("[read_file failed: Error: missing...]")
        );
    }

    #[test]
    fn test_silent_events() {
        let error = AgentEvent::Error {
            thread_id: "t".into(),
            message: "provider down".into(),
        };
        assert_eq!(render_event(&error), None);
        let start = AgentEvent::TurnStart {
            thread_id: "t".into(),
        };
        assert_eq!(render_event(&start), None);
    }

    #[tokio::test]
    async fn test_flush_drains_pending_events() {
        let (tx, rx) = broadcast::channel(16);
        let printer = EventPrinter::spawn(rx);
        for sequence in 1..=3 {
            tx.send(AgentEvent::Checkpointed {
                thread_id: "t".into(),
                sequence,
            })
            .unwrap();
        }
        printer.flush().await;
        // Everything sent before the flush was consumed.
        assert_eq!(tx.len(), 0);
    }
}
