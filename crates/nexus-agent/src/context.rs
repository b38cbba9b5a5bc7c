//! Context window derivation
//!
//! Builds the bounded list of messages sent to the reasoning capability:
//! system messages in history are dropped, oversized contents are rewritten in
//! place with a truncation marker, only the most recent messages are kept, and
//! one fresh system message is prepended.

use nexus_ai::Message;

use crate::memory::ConversationMemory;

/// Appended to any content cut down to `max_text_chars`
pub const TRUNCATION_MARKER: &str = "... (truncated for context safety)";

/// Window limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextWindow {
    pub max_text_chars: usize,
    pub max_recent_messages: usize,
}

impl ContextWindow {
    pub fn new(max_text_chars: usize, max_recent_messages: usize) -> Self {
        Self {
            max_text_chars,
            max_recent_messages,
        }
    }

    /// Rewrite oversized contents in `history` and return the windowed list.
    ///
    /// The rewrite is applied to the stored messages, not just the outgoing
    /// copy. The result always starts with a system message.
    pub fn build(&self, history: &mut ConversationMemory, system_prompt: &str) -> Vec<Message> {
        let mut truncated = 0usize;
        for message in history.messages_mut() {
            if message.is_system() {
                continue;
            }
            if let Some(rewritten) = truncate_content(message.content(), self.max_text_chars) {
                *message.content_mut() = rewritten;
                truncated += 1;
            }
        }

        let kept: Vec<&Message> = history.iter().filter(|m| !m.is_system()).collect();
        let start = kept.len().saturating_sub(self.max_recent_messages);

        let mut window = Vec::with_capacity(kept.len() - start + 1);
        window.push(Message::system(system_prompt));
        window.extend(kept[start..].iter().map(|m| (*m).clone()));

        tracing::debug!(
            history = history.len(),
            window = window.len(),
            truncated,
            "Built context window"
        );

        window
    }
}

/// `Some(first max_chars characters + marker)` when `content` is longer than
/// `max_chars` characters, `None` otherwise.
pub fn truncate_content(content: &str, max_chars: usize) -> Option<String> {
    let mut chars = content.char_indices();
    let cut = match chars.nth(max_chars) {
        Some((byte_index, _)) => byte_index,
        None => return None,
    };
    let mut rewritten = String::with_capacity(cut + TRUNCATION_MARKER.len());
    rewritten.push_str(&content[..cut]);
    rewritten.push_str(TRUNCATION_MARKER);
    Some(rewritten)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history_of(n: usize) -> ConversationMemory {
        (0..n)
            .map(|i| {
                if i % 2 == 0 {
                    Message::user(format!("u{}", i))
                } else {
                    Message::assistant(format!("a{}", i))
                }
            })
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn test_twenty_messages_window_of_fifteen() {
        let window = ContextWindow::new(10_000, 15);
        let mut history = history_of(20);
        let out = window.build(&mut history, "sys");

        assert_eq!(out.len(), 16);
        assert!(out[0].is_system());
        assert_eq!(out[0].content(), "sys");
        assert_eq!(out[1].content(), "a5");
        assert_eq!(out[15].content(), "a19");
        // history itself is not trimmed
        assert_eq!(history.len(), 20);
    }

    #[test]
    fn test_window_size_for_any_longer_history() {
        for max_recent in 1..6 {
            for len in (max_recent + 1)..(max_recent + 8) {
                let window = ContextWindow::new(100, max_recent);
                let out = window.build(&mut history_of(len), "s");
                assert_eq!(out.len() - 1, max_recent, "len={} max={}", len, max_recent);
            }
        }
    }

    #[test]
    fn test_short_history_kept_whole() {
        let window = ContextWindow::new(100, 15);
        let out = window.build(&mut history_of(3), "s");
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn test_empty_history_still_has_system() {
        let window = ContextWindow::new(100, 15);
        let out = window.build(&mut ConversationMemory::new(), "only system");
        assert_eq!(out.len(), 1);
        assert!(out[0].is_system());
    }

    #[test]
    fn test_twelve_thousand_chars_truncated_to_ten_thousand() {
        let window = ContextWindow::new(10_000, 15);
        let mut history: ConversationMemory = vec![Message::user("x".repeat(12_000))].into();
        let out = window.build(&mut history, "sys");

        let content = out[1].content();
        assert_eq!(content.chars().count(), 10_000 + TRUNCATION_MARKER.chars().count());
        assert!(content.ends_with(TRUNCATION_MARKER));
        assert!(content[..10_000].chars().all(|c| c == 'x'));
    }

    #[test]
    fn test_truncation_rewrites_stored_history() {
        let window = ContextWindow::new(5, 15);
        let mut history: ConversationMemory = vec![Message::tool_result(
            "c1",
            "read_file",
            "0123456789",
            false,
        )]
        .into();
        window.build(&mut history, "sys");

        assert_eq!(history.messages()[0].content(), format!("01234{}", TRUNCATION_MARKER));
        assert_eq!(history.messages()[0].tool_call_id(), Some("c1"));

        // re-truncation is idempotent
        window.build(&mut history, "sys");
        assert_eq!(history.messages()[0].content(), format!("01234{}", TRUNCATION_MARKER));
    }

    #[test]
    fn test_content_at_limit_untouched() {
        assert!(truncate_content("abcde", 5).is_none());
        assert_eq!(
            truncate_content("abcdef", 5).unwrap(),
            format!("abcde{}", TRUNCATION_MARKER)
        );
    }

    #[test]
    fn test_truncation_counts_characters_not_bytes() {
        let content = "é".repeat(8);
        let out = truncate_content(&content, 4).unwrap();
        assert_eq!(out, format!("éééé{}", TRUNCATION_MARKER));
    }

    #[test]
    fn test_zero_max_chars() {
        assert_eq!(truncate_content("a", 0).unwrap(), TRUNCATION_MARKER);
        assert!(truncate_content("", 0).is_none());
    }

    #[test]
    fn test_system_messages_in_history_dropped() {
        let window = ContextWindow::new(100, 15);
        let mut history: ConversationMemory = vec![
            Message::system("stale prompt"),
            Message::user("hi"),
            Message::system("another"),
            Message::assistant("hello"),
        ]
        .into();
        let out = window.build(&mut history, "fresh");

        assert_eq!(out.len(), 3);
        assert_eq!(out.iter().filter(|m| m.is_system()).count(), 1);
        assert_eq!(out[0].content(), "fresh");
    }
}
