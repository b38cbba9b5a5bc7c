//! Slash commands for interactive mode

mod history;
mod mode;

pub use history::{DEFAULT_HISTORY_LIMIT, format_checkpoints};
pub use mode::ModeCommand;

use nexus_agent::Mode;

/// Result of executing a slash command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// Show a message to the user (not sent to agent)
    Message(String),
    /// Switch the thread's mode
    SetMode(Mode),
    /// Show the thread's current mode
    ShowMode,
    /// Show effective settings
    ShowConfig,
    /// Show up to this many checkpoints
    History(usize),
    /// Delete the thread's checkpoints
    Clear,
    /// Exit the application
    Exit,
    /// Unknown command
    Unknown(String),
}

/// Parse and execute a slash command. Returns None if `input` isn't one.
pub fn execute_command(input: &str) -> Option<CommandResult> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, char::is_whitespace);
    let command = parts.next().unwrap_or("").to_lowercase();
    let args = parts.next().map(str::trim).unwrap_or("");

    Some(match command.as_str() {
        "help" | "h" | "?" => CommandResult::Message(help_message()),

        "about" => CommandResult::Message(about_message()),

        "config" => CommandResult::ShowConfig,

        "mode" | "m" => ModeCommand::execute(args),

        "history" => match parse_limit(args) {
            Ok(limit) => CommandResult::History(limit),
            Err(msg) => CommandResult::Message(msg),
        },

        "clear" | "c" => CommandResult::Clear,

        "quit" | "exit" | "q" => CommandResult::Exit,

        _ => CommandResult::Unknown(command),
    })
}

/// Plain-word exits accepted at the prompt
pub fn is_exit_word(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "exit" | "quit" | "q")
}

fn parse_limit(args: &str) -> Result<usize, String> {
    if args.is_empty() {
        return Ok(DEFAULT_HISTORY_LIMIT);
    }
    match args.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!(
            "Invalid history limit: '{}'\nUsage: /history [n]",
            args
        )),
    }
}

fn help_message() -> String {
    r#"Available commands:
  /help, /h, /?        Show this help message
  /about               Show application information
  /config              Show effective configuration
  /mode, /m [mode]     Show or switch mode (code, architect, ask)
  /history [n]         Show the last n checkpoints (default 10)
  /clear, /c           Delete this thread's history
  /quit, /exit, /q     Exit nexus

Typing exit, quit or q also exits."#
        .to_string()
}

fn about_message() -> String {
    format!(
        "NEXUS - AI Coding Agent v{}\nCheckpointed agent loop with human approval of tool calls.",
        env!("CARGO_PKG_VERSION")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_a_command() {
        assert_eq!(execute_command("hello"), None);
    }

    #[test]
    fn test_basic_commands() {
        assert_eq!(execute_command("/quit"), Some(CommandResult::Exit));
        assert_eq!(execute_command("  /CLEAR "), Some(CommandResult::Clear));
        assert_eq!(execute_command("/config"), Some(CommandResult::ShowConfig));
        assert!(matches!(
            execute_command("/help"),
            Some(CommandResult::Message(msg)) if msg.contains("/mode")
        ));
        assert_eq!(
            execute_command("/frobnicate now"),
            Some(CommandResult::Unknown("frobnicate".into()))
        );
    }

    #[test]
    fn test_history_limit() {
        assert_eq!(
            execute_command("/history"),
            Some(CommandResult::History(DEFAULT_HISTORY_LIMIT))
        );
        assert_eq!(execute_command("/history 3"), Some(CommandResult::History(3)));
        assert!(matches!(
            execute_command("/history zero"),
            Some(CommandResult::Message(_))
        ));
        assert!(matches!(
            execute_command("/history 0"),
            Some(CommandResult::Message(_))
        ));
    }

    #[test]
    fn test_exit_words() {
        assert!(is_exit_word("exit"));
        assert!(is_exit_word(" Q "));
        assert!(!is_exit_word("quitter"));
    }
}
