//! /mode command - show and switch the operational mode

use super::CommandResult;
use nexus_agent::Mode;

pub struct ModeCommand;

impl ModeCommand {
    pub fn execute(args: &str) -> CommandResult {
        if args.is_empty() {
            return CommandResult::ShowMode;
        }
        match args.parse::<Mode>() {
            Ok(mode) => CommandResult::SetMode(mode),
            Err(e) => CommandResult::Message(format!("{}\nUsage: /mode <code|architect|ask>", e)),
        }
    }

    /// Current mode with the available alternatives
    pub fn describe(current: Mode) -> String {
        let mut output = String::from("Modes:\n\n");
        for mode in Mode::ALL {
            let marker = if mode == current { " *" } else { "" };
            output.push_str(&format!(
                "  {:<10} {}{}\n",
                mode.as_str().to_lowercase(),
                summary(mode),
                marker
            ));
        }
        output.push_str("\nSet with: /mode <mode>");
        output
    }
}

fn summary(mode: Mode) -> &'static str {
    match mode {
        Mode::Code => "Read, write and run code",
        Mode::Architect => "Design and plan before changing anything",
        Mode::Ask => "Answer questions without modifying files",
    }
}
