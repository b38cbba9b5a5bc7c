//! Chat session: one-shot and interactive

use nexus_agent::{CompletionReason, Orchestrator, TurnOutcome};
use std::io::Write;
use std::sync::Arc;

use crate::approval::ConsoleApproval;
use crate::commands::{self, CommandResult, ModeCommand, format_checkpoints};
use crate::config::Settings;
use crate::input::LineReader;
use crate::render::EventPrinter;

pub const DEFAULT_THREAD_ID: &str = "default";

/// Whether the interactive loop keeps going after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

pub struct ChatSession {
    orchestrator: Arc<Orchestrator>,
    thread_id: String,
    settings: Settings,
    printer: Arc<EventPrinter>,
    input: Arc<LineReader>,
    approval: ConsoleApproval,
}

impl ChatSession {
    pub fn new(orchestrator: Arc<Orchestrator>, thread_id: String, settings: Settings) -> Self {
        let printer = Arc::new(EventPrinter::spawn(orchestrator.subscribe()));
        let input = Arc::new(LineReader::stdin());
        let approval =
            ConsoleApproval::new(settings.approval_default, printer.clone(), input.clone());
        Self {
            orchestrator,
            thread_id,
            settings,
            printer,
            input,
            approval,
        }
    }

    /// Re-present calls left awaiting approval by an earlier session
    pub async fn resume_pending(&self) -> anyhow::Result<()> {
        if self
            .orchestrator
            .pending_approval(&self.thread_id)
            .await?
            .is_none()
        {
            return Ok(());
        }

        println!(
            "Thread '{}' has tool calls awaiting approval from a previous session.",
            self.thread_id
        );
        let outcome = self
            .orchestrator
            .resume_pending(&self.thread_id, &self.approval)
            .await;
        self.printer.flush().await;
        if let Some(outcome) = outcome? {
            report_outcome(&outcome);
        }
        Ok(())
    }

    /// Run one user message to completion
    pub async fn send(&self, message: &str) -> anyhow::Result<()> {
        let outcome = self
            .orchestrator
            .run_turn_with_approval(&self.thread_id, message, &self.approval)
            .await;
        self.printer.flush().await;
        report_outcome(&outcome?);
        Ok(())
    }

    /// Read-eval loop until an exit word or end of input
    pub async fn run_interactive(&self) -> anyhow::Result<()> {
        if std::io::IsTerminal::is_terminal(&std::io::stderr()) {
            eprintln!(
                "nexus ({}) thread: {}\nType /help for commands, exit to quit.\n",
                self.orchestrator.model_id(),
                self.thread_id
            );
        }

        if let Err(e) = self.resume_pending().await {
            eprintln!("Error: {}", e);
        }

        loop {
            print!("> ");
            std::io::stdout().flush()?;

            let line = tokio::select! {
                line = self.input.read_line() => line,
                _ = tokio::signal::ctrl_c() => {
                    println!("\nUse 'exit' to quit.");
                    continue;
                }
            };
            let Some(line) = line else {
                // EOF
                println!();
                break;
            };

            let input = line.trim();
            if input.is_empty() {
                continue;
            }
            if commands::is_exit_word(input) {
                break;
            }

            if let Some(result) = commands::execute_command(input) {
                match self.handle_command(result).await {
                    Ok(Flow::Exit) => break,
                    Ok(Flow::Continue) => {}
                    Err(e) => eprintln!("Error: {}", e),
                }
                continue;
            }

            if let Err(e) = self.send(input).await {
                eprintln!("Error: {}", e);
            }
        }

        Ok(())
    }

    async fn handle_command(&self, result: CommandResult) -> anyhow::Result<Flow> {
        match result {
            CommandResult::Message(msg) => println!("{}", msg),
            CommandResult::ShowMode => {
                let state = self.orchestrator.state(&self.thread_id).await?;
                println!("{}", ModeCommand::describe(state.current_mode));
            }
            CommandResult::SetMode(mode) => {
                self.orchestrator.set_mode(&self.thread_id, mode).await?;
                println!("Switched to {} mode", mode);
            }
            CommandResult::ShowConfig => {
                let state = self.orchestrator.state(&self.thread_id).await?;
                println!("Configuration:\n");
                println!("  Thread: {}", self.thread_id);
                println!("  Current Mode: {}", state.current_mode);
                println!("{}", self.settings.table());
            }
            CommandResult::History(limit) => {
                let checkpoints = self.orchestrator.history(&self.thread_id, limit).await?;
                println!("{}", format_checkpoints(&self.thread_id, &checkpoints));
            }
            CommandResult::Clear => {
                self.orchestrator.clear_history(&self.thread_id).await?;
                println!("Cleared history for thread '{}'.", self.thread_id);
            }
            CommandResult::Exit => return Ok(Flow::Exit),
            CommandResult::Unknown(cmd) => {
                println!("Unknown command: /{}", cmd);
                println!("Type /help for available commands.");
            }
        }
        Ok(Flow::Continue)
    }
}

fn report_outcome(outcome: &TurnOutcome) {
    match outcome {
        TurnOutcome::Completed {
            state,
            reason: CompletionReason::IterationLimit,
        } => {
            println!(
                "\n[Stopped after {} iterations without a final answer]",
                state.iteration_count
            );
        }
        TurnOutcome::Completed { .. } => {}
        TurnOutcome::AwaitingApproval { pending, .. } => {
            println!("\n[{} tool call(s) awaiting approval]", pending.len());
        }
    }
}
