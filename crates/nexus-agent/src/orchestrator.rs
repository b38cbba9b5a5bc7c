//! The control loop
//!
//! Drives one thread through REASON → ROUTE → {APPROVE | EXECUTE_TOOLS} →
//! REASON until routing ends the turn or approval suspends it. Each step
//! produces a new state which is committed to the checkpoint store before the
//! next step begins; a step that fails commits nothing.

use nexus_ai::{ChatModel, Message, ToolCall};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::approval::{self, ApprovalChannel};
use crate::checkpoint::{CheckpointStore, ThreadCheckpoint};
use crate::config::AgentConfig;
use crate::context::ContextWindow;
use crate::error::{Error, Result};
use crate::events::AgentEvent;
use crate::execution::ToolExecutionStep;
use crate::reasoning::ReasoningStep;
use crate::routing::{Route, route};
use crate::state::{ConversationState, Mode};
use crate::tool::ToolRegistry;

/// Why a turn finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionReason {
    /// The assistant answered without requesting tools
    FinalAnswer,
    /// The iteration cap stopped the loop while tools were still requested
    IterationLimit,
}

/// Result of driving a thread until it stops
#[derive(Debug, Clone)]
pub enum TurnOutcome {
    Completed {
        state: ConversationState,
        reason: CompletionReason,
    },
    /// Suspended; resume with [`Orchestrator::resume_approval`]
    AwaitingApproval {
        state: ConversationState,
        pending: Vec<ToolCall>,
    },
}

impl TurnOutcome {
    pub fn state(&self) -> &ConversationState {
        match self {
            TurnOutcome::Completed { state, .. } | TurnOutcome::AwaitingApproval { state, .. } => {
                state
            }
        }
    }

    pub fn is_awaiting_approval(&self) -> bool {
        matches!(self, TurnOutcome::AwaitingApproval { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Reason,
    Route,
    Approve,
    ExecuteTools,
    Done(CompletionReason),
}

/// Runs conversation threads against a reasoning capability, tools and a
/// checkpoint store
pub struct Orchestrator {
    config: AgentConfig,
    model: Arc<dyn ChatModel>,
    tools: ToolRegistry,
    store: Arc<dyn CheckpointStore>,
    /// One async lock per thread, held for every read-modify-persist
    thread_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    event_tx: broadcast::Sender<AgentEvent>,
}

impl Orchestrator {
    /// Create an orchestrator. Fails if the configuration is out of bounds.
    pub fn new(
        config: AgentConfig,
        model: Arc<dyn ChatModel>,
        tools: ToolRegistry,
        store: Arc<dyn CheckpointStore>,
    ) -> Result<Self> {
        config.validate()?;
        let (event_tx, _) = broadcast::channel(256);
        Ok(Self {
            config,
            model,
            tools,
            store,
            thread_locks: Mutex::new(HashMap::new()),
            event_tx,
        })
    }

    /// Subscribe to orchestrator events
    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.event_tx.subscribe()
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn model_id(&self) -> &str {
        self.model.model_id()
    }

    fn emit(&self, event: AgentEvent) {
        let _ = self.event_tx.send(event);
    }

    fn thread_lock(&self, thread_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.thread_locks
            .lock()
            .entry(thread_id.to_string())
            .or_default()
            .clone()
    }

    /// Latest committed state, or a fresh one for an unknown thread
    async fn load(&self, thread_id: &str) -> Result<ConversationState> {
        Ok(match self.store.latest_checkpoint(thread_id).await? {
            Some(checkpoint) => checkpoint.state,
            None => ConversationState::new(&self.config.working_directory),
        })
    }

    async fn commit(&self, thread_id: &str, state: &ConversationState) -> Result<u64> {
        let sequence = self.store.append(thread_id, state).await?;
        self.emit(AgentEvent::Checkpointed {
            thread_id: thread_id.to_string(),
            sequence,
        });
        Ok(sequence)
    }

    /// Start a turn with a user message and drive it until it completes or
    /// needs approval
    pub async fn run_turn(&self, thread_id: &str, user_input: &str) -> Result<TurnOutcome> {
        let lock = self.thread_lock(thread_id);
        let _guard = lock.lock().await;

        let state = self.load(thread_id).await?;
        if state.pending_approval {
            return Err(Error::ApprovalPending {
                thread_id: thread_id.to_string(),
            });
        }

        tracing::info!(thread_id, mode = %state.current_mode, "Starting turn");
        self.emit(AgentEvent::TurnStart {
            thread_id: thread_id.to_string(),
        });

        // The seeded state is committed together with the first reasoning
        // result, so a failed first call leaves the thread as it was.
        let seeded = state.begin_turn(Message::user(user_input));
        self.drive(thread_id, seeded, Phase::Reason).await
    }

    /// Apply a human decision to a suspended thread and continue the loop
    pub async fn resume_approval(&self, thread_id: &str, approved: bool) -> Result<TurnOutcome> {
        let lock = self.thread_lock(thread_id);
        let _guard = lock.lock().await;

        let state = self.load(thread_id).await?;
        if !state.pending_approval {
            return Err(Error::NoPendingApproval {
                thread_id: thread_id.to_string(),
            });
        }

        let next = approval::resolve(&state, approved);
        self.commit(thread_id, &next).await?;
        tracing::info!(thread_id, approved, "Approval resolved");
        self.emit(AgentEvent::ApprovalResolved {
            thread_id: thread_id.to_string(),
            approved,
        });

        let phase = if approved {
            Phase::ExecuteTools
        } else {
            Phase::Reason
        };
        self.drive(thread_id, next, phase).await
    }

    /// Run a turn end to end, asking `channel` whenever approval is needed
    pub async fn run_turn_with_approval(
        &self,
        thread_id: &str,
        user_input: &str,
        channel: &dyn ApprovalChannel,
    ) -> Result<TurnOutcome> {
        let outcome = self.run_turn(thread_id, user_input).await?;
        self.settle(thread_id, outcome, channel).await
    }

    /// If the thread is suspended, ask `channel` and drive it to completion
    pub async fn resume_pending(
        &self,
        thread_id: &str,
        channel: &dyn ApprovalChannel,
    ) -> Result<Option<TurnOutcome>> {
        let Some(pending) = self.pending_approval(thread_id).await? else {
            return Ok(None);
        };

        // The state was read without the thread lock, so another caller may
        // settle the thread while the channel is deciding.
        let approved = channel.request_approval(&pending).await;
        match self.resume_approval(thread_id, approved).await {
            Ok(outcome) => self.settle(thread_id, outcome, channel).await.map(Some),
            Err(Error::NoPendingApproval { .. }) => {
                tracing::debug!(thread_id, "Approval already settled elsewhere");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn settle(
        &self,
        thread_id: &str,
        mut outcome: TurnOutcome,
        channel: &dyn ApprovalChannel,
    ) -> Result<TurnOutcome> {
        while let TurnOutcome::AwaitingApproval { pending, .. } = &outcome {
            let approved = channel.request_approval(pending).await;
            outcome = self.resume_approval(thread_id, approved).await?;
        }
        Ok(outcome)
    }

    /// Calls awaiting a decision in the latest checkpoint
    pub async fn pending_approval(&self, thread_id: &str) -> Result<Option<Vec<ToolCall>>> {
        let state = self.load(thread_id).await?;
        Ok(state.pending_tool_calls().map(|calls| calls.to_vec()))
    }

    /// Latest committed state of a thread
    pub async fn state(&self, thread_id: &str) -> Result<ConversationState> {
        self.load(thread_id).await
    }

    /// Switch the operational mode and persist it
    pub async fn set_mode(&self, thread_id: &str, mode: Mode) -> Result<ConversationState> {
        let lock = self.thread_lock(thread_id);
        let _guard = lock.lock().await;

        let mut next = self.load(thread_id).await?;
        next.current_mode = mode;
        self.commit(thread_id, &next).await?;
        tracing::info!(thread_id, %mode, "Mode changed");
        Ok(next)
    }

    /// Destroy every checkpoint of a thread
    pub async fn clear_history(&self, thread_id: &str) -> Result<()> {
        let lock = self.thread_lock(thread_id);
        let _guard = lock.lock().await;

        self.store.clear(thread_id).await?;
        tracing::info!(thread_id, "History cleared");
        Ok(())
    }

    /// Up to `limit` checkpoints, newest first
    pub async fn history(&self, thread_id: &str, limit: usize) -> Result<Vec<ThreadCheckpoint>> {
        let mut checkpoints = self.store.list(thread_id).await?;
        checkpoints.truncate(limit);
        Ok(checkpoints)
    }

    /// Threads with at least one checkpoint
    pub async fn threads(&self) -> Result<Vec<String>> {
        Ok(self.store.threads().await?)
    }

    async fn drive(
        &self,
        thread_id: &str,
        state: ConversationState,
        start: Phase,
    ) -> Result<TurnOutcome> {
        match self.drive_inner(thread_id, state, start).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                tracing::warn!(thread_id, "Turn aborted: {}", e);
                self.emit(AgentEvent::Error {
                    thread_id: thread_id.to_string(),
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn drive_inner(
        &self,
        thread_id: &str,
        mut state: ConversationState,
        mut phase: Phase,
    ) -> Result<TurnOutcome> {
        let tool_schemas = self.tools.schemas();
        let window = ContextWindow::new(
            self.config.max_text_chars,
            self.config.max_recent_messages,
        );

        loop {
            tracing::debug!(thread_id, ?phase, iteration = state.iteration_count, "Transition");
            match phase {
                Phase::Reason => {
                    if state.iteration_count >= self.config.max_iterations {
                        phase = Phase::Done(CompletionReason::IterationLimit);
                        continue;
                    }
                    self.emit(AgentEvent::ReasoningStart {
                        thread_id: thread_id.to_string(),
                        iteration: state.iteration_count + 1,
                    });

                    let step = ReasoningStep {
                        model: self.model.as_ref(),
                        window,
                        system_prompt: &self.config.system_prompt,
                        tools: &tool_schemas,
                    };
                    let next = step.run(&state).await?;
                    self.commit(thread_id, &next).await?;

                    if let Some(message) = next.messages.last() {
                        self.emit(AgentEvent::MessageEnd {
                            thread_id: thread_id.to_string(),
                            message: message.clone(),
                        });
                    }
                    state = next;
                    phase = Phase::Route;
                }
                Phase::Route => {
                    let decision = route(&state, &self.config);
                    self.emit(AgentEvent::Routed {
                        thread_id: thread_id.to_string(),
                        route: decision,
                    });
                    phase = match decision {
                        Route::ContinueAuto => Phase::ExecuteTools,
                        Route::RequestApproval => Phase::Approve,
                        Route::End if !state.last_tool_calls().is_empty() => {
                            Phase::Done(CompletionReason::IterationLimit)
                        }
                        Route::End => Phase::Done(CompletionReason::FinalAnswer),
                    };
                }
                Phase::Approve => {
                    let next = approval::request(&state);
                    self.commit(thread_id, &next).await?;

                    let pending = next.last_tool_calls().to_vec();
                    tracing::info!(thread_id, calls = pending.len(), "Awaiting approval");
                    self.emit(AgentEvent::ApprovalRequested {
                        thread_id: thread_id.to_string(),
                        tool_calls: pending.clone(),
                    });
                    self.emit(AgentEvent::TurnEnd {
                        thread_id: thread_id.to_string(),
                        iterations: next.iteration_count,
                    });
                    return Ok(TurnOutcome::AwaitingApproval {
                        state: next,
                        pending,
                    });
                }
                Phase::ExecuteTools => {
                    let step = ToolExecutionStep {
                        registry: &self.tools,
                        parallel: self.config.parallel_tool_calls,
                        thread_id,
                        events: &self.event_tx,
                    };
                    let next = step.run(&state).await;
                    self.commit(thread_id, &next).await?;
                    state = next;
                    phase = Phase::Reason;
                }
                Phase::Done(reason) => {
                    tracing::info!(
                        thread_id,
                        iterations = state.iteration_count,
                        ?reason,
                        "Turn complete"
                    );
                    self.emit(AgentEvent::TurnEnd {
                        thread_id: thread_id.to_string(),
                        iterations: state.iteration_count,
                    });
                    return Ok(TurnOutcome::Completed { state, reason });
                }
            }
        }
    }
}
