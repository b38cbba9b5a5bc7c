//! nexus-agent: Checkpointed agent orchestration loop
//!
//! This crate provides the control loop that mediates between a reasoning
//! capability, a set of tools and an optional human approval gate, with every
//! transition persisted to a checkpoint store.

pub mod approval;
pub mod checkpoint;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod execution;
pub mod memory;
pub mod orchestrator;
pub mod reasoning;
pub mod routing;
pub mod state;
pub mod tool;

#[cfg(test)]
mod test_support;

pub use approval::{ApprovalChannel, StaticApproval};
pub use checkpoint::{
    CheckpointError, CheckpointStore, JsonlCheckpointStore, MemoryCheckpointStore,
    ThreadCheckpoint,
};
pub use config::{AgentConfig, ConfigError};
pub use context::{ContextWindow, TRUNCATION_MARKER};
pub use error::{Error, Result};
pub use events::AgentEvent;
pub use memory::ConversationMemory;
pub use orchestrator::{CompletionReason, Orchestrator, TurnOutcome};
pub use routing::Route;
pub use state::{ConversationState, Mode, ToolCallRecord, ToolOutcome};
pub use tool::{BoxedTool, Tool, ToolError, ToolOutput, ToolRegistry};
