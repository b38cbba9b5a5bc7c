//! Injected orchestrator configuration

use std::path::PathBuf;
use thiserror::Error;

/// Configuration rejected at construction time
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("max_iterations must be at least 1, got {0}")]
    MaxIterations(u32),

    #[error("max_recent_messages must be at least 1, got {0}")]
    MaxRecentMessages(usize),
}

/// Orchestrator configuration, passed explicitly at construction
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Base system prompt; a mode directive is appended per turn
    pub system_prompt: String,
    /// Reasoning steps allowed per turn before the loop is forced to end
    pub max_iterations: u32,
    /// Whether tool calls need an explicit human decision
    pub approval_required: bool,
    /// Per-message character cap in the context window
    pub max_text_chars: usize,
    /// Non-system messages kept in the context window
    pub max_recent_messages: usize,
    /// Run the tool calls of one response concurrently
    pub parallel_tool_calls: bool,
    /// Working directory recorded in fresh conversation states
    pub working_directory: PathBuf,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: String::new(),
            max_iterations: 25,
            approval_required: true,
            max_text_chars: 10_000,
            max_recent_messages: 15,
            parallel_tool_calls: true,
            working_directory: PathBuf::from("."),
        }
    }
}

impl AgentConfig {
    /// Check the bounds the control loop relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations < 1 {
            return Err(ConfigError::MaxIterations(self.max_iterations));
        }
        if self.max_recent_messages < 1 {
            return Err(ConfigError::MaxRecentMessages(self.max_recent_messages));
        }
        Ok(())
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_approval_required(mut self, required: bool) -> Self {
        self.approval_required = required;
        self
    }
}
