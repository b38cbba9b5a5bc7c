//! nexus-ai: message model and reasoning-capability abstraction
//!
//! This crate defines the conversation message types shared by the
//! orchestrator, the [`ChatModel`] trait through which the reasoning
//! capability is consumed, and an OpenAI-compatible implementation.

pub mod error;
pub mod providers;
pub mod types;

pub use error::{Error, Result};
pub use providers::ChatModel;
pub use types::*;
