//! Scripted collaborators for unit tests

use async_trait::async_trait;
use nexus_ai::{ChatModel, Completion, Context, ToolCall};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::VecDeque;
use std::time::Duration;

use crate::approval::ApprovalChannel;
use crate::tool::{Tool, ToolError, ToolOutput};

/// Chat model replaying a fixed script of replies
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<Completion, String>>>,
    contexts: Mutex<Vec<Context>>,
}

impl ScriptedModel {
    pub fn new(replies: impl IntoIterator<Item = Completion>) -> Self {
        Self::from_results(replies.into_iter().map(Ok))
    }

    pub fn from_results(replies: impl IntoIterator<Item = Result<Completion, String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            contexts: Mutex::new(vec![]),
        }
    }

    /// Model whose every call fails
    pub fn failing(message: &str) -> Self {
        Self::from_results([Err(message.to_string())])
    }

    /// Model that asks for the same tool call forever
    pub fn looping_tool_call(times: usize) -> Self {
        Self::new((0..times).map(|i| {
            Completion::with_tool_calls(
                format!("step {}", i),
                vec![ToolCall::new(
                    format!("call_{}", i),
                    "delay",
                    json!({"ms": 0, "label": "again"}),
                )],
            )
        }))
    }

    /// Contexts received so far, in call order
    pub fn contexts(&self) -> Vec<Context> {
        self.contexts.lock().clone()
    }

    pub fn calls(&self) -> usize {
        self.contexts.lock().len()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn invoke(&self, context: &Context) -> nexus_ai::Result<Completion> {
        self.contexts.lock().push(context.clone());
        let reply = self.replies.lock().pop_front();
        match reply {
            Some(Ok(completion)) => Ok(completion),
            Some(Err(message)) => Err(nexus_ai::Error::Model(message)),
            None => Err(nexus_ai::Error::Model("script exhausted".into())),
        }
    }

    fn model_id(&self) -> &str {
        "scripted"
    }
}

/// Sleeps `ms` milliseconds, then returns `label`
pub struct DelayTool;

#[async_trait]
impl Tool for DelayTool {
    fn name(&self) -> &str {
        "delay"
    }
    fn description(&self) -> &str {
        "Wait, then echo a label"
    }
    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "ms": { "type": "integer", "minimum": 0 },
                "label": { "type": "string" }
            },
            "required": ["ms"]
        })
    }
    async fn execute(&self, args: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let ms = args["ms"].as_u64().unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(ToolOutput::text(args["label"].as_str().unwrap_or("")))
    }
}

/// Always fails
pub struct FailingTool;

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        "fail"
    }
    fn description(&self) -> &str {
        "Always fails"
    }
    fn parameters_schema(&self) -> serde_json::Value {
        json!({"type": "object"})
    }
    async fn execute(&self, _args: serde_json::Value) -> Result<ToolOutput, ToolError> {
        Err(ToolError::execution("boom"))
    }
}

/// Reports `path` as modified without touching the disk
pub struct WriteRecorderTool;

#[async_trait]
impl Tool for WriteRecorderTool {
    fn name(&self) -> &str {
        "write_recorder"
    }
    fn description(&self) -> &str {
        "Pretend to write a file"
    }
    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": { "path": { "type": "string" } },
            "required": ["path"]
        })
    }
    async fn execute(&self, args: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let path = args["path"].as_str().unwrap_or_default();
        Ok(ToolOutput::text(format!("wrote {}", path)).with_modified_file(path))
    }
}

/// Approval channel answering from a script and recording what it was shown
pub struct RecordingApproval {
    answers: Mutex<VecDeque<bool>>,
    seen: Mutex<Vec<Vec<ToolCall>>>,
}

impl RecordingApproval {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            seen: Mutex::new(vec![]),
        }
    }

    pub fn seen(&self) -> Vec<Vec<ToolCall>> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl ApprovalChannel for RecordingApproval {
    async fn request_approval(&self, tool_calls: &[ToolCall]) -> bool {
        self.seen.lock().push(tool_calls.to_vec());
        self.answers.lock().pop_front().unwrap_or(false)
    }
}
