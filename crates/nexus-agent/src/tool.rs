//! Tool trait and registry

use async_trait::async_trait;
use nexus_ai::ToolSchema;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Why a tool call produced no output
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    #[error("Tool '{name}' timed out after {}s", timeout.as_secs())]
    Timeout { name: String, timeout: Duration },

    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("{0}")]
    Execution(String),
}

impl ToolError {
    pub fn execution(message: impl Into<String>) -> Self {
        ToolError::Execution(message.into())
    }

    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        ToolError::InvalidArguments(message.into())
    }
}

/// Successful tool result
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolOutput {
    /// Text returned to the reasoning capability
    pub content: String,
    /// Paths written by the tool
    pub modified_files: Vec<PathBuf>,
}

impl ToolOutput {
    /// Create a text result
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            modified_files: vec![],
        }
    }

    /// Record a modified path
    pub fn with_modified_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.modified_files.push(path.into());
        self
    }
}

/// Trait for executable tools
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (used in API calls)
    fn name(&self) -> &str;

    /// Tool description for the reasoning capability
    fn description(&self) -> &str;

    /// JSON Schema for parameters
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given arguments
    async fn execute(&self, args: serde_json::Value) -> Result<ToolOutput, ToolError>;
}

/// Type alias for a boxed tool
pub type BoxedTool = Arc<dyn Tool>;

/// Convert a Tool to the schema advertised to the reasoning capability
pub fn to_schema(tool: &dyn Tool) -> ToolSchema {
    ToolSchema::new(tool.name(), tool.description(), tool.parameters_schema())
}

/// Registered tools with their compiled argument validators
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<BoxedTool>,
    /// Cached compiled JSON schema validators keyed by tool name
    schema_cache: HashMap<String, Arc<jsonschema::Validator>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a list of tools
    pub fn from_tools(tools: impl IntoIterator<Item = BoxedTool>) -> Self {
        let mut registry = Self::new();
        for tool in tools {
            registry.register(tool);
        }
        registry
    }

    /// Add a tool, replacing any tool of the same name
    pub fn register(&mut self, tool: BoxedTool) {
        self.cache_tool_schema(&tool);
        self.tools.retain(|t| t.name() != tool.name());
        self.tools.push(tool);
    }

    /// Compile and cache the JSON schema validator for a tool.
    fn cache_tool_schema(&mut self, tool: &BoxedTool) {
        let schema = tool.parameters_schema();
        match jsonschema::validator_for(&schema) {
            Ok(validator) => {
                self.schema_cache
                    .insert(tool.name().to_string(), Arc::new(validator));
            }
            Err(e) => {
                self.schema_cache.remove(tool.name());
                tracing::warn!(
                    "Invalid tool parameter schema for '{}', skipping validation: {}",
                    tool.name(),
                    e
                );
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&BoxedTool> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.iter().map(|t| to_schema(t.as_ref())).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Look up, validate and run one call. Never panics on bad input.
    pub async fn execute(&self, name: &str, args: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        if let Some(validator) = self.schema_cache.get(name) {
            if let Some(err) = validate_with_validator(&args, validator) {
                return Err(ToolError::InvalidArguments(err));
            }
        }

        tool.execute(args).await
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

/// Validate tool arguments using a pre-compiled validator.
/// Returns `Some(error_message)` if validation fails, `None` if valid.
fn validate_with_validator(
    args: &serde_json::Value,
    validator: &jsonschema::Validator,
) -> Option<String> {
    let errors: Vec<String> = validator
        .iter_errors(args)
        .map(|e| {
            let path = e.instance_path.to_string();
            if path.is_empty() {
                e.to_string()
            } else {
                format!("{}: {}", path, e)
            }
        })
        .collect();

    if errors.is_empty() {
        None
    } else {
        Some(errors.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// A simple test tool that echoes its arguments.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes input"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string" }
                },
                "required": ["text"]
            })
        }
        async fn execute(&self, args: serde_json::Value) -> Result<ToolOutput, ToolError> {
            let text = args
                .get("text")
                .and_then(|v| v.as_str())
                .ok_or_else(|| ToolError::invalid_arguments("missing text"))?;
            Ok(ToolOutput::text(text))
        }
    }

    struct BadSchemaTool;

    #[async_trait]
    impl Tool for BadSchemaTool {
        fn name(&self) -> &str {
            "bad"
        }
        fn description(&self) -> &str {
            "Has an uncompilable schema"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            json!({"type": "not_a_real_type"})
        }
        async fn execute(&self, _args: serde_json::Value) -> Result<ToolOutput, ToolError> {
            Ok(ToolOutput::text("ran"))
        }
    }

    fn registry() -> ToolRegistry {
        ToolRegistry::from_tools([Arc::new(EchoTool) as BoxedTool])
    }

    #[tokio::test]
    async fn test_execute_valid_args() {
        let out = registry().execute("echo", json!({"text": "hello"})).await.unwrap();
        assert_eq!(out.content, "hello");
        assert!(out.modified_files.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_tool_not_found() {
        let err = registry().execute("nope", json!({})).await.unwrap_err();
        assert_eq!(err, ToolError::NotFound("nope".into()));
        assert_eq!(err.to_string(), "Tool not found: nope");
    }

    #[tokio::test]
    async fn test_missing_required_arg_rejected() {
        let err = registry().execute("echo", json!({})).await.unwrap_err();
        match err {
            ToolError::InvalidArguments(msg) => assert!(msg.contains("text"), "got: {}", msg),
            other => panic!("expected InvalidArguments, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_wrong_type_reports_path() {
        let err = registry().execute("echo", json!({"text": 5})).await.unwrap_err();
        match err {
            ToolError::InvalidArguments(msg) => assert!(msg.contains("/text"), "got: {}", msg),
            other => panic!("expected InvalidArguments, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_schema_skips_validation() {
        let registry = ToolRegistry::from_tools([Arc::new(BadSchemaTool) as BoxedTool]);
        let out = registry.execute("bad", json!({"anything": true})).await.unwrap();
        assert_eq!(out.content, "ran");
    }

    #[test]
    fn test_register_replaces_same_name() {
        let mut registry = registry();
        registry.register(Arc::new(EchoTool));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.names(), vec!["echo"]);
    }

    #[test]
    fn test_to_schema() {
        let schema = to_schema(&EchoTool);
        assert_eq!(schema.name, "echo");
        assert_eq!(schema.description, "Echoes input");
        assert_eq!(schema.parameters["required"][0], "text");
    }

    #[test]
    fn test_timeout_display() {
        let err = ToolError::Timeout {
            name: "run_shell".into(),
            timeout: Duration::from_secs(30),
        };
        assert_eq!(err.to_string(), "Tool 'run_shell' timed out after 30s");
    }

    #[test]
    fn test_output_modified_files() {
        let out = ToolOutput::text("wrote").with_modified_file("src/main.rs");
        assert_eq!(out.modified_files, vec![PathBuf::from("src/main.rs")]);
    }
}
