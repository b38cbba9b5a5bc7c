//! Configuration file support

use nexus_agent::AgentConfig;
use nexus_ai::providers::openai::{DEFAULT_BASE_URL, OpenAiSettings};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::approval::ApprovalDefault;

const DEFAULT_MODEL: &str = "gpt-4o";
const DEFAULT_SHELL_TIMEOUT_SECS: u64 = 120;

/// Configuration for nexus
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model to use
    pub model: Option<String>,
    /// OpenAI-compatible endpoint
    pub base_url: Option<String>,
    /// API key (alternative to OPENAI_API_KEY)
    pub api_key: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Reasoning steps allowed per turn
    pub max_iterations: Option<u32>,
    /// Ask before running tools
    pub approval_required: Option<bool>,
    /// Answer used when the approval prompt gets an empty line
    pub approval_default: Option<ApprovalDefault>,
    /// Per-message character cap sent to the model
    pub max_text_chars: Option<usize>,
    /// Messages kept in the model's context
    pub max_recent_messages: Option<usize>,
    /// Run the tool calls of one response concurrently
    pub parallel_tool_calls: Option<bool>,
    /// Directory for checkpoint files
    pub checkpoint_dir: Option<PathBuf>,
    /// Log filter used when RUST_LOG is unset
    pub log_level: Option<String>,
    pub working_directory: Option<PathBuf>,
    /// Default timeout for run_shell
    pub shell_timeout_secs: Option<u64>,
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("nexus")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        // Check for NEXUS_CONFIG_PATH env var first
        if let Ok(path) = std::env::var("NEXUS_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from a file, falling back to defaults on any problem
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: Failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("Warning: Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    /// Create a default config file if it doesn't exist
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&path, example_config())?;
        Ok(path)
    }

    /// Get the API key, checking config then env
    pub fn get_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|k| !k.is_empty())
    }
}

/// Values supplied on the command line; these win over the file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub model: Option<String>,
    pub working_directory: Option<PathBuf>,
    pub no_approval: bool,
}

/// Effective settings after merging file, flags and defaults
#[derive(Debug, Clone)]
pub struct Settings {
    pub config_path: PathBuf,
    pub model: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub max_iterations: u32,
    pub approval_required: bool,
    pub approval_default: ApprovalDefault,
    pub max_text_chars: usize,
    pub max_recent_messages: usize,
    pub parallel_tool_calls: bool,
    pub checkpoint_dir: PathBuf,
    pub log_level: String,
    pub working_directory: PathBuf,
    pub shell_timeout_secs: u64,
}

impl Settings {
    pub fn resolve(config: Config, overrides: Overrides, config_path: PathBuf) -> Self {
        let defaults = AgentConfig::default();
        let api_key = config.get_api_key();

        let working_directory = overrides
            .working_directory
            .or(config.working_directory)
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        let working_directory = fs::canonicalize(&working_directory).unwrap_or(working_directory);

        Self {
            config_path,
            model: overrides
                .model
                .or(config.model)
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: config
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_iterations: config.max_iterations.unwrap_or(defaults.max_iterations),
            approval_required: !overrides.no_approval
                && config
                    .approval_required
                    .unwrap_or(defaults.approval_required),
            approval_default: config.approval_default.unwrap_or_default(),
            max_text_chars: config.max_text_chars.unwrap_or(defaults.max_text_chars),
            max_recent_messages: config
                .max_recent_messages
                .unwrap_or(defaults.max_recent_messages),
            parallel_tool_calls: config
                .parallel_tool_calls
                .unwrap_or(defaults.parallel_tool_calls),
            checkpoint_dir: config
                .checkpoint_dir
                .unwrap_or_else(default_checkpoint_dir),
            log_level: config.log_level.unwrap_or_else(|| "warn".to_string()),
            working_directory,
            shell_timeout_secs: config
                .shell_timeout_secs
                .unwrap_or(DEFAULT_SHELL_TIMEOUT_SECS),
        }
    }

    pub fn agent_config(&self, system_prompt: String) -> AgentConfig {
        AgentConfig {
            system_prompt,
            max_iterations: self.max_iterations,
            approval_required: self.approval_required,
            max_text_chars: self.max_text_chars,
            max_recent_messages: self.max_recent_messages,
            parallel_tool_calls: self.parallel_tool_calls,
            working_directory: self.working_directory.clone(),
        }
    }

    pub fn openai_settings(&self) -> OpenAiSettings {
        OpenAiSettings {
            model: self.model.clone(),
            base_url: self.base_url.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    /// Label/value pairs for display. The API key is masked.
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        let optional = |v: Option<String>| v.unwrap_or_else(|| "(default)".to_string());
        vec![
            ("Config File", self.config_path.display().to_string()),
            ("Model", self.model.clone()),
            ("Base URL", self.base_url.clone()),
            (
                "API Key",
                match &self.api_key {
                    Some(key) => mask_key(key),
                    None => "(not set)".to_string(),
                },
            ),
            ("Temperature", optional(self.temperature.map(|t| t.to_string()))),
            ("Max Tokens", optional(self.max_tokens.map(|t| t.to_string()))),
            ("Max Iterations", self.max_iterations.to_string()),
            ("Approval Required", self.approval_required.to_string()),
            ("Approval Default", self.approval_default.to_string()),
            ("Max Text Chars", self.max_text_chars.to_string()),
            ("Max Recent Messages", self.max_recent_messages.to_string()),
            ("Parallel Tool Calls", self.parallel_tool_calls.to_string()),
            ("Checkpoint Dir", self.checkpoint_dir.display().to_string()),
            ("Log Level", self.log_level.clone()),
            ("Working Dir", self.working_directory.display().to_string()),
            ("Shell Timeout", format!("{}s", self.shell_timeout_secs)),
        ]
    }

    /// Settings formatted as an aligned two-column table
    pub fn table(&self) -> String {
        let rows = self.rows();
        let width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
        rows.iter()
            .map(|(label, value)| format!("  {:<width$}  {}", label, value, width = width))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn default_checkpoint_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("nexus")
        .join("checkpoints")
}

fn mask_key(key: &str) -> String {
    let count = key.chars().count();
    if count <= 8 {
        return "*".repeat(count);
    }
    let head: String = key.chars().take(3).collect();
    let tail: String = key.chars().skip(count - 4).collect();
    format!("{}...{}", head, tail)
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# nexus configuration file
# Place at ~/.config/nexus/config.toml (Linux) or set NEXUS_CONFIG_PATH

# Model to use (any OpenAI-compatible chat model)
model = "gpt-4o"

# OpenAI-compatible endpoint
# base_url = "https://api.openai.com/v1"

# API key (optional - OPENAI_API_KEY is used when unset)
# api_key = "sk-..."

# temperature = 0.2
# max_tokens = 4096

# Reasoning steps allowed per user turn
max_iterations = 25

# Ask before running any tool
approval_required = true

# Empty answer at the approval prompt: "approve", "deny" or "ask" (re-prompt)
approval_default = "ask"

# Context window limits
max_text_chars = 10000
max_recent_messages = 15

# Run the tool calls of one response concurrently
parallel_tool_calls = true

# Where checkpoints are stored (default: <data dir>/nexus/checkpoints)
# checkpoint_dir = "/path/to/checkpoints"

# Log filter used when RUST_LOG is unset
log_level = "warn"

# Default timeout for run_shell, in seconds
shell_timeout_secs = 120
"#
}
