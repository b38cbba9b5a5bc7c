//! System prompt loading

use std::fs;
use std::path::Path;

/// Built-in system prompt used when the project doesn't provide one
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are Nexus, an elite AI coding agent.

IMPORTANT: Start every response with a 'THOUGHT:' block explaining what you are about to do.

Example:
THOUGHT: I am going to list the files in the working directory to understand the project structure.
[tool_call]

Your tools:
- read_file: read a text file
- write_file: create or overwrite a file
- list_directory: list a directory
- run_shell: run a shell command in the working directory

Guidelines:
1. Explain your reasoning before taking actions
2. Use tools efficiently and in the correct order
3. Avoid reading or listing ignored directories (target, node_modules, .venv, __pycache__) unless asked
4. Ask for clarification when needed
5. Follow the conventions of the language and project at hand
6. Be concise but thorough in your responses

Tool calls may require the user's approval. A rejected call was not executed; adjust your plan rather than repeating it.";

/// Project override, relative to the working directory
pub const PROMPT_OVERRIDE_PATH: &str = ".nexus/prompts/system_prompt.md";

/// Load the base system prompt for `working_dir`, falling back to the
/// built-in prompt. The working directory is appended either way.
pub fn load_system_prompt(working_dir: &Path) -> String {
    let path = working_dir.join(PROMPT_OVERRIDE_PATH);
    let base = match fs::read_to_string(&path) {
        Ok(content) if !content.trim().is_empty() => {
            tracing::debug!("Using system prompt from {}", path.display());
            content
        }
        Ok(_) => DEFAULT_SYSTEM_PROMPT.to_string(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => DEFAULT_SYSTEM_PROMPT.to_string(),
        Err(e) => {
            tracing::warn!("Failed to read {}: {}", path.display(), e);
            DEFAULT_SYSTEM_PROMPT.to_string()
        }
    };

    format!(
        "{}\n\nWorking directory: {}",
        base.trim_end(),
        working_dir.display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let prompt = load_system_prompt(dir.path());
        assert!(prompt.starts_with("You are Nexus"));
        assert!(prompt.ends_with(&format!("Working directory: {}", dir.path().display())));
    }

    #[test]
    fn test_project_override() {
        let dir = tempfile::tempdir().unwrap();
        let prompts = dir.path().join(".nexus/prompts");
        fs::create_dir_all(&prompts).unwrap();
        fs::write(prompts.join("system_prompt.md"), "Custom prompt.\n").unwrap();

        let prompt = load_system_prompt(dir.path());
        assert!(prompt.starts_with("Custom prompt.\n\nWorking directory:"));
    }

    #[test]
    fn test_blank_override_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let prompts = dir.path().join(".nexus/prompts");
        fs::create_dir_all(&prompts).unwrap();
        fs::write(prompts.join("system_prompt.md"), "  \n").unwrap();

        assert!(load_system_prompt(dir.path()).starts_with("You are Nexus"));
    }
}
