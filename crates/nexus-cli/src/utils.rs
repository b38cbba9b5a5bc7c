//! Shared utilities

use std::path::{Path, PathBuf};

/// Truncate a string to `max` characters, appending "..." if truncated.
/// Operates on Unicode char boundaries, not bytes.
pub fn truncate_chars(s: &str, max: usize) -> String {
    let mut chars = s.chars();
    let truncated: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        format!("{}...", truncated)
    } else {
        truncated
    }
}

/// First line of `s`, truncated for single-line previews
pub fn preview(s: &str, max: usize) -> String {
    let first = s.lines().next().unwrap_or("");
    let more = s.lines().nth(1).is_some();
    let line = truncate_chars(first, max);
    if more && !line.ends_with("...") {
        format!("{}...", line)
    } else {
        line
    }
}

/// Resolve a tool-supplied path: `~` expands to home, relative paths are
/// joined onto `base`.
pub fn resolve_path(base: &Path, raw: &str) -> PathBuf {
    let expanded = if let Some(stripped) = raw.strip_prefix("~/") {
        match dirs::home_dir() {
            Some(home) => home.join(stripped),
            None => PathBuf::from(raw),
        }
    } else if raw == "~" {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from(raw))
    } else {
        PathBuf::from(raw)
    };

    if expanded.is_absolute() {
        expanded
    } else {
        base.join(expanded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello world", 5), "hello...");
        assert_eq!(truncate_chars("héllo wörld", 4), "héll...");
    }

    #[test]
    fn test_preview_first_line() {
        assert_eq!(preview("one\ntwo", 20), "one...");
        assert_eq!(preview("single", 20), "single");
        assert_eq!(preview("", 20), "");
    }

    #[test]
    fn test_resolve_path() {
        let base = Path::new("/work");
        assert_eq!(resolve_path(base, "src/lib.rs"), PathBuf::from("/work/src/lib.rs"));
        assert_eq!(resolve_path(base, "/etc/hosts"), PathBuf::from("/etc/hosts"));
    }
}
