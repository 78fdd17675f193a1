//! Shared utility functions for the conductor crate.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Write `content` atomically: to a sibling `.tmp` file first, then
/// rename over the target, so a crash mid-write never leaves a truncated
/// artifact behind.
pub fn atomic_write(path: &Path, content: &str) -> Result<()> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    std::fs::write(&tmp_path, content)
        .with_context(|| format!("Failed to write temp file {}", tmp_path.display()))?;

    if let Err(e) = std::fs::rename(&tmp_path, path) {
        // Leave no temp file behind on a failed rename.
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e).with_context(|| format!("Failed to replace {}", path.display()));
    }

    Ok(())
}

/// Serialize a value to pretty JSON and write it atomically.
pub fn atomic_json_write<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)
        .with_context(|| format!("Failed to serialize JSON for {}", path.display()))?;
    atomic_write(path, &content)
}

/// Extract the outermost JSON object from text that may contain other content.
///
/// Brace-counts while skipping string literals, so braces inside quoted
/// values do not unbalance the scan.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_atomic_json_write_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json");
        atomic_json_write(&path, &vec![1, 2, 3]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<i32> = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, vec![1, 2, 3]);
        // Temp file must not linger
        assert!(!dir.path().join("data.json.tmp").exists());
    }

    #[test]
    fn test_atomic_write_plain_text() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.yaml");
        atomic_write(&path, "version: 1\n").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "version: 1\n");
        assert!(!dir.path().join("notes.yaml.tmp").exists());
    }

    #[test]
    fn test_atomic_json_write_replaces_existing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json");
        atomic_json_write(&path, &"first").unwrap();
        atomic_json_write(&path, &"second").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "\"second\"");
    }

    #[test]
    fn test_extract_json_object_simple() {
        assert_eq!(
            extract_json_object(r#"{"key": "value"}"#),
            Some(r#"{"key": "value"}"#)
        );
    }

    #[test]
    fn test_extract_json_object_surrounded_by_text() {
        let text = r#"Verdict below: {"verdict": "APPROVED"} and notes after"#;
        assert_eq!(extract_json_object(text), Some(r#"{"verdict": "APPROVED"}"#));
    }

    #[test]
    fn test_extract_json_object_nested() {
        let text = r#"{"outer": {"inner": 1}}"#;
        assert_eq!(extract_json_object(text), Some(text));
    }

    #[test]
    fn test_extract_json_object_brace_inside_string() {
        let text = r#"{"summary": "used {braces} here"}"#;
        assert_eq!(extract_json_object(text), Some(text));
    }

    #[test]
    fn test_extract_json_object_escaped_quote_inside_string() {
        let text = r#"{"summary": "quote \" and } brace"}"#;
        assert_eq!(extract_json_object(text), Some(text));
    }

    #[test]
    fn test_extract_json_object_none_on_plain_text() {
        assert_eq!(extract_json_object("no json here"), None);
    }

    #[test]
    fn test_extract_json_object_none_on_unclosed() {
        assert_eq!(extract_json_object(r#"{"key": "value""#), None);
    }
}
