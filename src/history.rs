//! Validation attempt history.
//!
//! `validation-history.json` is the authoritative record of validator
//! verdicts; phase resolution reads the latest attempt from here. Drift
//! metrics keep their own copy for trend analysis.

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::util::atomic_json_write;
use crate::verdict::VerdictKind;

pub const VALIDATION_HISTORY_FILENAME: &str = "validation-history.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationAttempt {
    pub timestamp: String,
    pub result: VerdictKind,
    #[serde(default)]
    pub rejected_indices: Vec<usize>,
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct HistoryFile {
    #[serde(default)]
    attempts: Vec<ValidationAttempt>,
}

pub fn history_path(project_dir: &Path) -> PathBuf {
    project_dir.join(VALIDATION_HISTORY_FILENAME)
}

/// Load all validation attempts. Absent or corrupt history loads empty.
pub fn load_attempts(project_dir: &Path) -> Vec<ValidationAttempt> {
    let path = history_path(project_dir);
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(_) => return Vec::new(),
    };
    match serde_json::from_str::<HistoryFile>(&content) {
        Ok(file) => file.attempts,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "validation history corrupt, starting empty");
            Vec::new()
        }
    }
}

/// Append a validation attempt and rewrite the history atomically.
pub fn append_attempt(
    project_dir: &Path,
    result: VerdictKind,
    rejected_indices: Vec<usize>,
    summary: String,
) -> Result<()> {
    let mut file = HistoryFile {
        attempts: load_attempts(project_dir),
    };
    file.attempts.push(ValidationAttempt {
        timestamp: Utc::now().to_rfc3339(),
        result,
        rejected_indices,
        summary,
    });
    atomic_json_write(&history_path(project_dir), &file)
}

pub fn rejection_count(project_dir: &Path) -> usize {
    load_attempts(project_dir)
        .iter()
        .filter(|a| a.result == VerdictKind::Rejected)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_empty_when_absent() {
        let dir = tempdir().unwrap();
        assert!(load_attempts(dir.path()).is_empty());
        assert_eq!(rejection_count(dir.path()), 0);
    }

    #[test]
    fn test_append_preserves_order() {
        let dir = tempdir().unwrap();
        append_attempt(dir.path(), VerdictKind::Rejected, vec![2], "f2 broken".into()).unwrap();
        append_attempt(dir.path(), VerdictKind::Approved, vec![], "all pass".into()).unwrap();

        let attempts = load_attempts(dir.path());
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[0].result, VerdictKind::Rejected);
        assert_eq!(attempts[0].rejected_indices, vec![2]);
        assert_eq!(attempts[1].result, VerdictKind::Approved);
        assert_eq!(rejection_count(dir.path()), 1);
    }

    #[test]
    fn test_corrupt_history_loads_empty() {
        let dir = tempdir().unwrap();
        std::fs::write(history_path(dir.path()), "[broken").unwrap();
        assert!(load_attempts(dir.path()).is_empty());
    }

    #[test]
    fn test_legacy_attempt_without_indices() {
        let dir = tempdir().unwrap();
        std::fs::write(
            history_path(dir.path()),
            r#"{"attempts": [{"timestamp": "2026-01-01T00:00:00Z", "result": "approved"}]}"#,
        )
        .unwrap();
        let attempts = load_attempts(dir.path());
        assert_eq!(attempts.len(), 1);
        assert!(attempts[0].rejected_indices.is_empty());
    }
}
