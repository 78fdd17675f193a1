//! Decision record log.
//!
//! Architectural decisions made during sessions are captured as
//! append-only records in `architecture/decisions.yaml`, so later sessions
//! can discover the constraints earlier ones created. Existing records are
//! never edited or removed.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::architecture::{ARCH_DIR_NAME, DECISIONS_FILE};
use crate::errors::ArtifactError;
use crate::util::atomic_write;

/// A single architectural decision record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    /// Identifier of the form "DR-NNN".
    pub id: String,
    #[serde(default)]
    pub timestamp: String,
    /// Session number that made this decision.
    #[serde(default)]
    pub session: u32,
    pub topic: String,
    pub choice: String,
    #[serde(default)]
    pub alternatives_considered: Vec<String>,
    #[serde(default)]
    pub rationale: String,
    /// Constraints future sessions must honor.
    #[serde(default)]
    pub constraints_created: Vec<String>,
    /// Feature indices this decision affects.
    #[serde(default)]
    pub affects_features: Vec<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
struct DecisionsFile {
    #[serde(default = "default_version")]
    version: u32,
    #[serde(default)]
    locked_at: String,
    #[serde(default)]
    decisions: Vec<DecisionRecord>,
}

fn default_version() -> u32 {
    1
}

pub fn decisions_path(project_dir: &Path) -> PathBuf {
    project_dir.join(ARCH_DIR_NAME).join(DECISIONS_FILE)
}

/// Load all decision records. A missing file is an empty list.
pub fn load_decisions(project_dir: &Path) -> Result<Vec<DecisionRecord>, ArtifactError> {
    let path = decisions_path(project_dir);
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = std::fs::read_to_string(&path).map_err(|source| ArtifactError::ReadFailed {
        name: "decisions.yaml",
        path: path.clone(),
        source,
    })?;

    let file: DecisionsFile =
        serde_yaml::from_str(&content).map_err(|e| ArtifactError::ParseFailed {
            name: "decisions.yaml",
            message: e.to_string(),
        })?;

    Ok(file.decisions)
}

/// Append a decision record. Existing records are preserved untouched.
pub fn append_decision(project_dir: &Path, record: DecisionRecord) -> Result<()> {
    let path = decisions_path(project_dir);
    std::fs::create_dir_all(project_dir.join(ARCH_DIR_NAME))
        .context("Failed to create architecture directory")?;

    let mut file = if path.exists() {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?
    } else {
        DecisionsFile {
            version: 1,
            locked_at: Utc::now().to_rfc3339(),
            decisions: Vec::new(),
        }
    };

    file.decisions.push(record);

    let content = serde_yaml::to_string(&file).context("Failed to serialize decisions")?;
    atomic_write(&path, &content)
}

/// Next available decision id ("DR-001", "DR-002", ...).
pub fn next_decision_id(project_dir: &Path) -> String {
    let decisions = load_decisions(project_dir).unwrap_or_default();

    let Some(last) = decisions.last() else {
        return "DR-001".to_string();
    };

    match last.id.split('-').nth(1).and_then(|n| n.parse::<u32>().ok()) {
        Some(num) => format!("DR-{:03}", num + 1),
        None => format!("DR-{:03}", decisions.len() + 1),
    }
}

/// Decisions whose `affects_features` includes the given feature index.
pub fn relevant_decisions(
    project_dir: &Path,
    feature_index: usize,
) -> Result<Vec<DecisionRecord>, ArtifactError> {
    let decisions = load_decisions(project_dir)?;
    Ok(decisions
        .into_iter()
        .filter(|d| d.affects_features.contains(&feature_index))
        .collect())
}

/// Flat list of every constraint created by any decision.
pub fn all_constraints(project_dir: &Path) -> Result<Vec<String>, ArtifactError> {
    let decisions = load_decisions(project_dir)?;
    Ok(decisions
        .into_iter()
        .flat_map(|d| d.constraints_created)
        .collect())
}
