//! Feature list artifact.
//!
//! `feature_list.json` is the ordered list of test cases the initializer
//! produces and the implementer works through. Entries are created once
//! and never deleted or reordered; only the status fields (`passes`,
//! `requires_manual_testing`, `blocked`) change after creation.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::ArtifactError;
use crate::util::atomic_json_write;

pub const FEATURE_LIST_FILENAME: &str = "feature_list.json";

/// Category of a feature test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Functional,
    Technical,
    Style,
    Integration,
    ErrorHandling,
}

/// One test case in the feature list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub description: String,
    /// Ordered verification steps.
    pub steps: Vec<String>,
    pub category: Category,
    pub passes: bool,
    #[serde(default)]
    pub requires_manual_testing: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_reason: Option<String>,
}

impl FeatureRecord {
    pub fn is_blocked(&self) -> bool {
        self.blocked == Some(true)
    }

    /// An automated feature is neither manual-only nor blocked.
    pub fn is_automated(&self) -> bool {
        !self.requires_manual_testing && !self.is_blocked()
    }
}

/// Aggregate counts over a feature list, split by automation and status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureCounts {
    pub total: usize,
    pub passing: usize,
    pub blocked: usize,
    pub automated_total: usize,
    pub automated_passing: usize,
    pub manual_total: usize,
    pub manual_passing: usize,
}

impl FeatureCounts {
    /// All automated work done: every non-manual, non-blocked feature passes.
    pub fn automated_complete(&self) -> bool {
        self.automated_total > 0 && self.automated_passing == self.automated_total
    }
}

/// The ordered feature list plus its on-disk location.
#[derive(Debug, Clone)]
pub struct FeatureList {
    path: PathBuf,
    pub features: Vec<FeatureRecord>,
}

impl FeatureList {
    pub fn new(project_dir: &Path, features: Vec<FeatureRecord>) -> Self {
        Self {
            path: Self::path_for(project_dir),
            features,
        }
    }

    pub fn path_for(project_dir: &Path) -> PathBuf {
        project_dir.join(FEATURE_LIST_FILENAME)
    }

    pub fn exists(project_dir: &Path) -> bool {
        Self::path_for(project_dir).exists()
    }

    /// Load and validate the feature list.
    ///
    /// Enforces the blocked-requires-reason invariant at the boundary so
    /// downstream code never sees a blocked feature with no explanation.
    pub fn load(project_dir: &Path) -> Result<Self, ArtifactError> {
        let path = Self::path_for(project_dir);
        let content = std::fs::read_to_string(&path).map_err(|source| {
            ArtifactError::ReadFailed {
                name: "feature list",
                path: path.clone(),
                source,
            }
        })?;

        let features: Vec<FeatureRecord> =
            serde_json::from_str(&content).map_err(|e| ArtifactError::ParseFailed {
                name: "feature list",
                message: e.to_string(),
            })?;

        for (index, feature) in features.iter().enumerate() {
            if feature.is_blocked()
                && feature
                    .blocked_reason
                    .as_deref()
                    .is_none_or(|r| r.trim().is_empty())
            {
                return Err(ArtifactError::BlockedWithoutReason { index });
            }
        }

        Ok(Self { path, features })
    }

    /// Save atomically, preserving order.
    pub fn save(&self) -> Result<()> {
        atomic_json_write(&self.path, &self.features)
            .with_context(|| format!("Failed to save feature list: {}", self.path.display()))
    }

    pub fn counts(&self) -> FeatureCounts {
        let mut counts = FeatureCounts::default();
        for feature in &self.features {
            counts.total += 1;
            if feature.passes {
                counts.passing += 1;
            }
            if feature.is_blocked() {
                counts.blocked += 1;
            }
            if feature.requires_manual_testing {
                counts.manual_total += 1;
                if feature.passes {
                    counts.manual_passing += 1;
                }
            } else if !feature.is_blocked() {
                counts.automated_total += 1;
                if feature.passes {
                    counts.automated_passing += 1;
                }
            }
        }
        counts
    }

    /// Mark the given features failed (passes=false), e.g. after a rejected
    /// validation. Out-of-range indices are reported, valid ones applied.
    ///
    /// Returns the number of features actually flipped.
    pub fn mark_failed(&mut self, indices: &[usize]) -> (usize, Vec<String>) {
        let mut errors = Vec::new();
        let mut updated = 0;
        let max_index = self.features.len().saturating_sub(1);

        for &idx in indices {
            match self.features.get_mut(idx) {
                Some(feature) => {
                    if feature.passes {
                        feature.passes = false;
                        updated += 1;
                    }
                }
                None => errors.push(format!("Invalid feature index: {idx} (max: {max_index})")),
            }
        }

        (updated, errors)
    }
}
