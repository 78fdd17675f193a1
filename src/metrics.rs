//! Drift metrics for long-running agent work.
//!
//! Sessions and validation attempts append to `drift-metrics.json` in the
//! project directory. Aggregates stored alongside the history are a
//! convenience; an integrity check recomputes them on load and warns when
//! they disagree. Trend indicators are always computed fresh, never stored.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::util::atomic_json_write;
use crate::verdict::VerdictKind;

pub const METRICS_FILENAME: &str = "drift-metrics.json";

/// Relative velocity change needed before a trend registers. Filters
/// session-to-session noise, which runs around 5-8% in practice.
const VELOCITY_TREND_THRESHOLD: f64 = 0.10;

/// Absolute floor on the velocity change, in features per session.
/// Keeps 2.0 -> 1.6 from reading as a decline.
const VELOCITY_MIN_ABSOLUTE_THRESHOLD: f64 = 0.5;

/// Sessions required before a velocity trend is worth reporting.
const VELOCITY_MIN_SESSIONS: usize = 6;

/// One coding session's outcomes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: u32,
    pub timestamp: String,
    pub features_attempted: u32,
    pub features_completed: u32,
    #[serde(default)]
    pub regressions_caught: u32,
    #[serde(default)]
    pub evaluation_sections_present: Vec<String>,
    #[serde(default = "default_completeness")]
    pub evaluation_completeness_score: f64,
    #[serde(default)]
    pub is_multi_feature: bool,
}

fn default_completeness() -> f64 {
    1.0
}

/// One validation attempt's outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationRecord {
    pub attempt: u32,
    pub timestamp: String,
    pub verdict: VerdictKind,
    pub features_tested: u32,
    pub features_failed: u32,
    #[serde(default)]
    pub failure_reasons: Vec<String>,
}

/// Append-only project history plus running totals.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DriftHistory {
    #[serde(default)]
    pub sessions: Vec<SessionRecord>,
    #[serde(default)]
    pub validation_attempts: Vec<ValidationRecord>,
    #[serde(default)]
    pub total_sessions: u32,
    #[serde(default)]
    pub total_regressions_caught: u32,
    #[serde(default)]
    pub average_features_per_session: f64,
    #[serde(default)]
    pub rejection_count: u32,
}

impl DriftHistory {
    /// Recompute the running totals from the histories.
    pub fn recompute_totals(&mut self) {
        self.total_sessions = self.sessions.len() as u32;
        self.total_regressions_caught = self.sessions.iter().map(|s| s.regressions_caught).sum();
        self.average_features_per_session = if self.sessions.is_empty() {
            0.0
        } else {
            let completed: u32 = self.sessions.iter().map(|s| s.features_completed).sum();
            f64::from(completed) / self.sessions.len() as f64
        };
        self.rejection_count = self
            .validation_attempts
            .iter()
            .filter(|v| v.verdict == VerdictKind::Rejected)
            .count() as u32;
    }

    /// Compare stored totals against recomputed values. Mismatches mean
    /// the file was corrupted or hand-edited.
    pub fn integrity_errors(&self) -> Vec<String> {
        let mut expected = self.clone();
        expected.recompute_totals();

        let mut errors = Vec::new();
        if self.total_sessions != expected.total_sessions {
            errors.push(format!(
                "total_sessions mismatch: stored={}, calculated={}",
                self.total_sessions, expected.total_sessions
            ));
        }
        if self.total_regressions_caught != expected.total_regressions_caught {
            errors.push(format!(
                "total_regressions_caught mismatch: stored={}, calculated={}",
                self.total_regressions_caught, expected.total_regressions_caught
            ));
        }
        if (self.average_features_per_session - expected.average_features_per_session).abs() > 0.01
        {
            errors.push(format!(
                "average_features_per_session mismatch: stored={:.2}, calculated={:.2}",
                self.average_features_per_session, expected.average_features_per_session
            ));
        }
        if self.rejection_count != expected.rejection_count {
            errors.push(format!(
                "rejection_count mismatch: stored={}, calculated={}",
                self.rejection_count, expected.rejection_count
            ));
        }
        errors
    }
}

/// Direction of feature velocity over the session history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VelocityTrend {
    InsufficientData,
    Increasing,
    Stable,
    Decreasing,
}

impl VelocityTrend {
    pub fn as_str(&self) -> &'static str {
        match self {
            VelocityTrend::InsufficientData => "insufficient_data",
            VelocityTrend::Increasing => "increasing",
            VelocityTrend::Stable => "stable",
            VelocityTrend::Decreasing => "decreasing",
        }
    }
}

/// Computed drift indicators. All rates are fractions in 0.0..=1.0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriftIndicators {
    /// Fraction of sessions that caught at least one regression.
    pub regression_rate: f64,
    pub velocity_trend: VelocityTrend,
    /// Fraction of validation attempts that were rejected.
    pub rejection_rate: f64,
    /// Fraction of sessions that completed more than one feature.
    pub multi_feature_rate: f64,
    /// Fraction of sessions whose evaluation sections were incomplete.
    pub incomplete_evaluation_rate: f64,
}

impl DriftIndicators {
    pub fn compute(history: &DriftHistory) -> DriftIndicators {
        let sessions = &history.sessions;
        let n = sessions.len();

        let rate = |count: usize| if n == 0 { 0.0 } else { count as f64 / n as f64 };

        let regression_rate = rate(sessions.iter().filter(|s| s.regressions_caught > 0).count());
        let multi_feature_rate = rate(sessions.iter().filter(|s| s.is_multi_feature).count());
        let incomplete_evaluation_rate = rate(
            sessions
                .iter()
                .filter(|s| s.evaluation_completeness_score < 1.0)
                .count(),
        );

        let rejection_rate = if history.validation_attempts.is_empty() {
            0.0
        } else {
            history
                .validation_attempts
                .iter()
                .filter(|v| v.verdict == VerdictKind::Rejected)
                .count() as f64
                / history.validation_attempts.len() as f64
        };

        DriftIndicators {
            regression_rate,
            velocity_trend: velocity_trend(sessions),
            rejection_rate,
            multi_feature_rate,
            incomplete_evaluation_rate,
        }
    }
}

/// Compare average completions between the older and newer half of the
/// history. The change must clear both a relative and an absolute
/// threshold to register as a trend.
fn velocity_trend(sessions: &[SessionRecord]) -> VelocityTrend {
    if sessions.len() < VELOCITY_MIN_SESSIONS {
        return VelocityTrend::InsufficientData;
    }

    let mid = sessions.len() / 2;
    let avg = |half: &[SessionRecord]| {
        let completed: u32 = half.iter().map(|s| s.features_completed).sum();
        f64::from(completed) / half.len() as f64
    };
    let first_avg = avg(&sessions[..mid]);
    let second_avg = avg(&sessions[mid..]);

    let threshold = (first_avg * VELOCITY_TREND_THRESHOLD).max(VELOCITY_MIN_ABSOLUTE_THRESHOLD);
    if second_avg > first_avg + threshold {
        VelocityTrend::Increasing
    } else if second_avg < first_avg - threshold {
        VelocityTrend::Decreasing
    } else {
        VelocityTrend::Stable
    }
}

pub fn metrics_path(project_dir: &Path) -> PathBuf {
    project_dir.join(METRICS_FILENAME)
}

/// Load the drift history. Absent or corrupt files yield an empty
/// history; corruption and total mismatches are logged, not fatal.
pub fn load_history(project_dir: &Path) -> DriftHistory {
    let path = metrics_path(project_dir);
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(_) => return DriftHistory::default(),
    };

    let history: DriftHistory = match serde_json::from_str(&content) {
        Ok(history) => history,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "drift metrics corrupt, starting empty");
            return DriftHistory::default();
        }
    };

    for error in history.integrity_errors() {
        warn!(path = %path.display(), "drift metrics integrity issue: {error}");
    }

    history
}

pub fn save_history(project_dir: &Path, history: &DriftHistory) -> Result<()> {
    atomic_json_write(&metrics_path(project_dir), history)
}

/// Advisory lock held across a read-modify-write of the metrics file.
struct MetricsLock {
    file: File,
}

impl MetricsLock {
    fn acquire(project_dir: &Path) -> Result<MetricsLock> {
        let lock_path = project_dir.join(format!("{METRICS_FILENAME}.lock"));
        let file = File::create(&lock_path)
            .with_context(|| format!("failed to create metrics lock at {}", lock_path.display()))?;
        file.lock_exclusive()
            .with_context(|| format!("failed to lock {}", lock_path.display()))?;
        Ok(MetricsLock { file })
    }
}

impl Drop for MetricsLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

/// Append a session record and refresh the running totals.
#[allow(clippy::too_many_arguments)]
pub fn record_session(
    project_dir: &Path,
    session_id: u32,
    features_attempted: u32,
    features_completed: u32,
    regressions_caught: u32,
    evaluation_sections_present: Vec<String>,
    evaluation_completeness_score: f64,
) -> Result<()> {
    let _lock = MetricsLock::acquire(project_dir)?;

    let mut history = load_history(project_dir);
    history.sessions.push(SessionRecord {
        session_id,
        timestamp: Utc::now().to_rfc3339(),
        features_attempted,
        features_completed,
        regressions_caught,
        evaluation_sections_present,
        evaluation_completeness_score,
        is_multi_feature: features_completed > 1,
    });
    history.recompute_totals();
    save_history(project_dir, &history)
}

/// Append a validation record and refresh the running totals.
pub fn record_validation(
    project_dir: &Path,
    verdict: VerdictKind,
    features_tested: u32,
    features_failed: u32,
    failure_reasons: Vec<String>,
) -> Result<()> {
    let _lock = MetricsLock::acquire(project_dir)?;

    let mut history = load_history(project_dir);
    let attempt = history.validation_attempts.len() as u32 + 1;
    history.validation_attempts.push(ValidationRecord {
        attempt,
        timestamp: Utc::now().to_rfc3339(),
        verdict,
        features_tested,
        features_failed,
        failure_reasons,
    });
    history.recompute_totals();
    save_history(project_dir, &history)
}
