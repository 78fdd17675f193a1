//! Phase resolution.
//!
//! A [`ProjectSnapshot`] captures everything on disk that determines what
//! kind of session runs next; [`resolve`] maps a snapshot to a [`Phase`].
//! The mapping is total and side-effect-free, so every decision about
//! "what happens next" is testable without touching the filesystem.

use std::path::Path;

use serde::Serialize;
use tracing::warn;

use crate::architecture;
use crate::errors::ArtifactError;
use crate::features::{FeatureCounts, FeatureList};
use crate::history;
use crate::verdict::VerdictKind;

/// What kind of session the project needs next. `Done` and `Error` are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    NeedsInit,
    NeedsArchitecture,
    Implementing,
    NeedsValidation,
    Done,
    Error,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Done | Phase::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::NeedsInit => "needs_init",
            Phase::NeedsArchitecture => "needs_architecture",
            Phase::Implementing => "implementing",
            Phase::NeedsValidation => "needs_validation",
            Phase::Done => "done",
            Phase::Error => "error",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of the project state the resolver works from.
#[derive(Debug, Clone, Default)]
pub struct ProjectSnapshot {
    pub feature_list_present: bool,
    pub counts: FeatureCounts,
    /// Last validation verdict on record, if any.
    pub latest_verdict: Option<VerdictKind>,
    /// Whether any validation has ever come back approved.
    pub has_approved_verdict: bool,
    pub architecture_required: bool,
    pub architecture_locked: bool,
    /// Degradations observed while gathering (e.g. a malformed lock
    /// file treated as absent). Surfaced to the operator, never fatal.
    pub warnings: Vec<String>,
}

impl ProjectSnapshot {
    /// Gather a snapshot from the project directory.
    ///
    /// Malformed artifacts degrade with a warning on the snapshot: a
    /// broken architecture lock counts as absent, and a broken feature
    /// list counts as present-but-empty so resolution lands on
    /// `Phase::Error` rather than aborting.
    pub fn gather(project_dir: &Path, architecture_required: bool) -> Result<Self, ArtifactError> {
        let mut snapshot = ProjectSnapshot {
            architecture_required,
            ..ProjectSnapshot::default()
        };

        if FeatureList::exists(project_dir) {
            snapshot.feature_list_present = true;
            match FeatureList::load(project_dir) {
                Ok(list) => snapshot.counts = list.counts(),
                Err(e) => {
                    let warning = format!("feature list is malformed: {e}");
                    warn!("{warning}");
                    snapshot.warnings.push(warning);
                }
            }
        }

        let lock = architecture::check_lock(project_dir);
        snapshot.architecture_locked = lock.locked;
        for warning in &lock.warnings {
            warn!("{warning}");
        }
        snapshot.warnings.extend(lock.warnings);

        let attempts = history::load_attempts(project_dir);
        snapshot.latest_verdict = attempts.last().map(|a| a.result);
        snapshot.has_approved_verdict =
            attempts.iter().any(|a| a.result == VerdictKind::Approved);

        Ok(snapshot)
    }
}

/// Map a snapshot to the phase that should run next.
///
/// Rules apply top to bottom; the first match wins.
pub fn resolve(snapshot: &ProjectSnapshot) -> Phase {
    if !snapshot.feature_list_present {
        return Phase::NeedsInit;
    }

    if snapshot.architecture_required && !snapshot.architecture_locked {
        return Phase::NeedsArchitecture;
    }

    // An empty list is malformed input, never a finished project.
    if snapshot.counts.total == 0 {
        return Phase::Error;
    }

    let counts = &snapshot.counts;
    let automated_failing = counts.automated_total.saturating_sub(counts.automated_passing);
    if automated_failing > 0 {
        return Phase::Implementing;
    }

    // All automated features pass from here on. Continue and
    // NeedsVerification resume validation rather than re-implementing.
    let validation_unfinished = matches!(
        snapshot.latest_verdict,
        Some(VerdictKind::Continue) | Some(VerdictKind::NeedsVerification)
    );
    if counts.automated_total > 0 && (!snapshot.has_approved_verdict || validation_unfinished) {
        return Phase::NeedsValidation;
    }

    if snapshot.latest_verdict == Some(VerdictKind::Approved) {
        return Phase::Done;
    }

    if snapshot.latest_verdict == Some(VerdictKind::Rejected)
        && counts.total - counts.passing > 0
    {
        return Phase::Implementing;
    }

    // Nothing automated remains and no approval exists: every feature
    // is blocked or manual-only, so no session can make progress.
    Phase::Error
}
