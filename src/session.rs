//! Session orchestration.
//!
//! The orchestrator is a thin loop: snapshot the project, resolve the
//! phase, pick the agent role, invoke the assistant behind the
//! [`AgentInvoker`] seam, and record what happened. All interesting
//! decisions live in the pure cores; everything here is wiring.

use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::Config;
use crate::errors::SessionError;
use crate::evaluation::{self, AgentRole};
use crate::features::FeatureList;
use crate::history;
use crate::metrics;
use crate::policy::CommandPolicy;
use crate::resolver::{self, Phase, ProjectSnapshot};
use crate::verdict::{self, VerdictKind};

/// Everything an invoker needs to run one agent session.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub session_id: u32,
    pub role: AgentRole,
    pub project_dir: PathBuf,
    pub model: String,
    pub max_turns: u32,
    /// Spec text fed to initializer sessions on stdin.
    pub spec: Option<String>,
    /// Command policy the invoker must gate shell commands through.
    pub policy: CommandPolicy,
}

/// Raw output of one agent session.
#[derive(Debug, Clone)]
pub struct SessionOutput {
    pub text: String,
}

/// Seam between the orchestrator and the actual assistant process.
///
/// Real implementations spawn and stream the assistant CLI; tests use a
/// scripted double.
#[async_trait]
pub trait AgentInvoker: Send + Sync {
    async fn invoke(&self, request: &SessionRequest) -> Result<SessionOutput, SessionError>;
}

/// Result of a completed orchestrator run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub final_phase: Phase,
    pub sessions_run: u32,
}

pub struct Orchestrator<I> {
    config: Config,
    invoker: I,
}

impl<I: AgentInvoker> Orchestrator<I> {
    pub fn new(config: Config, invoker: I) -> Self {
        Self { config, invoker }
    }

    /// Drive sessions until the project reaches a terminal phase or the
    /// configured session cap.
    pub async fn run(&self) -> Result<RunSummary, SessionError> {
        let project_dir = self.config.project_dir.clone();
        let stack = self.config.resolved_stack();
        let policy =
            CommandPolicy::with_extras(stack, self.config.security.extra_commands.iter().cloned());

        let mut sessions_run = 0u32;
        loop {
            let snapshot = ProjectSnapshot::gather(&project_dir, self.config.require_architecture)
                .context("failed to gather project snapshot")?;
            let phase = resolver::resolve(&snapshot);
            if phase.is_terminal() {
                return Ok(RunSummary {
                    final_phase: phase,
                    sessions_run,
                });
            }

            if let Some(cap) = self.config.agent.max_iterations
                && sessions_run >= cap
            {
                info!(sessions_run, "session cap reached");
                return Ok(RunSummary {
                    final_phase: phase,
                    sessions_run,
                });
            }

            let role = role_for(phase);
            let session_id = metrics::load_history(&project_dir).total_sessions + 1;
            info!(session_id, phase = %phase, role = %role, "starting session");
            crate::ui::print_session_header(session_id, phase, role);

            let request = SessionRequest {
                session_id,
                role,
                project_dir: project_dir.clone(),
                model: self.config.agent.model.clone(),
                max_turns: self.config.agent.max_turns,
                spec: match role {
                    AgentRole::Initializer => self.config.spec_content(),
                    _ => None,
                },
                policy: policy.clone(),
            };

            let before = snapshot.counts;
            let output = self.invoker.invoke(&request).await?;

            let report = evaluation::evaluate_output(&output.text, role);
            if let Some(summary) = report.missing_summary() {
                warn!(session_id, "{summary}");
            }

            let after = match FeatureList::exists(&project_dir) {
                true => FeatureList::load(&project_dir)
                    .context("failed to reload feature list after session")?
                    .counts(),
                false => before,
            };
            let completed = after.passing.saturating_sub(before.passing) as u32;
            let attempted = match role {
                AgentRole::Coding => (before.automated_total - before.automated_passing) as u32,
                _ => completed,
            };
            let regressions = evaluation::count_regressions(&output.text) as u32;

            metrics::record_session(
                &project_dir,
                session_id,
                attempted,
                completed,
                regressions,
                report.sections_found.iter().map(|s| s.to_string()).collect(),
                report.completeness_score,
            )
            .context("failed to record session metrics")?;

            if role == AgentRole::Validator {
                self.record_verdict(&output.text, session_id)?;
            }

            sessions_run += 1;
            if self.config.agent.auto_continue_delay > 0 {
                tokio::time::sleep(std::time::Duration::from_secs(
                    self.config.agent.auto_continue_delay,
                ))
                .await;
            }
        }
    }

    /// Parse and persist a validator verdict. A parse failure is warned
    /// about and left unrecorded, so validation resumes next session.
    fn record_verdict(&self, output: &str, session_id: u32) -> Result<(), SessionError> {
        let project_dir = &self.config.project_dir;
        let outcome = match verdict::parse_validator_output(output) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(session_id, error = %e, "validator output had no usable verdict");
                return Ok(());
            }
        };

        if outcome.verdict == VerdictKind::Rejected && !outcome.rejected_tests.is_empty() {
            let mut list = FeatureList::load(project_dir)
                .context("failed to load feature list for rejection")?;
            let (updated, problems) = list.mark_failed(&outcome.rejected_tests);
            for problem in &problems {
                warn!(session_id, "{problem}");
            }
            if updated > 0 {
                list.save().context("failed to save rejected feature list")?;
            }
        }

        history::append_attempt(
            project_dir,
            outcome.verdict,
            outcome.rejected_tests.clone(),
            outcome.summary.clone(),
        )
        .context("failed to append validation history")?;

        let failure_reasons = if outcome.verdict == VerdictKind::Rejected {
            vec![outcome.summary]
        } else {
            Vec::new()
        };
        metrics::record_validation(
            project_dir,
            outcome.verdict,
            outcome.tests_verified,
            outcome.rejected_tests.len() as u32,
            failure_reasons,
        )
        .context("failed to record validation metrics")?;

        Ok(())
    }
}

/// Which agent role handles a non-terminal phase.
fn role_for(phase: Phase) -> AgentRole {
    match phase {
        Phase::NeedsInit | Phase::NeedsArchitecture => AgentRole::Initializer,
        Phase::Implementing => AgentRole::Coding,
        Phase::NeedsValidation => AgentRole::Validator,
        Phase::Done | Phase::Error => unreachable!("terminal phases never run sessions"),
    }
}
