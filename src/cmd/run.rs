//! `conductor run`: drive sessions until the project is done.

use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::config::Config;
use crate::errors::SessionError;
use crate::resolver::Phase;
use crate::session::{AgentInvoker, Orchestrator, SessionOutput, SessionRequest};
use crate::ui;

/// Invoker that shells out to the assistant CLI and captures its output.
///
/// The command defaults to `claude` and can be overridden with the
/// `CONDUCTOR_AGENT_CMD` environment variable.
pub struct ProcessInvoker {
    command: String,
}

impl ProcessInvoker {
    pub fn from_env() -> Self {
        Self {
            command: std::env::var("CONDUCTOR_AGENT_CMD").unwrap_or_else(|_| "claude".to_string()),
        }
    }
}

#[async_trait]
impl AgentInvoker for ProcessInvoker {
    async fn invoke(&self, request: &SessionRequest) -> Result<SessionOutput, SessionError> {
        let mut command = Command::new(&self.command);
        command
            .arg("--model")
            .arg(&request.model)
            .arg("--max-turns")
            .arg(request.max_turns.to_string())
            .current_dir(&request.project_dir)
            .stdin(if request.spec.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());

        let mut child = command.spawn().map_err(|e| SessionError::InvocationFailed {
            session: request.session_id,
            message: format!("failed to spawn '{}': {e}", self.command),
        })?;

        if let Some(spec) = &request.spec
            && let Some(mut stdin) = child.stdin.take()
        {
            stdin
                .write_all(spec.as_bytes())
                .await
                .map_err(|e| SessionError::InvocationFailed {
                    session: request.session_id,
                    message: format!("failed to write spec to '{}': {e}", self.command),
                })?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| SessionError::InvocationFailed {
                session: request.session_id,
                message: format!("'{}' did not run to completion: {e}", self.command),
            })?;

        if !output.status.success() {
            return Err(SessionError::InvocationFailed {
                session: request.session_id,
                message: format!("'{}' exited with {}", self.command, output.status),
            });
        }

        Ok(SessionOutput {
            text: String::from_utf8_lossy(&output.stdout).into_owned(),
        })
    }
}

pub async fn cmd_run(project_dir: &Path, config: Config) -> Result<()> {
    let stack = config.resolved_stack();
    ui::print_banner(&config, stack);

    let orchestrator = Orchestrator::new(config, ProcessInvoker::from_env());
    let summary = orchestrator
        .run()
        .await
        .with_context(|| format!("run failed in {}", project_dir.display()))?;

    ui::print_phase(summary.final_phase);
    if summary.final_phase == Phase::Error {
        anyhow::bail!("project is stalled or malformed; see warnings above");
    }
    Ok(())
}
