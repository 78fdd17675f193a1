//! `conductor guard`: validate one shell command against the active policy.
//!
//! Hook entry point for the assistant CLI: wire it as a pre-tool-use hook
//! on shell commands. Exit code 0 allows the command; exit code 2 blocks
//! it, with the deny reason on stderr.

use anyhow::Result;

use crate::config::Config;
use crate::guard::{self, Verdict};
use crate::policy::CommandPolicy;

/// Exit code that tells the hook caller to block the command.
pub const DENY_EXIT_CODE: i32 = 2;

pub fn cmd_guard(config: &Config, command_parts: &[String]) -> Result<()> {
    if command_parts.is_empty() {
        anyhow::bail!("no command given");
    }

    let policy = CommandPolicy::with_extras(
        config.resolved_stack(),
        config.security.extra_commands.iter().cloned(),
    );
    let command = command_parts.join(" ");

    match guard::validate(&command, &policy) {
        Verdict::Allow => Ok(()),
        Verdict::Deny { reason } => {
            eprintln!("denied: {reason}");
            std::process::exit(DENY_EXIT_CODE);
        }
    }
}
