//! Command policy configuration for the security guard.
//!
//! A `CommandPolicy` is the closed set of executables a session may run:
//! the base set shared by all stacks, the stack-specific additions, and
//! any operator-configured extras. It is built once per session and passed
//! into the guard by value; there is no process-wide mutable policy.

use std::collections::HashSet;

use crate::stack::Stack;

/// Executables allowed for every stack.
const BASE_COMMANDS: &[&str] = &[
    "ls", "cat", "head", "tail", "wc", "grep", "cp", "mkdir", "chmod", "pwd", "git", "ps", "lsof",
    "sleep", "pkill", "echo", "touch", "which",
];

/// Executables that are never allowed, regardless of configuration.
///
/// This denylist sits beneath the allowlist: adding one of these names to
/// `extra_commands` has no effect.
const DENIED_COMMANDS: &[&str] = &[
    "rm", "rmdir", "mv", "dd", "mkfs", "shred", "sudo", "su", "chown", "kill", "killall",
    "reboot", "shutdown", "eval", "exec", "source", "curl", "wget", "nc", "ssh", "scp",
];

/// Shell scripts that may be executed directly (as `./init.sh` etc.).
const ALLOWED_SCRIPTS: &[&str] = &["init.sh", "setup.sh"];

/// The allowlist and structural constraints for one session.
#[derive(Debug, Clone)]
pub struct CommandPolicy {
    stack: Stack,
    commands: HashSet<String>,
    pkill_targets: HashSet<String>,
    allowed_scripts: HashSet<String>,
}

impl CommandPolicy {
    /// Build the policy for a stack: base set plus stack-specific commands.
    pub fn for_stack(stack: Stack) -> Self {
        let mut commands: HashSet<String> =
            BASE_COMMANDS.iter().map(|c| c.to_string()).collect();
        commands.extend(stack.commands().iter().map(|c| c.to_string()));

        let pkill_targets = stack
            .pkill_targets()
            .iter()
            .map(|t| t.to_string())
            .collect();

        let allowed_scripts = ALLOWED_SCRIPTS.iter().map(|s| s.to_string()).collect();

        Self {
            stack,
            commands,
            pkill_targets,
            allowed_scripts,
        }
    }

    /// Build the policy with operator-configured extra commands.
    ///
    /// Extras on the hard denylist are silently ignored.
    pub fn with_extras<I, S>(stack: Stack, extras: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut policy = Self::for_stack(stack);
        for extra in extras {
            let extra = extra.into();
            if !Self::is_denied(&extra) {
                policy.commands.insert(extra);
            }
        }
        policy
    }

    pub fn stack(&self) -> Stack {
        self.stack
    }

    /// Whether this executable name is a member of the active allowlist.
    pub fn allows(&self, command: &str) -> bool {
        !Self::is_denied(command)
            && (self.commands.contains(command) || self.allowed_scripts.contains(command))
    }

    /// Whether the name is on the non-overridable denylist.
    pub fn is_denied(command: &str) -> bool {
        DENIED_COMMANDS.contains(&command)
    }

    /// Whether `pkill` may target this process name.
    pub fn allows_pkill_target(&self, target: &str) -> bool {
        self.pkill_targets.contains(target)
    }

    /// Whether this bare script name is an allowed init script.
    pub fn allows_script(&self, script: &str) -> bool {
        self.allowed_scripts.contains(script)
    }

    /// Sorted pkill targets, for deny messages.
    pub fn pkill_targets_sorted(&self) -> Vec<&str> {
        let mut targets: Vec<&str> = self.pkill_targets.iter().map(|s| s.as_str()).collect();
        targets.sort_unstable();
        targets
    }
}
