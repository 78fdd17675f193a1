//! Command security guard.
//!
//! Every shell command an agent session proposes is classified here before
//! execution. Validation is an allowlist check on each invocation in the
//! chain plus structural sub-validators for the sensitive executables
//! (`pkill`, `chmod`, init scripts). The guard is pure and stateless: it
//! never executes anything, and each call is independently decidable from
//! its input.
//!
//! Everything ambiguous fails closed: unparseable commands, command
//! substitution, subshells, and unknown executables all deny the whole
//! chain.

mod tokenizer;

pub use tokenizer::{TokenizeError, split_invocations, tokenize};

use crate::policy::CommandPolicy;

/// Outcome of validating one proposed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Deny { reason: String },
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allow)
    }

    fn deny(reason: impl Into<String>) -> Self {
        Verdict::Deny {
            reason: reason.into(),
        }
    }
}

/// Shell keywords that never name an executable.
const SHELL_KEYWORDS: &[&str] = &[
    "if", "then", "else", "elif", "fi", "for", "while", "until", "do", "done", "case", "esac",
    "in", "!", "{", "}",
];

/// Validate a proposed shell command against the active policy.
///
/// The command is split into invocations; a single disallowed member
/// denies the entire chain. The returned deny reason names the specific
/// violated rule so the session can self-correct.
pub fn validate(command: &str, policy: &CommandPolicy) -> Verdict {
    let trimmed = command.trim();
    if trimmed.is_empty() {
        return Verdict::deny("Empty command");
    }

    let invocations = match split_invocations(trimmed) {
        Ok(invocations) => invocations,
        Err(TokenizeError::Substitution) => {
            return Verdict::deny(
                "Command substitution and subshells ($(...), backticks, parentheses) are not permitted",
            );
        }
        Err(TokenizeError::UnbalancedQuote) => {
            return Verdict::deny("Could not parse command: unbalanced quote");
        }
    };

    if invocations.is_empty() {
        return Verdict::deny("Empty command");
    }

    for invocation in &invocations {
        if let Verdict::Deny { reason } = validate_invocation(invocation, policy) {
            return Verdict::deny(reason);
        }
    }

    Verdict::Allow
}

/// Validate a single invocation: allowlist membership plus structural checks.
fn validate_invocation(invocation: &str, policy: &CommandPolicy) -> Verdict {
    let tokens = match tokenize(invocation) {
        Ok(tokens) => tokens,
        Err(e) => return Verdict::deny(format!("Could not parse command: {e}")),
    };

    let exec_token = match leading_executable(&tokens) {
        Some(token) => token,
        // Assignments or keywords only, nothing executes.
        None => return Verdict::Allow,
    };

    let name = basename(exec_token);

    if CommandPolicy::is_denied(name) {
        return Verdict::deny(format!(
            "Command '{name}' is never allowed (non-overridable denylist)"
        ));
    }

    // Direct script invocations (./init.sh, scripts/setup.sh) are validated
    // by script name and path form, not allowlist membership.
    if name.ends_with(".sh") {
        return validate_init_script(exec_token, policy);
    }

    if !policy.allows(name) {
        return Verdict::deny(format!(
            "Command '{name}' is not in the allowed commands list for the {} stack",
            policy.stack()
        ));
    }

    match name {
        "pkill" => validate_pkill(&tokens, policy),
        "chmod" => validate_chmod(&tokens),
        _ => Verdict::Allow,
    }
}

/// Find the token naming the executable, skipping environment assignments.
fn leading_executable<'a>(tokens: &'a [String]) -> Option<&'a str> {
    tokens
        .iter()
        .map(|t| t.as_str())
        .find(|token| !is_assignment(token) && !is_redirection(token) && !is_keyword(token))
}

/// `VAR=value` prefixes before the executable name.
fn is_assignment(token: &str) -> bool {
    match token.find('=') {
        Some(0) | None => false,
        Some(pos) => token[..pos]
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_'),
    }
}

/// Redirection operators and their targets fused into one token (`>out`,
/// `2>&1`, `<input`).
fn is_redirection(token: &str) -> bool {
    let stripped = token.trim_start_matches(|c: char| c.is_ascii_digit());
    stripped.starts_with('>') || stripped.starts_with('<')
}

fn is_keyword(token: &str) -> bool {
    SHELL_KEYWORDS.contains(&token)
}

fn basename(token: &str) -> &str {
    token.rsplit('/').next().unwrap_or(token)
}

/// `pkill` may only target the configured dev-process names.
///
/// Numeric PIDs, wildcards, and unrecognized names all deny. With `-f` the
/// pattern's first word is treated as the process name.
fn validate_pkill(tokens: &[String], policy: &CommandPolicy) -> Verdict {
    let args: Vec<&str> = tokens[1..]
        .iter()
        .map(|t| t.as_str())
        .filter(|t| !t.starts_with('-'))
        .collect();

    let Some(last) = args.last() else {
        return Verdict::deny("pkill requires a process name");
    };

    // `pkill -f "node server.js"` matches on the full command line; the
    // process name is the pattern's first word.
    let target = last.split_whitespace().next().unwrap_or(last);

    if target.chars().all(|c| c.is_ascii_digit()) {
        return Verdict::deny(format!("pkill may not target a numeric PID: {target}"));
    }
    if target.contains(['*', '?', '[']) {
        return Verdict::deny(format!("pkill may not use wildcard patterns: {target}"));
    }
    if !policy.allows_pkill_target(target) {
        return Verdict::deny(format!(
            "pkill only allowed for dev processes {:?}, got: {target}",
            policy.pkill_targets_sorted()
        ));
    }

    Verdict::Allow
}

/// `chmod` is permitted only in the exact executable-bit-add form.
///
/// The mode must match `[ugoa]*+x`; flags (including recursion), numeric
/// modes, and permission removal all deny.
fn validate_chmod(tokens: &[String]) -> Verdict {
    let mut mode: Option<&str> = None;
    let mut file_count = 0usize;

    for token in &tokens[1..] {
        if token.starts_with('-') {
            return Verdict::deny(format!("chmod flags are not allowed: {token}"));
        }
        if mode.is_none() {
            mode = Some(token);
        } else {
            file_count += 1;
        }
    }

    let Some(mode) = mode else {
        return Verdict::deny("chmod requires a mode");
    };
    if file_count == 0 {
        return Verdict::deny("chmod requires at least one file");
    }

    if !is_add_execute_mode(mode) {
        return Verdict::deny(format!("chmod only allowed with +x mode, got: {mode}"));
    }

    Verdict::Allow
}

/// Matches `[ugoa]*+x` exactly.
fn is_add_execute_mode(mode: &str) -> bool {
    let Some(prefix) = mode.strip_suffix("+x") else {
        return false;
    };
    prefix.chars().all(|c| matches!(c, 'u' | 'g' | 'o' | 'a'))
}

/// Direct shell script execution is restricted to the known init scripts,
/// invoked as `./init.sh` or any path ending in `/init.sh`.
fn validate_init_script(exec_token: &str, policy: &CommandPolicy) -> Verdict {
    let name = basename(exec_token);

    if !policy.allows_script(name) {
        return Verdict::deny(format!("Script not in allowed list: {exec_token}"));
    }
    if !exec_token.contains('/') {
        // A bare `init.sh` relies on PATH lookup; require an explicit path.
        return Verdict::deny(format!(
            "Script must be invoked with an explicit path (./{name}), got: {exec_token}"
        ));
    }

    Verdict::Allow
}
