//! Quote-aware shell command tokenization.
//!
//! Splits a compound command line into discrete invocations (on `;`, `&&`,
//! `||`, `|`, `&`) and each invocation into word tokens, honoring single
//! and double quoting so operators inside quotes are not treated as
//! separators. Command substitution and subshells are surfaced as a
//! distinct error so the guard can deny them outright.

use thiserror::Error;

/// Why a command string could not be tokenized.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenizeError {
    #[error("unbalanced quote in command")]
    UnbalancedQuote,

    #[error("command substitution or subshell is not permitted")]
    Substitution,
}

/// Split a compound command into individual invocations.
///
/// Separators are `;`, `&&`, `||`, `|`, and backgrounding `&`, recognized
/// only outside quotes. Empty segments (e.g. from trailing `;`) are
/// dropped. Any `$(`, backtick, or bare `(` outside quotes fails with
/// [`TokenizeError::Substitution`].
pub fn split_invocations(command: &str) -> Result<Vec<String>, TokenizeError> {
    let mut invocations = Vec::new();
    let mut current = String::new();
    let mut chars = command.chars().peekable();
    let mut in_single = false;
    let mut in_double = false;

    while let Some(ch) = chars.next() {
        if in_single {
            current.push(ch);
            if ch == '\'' {
                in_single = false;
            }
            continue;
        }
        if in_double {
            // Substitution expands inside double quotes as well.
            if ch == '`' {
                return Err(TokenizeError::Substitution);
            }
            if ch == '$' && chars.peek() == Some(&'(') {
                return Err(TokenizeError::Substitution);
            }
            current.push(ch);
            if ch == '"' {
                in_double = false;
            }
            continue;
        }

        match ch {
            '\'' => {
                in_single = true;
                current.push(ch);
            }
            '"' => {
                in_double = true;
                current.push(ch);
            }
            '`' | '(' => return Err(TokenizeError::Substitution),
            '$' if chars.peek() == Some(&'(') => return Err(TokenizeError::Substitution),
            ';' => {
                push_segment(&mut invocations, &mut current);
            }
            '|' => {
                // `||` and `|` both separate invocations.
                if chars.peek() == Some(&'|') {
                    chars.next();
                }
                push_segment(&mut invocations, &mut current);
            }
            '&' => {
                // `2>&1` and friends are redirect duplications, not separators.
                if current.ends_with('>') || current.ends_with('<') {
                    current.push(ch);
                    continue;
                }
                if chars.peek() == Some(&'&') {
                    chars.next();
                }
                push_segment(&mut invocations, &mut current);
            }
            _ => current.push(ch),
        }
    }

    if in_single || in_double {
        return Err(TokenizeError::UnbalancedQuote);
    }

    push_segment(&mut invocations, &mut current);
    Ok(invocations)
}

fn push_segment(invocations: &mut Vec<String>, current: &mut String) {
    let segment = current.trim();
    if !segment.is_empty() {
        invocations.push(segment.to_string());
    }
    current.clear();
}

/// Tokenize a single invocation into words, stripping quotes.
///
/// Backslash escapes the next character outside single quotes. Unbalanced
/// quotes or a trailing backslash fail with
/// [`TokenizeError::UnbalancedQuote`].
pub fn tokenize(segment: &str) -> Result<Vec<String>, TokenizeError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut has_token = false;
    let mut chars = segment.chars();
    let mut in_single = false;
    let mut in_double = false;

    while let Some(ch) = chars.next() {
        if in_single {
            if ch == '\'' {
                in_single = false;
            } else {
                current.push(ch);
            }
            continue;
        }
        if in_double {
            match ch {
                '"' => in_double = false,
                '\\' => match chars.next() {
                    Some(next) => current.push(next),
                    None => return Err(TokenizeError::UnbalancedQuote),
                },
                _ => current.push(ch),
            }
            continue;
        }

        match ch {
            '\'' => {
                in_single = true;
                has_token = true;
            }
            '"' => {
                in_double = true;
                has_token = true;
            }
            '\\' => match chars.next() {
                Some(next) => {
                    current.push(next);
                    has_token = true;
                }
                None => return Err(TokenizeError::UnbalancedQuote),
            },
            c if c.is_whitespace() => {
                if has_token {
                    tokens.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            _ => {
                current.push(ch);
                has_token = true;
            }
        }
    }

    if in_single || in_double {
        return Err(TokenizeError::UnbalancedQuote);
    }
    if has_token {
        tokens.push(current);
    }

    Ok(tokens)
}
