//! Structured evaluation sections in agent output.
//!
//! Each agent role must emit a fixed set of markdown evaluation sections
//! (e.g. `### Step A - CONTEXT VERIFICATION`). This module checks for
//! them, extracts their content, and scores completeness. Fenced code
//! blocks are stripped first so example headers inside code samples do
//! not count as real sections.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

/// Which agent produced the output being evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentRole {
    Initializer,
    Coding,
    Validator,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Initializer => "initializer",
            AgentRole::Coding => "coding",
            AgentRole::Validator => "validator",
        }
    }

    /// Section names every output from this role must contain.
    pub fn required_sections(&self) -> &'static [&'static str] {
        match self {
            AgentRole::Initializer => &["spec_decomposition", "feature_mapping", "coverage_check"],
            AgentRole::Coding => &["context", "regression", "plan"],
            AgentRole::Validator => &["spec_alignment", "test_execution", "aggregate_verdict"],
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

static CODE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[^\n]*\n.*?```").unwrap());

fn header_regex(title: &str) -> Regex {
    // Headers tolerate a "Step X -" prefix, varying heading level, and
    // any dash variant between the step label and the title.
    let pattern = format!(
        r"(?mi)^\s*#{{2,3}}\s*(?:Step\s*[A-Z0-9]*\s*[-\u{{2013}}\u{{2014}}]?\s*)?{title}"
    );
    Regex::new(&pattern).unwrap()
}

static SECTION_HEADERS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    vec![
        ("context", header_regex(r"CONTEXT\s+VERIFICATION")),
        ("regression", header_regex(r"REGRESSION\s+VERIFICATION")),
        ("plan", header_regex(r"IMPLEMENTATION\s+PLAN")),
        ("spec_decomposition", header_regex(r"SPEC\s+DECOMPOSITION")),
        ("feature_mapping", header_regex(r"FEATURE\s+MAPPING")),
        ("coverage_check", header_regex(r"COVERAGE\s+CHECK")),
        ("spec_alignment", header_regex(r"SPEC\s+ALIGNMENT\s+CHECK")),
        (
            "test_execution",
            header_regex(r"TEST\s+EXECUTION\s+WITH\s+EVIDENCE"),
        ),
        ("aggregate_verdict", header_regex(r"AGGREGATE\s+VERDICT")),
    ]
});

fn strip_code_blocks(text: &str) -> String {
    CODE_BLOCK.replace_all(text, "").into_owned()
}

fn section_regex(name: &str) -> Option<&'static Regex> {
    SECTION_HEADERS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, re)| re)
}

/// Result of checking an agent's output for its required sections.
#[derive(Debug, Clone)]
pub struct EvaluationReport {
    pub role: AgentRole,
    pub sections_found: Vec<&'static str>,
    pub sections_missing: Vec<&'static str>,
    /// found / required, 1.0 when nothing is required.
    pub completeness_score: f64,
}

impl EvaluationReport {
    pub fn is_complete(&self) -> bool {
        self.sections_missing.is_empty()
    }

    /// One-line retry hint naming what the agent left out.
    pub fn missing_summary(&self) -> Option<String> {
        if self.sections_missing.is_empty() {
            return None;
        }
        Some(format!(
            "missing required evaluation sections: {} (completeness {:.0}%)",
            self.sections_missing.join(", "),
            self.completeness_score * 100.0
        ))
    }
}

/// Check `output` for the sections `role` must emit.
pub fn evaluate_output(output: &str, role: AgentRole) -> EvaluationReport {
    let cleaned = strip_code_blocks(output);
    let required = role.required_sections();

    let mut found = Vec::new();
    let mut missing = Vec::new();
    for &name in required {
        let present = section_regex(name).is_some_and(|re| re.is_match(&cleaned));
        if present {
            found.push(name);
        } else {
            missing.push(name);
        }
    }

    let score = if required.is_empty() {
        1.0
    } else {
        found.len() as f64 / required.len() as f64
    };

    EvaluationReport {
        role,
        sections_found: found,
        sections_missing: missing,
        completeness_score: score,
    }
}

/// Extract the body text of each required section that is present.
///
/// A section's body runs from the line after its header to the next
/// `##`/`###` header or end of output. Empty bodies are omitted.
pub fn extract_sections(output: &str, role: AgentRole) -> BTreeMap<&'static str, String> {
    static NEXT_HEADER: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?m)^\s*#{2,3}\s").unwrap());

    let cleaned = strip_code_blocks(output);
    let mut sections = BTreeMap::new();

    for &name in role.required_sections() {
        let Some(re) = section_regex(name) else { continue };
        let Some(m) = re.find(&cleaned) else { continue };

        let after_header = match cleaned[m.end()..].find('\n') {
            Some(offset) => m.end() + offset + 1,
            None => continue,
        };
        let rest = &cleaned[after_header..];
        let body = match NEXT_HEADER.find(rest) {
            Some(next) => &rest[..next.start()],
            None => rest,
        };
        let body = body.trim();
        if !body.is_empty() {
            sections.insert(name, body.to_string());
        }
    }

    sections
}

/// Count regression failures reported in the REGRESSION VERIFICATION
/// section. Lines there look like `- Feature [5]: FAIL`.
pub fn count_regressions(output: &str) -> usize {
    static REGRESSION_SECTION: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?si)REGRESSION VERIFICATION.*?(?:###|IMPLEMENTATION PLAN|\z)").unwrap()
    });
    static FAIL_MARKER: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?i):\s*FAIL\b").unwrap());

    match REGRESSION_SECTION.find(output) {
        Some(section) => FAIL_MARKER.find_iter(section.as_str()).count(),
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CODING_OUTPUT: &str = "\
## Step A - CONTEXT VERIFICATION
Read feature_list.json, 3 of 9 passing.

## Step B - REGRESSION VERIFICATION
Re-ran prior passing features, all still green.

## Step C - IMPLEMENTATION PLAN
Implement feature 4 next.
";

    #[test]
    fn test_complete_coding_output() {
        let report = evaluate_output(CODING_OUTPUT, AgentRole::Coding);
        assert!(report.is_complete());
        assert_eq!(report.completeness_score, 1.0);
        assert!(report.missing_summary().is_none());
    }

    #[test]
    fn test_missing_section_scores_partially() {
        let output = "## CONTEXT VERIFICATION\nok\n\n## IMPLEMENTATION PLAN\nnext\n";
        let report = evaluate_output(output, AgentRole::Coding);
        assert!(!report.is_complete());
        assert_eq!(report.sections_missing, vec!["regression"]);
        assert!((report.completeness_score - 2.0 / 3.0).abs() < 1e-9);
        let summary = report.missing_summary().unwrap();
        assert!(summary.contains("regression"));
    }

    #[test]
    fn test_header_in_code_block_does_not_count() {
        let output = "\
Some narration.

```markdown
## CONTEXT VERIFICATION
this is only an example
```
";
        let report = evaluate_output(output, AgentRole::Coding);
        assert!(report.sections_missing.contains(&"context"));
    }

    #[test]
    fn test_step_prefix_and_case_variants_match() {
        let output = "### step 2 - spec decomposition\nbroke the spec into 12 features\n";
        let report = evaluate_output(output, AgentRole::Initializer);
        assert!(report.sections_found.contains(&"spec_decomposition"));
    }

    #[test]
    fn test_validator_sections() {
        let output = "\
## SPEC ALIGNMENT CHECK
aligned

## TEST EXECUTION WITH EVIDENCE
12 passed

## AGGREGATE VERDICT
approved
";
        let report = evaluate_output(output, AgentRole::Validator);
        assert!(report.is_complete());
    }

    #[test]
    fn test_extract_sections_bodies() {
        let sections = extract_sections(CODING_OUTPUT, AgentRole::Coding);
        assert_eq!(
            sections.get("plan").map(String::as_str),
            Some("Implement feature 4 next.")
        );
        assert_eq!(sections.len(), 3);
    }

    #[test]
    fn test_extract_skips_empty_body() {
        let output = "## CONTEXT VERIFICATION\n\n## IMPLEMENTATION PLAN\nnext step\n";
        let sections = extract_sections(output, AgentRole::Coding);
        assert!(!sections.contains_key("context"));
        assert!(sections.contains_key("plan"));
    }

    #[test]
    fn test_count_regressions_in_section() {
        let output = "\
### Step B - REGRESSION VERIFICATION
- Feature [12]: PASS
  Evidence: login form renders
- Feature [5]: FAIL
  Evidence: submit no longer fires
- Feature [7]: fail

### Step C - IMPLEMENTATION PLAN
- Feature [9]: FAIL is mentioned here but outside the section
";
        assert_eq!(count_regressions(output), 2);
    }

    #[test]
    fn test_count_regressions_without_section() {
        assert_eq!(count_regressions("everything: FAIL"), 0);
    }

    #[test]
    fn test_empty_output_scores_zero() {
        let report = evaluate_output("", AgentRole::Validator);
        assert_eq!(report.completeness_score, 0.0);
        assert_eq!(report.sections_missing.len(), 3);
    }
}
