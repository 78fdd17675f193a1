//! Validator verdict parsing.
//!
//! The validator role ends its session with a JSON verdict block. That
//! free-text output is parsed here into a strict [`ValidationOutcome`];
//! every way the parse can fail maps to its own [`VerdictError`] variant,
//! kept distinct from a successfully parsed rejection.

use serde::{Deserialize, Serialize};

use crate::errors::VerdictError;
use crate::util::extract_json_object;

/// The validator's final judgment on the project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictKind {
    Approved,
    Rejected,
    /// Validation did not finish; resume it next session.
    Continue,
    /// Manual-only features remain that the operator must verify.
    NeedsVerification,
}

impl VerdictKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictKind::Approved => "approved",
            VerdictKind::Rejected => "rejected",
            VerdictKind::Continue => "continue",
            VerdictKind::NeedsVerification => "needs_verification",
        }
    }

    /// Parse the verdict value, tolerating case and hyphen variants.
    pub fn parse(value: &str) -> Option<VerdictKind> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "approved" => Some(VerdictKind::Approved),
            "rejected" => Some(VerdictKind::Rejected),
            "continue" => Some(VerdictKind::Continue),
            "needs_verification" => Some(VerdictKind::NeedsVerification),
            _ => None,
        }
    }
}

/// A fully parsed validator verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub verdict: VerdictKind,
    /// Indices of features the validator rejected.
    #[serde(default)]
    pub rejected_tests: Vec<usize>,
    #[serde(default)]
    pub tests_verified: u32,
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Deserialize)]
struct RawOutcome {
    verdict: Option<String>,
    #[serde(default)]
    rejected_tests: Vec<usize>,
    #[serde(default)]
    tests_verified: u32,
    #[serde(default)]
    summary: String,
}

/// Parse a validator session's output into a [`ValidationOutcome`].
///
/// Looks for the first JSON object in the output (fenced or bare). Parse
/// failures are classified, never conflated with a rejected verdict.
pub fn parse_validator_output(output: &str) -> Result<ValidationOutcome, VerdictError> {
    let block = extract_json_object(output).ok_or(VerdictError::MissingBlock)?;

    let raw: RawOutcome =
        serde_json::from_str(block).map_err(|e| VerdictError::InvalidJson(e.to_string()))?;

    let verdict_value = raw.verdict.ok_or(VerdictError::MissingField("verdict"))?;
    let verdict =
        VerdictKind::parse(&verdict_value).ok_or(VerdictError::InvalidVerdict(verdict_value))?;

    Ok(ValidationOutcome {
        verdict,
        rejected_tests: raw.rejected_tests,
        tests_verified: raw.tests_verified,
        summary: raw.summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fenced_verdict_block() {
        let output = r#"
All features tested successfully.

```json
{
  "verdict": "APPROVED",
  "rejected_tests": [],
  "tests_verified": 12,
  "summary": "all automated features pass"
}
```
"#;
        let outcome = parse_validator_output(output).unwrap();
        assert_eq!(outcome.verdict, VerdictKind::Approved);
        assert_eq!(outcome.tests_verified, 12);
        assert!(outcome.rejected_tests.is_empty());
    }

    #[test]
    fn test_parse_rejected_with_indices() {
        let output = r#"{"verdict": "rejected", "rejected_tests": [3, 7], "tests_verified": 10, "summary": "two regressions"}"#;
        let outcome = parse_validator_output(output).unwrap();
        assert_eq!(outcome.verdict, VerdictKind::Rejected);
        assert_eq!(outcome.rejected_tests, vec![3, 7]);
    }

    #[test]
    fn test_parse_hyphenated_needs_verification() {
        let output = r#"{"verdict": "needs-verification", "summary": "manual checks remain"}"#;
        let outcome = parse_validator_output(output).unwrap();
        assert_eq!(outcome.verdict, VerdictKind::NeedsVerification);
    }

    #[test]
    fn test_missing_block_classified() {
        let err = parse_validator_output("I tested everything, looks good!").unwrap_err();
        assert!(matches!(err, VerdictError::MissingBlock));
    }

    #[test]
    fn test_invalid_json_classified() {
        let err = parse_validator_output(r#"{"verdict": APPROVED}"#).unwrap_err();
        assert!(matches!(err, VerdictError::InvalidJson(_)));
    }

    #[test]
    fn test_missing_verdict_field_classified() {
        let err = parse_validator_output(r#"{"tests_verified": 5}"#).unwrap_err();
        assert!(matches!(err, VerdictError::MissingField("verdict")));
    }

    #[test]
    fn test_unknown_verdict_value_classified() {
        let err = parse_validator_output(r#"{"verdict": "MAYBE"}"#).unwrap_err();
        match err {
            VerdictError::InvalidVerdict(value) => assert_eq!(value, "MAYBE"),
            other => panic!("expected InvalidVerdict, got {other:?}"),
        }
    }

    #[test]
    fn test_rejection_is_not_an_error() {
        // A parsed rejection must be distinguishable from a parse failure.
        let outcome =
            parse_validator_output(r#"{"verdict": "rejected"}"#).unwrap();
        assert_eq!(outcome.verdict, VerdictKind::Rejected);
    }

    #[test]
    fn test_optional_fields_default() {
        let outcome = parse_validator_output(r#"{"verdict": "continue"}"#).unwrap();
        assert_eq!(outcome.tests_verified, 0);
        assert!(outcome.summary.is_empty());
    }

    #[test]
    fn test_verdict_kind_parse_roundtrip() {
        for kind in [
            VerdictKind::Approved,
            VerdictKind::Rejected,
            VerdictKind::Continue,
            VerdictKind::NeedsVerification,
        ] {
            assert_eq!(VerdictKind::parse(kind.as_str()), Some(kind));
        }
    }
}
