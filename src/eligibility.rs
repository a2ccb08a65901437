//! Eligibility rule and the eligibility-check request contract.
//!
//! [`evaluate`] is the rule itself: a pure function of the canonical
//! (10-point) academic score, the test score and the thresholds. Same inputs,
//! same verdict, always.
//!
//! [`check_eligibility`] is the boundary in front of it. It validates a
//! caller-supplied [`EligibilityRequest`] and rejects missing or non-numeric
//! values with [`VerifyError::InvalidRequest`] before the rule ever runs.

use crate::config::{EligibilityThresholds, ScoringPolicy};
use crate::error::VerifyError;
use crate::record::{AcademicScale, EligibilityVerdict};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// The criteria in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criterion {
    AcademicScore,
    TestScore,
}

impl Criterion {
    fn label(self) -> &'static str {
        match self {
            Criterion::AcademicScore => "GPA",
            Criterion::TestScore => "IELTS score",
        }
    }
}

/// Result of checking one criterion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CriterionOutcome {
    pub criterion: Criterion,
    pub value: f64,
    pub threshold: f64,
    pub passed: bool,
}

impl CriterionOutcome {
    fn check(criterion: Criterion, value: f64, threshold: f64) -> Self {
        Self {
            criterion,
            value,
            threshold,
            passed: value >= threshold,
        }
    }
}

impl fmt::Display for CriterionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = self.criterion.label();
        let value = display_number(self.value);
        let threshold = display_number(self.threshold);
        if self.passed {
            write!(f, "{label} {value} meets requirement (>= {threshold}): pass")
        } else {
            write!(f, "{label} {value} is below required {threshold}: fail")
        }
    }
}

/// `8` → `8.0`, `7.25` → `7.25`.
fn display_number(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}

/// Apply the eligibility rule.
///
/// Eligible iff `academic_score ≥ gpa_threshold` and
/// `test_score ≥ test_threshold`. The verdict carries one reason per
/// criterion, academic score first.
pub fn evaluate(
    academic_score: f64,
    test_score: f64,
    thresholds: &EligibilityThresholds,
) -> EligibilityVerdict {
    let outcomes = [
        CriterionOutcome::check(
            Criterion::AcademicScore,
            academic_score,
            thresholds.gpa_threshold,
        ),
        CriterionOutcome::check(Criterion::TestScore, test_score, thresholds.test_threshold),
    ];
    EligibilityVerdict {
        eligible: outcomes.iter().all(|o| o.passed),
        reasons: outcomes.iter().map(ToString::to_string).collect(),
    }
}

// ── Request contract ────────────────────────────────────────────────────────

/// A numeric field as callers actually send it: a JSON number or a string
/// such as `"8.5"` or `"85%"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericInput {
    Number(f64),
    Text(String),
}

impl From<f64> for NumericInput {
    fn from(v: f64) -> Self {
        NumericInput::Number(v)
    }
}

impl NumericInput {
    fn parse(&self, field: &str) -> Result<f64, VerifyError> {
        let value = match self {
            NumericInput::Number(v) => *v,
            NumericInput::Text(s) => {
                let cleaned = s.trim().trim_end_matches('%').replace(',', "");
                cleaned.trim().parse::<f64>().map_err(|_| {
                    VerifyError::InvalidRequest(format!("{field} must be numeric, got {s:?}"))
                })?
            }
        };
        if !value.is_finite() || value < 0.0 {
            return Err(VerifyError::InvalidRequest(format!(
                "{field} must be a non-negative number, got {value}"
            )));
        }
        Ok(value)
    }
}

/// Body of an eligibility check.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EligibilityRequest {
    /// Academic score, normally the `extracted_gpa` of an upload response.
    #[serde(default)]
    pub extracted_gpa: Option<NumericInput>,
    /// Manually entered IELTS band.
    #[serde(default)]
    pub ielts_score: Option<NumericInput>,
}

impl EligibilityRequest {
    pub fn new(extracted_gpa: impl Into<NumericInput>, ielts_score: impl Into<NumericInput>) -> Self {
        Self {
            extracted_gpa: Some(extracted_gpa.into()),
            ielts_score: Some(ielts_score.into()),
        }
    }

    /// Validate both fields and return `(canonical_gpa, test_score)`.
    ///
    /// An academic value above 10 (up to 100) is read as a percentage and
    /// divided by the policy's percentage divisor.
    pub fn validate(&self, policy: &ScoringPolicy) -> Result<(f64, f64), VerifyError> {
        let gpa = self
            .extracted_gpa
            .as_ref()
            .ok_or_else(|| VerifyError::InvalidRequest("extracted_gpa is required".into()))?
            .parse("extracted_gpa")?;
        let ielts = self
            .ielts_score
            .as_ref()
            .ok_or_else(|| VerifyError::InvalidRequest("ielts_score is required".into()))?
            .parse("ielts_score")?;

        let canonical = if gpa <= AcademicScale::Ten.max() {
            gpa
        } else if gpa <= AcademicScale::Hundred.max() {
            debug!(
                "extracted_gpa {} read as a percentage (÷{})",
                gpa, policy.percentage_divisor
            );
            gpa / policy.percentage_divisor
        } else {
            return Err(VerifyError::InvalidRequest(format!(
                "extracted_gpa must be on a 0–10 or 0–100 scale, got {gpa}"
            )));
        };
        Ok((canonical, ielts))
    }
}

/// Validate a request and evaluate it.
pub fn check_eligibility(
    request: &EligibilityRequest,
    policy: &ScoringPolicy,
) -> Result<EligibilityVerdict, VerifyError> {
    let (gpa, ielts) = request.validate(policy)?;
    Ok(evaluate(gpa, ielts, &policy.thresholds))
}

/// Parse a JSON body and evaluate it.
pub fn check_eligibility_json(
    body: &str,
    policy: &ScoringPolicy,
) -> Result<EligibilityVerdict, VerifyError> {
    let request: EligibilityRequest = serde_json::from_str(body)
        .map_err(|e| VerifyError::InvalidRequest(format!("malformed request body: {e}")))?;
    check_eligibility(&request, policy)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds() -> EligibilityThresholds {
        EligibilityThresholds::default()
    }

    #[test]
    fn both_at_threshold_is_eligible_and_repeatable() {
        let first = evaluate(8.0, 8.0, &thresholds());
        let second = evaluate(8.0, 8.0, &thresholds());
        assert_eq!(first, second);
        assert!(first.eligible);
        assert_eq!(first.reasons.len(), 2);
        assert!(first.reasons.iter().all(|r| r.ends_with("pass")));
    }

    #[test]
    fn academic_just_below_fails() {
        let v = evaluate(7.9, 8.0, &thresholds());
        assert!(!v.eligible);
        assert_eq!(v.reasons[0], "GPA 7.9 is below required 8.0: fail");
        assert_eq!(v.reasons[1], "IELTS score 8.0 meets requirement (>= 8.0): pass");
    }

    #[test]
    fn test_score_below_fails() {
        let v = evaluate(8.5, 7.5, &thresholds());
        assert!(!v.eligible);
        assert_eq!(v.reasons[0], "GPA 8.5 meets requirement (>= 8.0): pass");
        assert_eq!(v.reasons[1], "IELTS score 7.5 is below required 8.0: fail");
    }

    #[test]
    fn nan_never_passes() {
        let v = evaluate(f64::NAN, 9.0, &thresholds());
        assert!(!v.eligible);
        assert!(v.reasons[0].ends_with("fail"));
    }

    #[test]
    fn custom_thresholds() {
        let t = EligibilityThresholds {
            gpa_threshold: 6.5,
            test_threshold: 6.0,
        };
        let v = evaluate(6.5, 6.0, &t);
        assert!(v.eligible);
        assert!(v.reasons[0].contains(">= 6.5"));
    }

    #[test]
    fn request_accepts_numbers_and_strings() {
        let policy = ScoringPolicy::default();
        let v = check_eligibility(&EligibilityRequest::new(8.5, 8.0), &policy).unwrap();
        assert!(v.eligible);

        let req = EligibilityRequest {
            extracted_gpa: Some(NumericInput::Text(" 8.2 ".into())),
            ielts_score: Some(NumericInput::Text("8".into())),
        };
        assert!(check_eligibility(&req, &policy).unwrap().eligible);
    }

    #[test]
    fn percentage_input_is_converted() {
        let policy = ScoringPolicy::default();
        let req = EligibilityRequest {
            extracted_gpa: Some(NumericInput::Text("85%".into())),
            ielts_score: Some(NumericInput::Number(8.5)),
        };
        let (gpa, _) = req.validate(&policy).unwrap();
        assert!((gpa - 8.5).abs() < 1e-9);
        let v = check_eligibility(&req, &policy).unwrap();
        assert!(v.eligible);
        assert!(v.reasons[0].starts_with("GPA 8.5"));
    }

    #[test]
    fn missing_fields_are_rejected() {
        let policy = ScoringPolicy::default();
        let err = check_eligibility(&EligibilityRequest::default(), &policy).unwrap_err();
        assert!(matches!(err, VerifyError::InvalidRequest(ref m) if m.contains("extracted_gpa")));

        let req = EligibilityRequest {
            extracted_gpa: Some(NumericInput::Number(8.0)),
            ielts_score: None,
        };
        let err = check_eligibility(&req, &policy).unwrap_err();
        assert!(err.to_string().contains("ielts_score"));
    }

    #[test]
    fn non_numeric_and_out_of_range_are_rejected() {
        let policy = ScoringPolicy::default();
        for body in [
            r#"{"extracted_gpa": "N/A", "ielts_score": 8}"#,
            r#"{"extracted_gpa": 8.5, "ielts_score": "eight"}"#,
            r#"{"extracted_gpa": 150, "ielts_score": 8}"#,
            r#"{"extracted_gpa": -1, "ielts_score": 8}"#,
            r#"{"extracted_gpa": true, "ielts_score": 8}"#,
            r#"not json"#,
        ] {
            let err = check_eligibility_json(body, &policy).unwrap_err();
            assert!(err.is_client_error(), "{body}: {err}");
        }
    }

    #[test]
    fn json_body_round() {
        let policy = ScoringPolicy::default();
        let v = check_eligibility_json(r#"{"extracted_gpa": 9.1, "ielts_score": 7.0}"#, &policy)
            .unwrap();
        assert!(!v.eligible);
        assert_eq!(v.reasons.len(), 2);
    }
}
