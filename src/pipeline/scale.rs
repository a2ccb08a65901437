//! Scale resolution: decide whether an academic score is out of 10 or 100.
//!
//! Priority order:
//!
//! 1. The label names a 10-point metric (`CGPA`, `GPA`) → [`AcademicScale::Ten`].
//! 2. The label names a percentage (`Percentage`, a `%` sign) →
//!    [`AcademicScale::Hundred`].
//! 3. Otherwise go by magnitude: `≤ 10` → Ten, `≤ 100` → Hundred, larger
//!    values are not a score at all.
//!
//! A value that does not fit the chosen scale (a "CGPA" of 85, a negative
//! number) resolves to `None`, the same as a field that was never found.

use crate::pipeline::extract::RawScore;
use crate::record::{AcademicScale, Score};
use tracing::debug;

/// Resolve the scale of a raw score and validate its range.
pub fn resolve_scale(raw: &RawScore) -> Option<Score> {
    let scale = match raw.label.scale_hint() {
        Some(scale) => scale,
        None => scale_by_magnitude(raw.value)?,
    };
    let score = Score::new(raw.value, scale);
    if score.is_none() {
        debug!(
            "Discarding academic score {} from {} pattern: outside 0–{} range",
            raw.value,
            raw.label.as_str(),
            scale.max()
        );
    }
    score
}

fn scale_by_magnitude(value: f64) -> Option<AcademicScale> {
    if !value.is_finite() || value < 0.0 {
        None
    } else if value <= AcademicScale::Ten.max() {
        Some(AcademicScale::Ten)
    } else if value <= AcademicScale::Hundred.max() {
        Some(AcademicScale::Hundred)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PERCENTAGE_TO_TEN_POINT_DIVISOR;
    use crate::pipeline::extract::{extract_fields, ScoreLabel};
    use crate::pipeline::normalize::normalize_text;
    use crate::record::MatchStrength;

    fn raw(value: f64, label: ScoreLabel) -> RawScore {
        RawScore {
            value,
            label,
            strength: MatchStrength::Exact,
        }
    }

    fn resolve_text(text: &str) -> Option<Score> {
        extract_fields(&normalize_text(text))
            .academic
            .and_then(|r| resolve_scale(&r))
    }

    #[test]
    fn cgpa_resolves_to_ten() {
        let s = resolve_text("CGPA: 8.5/10").unwrap();
        assert_eq!(s.scale(), AcademicScale::Ten);
        assert_eq!(s.to_ten_point(PERCENTAGE_TO_TEN_POINT_DIVISOR), 8.5);
    }

    #[test]
    fn percentage_resolves_to_hundred() {
        let s = resolve_text("Percentage: 85%").unwrap();
        assert_eq!(s.scale(), AcademicScale::Hundred);
        assert!((s.to_ten_point(PERCENTAGE_TO_TEN_POINT_DIVISOR) - 8.5).abs() < 1e-9);
    }

    #[test]
    fn label_beats_magnitude() {
        // A percentage of 9 is still a percentage.
        let s = resolve_scale(&raw(9.0, ScoreLabel::Percentage)).unwrap();
        assert_eq!(s.scale(), AcademicScale::Hundred);
    }

    #[test]
    fn magnitude_heuristic_for_unlabelled_values() {
        assert_eq!(
            resolve_scale(&raw(7.2, ScoreLabel::Grade)).unwrap().scale(),
            AcademicScale::Ten
        );
        assert_eq!(
            resolve_scale(&raw(10.0, ScoreLabel::Bare)).unwrap().scale(),
            AcademicScale::Ten
        );
        assert_eq!(
            resolve_scale(&raw(64.0, ScoreLabel::Score)).unwrap().scale(),
            AcademicScale::Hundred
        );
    }

    #[test]
    fn over_one_hundred_without_hint_is_absent() {
        assert!(resolve_scale(&raw(150.0, ScoreLabel::Bare)).is_none());
        assert!(resolve_text("Cumulative standing of the student 150").is_none());
    }

    #[test]
    fn labelled_value_outside_its_scale_is_absent() {
        assert!(resolve_scale(&raw(85.0, ScoreLabel::Cgpa)).is_none());
        assert!(resolve_scale(&raw(120.0, ScoreLabel::PercentSign)).is_none());
    }

    #[test]
    fn resolved_scores_respect_scale_bounds() {
        let labels = [
            ScoreLabel::Cgpa,
            ScoreLabel::Gpa,
            ScoreLabel::Percentage,
            ScoreLabel::PercentSign,
            ScoreLabel::Grade,
            ScoreLabel::Score,
            ScoreLabel::Bare,
        ];
        for label in labels {
            for v in [0.0, 0.5, 9.99, 10.0, 10.01, 55.0, 100.0, 100.5, 1e6] {
                if let Some(s) = resolve_scale(&raw(v, label)) {
                    assert!(s.value() >= 0.0 && s.value() <= s.scale().max());
                }
            }
        }
    }
}
