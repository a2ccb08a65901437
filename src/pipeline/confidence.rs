//! Confidence scoring for an extraction.
//!
//! The score reflects how much of the record was recovered and how reliably,
//! not how certain the recognition engine was about its glyphs:
//!
//! ```text
//! confidence = Σ weight(field) × strength(field)  /  Σ weight(all fields)
//! strength   = 1                  for an exact label match
//!            = fallback_penalty   for the weakest heuristic match
//!            = 0                  for an absent field
//! ```
//!
//! Name and academic score carry the large weights; balance is optional and
//! adds a smaller bonus. All weights come from [`ConfidenceWeights`].

use crate::config::ConfidenceWeights;
use crate::pipeline::extract::ExtractedFields;
use crate::record::MatchStrength;

/// Presence and strength of each field after scale resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldPresence {
    pub name: Option<MatchStrength>,
    pub academic: Option<MatchStrength>,
    pub balance: Option<MatchStrength>,
}

impl FieldPresence {
    /// `academic_resolved` is false when the raw score was discarded by the
    /// scale resolver; such a score counts as absent.
    pub fn from_fields(fields: &ExtractedFields, academic_resolved: bool) -> Self {
        Self {
            name: fields.name.as_ref().map(|m| m.strength),
            academic: fields
                .academic
                .filter(|_| academic_resolved)
                .map(|s| s.strength),
            balance: fields.balance.as_ref().map(|m| m.strength),
        }
    }
}

/// Aggregate field presence into a single value in `[0, 1]`, rounded to two
/// decimals.
pub fn score_confidence(presence: &FieldPresence, weights: &ConfidenceWeights) -> f64 {
    let total = weights.total();
    if total <= 0.0 {
        return 0.0;
    }
    let factor = |s: Option<MatchStrength>| match s {
        Some(MatchStrength::Exact) => 1.0,
        Some(MatchStrength::Fallback) => weights.fallback_penalty,
        None => 0.0,
    };
    let earned = weights.name_weight * factor(presence.name)
        + weights.gpa_weight * factor(presence.academic)
        + weights.balance_weight * factor(presence.balance);
    let score = (earned / total).clamp(0.0, 1.0);
    (score * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use MatchStrength::{Exact, Fallback};

    fn w() -> ConfidenceWeights {
        ConfidenceWeights::default()
    }

    #[test]
    fn nothing_found_is_zero() {
        assert_eq!(score_confidence(&FieldPresence::default(), &w()), 0.0);
    }

    #[test]
    fn everything_exact_is_one() {
        let p = FieldPresence {
            name: Some(Exact),
            academic: Some(Exact),
            balance: Some(Exact),
        };
        assert_eq!(score_confidence(&p, &w()), 1.0);
    }

    #[test]
    fn required_fields_outweigh_balance() {
        let required = FieldPresence {
            name: Some(Exact),
            academic: Some(Exact),
            balance: None,
        };
        let balance_only = FieldPresence {
            balance: Some(Exact),
            ..FieldPresence::default()
        };
        assert_eq!(score_confidence(&required, &w()), 0.8);
        assert_eq!(score_confidence(&balance_only, &w()), 0.2);
    }

    #[test]
    fn fallback_match_is_penalised() {
        let exact = FieldPresence {
            academic: Some(Exact),
            ..FieldPresence::default()
        };
        let fallback = FieldPresence {
            academic: Some(Fallback),
            ..FieldPresence::default()
        };
        assert_eq!(score_confidence(&exact, &w()), 0.4);
        assert_eq!(score_confidence(&fallback, &w()), 0.2);
    }

    #[test]
    fn adding_a_required_field_never_decreases_confidence() {
        let strengths = [None, Some(Exact), Some(Fallback)];
        for balance in strengths {
            for academic in strengths {
                for name in strengths {
                    let base = FieldPresence { name, academic, balance };
                    let b = score_confidence(&base, &w());
                    for added in [Exact, Fallback] {
                        if name.is_none() {
                            let more = FieldPresence { name: Some(added), ..base };
                            assert!(score_confidence(&more, &w()) >= b);
                        }
                        if academic.is_none() {
                            let more = FieldPresence { academic: Some(added), ..base };
                            assert!(score_confidence(&more, &w()) >= b);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn custom_weights_are_honoured() {
        let weights = ConfidenceWeights {
            name_weight: 1.0,
            gpa_weight: 3.0,
            balance_weight: 0.0,
            fallback_penalty: 0.0,
        };
        let p = FieldPresence {
            name: Some(Fallback),
            academic: Some(Exact),
            balance: Some(Exact),
        };
        assert_eq!(score_confidence(&p, &weights), 0.75);
    }

    #[test]
    fn unresolved_academic_counts_as_absent() {
        use crate::pipeline::extract::{RawScore, ScoreLabel};
        let fields = ExtractedFields {
            academic: Some(RawScore {
                value: 150.0,
                label: ScoreLabel::Bare,
                strength: Fallback,
            }),
            ..ExtractedFields::default()
        };
        assert_eq!(FieldPresence::from_fields(&fields, false).academic, None);
        assert_eq!(FieldPresence::from_fields(&fields, true).academic, Some(Fallback));
    }
}
