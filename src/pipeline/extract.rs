//! Field extraction: locate name, academic score and balance in normalised
//! text.
//!
//! Every field has an ordered list of typed matchers, most specific first.
//! Extraction walks the list and stops at the **first matcher whose pattern
//! matches**. Weaker matchers are never consulted once a stronger one has
//! matched, even if the stronger match then fails to parse. That ordering
//! decides which label (and so which scale) a borderline value is attributed
//! to, so the tables below are part of the contract:
//!
//! | # | Academic score label              | Label hint    | Strength |
//! |---|-----------------------------------|---------------|----------|
//! | 1 | `CGPA`, `C.G.P.A`                 | `Cgpa`        | exact    |
//! | 2 | `GPA`                             | `Gpa`         | exact    |
//! | 3 | `Final Grade`, `Grade`            | `Grade`       | exact    |
//! | 4 | `Percentage`, `Percent`           | `Percentage`  | exact    |
//! | 5 | `<number> %`                      | `PercentSign` | exact    |
//! | 6 | `Score`, `Aggregate`, `Marks Obtained` | `Score`  | exact    |
//! | 7 | number after an academic keyword  | `Bare`        | fallback |
//!
//! Balance: `Available Balance`, `Current/Closing/Ledger Balance`, `Balance`
//! (exact), then currency-marked `Amount` and `Total` (fallback).
//!
//! Name: `Name of (the) Student`, `Student Name`, `Name`, `Candidate`. The
//! name is read from the rest of the label's line (or the next line when the
//! label ends its line) and stops at the line break or the next label.
//!
//! Extraction never fails: anything not found is `None`.

use crate::pipeline::normalize::{NormalizedText, CURRENCY};
use crate::record::{AcademicScale, MatchStrength};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;
use tracing::debug;

/// Which academic-score pattern produced a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ScoreLabel {
    Cgpa,
    Gpa,
    Percentage,
    PercentSign,
    Grade,
    Score,
    Bare,
}

impl ScoreLabel {
    /// The scale the label itself names, if any.
    pub fn scale_hint(self) -> Option<AcademicScale> {
        match self {
            ScoreLabel::Cgpa | ScoreLabel::Gpa => Some(AcademicScale::Ten),
            ScoreLabel::Percentage | ScoreLabel::PercentSign => Some(AcademicScale::Hundred),
            ScoreLabel::Grade | ScoreLabel::Score | ScoreLabel::Bare => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScoreLabel::Cgpa => "CGPA",
            ScoreLabel::Gpa => "GPA",
            ScoreLabel::Percentage => "Percentage",
            ScoreLabel::PercentSign => "%",
            ScoreLabel::Grade => "Grade",
            ScoreLabel::Score => "Score",
            ScoreLabel::Bare => "bare number",
        }
    }
}

/// A located field value and how it was located.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMatch<T> {
    pub value: T,
    pub strength: MatchStrength,
}

/// An academic score before scale resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawScore {
    pub value: f64,
    pub label: ScoreLabel,
    pub strength: MatchStrength,
}

/// Everything the extractor found.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedFields {
    pub name: Option<FieldMatch<String>>,
    pub academic: Option<RawScore>,
    pub balance: Option<FieldMatch<f64>>,
}

/// Run every field extractor over the normalised text.
pub fn extract_fields(text: &NormalizedText) -> ExtractedFields {
    let fields = ExtractedFields {
        name: extract_name(text.lines()),
        academic: extract_academic_score(text.flat()),
        balance: extract_balance(text.flat()),
    };
    debug!(
        "Extracted fields: name={} academic={:?} balance={:?}",
        fields.name.is_some(),
        fields.academic.map(|s| (s.value, s.label)),
        fields.balance.as_ref().map(|b| b.value)
    );
    fields
}

// ── Typed matchers ──────────────────────────────────────────────────────────

/// One entry of a priority list.
///
/// `re` captures the value in group `value`. A match that also captures the
/// optional `skip` group (e.g. `IELTS` before `Score`, `Father's` before
/// `Name`) does not count; the search continues to the next occurrence of
/// the same pattern.
struct Matcher<L> {
    label: L,
    strength: MatchStrength,
    re: Regex,
}

impl<L: Copy> Matcher<L> {
    fn new(label: L, strength: MatchStrength, pattern: &str) -> Self {
        Self {
            label,
            strength,
            re: Regex::new(pattern).unwrap(),
        }
    }

    fn find<'t>(&self, text: &'t str) -> Option<Captures<'t>> {
        self.re
            .captures_iter(text)
            .find(|caps| caps.name("skip").is_none())
    }
}

/// A value token: starts with a digit and runs to whitespace or `/`.
const VALUE: &str = r"(?P<value>\d[^\s/]*)";

/// Separator between a label and its value.
const SEP: &str = r"[\s:\-=]*";

/// A language-test name up to three words before a score label
/// (`IELTS Overall Band Score`); the match is skipped.
const TEST_PREFIX: &str = r"(?P<skip>\b(?:IELTS|TOEFL|PTE|GRE|GMAT|SAT)\b(?:\s+\w+){0,3}?\s+)?";

static SCORE_MATCHERS: Lazy<Vec<Matcher<ScoreLabel>>> = Lazy::new(|| {
    use MatchStrength::{Exact, Fallback};
    vec![
        Matcher::new(
            ScoreLabel::Cgpa,
            Exact,
            &format!(r"(?i)\bC\.?G\.?P\.?A\b\.?\)?{SEP}{VALUE}"),
        ),
        Matcher::new(
            ScoreLabel::Gpa,
            Exact,
            &format!(r"(?i)\bG\.?P\.?A\b\.?\)?{SEP}{VALUE}"),
        ),
        Matcher::new(
            ScoreLabel::Grade,
            Exact,
            &format!(r"(?i)\b(?:Final\s+)?Grade\b{SEP}{VALUE}"),
        ),
        Matcher::new(
            ScoreLabel::Percentage,
            Exact,
            &format!(r"(?i)\bPercent(?:age)?\b{SEP}{VALUE}"),
        ),
        Matcher::new(
            ScoreLabel::PercentSign,
            Exact,
            r"\b(?P<value>\d{1,3}(?:\.\d+)?)\s*%",
        ),
        Matcher::new(
            ScoreLabel::Score,
            Exact,
            &format!(
                r"(?i){TEST_PREFIX}\b(?:Score|Aggregate|Marks\s+Obtained)\b{SEP}{VALUE}"
            ),
        ),
        Matcher::new(
            ScoreLabel::Bare,
            Fallback,
            &format!(
                r"(?i){TEST_PREFIX}\b(?:cumulative|academic|result|average|semester|overall)\b\D{{0,40}}?{VALUE}"
            ),
        ),
    ]
});

#[derive(Debug, Clone, Copy)]
enum BalanceLabel {
    Available,
    Current,
    Balance,
    Amount,
    Total,
}

static BALANCE_MATCHERS: Lazy<Vec<Matcher<BalanceLabel>>> = Lazy::new(|| {
    use MatchStrength::{Exact, Fallback};
    vec![
        Matcher::new(
            BalanceLabel::Available,
            Exact,
            &format!(r"(?i)\bAvailable\s+Balance\b{SEP}(?:{CURRENCY}\s*)?{VALUE}"),
        ),
        Matcher::new(
            BalanceLabel::Current,
            Exact,
            &format!(
                r"(?i)\b(?:Current|Closing|Ledger)\s+Balance\b{SEP}(?:{CURRENCY}\s*)?{VALUE}"
            ),
        ),
        Matcher::new(
            BalanceLabel::Balance,
            Exact,
            &format!(r"(?i)\bBalance\b{SEP}(?:{CURRENCY}\s*)?{VALUE}"),
        ),
        Matcher::new(
            BalanceLabel::Amount,
            Fallback,
            &format!(r"(?i)\bAmount\b{SEP}{CURRENCY}\s*{VALUE}"),
        ),
        Matcher::new(
            BalanceLabel::Total,
            Fallback,
            &format!(r"(?i)\bTotal\b{SEP}{CURRENCY}\s*{VALUE}"),
        ),
    ]
});

#[derive(Debug, Clone, Copy)]
enum NameLabel {
    NameOfStudent,
    StudentName,
    Name,
    Candidate,
}

static NAME_MATCHERS: Lazy<Vec<Matcher<NameLabel>>> = Lazy::new(|| {
    use MatchStrength::Exact;
    vec![
        Matcher::new(
            NameLabel::NameOfStudent,
            Exact,
            r"(?i)\bName\s+of\s+(?:the\s+)?(?:Student|Candidate|Applicant)\b[\s:\-]*",
        ),
        Matcher::new(
            NameLabel::StudentName,
            Exact,
            r"(?i)\b(?:Student|Candidate|Applicant)(?:['’]s)?\s+Name\b[\s:\-]*",
        ),
        Matcher::new(
            NameLabel::Name,
            Exact,
            r"(?i)(?P<skip>\b(?:Father|Mother|Guardian|Parent|University|College|Institute|School|Bank|Branch|Nominee|Course|Program(?:me)?)(?:['’]s)?\s+)?\bName\b[\s:\-]*",
        ),
        Matcher::new(
            NameLabel::Candidate,
            Exact,
            r"(?i)\b(?:Candidate|Applicant)\b[\s:\-]*",
        ),
    ]
});

/// Labels that end a name value when they appear on the same line.
static RE_NEXT_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:C\.?G\.?P\.?A|G\.?P\.?A|Percent(?:age)?|Grade|Score|Marks|Roll|Reg(?:istration)?|Enrol(?:l)?ment|Date|DOB|Balance|Account|Course|Program(?:me)?|Semester|Father|Mother|ID|No)\b",
    )
    .unwrap()
});

/// Words that never belong to a person's name; a name stops at the first.
const NAME_STOP_WORDS: &[&str] = &[
    "university", "college", "institute", "school", "department", "faculty", "of", "the", "and",
    "cgpa", "gpa", "grade",
];

const HONORIFICS: &[&str] = &["mr", "mrs", "ms", "miss", "dr"];

// ── Academic score ──────────────────────────────────────────────────────────

fn extract_academic_score(flat: &str) -> Option<RawScore> {
    for m in SCORE_MATCHERS.iter() {
        if let Some(caps) = m.find(flat) {
            let token = &caps["value"];
            let value = parse_decimal(token);
            debug!(
                "Academic score matched by {} pattern: {:?} → {:?}",
                m.label.as_str(),
                token,
                value
            );
            // First matching pattern wins, even when its token is junk.
            return value.map(|value| RawScore {
                value,
                label: m.label,
                strength: m.strength,
            });
        }
    }
    None
}

// ── Balance ─────────────────────────────────────────────────────────────────

fn extract_balance(flat: &str) -> Option<FieldMatch<f64>> {
    for m in BALANCE_MATCHERS.iter() {
        if let Some(caps) = m.find(flat) {
            let token = &caps["value"];
            debug!("Balance matched by {:?} pattern: {:?}", m.label, token);
            return parse_decimal(token)
                .filter(|v| *v > 0.0)
                .map(|value| FieldMatch {
                    value,
                    strength: m.strength,
                });
        }
    }
    None
}

// ── Name ────────────────────────────────────────────────────────────────────

fn extract_name(lines: &[String]) -> Option<FieldMatch<String>> {
    for m in NAME_MATCHERS.iter() {
        for (i, line) in lines.iter().enumerate() {
            let Some(caps) = m.find(line) else {
                continue;
            };
            let end = caps.get(0).map_or(line.len(), |whole| whole.end());
            let mut rest = line[end..].trim();
            // Label alone on its line: the value is the next line.
            if rest.is_empty() {
                rest = lines.get(i + 1).map(|s| s.trim()).unwrap_or("");
            }
            let name = clean_name(cut_at_next_label(rest));
            debug!("Name matched by {:?} pattern: {:?}", m.label, name);
            return name.map(|value| FieldMatch {
                value,
                strength: m.strength,
            });
        }
    }
    None
}

fn cut_at_next_label(rest: &str) -> &str {
    match RE_NEXT_LABEL.find(rest) {
        Some(m) => &rest[..m.start()],
        None => rest,
    }
}

/// Keep leading capitalised alphabetic words; accept 2–4 of them.
fn clean_name(candidate: &str) -> Option<String> {
    let mut words: Vec<&str> = Vec::new();
    for raw in candidate.split_whitespace() {
        let word = raw.trim_end_matches([',', ';', ':']);
        let lower = word.trim_end_matches('.').to_lowercase();
        if words.is_empty() && HONORIFICS.contains(&lower.as_str()) {
            continue;
        }
        if NAME_STOP_WORDS.contains(&lower.as_str()) || !is_name_word(word) {
            break;
        }
        words.push(word);
        if words.len() > 4 {
            return None;
        }
    }
    (2..=4).contains(&words.len()).then(|| words.join(" "))
}

fn is_name_word(word: &str) -> bool {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() && first.is_uppercase() => {
            chars.all(|c| c.is_alphabetic() || matches!(c, '.' | '\'' | '’' | '-'))
        }
        _ => false,
    }
}

// ── Numeric tokens ──────────────────────────────────────────────────────────

static RE_DECIMAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+(?:\.\d+)?$").unwrap());

/// Parse a captured value token as a decimal.
///
/// Trailing `%` and sentence punctuation are dropped and thousands commas
/// removed; anything else non-numeric makes the token unparseable.
fn parse_decimal(token: &str) -> Option<f64> {
    let trimmed = token.trim_end_matches(['%', '.', ',', ';', ':', ')']);
    let cleaned = trimmed.replace(',', "");
    if !RE_DECIMAL.is_match(&cleaned) {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::normalize::normalize_text;

    fn fields(raw: &str) -> ExtractedFields {
        extract_fields(&normalize_text(raw))
    }

    #[test]
    fn cgpa_with_out_of_ten_suffix() {
        let f = fields("Semester Report CGPA: 8.5/10");
        let s = f.academic.unwrap();
        assert_eq!(s.value, 8.5);
        assert_eq!(s.label, ScoreLabel::Cgpa);
        assert_eq!(s.strength, MatchStrength::Exact);
    }

    #[test]
    fn dotted_cgpa_label() {
        let s = fields("C.G.P.A. - 9.12").academic.unwrap();
        assert_eq!(s.label, ScoreLabel::Cgpa);
        assert_eq!(s.value, 9.12);
    }

    #[test]
    fn gpa_pattern_does_not_fire_inside_cgpa() {
        // CGPA carries junk, so the field is absent; GPA is not consulted.
        let f = fields("CGPA: 8.5x GPA: 7.0");
        assert!(f.academic.is_none());
    }

    #[test]
    fn stronger_pattern_wins_over_earlier_text() {
        let s = fields("Percentage: 85% ... GPA 3.9").academic.unwrap();
        assert_eq!(s.label, ScoreLabel::Gpa);
        assert_eq!(s.value, 3.9);
    }

    #[test]
    fn percentage_label() {
        let s = fields("Percentage: 85%").academic.unwrap();
        assert_eq!(s.label, ScoreLabel::Percentage);
        assert_eq!(s.value, 85.0);
    }

    #[test]
    fn grade_label_outranks_stray_percentage() {
        let s = fields("Final Grade: 7.5\nAttendance: 92%").academic.unwrap();
        assert_eq!(s.label, ScoreLabel::Grade);
        assert_eq!(s.value, 7.5);
    }

    #[test]
    fn bare_percent_sign() {
        let s = fields("The candidate secured 78.4 % overall").academic.unwrap();
        assert_eq!(s.label, ScoreLabel::PercentSign);
        assert_eq!(s.value, 78.4);
    }

    #[test]
    fn ielts_score_is_not_an_academic_score() {
        let s = fields("IELTS Score: 7.5 Aggregate: 72").academic.unwrap();
        assert_eq!(s.label, ScoreLabel::Score);
        assert_eq!(s.value, 72.0);
    }

    #[test]
    fn test_score_with_words_between_is_skipped() {
        assert!(fields("IELTS Overall Band Score: 7.5").academic.is_none());
        let s = fields("TOEFL iBT Total Score: 98 Aggregate: 72").academic.unwrap();
        assert_eq!(s.label, ScoreLabel::Score);
        assert_eq!(s.value, 72.0);
    }

    #[test]
    fn fallback_keyword_number() {
        let s = fields("Cumulative standing of the student 150").academic.unwrap();
        assert_eq!(s.label, ScoreLabel::Bare);
        assert_eq!(s.strength, MatchStrength::Fallback);
        assert_eq!(s.value, 150.0);
    }

    #[test]
    fn no_academic_score_in_unrelated_text() {
        assert!(fields("Dear Sir, please find attached.").academic.is_none());
    }

    #[test]
    fn name_stops_at_next_label() {
        let f = fields("Student Name: Jane Marie Doe CGPA: 8.1");
        assert_eq!(f.name.unwrap().value, "Jane Marie Doe");
    }

    #[test]
    fn name_stops_at_line_break() {
        let f = fields("Name: Arjun Kumar\nSharma Institute of Technology");
        assert_eq!(f.name.unwrap().value, "Arjun Kumar");
    }

    #[test]
    fn name_on_following_line() {
        let f = fields("Name of the Student\nPriya Nair\nRoll No. 42");
        assert_eq!(f.name.unwrap().value, "Priya Nair");
    }

    #[test]
    fn fathers_name_is_skipped() {
        let f = fields("Father's Name: Robert Smith\nName: Alice Smith");
        assert_eq!(f.name.unwrap().value, "Alice Smith");
    }

    #[test]
    fn fathers_name_with_typographic_apostrophe_is_skipped() {
        let f = fields("Father\u{2019}s Name: Robert Smith\nName: Alice Smith");
        assert_eq!(f.name.unwrap().value, "Alice Smith");
        let f = fields("Student\u{2019}s Name: Alice O\u{2019}Brien");
        assert_eq!(f.name.unwrap().value, "Alice O\u{2019}Brien");
    }

    #[test]
    fn single_word_name_is_absent() {
        assert!(fields("Name: Madonna").name.is_none());
    }

    #[test]
    fn name_drops_honorific_and_stops_at_stop_word() {
        let f = fields("Candidate: Mr. John Doe University of Pune");
        assert_eq!(f.name.unwrap().value, "John Doe");
    }

    #[test]
    fn balance_with_currency_and_commas() {
        let b = fields("Available Balance: INR 12,50,000.75").balance.unwrap();
        assert_eq!(b.value, 1_250_000.75);
        assert_eq!(b.strength, MatchStrength::Exact);
    }

    #[test]
    fn balance_total_needs_currency() {
        assert!(fields("Total 45").balance.is_none());
        let b = fields("Total: $ 3,400").balance.unwrap();
        assert_eq!(b.value, 3400.0);
        assert_eq!(b.strength, MatchStrength::Fallback);
    }

    #[test]
    fn balance_with_misread_zeros_after_currency() {
        let b = fields("Available Balance: Rs.5O,OOO").balance.unwrap();
        assert_eq!(b.value, 50_000.0);
    }

    #[test]
    fn zero_balance_is_absent() {
        assert!(fields("Closing Balance: 0.00").balance.is_none());
    }

    #[test]
    fn parse_decimal_rules() {
        assert_eq!(parse_decimal("8.5"), Some(8.5));
        assert_eq!(parse_decimal("85%"), Some(85.0));
        assert_eq!(parse_decimal("12,500.00"), Some(12500.0));
        assert_eq!(parse_decimal("9.0."), Some(9.0));
        assert_eq!(parse_decimal("8.5x"), None);
        assert_eq!(parse_decimal("1.2.3"), None);
    }

    #[test]
    fn empty_text_yields_nothing() {
        assert_eq!(fields(""), ExtractedFields::default());
    }
}
