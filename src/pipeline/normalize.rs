//! Text normalisation: clean raw recognized text before field search.
//!
//! Recognition engines hand back text with ragged spacing, stray control
//! characters and the classic glyph confusions (`O` for `0`, `l` for `1`).
//! The rules below are deterministic `&str → String` passes applied in a
//! fixed order:
//!
//! 1. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
//! 2. Normalise line endings (CRLF / CR → LF)
//! 3. Collapse whitespace runs inside each line and trim it
//! 4. Drop empty lines
//! 5. Repair confusable glyphs inside numeric-looking tokens only
//!
//! Rule 5 never touches a token that contains a letter other than the
//! confusables, so names and labels survive unchanged.

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

/// Normalised text, kept both line-by-line and fully collapsed.
///
/// Numeric fields are searched over [`flat`](Self::flat); the name field is
/// searched over [`lines`](Self::lines) so that it can stop at a line break.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedText {
    lines: Vec<String>,
    flat: String,
}

impl NormalizedText {
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// All lines joined by single spaces.
    pub fn flat(&self) -> &str {
        &self.flat
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Apply all normalisation rules to raw recognized text.
///
/// Never fails; empty or whitespace-only input yields an empty result.
pub fn normalize_text(raw: &str) -> NormalizedText {
    let s = remove_invisible_chars(raw);
    let s = normalise_line_endings(&s);
    let lines: Vec<String> = s
        .lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .map(|line| repair_numeric_tokens(&line).into_owned())
        .collect();
    let flat = lines.join(" ");
    NormalizedText { lines, flat }
}

// ── Rule 1: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 2: Normalise line endings ──────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Collapse whitespace within a line ───────────────────────────────

fn collapse_whitespace(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ── Rule 5: Repair confusable glyphs in numeric tokens ──────────────────────

/// Currency markers that may precede an amount.
pub(crate) const CURRENCY: &str = r"(?:Rs\.?|INR|USD|EUR|GBP|₹|\$|€|£)";

static RE_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\s:=]+").unwrap());

static RE_CURRENCY_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("^{CURRENCY}")).unwrap());

fn repair_numeric_tokens(line: &str) -> Cow<'_, str> {
    RE_TOKEN.replace_all(line, |caps: &regex::Captures<'_>| {
        let token = &caps[0];
        // `Rs.5O,OOO`: the amount after a glued currency marker is repaired alone.
        let split = RE_CURRENCY_PREFIX.find(token).map_or(0, |m| m.end());
        let (prefix, amount) = token.split_at(split);
        if is_numeric_looking(amount) {
            let repaired: String = amount.chars().map(repair_glyph).collect();
            format!("{prefix}{repaired}")
        } else {
            token.to_string()
        }
    })
}

fn is_confusable(c: char) -> bool {
    matches!(c, 'O' | 'o' | 'l' | 'I')
}

/// A token with at least one digit whose other characters are numeric
/// punctuation or confusable glyphs.
fn is_numeric_looking(token: &str) -> bool {
    let mut has_digit = false;
    let mut has_confusable = false;
    for c in token.chars() {
        if c.is_ascii_digit() {
            has_digit = true;
        } else if is_confusable(c) {
            has_confusable = true;
        } else if !matches!(c, '.' | ',' | '%' | '/') {
            return false;
        }
    }
    has_digit && has_confusable
}

fn repair_glyph(c: char) -> char {
    match c {
        'O' | 'o' => '0',
        'l' | 'I' => '1',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace_and_drops_blank_lines() {
        let t = normalize_text("  Student   Name:\tJane  Doe \r\n\r\n\n CGPA : 8.5  ");
        assert_eq!(t.lines(), &["Student Name: Jane Doe", "CGPA : 8.5"]);
        assert_eq!(t.flat(), "Student Name: Jane Doe CGPA : 8.5");
    }

    #[test]
    fn empty_input_is_empty() {
        assert!(normalize_text("").is_empty());
        assert!(normalize_text(" \n\t \r\n").is_empty());
        assert_eq!(normalize_text("").flat(), "");
    }

    #[test]
    fn repairs_letter_o_inside_numbers() {
        let t = normalize_text("Percentage: 8O% CGPA:8.O5/1O");
        assert_eq!(t.flat(), "Percentage: 80% CGPA:8.05/10");
    }

    #[test]
    fn repairs_lowercase_l_as_one() {
        assert_eq!(normalize_text("Balance l2,5OO").flat(), "Balance 12,500");
    }

    #[test]
    fn repairs_amount_glued_to_currency_marker() {
        let t = normalize_text("Available Balance: Rs.5O,OOO");
        assert_eq!(t.flat(), "Available Balance: Rs.50,000");
        assert_eq!(normalize_text("Total: $lOO").flat(), "Total: $100");
        assert_eq!(normalize_text("INR Only").flat(), "INR Only");
    }

    #[test]
    fn leaves_names_and_labels_alone() {
        let input = "Name: OLIVER O'NEIL Lola Io";
        assert_eq!(normalize_text(input).flat(), input);
        // A token needs a digit before anything is repaired.
        assert_eq!(normalize_text("GPA O").flat(), "GPA O");
    }

    #[test]
    fn mixed_alphanumeric_token_untouched() {
        assert_eq!(normalize_text("Roll A1O23").flat(), "Roll A1O23");
    }

    #[test]
    fn strips_invisible_characters() {
        let t = normalize_text("CG\u{200B}PA\u{FEFF}: 9.1");
        assert_eq!(t.flat(), "CGPA: 9.1");
    }
}
