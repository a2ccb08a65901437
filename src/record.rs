//! Output types: extracted records, eligibility verdicts and the two
//! boundary response shapes.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Numeric scale an academic score was reported on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AcademicScale {
    /// 0–10 (GPA / CGPA).
    Ten,
    /// 0–100 (percentage).
    Hundred,
}

impl AcademicScale {
    /// Upper bound of the scale, inclusive.
    pub fn max(self) -> f64 {
        match self {
            AcademicScale::Ten => 10.0,
            AcademicScale::Hundred => 100.0,
        }
    }
}

impl fmt::Display for AcademicScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcademicScale::Ten => f.write_str("TEN"),
            AcademicScale::Hundred => f.write_str("HUNDRED"),
        }
    }
}

/// An academic score tagged with the scale it was reported on.
///
/// The only constructor is [`Score::new`], which rejects values outside
/// `0..=scale.max()`, so a `Score` in hand always satisfies the range
/// invariant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Score {
    value: f64,
    scale: AcademicScale,
}

impl Score {
    /// Returns `None` for negative, non-finite or out-of-range values.
    pub fn new(value: f64, scale: AcademicScale) -> Option<Self> {
        if value.is_finite() && (0.0..=scale.max()).contains(&value) {
            Some(Self { value, scale })
        } else {
            None
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn scale(&self) -> AcademicScale {
        self.scale
    }

    /// Express the score on the 10-point comparison scale.
    ///
    /// Hundred-scale values are divided by `percentage_divisor`
    /// (see [`crate::config::PERCENTAGE_TO_TEN_POINT_DIVISOR`]).
    pub fn to_ten_point(&self, percentage_divisor: f64) -> f64 {
        match self.scale {
            AcademicScale::Ten => self.value,
            AcademicScale::Hundred => self.value / percentage_divisor,
        }
    }
}

/// How a field was located in the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrength {
    /// An explicit label (e.g. `CGPA:`, `Available Balance`) preceded the value.
    Exact,
    /// Only the weakest heuristic pattern matched.
    Fallback,
}

/// Fields recovered from one document.
///
/// Created once per document and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedRecord {
    pub name: Option<String>,
    pub academic: Option<Score>,
    pub balance: Option<f64>,
    /// Extraction reliability in `[0, 1]`.
    pub confidence: f64,
}

impl ExtractedRecord {
    /// A record with every field absent and zero confidence.
    pub fn empty() -> Self {
        Self {
            name: None,
            academic: None,
            balance: None,
            confidence: 0.0,
        }
    }

    /// The academic score on its own scale.
    pub fn academic_score(&self) -> Option<f64> {
        self.academic.map(|s| s.value())
    }

    pub fn academic_scale(&self) -> Option<AcademicScale> {
        self.academic.map(|s| s.scale())
    }

    /// The academic score on the 10-point comparison scale.
    pub fn canonical_gpa(&self, percentage_divisor: f64) -> Option<f64> {
        self.academic.map(|s| s.to_ten_point(percentage_divisor))
    }
}

impl Serialize for ExtractedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut st = serializer.serialize_struct("ExtractedRecord", 5)?;
        st.serialize_field("name", &self.name)?;
        st.serialize_field("academic_score", &self.academic_score())?;
        st.serialize_field("academic_scale", &self.academic_scale())?;
        st.serialize_field("balance", &self.balance)?;
        st.serialize_field("confidence", &self.confidence)?;
        st.end()
    }
}

/// Outcome of the eligibility rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityVerdict {
    pub eligible: bool,
    /// One line per criterion: academic score first, then test score.
    pub reasons: Vec<String>,
}

/// The `data` object of a successful upload response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedData {
    /// Recognized text of all pages, one page per line block.
    pub raw_text: String,
    pub extracted_name: Option<String>,
    /// Academic score on the 10-point scale.
    pub extracted_gpa: Option<f64>,
    pub extracted_balance: Option<f64>,
    /// Scale the score was reported on in the document.
    pub academic_scale: Option<AcademicScale>,
    pub confidence_score: f64,
    /// Pages whose text reached the extractor.
    pub pages: usize,
}

/// Response for the document-upload contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub status: String,
    pub filename: String,
    pub data: ExtractedData,
}

impl UploadResponse {
    /// Successful response for `record`, extracted from `raw_text` spread
    /// over `pages` pages.
    pub fn success(
        filename: impl Into<String>,
        raw_text: String,
        pages: usize,
        record: &ExtractedRecord,
        percentage_divisor: f64,
    ) -> Self {
        Self {
            status: "success".to_string(),
            filename: filename.into(),
            data: ExtractedData {
                raw_text,
                extracted_name: record.name.clone(),
                extracted_gpa: record.canonical_gpa(percentage_divisor),
                extracted_balance: record.balance,
                academic_scale: record.academic_scale(),
                confidence_score: record.confidence,
                pages,
            },
        }
    }
}
