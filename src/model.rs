use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

/// Outcome of one subject's total mark. `NotAttempted` rows are excluded from
/// every subject-level aggregate; a real zero is `Attempted(0.0)`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Attempt {
    Attempted(f64),
    #[default]
    NotAttempted,
}

impl Attempt {
    pub fn marks(self) -> Option<f64> {
        match self {
            Attempt::Attempted(v) => Some(v),
            Attempt::NotAttempted => None,
        }
    }

    pub fn is_attempted(self) -> bool {
        matches!(self, Attempt::Attempted(_))
    }
}

impl Serialize for Attempt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.marks().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Attempt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<f64>::deserialize(deserializer)?;
        Ok(match raw {
            Some(v) if v.is_finite() => Attempt::Attempted(v),
            _ => Attempt::NotAttempted,
        })
    }
}

/// Fixed grade ladder, best first.
pub const GRADE_LADDER: [&str; 8] = ["O", "A+", "A", "B+", "B", "C", "D", "F"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Grade {
    O,
    APlus,
    A,
    BPlus,
    B,
    C,
    D,
    F,
    /// Label outside the ladder; kept for display, never counted.
    Unrecognized(String),
}

impl Grade {
    /// Position in `GRADE_LADDER`, or `None` for unrecognized labels.
    pub fn ladder_index(&self) -> Option<usize> {
        match self {
            Grade::O => Some(0),
            Grade::APlus => Some(1),
            Grade::A => Some(2),
            Grade::BPlus => Some(3),
            Grade::B => Some(4),
            Grade::C => Some(5),
            Grade::D => Some(6),
            Grade::F => Some(7),
            Grade::Unrecognized(_) => None,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Grade::Unrecognized(s) => s.as_str(),
            known => known.ladder_index().map(|i| GRADE_LADDER[i]).unwrap_or_default(),
        }
    }
}

impl From<String> for Grade {
    fn from(raw: String) -> Self {
        let key = raw.trim().to_string();
        match key.as_str() {
            "O" => Grade::O,
            "A+" => Grade::APlus,
            "A" => Grade::A,
            "B+" => Grade::BPlus,
            "B" => Grade::B,
            "C" => Grade::C,
            "D" => Grade::D,
            "F" => Grade::F,
            _ => Grade::Unrecognized(raw),
        }
    }
}

impl From<Grade> for String {
    fn from(g: Grade) -> Self {
        match g {
            Grade::Unrecognized(s) => s,
            other => other.label().to_string(),
        }
    }
}

/// Overall verdict. Only the exact label `PASS` is a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResultStatus {
    Pass,
    Other(String),
}

impl ResultStatus {
    pub fn is_pass(&self) -> bool {
        matches!(self, ResultStatus::Pass)
    }
}

impl Default for ResultStatus {
    fn default() -> Self {
        ResultStatus::Other("FAILED".to_string())
    }
}

impl From<String> for ResultStatus {
    fn from(raw: String) -> Self {
        if raw == "PASS" {
            ResultStatus::Pass
        } else {
            ResultStatus::Other(raw)
        }
    }
}

impl From<ResultStatus> for String {
    fn from(r: ResultStatus) -> Self {
        match r {
            ResultStatus::Pass => "PASS".to_string(),
            ResultStatus::Other(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectResult {
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credits: Option<f64>,
    #[serde(default)]
    pub term_work: Option<f64>,
    #[serde(default)]
    pub oral: Option<f64>,
    #[serde(default)]
    pub external: Option<f64>,
    #[serde(default)]
    pub internal: Option<f64>,
    #[serde(default)]
    pub total: Attempt,
    #[serde(default)]
    pub grade: Option<Grade>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade_points: Option<f64>,
    #[serde(default)]
    pub passed: Option<bool>,
}

impl SubjectResult {
    /// Explicit per-paper failure flag. Independent of the record's overall result.
    pub fn is_failing(&self) -> bool {
        self.passed == Some(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub seat_no: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ern: Option<String>,
    #[serde(default)]
    pub college: String,
    #[serde(default)]
    pub subjects: Vec<SubjectResult>,
    pub total_marks: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_marks: Option<f64>,
    #[serde(default)]
    pub cgpa: Option<f64>,
    #[serde(default)]
    pub result: ResultStatus,
}

impl StudentRecord {
    /// Usable CGPA: present and strictly positive.
    pub fn usable_cgpa(&self) -> Option<f64> {
        self.cgpa.filter(|c| c.is_finite() && *c > 0.0)
    }

    /// Subject total at a positional index; missing entries count as not attempted.
    pub fn attempt_at(&self, idx: usize) -> Attempt {
        self.subjects
            .get(idx)
            .map(|s| s.total)
            .unwrap_or(Attempt::NotAttempted)
    }

    pub fn college_code(&self) -> &str {
        split_college(&self.college).0
    }
}

/// Splits `"<code>: <name>"` on the first colon. Without a colon the whole
/// trimmed string is both code and name.
pub fn split_college(raw: &str) -> (&str, &str) {
    match raw.split_once(':') {
        Some((code, name)) => {
            let name = name.trim();
            let code = code.trim();
            (code, if name.is_empty() { code } else { name })
        }
        None => (raw.trim(), raw.trim()),
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CourseInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credits: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_marks: Option<f64>,
}

/// Subject code to display label. Labels only; never needed for computation.
pub type CourseMetadata = BTreeMap<String, CourseInfo>;

/// Raw ingestion payload. Students stay as JSON values here so that one bad
/// row can be skipped without rejecting the rest (see `session::validate_records`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultsPayload {
    #[serde(default)]
    pub students: Vec<serde_json::Value>,
    #[serde(default)]
    pub course_metadata: CourseMetadata,
    #[serde(default)]
    pub statistics: Option<serde_json::Value>,
    #[serde(default)]
    pub exam_info: Option<serde_json::Value>,
}
