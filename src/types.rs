#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{fmt::Display, path::Path, str::FromStr};

use bon::Builder;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// Quality label assigned to a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    /// Meets the criteria.
    Bom,
    /// Partially meets the criteria.
    Regular,
    /// Does not meet the criteria.
    Ruim,
}

impl Verdict {
    /// Every label, in the order they are offered to the model.
    pub const ALL: [Verdict; 3] = [Verdict::Bom, Verdict::Regular, Verdict::Ruim];

    /// Label used whenever a submission could not be evaluated.
    pub const FALLBACK: Verdict = Verdict::Regular;

    /// Returns the label as it appears in reports and prompts.
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Bom => "Bom",
            Verdict::Regular => "Regular",
            Verdict::Ruim => "Ruim",
        }
    }
}

impl Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when text does not name one of the three labels.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("`{0}` is not one of Bom, Regular, Ruim")]
pub struct UnknownVerdict(pub String);

impl FromStr for Verdict {
    type Err = UnknownVerdict;

    /// Case-insensitive; surrounding whitespace, quotes and a trailing period
    /// are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cleaned = s
            .trim()
            .trim_matches(|c: char| c == '"' || c == '\'' || c == '.')
            .trim();
        Verdict::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(cleaned))
            .ok_or_else(|| UnknownVerdict(s.to_string()))
    }
}

/// One downloaded PDF and the text extracted from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Student identifier, derived from the file name.
    pub student_id: String,
    /// File name as listed in the Drive folder.
    pub file_name:  String,
    /// Extracted plain text.
    pub text:       String,
}

impl Submission {
    /// Creates a submission, deriving the student id from `file_name`.
    pub fn new(file_name: impl Into<String>, text: impl Into<String>) -> Self {
        let file_name = file_name.into();
        Self {
            student_id: student_id_from_file_name(&file_name),
            file_name,
            text: text.into(),
        }
    }
}

/// Strips the extension from a file name, keeping the name itself when there
/// is nothing to strip.
pub fn student_id_from_file_name(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string())
}

#[derive(Tabled, Debug, Clone, PartialEq, Eq, Builder)]
#[builder(on(String, into))]
/// A single row of the final report.
pub struct EvaluationRecord {
    #[tabled(rename = "Aluno")]
    /// * `student_id`: identifier derived from the file name
    pub student_id:      String,
    #[tabled(rename = "Arquivo")]
    /// * `file_name`: original Drive file name
    pub file_name:       String,
    #[tabled(rename = "Avaliação")]
    /// * `verdict`: assigned label
    pub verdict:         Verdict,
    #[tabled(rename = "Etapa")]
    /// * `stage`: stage of the active challenge
    pub stage:           String,
    #[tabled(rename = "Semana")]
    /// * `week`: week of the active challenge
    pub week:            String,
    #[tabled(rename = "RA")]
    /// * `registration_id`: RA read from the submission, empty when unknown
    #[builder(default)]
    pub registration_id: String,
    #[tabled(rename = "Nome")]
    /// * `student_name`: name read from the submission, empty when unknown
    #[builder(default)]
    pub student_name:    String,
}

impl EvaluationRecord {
    /// Cell values in the order of [`crate::constants::REPORT_COLUMNS`].
    pub fn cells(&self) -> [String; 7] {
        [
            self.student_id.clone(),
            self.file_name.clone(),
            self.verdict.to_string(),
            self.stage.clone(),
            self.week.clone(),
            self.registration_id.clone(),
            self.student_name.clone(),
        ]
    }
}
