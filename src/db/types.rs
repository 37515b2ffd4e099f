use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "examtype")]
pub(crate) enum ExamType {
    #[serde(rename = "MIDTERM_1")]
    #[sqlx(rename = "midterm_1")]
    Midterm1,
    #[serde(rename = "MIDTERM_2")]
    #[sqlx(rename = "midterm_2")]
    Midterm2,
    #[serde(rename = "END_TERM")]
    #[sqlx(rename = "end_term")]
    EndTerm,
}

impl ExamType {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Midterm1 => "MIDTERM_1",
            Self::Midterm2 => "MIDTERM_2",
            Self::EndTerm => "END_TERM",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "difficultylevel", rename_all = "lowercase")]
pub(crate) enum DifficultyLevel {
    Easy,
    Medium,
    Hard,
}

impl DifficultyLevel {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "EASY",
            Self::Medium => "MEDIUM",
            Self::Hard => "HARD",
        }
    }
}
