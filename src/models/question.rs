// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};

/// Question kinds delivered by the portal.
///
/// `SingleSelect` and `Boolean` are answered with a zero-based choice index;
/// `FreeText` is answered with typed text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(rename_all = "kebab-case")]
pub enum QuestionKind {
    SingleSelect,
    Boolean,
    FreeText,
}

/// Represents a row of the 'questions' table.
///
/// Correctness is carried by exactly one of `correct_choice` / `correct_text`,
/// according to `kind`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    pub test_id: i64,

    /// Order of the question within its test.
    pub position: i64,

    pub prompt: String,

    pub kind: QuestionKind,

    /// Choice labels (e.g., ["Option A", "Option B"]).
    /// Stored as a JSON array in the database; empty for free-text questions.
    pub choices: Json<Vec<String>>,

    /// Zero-based index of the correct choice (choice kinds only).
    pub correct_choice: Option<i64>,

    /// Expected answer text (free-text only).
    pub correct_text: Option<String>,

    /// Optional per-question time limit in seconds.
    pub time_limit_secs: Option<i64>,

    pub subject: Option<String>,

    pub difficulty: Option<String>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Question {
    /// Checks the correctness invariant for this question's kind.
    pub fn correctness_consistent(&self) -> bool {
        match self.kind {
            QuestionKind::SingleSelect | QuestionKind::Boolean => {
                self.correct_choice.is_some() && self.correct_text.is_none()
            }
            QuestionKind::FreeText => {
                self.correct_text.is_some() && self.correct_choice.is_none()
            }
        }
    }
}
