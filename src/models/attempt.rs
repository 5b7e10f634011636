// src/models/attempt.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

use crate::session::ledger::ViolationEntry;

/// Represents a row of the 'test_attempts' table.
/// At most one row exists per (test_id, student_id); submission upserts.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub id: i64,
    pub test_id: i64,
    pub student_id: String,
    pub student_name: String,

    /// Question id -> selected choice index.
    pub choice_answers: Json<HashMap<i64, u32>>,

    /// Question id -> typed answer (free-text questions).
    pub text_answers: Json<HashMap<i64, String>>,

    pub score: i64,
    pub total_questions: i64,
    pub time_spent_secs: i64,

    pub tab_switch_count: i64,
    pub violation_count: i64,
    pub violations: Json<Vec<ViolationEntry>>,

    pub was_terminated: bool,
    pub termination_reason: Option<String>,
    pub is_completed: bool,

    pub ip_address: Option<String>,
    pub user_agent: Option<String>,

    pub completed_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for submitting a finished or terminated session.
///
/// The same shape is accepted over HTTP and by the in-process gateway, so a
/// retried submission resends an identical payload.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AttemptDraft {
    pub test_id: i64,

    #[validate(length(min = 1, max = 64))]
    pub student_id: String,

    #[validate(length(min = 1, max = 100))]
    pub student_name: String,

    #[serde(default)]
    pub choice_answers: HashMap<i64, u32>,

    #[serde(default)]
    pub text_answers: HashMap<i64, String>,

    #[validate(range(min = 0))]
    pub score: i64,

    #[validate(range(min = 1))]
    pub total_questions: i64,

    #[validate(range(min = 0))]
    pub time_spent_secs: i64,

    #[serde(default)]
    pub tab_switch_count: i64,

    #[serde(default)]
    pub violation_count: i64,

    #[serde(default)]
    pub violations: Vec<ViolationEntry>,

    #[serde(default)]
    pub was_terminated: bool,

    pub termination_reason: Option<String>,

    pub is_completed: bool,

    pub ip_address: Option<String>,

    pub user_agent: Option<String>,
}

/// Condensed view of a stored attempt, returned by the completion pre-check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptSummary {
    pub id: i64,
    pub score: i64,
    pub total_questions: i64,
    pub completed_at: chrono::DateTime<chrono::Utc>,
    pub was_terminated: bool,
    pub violations: Vec<ViolationEntry>,
}

impl From<&AttemptRecord> for AttemptSummary {
    fn from(record: &AttemptRecord) -> Self {
        AttemptSummary {
            id: record.id,
            score: record.score,
            total_questions: record.total_questions,
            completed_at: record.completed_at,
            was_terminated: record.was_terminated,
            violations: record.violations.0.clone(),
        }
    }
}

/// Response of the completion pre-check endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionCheck {
    pub has_completed: bool,
    pub attempt: Option<AttemptSummary>,
}
