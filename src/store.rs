// src/store.rs
//
// All database access lives here, shared by the HTTP handlers and the
// in-process attempt gateway.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::types::Json;

use crate::models::attempt::{AttemptDraft, AttemptRecord, AttemptSummary};
use crate::models::question::Question;
use crate::models::test::Test;
use crate::session::gateway::{AttemptGateway, GatewayError};

const TEST_COLUMNS: &str = "id, title, subject, duration_secs, randomize_questions, \
     question_pool_size, is_active, created_by, created_at";

const QUESTION_COLUMNS: &str = "id, test_id, position, prompt, kind, choices, \
     correct_choice, correct_text, time_limit_secs, subject, difficulty, created_at";

const ATTEMPT_COLUMNS: &str = "id, test_id, student_id, student_name, choice_answers, \
     text_answers, score, total_questions, time_spent_secs, tab_switch_count, \
     violation_count, violations, was_terminated, termination_reason, is_completed, \
     ip_address, user_agent, completed_at";

/// Loads a test with its questions, applying the delivery policy: stored
/// order by default, shuffled when the test randomizes, and a random subset
/// when a pool size is configured.
pub async fn fetch_test(pool: &SqlitePool, test_id: i64) -> Result<Option<Test>, sqlx::Error> {
    let test = sqlx::query_as::<_, Test>(&format!(
        "SELECT {TEST_COLUMNS} FROM tests WHERE id = ?"
    ))
    .bind(test_id)
    .fetch_optional(pool)
    .await?;

    let Some(mut test) = test else {
        return Ok(None);
    };

    test.questions = if test.randomize_questions || test.question_pool_size.is_some() {
        // LIMIT -1 is SQLite for "no limit".
        let limit = test.question_pool_size.unwrap_or(-1);
        sqlx::query_as::<_, Question>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE test_id = ? \
             ORDER BY RANDOM() LIMIT ?"
        ))
        .bind(test_id)
        .bind(limit)
        .fetch_all(pool)
        .await?
    } else {
        sqlx::query_as::<_, Question>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE test_id = ? ORDER BY position"
        ))
        .bind(test_id)
        .fetch_all(pool)
        .await?
    };

    Ok(Some(test))
}

/// Persists an attempt, keeping at most one row per (test_id, student_id).
/// A resubmission overwrites the stored attempt and returns the same row's id.
pub async fn upsert_attempt(pool: &SqlitePool, draft: &AttemptDraft) -> Result<i64, sqlx::Error> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO test_attempts (
            test_id, student_id, student_name, choice_answers, text_answers,
            score, total_questions, time_spent_secs, tab_switch_count,
            violation_count, violations, was_terminated, termination_reason,
            is_completed, ip_address, user_agent, completed_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(test_id, student_id) DO UPDATE SET
            student_name = excluded.student_name,
            choice_answers = excluded.choice_answers,
            text_answers = excluded.text_answers,
            score = excluded.score,
            total_questions = excluded.total_questions,
            time_spent_secs = excluded.time_spent_secs,
            tab_switch_count = excluded.tab_switch_count,
            violation_count = excluded.violation_count,
            violations = excluded.violations,
            was_terminated = excluded.was_terminated,
            termination_reason = excluded.termination_reason,
            is_completed = excluded.is_completed,
            ip_address = excluded.ip_address,
            user_agent = excluded.user_agent,
            completed_at = excluded.completed_at
        RETURNING id",
    )
    .bind(draft.test_id)
    .bind(&draft.student_id)
    .bind(&draft.student_name)
    .bind(Json(&draft.choice_answers))
    .bind(Json(&draft.text_answers))
    .bind(draft.score)
    .bind(draft.total_questions)
    .bind(draft.time_spent_secs)
    .bind(draft.tab_switch_count)
    .bind(draft.violation_count)
    .bind(Json(&draft.violations))
    .bind(draft.was_terminated)
    .bind(&draft.termination_reason)
    .bind(draft.is_completed)
    .bind(&draft.ip_address)
    .bind(&draft.user_agent)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// The stored attempt for a (test, student) pair, if one exists.
pub async fn completion_for(
    pool: &SqlitePool,
    test_id: i64,
    student_id: &str,
) -> Result<Option<AttemptRecord>, sqlx::Error> {
    sqlx::query_as::<_, AttemptRecord>(&format!(
        "SELECT {ATTEMPT_COLUMNS} FROM test_attempts WHERE test_id = ? AND student_id = ?"
    ))
    .bind(test_id)
    .bind(student_id)
    .fetch_optional(pool)
    .await
}

/// All attempts for a test, best score first, earlier submission breaking ties.
pub async fn results_for_test(
    pool: &SqlitePool,
    test_id: i64,
) -> Result<Vec<AttemptRecord>, sqlx::Error> {
    sqlx::query_as::<_, AttemptRecord>(&format!(
        "SELECT {ATTEMPT_COLUMNS} FROM test_attempts WHERE test_id = ? \
         ORDER BY score DESC, completed_at ASC"
    ))
    .bind(test_id)
    .fetch_all(pool)
    .await
}

/// A student's attempt history, most recent first.
pub async fn attempts_for_student(
    pool: &SqlitePool,
    student_id: &str,
) -> Result<Vec<AttemptRecord>, sqlx::Error> {
    sqlx::query_as::<_, AttemptRecord>(&format!(
        "SELECT {ATTEMPT_COLUMNS} FROM test_attempts WHERE student_id = ? \
         ORDER BY completed_at DESC"
    ))
    .bind(student_id)
    .fetch_all(pool)
    .await
}

/// Attempt gateway backed directly by the portal database, for sessions
/// running in the same process as the store.
#[derive(Clone)]
pub struct PortalGateway {
    pool: SqlitePool,
}

impl PortalGateway {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttemptGateway for PortalGateway {
    async fn completion_for(
        &self,
        test_id: i64,
        student_id: &str,
    ) -> Result<Option<AttemptSummary>, GatewayError> {
        let record = completion_for(&self.pool, test_id, student_id).await?;
        Ok(record.as_ref().map(AttemptSummary::from))
    }

    async fn submit(&self, draft: &AttemptDraft) -> Result<i64, GatewayError> {
        Ok(upsert_attempt(&self.pool, draft).await?)
    }
}
