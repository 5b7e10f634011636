// src/handlers/attempt.rs

use axum::{Json, extract::Path, extract::State, response::IntoResponse};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::attempt::{AttemptDraft, AttemptSummary, CompletionCheck},
    store,
};

/// Accepts a finished or terminated session's attempt.
///
/// Idempotent: the write is an upsert keyed on (test_id, student_id), so a
/// client retrying after a transient failure overwrites its own record
/// instead of duplicating it.
pub async fn submit_attempt(
    State(pool): State<SqlitePool>,
    Json(draft): Json<AttemptDraft>,
) -> Result<impl IntoResponse, AppError> {
    draft
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    tracing::info!(
        test_id = draft.test_id,
        student_id = %draft.student_id,
        score = draft.score,
        was_terminated = draft.was_terminated,
        "saving test attempt"
    );

    let id = store::upsert_attempt(&pool, &draft).await.map_err(|e| {
        tracing::error!("Failed to upsert attempt: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(serde_json::json!({
        "id": id,
        "message": "Test attempt saved successfully"
    })))
}

/// Completion pre-check: whether an attempt is already stored for this
/// (test, student) pair. Entry to a new session is refused when it is.
pub async fn check_completion(
    State(pool): State<SqlitePool>,
    Path((test_id, student_id)): Path<(i64, String)>,
) -> Result<impl IntoResponse, AppError> {
    let record = store::completion_for(&pool, test_id, &student_id).await?;

    let check = match record.as_ref() {
        Some(record) => CompletionCheck {
            has_completed: true,
            attempt: Some(AttemptSummary::from(record)),
        },
        None => CompletionCheck {
            has_completed: false,
            attempt: None,
        },
    };

    Ok(Json(check))
}

/// All attempts for a test, ordered by score descending then completion time
/// ascending, for the owning instructor's result views.
pub async fn test_results(
    State(pool): State<SqlitePool>,
    Path(test_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let results = store::results_for_test(&pool, test_id).await?;
    Ok(Json(results))
}

/// A student's attempt history, most recent first.
pub async fn student_attempts(
    State(pool): State<SqlitePool>,
    Path(student_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let attempts = store::attempts_for_student(&pool, &student_id).await?;
    Ok(Json(attempts))
}
