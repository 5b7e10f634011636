// src/session/gateway.rs

use std::fmt;

use async_trait::async_trait;

use crate::models::attempt::{AttemptDraft, AttemptSummary};

/// Failure talking to the attempt store. Transient by assumption: the caller
/// keeps the session data and may retry with the identical payload.
#[derive(Debug)]
pub struct GatewayError(pub String);

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "attempt gateway error: {}", self.0)
    }
}

impl std::error::Error for GatewayError {}

impl From<sqlx::Error> for GatewayError {
    fn from(err: sqlx::Error) -> Self {
        GatewayError(err.to_string())
    }
}

/// The persistence contract the session depends on.
///
/// `submit` must be an upsert keyed on (test id, student id): calling it
/// twice with equivalent payloads leaves exactly one stored attempt, the
/// second call's data winning.
#[async_trait]
pub trait AttemptGateway: Send + Sync {
    /// Returns the stored attempt for this (test, student) pair, if any.
    async fn completion_for(
        &self,
        test_id: i64,
        student_id: &str,
    ) -> Result<Option<AttemptSummary>, GatewayError>;

    /// Persists the attempt, overwriting any prior one for the same pair.
    /// Returns the stored attempt's id.
    async fn submit(&self, draft: &AttemptDraft) -> Result<i64, GatewayError>;
}
