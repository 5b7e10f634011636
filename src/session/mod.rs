// src/session/mod.rs
//
// The client-resident proctored session: a four-state machine that owns the
// countdown, the answer sheet, and the violation ledger, and submits exactly
// one attempt record when it reaches a terminal state.

pub mod answers;
pub mod clock;
pub mod driver;
pub mod gateway;
pub mod ledger;
pub mod monitor;
pub mod score;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::models::attempt::{AttemptDraft, AttemptSummary};
use crate::models::question::QuestionKind;
use crate::models::test::Test;
use crate::session::answers::{AnswerSheet, AnswerValue};
use crate::session::clock::{ExamClock, Tick};
use crate::session::gateway::{AttemptGateway, GatewayError};
use crate::session::ledger::{TerminationReason, ViolationLedger};
use crate::session::monitor::{EnvSignal, EnvironmentMonitor};

/// Lifecycle of one examinee attempting one test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    NotStarted,
    Active,
    Terminated,
    Completed,
}

/// How a session reached a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Manual,
    TimeExpired,
    Terminated(TerminationReason),
}

impl FinishReason {
    fn label(&self) -> String {
        match self {
            FinishReason::Manual => "manual".to_string(),
            FinishReason::TimeExpired => "time expired".to_string(),
            FinishReason::Terminated(reason) => reason.to_string(),
        }
    }
}

/// The examinee on whose behalf the session runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    pub name: String,
}

/// Client environment details persisted alongside the attempt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Why a session could not be opened.
#[derive(Debug)]
pub enum StartError {
    /// A stored attempt already exists for this (test, student) pair.
    AlreadyAttempted(Box<AttemptSummary>),
    NoQuestions,
    InvalidDuration,
    Gateway(GatewayError),
}

impl fmt::Display for StartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartError::AlreadyAttempted(_) => {
                write!(f, "an attempt already exists for this test")
            }
            StartError::NoQuestions => write!(f, "test has no questions"),
            StartError::InvalidDuration => write!(f, "test duration must be positive"),
            StartError::Gateway(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for StartError {}

/// Rejected in-session operation.
#[derive(Debug, PartialEq, Eq)]
pub enum SessionError {
    NotActive,
    UnknownQuestion(i64),
    AnswerKindMismatch(i64),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::NotActive => write!(f, "session is not active"),
            SessionError::UnknownQuestion(id) => write!(f, "unknown question id {}", id),
            SessionError::AnswerKindMismatch(id) => {
                write!(f, "answer value does not fit question {}", id)
            }
        }
    }
}

impl std::error::Error for SessionError {}

/// Submission failure at a terminal transition. The session stays terminal
/// and keeps its data; calling the finishing operation again retries.
#[derive(Debug)]
pub struct SubmitError(pub GatewayError);

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to submit attempt: {}", self.0)
    }
}

impl std::error::Error for SubmitError {}

/// Orchestrates one proctored session. Exclusively owns all session state;
/// the monitor and clock only feed it events.
pub struct SessionController {
    test: Test,
    student: Student,
    meta: ClientMeta,
    gateway: Arc<dyn AttemptGateway>,

    state: SessionState,
    cursor: usize,
    answers: AnswerSheet,
    ledger: ViolationLedger,
    monitor: EnvironmentMonitor,
    clock: ExamClock,
    finish_reason: Option<FinishReason>,

    is_submitting: bool,
    attempt_id: Option<i64>,
}

impl SessionController {
    /// Runs the completion pre-check and builds a session in `NotStarted`.
    ///
    /// Refused outright when a stored attempt already exists for this
    /// (test, student) pair, or when the test cannot be taken at all.
    pub async fn open(
        test: Test,
        student: Student,
        meta: ClientMeta,
        gateway: Arc<dyn AttemptGateway>,
    ) -> Result<Self, StartError> {
        if test.questions.is_empty() {
            return Err(StartError::NoQuestions);
        }
        if test.duration_secs <= 0 {
            return Err(StartError::InvalidDuration);
        }

        let prior = gateway
            .completion_for(test.id, &student.id)
            .await
            .map_err(StartError::Gateway)?;
        if let Some(summary) = prior {
            return Err(StartError::AlreadyAttempted(Box::new(summary)));
        }

        let clock = ExamClock::new(test.duration_secs as u32);
        Ok(Self {
            test,
            student,
            meta,
            gateway,
            state: SessionState::NotStarted,
            cursor: 0,
            answers: AnswerSheet::new(),
            ledger: ViolationLedger::new(),
            monitor: EnvironmentMonitor::new(),
            clock,
            finish_reason: None,
            is_submitting: false,
            attempt_id: None,
        })
    }

    /// NotStarted -> Active, once the examinee has acknowledged the rules.
    /// The driver starts ticking the clock and forwarding host signals from
    /// this point on.
    pub fn start(&mut self) {
        if self.state == SessionState::NotStarted {
            self.state = SessionState::Active;
            tracing::info!(
                test_id = self.test.id,
                student_id = %self.student.id,
                "session started"
            );
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self.state,
            SessionState::Terminated | SessionState::Completed
        )
    }

    /// Set once the attempt has been persisted.
    pub fn attempt_id(&self) -> Option<i64> {
        self.attempt_id
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn remaining_secs(&self) -> u32 {
        self.clock.remaining_secs()
    }

    pub fn ledger(&self) -> &ViolationLedger {
        &self.ledger
    }

    pub fn answers(&self) -> &AnswerSheet {
        &self.answers
    }

    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.finish_reason
    }

    /// Records an answer for a question of this test. The value shape must
    /// match the question kind; last write wins.
    pub fn record_answer(
        &mut self,
        question_id: i64,
        value: AnswerValue,
    ) -> Result<(), SessionError> {
        if self.state != SessionState::Active {
            return Err(SessionError::NotActive);
        }
        let question = self
            .test
            .questions
            .iter()
            .find(|q| q.id == question_id)
            .ok_or(SessionError::UnknownQuestion(question_id))?;

        let fits = matches!(
            (question.kind, &value),
            (
                QuestionKind::SingleSelect | QuestionKind::Boolean,
                AnswerValue::Choice(_)
            ) | (QuestionKind::FreeText, AnswerValue::Text(_))
        );
        if !fits {
            return Err(SessionError::AnswerKindMismatch(question_id));
        }

        self.answers.set(question_id, value);
        Ok(())
    }

    pub fn next_question(&mut self) {
        if self.state == SessionState::Active {
            self.cursor = (self.cursor + 1).min(self.test.questions.len() - 1);
        }
    }

    pub fn previous_question(&mut self) {
        if self.state == SessionState::Active {
            self.cursor = self.cursor.saturating_sub(1);
        }
    }

    pub fn jump_to(&mut self, index: usize) {
        if self.state == SessionState::Active {
            self.cursor = index.min(self.test.questions.len() - 1);
        }
    }

    /// Feeds one host-environment signal through the monitor and the ledger.
    /// May terminate the session, in which case the attempt is submitted
    /// before this call returns.
    pub async fn observe(&mut self, signal: EnvSignal) -> Result<(), SubmitError> {
        if self.state != SessionState::Active {
            return Ok(());
        }

        let Some(violation) = self.monitor.classify(&signal, self.ledger.tab_switches()) else {
            return Ok(());
        };

        tracing::warn!(
            test_id = self.test.id,
            student_id = %self.student.id,
            violation = %violation.description,
            "integrity violation"
        );

        if let Some(reason) = self.ledger.record(violation.kind, violation.description) {
            return self.finish(FinishReason::Terminated(reason)).await;
        }
        Ok(())
    }

    /// Advances the countdown by one second. On expiry the session completes
    /// and submits, answered or not.
    pub async fn tick(&mut self) -> Result<(), SubmitError> {
        if self.state != SessionState::Active {
            return Ok(());
        }
        if self.clock.tick() == Tick::Expired {
            return self.finish(FinishReason::TimeExpired).await;
        }
        Ok(())
    }

    /// Explicit submission by the examinee.
    pub async fn submit(&mut self) -> Result<(), SubmitError> {
        match self.state {
            SessionState::Active => self.finish(FinishReason::Manual).await,
            // Retry path: terminal but not yet persisted.
            SessionState::Terminated | SessionState::Completed => self.push_attempt().await,
            SessionState::NotStarted => Ok(()),
        }
    }

    /// Performs the terminal transition, scores whatever was captured, and
    /// hands off to the persistence protocol.
    async fn finish(&mut self, reason: FinishReason) -> Result<(), SubmitError> {
        debug_assert_eq!(self.state, SessionState::Active);

        self.state = match reason {
            FinishReason::Terminated(_) => SessionState::Terminated,
            FinishReason::Manual | FinishReason::TimeExpired => SessionState::Completed,
        };
        self.finish_reason = Some(reason);

        tracing::info!(
            test_id = self.test.id,
            student_id = %self.student.id,
            reason = %reason.label(),
            state = ?self.state,
            "session finished"
        );

        self.push_attempt().await
    }

    /// Submits the assembled attempt. Guarded: a call while a submission is
    /// in flight, or after one succeeded, is a no-op. A gateway failure
    /// resets the guard so the identical record can be resent.
    async fn push_attempt(&mut self) -> Result<(), SubmitError> {
        if self.is_submitting || self.attempt_id.is_some() {
            return Ok(());
        }
        self.is_submitting = true;

        let draft = self.assemble_attempt();
        match self.gateway.submit(&draft).await {
            Ok(id) => {
                self.is_submitting = false;
                self.attempt_id = Some(id);
                tracing::info!(attempt_id = id, "attempt stored");
                Ok(())
            }
            Err(err) => {
                self.is_submitting = false;
                tracing::error!(error = %err, "attempt submission failed; retry allowed");
                Err(SubmitError(err))
            }
        }
    }

    fn assemble_attempt(&self) -> AttemptDraft {
        let terminated = self.state == SessionState::Terminated;
        let (choice_answers, text_answers) = self.answers.split();

        AttemptDraft {
            test_id: self.test.id,
            student_id: self.student.id.clone(),
            student_name: self.student.name.clone(),
            choice_answers,
            text_answers,
            score: i64::from(score::score(&self.test.questions, &self.answers)),
            total_questions: self.test.questions.len() as i64,
            time_spent_secs: i64::from(self.clock.elapsed_secs()),
            tab_switch_count: i64::from(self.ledger.tab_switches()),
            violation_count: i64::from(self.ledger.total_violations()),
            violations: self.ledger.entries().to_vec(),
            was_terminated: terminated,
            termination_reason: if terminated {
                self.finish_reason.map(|r| r.label())
            } else {
                None
            },
            is_completed: !terminated,
            ip_address: self.meta.ip_address.clone(),
            user_agent: self.meta.user_agent.clone(),
        }
    }
}
