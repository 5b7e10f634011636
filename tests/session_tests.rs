// tests/session_tests.rs
//
// Drives the proctored session state machine against a mock attempt store:
// threshold termination, clock expiry, pre-check refusal, retry-safe
// submission.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use tokio::sync::mpsc;

use testportal::models::attempt::{AttemptDraft, AttemptSummary};
use testportal::models::question::{Question, QuestionKind};
use testportal::models::test::Test;
use testportal::session::answers::AnswerValue;
use testportal::session::driver::{SessionCommand, drive};
use testportal::session::gateway::{AttemptGateway, GatewayError};
use testportal::session::monitor::EnvSignal;
use testportal::session::{
    ClientMeta, FinishReason, SessionController, SessionState, StartError, Student,
};

/// In-memory attempt store. Optionally pre-seeded with an existing attempt
/// (pre-check refusal) and able to fail a number of submissions (retry path).
#[derive(Default)]
struct MockGateway {
    existing: Mutex<Option<AttemptSummary>>,
    stored: Mutex<Vec<AttemptDraft>>,
    failures_left: AtomicI64,
    next_id: AtomicI64,
}

impl MockGateway {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicI64::new(1),
            ..Self::default()
        })
    }

    fn with_existing(summary: AttemptSummary) -> Arc<Self> {
        let gateway = Self::new();
        *gateway.existing.lock().unwrap() = Some(summary);
        gateway
    }

    fn fail_next(&self, count: i64) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    fn stored(&self) -> Vec<AttemptDraft> {
        self.stored.lock().unwrap().clone()
    }
}

#[async_trait]
impl AttemptGateway for MockGateway {
    async fn completion_for(
        &self,
        _test_id: i64,
        _student_id: &str,
    ) -> Result<Option<AttemptSummary>, GatewayError> {
        Ok(self.existing.lock().unwrap().clone())
    }

    async fn submit(&self, draft: &AttemptDraft) -> Result<i64, GatewayError> {
        if self.failures_left.fetch_sub(1, Ordering::SeqCst) > 0 {
            return Err(GatewayError("connection reset".to_string()));
        }
        self.failures_left.store(0, Ordering::SeqCst);
        self.stored.lock().unwrap().push(draft.clone());
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }
}

fn choice_question(id: i64, position: i64, correct: i64) -> Question {
    Question {
        id,
        test_id: 1,
        position,
        prompt: format!("Question {}", id),
        kind: QuestionKind::SingleSelect,
        choices: Json(vec!["A".into(), "B".into(), "C".into(), "D".into()]),
        correct_choice: Some(correct),
        correct_text: None,
        time_limit_secs: None,
        subject: None,
        difficulty: None,
        created_at: None,
    }
}

fn three_question_test(duration_secs: i64) -> Test {
    Test {
        id: 1,
        title: "Unit Test Quiz".to_string(),
        subject: "Operating Systems".to_string(),
        duration_secs,
        randomize_questions: false,
        question_pool_size: None,
        is_active: true,
        created_by: "faculty-1".to_string(),
        created_at: None,
        questions: vec![
            choice_question(10, 0, 0),
            choice_question(11, 1, 1),
            choice_question(12, 2, 2),
        ],
    }
}

fn student() -> Student {
    Student {
        id: "student-1".to_string(),
        name: "Test Student".to_string(),
    }
}

async fn open_active(gateway: Arc<MockGateway>) -> SessionController {
    let mut controller = SessionController::open(
        three_question_test(600),
        student(),
        ClientMeta::default(),
        gateway,
    )
    .await
    .expect("session should open");
    controller.start();
    controller
}

#[tokio::test]
async fn precheck_refuses_second_attempt() {
    let gateway = MockGateway::with_existing(AttemptSummary {
        id: 7,
        score: 2,
        total_questions: 3,
        completed_at: Utc::now(),
        was_terminated: false,
        violations: vec![],
    });

    let result = SessionController::open(
        three_question_test(600),
        student(),
        ClientMeta::default(),
        gateway,
    )
    .await;

    match result {
        Err(StartError::AlreadyAttempted(summary)) => {
            assert_eq!(summary.score, 2);
        }
        other => panic!("expected AlreadyAttempted, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn open_refuses_empty_test() {
    let mut test = three_question_test(600);
    test.questions.clear();

    let result =
        SessionController::open(test, student(), ClientMeta::default(), MockGateway::new()).await;
    assert!(matches!(result, Err(StartError::NoQuestions)));
}

#[tokio::test]
async fn manual_submit_scores_and_completes() {
    let gateway = MockGateway::new();
    let mut controller = open_active(gateway.clone()).await;

    // Correct, correct, wrong.
    controller.record_answer(10, AnswerValue::Choice(0)).unwrap();
    controller.record_answer(11, AnswerValue::Choice(1)).unwrap();
    controller.record_answer(12, AnswerValue::Choice(1)).unwrap();

    controller.submit().await.unwrap();

    assert_eq!(controller.state(), SessionState::Completed);
    assert_eq!(controller.finish_reason(), Some(FinishReason::Manual));
    assert_eq!(controller.attempt_id(), Some(1));

    let stored = gateway.stored();
    assert_eq!(stored.len(), 1);
    let attempt = &stored[0];
    assert_eq!(attempt.score, 2);
    assert_eq!(attempt.total_questions, 3);
    assert!(!attempt.was_terminated);
    assert!(attempt.is_completed);
    assert_eq!(attempt.termination_reason, None);
    assert_eq!(attempt.violation_count, 0);
}

#[tokio::test]
async fn three_tab_switches_terminate() {
    let gateway = MockGateway::new();
    let mut controller = open_active(gateway.clone()).await;

    controller.record_answer(10, AnswerValue::Choice(0)).unwrap();

    controller.observe(EnvSignal::VisibilityLost).await.unwrap();
    controller.observe(EnvSignal::FocusLost).await.unwrap();
    assert_eq!(controller.state(), SessionState::Active);

    controller.observe(EnvSignal::VisibilityLost).await.unwrap();
    assert_eq!(controller.state(), SessionState::Terminated);
    // The captured answer survives the termination.
    assert_eq!(controller.answers().len(), 1);

    let stored = gateway.stored();
    assert_eq!(stored.len(), 1);
    let attempt = &stored[0];
    assert!(attempt.was_terminated);
    assert!(!attempt.is_completed);
    assert_eq!(
        attempt.termination_reason.as_deref(),
        Some("excessive tab switching")
    );
    assert_eq!(attempt.tab_switch_count, 3);
    assert!(attempt.violation_count >= 3);
    // Partial credit: the one captured answer still scores.
    assert_eq!(attempt.score, 1);
}

#[tokio::test]
async fn five_violations_terminate() {
    let gateway = MockGateway::new();
    let mut controller = open_active(gateway.clone()).await;

    for _ in 0..4 {
        controller.observe(EnvSignal::CopyBlocked).await.unwrap();
        assert_eq!(controller.state(), SessionState::Active);
    }
    controller.observe(EnvSignal::ContextMenuBlocked).await.unwrap();

    assert_eq!(controller.state(), SessionState::Terminated);
    let stored = gateway.stored();
    assert_eq!(
        stored[0].termination_reason.as_deref(),
        Some("excessive violations")
    );
    assert_eq!(stored[0].violation_count, 5);
    assert_eq!(stored[0].tab_switch_count, 0);
}

#[tokio::test]
async fn pointer_leaves_tolerated_up_to_limit() {
    let gateway = MockGateway::new();
    let mut controller = open_active(gateway.clone()).await;

    for _ in 0..5 {
        controller.observe(EnvSignal::PointerLeft).await.unwrap();
    }
    assert_eq!(controller.ledger().total_violations(), 0);

    controller.observe(EnvSignal::PointerLeft).await.unwrap();
    assert_eq!(controller.ledger().total_violations(), 1);
    assert_eq!(controller.state(), SessionState::Active);
}

#[tokio::test]
async fn terminal_state_ignores_further_events() {
    let gateway = MockGateway::new();
    let mut controller = open_active(gateway.clone()).await;

    for _ in 0..3 {
        controller.observe(EnvSignal::VisibilityLost).await.unwrap();
    }
    assert_eq!(controller.state(), SessionState::Terminated);

    // Nothing below may re-submit or mutate the terminated session.
    controller.observe(EnvSignal::VisibilityLost).await.unwrap();
    controller.tick().await.unwrap();
    controller.submit().await.unwrap();
    let cursor = controller.cursor();
    controller.next_question();
    assert_eq!(controller.cursor(), cursor);

    assert_eq!(gateway.stored().len(), 1);
    assert_eq!(controller.ledger().tab_switches(), 3);
}

#[tokio::test]
async fn failed_submission_can_be_retried() {
    let gateway = MockGateway::new();
    gateway.fail_next(1);
    let mut controller = open_active(gateway.clone()).await;

    controller.record_answer(10, AnswerValue::Choice(0)).unwrap();

    // First submission hits the transient failure; the session stays
    // terminal with all data intact.
    assert!(controller.submit().await.is_err());
    assert_eq!(controller.state(), SessionState::Completed);
    assert_eq!(controller.attempt_id(), None);
    assert!(gateway.stored().is_empty());

    // Retry resubmits the identical record.
    controller.submit().await.unwrap();
    assert_eq!(controller.attempt_id(), Some(1));
    let stored = gateway.stored();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].score, 1);

    // A further submit after success is a no-op.
    controller.submit().await.unwrap();
    assert_eq!(gateway.stored().len(), 1);
}

#[tokio::test]
async fn navigation_stays_in_bounds() {
    let gateway = MockGateway::new();
    let mut controller = open_active(gateway).await;

    assert_eq!(controller.cursor(), 0);
    controller.previous_question();
    assert_eq!(controller.cursor(), 0);

    controller.next_question();
    controller.next_question();
    controller.next_question();
    assert_eq!(controller.cursor(), 2);

    controller.jump_to(99);
    assert_eq!(controller.cursor(), 2);
    controller.jump_to(1);
    assert_eq!(controller.cursor(), 1);
}

#[tokio::test]
async fn answers_validated_against_question_kind() {
    let gateway = MockGateway::new();
    let mut controller = open_active(gateway).await;

    assert!(controller.record_answer(999, AnswerValue::Choice(0)).is_err());
    assert!(
        controller
            .record_answer(10, AnswerValue::Text("A".to_string()))
            .is_err()
    );
    assert!(controller.record_answer(10, AnswerValue::Choice(0)).is_ok());
}

#[tokio::test(start_paused = true)]
async fn clock_expiry_completes_unanswered_session() {
    let gateway = MockGateway::new();
    let controller = SessionController::open(
        three_question_test(3),
        student(),
        ClientMeta::default(),
        gateway.clone(),
    )
    .await
    .unwrap();

    let (commands, receiver) = mpsc::channel::<SessionCommand>(8);
    let handle = tokio::spawn(drive(controller, receiver));

    // Paused time: the driver's ticker fires in virtual time until the
    // countdown expires and the session auto-submits.
    let controller = handle.await.unwrap();
    drop(commands);

    assert_eq!(controller.state(), SessionState::Completed);
    assert_eq!(controller.finish_reason(), Some(FinishReason::TimeExpired));
    assert_eq!(controller.remaining_secs(), 0);

    let stored = gateway.stored();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].score, 0);
    assert!(stored[0].is_completed);
    assert!(!stored[0].was_terminated);
    assert_eq!(stored[0].time_spent_secs, 3);
}

#[tokio::test(start_paused = true)]
async fn driver_routes_commands_to_the_session() {
    let gateway = MockGateway::new();
    let controller = SessionController::open(
        three_question_test(600),
        student(),
        ClientMeta::default(),
        gateway.clone(),
    )
    .await
    .unwrap();

    let (commands, receiver) = mpsc::channel::<SessionCommand>(8);
    let handle = tokio::spawn(drive(controller, receiver));

    commands
        .send(SessionCommand::Answer {
            question_id: 10,
            value: AnswerValue::Choice(0),
        })
        .await
        .unwrap();
    commands.send(SessionCommand::NextQuestion).await.unwrap();
    commands
        .send(SessionCommand::Signal(EnvSignal::CopyBlocked))
        .await
        .unwrap();
    commands.send(SessionCommand::Submit).await.unwrap();

    let controller = handle.await.unwrap();
    assert_eq!(controller.state(), SessionState::Completed);

    let stored = gateway.stored();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].score, 1);
    assert_eq!(stored[0].violation_count, 1);
}

#[tokio::test(start_paused = true)]
async fn teardown_abandons_session_without_submission() {
    let gateway = MockGateway::new();
    let controller = SessionController::open(
        three_question_test(600),
        student(),
        ClientMeta::default(),
        gateway.clone(),
    )
    .await
    .unwrap();

    let (commands, receiver) = mpsc::channel::<SessionCommand>(8);
    let handle = tokio::spawn(drive(controller, receiver));

    // Dropping the sender is the view teardown: the driver exits without a
    // terminal transition and nothing is persisted.
    drop(commands);
    let controller = handle.await.unwrap();

    assert_eq!(controller.state(), SessionState::Active);
    assert!(gateway.stored().is_empty());
}
