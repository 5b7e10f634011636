// src/session/driver.rs

use tokio::sync::mpsc;
use tokio::time::{Duration, interval};

use crate::session::SessionController;
use crate::session::answers::AnswerValue;
use crate::session::monitor::EnvSignal;

/// Inputs the hosting shell feeds into a running session.
#[derive(Debug)]
pub enum SessionCommand {
    Answer { question_id: i64, value: AnswerValue },
    NextQuestion,
    PreviousQuestion,
    JumpTo(usize),
    Signal(EnvSignal),
    Submit,
}

/// Runs an opened session to its terminal state.
///
/// All mutation is serialized through this one loop: a 1 s ticker drives the
/// countdown, the command channel carries answers, navigation, host signals
/// and the manual submit. The loop exits once the attempt is stored or the
/// command channel closes (view teardown); either way the ticker is dropped
/// here, so nothing outlives the session.
///
/// Submission failures are logged and leave the session in place so a later
/// `Submit` command retries with the identical record.
pub async fn drive(
    mut controller: SessionController,
    mut commands: mpsc::Receiver<SessionCommand>,
) -> SessionController {
    controller.start();

    let mut ticker = interval(Duration::from_secs(1));
    // The first interval tick completes immediately; consume it so the
    // countdown starts a full second after activation.
    ticker.tick().await;

    loop {
        if controller.is_finished() && controller.attempt_id().is_some() {
            break;
        }

        tokio::select! {
            _ = ticker.tick() => {
                if let Err(err) = controller.tick().await {
                    tracing::warn!(error = %err, "clock-driven submission failed");
                }
            }
            command = commands.recv() => {
                let Some(command) = command else {
                    // Host tore the view down; the session is abandoned.
                    tracing::info!("session command channel closed");
                    break;
                };
                if let Err(err) = apply(&mut controller, command).await {
                    tracing::warn!(error = %err, "session submission failed");
                }
            }
        }
    }

    controller
}

async fn apply(
    controller: &mut SessionController,
    command: SessionCommand,
) -> Result<(), crate::session::SubmitError> {
    match command {
        SessionCommand::Answer { question_id, value } => {
            if let Err(err) = controller.record_answer(question_id, value) {
                tracing::debug!(error = %err, "answer rejected");
            }
            Ok(())
        }
        SessionCommand::NextQuestion => {
            controller.next_question();
            Ok(())
        }
        SessionCommand::PreviousQuestion => {
            controller.previous_question();
            Ok(())
        }
        SessionCommand::JumpTo(index) => {
            controller.jump_to(index);
            Ok(())
        }
        SessionCommand::Signal(signal) => controller.observe(signal).await,
        SessionCommand::Submit => controller.submit().await,
    }
}
