// src/session/score.rs

use crate::models::question::{Question, QuestionKind};
use crate::session::answers::{AnswerSheet, AnswerValue};

/// Counts correctly answered questions. Pure: same inputs, same score.
///
/// Choice kinds match on index equality; free text matches case-folded and
/// whitespace-trimmed. Unanswered questions never match. One point per
/// question, no partial credit.
pub fn score(questions: &[Question], answers: &AnswerSheet) -> u32 {
    questions
        .iter()
        .filter(|question| is_correct(question, answers.get(question.id)))
        .count() as u32
}

fn is_correct(question: &Question, answer: Option<&AnswerValue>) -> bool {
    match (question.kind, answer) {
        (
            QuestionKind::SingleSelect | QuestionKind::Boolean,
            Some(AnswerValue::Choice(index)),
        ) => question.correct_choice == Some(i64::from(*index)),
        (QuestionKind::FreeText, Some(AnswerValue::Text(text))) => {
            match &question.correct_text {
                Some(expected) => {
                    text.trim().to_lowercase() == expected.trim().to_lowercase()
                }
                None => false,
            }
        }
        _ => false,
    }
}
