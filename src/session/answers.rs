// src/session/answers.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::question::{Question, QuestionKind};

/// One recorded answer. The variant is dictated by the question's kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind", content = "value")]
pub enum AnswerValue {
    Choice(u32),
    Text(String),
}

/// In-progress responses, keyed by question id. Last write wins.
#[derive(Debug, Default, Clone)]
pub struct AnswerSheet {
    answers: HashMap<i64, AnswerValue>,
}

impl AnswerSheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, question_id: i64, value: AnswerValue) {
        self.answers.insert(question_id, value);
    }

    pub fn get(&self, question_id: i64) -> Option<&AnswerValue> {
        self.answers.get(&question_id)
    }

    /// Whether the question counts as answered. A choice index is an answer
    /// even when it is 0; free text must be non-empty after trimming.
    pub fn is_answered(&self, question: &Question) -> bool {
        match (question.kind, self.answers.get(&question.id)) {
            (QuestionKind::FreeText, Some(AnswerValue::Text(text))) => !text.trim().is_empty(),
            (QuestionKind::SingleSelect | QuestionKind::Boolean, Some(AnswerValue::Choice(_))) => {
                true
            }
            _ => false,
        }
    }

    /// Splits the sheet into the two persisted maps.
    pub fn split(&self) -> (HashMap<i64, u32>, HashMap<i64, String>) {
        let mut choices = HashMap::new();
        let mut texts = HashMap::new();
        for (&id, value) in &self.answers {
            match value {
                AnswerValue::Choice(index) => {
                    choices.insert(id, *index);
                }
                AnswerValue::Text(text) => {
                    texts.insert(id, text.clone());
                }
            }
        }
        (choices, texts)
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }
}
