//! Quiz, question and answer records.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of options a multiple-choice question must carry.
pub const MULTIPLE_CHOICE_OPTIONS: usize = 4;

// ---------------------------------------------------------------------------
// InputType
// ---------------------------------------------------------------------------

/// How the learner answers a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputType {
    Text,
    Voice,
    MultipleChoice,
}

impl InputType {
    /// `true` for `Text` and `Voice`: answers that need a grader.
    pub fn is_open_ended(&self) -> bool {
        !matches!(self, InputType::MultipleChoice)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InputType::Text => "text",
            InputType::Voice => "voice",
            InputType::MultipleChoice => "multiple_choice",
        }
    }
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// QuizQuestion
// ---------------------------------------------------------------------------

/// A single question.  Stored inline in the owning [`Quiz`] row.
///
/// `options` and `correct_answer` are present iff `input_type` is
/// `MultipleChoice`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: String,
    pub question_text: String,
    pub input_type: InputType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
    pub order_index: u32,
}

/// Check the multiple-choice shape invariant for one question.
///
/// Multiple-choice questions carry exactly [`MULTIPLE_CHOICE_OPTIONS`]
/// options and a correct answer that is one of them; open-ended questions
/// carry neither. Returns a description of the first violation found.
pub fn check_question_shape(
    order_index: u32,
    input_type: InputType,
    options: Option<&[String]>,
    correct_answer: Option<&str>,
) -> Result<(), String> {
    match input_type {
        InputType::MultipleChoice => {
            let options = options.unwrap_or_default();
            if options.len() != MULTIPLE_CHOICE_OPTIONS {
                return Err(format!(
                    "question {order_index} has {} options, expected {MULTIPLE_CHOICE_OPTIONS}",
                    options.len()
                ));
            }
            match correct_answer {
                Some(answer) if options.iter().any(|o| o == answer) => Ok(()),
                Some(_) => Err(format!(
                    "question {order_index} correct answer is not one of its options"
                )),
                None => Err(format!("question {order_index} has no correct answer")),
            }
        }
        InputType::Text | InputType::Voice => {
            if options.is_some() || correct_answer.is_some() {
                Err(format!(
                    "open-ended question {order_index} must not carry options or a correct answer"
                ))
            } else {
                Ok(())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Quiz
// ---------------------------------------------------------------------------

/// The assessment attached to exactly one section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub id: String,
    pub section_id: String,
    pub title: String,
    pub questions: Vec<QuizQuestion>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Quiz {
    pub fn question(&self, question_id: &str) -> Option<&QuizQuestion> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    /// `true` when every question can be graded locally.
    pub fn is_multiple_choice_only(&self) -> bool {
        self.questions
            .iter()
            .all(|q| q.input_type == InputType::MultipleChoice)
    }
}

// ---------------------------------------------------------------------------
// QuizAnswer / QuizResult
// ---------------------------------------------------------------------------

/// A learner's response to one question.
///
/// `is_correct` is `None` only before evaluation; delivered results always
/// carry `Some(_)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizAnswer {
    pub question_id: String,
    pub user_response: String,
    pub is_correct: Option<bool>,
}

/// A recorded, graded quiz submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizResult {
    pub id: String,
    pub user_id: String,
    pub quiz_id: String,
    /// 0–100.
    pub score: u8,
    pub answers: Vec<QuizAnswer>,
    pub completed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(
        input_type: InputType,
        options: Option<Vec<&str>>,
        correct: Option<&str>,
    ) -> Result<(), String> {
        let options: Option<Vec<String>> =
            options.map(|o| o.into_iter().map(String::from).collect());
        check_question_shape(1, input_type, options.as_deref(), correct)
    }

    #[test]
    fn well_formed_multiple_choice_passes() {
        let r = shape(InputType::MultipleChoice, Some(vec!["a", "b", "c", "d"]), Some("c"));
        assert!(r.is_ok());
    }

    #[test]
    fn multiple_choice_needs_four_options() {
        let r = shape(InputType::MultipleChoice, Some(vec!["a", "b", "c"]), Some("a"));
        assert!(r.unwrap_err().contains("3 options"));

        let r = shape(InputType::MultipleChoice, None, Some("a"));
        assert!(r.unwrap_err().contains("0 options"));
    }

    #[test]
    fn correct_answer_must_be_an_option() {
        let r = shape(InputType::MultipleChoice, Some(vec!["a", "b", "c", "d"]), Some("e"));
        assert!(r.unwrap_err().contains("not one of its options"));

        let r = shape(InputType::MultipleChoice, Some(vec!["a", "b", "c", "d"]), None);
        assert!(r.unwrap_err().contains("no correct answer"));
    }

    #[test]
    fn open_ended_must_not_carry_options() {
        assert!(shape(InputType::Voice, Some(vec!["a", "b", "c", "d"]), None).is_err());
        assert!(shape(InputType::Text, None, Some("a")).is_err());
        assert!(shape(InputType::Voice, None, None).is_ok());
    }

    #[test]
    fn input_type_uses_snake_case_on_the_wire() {
        let json = serde_json::to_string(&InputType::MultipleChoice).unwrap();
        assert_eq!(json, "\"multiple_choice\"");
        assert!(InputType::Voice.is_open_ended());
        assert!(!InputType::MultipleChoice.is_open_ended());
    }

    #[test]
    fn absent_options_are_omitted_when_serialised() {
        let q = QuizQuestion {
            id: "v".into(),
            question_text: "Explain".into(),
            input_type: InputType::Voice,
            options: None,
            correct_answer: None,
            order_index: 0,
        };
        let json = serde_json::to_value(&q).unwrap();
        assert!(json.get("options").is_none());
        assert!(json.get("correct_answer").is_none());
    }
}
