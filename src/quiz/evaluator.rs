//! Quiz evaluation.
//!
//! Multiple-choice-only quizzes are scored locally. Anything with a voice
//! or text question goes to the LLM grader in a single call, and the
//! model's per-question verdicts and overall score are taken as given.
//! There is no partial result: evaluation either succeeds or fails.

use std::sync::Arc;

use thiserror::Error;

use crate::llm::prompt::{evaluation_messages, QuestionForGrading};
use crate::llm::{quiz_evaluation_schema, LlmClient, LlmError, QuizEvaluationReply, StructuredRequest};
use crate::model::{Quiz, QuizAnswer, Section};

pub const PASSING_SCORE: u8 = 70;
pub const PASS_FEEDBACK: &str = "Great job! You demonstrated solid understanding of the material.";
pub const RETRY_FEEDBACK: &str =
    "Keep practicing! Review the section content to strengthen your understanding.";

// ---------------------------------------------------------------------------
// EvaluationError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Error)]
pub enum EvaluationError {
    #[error("quiz {0} has no questions")]
    EmptyQuiz(String),

    #[error("no answer for question {0}")]
    MissingAnswer(String),

    #[error("LLM request failed: {0}")]
    Llm(#[from] LlmError),

    #[error("could not read grader reply: {0}")]
    Parse(String),
}

impl EvaluationError {
    /// Short message shown to the caller.
    pub fn message(&self) -> &'static str {
        "Evaluation failed"
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// A graded submission. Every answer carries `Some(is_correct)`.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Evaluation {
    pub score: u8,
    pub feedback: String,
    pub answers: Vec<QuizAnswer>,
}

pub struct QuizEvaluator {
    llm: Arc<dyn LlmClient>,
}

impl QuizEvaluator {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Grade `answers` for `quiz`, using `section` as grading context.
    ///
    /// Answers are returned in question order; answers to questions that
    /// are not in the quiz are ignored.
    pub async fn evaluate(
        &self,
        quiz: &Quiz,
        section: &Section,
        answers: &[QuizAnswer],
    ) -> Result<Evaluation, EvaluationError> {
        if quiz.questions.is_empty() {
            return Err(EvaluationError::EmptyQuiz(quiz.id.clone()));
        }

        let mut questions = quiz.questions.iter().collect::<Vec<_>>();
        questions.sort_by_key(|q| q.order_index);

        let graded = questions
            .iter()
            .map(|q| {
                let answer = answers
                    .iter()
                    .find(|a| a.question_id == q.id)
                    .ok_or_else(|| EvaluationError::MissingAnswer(q.id.clone()))?;
                Ok(QuestionForGrading {
                    id: &q.id,
                    question_text: &q.question_text,
                    input_type: q.input_type,
                    correct_answer: q.correct_answer.as_deref(),
                    user_response: &answer.user_response,
                })
            })
            .collect::<Result<Vec<_>, EvaluationError>>()?;

        if quiz.is_multiple_choice_only() {
            log::debug!("quiz: scoring {} locally", quiz.id);
            return Ok(score_locally(&graded));
        }

        log::debug!("quiz: sending {} to the grader", quiz.id);
        self.grade_with_llm(section, &graded).await
    }

    async fn grade_with_llm(
        &self,
        section: &Section,
        graded: &[QuestionForGrading<'_>],
    ) -> Result<Evaluation, EvaluationError> {
        let (system, user) = evaluation_messages(&section.title, &section.content, graded);
        let request = StructuredRequest {
            system,
            user,
            schema: quiz_evaluation_schema(),
        };

        let raw = self.llm.complete(&request).await.map_err(|e| {
            log::warn!("quiz: grader call failed: {e}");
            e
        })?;
        let reply: QuizEvaluationReply =
            serde_json::from_str(&raw).map_err(|e| EvaluationError::Parse(e.to_string()))?;

        if !reply.overall_score.is_finite() {
            return Err(EvaluationError::Parse(format!(
                "overall_score is not a number: {}",
                reply.overall_score
            )));
        }

        let answers = graded
            .iter()
            .map(|q| {
                let verdict = reply
                    .question_evaluations
                    .iter()
                    .find(|e| e.question_id == q.id)
                    .ok_or_else(|| {
                        EvaluationError::Parse(format!("no evaluation for question {}", q.id))
                    })?;
                Ok(QuizAnswer {
                    question_id: q.id.to_string(),
                    user_response: q.user_response.to_string(),
                    is_correct: Some(verdict.is_correct),
                })
            })
            .collect::<Result<Vec<_>, EvaluationError>>()?;

        Ok(Evaluation {
            score: reply.overall_score.round().clamp(0.0, 100.0) as u8,
            feedback: reply.feedback,
            answers,
        })
    }
}

/// Exact-match scoring with one of two fixed feedback lines.
fn score_locally(graded: &[QuestionForGrading<'_>]) -> Evaluation {
    let answers: Vec<QuizAnswer> = graded
        .iter()
        .map(|q| QuizAnswer {
            question_id: q.id.to_string(),
            user_response: q.user_response.to_string(),
            is_correct: Some(q.precomputed().unwrap_or(false)),
        })
        .collect();

    let correct = answers.iter().filter(|a| a.is_correct == Some(true)).count();
    let score = (100.0 * correct as f64 / answers.len() as f64).round() as u8;
    let feedback = if score >= PASSING_SCORE {
        PASS_FEEDBACK
    } else {
        RETRY_FEEDBACK
    };

    Evaluation {
        score,
        feedback: feedback.to_string(),
        answers,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
