//! Submitting and recording quiz results.

use std::sync::Arc;

use thiserror::Error;

use crate::model::{Quiz, QuizAnswer, QuizResult};
use crate::store::{ModuleStore, NewQuizResult, StoreError};

use super::evaluator::{Evaluation, EvaluationError, QuizEvaluator};

/// Question ids of `quiz` that have no entry in `answers`, in question
/// order.
pub fn missing_answers(quiz: &Quiz, answers: &[QuizAnswer]) -> Vec<String> {
    let mut questions: Vec<_> = quiz.questions.iter().collect();
    questions.sort_by_key(|q| q.order_index);
    questions
        .into_iter()
        .filter(|q| !answers.iter().any(|a| a.question_id == q.id))
        .map(|q| q.id.clone())
        .collect()
}

// ---------------------------------------------------------------------------
// ResultError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Error)]
pub enum ResultError {
    #[error("Quiz not found")]
    QuizNotFound(String),

    #[error("Section not found")]
    SectionNotFound(String),

    #[error("Missing answers for questions: {}", .0.join(", "))]
    MissingAnswers(Vec<String>),

    #[error("Score must be a number between 0 and 100")]
    InvalidScore(u8),

    #[error("answer for question {0} has not been evaluated")]
    Unevaluated(String),

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A graded and stored submission.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Submission {
    pub evaluation: Evaluation,
    pub result: QuizResult,
}

// ---------------------------------------------------------------------------
// QuizResults
// ---------------------------------------------------------------------------

pub struct QuizResults {
    store: Arc<dyn ModuleStore>,
    evaluator: QuizEvaluator,
}

impl QuizResults {
    pub fn new(store: Arc<dyn ModuleStore>, evaluator: QuizEvaluator) -> Self {
        Self { store, evaluator }
    }

    /// Store an already graded submission.
    pub async fn record(
        &self,
        user_id: &str,
        quiz_id: &str,
        score: u8,
        answers: Vec<QuizAnswer>,
    ) -> Result<QuizResult, ResultError> {
        if score > 100 {
            return Err(ResultError::InvalidScore(score));
        }
        if let Some(a) = answers.iter().find(|a| a.is_correct.is_none()) {
            return Err(ResultError::Unevaluated(a.question_id.clone()));
        }
        if self.store.get_quiz(quiz_id).await?.is_none() {
            return Err(ResultError::QuizNotFound(quiz_id.to_string()));
        }

        let result = self
            .store
            .insert_quiz_result(NewQuizResult {
                user_id: user_id.to_string(),
                quiz_id: quiz_id.to_string(),
                score,
                answers,
            })
            .await?;
        log::info!("quiz: recorded {} for {user_id} on {quiz_id}", result.score);
        Ok(result)
    }

    /// Evaluate `answers` and, only when grading succeeds, store the result.
    pub async fn evaluate_and_record(
        &self,
        user_id: &str,
        quiz_id: &str,
        answers: &[QuizAnswer],
    ) -> Result<Submission, ResultError> {
        let (quiz, evaluation) = self.evaluate(quiz_id, answers).await?;
        let result = self
            .record(user_id, &quiz.id, evaluation.score, evaluation.answers.clone())
            .await?;
        Ok(Submission { evaluation, result })
    }

    /// Evaluate without storing anything.
    pub async fn evaluate(
        &self,
        quiz_id: &str,
        answers: &[QuizAnswer],
    ) -> Result<(Quiz, Evaluation), ResultError> {
        let quiz = self
            .store
            .get_quiz(quiz_id)
            .await?
            .ok_or_else(|| ResultError::QuizNotFound(quiz_id.to_string()))?;

        let missing = missing_answers(&quiz, answers);
        if !missing.is_empty() {
            return Err(ResultError::MissingAnswers(missing));
        }

        let section = self
            .store
            .get_section(&quiz.section_id)
            .await?
            .ok_or_else(|| ResultError::SectionNotFound(quiz.section_id.clone()))?;

        let evaluation = self.evaluator.evaluate(&quiz, &section, answers).await?;
        Ok((quiz, evaluation))
    }

    /// Newest first.
    pub async fn history(
        &self,
        user_id: &str,
        quiz_id: Option<&str>,
    ) -> Result<Vec<QuizResult>, ResultError> {
        Ok(self.store.quiz_results(user_id, quiz_id).await?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::schema::sample_lesson_json;
    use crate::llm::{GeneratedLesson, LlmError, ScriptedLlm};
    use crate::model::{InputType, ModuleBundle};
    use crate::pipeline::ModulePersister;
    use crate::store::MemoryStore;

    async fn bundle(store: Arc<MemoryStore>) -> ModuleBundle {
        let lesson = GeneratedLesson::parse(&sample_lesson_json()).unwrap();
        ModulePersister::new(store)
            .persist("Photosynthesis", "English", &lesson)
            .await
            .unwrap()
    }

    fn answer(id: &str, response: &str, correct: Option<bool>) -> QuizAnswer {
        QuizAnswer {
            question_id: id.into(),
            user_response: response.into(),
            is_correct: correct,
        }
    }

    fn full_answers(quiz: &Quiz) -> Vec<QuizAnswer> {
        quiz.questions
            .iter()
            .map(|q| match q.input_type {
                InputType::MultipleChoice => {
                    answer(&q.id, q.correct_answer.as_deref().unwrap_or_default(), None)
                }
                _ => answer(&q.id, "Light turns into sugar.", None),
            })
            .collect()
    }

    fn grader_reply(quiz: &Quiz, score: f64) -> String {
        let evaluations: Vec<_> = quiz
            .questions
            .iter()
            .map(|q| serde_json::json!({ "question_id": q.id, "is_correct": true }))
            .collect();
        serde_json::json!({
            "question_evaluations": evaluations,
            "overall_score": score,
            "feedback": "Well reasoned."
        })
        .to_string()
    }

    #[test]
    fn missing_answers_lists_uncovered_questions_in_order() {
        let lesson = GeneratedLesson::parse(&sample_lesson_json()).unwrap();
        let quiz = Quiz {
            id: "q".into(),
            section_id: "s".into(),
            title: "t".into(),
            questions: lesson.sections[0]
                .quiz
                .questions
                .iter()
                .enumerate()
                .map(|(i, q)| crate::model::QuizQuestion {
                    id: format!("id{i}"),
                    question_text: q.question_text.clone(),
                    input_type: q.input_type,
                    options: q.options.clone(),
                    correct_answer: q.correct_answer.clone(),
                    order_index: q.order_index,
                })
                .collect(),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };

        let missing = missing_answers(&quiz, &[answer("id1", "Light", None)]);
        assert_eq!(missing, vec!["id0".to_string(), "id2".to_string()]);

        let err = ResultError::MissingAnswers(missing);
        assert_eq!(err.to_string(), "Missing answers for questions: id0, id2");
    }

    #[tokio::test]
    async fn evaluate_and_record_persists_graded_result() {
        let store = Arc::new(MemoryStore::new());
        let bundle = bundle(store.clone()).await;
        let quiz = &bundle.quizzes[0];

        let llm = Arc::new(ScriptedLlm::ok(grader_reply(quiz, 88.0)));
        let results = QuizResults::new(store.clone(), QuizEvaluator::new(llm));

        let submission = results
            .evaluate_and_record("user-1", &quiz.id, &full_answers(quiz))
            .await
            .unwrap();

        assert_eq!(submission.evaluation.score, 88);
        assert_eq!(submission.result.score, 88);
        assert!(submission.result.answers.iter().all(|a| a.is_correct.is_some()));

        let history = results.history("user-1", Some(&quiz.id)).await.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn failed_evaluation_records_nothing() {
        let store = Arc::new(MemoryStore::new());
        let bundle = bundle(store.clone()).await;
        let quiz = &bundle.quizzes[0];

        let llm = Arc::new(ScriptedLlm::err(LlmError::Timeout));
        let results = QuizResults::new(store.clone(), QuizEvaluator::new(llm));

        let err = results
            .evaluate_and_record("user-1", &quiz.id, &full_answers(quiz))
            .await
            .unwrap_err();
        assert!(matches!(err, ResultError::Evaluation(_)));
        assert!(results.history("user-1", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_answers_are_rejected_without_grading() {
        let store = Arc::new(MemoryStore::new());
        let bundle = bundle(store.clone()).await;
        let quiz = &bundle.quizzes[0];

        let llm = Arc::new(ScriptedLlm::new(vec![]));
        let results = QuizResults::new(store, QuizEvaluator::new(llm.clone()));

        let mut answers = full_answers(quiz);
        answers.pop();
        let err = results
            .evaluate_and_record("user-1", &quiz.id, &answers)
            .await
            .unwrap_err();
        assert!(matches!(err, ResultError::MissingAnswers(ref ids) if ids.len() == 1));
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn unknown_quiz_is_not_found() {
        let store = Arc::new(MemoryStore::new());
        let results = QuizResults::new(
            store,
            QuizEvaluator::new(Arc::new(ScriptedLlm::new(vec![]))),
        );
        let err = results.evaluate("nope", &[]).await.unwrap_err();
        assert!(matches!(err, ResultError::QuizNotFound(_)));
        assert_eq!(err.to_string(), "Quiz not found");
    }

    #[tokio::test]
    async fn record_validates_score_and_verdicts() {
        let store = Arc::new(MemoryStore::new());
        let bundle = bundle(store.clone()).await;
        let quiz_id = bundle.quizzes[0].id.clone();
        let results = QuizResults::new(
            store,
            QuizEvaluator::new(Arc::new(ScriptedLlm::new(vec![]))),
        );

        let err = results
            .record("u", &quiz_id, 101, vec![answer("a", "x", Some(true))])
            .await
            .unwrap_err();
        assert!(matches!(err, ResultError::InvalidScore(101)));

        let err = results
            .record("u", &quiz_id, 50, vec![answer("a", "x", None)])
            .await
            .unwrap_err();
        assert!(matches!(err, ResultError::Unevaluated(ref id) if id == "a"));

        let ok = results
            .record("u", &quiz_id, 50, vec![answer("a", "x", Some(false))])
            .await
            .unwrap();
        assert_eq!(ok.score, 50);
    }
}
