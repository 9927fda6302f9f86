//! Quiz grading and result recording.
//!
//! # Architecture
//!
//! ```text
//! answers ──► QuizResults::evaluate_and_record
//!               │  quiz lookup       → "Quiz not found"
//!               │  missing_answers   → "Missing answers for questions: …"
//!               ▼
//!             QuizEvaluator::evaluate
//!               ├─ multiple choice only → exact match, local score
//!               └─ otherwise            → one LLM call, verdicts taken as given
//!               ▼
//!             ModuleStore::insert_quiz_result (only on success)
//! ```

pub mod evaluator;
pub mod results;

pub use evaluator::{
    Evaluation, EvaluationError, QuizEvaluator, PASSING_SCORE, PASS_FEEDBACK, RETRY_FEEDBACK,
};
pub use results::{missing_answers, QuizResults, ResultError, Submission};
