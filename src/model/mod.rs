//! Domain records shared by the pipelines and the store.
//!
//! * [`Module`] / [`Section`]: a generated lesson and its ordered pages.
//! * [`Quiz`] / [`QuizQuestion`]: one 3-question quiz per section; questions
//!   are value objects stored inline with the quiz.
//! * [`QuizResult`] / [`QuizAnswer`]: a graded submission.
//! * [`UserModuleProgress`]: per-user position inside a module.
//!
//! Identifiers are UUID v4 strings; timestamps are UTC.

pub mod lesson;
pub mod progress;
pub mod quiz;

pub use lesson::{Difficulty, Module, ModuleBundle, Section};
pub use progress::{ProgressStatus, UserModuleProgress};
pub use quiz::{InputType, Quiz, QuizAnswer, QuizQuestion, QuizResult};

/// Fresh random identifier for any persisted record.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
