//! Structured-output LLM access for module generation and quiz grading.
//!
//! This module provides:
//! * [`LlmClient`]: async trait: one system + one user message in, one JSON
//!   document (as a string) out, constrained by a [`ResponseSchema`].
//! * [`OpenAiClient`]: OpenAI-compatible `/v1/chat/completions` backend.
//! * [`ResponseSchema`] plus the two fixed schemas
//!   ([`module_generation_schema`], [`quiz_evaluation_schema`]).
//! * [`GeneratedLesson`] and friends: the typed shape of a generation reply.
//! * Prompt text and builders in [`prompt`].
//! * [`LlmError`]: error variants for LLM operations.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use tutor_talk::config::LlmConfig;
//! use tutor_talk::llm::{module_generation_schema, LlmClient, OpenAiClient, StructuredRequest};
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = OpenAiClient::from_config(&LlmConfig::default());
//!     let request = StructuredRequest {
//!         system: "You write lessons.".into(),
//!         user: "Create a learning module titled: \"Tides\"".into(),
//!         schema: module_generation_schema(),
//!     };
//!     let json = client.complete(&request).await.unwrap();
//!     println!("{json}");
//! }
//! ```

pub mod client;
pub mod prompt;
pub mod schema;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use client::{LlmClient, LlmError, OpenAiClient, StructuredRequest};
pub use schema::{
    module_generation_schema, quiz_evaluation_schema, GeneratedLesson, GeneratedQuestion,
    GeneratedQuiz, GeneratedSection, QuestionEvaluation, QuizEvaluationReply, ResponseSchema,
};

#[cfg(test)]
pub use client::ScriptedLlm;
