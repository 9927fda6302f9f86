//! Content generation: one structured-output LLM call per module.

use std::sync::Arc;

use crate::llm::prompt::{generation_messages, DEFAULT_LANGUAGE};
use crate::llm::{module_generation_schema, GeneratedLesson, LlmClient, StructuredRequest};

use super::error::GenerationError;

pub struct ContentGenerator {
    llm: Arc<dyn LlmClient>,
}

impl ContentGenerator {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Ask the model for a five-section lesson titled `title`, written in
    /// `language` (blank means English).
    ///
    /// The call is made once; retrying is up to the caller.
    pub async fn generate(
        &self,
        title: &str,
        language: &str,
    ) -> Result<GeneratedLesson, GenerationError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(GenerationError::EmptyTitle);
        }
        let language = match language.trim() {
            "" => DEFAULT_LANGUAGE,
            l => l,
        };

        let (system, user) = generation_messages(title, language);
        let request = StructuredRequest {
            system,
            user,
            schema: module_generation_schema(),
        };

        log::debug!("pipeline: requesting lesson {title:?} in {language}");
        let raw = self.llm.complete(&request).await?;
        let lesson = GeneratedLesson::parse(&raw).map_err(GenerationError::InvalidLesson)?;

        log::debug!(
            "pipeline: lesson {title:?} parsed (topic={}, difficulty={})",
            lesson.topic,
            lesson.difficulty
        );
        Ok(lesson)
    }
}
