//! Failure-injecting [`ModuleStore`] wrapper for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use super::{
    ModuleFilter, ModuleStore, NewModule, NewProgress, NewQuiz, NewQuizResult, NewSection,
    ProgressUpdate, StoreError,
};
use crate::model::{Module, Quiz, QuizResult, Section, UserModuleProgress};

/// Wraps any [`ModuleStore`] and fails chosen writes, for exercising the
/// compensation and best-effort paths of the pipeline.
///
/// Insert counters are 1-based: `fail_section_insert(3)` fails the third
/// section insert and lets the others through.
pub struct FlakyStore {
    inner: Arc<dyn ModuleStore>,
    fail_module: bool,
    fail_section_at: Option<usize>,
    fail_quiz_at: Option<usize>,
    fail_audio_update: bool,
    fail_section_reads: bool,
    section_inserts: AtomicUsize,
    quiz_inserts: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: Arc<dyn ModuleStore>) -> Self {
        Self {
            inner,
            fail_module: false,
            fail_section_at: None,
            fail_quiz_at: None,
            fail_audio_update: false,
            fail_section_reads: false,
            section_inserts: Default::default(),
            quiz_inserts: Default::default(),
        }
    }

    pub fn fail_module_insert(mut self) -> Self {
        self.fail_module = true;
        self
    }

    pub fn fail_section_insert(mut self, nth: usize) -> Self {
        self.fail_section_at = Some(nth);
        self
    }

    pub fn fail_quiz_insert(mut self, nth: usize) -> Self {
        self.fail_quiz_at = Some(nth);
        self
    }

    pub fn fail_audio_updates(mut self) -> Self {
        self.fail_audio_update = true;
        self
    }

    pub fn fail_section_reads(mut self) -> Self {
        self.fail_section_reads = true;
        self
    }

    fn injected(what: &str) -> StoreError {
        StoreError::Backend(format!("injected {what} failure"))
    }
}

#[async_trait]
impl ModuleStore for FlakyStore {
    async fn insert_module(&self, new: NewModule) -> Result<Module, StoreError> {
        if self.fail_module {
            return Err(Self::injected("module insert"));
        }
        self.inner.insert_module(new).await
    }

    async fn get_module(&self, id: &str) -> Result<Option<Module>, StoreError> {
        self.inner.get_module(id).await
    }

    async fn list_modules(&self, filter: &ModuleFilter) -> Result<Vec<Module>, StoreError> {
        self.inner.list_modules(filter).await
    }

    async fn set_module_published(
        &self,
        id: &str,
        published: bool,
    ) -> Result<Module, StoreError> {
        self.inner.set_module_published(id, published).await
    }

    async fn delete_module(&self, id: &str) -> Result<bool, StoreError> {
        self.inner.delete_module(id).await
    }

    async fn insert_section(&self, new: NewSection) -> Result<Section, StoreError> {
        let n = self.section_inserts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_section_at == Some(n) {
            return Err(Self::injected("section insert"));
        }
        self.inner.insert_section(new).await
    }

    async fn get_section(&self, id: &str) -> Result<Option<Section>, StoreError> {
        self.inner.get_section(id).await
    }

    async fn sections_for_module(&self, module_id: &str) -> Result<Vec<Section>, StoreError> {
        if self.fail_section_reads {
            return Err(Self::injected("section read"));
        }
        self.inner.sections_for_module(module_id).await
    }

    async fn set_section_audio_url(&self, section_id: &str, url: &str) -> Result<(), StoreError> {
        if self.fail_audio_update {
            return Err(Self::injected("audio url update"));
        }
        self.inner.set_section_audio_url(section_id, url).await
    }

    async fn insert_quiz(&self, new: NewQuiz) -> Result<Quiz, StoreError> {
        let n = self.quiz_inserts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_quiz_at == Some(n) {
            return Err(Self::injected("quiz insert"));
        }
        self.inner.insert_quiz(new).await
    }

    async fn get_quiz(&self, id: &str) -> Result<Option<Quiz>, StoreError> {
        self.inner.get_quiz(id).await
    }

    async fn quizzes_for_module(&self, module_id: &str) -> Result<Vec<Quiz>, StoreError> {
        self.inner.quizzes_for_module(module_id).await
    }

    async fn insert_progress(&self, new: NewProgress) -> Result<UserModuleProgress, StoreError> {
        self.inner.insert_progress(new).await
    }

    async fn get_progress(&self, id: &str) -> Result<Option<UserModuleProgress>, StoreError> {
        self.inner.get_progress(id).await
    }

    async fn find_progress(
        &self,
        user_id: &str,
        module_id: &str,
    ) -> Result<Option<UserModuleProgress>, StoreError> {
        self.inner.find_progress(user_id, module_id).await
    }

    async fn update_progress(
        &self,
        id: &str,
        update: &ProgressUpdate,
    ) -> Result<UserModuleProgress, StoreError> {
        self.inner.update_progress(id, update).await
    }

    async fn insert_quiz_result(&self, new: NewQuizResult) -> Result<QuizResult, StoreError> {
        self.inner.insert_quiz_result(new).await
    }

    async fn quiz_results(
        &self,
        user_id: &str,
        quiz_id: Option<&str>,
    ) -> Result<Vec<QuizResult>, StoreError> {
        self.inner.quiz_results(user_id, quiz_id).await
    }
}

