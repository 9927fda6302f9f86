//! Relational persistence for modules, sections, quizzes, progress and
//! results.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────── ModuleStore (trait) ───────────────────────────┐
//! │                                                                          │
//! │  modules ──< sections ──< quizzes        (ON DELETE CASCADE)             │
//! │     │                        │                                           │
//! │     └──< user_module_progress └──< quiz_results                          │
//! │                                                                          │
//! │  UNIQUE(sections.module_id, order_index)   UNIQUE(quizzes.section_id)    │
//! │  UNIQUE(user_module_progress.user_id, module_id)                         │
//! └──────────────────────────────────────────────────────────────────────────┘
//!        ▲                                    ▲
//!   SqliteStore (rusqlite,             MemoryStore (maps behind a Mutex,
//!   spawn_blocking)                    same constraints and cascade)
//! ```
//!
//! Both backends enforce the same constraints, so pipeline tests against
//! [`MemoryStore`] exercise the same failure paths as production.

#[cfg(test)]
mod flaky;
pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{
    Difficulty, Module, ProgressStatus, Quiz, QuizAnswer, QuizQuestion, QuizResult, Section,
    UserModuleProgress,
};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[cfg(test)]
pub use flaky::FlakyStore;

// ---------------------------------------------------------------------------
// StoreError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// A uniqueness constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A foreign key or check constraint rejected the write.
    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Insert / update payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NewModule {
    pub title: String,
    pub description: String,
    pub topic: String,
    pub difficulty: Difficulty,
    pub language: String,
    pub estimated_duration_mins: u32,
    pub thumbnail_url: Option<String>,
    pub is_published: bool,
}

#[derive(Debug, Clone)]
pub struct NewSection {
    pub module_id: String,
    pub title: String,
    pub content: String,
    pub order_index: u32,
}

#[derive(Debug, Clone)]
pub struct NewQuiz {
    pub section_id: String,
    pub title: String,
    pub questions: Vec<QuizQuestion>,
}

#[derive(Debug, Clone)]
pub struct NewProgress {
    pub user_id: String,
    pub module_id: String,
}

/// Partial progress update; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ProgressUpdate {
    pub status: Option<ProgressStatus>,
    pub current_section_index: Option<u32>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ProgressUpdate {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.current_section_index.is_none() && self.completed_at.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct NewQuizResult {
    pub user_id: String,
    pub quiz_id: String,
    pub score: u8,
    pub answers: Vec<QuizAnswer>,
}

/// Listing filter; results are newest first.
#[derive(Debug, Clone)]
pub struct ModuleFilter {
    pub published_only: bool,
    pub topic: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub limit: usize,
    pub offset: usize,
}

impl Default for ModuleFilter {
    fn default() -> Self {
        Self {
            published_only: true,
            topic: None,
            difficulty: None,
            limit: 20,
            offset: 0,
        }
    }
}

impl ModuleFilter {
    pub(crate) fn matches(&self, module: &Module) -> bool {
        (!self.published_only || module.is_published)
            && self.topic.as_ref().map_or(true, |t| &module.topic == t)
            && self.difficulty.map_or(true, |d| module.difficulty == d)
    }
}

// ---------------------------------------------------------------------------
// ModuleStore trait
// ---------------------------------------------------------------------------

/// Async access to the relational store.
///
/// Deleting a module removes its sections, their quizzes, and any progress
/// or results that reference them.
#[async_trait]
pub trait ModuleStore: Send + Sync {
    // ── modules ──────────────────────────────────────────────────────────
    async fn insert_module(&self, new: NewModule) -> Result<Module, StoreError>;
    async fn get_module(&self, id: &str) -> Result<Option<Module>, StoreError>;
    async fn list_modules(&self, filter: &ModuleFilter) -> Result<Vec<Module>, StoreError>;
    async fn set_module_published(&self, id: &str, published: bool)
        -> Result<Module, StoreError>;
    /// Returns `true` when a row was deleted.
    async fn delete_module(&self, id: &str) -> Result<bool, StoreError>;

    // ── sections ─────────────────────────────────────────────────────────
    async fn insert_section(&self, new: NewSection) -> Result<Section, StoreError>;
    async fn get_section(&self, id: &str) -> Result<Option<Section>, StoreError>;
    /// Sections of `module_id` ordered by `order_index`.
    async fn sections_for_module(&self, module_id: &str) -> Result<Vec<Section>, StoreError>;
    /// Patch only `audio_url`; a missing row is `NotFound`, never recreated.
    async fn set_section_audio_url(&self, section_id: &str, url: &str)
        -> Result<(), StoreError>;

    // ── quizzes ──────────────────────────────────────────────────────────
    async fn insert_quiz(&self, new: NewQuiz) -> Result<Quiz, StoreError>;
    async fn get_quiz(&self, id: &str) -> Result<Option<Quiz>, StoreError>;
    /// Quizzes of `module_id` in section order.
    async fn quizzes_for_module(&self, module_id: &str) -> Result<Vec<Quiz>, StoreError>;

    // ── progress ─────────────────────────────────────────────────────────
    /// `Conflict` when the `(user_id, module_id)` pair already has a row.
    async fn insert_progress(&self, new: NewProgress)
        -> Result<UserModuleProgress, StoreError>;
    async fn get_progress(&self, id: &str) -> Result<Option<UserModuleProgress>, StoreError>;
    async fn find_progress(
        &self,
        user_id: &str,
        module_id: &str,
    ) -> Result<Option<UserModuleProgress>, StoreError>;
    async fn update_progress(
        &self,
        id: &str,
        update: &ProgressUpdate,
    ) -> Result<UserModuleProgress, StoreError>;

    // ── results ──────────────────────────────────────────────────────────
    async fn insert_quiz_result(&self, new: NewQuizResult) -> Result<QuizResult, StoreError>;
    /// Newest first, optionally limited to one quiz.
    async fn quiz_results(
        &self,
        user_id: &str,
        quiz_id: Option<&str>,
    ) -> Result<Vec<QuizResult>, StoreError>;
}
