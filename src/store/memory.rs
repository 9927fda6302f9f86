//! In-process [`ModuleStore`] backed by vectors behind a `std::sync::Mutex`.
//!
//! Used by tests and by `--ephemeral` CLI runs. The lock is never held
//! across an `.await`.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::{
    ModuleFilter, ModuleStore, NewModule, NewProgress, NewQuiz, NewQuizResult, NewSection,
    ProgressUpdate, StoreError,
};
use crate::model::{
    new_id, Module, ProgressStatus, Quiz, QuizResult, Section, UserModuleProgress,
};

#[derive(Default)]
struct Tables {
    modules: Vec<Module>,
    sections: Vec<Section>,
    quizzes: Vec<Quiz>,
    progress: Vec<UserModuleProgress>,
    results: Vec<QuizResult>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|e| StoreError::Backend(format!("memory store lock poisoned: {e}")))
    }

    /// Row counts as `(modules, sections, quizzes)`.
    pub fn counts(&self) -> (usize, usize, usize) {
        match self.tables.lock() {
            Ok(t) => (t.modules.len(), t.sections.len(), t.quizzes.len()),
            Err(_) => (0, 0, 0),
        }
    }
}

#[async_trait]
impl ModuleStore for MemoryStore {
    async fn insert_module(&self, new: NewModule) -> Result<Module, StoreError> {
        let now = Utc::now();
        let module = Module {
            id: new_id(),
            title: new.title,
            description: new.description,
            topic: new.topic,
            difficulty: new.difficulty,
            language: new.language,
            estimated_duration_mins: new.estimated_duration_mins,
            thumbnail_url: new.thumbnail_url,
            is_published: new.is_published,
            created_at: now,
            updated_at: now,
        };
        self.lock()?.modules.push(module.clone());
        Ok(module)
    }

    async fn get_module(&self, id: &str) -> Result<Option<Module>, StoreError> {
        Ok(self.lock()?.modules.iter().find(|m| m.id == id).cloned())
    }

    async fn list_modules(&self, filter: &ModuleFilter) -> Result<Vec<Module>, StoreError> {
        let tables = self.lock()?;
        // Newest insert first, then a stable sort keeps that order for ties.
        let mut matching: Vec<Module> = tables
            .modules
            .iter()
            .rev()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching
            .into_iter()
            .skip(filter.offset)
            .take(filter.limit)
            .collect())
    }

    async fn set_module_published(
        &self,
        id: &str,
        published: bool,
    ) -> Result<Module, StoreError> {
        let mut tables = self.lock()?;
        let module = tables
            .modules
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| StoreError::not_found("module", id))?;
        module.is_published = published;
        module.updated_at = Utc::now();
        Ok(module.clone())
    }

    async fn delete_module(&self, id: &str) -> Result<bool, StoreError> {
        let mut tables = self.lock()?;
        let before = tables.modules.len();
        tables.modules.retain(|m| m.id != id);
        if tables.modules.len() == before {
            return Ok(false);
        }

        let section_ids: Vec<String> = tables
            .sections
            .iter()
            .filter(|s| s.module_id == id)
            .map(|s| s.id.clone())
            .collect();
        let quiz_ids: Vec<String> = tables
            .quizzes
            .iter()
            .filter(|q| section_ids.contains(&q.section_id))
            .map(|q| q.id.clone())
            .collect();

        tables.sections.retain(|s| s.module_id != id);
        tables.quizzes.retain(|q| !section_ids.contains(&q.section_id));
        tables.progress.retain(|p| p.module_id != id);
        tables.results.retain(|r| !quiz_ids.contains(&r.quiz_id));
        Ok(true)
    }

    async fn insert_section(&self, new: NewSection) -> Result<Section, StoreError> {
        let mut tables = self.lock()?;
        if !tables.modules.iter().any(|m| m.id == new.module_id) {
            return Err(StoreError::Constraint(format!(
                "section references missing module {}",
                new.module_id
            )));
        }
        if tables
            .sections
            .iter()
            .any(|s| s.module_id == new.module_id && s.order_index == new.order_index)
        {
            return Err(StoreError::Conflict(format!(
                "module {} already has a section at index {}",
                new.module_id, new.order_index
            )));
        }

        let now = Utc::now();
        let section = Section {
            id: new_id(),
            module_id: new.module_id,
            title: new.title,
            content: new.content,
            order_index: new.order_index,
            audio_url: None,
            created_at: now,
            updated_at: now,
        };
        tables.sections.push(section.clone());
        Ok(section)
    }

    async fn get_section(&self, id: &str) -> Result<Option<Section>, StoreError> {
        Ok(self.lock()?.sections.iter().find(|s| s.id == id).cloned())
    }

    async fn sections_for_module(&self, module_id: &str) -> Result<Vec<Section>, StoreError> {
        let mut sections: Vec<Section> = self
            .lock()?
            .sections
            .iter()
            .filter(|s| s.module_id == module_id)
            .cloned()
            .collect();
        sections.sort_by_key(|s| s.order_index);
        Ok(sections)
    }

    async fn set_section_audio_url(&self, section_id: &str, url: &str) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        let section = tables
            .sections
            .iter_mut()
            .find(|s| s.id == section_id)
            .ok_or_else(|| StoreError::not_found("section", section_id))?;
        section.audio_url = Some(url.to_string());
        section.updated_at = Utc::now();
        Ok(())
    }

    async fn insert_quiz(&self, new: NewQuiz) -> Result<Quiz, StoreError> {
        let mut tables = self.lock()?;
        if !tables.sections.iter().any(|s| s.id == new.section_id) {
            return Err(StoreError::Constraint(format!(
                "quiz references missing section {}",
                new.section_id
            )));
        }
        if tables.quizzes.iter().any(|q| q.section_id == new.section_id) {
            return Err(StoreError::Conflict(format!(
                "section {} already has a quiz",
                new.section_id
            )));
        }

        let now = Utc::now();
        let quiz = Quiz {
            id: new_id(),
            section_id: new.section_id,
            title: new.title,
            questions: new.questions,
            created_at: now,
            updated_at: now,
        };
        tables.quizzes.push(quiz.clone());
        Ok(quiz)
    }

    async fn get_quiz(&self, id: &str) -> Result<Option<Quiz>, StoreError> {
        Ok(self.lock()?.quizzes.iter().find(|q| q.id == id).cloned())
    }

    async fn quizzes_for_module(&self, module_id: &str) -> Result<Vec<Quiz>, StoreError> {
        let tables = self.lock()?;
        let mut sections: Vec<&Section> = tables
            .sections
            .iter()
            .filter(|s| s.module_id == module_id)
            .collect();
        sections.sort_by_key(|s| s.order_index);

        Ok(sections
            .iter()
            .filter_map(|s| tables.quizzes.iter().find(|q| q.section_id == s.id))
            .cloned()
            .collect())
    }

    async fn insert_progress(&self, new: NewProgress) -> Result<UserModuleProgress, StoreError> {
        let mut tables = self.lock()?;
        if !tables.modules.iter().any(|m| m.id == new.module_id) {
            return Err(StoreError::Constraint(format!(
                "progress references missing module {}",
                new.module_id
            )));
        }
        if tables
            .progress
            .iter()
            .any(|p| p.user_id == new.user_id && p.module_id == new.module_id)
        {
            return Err(StoreError::Conflict(format!(
                "progress for user {} on module {} already exists",
                new.user_id, new.module_id
            )));
        }

        let progress = UserModuleProgress {
            id: new_id(),
            user_id: new.user_id,
            module_id: new.module_id,
            status: ProgressStatus::InProgress,
            current_section_index: 0,
            started_at: Utc::now(),
            completed_at: None,
        };
        tables.progress.push(progress.clone());
        Ok(progress)
    }

    async fn get_progress(&self, id: &str) -> Result<Option<UserModuleProgress>, StoreError> {
        Ok(self.lock()?.progress.iter().find(|p| p.id == id).cloned())
    }

    async fn find_progress(
        &self,
        user_id: &str,
        module_id: &str,
    ) -> Result<Option<UserModuleProgress>, StoreError> {
        Ok(self
            .lock()?
            .progress
            .iter()
            .find(|p| p.user_id == user_id && p.module_id == module_id)
            .cloned())
    }

    async fn update_progress(
        &self,
        id: &str,
        update: &ProgressUpdate,
    ) -> Result<UserModuleProgress, StoreError> {
        let mut tables = self.lock()?;
        let progress = tables
            .progress
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| StoreError::not_found("progress", id))?;

        if let Some(status) = update.status {
            progress.status = status;
        }
        if let Some(index) = update.current_section_index {
            progress.current_section_index = index;
        }
        if let Some(at) = update.completed_at {
            progress.completed_at = Some(at);
        }
        Ok(progress.clone())
    }

    async fn insert_quiz_result(&self, new: NewQuizResult) -> Result<QuizResult, StoreError> {
        let mut tables = self.lock()?;
        if !tables.quizzes.iter().any(|q| q.id == new.quiz_id) {
            return Err(StoreError::Constraint(format!(
                "result references missing quiz {}",
                new.quiz_id
            )));
        }
        if new.score > 100 {
            return Err(StoreError::Constraint(format!(
                "score {} is outside 0-100",
                new.score
            )));
        }

        let result = QuizResult {
            id: new_id(),
            user_id: new.user_id,
            quiz_id: new.quiz_id,
            score: new.score,
            answers: new.answers,
            completed_at: Utc::now(),
        };
        tables.results.push(result.clone());
        Ok(result)
    }

    async fn quiz_results(
        &self,
        user_id: &str,
        quiz_id: Option<&str>,
    ) -> Result<Vec<QuizResult>, StoreError> {
        let tables = self.lock()?;
        let mut results: Vec<QuizResult> = tables
            .results
            .iter()
            .rev()
            .filter(|r| r.user_id == user_id && quiz_id.map_or(true, |q| r.quiz_id == q))
            .cloned()
            .collect();
        results.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        Ok(results)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
