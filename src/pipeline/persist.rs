//! Module persistence with compensating delete.
//!
//! Writes run strictly in order: module, then for each section (by
//! `order_index`) the section row followed by its quiz. The first failed
//! write after the module row exists triggers one cascading
//! `delete_module`, so either all rows of the module exist or none do.

use std::sync::Arc;

use crate::llm::{GeneratedLesson, GeneratedSection};
use crate::model::{new_id, ModuleBundle, QuizQuestion};
use crate::store::{ModuleStore, NewModule, NewQuiz, NewSection, StoreError};

use super::error::{PersistStage, PersistenceError};

pub struct ModulePersister {
    store: Arc<dyn ModuleStore>,
    estimated_duration_mins: u32,
}

impl ModulePersister {
    pub fn new(store: Arc<dyn ModuleStore>) -> Self {
        Self {
            store,
            estimated_duration_mins: 5,
        }
    }

    pub fn with_estimated_duration(mut self, minutes: u32) -> Self {
        self.estimated_duration_mins = minutes;
        self
    }

    /// Write `lesson` as an unpublished module titled `title`.
    pub async fn persist(
        &self,
        title: &str,
        language: &str,
        lesson: &GeneratedLesson,
    ) -> Result<ModuleBundle, PersistenceError> {
        let module = self
            .store
            .insert_module(NewModule {
                title: title.to_string(),
                description: lesson.description.clone(),
                topic: lesson.topic.clone(),
                difficulty: lesson.difficulty,
                language: language.to_string(),
                estimated_duration_mins: self.estimated_duration_mins,
                thumbnail_url: None,
                is_published: false,
            })
            .await
            .map_err(|source| {
                log::error!("persist: module insert failed: {source}");
                PersistenceError::new(PersistStage::Module, source)
            })?;

        let ordered = lesson.ordered_sections();
        let mut sections = Vec::with_capacity(ordered.len());
        let mut quizzes = Vec::with_capacity(ordered.len());

        for generated in ordered {
            let section = match self
                .store
                .insert_section(NewSection {
                    module_id: module.id.clone(),
                    title: generated.title.clone(),
                    content: generated.content.clone(),
                    order_index: generated.order_index,
                })
                .await
            {
                Ok(section) => section,
                Err(source) => {
                    return Err(self.compensate(&module.id, PersistStage::Section, source).await)
                }
            };

            let quiz = match self
                .store
                .insert_quiz(NewQuiz {
                    section_id: section.id.clone(),
                    title: generated.quiz.title.clone(),
                    questions: questions_with_ids(generated),
                })
                .await
            {
                Ok(quiz) => quiz,
                Err(source) => {
                    return Err(self.compensate(&module.id, PersistStage::Quiz, source).await)
                }
            };

            sections.push(section);
            quizzes.push(quiz);
        }

        log::info!(
            "persist: module {} saved with {} sections",
            module.id,
            sections.len()
        );
        Ok(ModuleBundle {
            module,
            sections,
            quizzes,
        })
    }

    /// Delete the partially written module and build the error to return.
    async fn compensate(
        &self,
        module_id: &str,
        stage: PersistStage,
        source: StoreError,
    ) -> PersistenceError {
        log::warn!("persist: {stage} insert failed ({source}); deleting module {module_id}");
        match self.store.delete_module(module_id).await {
            Ok(true) => {}
            Ok(false) => log::warn!("persist: module {module_id} was already gone"),
            Err(e) => log::error!("persist: compensation delete of module {module_id} failed: {e}"),
        }
        PersistenceError::new(stage, source)
    }
}

/// Questions in `order_index` order, each with a fresh identifier.
fn questions_with_ids(section: &GeneratedSection) -> Vec<QuizQuestion> {
    let mut questions: Vec<QuizQuestion> = section
        .quiz
        .questions
        .iter()
        .map(|q| QuizQuestion {
            id: new_id(),
            question_text: q.question_text.clone(),
            input_type: q.input_type,
            options: q.options.clone(),
            correct_answer: q.correct_answer.clone(),
            order_index: q.order_index,
        })
        .collect();
    questions.sort_by_key(|q| q.order_index);
    questions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::schema::sample_lesson_json;
    use crate::store::{FlakyStore, MemoryStore, SqliteStore};

    fn lesson() -> GeneratedLesson {
        GeneratedLesson::parse(&sample_lesson_json()).unwrap()
    }

    #[tokio::test]
    async fn writes_every_row_unpublished() {
        let store = Arc::new(MemoryStore::new());
        let persister = ModulePersister::new(store.clone());

        let bundle = persister.persist("Tides", "English", &lesson()).await.unwrap();

        assert!(!bundle.module.is_published);
        assert_eq!(bundle.module.estimated_duration_mins, 5);
        assert_eq!(bundle.sections.len(), 5);
        assert_eq!(bundle.quizzes.len(), 5);
        assert_eq!(store.counts(), (1, 5, 5));
        for (section, quiz) in bundle.sections.iter().zip(&bundle.quizzes) {
            assert_eq!(quiz.section_id, section.id);
        }
    }

    #[tokio::test]
    async fn question_ids_are_fresh_and_unique() {
        let store = Arc::new(MemoryStore::new());
        let bundle = ModulePersister::new(store)
            .persist("Tides", "English", &lesson())
            .await
            .unwrap();

        let mut ids: Vec<&str> = bundle
            .quizzes
            .iter()
            .flat_map(|q| q.questions.iter().map(|q| q.id.as_str()))
            .collect();
        assert_eq!(ids.len(), 15);
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 15);
    }

    #[tokio::test]
    async fn module_failure_needs_no_compensation() {
        let inner = Arc::new(MemoryStore::new());
        let store = Arc::new(FlakyStore::new(inner.clone()).fail_module_insert());

        let err = ModulePersister::new(store)
            .persist("Tides", "English", &lesson())
            .await
            .unwrap_err();
        assert_eq!(err.stage, PersistStage::Module);
        assert_eq!(err.message(), "Failed to create module");
        assert_eq!(inner.counts(), (0, 0, 0));
    }

    type RowCounts = Box<dyn Fn() -> (usize, usize, usize)>;

    /// Fresh empty backends, each paired with a row counter.
    fn backends() -> Vec<(&'static str, Arc<dyn ModuleStore>, RowCounts)> {
        let memory = Arc::new(MemoryStore::new());
        let sqlite = Arc::new(SqliteStore::open_in_memory().unwrap());
        let (m, s) = (memory.clone(), sqlite.clone());
        let memory_counts: RowCounts = Box::new(move || m.counts());
        let sqlite_counts: RowCounts = Box::new(move || s.counts().unwrap());
        vec![
            ("memory", memory as Arc<dyn ModuleStore>, memory_counts),
            ("sqlite", sqlite as Arc<dyn ModuleStore>, sqlite_counts),
        ]
    }

    #[tokio::test]
    async fn any_section_failure_leaves_no_rows() {
        for n in 1..=5 {
            for (backend, inner, counts) in backends() {
                let store = Arc::new(FlakyStore::new(inner).fail_section_insert(n));

                let err = ModulePersister::new(store)
                    .persist("Tides", "English", &lesson())
                    .await
                    .unwrap_err();
                assert_eq!(err.stage, PersistStage::Section, "{backend} n = {n}");
                assert_eq!(counts(), (0, 0, 0), "{backend} n = {n}");
            }
        }
    }

    #[tokio::test]
    async fn any_quiz_failure_leaves_no_rows() {
        for n in 1..=5 {
            for (backend, inner, counts) in backends() {
                let store = Arc::new(FlakyStore::new(inner).fail_quiz_insert(n));

                let err = ModulePersister::new(store)
                    .persist("Tides", "English", &lesson())
                    .await
                    .unwrap_err();
                assert_eq!(err.stage, PersistStage::Quiz, "{backend} n = {n}");
                assert_eq!(err.message(), "Failed to create quiz");
                assert_eq!(counts(), (0, 0, 0), "{backend} n = {n}");
            }
        }
    }

    #[tokio::test]
    async fn sqlite_cascade_also_cleans_up() {
        let inner = SqliteStore::open_in_memory().unwrap();
        let inner: Arc<dyn ModuleStore> = Arc::new(inner);
        let persister = ModulePersister::new(inner.clone());
        let bundle = persister.persist("Tides", "English", &lesson()).await.unwrap();

        assert!(inner.delete_module(&bundle.module.id).await.unwrap());
        assert!(inner
            .sections_for_module(&bundle.module.id)
            .await
            .unwrap()
            .is_empty());
        assert!(inner
            .quizzes_for_module(&bundle.module.id)
            .await
            .unwrap()
            .is_empty());
    }
}
