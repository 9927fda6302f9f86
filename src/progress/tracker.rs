use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use crate::model::{ProgressStatus, UserModuleProgress};
use crate::store::{ModuleStore, NewProgress, ProgressUpdate, StoreError};

#[derive(Debug, Clone, Error)]
pub enum ProgressError {
    #[error("Module not found")]
    ModuleNotFound(String),

    #[error("Progress already exists for this module")]
    AlreadyStarted { user_id: String, module_id: String },

    #[error("Progress record not found")]
    NotFound(String),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ProgressError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { entity: "progress", id } => ProgressError::NotFound(id),
            other => ProgressError::Store(other),
        }
    }
}

pub struct ProgressTracker {
    store: Arc<dyn ModuleStore>,
}

impl ProgressTracker {
    pub fn new(store: Arc<dyn ModuleStore>) -> Self {
        Self { store }
    }

    /// Begin `module_id` for `user_id` at section 0.
    pub async fn start(
        &self,
        user_id: &str,
        module_id: &str,
    ) -> Result<UserModuleProgress, ProgressError> {
        if self.store.get_module(module_id).await?.is_none() {
            return Err(ProgressError::ModuleNotFound(module_id.to_string()));
        }

        let new = NewProgress {
            user_id: user_id.to_string(),
            module_id: module_id.to_string(),
        };
        match self.store.insert_progress(new).await {
            Ok(progress) => {
                log::info!("progress: {user_id} started module {module_id}");
                Ok(progress)
            }
            Err(StoreError::Conflict(_)) => Err(ProgressError::AlreadyStarted {
                user_id: user_id.to_string(),
                module_id: module_id.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get(&self, id: &str) -> Result<UserModuleProgress, ProgressError> {
        self.store
            .get_progress(id)
            .await?
            .ok_or_else(|| ProgressError::NotFound(id.to_string()))
    }

    pub async fn find(
        &self,
        user_id: &str,
        module_id: &str,
    ) -> Result<Option<UserModuleProgress>, ProgressError> {
        Ok(self.store.find_progress(user_id, module_id).await?)
    }

    pub async fn advance(
        &self,
        id: &str,
        section_index: u32,
    ) -> Result<UserModuleProgress, ProgressError> {
        self.update(
            id,
            ProgressUpdate {
                current_section_index: Some(section_index),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn complete(&self, id: &str) -> Result<UserModuleProgress, ProgressError> {
        self.update(
            id,
            ProgressUpdate {
                status: Some(ProgressStatus::Completed),
                ..Default::default()
            },
        )
        .await
    }

    /// Apply a partial update. Moving to `Completed` without a timestamp
    /// stamps `completed_at` with the current time.
    pub async fn update(
        &self,
        id: &str,
        mut update: ProgressUpdate,
    ) -> Result<UserModuleProgress, ProgressError> {
        if update.status == Some(ProgressStatus::Completed) && update.completed_at.is_none() {
            update.completed_at = Some(Utc::now());
        }
        if update.is_empty() {
            return self.get(id).await;
        }

        let progress = self.store.update_progress(id, &update).await?;
        log::debug!(
            "progress: {id} now {} at section {}",
            progress.status,
            progress.current_section_index
        );
        Ok(progress)
    }
}
