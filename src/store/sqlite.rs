//! SQLite-backed [`ModuleStore`].
//!
//! A single `rusqlite::Connection` lives behind `Arc<Mutex<_>>`; every call
//! runs on the blocking pool via `tokio::task::spawn_blocking`. Timestamps
//! are stored as RFC 3339 text with microsecond precision so that they sort
//! lexically, and quiz questions / answers are stored as JSON text.

use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;

use super::{
    ModuleFilter, ModuleStore, NewModule, NewProgress, NewQuiz, NewQuizResult, NewSection,
    ProgressUpdate, StoreError,
};
use crate::model::{
    new_id, Module, ProgressStatus, Quiz, QuizResult, Section, UserModuleProgress,
};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS modules (
    id                      TEXT PRIMARY KEY,
    title                   TEXT NOT NULL,
    description             TEXT NOT NULL,
    topic                   TEXT NOT NULL,
    difficulty              TEXT NOT NULL,
    language                TEXT NOT NULL,
    estimated_duration_mins INTEGER NOT NULL,
    thumbnail_url           TEXT,
    is_published            INTEGER NOT NULL DEFAULT 0,
    created_at              TEXT NOT NULL,
    updated_at              TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sections (
    id          TEXT PRIMARY KEY,
    module_id   TEXT NOT NULL REFERENCES modules(id) ON DELETE CASCADE,
    title       TEXT NOT NULL,
    content     TEXT NOT NULL,
    order_index INTEGER NOT NULL,
    audio_url   TEXT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    UNIQUE (module_id, order_index)
);

CREATE TABLE IF NOT EXISTS quizzes (
    id         TEXT PRIMARY KEY,
    section_id TEXT NOT NULL UNIQUE REFERENCES sections(id) ON DELETE CASCADE,
    title      TEXT NOT NULL,
    questions  TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS user_module_progress (
    id                    TEXT PRIMARY KEY,
    user_id               TEXT NOT NULL,
    module_id             TEXT NOT NULL REFERENCES modules(id) ON DELETE CASCADE,
    status                TEXT NOT NULL,
    current_section_index INTEGER NOT NULL DEFAULT 0,
    started_at            TEXT NOT NULL,
    completed_at          TEXT,
    UNIQUE (user_id, module_id)
);

CREATE TABLE IF NOT EXISTS quiz_results (
    id           TEXT PRIMARY KEY,
    user_id      TEXT NOT NULL,
    quiz_id      TEXT NOT NULL REFERENCES quizzes(id) ON DELETE CASCADE,
    score        INTEGER NOT NULL CHECK (score BETWEEN 0 AND 100),
    answers      TEXT NOT NULL,
    completed_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_modules_listing ON modules(is_published, created_at);
CREATE INDEX IF NOT EXISTS idx_sections_module ON sections(module_id);
CREATE INDEX IF NOT EXISTS idx_results_user ON quiz_results(user_id, quiz_id);
";

const MODULE_COLUMNS: &str = "id, title, description, topic, difficulty, language, \
     estimated_duration_mins, thumbnail_url, is_published, created_at, updated_at";
const SECTION_COLUMNS: &str =
    "id, module_id, title, content, order_index, audio_url, created_at, updated_at";
const QUIZ_COLUMNS: &str = "id, section_id, title, questions, created_at, updated_at";
const PROGRESS_COLUMNS: &str =
    "id, user_id, module_id, status, current_section_index, started_at, completed_at";
const RESULT_COLUMNS: &str = "id, user_id, quiz_id, score, answers, completed_at";

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(ref failure, ref message) = e {
            if failure.code == rusqlite::ErrorCode::ConstraintViolation {
                let detail = message.clone().unwrap_or_else(|| e.to_string());
                return match failure.extended_code {
                    rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY => StoreError::Conflict(detail),
                    _ => StoreError::Constraint(detail),
                };
            }
        }
        StoreError::Backend(e.to_string())
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|e| StoreError::Backend(format!("encode json: {e}")))
}

// ---------------------------------------------------------------------------
// Column helpers
// ---------------------------------------------------------------------------

fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn stamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn bad_column<E>(idx: usize, e: E) -> rusqlite::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into())
}

fn time_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| bad_column(idx, e))
}

fn optional_time_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(raw) => DateTime::parse_from_rfc3339(&raw)
            .map(|t| Some(t.with_timezone(&Utc)))
            .map_err(|e| bad_column(idx, e)),
        None => Ok(None),
    }
}

fn parsed_at<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = String>,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e: String| bad_column(idx, e))
}

fn json_at<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| bad_column(idx, e))
}

fn row_to_module(row: &Row<'_>) -> rusqlite::Result<Module> {
    Ok(Module {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        topic: row.get(3)?,
        difficulty: parsed_at(row, 4)?,
        language: row.get(5)?,
        estimated_duration_mins: row.get(6)?,
        thumbnail_url: row.get(7)?,
        is_published: row.get(8)?,
        created_at: time_at(row, 9)?,
        updated_at: time_at(row, 10)?,
    })
}

fn row_to_section(row: &Row<'_>) -> rusqlite::Result<Section> {
    Ok(Section {
        id: row.get(0)?,
        module_id: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        order_index: row.get(4)?,
        audio_url: row.get(5)?,
        created_at: time_at(row, 6)?,
        updated_at: time_at(row, 7)?,
    })
}

fn row_to_quiz(row: &Row<'_>) -> rusqlite::Result<Quiz> {
    Ok(Quiz {
        id: row.get(0)?,
        section_id: row.get(1)?,
        title: row.get(2)?,
        questions: json_at(row, 3)?,
        created_at: time_at(row, 4)?,
        updated_at: time_at(row, 5)?,
    })
}

fn row_to_progress(row: &Row<'_>) -> rusqlite::Result<UserModuleProgress> {
    Ok(UserModuleProgress {
        id: row.get(0)?,
        user_id: row.get(1)?,
        module_id: row.get(2)?,
        status: parsed_at(row, 3)?,
        current_section_index: row.get(4)?,
        started_at: time_at(row, 5)?,
        completed_at: optional_time_at(row, 6)?,
    })
}

fn row_to_result(row: &Row<'_>) -> rusqlite::Result<QuizResult> {
    Ok(QuizResult {
        id: row.get(0)?,
        user_id: row.get(1)?,
        quiz_id: row.get(2)?,
        score: row.get(3)?,
        answers: json_at(row, 4)?,
        completed_at: time_at(row, 5)?,
    })
}

// ---------------------------------------------------------------------------
// SqliteStore
// ---------------------------------------------------------------------------

pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path` and apply the schema.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Backend(format!("create {}: {e}", parent.display())))?;
        }
        let conn = Connection::open(path)?;
        log::debug!("store: opened sqlite database at {}", path.display());
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Row counts as `(modules, sections, quizzes)`.
    pub fn counts(&self) -> Result<(usize, usize, usize), StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Backend(format!("connection lock poisoned: {e}")))?;
        let count = |table: &str| -> Result<usize, StoreError> {
            let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))?;
            Ok(n as usize)
        };
        Ok((count("modules")?, count("sections")?, count("quizzes")?))
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|e| StoreError::Backend(format!("connection lock poisoned: {e}")))?;
            f(&guard)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("blocking task failed: {e}")))?
    }
}

fn select_module(conn: &Connection, id: &str) -> Result<Option<Module>, StoreError> {
    Ok(conn
        .query_row(
            &format!("SELECT {MODULE_COLUMNS} FROM modules WHERE id = ?1"),
            params![id],
            row_to_module,
        )
        .optional()?)
}

fn select_progress(conn: &Connection, id: &str) -> Result<Option<UserModuleProgress>, StoreError> {
    Ok(conn
        .query_row(
            &format!("SELECT {PROGRESS_COLUMNS} FROM user_module_progress WHERE id = ?1"),
            params![id],
            row_to_progress,
        )
        .optional()?)
}

#[async_trait]
impl ModuleStore for SqliteStore {
    async fn insert_module(&self, new: NewModule) -> Result<Module, StoreError> {
        self.with_conn(move |conn| {
            let at = now();
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
                created_at: at,
                updated_at: at,
            };
            conn.execute(
                &format!(
                    "INSERT INTO modules ({MODULE_COLUMNS}) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
                ),
                params![
                    module.id,
                    module.title,
                    module.description,
                    module.topic,
                    module.difficulty.as_str(),
                    module.language,
                    module.estimated_duration_mins,
                    module.thumbnail_url,
                    module.is_published,
                    stamp(&module.created_at),
                    stamp(&module.updated_at),
                ],
            )?;
            Ok(module)
        })
        .await
    }

    async fn get_module(&self, id: &str) -> Result<Option<Module>, StoreError> {
        let id = id.to_string();
        self.with_conn(move |conn| select_module(conn, &id)).await
    }

    async fn list_modules(&self, filter: &ModuleFilter) -> Result<Vec<Module>, StoreError> {
        let filter = filter.clone();
        self.with_conn(move |conn| {
            let mut sql = format!("SELECT {MODULE_COLUMNS} FROM modules WHERE 1 = 1");
            let mut args: Vec<Value> = Vec::new();
            if filter.published_only {
                sql.push_str(" AND is_published = 1");
            }
            if let Some(topic) = filter.topic {
                sql.push_str(" AND topic = ?");
                args.push(Value::Text(topic));
            }
            if let Some(difficulty) = filter.difficulty {
                sql.push_str(" AND difficulty = ?");
                args.push(Value::Text(difficulty.as_str().to_string()));
            }
            sql.push_str(" ORDER BY created_at DESC, rowid DESC LIMIT ? OFFSET ?");
            args.push(Value::Integer(i64::try_from(filter.limit).unwrap_or(i64::MAX)));
            args.push(Value::Integer(i64::try_from(filter.offset).unwrap_or(i64::MAX)));

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(args.iter()), row_to_module)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
        .await
    }

    async fn set_module_published(
        &self,
        id: &str,
        published: bool,
    ) -> Result<Module, StoreError> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE modules SET is_published = ?1, updated_at = ?2 WHERE id = ?3",
                params![published, stamp(&now()), id],
            )?;
            if changed == 0 {
                return Err(StoreError::not_found("module", id));
            }
            select_module(conn, &id)?.ok_or_else(|| StoreError::not_found("module", id))
        })
        .await
    }

    async fn delete_module(&self, id: &str) -> Result<bool, StoreError> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            let deleted = conn.execute("DELETE FROM modules WHERE id = ?1", params![id])?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn insert_section(&self, new: NewSection) -> Result<Section, StoreError> {
        self.with_conn(move |conn| {
            let at = now();
            let section = Section {
                id: new_id(),
                module_id: new.module_id,
                title: new.title,
                content: new.content,
                order_index: new.order_index,
                audio_url: None,
                created_at: at,
                updated_at: at,
            };
            conn.execute(
                &format!(
                    "INSERT INTO sections ({SECTION_COLUMNS}) \
                     VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6, ?7)"
                ),
                params![
                    section.id,
                    section.module_id,
                    section.title,
                    section.content,
                    section.order_index,
                    stamp(&section.created_at),
                    stamp(&section.updated_at),
                ],
            )?;
            Ok(section)
        })
        .await
    }

    async fn get_section(&self, id: &str) -> Result<Option<Section>, StoreError> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            Ok(conn
                .query_row(
                    &format!("SELECT {SECTION_COLUMNS} FROM sections WHERE id = ?1"),
                    params![id],
                    row_to_section,
                )
                .optional()?)
        })
        .await
    }

    async fn sections_for_module(&self, module_id: &str) -> Result<Vec<Section>, StoreError> {
        let module_id = module_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SECTION_COLUMNS} FROM sections \
                 WHERE module_id = ?1 ORDER BY order_index"
            ))?;
            let rows = stmt.query_map(params![module_id], row_to_section)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
        .await
    }

    async fn set_section_audio_url(&self, section_id: &str, url: &str) -> Result<(), StoreError> {
        let section_id = section_id.to_string();
        let url = url.to_string();
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE sections SET audio_url = ?1, updated_at = ?2 WHERE id = ?3",
                params![url, stamp(&now()), section_id],
            )?;
            if changed == 0 {
                return Err(StoreError::not_found("section", section_id));
            }
            Ok(())
        })
        .await
    }

    async fn insert_quiz(&self, new: NewQuiz) -> Result<Quiz, StoreError> {
        self.with_conn(move |conn| {
            let at = now();
            let questions = to_json(&new.questions)?;
            let quiz = Quiz {
                id: new_id(),
                section_id: new.section_id,
                title: new.title,
                questions: new.questions,
                created_at: at,
                updated_at: at,
            };
            conn.execute(
                &format!("INSERT INTO quizzes ({QUIZ_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
                params![
                    quiz.id,
                    quiz.section_id,
                    quiz.title,
                    questions,
                    stamp(&quiz.created_at),
                    stamp(&quiz.updated_at),
                ],
            )?;
            Ok(quiz)
        })
        .await
    }

    async fn get_quiz(&self, id: &str) -> Result<Option<Quiz>, StoreError> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            Ok(conn
                .query_row(
                    &format!("SELECT {QUIZ_COLUMNS} FROM quizzes WHERE id = ?1"),
                    params![id],
                    row_to_quiz,
                )
                .optional()?)
        })
        .await
    }

    async fn quizzes_for_module(&self, module_id: &str) -> Result<Vec<Quiz>, StoreError> {
        let module_id = module_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT q.id, q.section_id, q.title, q.questions, q.created_at, q.updated_at \
                 FROM quizzes q JOIN sections s ON s.id = q.section_id \
                 WHERE s.module_id = ?1 ORDER BY s.order_index",
            )?;
            let rows = stmt.query_map(params![module_id], row_to_quiz)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
        .await
    }

    async fn insert_progress(&self, new: NewProgress) -> Result<UserModuleProgress, StoreError> {
        self.with_conn(move |conn| {
            let progress = UserModuleProgress {
                id: new_id(),
                user_id: new.user_id,
                module_id: new.module_id,
                status: ProgressStatus::InProgress,
                current_section_index: 0,
                started_at: now(),
                completed_at: None,
            };
            conn.execute(
                &format!(
                    "INSERT INTO user_module_progress ({PROGRESS_COLUMNS}) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL)"
                ),
                params![
                    progress.id,
                    progress.user_id,
                    progress.module_id,
                    progress.status.as_str(),
                    progress.current_section_index,
                    stamp(&progress.started_at),
                ],
            )?;
            Ok(progress)
        })
        .await
    }

    async fn get_progress(&self, id: &str) -> Result<Option<UserModuleProgress>, StoreError> {
        let id = id.to_string();
        self.with_conn(move |conn| select_progress(conn, &id)).await
    }

    async fn find_progress(
        &self,
        user_id: &str,
        module_id: &str,
    ) -> Result<Option<UserModuleProgress>, StoreError> {
        let user_id = user_id.to_string();
        let module_id = module_id.to_string();
        self.with_conn(move |conn| {
            Ok(conn
                .query_row(
                    &format!(
                        "SELECT {PROGRESS_COLUMNS} FROM user_module_progress \
                         WHERE user_id = ?1 AND module_id = ?2"
                    ),
                    params![user_id, module_id],
                    row_to_progress,
                )
                .optional()?)
        })
        .await
    }

    async fn update_progress(
        &self,
        id: &str,
        update: &ProgressUpdate,
    ) -> Result<UserModuleProgress, StoreError> {
        let id = id.to_string();
        let update = update.clone();
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE user_module_progress SET \
                     status = COALESCE(?1, status), \
                     current_section_index = COALESCE(?2, current_section_index), \
                     completed_at = COALESCE(?3, completed_at) \
                 WHERE id = ?4",
                params![
                    update.status.map(|s| s.as_str()),
                    update.current_section_index,
                    update.completed_at.as_ref().map(stamp),
                    id,
                ],
            )?;
            if changed == 0 {
                return Err(StoreError::not_found("progress", id));
            }
            select_progress(conn, &id)?.ok_or_else(|| StoreError::not_found("progress", id))
        })
        .await
    }

    async fn insert_quiz_result(&self, new: NewQuizResult) -> Result<QuizResult, StoreError> {
        self.with_conn(move |conn| {
            let answers = to_json(&new.answers)?;
            let result = QuizResult {
                id: new_id(),
                user_id: new.user_id,
                quiz_id: new.quiz_id,
                score: new.score,
                answers: new.answers,
                completed_at: now(),
            };
            conn.execute(
                &format!("INSERT INTO quiz_results ({RESULT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
                params![
                    result.id,
                    result.user_id,
                    result.quiz_id,
                    result.score,
                    answers,
                    stamp(&result.completed_at),
                ],
            )?;
            Ok(result)
        })
        .await
    }

    async fn quiz_results(
        &self,
        user_id: &str,
        quiz_id: Option<&str>,
    ) -> Result<Vec<QuizResult>, StoreError> {
        let user_id = user_id.to_string();
        let quiz_id = quiz_id.map(String::from);
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {RESULT_COLUMNS} FROM quiz_results \
                 WHERE user_id = ?1 AND (?2 IS NULL OR quiz_id = ?2) \
                 ORDER BY completed_at DESC, rowid DESC"
            ))?;
            let rows = stmt.query_map(params![user_id, quiz_id], row_to_result)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
        .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
