//! Caller-facing response envelope.
//!
//! Every operation result is reported as
//! `{"success": true, "data": …}` or
//! `{"success": false, "error": "…", "details": "…"}` together with an
//! HTTP-style status code. Error types from the subsystems convert into the
//! envelope with [`From`], so a result can be wrapped with [`respond`].

use serde::Serialize;

use crate::pipeline::{GenerationError, PipelineError};
use crate::progress::ProgressError;
use crate::quiz::ResultError;
use crate::store::StoreError;

pub const OK: u16 = 200;
pub const CREATED: u16 = 201;
pub const BAD_REQUEST: u16 = 400;
pub const NOT_FOUND: u16 = 404;
pub const CONFLICT: u16 = 409;
pub const INTERNAL_ERROR: u16 = 500;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse<T> {
    #[serde(skip)]
    pub status: u16,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self::success(OK, data)
    }

    pub fn created(data: T) -> Self {
        Self::success(CREATED, data)
    }

    pub fn success(status: u16, data: T) -> Self {
        Self {
            status,
            success: true,
            data: Some(data),
            error: None,
            details: None,
        }
    }

    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            success: false,
            data: None,
            error: Some(message.into()),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.success
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Wrap `result`, using `status` for success.
pub fn respond<T, E>(result: Result<T, E>, status: u16) -> ApiResponse<T>
where
    E: Into<ApiResponse<T>>,
{
    match result {
        Ok(data) => ApiResponse::success(status, data),
        Err(e) => e.into(),
    }
}

/// `404` for a lookup that found nothing.
pub fn found<T>(value: Option<T>, entity: &str) -> ApiResponse<T> {
    match value {
        Some(v) => ApiResponse::ok(v),
        None => ApiResponse::error(NOT_FOUND, not_found_message(entity)),
    }
}

fn not_found_message(entity: &str) -> String {
    if entity == "progress" {
        return "Progress record not found".to_string();
    }
    let mut chars = entity.chars();
    match chars.next() {
        Some(first) => format!("{}{} not found", first.to_uppercase(), chars.as_str()),
        None => "Not found".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Error mappings
// ---------------------------------------------------------------------------

impl<T> From<StoreError> for ApiResponse<T> {
    fn from(e: StoreError) -> Self {
        match &e {
            StoreError::NotFound { entity, .. } => {
                ApiResponse::error(NOT_FOUND, not_found_message(entity))
            }
            StoreError::Conflict(msg) => ApiResponse::error(CONFLICT, msg.clone()),
            StoreError::Constraint(msg) => ApiResponse::error(BAD_REQUEST, msg.clone()),
            StoreError::Backend(msg) => {
                ApiResponse::error(INTERNAL_ERROR, "Internal server error").with_details(msg.clone())
            }
        }
    }
}

impl<T> From<PipelineError> for ApiResponse<T> {
    fn from(e: PipelineError) -> Self {
        if matches!(e, PipelineError::Generation(GenerationError::EmptyTitle)) {
            return ApiResponse::error(BAD_REQUEST, "Missing required field: title");
        }
        ApiResponse::error(INTERNAL_ERROR, e.message()).with_details(e.details())
    }
}

impl<T> From<ResultError> for ApiResponse<T> {
    fn from(e: ResultError) -> Self {
        match e {
            ResultError::QuizNotFound(_) | ResultError::SectionNotFound(_) => {
                ApiResponse::error(NOT_FOUND, e.to_string())
            }
            ResultError::MissingAnswers(_)
            | ResultError::InvalidScore(_)
            | ResultError::Unevaluated(_) => ApiResponse::error(BAD_REQUEST, e.to_string()),
            ResultError::Evaluation(inner) => {
                ApiResponse::error(INTERNAL_ERROR, inner.message()).with_details(inner.to_string())
            }
            ResultError::Store(inner) => ApiResponse::error(
                INTERNAL_ERROR,
                "Failed to submit quiz result",
            )
            .with_details(inner.to_string()),
        }
    }
}

impl<T> From<ProgressError> for ApiResponse<T> {
    fn from(e: ProgressError) -> Self {
        match e {
            ProgressError::ModuleNotFound(_) | ProgressError::NotFound(_) => {
                ApiResponse::error(NOT_FOUND, e.to_string())
            }
            ProgressError::AlreadyStarted { .. } => ApiResponse::error(CONFLICT, e.to_string()),
            ProgressError::Store(inner) => inner.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{PersistStage, PersistenceError};
    use crate::quiz::EvaluationError;
    use crate::llm::LlmError;
    use serde_json::{json, Value};

    fn body<T: Serialize>(r: &ApiResponse<T>) -> Value {
        serde_json::from_str(&r.to_json().unwrap()).unwrap()
    }

    #[test]
    fn success_envelope_has_no_error_fields() {
        let r = ApiResponse::created(json!({ "id": "m1" }));
        assert_eq!(r.status, CREATED);
        assert_eq!(body(&r), json!({ "success": true, "data": { "id": "m1" } }));
    }

    #[test]
    fn error_envelope_has_no_data_and_no_status_field() {
        let r: ApiResponse<()> = ApiResponse::error(BAD_REQUEST, "bad").with_details("why");
        assert_eq!(
            body(&r),
            json!({ "success": false, "error": "bad", "details": "why" })
        );
    }

    #[test]
    fn empty_title_is_a_validation_error() {
        let r: ApiResponse<()> = PipelineError::from(GenerationError::EmptyTitle).into();
        assert_eq!(r.status, BAD_REQUEST);
        assert_eq!(r.error.as_deref(), Some("Missing required field: title"));
    }

    #[test]
    fn pipeline_failures_are_server_errors_with_details() {
        let r: ApiResponse<()> =
            PipelineError::from(GenerationError::Llm(LlmError::Timeout)).into();
        assert_eq!(r.status, INTERNAL_ERROR);
        assert_eq!(r.error.as_deref(), Some("Module generation failed"));
        assert!(r.details.is_some());

        let persist = PersistenceError::new(
            PersistStage::Section,
            StoreError::Backend("disk full".into()),
        );
        let r: ApiResponse<()> = PipelineError::from(persist).into();
        assert_eq!(r.error.as_deref(), Some("Failed to create section"));
        assert_eq!(r.details.as_deref(), Some("storage backend error: disk full"));
    }

    #[test]
    fn quiz_errors_map_to_statuses() {
        let r: ApiResponse<()> = ResultError::QuizNotFound("q".into()).into();
        assert_eq!((r.status, r.error.as_deref()), (NOT_FOUND, Some("Quiz not found")));

        let r: ApiResponse<()> = ResultError::MissingAnswers(vec!["a".into(), "b".into()]).into();
        assert_eq!(r.status, BAD_REQUEST);
        assert_eq!(r.error.as_deref(), Some("Missing answers for questions: a, b"));

        let r: ApiResponse<()> =
            ResultError::Evaluation(EvaluationError::Parse("bad json".into())).into();
        assert_eq!((r.status, r.error.as_deref()), (INTERNAL_ERROR, Some("Evaluation failed")));
    }

    #[test]
    fn progress_conflict_is_409() {
        let r: ApiResponse<()> = ProgressError::AlreadyStarted {
            user_id: "u".into(),
            module_id: "m".into(),
        }
        .into();
        assert_eq!(r.status, CONFLICT);
        assert_eq!(r.error.as_deref(), Some("Progress already exists for this module"));
    }

    #[test]
    fn store_not_found_names_the_entity() {
        let r: ApiResponse<()> = StoreError::not_found("module", "m1").into();
        assert_eq!((r.status, r.error.as_deref()), (NOT_FOUND, Some("Module not found")));

        let r = found::<u8>(None, "quiz");
        assert_eq!(r.error.as_deref(), Some("Quiz not found"));
        assert_eq!(found(Some(1u8), "quiz").data, Some(1));
    }

    #[test]
    fn respond_uses_given_success_status() {
        let r = respond::<_, StoreError>(Ok("x"), CREATED);
        assert_eq!(r.status, CREATED);
        let r = respond::<&str, _>(Err(StoreError::Conflict("dup".into())), CREATED);
        assert_eq!(r.status, CONFLICT);
    }
}
