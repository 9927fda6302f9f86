//! Core `LlmClient` trait and `OpenAiClient` implementation.
//!
//! `OpenAiClient` calls any OpenAI-compatible `/v1/chat/completions` endpoint
//! that supports `response_format: {type: "json_schema"}`.  All connection
//! details come from [`LlmConfig`]; nothing is hardcoded.

use async_trait::async_trait;
use thiserror::Error;

use crate::config::LlmConfig;
use crate::llm::schema::ResponseSchema;

// ---------------------------------------------------------------------------
// LlmError
// ---------------------------------------------------------------------------

/// Errors that can occur during a structured completion.
#[derive(Debug, Clone, Error)]
pub enum LlmError {
    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("LLM request timed out")]
    Timeout,

    /// The provider answered with a non-success status code.
    #[error("LLM provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The HTTP response could not be parsed as expected JSON.
    #[error("failed to parse LLM response: {0}")]
    Parse(String),

    /// The model declined to answer.
    #[error("LLM refused the request: {0}")]
    Refused(String),

    /// The LLM returned a response with no usable content.
    #[error("No content in LLM response")]
    EmptyResponse,
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// StructuredRequest
// ---------------------------------------------------------------------------

/// One schema-constrained completion: a system instruction, a user
/// instruction and the schema the reply must conform to.
#[derive(Debug, Clone)]
pub struct StructuredRequest {
    pub system: String,
    pub user: String,
    pub schema: ResponseSchema,
}

// ---------------------------------------------------------------------------
// LlmClient trait
// ---------------------------------------------------------------------------

/// Async trait for schema-constrained text generation.
///
/// Implementors must be `Send + Sync` so they can be shared across tasks
/// (e.g. wrapped in `Arc<dyn LlmClient>`).  The returned string is the raw
/// JSON document produced by the model; parsing belongs to the caller.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &StructuredRequest) -> Result<String, LlmError>;
}

// ---------------------------------------------------------------------------
// OpenAiClient
// ---------------------------------------------------------------------------

/// Calls an OpenAI-compatible `/v1/chat/completions` endpoint in strict
/// structured-output mode.
pub struct OpenAiClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl OpenAiClient {
    /// Build an `OpenAiClient` from application config.
    ///
    /// The HTTP client is pre-configured with the per-request timeout from
    /// `config.timeout_secs`.  A default (no-timeout) client is used as a
    /// last-resort fallback if the builder fails.
    pub fn from_config(config: &LlmConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    /// The `Authorization: Bearer …` header is attached only when
    /// `config.api_key` is non-empty, so local OpenAI-compatible servers work
    /// without a key.
    async fn complete(&self, request: &StructuredRequest) -> Result<String, LlmError> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user",   "content": request.user   }
            ],
            "response_format": request.schema.response_format()
        });

        let mut req = self.client.post(&url).json(&body);

        let key = self.config.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            req = req.bearer_auth(key);
        }

        log::debug!(
            "llm: POST {url} model={} schema={}",
            self.config.model,
            request.schema.name
        );
        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        let message = &json["choices"][0]["message"];
        if let Some(refusal) = message["refusal"].as_str() {
            return Err(LlmError::Refused(refusal.to_string()));
        }

        let content = message["content"]
            .as_str()
            .ok_or(LlmError::EmptyResponse)?
            .trim()
            .to_string();

        if content.is_empty() {
            return Err(LlmError::EmptyResponse);
        }

        Ok(content)
    }
}

// ---------------------------------------------------------------------------
// ScriptedLlm  (test-only)
// ---------------------------------------------------------------------------

/// A test double that replays queued replies in order and records every
/// request it receives.  When the queue runs dry it answers `EmptyResponse`.
#[cfg(test)]
pub struct ScriptedLlm {
    replies: std::sync::Mutex<std::collections::VecDeque<Result<String, LlmError>>>,
    requests: std::sync::Mutex<Vec<StructuredRequest>>,
}

#[cfg(test)]
impl ScriptedLlm {
    pub fn new(replies: Vec<Result<String, LlmError>>) -> Self {
        Self {
            replies: std::sync::Mutex::new(replies.into()),
            requests: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// A mock that answers a single call with `json`.
    pub fn ok(json: impl Into<String>) -> Self {
        Self::new(vec![Ok(json.into())])
    }

    pub fn err(error: LlmError) -> Self {
        Self::new(vec![Err(error)])
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<StructuredRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, request: &StructuredRequest) -> Result<String, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(LlmError::EmptyResponse))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::schema::module_generation_schema;
    use mockito::{Matcher, Server};

    fn make_config(base_url: &str, api_key: Option<&str>) -> LlmConfig {
        LlmConfig {
            base_url: base_url.into(),
            api_key: api_key.map(|s| s.to_string()),
            model: "gpt-test".into(),
            timeout_secs: 5,
        }
    }

    fn request() -> StructuredRequest {
        StructuredRequest {
            system: "system text".into(),
            user: "user text".into(),
            schema: module_generation_schema(),
        }
    }

    fn completion(content: serde_json::Value) -> String {
        serde_json::json!({
            "choices": [ { "message": { "role": "assistant", "content": content } } ]
        })
        .to_string()
    }

    #[tokio::test]
    async fn returns_message_content() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "model": "gpt-test",
                "response_format": { "type": "json_schema" }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(completion(serde_json::json!("{\"ok\":true}")))
            .create_async()
            .await;

        let client = OpenAiClient::from_config(&make_config(&server.url(), Some("sk-test")));
        let content = client.complete(&request()).await.unwrap();

        assert_eq!(content, "{\"ok\":true}");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn omits_authorization_without_key() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_body(completion(serde_json::json!("{}")))
            .create_async()
            .await;

        let client = OpenAiClient::from_config(&make_config(&server.url(), Some("")));
        client.complete(&request()).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(429)
            .with_body("rate limited")
            .create_async()
            .await;

        let client = OpenAiClient::from_config(&make_config(&server.url(), None));
        let err = client.complete(&request()).await.unwrap_err();
        assert!(matches!(err, LlmError::Status { status: 429, ref body } if body == "rate limited"));
    }

    #[tokio::test]
    async fn null_content_is_empty_response() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(completion(serde_json::Value::Null))
            .create_async()
            .await;

        let client = OpenAiClient::from_config(&make_config(&server.url(), None));
        let err = client.complete(&request()).await.unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse));
    }

    #[tokio::test]
    async fn refusal_is_surfaced() {
        let mut server = Server::new_async().await;
        let body = serde_json::json!({
            "choices": [ { "message": { "content": null, "refusal": "nope" } } ]
        });
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let client = OpenAiClient::from_config(&make_config(&server.url(), None));
        let err = client.complete(&request()).await.unwrap_err();
        assert!(matches!(err, LlmError::Refused(ref r) if r == "nope"));
    }

    #[tokio::test]
    async fn malformed_body_is_parse_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let client = OpenAiClient::from_config(&make_config(&server.url(), None));
        let err = client.complete(&request()).await.unwrap_err();
        assert!(matches!(err, LlmError::Parse(_)));
    }

    /// Verify that `OpenAiClient` is object-safe (usable as `dyn LlmClient`).
    #[test]
    fn client_is_object_safe() {
        let client: Box<dyn LlmClient> =
            Box::new(OpenAiClient::from_config(&LlmConfig::default()));
        drop(client);
    }

    #[test]
    fn reports_configured_model() {
        let client = OpenAiClient::from_config(&make_config("http://localhost", None));
        assert_eq!(client.model(), "gpt-test");
    }

    #[tokio::test]
    async fn scripted_llm_replays_in_order() {
        let llm = ScriptedLlm::new(vec![Ok("one".into()), Err(LlmError::Timeout)]);
        assert_eq!(llm.complete(&request()).await.unwrap(), "one");
        assert!(matches!(llm.complete(&request()).await, Err(LlmError::Timeout)));
        assert!(matches!(
            llm.complete(&request()).await,
            Err(LlmError::EmptyResponse)
        ));
        assert_eq!(llm.calls(), 3);
    }
}
