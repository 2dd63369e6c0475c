/// LLM Client: the single point of entry for all chat-completion calls.
///
/// No other module may talk to the provider directly. Callers depend on the
/// `ChatCompletion` trait so the provider can be swapped or stubbed.
///
/// Speaks the OpenAI-compatible `/chat/completions` protocol; the model, key
/// and base URL come from `Config`.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;

/// Typed failure of a single completion exchange.
///
/// Display strings never include the API key or the request body.
#[derive(Debug, Error)]
pub enum LlmRequestError {
    #[error("LLM request timed out")]
    Timeout,

    #[error("Could not reach LLM provider: {0}")]
    Connect(String),

    #[error("LLM provider rate limited the request (status {status})")]
    RateLimited { status: u16 },

    #[error("LLM provider rejected the credentials (status {status})")]
    Unauthorized { status: u16 },

    #[error("LLM provider error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed LLM response: {0}")]
    MalformedResponse(String),

    #[error("LLM returned empty content")]
    EmptyContent,
}

impl LlmRequestError {
    /// Whether the same request could succeed if sent again later.
    /// Authentication and response-shape failures are permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            LlmRequestError::Timeout
            | LlmRequestError::Connect(_)
            | LlmRequestError::RateLimited { .. } => true,
            LlmRequestError::Api { status, .. } => *status >= 500,
            LlmRequestError::Unauthorized { .. }
            | LlmRequestError::MalformedResponse(_)
            | LlmRequestError::EmptyContent => false,
        }
    }

    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmRequestError::Timeout
        } else if err.is_decode() {
            LlmRequestError::MalformedResponse(err.without_url().to_string())
        } else {
            LlmRequestError::Connect(err.without_url().to_string())
        }
    }

    fn from_status(status: StatusCode, message: String) -> Self {
        match status.as_u16() {
            401 | 403 => LlmRequestError::Unauthorized {
                status: status.as_u16(),
            },
            429 => LlmRequestError::RateLimited {
                status: status.as_u16(),
            },
            code => LlmRequestError::Api {
                status: code,
                message,
            },
        }
    }
}

/// A role-tagged conversation message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// One request/response exchange with a text-completion service.
///
/// Carried in `AppState` as `Arc<dyn ChatCompletion>`.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    /// Sends `messages` and returns the first candidate's text.
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, LlmRequestError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    error: ProviderErrorBody,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    message: String,
}

/// HTTP chat-completions client. Cheap to clone; the connection pool is shared.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl LlmClient {
    pub fn new(
        base_url: &str,
        api_key: String,
        model: String,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<Self, LlmRequestError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmRequestError::Connect(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key,
            model,
            max_tokens,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, LlmRequestError> {
        Self::new(
            &config.ai_api_base_url,
            config.ai_api_key.clone(),
            config.ai_model.clone(),
            config.llm_max_tokens,
            config.llm_timeout,
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ChatCompletion for LlmClient {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, LlmRequestError> {
        let request_body = ChatRequest {
            model: &self.model,
            messages,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(LlmRequestError::from_reqwest)?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Try to parse error message
            let message = serde_json::from_str::<ProviderError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            let err = LlmRequestError::from_status(status, message);
            if err.is_transient() {
                warn!("LLM provider returned {status}; request not retried");
            }
            return Err(err);
        }

        let body = response.text().await.map_err(LlmRequestError::from_reqwest)?;
        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| LlmRequestError::MalformedResponse(e.to_string()))?;

        if let Some(usage) = &parsed.usage {
            debug!(
                "LLM call succeeded: prompt_tokens={}, completion_tokens={}",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        let content = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmRequestError::MalformedResponse("response has no choices".into()))?
            .message
            .content
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(LlmRequestError::EmptyContent);
        }

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(LlmRequestError::Timeout.is_transient());
        assert!(LlmRequestError::Connect("dns".into()).is_transient());
        assert!(LlmRequestError::RateLimited { status: 429 }.is_transient());
        assert!(LlmRequestError::Api {
            status: 503,
            message: "overloaded".into()
        }
        .is_transient());

        assert!(!LlmRequestError::Unauthorized { status: 401 }.is_transient());
        assert!(!LlmRequestError::Api {
            status: 400,
            message: "bad model".into()
        }
        .is_transient());
        assert!(!LlmRequestError::MalformedResponse("eof".into()).is_transient());
        assert!(!LlmRequestError::EmptyContent.is_transient());
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            LlmRequestError::from_status(StatusCode::UNAUTHORIZED, String::new()),
            LlmRequestError::Unauthorized { status: 401 }
        ));
        assert!(matches!(
            LlmRequestError::from_status(StatusCode::FORBIDDEN, String::new()),
            LlmRequestError::Unauthorized { status: 403 }
        ));
        assert!(matches!(
            LlmRequestError::from_status(StatusCode::TOO_MANY_REQUESTS, String::new()),
            LlmRequestError::RateLimited { status: 429 }
        ));
        assert!(matches!(
            LlmRequestError::from_status(StatusCode::BAD_GATEWAY, "upstream".into()),
            LlmRequestError::Api { status: 502, .. }
        ));
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        let client = LlmClient::new(
            "http://localhost:8000/v1/",
            "key".into(),
            "model".into(),
            1024,
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(client.endpoint, "http://localhost:8000/v1/chat/completions");
        assert_eq!(client.model(), "model");
    }

    #[test]
    fn test_request_serializes_openai_shape() {
        let messages = vec![ChatMessage::user("hi")];
        let body = ChatRequest {
            model: "m",
            messages: &messages,
            max_tokens: 1024,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["model"], "m");
        assert_eq!(value["max_tokens"], 1024);
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["messages"][0]["content"], "hi");
    }
}
