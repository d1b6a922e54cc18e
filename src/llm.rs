//! Chat completion providers.
//!
//! Query rewriting and reranking talk to an LLM through the
//! [`CompletionProvider`] trait. [`HttpCompletionProvider`] targets any
//! OpenAI-compatible `/chat/completions` endpoint; [`MockCompletionProvider`]
//! replays scripted responses and records every request so tests can assert
//! on prompt construction.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::types::RagError;

/// A single chat turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".into(),
            content: content.into(),
        }
    }
}

/// Requested shape of the model output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    /// Plain text (query rewriting).
    Text,
    /// A single JSON object (reranking).
    JsonObject,
}

/// A service that completes a chat conversation.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        format: ResponseFormat,
    ) -> Result<String, RagError>;
}

// ── HTTP provider ──────────────────────────────────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// Calls an OpenAI-compatible `/chat/completions` endpoint over HTTPS.
pub struct HttpCompletionProvider {
    client: reqwest::Client,
    endpoint: Url,
    api_key: String,
}

impl HttpCompletionProvider {
    /// Creates a provider against `endpoint` (the full `/chat/completions`
    /// URL).
    pub fn new(endpoint: Url, api_key: impl Into<String>) -> Result<Self, RagError> {
        let client = reqwest::Client::builder()
            .user_agent("brsr-rag/0.1")
            .build()?;
        Ok(Self {
            client,
            endpoint,
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl CompletionProvider for HttpCompletionProvider {
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        format: ResponseFormat,
    ) -> Result<String, RagError> {
        let response_format = match format {
            ResponseFormat::Text => None,
            ResponseFormat::JsonObject => Some(serde_json::json!({ "type": "json_object" })),
        };
        let request = ChatRequest {
            model,
            messages,
            response_format,
        };
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;
        let payload: ChatResponse = response
            .json()
            .await
            .map_err(|err| RagError::Completion(format!("malformed completion response: {err}")))?;
        payload
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| RagError::Completion("completion response had no choices".into()))
    }
}

// ── Mock provider ──────────────────────────────────────────────────────

/// A request observed by [`MockCompletionProvider`].
#[derive(Debug, Clone)]
pub struct RecordedCompletion {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub format: ResponseFormat,
}

enum MockBehavior {
    /// Pop scripted responses in order; error when exhausted.
    Scripted(VecDeque<Result<String, String>>),
    /// Every call fails with this message.
    AlwaysFail(String),
}

/// Scripted completion provider for tests.
pub struct MockCompletionProvider {
    behavior: Mutex<MockBehavior>,
    calls: Mutex<Vec<RecordedCompletion>>,
}

impl Default for MockCompletionProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCompletionProvider {
    pub fn new() -> Self {
        Self {
            behavior: Mutex::new(MockBehavior::Scripted(VecDeque::new())),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A provider whose every call fails, for exercising fallback paths.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            behavior: Mutex::new(MockBehavior::AlwaysFail(message.into())),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queues a successful response.
    pub fn push_response(&self, content: impl Into<String>) {
        if let MockBehavior::Scripted(queue) =
            &mut *self.behavior.lock().expect("mock behavior lock poisoned")
        {
            queue.push_back(Ok(content.into()));
        }
    }

    /// Queues a failed call.
    pub fn push_error(&self, message: impl Into<String>) {
        if let MockBehavior::Scripted(queue) =
            &mut *self.behavior.lock().expect("mock behavior lock poisoned")
        {
            queue.push_back(Err(message.into()));
        }
    }

    /// All requests observed so far.
    pub fn calls(&self) -> Vec<RecordedCompletion> {
        self.calls.lock().expect("mock calls lock poisoned").clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("mock calls lock poisoned").len()
    }
}

#[async_trait]
impl CompletionProvider for MockCompletionProvider {
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        format: ResponseFormat,
    ) -> Result<String, RagError> {
        self.calls
            .lock()
            .expect("mock calls lock poisoned")
            .push(RecordedCompletion {
                model: model.to_string(),
                messages: messages.to_vec(),
                format,
            });
        match &mut *self.behavior.lock().expect("mock behavior lock poisoned") {
            MockBehavior::AlwaysFail(message) => Err(RagError::Completion(message.clone())),
            MockBehavior::Scripted(queue) => match queue.pop_front() {
                Some(Ok(content)) => Ok(content),
                Some(Err(message)) => Err(RagError::Completion(message)),
                None => Err(RagError::Completion("mock responses exhausted".into())),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_replays_in_order_and_records() {
        let mock = MockCompletionProvider::new();
        mock.push_response("first");
        mock.push_error("second fails");

        let messages = [ChatMessage::user("hello")];
        let first = mock
            .complete("test-model", &messages, ResponseFormat::Text)
            .await
            .unwrap();
        assert_eq!(first, "first");

        let second = mock
            .complete("test-model", &messages, ResponseFormat::Text)
            .await;
        assert!(second.is_err());

        let calls = mock.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].model, "test-model");
        assert_eq!(calls[0].messages[0].content, "hello");
    }

    #[tokio::test]
    async fn failing_mock_always_errors() {
        let mock = MockCompletionProvider::failing("down");
        let result = mock
            .complete("m", &[ChatMessage::user("q")], ResponseFormat::JsonObject)
            .await;
        assert!(matches!(result, Err(RagError::Completion(_))));
    }
}
