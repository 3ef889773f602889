//! Minimal client for the Ollama chat API.
//!
//! Sync HTTP over [`ureq`]; one blocking request per call with a global
//! timeout. The endpoint comes from `OLLAMA_HOST` or falls back to the
//! local default.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use ureq::Agent;

use crate::error::AgentError;

/// Default model when none is configured.
pub const DEFAULT_MODEL: &str = "llama3.1:8b";

/// Default Ollama endpoint.
const DEFAULT_HOST: &str = "http://localhost:11434";

/// Environment variable overriding the endpoint.
const HOST_ENV: &str = "OLLAMA_HOST";

/// HTTP timeout in seconds; generation on a local model can be slow.
const REQUEST_TIMEOUT: u64 = 120;

/// One message in a chat exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// `user` or `assistant`.
    pub role: String,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// Build a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_owned(),
            content: content.into(),
        }
    }

    /// Build an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_owned(),
            content: content.into(),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

/// Blocking client for one Ollama model.
pub struct OllamaClient {
    agent: Agent,
    host: String,
    model: String,
}

impl OllamaClient {
    /// Create a client for the given model, reading the endpoint from
    /// `OLLAMA_HOST` when set.
    pub fn new(model: impl Into<String>) -> Self {
        let host = std::env::var(HOST_ENV).unwrap_or_else(|_| DEFAULT_HOST.to_owned());
        Self::with_host(host, model)
    }

    /// Create a client against an explicit endpoint.
    pub fn with_host(host: impl Into<String>, model: impl Into<String>) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(REQUEST_TIMEOUT)))
            .http_status_as_error(false)
            .build()
            .into();
        let host: String = host.into();
        Self {
            agent,
            host: host.trim_end_matches('/').to_owned(),
            model: model.into(),
        }
    }

    /// The configured model identifier.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a chat request and return the assistant's reply text.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Http`] on transport failure,
    /// [`AgentError::HttpStatus`] on a non-success status, and
    /// [`AgentError::Http`] again when the response body is not the
    /// expected JSON shape.
    pub fn chat(&self, messages: &[ChatMessage]) -> Result<String, AgentError> {
        let url = format!("{}/api/chat", self.host);
        let request = ChatRequest {
            model: &self.model,
            messages,
            stream: false,
        };

        tracing::debug!(url = %url, model = %self.model, "sending chat request");
        let mut response = self.agent.post(&url).send_json(&request)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.body_mut().read_to_string().unwrap_or_default();
            return Err(AgentError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.body_mut().read_json()?;
        Ok(parsed.message.content)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn trailing_slash_is_stripped_from_host() {
        let client = OllamaClient::with_host("http://localhost:11434/", DEFAULT_MODEL);
        assert_eq!(client.host, "http://localhost:11434");
    }

    #[test]
    fn chat_request_serializes_to_ollama_shape() {
        let messages = [ChatMessage::user("hello")];
        let request = ChatRequest {
            model: "llama3.1:8b",
            messages: &messages,
            stream: false,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "llama3.1:8b");
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "hello");
    }
}
