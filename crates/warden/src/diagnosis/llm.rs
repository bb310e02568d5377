//! LLM client — OpenAI-compatible chat completions behind a trait seam.

use std::pin::Pin;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::conf::model::LlmConfig;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("LLM API key missing")]
    MissingApiKey,
    #[error("LLM request failed: {0}")]
    Request(String),
    #[error("LLM returned an empty response")]
    EmptyResponse,
}

/// Chat capability. The analyze node only needs "give me text for these
/// two messages" plus an availability probe for the no-credential path.
pub trait ChatModel: Send + Sync {
    /// Whether a credential is configured at all.
    fn available(&self) -> bool;

    fn chat<'a>(
        &'a self,
        system: &'a str,
        user: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<String, LlmError>> + Send + 'a>>;
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: String,
}

pub struct LlmClient {
    config: LlmConfig,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Self {
        Self { config }
    }

    async fn request_once(&self, system: &str, user: &str) -> Result<String, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_seconds.max(1)))
            .build()
            .map_err(|e| LlmError::Request(e.to_string()))?;

        let url = format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let body = serde_json::json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
        });

        let response = client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::Request(format!("HTTP {status}: {text}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();
        if content.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(content)
    }
}

impl ChatModel for LlmClient {
    fn available(&self) -> bool {
        !self.config.api_key.is_empty()
    }

    fn chat<'a>(
        &'a self,
        system: &'a str,
        user: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<String, LlmError>> + Send + 'a>> {
        Box::pin(async move {
            if !self.available() {
                return Err(LlmError::MissingApiKey);
            }

            let attempts = self.config.max_retries.max(1);
            let mut last_error = LlmError::EmptyResponse;
            for attempt in 1..=attempts {
                match self.request_once(system, user).await {
                    Ok(text) => return Ok(text),
                    Err(e) => {
                        warn!(attempt, attempts, "LLM call failed: {e}");
                        last_error = e;
                        if attempt < attempts {
                            tokio::time::sleep(Duration::from_secs(1)).await;
                        }
                    }
                }
            }
            Err(last_error)
        })
    }
}

/// Scripted chat double. Counts invocations so tests can assert the rule
/// pre-check short-circuited the model.
#[cfg(test)]
pub struct FakeChat {
    response: std::sync::Mutex<Option<Result<String, String>>>,
    pub calls: std::sync::atomic::AtomicUsize,
    available: bool,
}

#[cfg(test)]
impl FakeChat {
    pub fn replying(text: &str) -> Self {
        Self {
            response: std::sync::Mutex::new(Some(Ok(text.to_string()))),
            calls: std::sync::atomic::AtomicUsize::new(0),
            available: true,
        }
    }

    pub fn failing(error: &str) -> Self {
        Self {
            response: std::sync::Mutex::new(Some(Err(error.to_string()))),
            calls: std::sync::atomic::AtomicUsize::new(0),
            available: true,
        }
    }

    pub fn unconfigured() -> Self {
        Self {
            response: std::sync::Mutex::new(None),
            calls: std::sync::atomic::AtomicUsize::new(0),
            available: false,
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
impl ChatModel for FakeChat {
    fn available(&self) -> bool {
        self.available
    }

    fn chat<'a>(
        &'a self,
        _system: &'a str,
        _user: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<String, LlmError>> + Send + 'a>> {
        Box::pin(async move {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            match self.response.lock().unwrap().clone() {
                Some(Ok(text)) => Ok(text),
                Some(Err(e)) => Err(LlmError::Request(e)),
                None => Err(LlmError::MissingApiKey),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn availability_tracks_api_key() {
        let mut config = LlmConfig::default();
        assert!(!LlmClient::new(config.clone()).available());
        config.api_key = "sk-test".to_string();
        assert!(LlmClient::new(config).available());
    }

    #[tokio::test]
    async fn chat_without_key_fails_fast() {
        let client = LlmClient::new(LlmConfig::default());
        let result = client.chat("system", "user").await;
        assert!(matches!(result, Err(LlmError::MissingApiKey)));
    }

    #[test]
    fn response_shape_parses() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"{\"command\":\"NONE\"}"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content, "{\"command\":\"NONE\"}");
    }
}
