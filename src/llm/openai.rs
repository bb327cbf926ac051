use crate::config::LlmSettings;
use crate::domain::ports::LlmClient;
use crate::utils::error::{AgentError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning_effort: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Client for any endpoint speaking the OpenAI chat completions protocol.
pub struct OpenAiClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    temperature: Option<f32>,
    reasoning_effort: Option<String>,
    max_retries: u32,
    retry_delay: Duration,
}

impl OpenAiClient {
    pub fn new(settings: &LlmSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", settings.base_url.trim_end_matches('/')),
            model: settings.model.clone(),
            api_key: settings.api_key.clone(),
            temperature: settings.temperature,
            reasoning_effort: settings.effective_reasoning_effort().map(str::to_string),
            max_retries: settings.max_retries,
            retry_delay: Duration::from_millis(settings.retry_delay_ms),
        })
    }

    fn chat_request<'a>(&'a self, prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            reasoning_effort: self.reasoning_effort.as_deref(),
        }
    }

    async fn send_once(&self, prompt: &str) -> Result<String> {
        let body = self.chat_request(prompt);

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(AgentError::LlmStatusError {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: ChatResponse =
            serde_json::from_str(&text).map_err(|e| AgentError::LlmResponseError {
                message: format!("invalid completion payload: {}", e),
            })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AgentError::LlmResponseError {
                message: "completion has no message content".to_string(),
            })
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let mut attempt = 0;
        loop {
            match self.send_once(prompt).await {
                Ok(content) => return Ok(content),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        "LLM request failed ({}), retry {}/{} in {:?}",
                        e,
                        attempt,
                        self.max_retries,
                        self.retry_delay
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn settings(base_url: String) -> LlmSettings {
        LlmSettings {
            base_url,
            api_key: Some("test-key".to_string()),
            max_retries: 2,
            retry_delay_ms: 1,
            timeout_seconds: 5,
            ..LlmSettings::default()
        }
    }

    #[tokio::test]
    async fn test_complete_returns_message_content() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/chat/completions")
                    .header("authorization", "Bearer test-key")
                    .body_contains("\"model\":\"o4-mini\"")
                    .body_contains("\"reasoning_effort\":\"high\"")
                    .body_contains("Describe PAY01");
                then.status(200)
                    .header("Content-Type", "application/json")
                    .json_body(json!({
                        "choices": [{"message": {"role": "assistant", "content": "PAY01 computes payroll."}}]
                    }));
            })
            .await;

        let client = OpenAiClient::new(&settings(server.base_url())).unwrap();
        let content = client.complete("Describe PAY01").await.unwrap();

        mock.assert_async().await;
        assert_eq!(content, "PAY01 computes payroll.");
        assert_eq!(client.model(), "o4-mini");
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(401).body("invalid api key");
            })
            .await;

        let client = OpenAiClient::new(&settings(server.base_url())).unwrap();
        let err = client.complete("hello").await.unwrap_err();

        assert_eq!(mock.hits_async().await, 1);
        match err {
            AgentError::LlmStatusError { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "invalid api key");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_server_error_is_retried() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(503);
            })
            .await;

        let client = OpenAiClient::new(&settings(server.base_url())).unwrap();
        assert!(client.complete("hello").await.is_err());

        assert_eq!(mock.hits_async().await, 3);
    }

    #[tokio::test]
    async fn test_rate_limit_is_retried() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(429).body("slow down");
            })
            .await;

        let client = OpenAiClient::new(&settings(server.base_url())).unwrap();
        let err = client.complete("hello").await.unwrap_err();

        assert_eq!(mock.hits_async().await, 3);
        assert!(matches!(err, AgentError::LlmStatusError { status: 429, .. }));
    }

    #[tokio::test]
    async fn test_connection_failure_is_retried() {
        // Grab a free port, then close it so every connection is refused.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let mut config = settings(format!("http://127.0.0.1:{}", port));
        config.retry_delay_ms = 40;

        let client = OpenAiClient::new(&config).unwrap();
        let started = std::time::Instant::now();
        let err = client.complete("hello").await.unwrap_err();

        assert!(matches!(err, AgentError::HttpError(_)));
        assert!(err.is_retryable());
        // Two retries, each after the configured delay.
        assert!(started.elapsed() >= Duration::from_millis(80));
    }

    #[test]
    fn test_chat_model_request_omits_reasoning_effort() {
        let config = LlmSettings {
            model: "gpt-4.1-nano".to_string(),
            temperature: Some(0.0),
            ..settings("http://localhost:8080/v1".to_string())
        };
        let client = OpenAiClient::new(&config).unwrap();

        let body = serde_json::to_value(client.chat_request("Describe PAY01")).unwrap();
        assert!(body.get("reasoning_effort").is_none());
        assert_eq!(body["model"], "gpt-4.1-nano");
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["messages"][0]["content"], "Describe PAY01");
    }

    #[test]
    fn test_reasoning_effort_can_be_switched_off() {
        let config = LlmSettings {
            reasoning_effort: Some("none".to_string()),
            ..settings("http://localhost:8080/v1".to_string())
        };
        let client = OpenAiClient::new(&config).unwrap();

        let body = serde_json::to_value(client.chat_request("hello")).unwrap();
        assert!(body.get("reasoning_effort").is_none());
        assert!(body.get("temperature").is_none());
    }

    #[tokio::test]
    async fn test_missing_content_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200).json_body(json!({"choices": []}));
            })
            .await;

        let client = OpenAiClient::new(&settings(server.base_url())).unwrap();
        let err = client.complete("hello").await.unwrap_err();
        assert!(matches!(err, AgentError::LlmResponseError { .. }));
    }
}
