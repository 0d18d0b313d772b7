use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};

use crate::config::OpenAiConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, Serialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: String,
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
}

/// One chat-completion round trip.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<PromptMessage>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// Ask the service to constrain output to a JSON object.
    pub json_output: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("no OpenAI API key configured")]
    MissingApiKey,
    #[error("completion request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("completion service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("completion response carried no message content")]
    EmptyResponse,
}

/// A language model that turns a prompt into generated text.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;
}

pub struct OpenAiClient {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(config: &OpenAiConfig) -> Self {
        if config.api_key.is_none() {
            tracing::warn!("OPENAI_API_KEY not set; AI features will use fallback responses");
        }
        Self {
            client: Client::new(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.clone(),
        }
    }

    fn request_body(&self, request: &CompletionRequest) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": request.messages,
            "temperature": request.temperature,
        });
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        if request.json_output {
            body["response_format"] = json!({ "type": "json_object" });
        }
        body
    }
}

#[async_trait]
impl CompletionModel for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let api_key = self.api_key.as_deref().ok_or(CompletionError::MissingApiKey)?;
        let url = format!("{}/chat/completions", self.base_url);

        let res = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&self.request_body(request))
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(CompletionError::Status { status, body });
        }

        let json: Value = res.json().await?;
        message_content(&json)
            .map(str::to_string)
            .ok_or(CompletionError::EmptyResponse)
    }
}

/// Extracts `choices[0].message.content`, treating blank content as absent.
fn message_content(json: &Value) -> Option<&str> {
    json["choices"][0]["message"]["content"]
        .as_str()
        .filter(|text| !text.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_for(base_url: &str, api_key: Option<&str>) -> OpenAiClient {
        OpenAiClient::new(&OpenAiConfig {
            api_key: api_key.map(str::to_string),
            model: "gpt-4o".to_string(),
            base_url: base_url.to_string(),
        })
    }

    fn analysis_request() -> CompletionRequest {
        CompletionRequest {
            messages: vec![PromptMessage::system("be precise"), PromptMessage::user("hello")],
            temperature: 0.3,
            max_tokens: None,
            json_output: true,
        }
    }

    #[test]
    fn test_request_body_shape() {
        let client = client_for("http://unused", Some("sk-test"));
        let body = client.request_body(&analysis_request());
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hello");
        assert_eq!(body["response_format"]["type"], "json_object");
        assert!(body.get("max_tokens").is_none());

        let chat = CompletionRequest {
            max_tokens: Some(500),
            json_output: false,
            ..analysis_request()
        };
        let body = client.request_body(&chat);
        assert_eq!(body["max_tokens"], 500);
        assert!(body.get("response_format").is_none());
    }

    #[test]
    fn test_message_content_extraction() {
        let ok = json!({"choices": [{"message": {"role": "assistant", "content": "hi there"}}]});
        assert_eq!(message_content(&ok), Some("hi there"));
        assert_eq!(message_content(&json!({"choices": []})), None);
        let blank = json!({"choices": [{"message": {"content": "   "}}]});
        assert_eq!(message_content(&blank), None);
    }

    #[tokio::test]
    async fn test_missing_api_key_short_circuits() {
        let client = client_for("http://127.0.0.1:1", None);
        let err = client.complete(&analysis_request()).await.unwrap_err();
        assert!(matches!(err, CompletionError::MissingApiKey));
    }

    #[tokio::test]
    async fn test_complete_against_mock_server() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"{\"anxiety\":0.2}"}}]}"#)
            .create_async()
            .await;

        let client = client_for(&server.url(), Some("sk-test"));
        let text = client.complete(&analysis_request()).await.unwrap();
        assert_eq!(text, r#"{"anxiety":0.2}"#);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body("rate limited")
            .create_async()
            .await;

        let client = client_for(&server.url(), Some("sk-test"));
        match client.complete(&analysis_request()).await {
            Err(CompletionError::Status { status, body }) => {
                assert_eq!(status, 429);
                assert_eq!(body, "rate limited");
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }
}
