//! Groq chat-completions client (OpenAI-compatible wire format).
//!
//! Behaviour:
//! - The whole turn list is sent on every call; the provider keeps no state.
//! - A missing API key is reported as [`GatewayError::Unavailable`] without any network I/O.
//! - Every call is bounded by the configured request timeout.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ProviderConfig;
use crate::conversation::turn::Turn;
use crate::llm::gateway::{CompletionGateway, GatewayError, GatewayFuture, GatewayResult};

/// Longest provider error body kept in logs.
const MAX_LOGGED_ERROR_CHARS: usize = 512;

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Async client for a Groq (or any OpenAI-compatible) completion endpoint.
pub struct GroqGateway {
    client: Client,
    config: ProviderConfig,
}

impl GroqGateway {
    /// Create a client from provider settings.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ProviderConfig) -> GatewayResult<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    async fn post_completion(&self, api_key: &str, turns: &[Turn]) -> GatewayResult<String> {
        let messages = turns
            .iter()
            .map(|turn| ChatMessage {
                role: turn.role().as_str(),
                content: turn.content(),
            })
            .collect();
        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        debug!(model = %self.config.model, turns = turns.len(), "Requesting completion");

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(MAX_LOGGED_ERROR_CHARS).collect();
            warn!(status = status.as_u16(), %body, "Completion provider returned an error");
            return Err(GatewayError::Call(format!(
                "provider returned status {}",
                status.as_u16()
            )));
        }

        let parsed = response.json::<ChatCompletionResponse>().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| GatewayError::Call("provider returned no content".to_string()))
    }
}

impl CompletionGateway for GroqGateway {
    fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    fn complete(&self, turns: Vec<Turn>) -> GatewayFuture<'_, GatewayResult<String>> {
        Box::pin(async move {
            let Some(api_key) = self.config.api_key.as_deref() else {
                return Err(GatewayError::Unavailable);
            };
            self.post_completion(api_key, &turns).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_uses_openai_shape() {
        let turns = [Turn::system("rules"), Turn::user("salut")];
        let request = ChatCompletionRequest {
            model: "llama-3.3-70b-versatile",
            messages: turns
                .iter()
                .map(|t| ChatMessage {
                    role: t.role().as_str(),
                    content: t.content(),
                })
                .collect(),
            temperature: 1.2,
            max_tokens: 300,
        };

        let value = serde_json::to_value(&request).unwrap_or_default();
        assert_eq!(value["model"], "llama-3.3-70b-versatile");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "salut");
        assert_eq!(value["max_tokens"], 300);
    }

    #[test]
    fn test_response_parsing_takes_first_choice() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"pandas en skate"}}]}"#;
        let parsed: Result<ChatCompletionResponse, _> = serde_json::from_str(raw);
        let content = parsed
            .ok()
            .and_then(|p| p.choices.into_iter().next())
            .and_then(|c| c.message.content);
        assert_eq!(content.as_deref(), Some("pandas en skate"));
    }

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let config = ProviderConfig {
            base_url: "https://example.test/v1/".to_string(),
            ..ProviderConfig::default()
        };
        let gateway = GroqGateway::new(config);
        assert!(gateway.is_ok_and(|g| g.endpoint() == "https://example.test/v1/chat/completions"));
    }

    #[tokio::test]
    async fn test_missing_key_is_unavailable_without_network() {
        let config = ProviderConfig {
            api_key: None,
            ..ProviderConfig::default()
        };
        let Ok(gateway) = GroqGateway::new(config) else {
            return;
        };

        assert!(!gateway.is_configured());
        let result = gateway.complete(vec![Turn::user("x")]).await;
        assert!(matches!(result, Err(GatewayError::Unavailable)));
    }
}
