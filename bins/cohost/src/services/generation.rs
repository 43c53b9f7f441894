use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use cohost_core::cfg::GenerationCfg;
use cohost_core::error::GenerationError;

use super::{GenerationService, SizeClass};

/// OpenAI-compatible chat-completions client.
pub struct HttpGeneration {
    client: Client,
    url: String,
    model: String,
    api_key: Option<String>,
    budgets: [u32; 3],
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl HttpGeneration {
    /// Reads the API key from the environment variable named in `cfg`.
    pub fn new(cfg: &GenerationCfg) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()?;
        let api_key = std::env::var(&cfg.api_key_env).ok().filter(|k| !k.is_empty());
        if api_key.is_none() {
            tracing::warn!("{} not set; generation requests go out unauthenticated", cfg.api_key_env);
        }
        Ok(Self {
            client,
            url: format!("{}/chat/completions", cfg.base_url.trim_end_matches('/')),
            model: cfg.model.clone(),
            api_key,
            budgets: [cfg.small_tokens, cfg.medium_tokens, cfg.large_tokens],
        })
    }

    fn max_tokens(&self, size: SizeClass) -> u32 {
        match size {
            SizeClass::Small => self.budgets[0],
            SizeClass::Medium => self.budgets[1],
            SizeClass::Large => self.budgets[2],
        }
    }
}

#[async_trait]
impl GenerationService for HttpGeneration {
    async fn complete(&self, context: &str, size: SizeClass) -> Result<String, GenerationError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage { role: "user", content: context }],
            max_tokens: self.max_tokens(size),
        };
        debug!("generation request size={:?} chars={}", size, context.len());

        let mut req = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| GenerationError::Request { reason: e.to_string() })?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(GenerationError::Status { status: status.as_u16(), message });
        }

        let parsed: ChatResponse = resp.json().await.map_err(|e| GenerationError::Unparseable {
            what: "completion envelope",
            reason: e.to_string(),
        })?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(GenerationError::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn cfg(server: &MockServer) -> GenerationCfg {
        GenerationCfg {
            base_url: format!("{}/v1", server.uri()),
            api_key_env: "COHOST_TEST_UNSET_KEY".into(),
            ..GenerationCfg::default()
        }
    }

    #[tokio::test]
    async fn sends_size_budget_and_returns_trimmed_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(serde_json::json!({"max_tokens": 60})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "  hey chat!  "}}]
            })))
            .mount(&server)
            .await;

        let gen = HttpGeneration::new(&cfg(&server)).unwrap();
        assert_eq!(gen.complete("say hi", SizeClass::Small).await.unwrap(), "hey chat!");
    }

    #[tokio::test]
    async fn empty_choice_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
            .mount(&server)
            .await;

        let gen = HttpGeneration::new(&cfg(&server)).unwrap();
        assert!(matches!(gen.complete("x", SizeClass::Medium).await, Err(GenerationError::Empty)));
    }

    #[tokio::test]
    async fn upstream_failure_keeps_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let gen = HttpGeneration::new(&cfg(&server)).unwrap();
        match gen.complete("x", SizeClass::Large).await {
            Err(GenerationError::Status { status, .. }) => assert_eq!(status, 429),
            other => panic!("unexpected {other:?}"),
        }
    }
}
