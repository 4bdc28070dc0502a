//! Generative endpoint capability
//!
//! The fallback chain talks to the language model only through the
//! [`Generator`] trait, so it can be driven by a fake in tests and by
//! [`DisabledGenerator`] when no endpoint is configured.

use crate::config::LlmConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One generated completion
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<String>,
}

/// Pluggable text generation backend.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Send a one-shot prompt and return the candidates in order.
    async fn generate(&self, prompt: &str) -> Result<Vec<Candidate>>;

    /// Human-readable name (used in logs).
    fn name(&self) -> &str;
}

/// Request body for the generate endpoint
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
    temperature: f32,
    max_output_tokens: u32,
}

/// Response body from the generate endpoint
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

/// Generator backed by an HTTP endpoint with bearer authentication
pub struct HttpGenerator {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    temperature: f32,
    max_output_tokens: u32,
}

impl HttpGenerator {
    /// Create a generator from config, resolving the credential from the environment
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Self::with_api_key(config, config.resolve_api_key())
    }

    pub fn with_api_key(config: &LlmConfig, api_key: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        if api_key.is_none() {
            tracing::warn!(
                env = %config.api_key_env,
                "No API key for the generative endpoint; unmatched questions will use substring search"
            );
        }

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl Generator for HttpGenerator {
    async fn generate(&self, prompt: &str) -> Result<Vec<Candidate>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| Error::Llm("no API key configured".to_string()))?;

        let body = GenerateRequest {
            prompt,
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::Llm(format!("malformed response: {}", e)))?;

        Ok(parsed.candidates)
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Generator that always refuses, used when the endpoint is switched off
pub struct DisabledGenerator;

#[async_trait]
impl Generator for DisabledGenerator {
    async fn generate(&self, _prompt: &str) -> Result<Vec<Candidate>> {
        Err(Error::Llm("generative endpoint disabled".to_string()))
    }

    fn name(&self) -> &str {
        "disabled"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn config_for(url: String) -> LlmConfig {
        LlmConfig {
            endpoint: url,
            timeout_secs: 5,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_sends_prompt_and_parses_candidates() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/generate")
            .match_header("authorization", "Bearer test-key")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(serde_json::json!({
                "prompt": "hello",
                "temperature": 0.7,
                "max_output_tokens": 512
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"candidates": [{"content": "first"}, {"content": "second"}]}"#)
            .create_async()
            .await;

        let generator = HttpGenerator::with_api_key(
            &config_for(format!("{}/generate", server.url())),
            Some("test-key".to_string()),
        )
        .unwrap();
        let candidates = generator.generate("hello").await.unwrap();

        mock.assert_async().await;
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].content.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn test_error_status_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/generate")
            .with_status(503)
            .create_async()
            .await;

        let generator = HttpGenerator::with_api_key(
            &config_for(format!("{}/generate", server.url())),
            Some("k".to_string()),
        )
        .unwrap();
        assert!(matches!(
            generator.generate("hi").await,
            Err(Error::Http(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_body_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/generate")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let generator = HttpGenerator::with_api_key(
            &config_for(format!("{}/generate", server.url())),
            Some("k".to_string()),
        )
        .unwrap();
        assert!(matches!(generator.generate("hi").await, Err(Error::Llm(_))));
    }

    #[tokio::test]
    async fn test_missing_candidates_field_is_empty() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/generate")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let generator = HttpGenerator::with_api_key(
            &config_for(format!("{}/generate", server.url())),
            Some("k".to_string()),
        )
        .unwrap();
        assert!(generator.generate("hi").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_sending() {
        let generator =
            HttpGenerator::with_api_key(&config_for("http://127.0.0.1:9".to_string()), None)
                .unwrap();
        assert!(!generator.has_api_key());
        assert!(matches!(generator.generate("hi").await, Err(Error::Llm(_))));
    }

    #[tokio::test]
    async fn test_disabled_generator() {
        assert!(DisabledGenerator.generate("hi").await.is_err());
        assert_eq!(DisabledGenerator.name(), "disabled");
    }
}
