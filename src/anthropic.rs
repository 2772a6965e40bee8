use crate::config::Config;
use crate::retry::{with_retry_if, RetryConfig};
use crate::translation::Translator;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Messages API request
#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Translation client backed by the Anthropic Messages API.
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    timeout: Duration,
    retry: RetryConfig,
}

impl AnthropicClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            api_url: config.anthropic_api_url.clone(),
            api_key: config.anthropic_api_key.clone(),
            model: config.anthropic_model.clone(),
            max_tokens: config.translation_max_tokens,
            timeout: config.translation_timeout(),
            retry: RetryConfig::translation(),
        })
    }

    /// Override the retry policy (tests use short delays)
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// One request with a deadline; a timeout is reported as an error so the
    /// retry loop can try again.
    async fn send_with_deadline(&self, request: &MessagesRequest<'_>) -> Result<String> {
        match tokio::time::timeout(self.timeout, self.send(request)).await {
            Ok(result) => result,
            Err(_) => bail!("Anthropic request timed out after {:?}", self.timeout),
        }
    }

    async fn send(&self, request: &MessagesRequest<'_>) -> Result<String> {
        let response = self
            .http
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .context("Failed to send translation request to Anthropic API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
            bail!("Anthropic API error ({}): {}", status, body);
        }

        let messages_response: MessagesResponse = response
            .json()
            .await
            .context("Failed to parse Anthropic translation response")?;

        if messages_response.stop_reason.as_deref() == Some("max_tokens") {
            bail!(
                "Anthropic translation was truncated at {} tokens (stop_reason: max_tokens)",
                self.max_tokens
            );
        }

        let text: String = messages_response
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text.as_deref())
            .collect();

        if text.trim().is_empty() {
            bail!("Anthropic translation response contained no text content");
        }

        Ok(text.trim().to_string())
    }
}

impl Translator for AnthropicClient {
    async fn translate(&self, instructions: &str, text: &str) -> Result<String> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: instructions,
            messages: vec![Message {
                role: "user",
                content: text,
            }],
            temperature: Some(0.3),
        };

        debug!(
            "Requesting translation of {} chars from {}",
            text.chars().count(),
            self.model
        );

        with_retry_if(
            &self.retry,
            "Anthropic translation",
            || self.send_with_deadline(&request),
            is_retryable_error,
        )
        .await
    }
}

/// Determine if an error is retryable (5xx/529 overload, 429 rate limit, 408,
/// network errors, timeouts). Other 4xx client errors and truncated output
/// would fail the same way again.
fn is_retryable_error(error: &anyhow::Error) -> bool {
    let error_str = error.to_string();

    if error_str.contains("truncated") {
        return false;
    }

    // Error format: "Anthropic API error (400 Bad Request): ..."
    if error_str.contains("Anthropic API error") {
        if let Some(start) = error_str.find('(') {
            if let Some(end) = error_str[start..].find(')') {
                let status_str = &error_str[start + 1..start + end];
                let status_num = status_str.split_whitespace().next().unwrap_or("");
                if let Ok(status) = status_num.parse::<u16>() {
                    return status == 408 || status == 429 || status >= 500;
                }
            }
        }
    }

    true
}
