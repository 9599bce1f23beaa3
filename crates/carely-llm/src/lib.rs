// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use carely_app::{CompletionBackend, CompletionError};
use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_MAX_TOKENS: u32 = 500;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: &str) -> Self {
        Self {
            role: Role::System,
            content: content.to_owned(),
        }
    }

    pub fn user(content: &str) -> Self {
        Self {
            role: Role::User,
            content: content.to_owned(),
        }
    }
}

/// Blocking client for an OpenAI-compatible `/chat/completions` endpoint.
/// Cloning is cheap; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
    max_tokens: u32,
    temperature: f32,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("chat.base_url must not be empty");
        }
        let parsed = Url::parse(&base_url)
            .with_context(|| format!("chat.base_url {base_url:?} is not a valid URL"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!(
                "chat.base_url {base_url:?} must use http or https, got {}",
                parsed.scheme()
            );
        }
        if model.trim().is_empty() {
            bail!("chat.model must not be empty");
        }
        if timeout.is_zero() {
            bail!("chat.timeout must be positive");
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            model: model.trim().to_owned(),
            api_key: None,
            timeout,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            http,
        })
    }

    /// Blank keys leave the client unconfigured.
    pub fn with_api_key(mut self, api_key: Option<&str>) -> Self {
        self.api_key = api_key
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_owned);
        self
    }

    pub fn with_sampling(mut self, max_tokens: u32, temperature: f32) -> Result<Self> {
        if max_tokens == 0 {
            bail!("chat.max_tokens must be at least 1");
        }
        if !(0.0..=2.0).contains(&temperature) {
            bail!("chat.temperature must be between 0 and 2, got {temperature}");
        }
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        Ok(self)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn chat_complete(&self, messages: &[Message]) -> Result<String, CompletionError> {
        let request = ChatRequest::new(&self.model, messages, self.max_tokens, self.temperature);
        let mut builder = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .map_err(|error| CompletionError::Malformed(error.to_string()))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| CompletionError::Malformed("no choices in chat response".to_owned()))?;
        Ok(content.trim().to_owned())
    }
}

impl CompletionBackend for Client {
    fn is_configured(&self) -> bool {
        self.has_api_key()
    }

    fn complete(&self, system_prompt: &str, user_message: &str) -> Result<String, CompletionError> {
        tracing::debug!(model = %self.model, "sending chat completion");
        let result = self.chat_complete(&[
            Message::system(system_prompt),
            Message::user(user_message),
        ]);
        if let Err(error) = &result {
            tracing::warn!(base_url = %self.base_url, "chat completion failed: {error}");
        }
        result
    }
}

fn connection_error(base_url: &str, error: reqwest::Error) -> CompletionError {
    if error.is_timeout() {
        return CompletionError::Transport(format!(
            "request to {base_url} timed out; raise [chat] timeout or try again"
        ));
    }
    CompletionError::Transport(format!(
        "cannot reach {base_url}; check your connection and [chat] base_url ({error})"
    ))
}

fn clean_error_response(status: StatusCode, body: &str) -> CompletionError {
    if status == StatusCode::UNAUTHORIZED {
        return CompletionError::Unauthorized;
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        return CompletionError::RateLimited;
    }

    let code = status.as_u16();
    if let Ok(parsed) = serde_json::from_str::<OpenAIErrorEnvelope>(body)
        && let Some(error) = parsed.error
        && !error.message.is_empty()
    {
        return CompletionError::Status {
            code,
            message: error.message,
        };
    }

    let message = if body.len() < 100 && !body.contains('{') {
        body.trim().to_owned()
    } else {
        String::new()
    };
    CompletionError::Status { code, message }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

impl<'a> ChatRequest<'a> {
    fn new(model: &'a str, messages: &'a [Message], max_tokens: u32, temperature: f32) -> Self {
        Self {
            model,
            messages: messages
                .iter()
                .map(|message| ChatMessage {
                    role: message.role.as_str(),
                    content: &message.content,
                })
                .collect(),
            max_tokens,
            temperature,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorEnvelope {
    error: Option<OpenAIErrorBody>,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorBody {
    message: String,
}
