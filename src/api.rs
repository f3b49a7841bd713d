//! Language-model API clients.
//!
//! The module uses a trait-based design:
//! - [`AskAsync`]: one prompt in, one completion out
//! - [`OpenAiClient`], [`GeminiClient`], [`AnthropicClient`]: HTTP vendors
//! - [`MockClient`]: deterministic offline stand-in
//! - [`LlmClient`]: enum over the above, built from configuration
//!
//! Calls are made exactly once. A failing provider surfaces as
//! [`PipelineError::QuotaExceeded`] or [`PipelineError::Provider`]; the caller
//! decides whether to skip the article or switch provider.

use crate::config::{AiConfig, AiProvider, resolve_api_key};
use crate::error::{PipelineError, Result};
use serde_json::{Value, json};
use std::time::{Duration, Instant};
use tracing::{instrument, warn};

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// What a prompt asks for; lets the mock answer in the expected shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Script,
    ThumbnailTitles,
    Metadata,
}

#[derive(Debug, Clone)]
pub struct Prompt {
    pub kind: PromptKind,
    /// Headline of the article the prompt is about.
    pub subject: String,
    pub text: String,
}

/// Trait for async LLM interaction.
pub trait AskAsync {
    /// Human-readable provider name for logs and error messages.
    fn name(&self) -> &'static str;

    /// Send the prompt and return the raw completion text.
    async fn ask(&self, prompt: &Prompt) -> Result<String>;
}

/// Sampling parameters shared by every HTTP client.
#[derive(Debug, Clone)]
struct Sampling {
    model: String,
    temperature: f32,
    max_tokens: u32,
}

fn http_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .build()?)
}

fn missing_text(provider: &str, body: &Value) -> PipelineError {
    PipelineError::MalformedResponse {
        provider: provider.to_string(),
        reason: format!("no completion text in {}", crate::utils::truncate_for_log(&body.to_string(), 300)),
    }
}

/// OpenAI chat completions.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    sampling: Sampling,
}

impl OpenAiClient {
    pub fn new(api_key: String, model: Option<String>, temperature: f32, max_tokens: u32) -> Result<Self> {
        Ok(Self {
            http: http_client()?,
            api_key,
            base_url: OPENAI_API_URL.to_string(),
            sampling: Sampling {
                model: model.unwrap_or_else(|| "gpt-4o".to_string()),
                temperature,
                max_tokens,
            },
        })
    }

    fn request_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.sampling.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": self.sampling.temperature,
            "max_tokens": self.sampling.max_tokens,
        })
    }
}

pub(crate) fn openai_text(body: &Value) -> Option<&str> {
    body["choices"][0]["message"]["content"].as_str()
}

impl AskAsync for OpenAiClient {
    fn name(&self) -> &'static str {
        "OpenAI"
    }

    #[instrument(level = "info", skip_all, fields(provider = "OpenAI", model = %self.sampling.model))]
    async fn ask(&self, prompt: &Prompt) -> Result<String> {
        let response = self
            .http
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(&prompt.text))
            .send()
            .await?;
        let body: Value = PipelineError::check(self.name(), response).await?.json().await?;
        openai_text(&body)
            .map(str::to_string)
            .ok_or_else(|| missing_text(self.name(), &body))
    }
}

/// Google Gemini `generateContent`.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    sampling: Sampling,
}

impl GeminiClient {
    pub fn new(api_key: String, model: Option<String>, temperature: f32, max_tokens: u32) -> Result<Self> {
        Ok(Self {
            http: http_client()?,
            api_key,
            base_url: GEMINI_API_URL.to_string(),
            sampling: Sampling {
                model: model.unwrap_or_else(|| "gemini-1.5-flash".to_string()),
                temperature,
                max_tokens,
            },
        })
    }

    fn request_body(&self, prompt: &str) -> Value {
        json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": self.sampling.temperature,
                "maxOutputTokens": self.sampling.max_tokens,
            },
        })
    }
}

pub(crate) fn gemini_text(body: &Value) -> Option<&str> {
    body["candidates"][0]["content"]["parts"][0]["text"].as_str()
}

impl AskAsync for GeminiClient {
    fn name(&self) -> &'static str {
        "Gemini"
    }

    #[instrument(level = "info", skip_all, fields(provider = "Gemini", model = %self.sampling.model))]
    async fn ask(&self, prompt: &Prompt) -> Result<String> {
        let url = format!("{}/{}:generateContent", self.base_url, self.sampling.model);
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request_body(&prompt.text))
            .send()
            .await?;
        let body: Value = PipelineError::check(self.name(), response).await?.json().await?;
        gemini_text(&body)
            .map(str::to_string)
            .ok_or_else(|| missing_text(self.name(), &body))
    }
}

/// Anthropic messages API.
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    sampling: Sampling,
}

impl AnthropicClient {
    pub fn new(api_key: String, model: Option<String>, temperature: f32, max_tokens: u32) -> Result<Self> {
        Ok(Self {
            http: http_client()?,
            api_key,
            base_url: ANTHROPIC_API_URL.to_string(),
            sampling: Sampling {
                model: model.unwrap_or_else(|| "claude-3-5-sonnet-20241022".to_string()),
                temperature,
                max_tokens,
            },
        })
    }

    fn request_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.sampling.model,
            "max_tokens": self.sampling.max_tokens,
            "temperature": self.sampling.temperature,
            "messages": [{ "role": "user", "content": prompt }],
        })
    }
}

/// Concatenation of every text block in the response.
pub(crate) fn anthropic_text(body: &Value) -> Option<String> {
    let blocks = body["content"].as_array()?;
    let text: String = blocks
        .iter()
        .filter(|b| b["type"] == "text")
        .filter_map(|b| b["text"].as_str())
        .collect();
    (!text.is_empty()).then_some(text)
}

impl AskAsync for AnthropicClient {
    fn name(&self) -> &'static str {
        "Anthropic"
    }

    #[instrument(level = "info", skip_all, fields(provider = "Anthropic", model = %self.sampling.model))]
    async fn ask(&self, prompt: &Prompt) -> Result<String> {
        let response = self
            .http
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&self.request_body(&prompt.text))
            .send()
            .await?;
        let body: Value = PipelineError::check(self.name(), response).await?.json().await?;
        anthropic_text(&body).ok_or_else(|| missing_text(self.name(), &body))
    }
}

/// Offline stand-in.
///
/// Output depends only on the prompt kind and the subject headline, so the
/// same article always yields the same script, titles and metadata.
#[derive(Debug, Clone, Default)]
pub struct MockClient;

impl MockClient {
    pub fn respond(prompt: &Prompt) -> String {
        let subject = prompt.subject.trim();
        match prompt.kind {
            PromptKind::Script => format!(
                "[INTRO]\nHello everyone, and welcome back. Today's story: {subject}.\n\n\
                 [BODY]\nHere is what happened. {subject}. \
                 We walk through the background, what changed, and what it means for your everyday life. \
                 Experts are watching how this develops over the coming weeks.\n\n\
                 [CONCLUSION]\nThat was today's briefing on {subject}. \
                 If it helped, please subscribe, like the video and turn on notifications. See you next time."
            ),
            PromptKind::ThumbnailTitles => [
                "Is this for real?",
                "It finally happened",
                "Nobody saw this coming",
                "Check this right now",
                "99% don't know this",
                "Experts are stunned",
                "The truth comes out",
                "You need to know this",
                "What it means for you",
                "The real story",
            ]
            .iter()
            .enumerate()
            .map(|(i, t)| format!("{}. {t}", i + 1))
            .collect::<Vec<_>>()
            .join("\n"),
            PromptKind::Metadata => format!(
                "VIDEO_TITLE: {subject} | Explained\n\
                 DESCRIPTION: A clear walkthrough of {subject}: the background, the key facts and why it matters.\n\
                 TAGS: news, briefing, explained, today, analysis"
            ),
        }
    }
}

impl AskAsync for MockClient {
    fn name(&self) -> &'static str {
        "Mock"
    }

    async fn ask(&self, prompt: &Prompt) -> Result<String> {
        Ok(Self::respond(prompt))
    }
}

/// Provider chosen at startup.
#[derive(Debug, Clone)]
pub enum LlmClient {
    OpenAi(OpenAiClient),
    Gemini(GeminiClient),
    Anthropic(AnthropicClient),
    Mock(MockClient),
}

impl LlmClient {
    /// Build the configured client; real providers require an API key.
    pub fn from_config(config: &AiConfig) -> Result<Self> {
        let provider = config.provider;
        if provider == AiProvider::Mock {
            return Ok(LlmClient::Mock(MockClient));
        }
        let api_key = resolve_api_key(config.api_key.as_deref(), "AI_API_KEY", provider.env_var()).ok_or(
            PipelineError::MissingApiKey {
                provider: provider.name(),
                env_var: provider.env_var(),
            },
        )?;
        let model = config.model.clone();
        Ok(match provider {
            AiProvider::Openai => LlmClient::OpenAi(OpenAiClient::new(api_key, model, config.temperature, config.max_tokens)?),
            AiProvider::Gemini => LlmClient::Gemini(GeminiClient::new(api_key, model, config.temperature, config.max_tokens)?),
            AiProvider::Anthropic => {
                LlmClient::Anthropic(AnthropicClient::new(api_key, model, config.temperature, config.max_tokens)?)
            }
            AiProvider::Mock => LlmClient::Mock(MockClient),
        })
    }
}

impl AskAsync for LlmClient {
    fn name(&self) -> &'static str {
        match self {
            LlmClient::OpenAi(c) => c.name(),
            LlmClient::Gemini(c) => c.name(),
            LlmClient::Anthropic(c) => c.name(),
            LlmClient::Mock(c) => c.name(),
        }
    }

    async fn ask(&self, prompt: &Prompt) -> Result<String> {
        let t0 = Instant::now();
        let res = match self {
            LlmClient::OpenAi(c) => c.ask(prompt).await,
            LlmClient::Gemini(c) => c.ask(prompt).await,
            LlmClient::Anthropic(c) => c.ask(prompt).await,
            LlmClient::Mock(c) => c.ask(prompt).await,
        };
        if let Err(e) = &res {
            warn!(
                provider = self.name(),
                kind = ?prompt.kind,
                elapsed_ms = t0.elapsed().as_millis() as u64,
                error = %e,
                "LLM call failed"
            );
        }
        res
    }
}
