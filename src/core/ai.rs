// language model integration - turns plain english into sql
// one Backend per provider, picked once when Ai is built

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::pipeline::SqlGenerator;
use super::prompt::{self, Generated};
use crate::Error;

const MAX_TOKENS: u32 = 1000;
const TEMPERATURE: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Provider {
    Claude,
    #[value(name = "openai")]
    OpenAi,
    Groq,
    Gemini,
}

impl Provider {
    /// Env vars checked for an api key, in order.
    pub fn key_vars(&self) -> &'static [&'static str] {
        match self {
            Self::Claude => &["ANTHROPIC_API_KEY", "CLAUDE_API_KEY", "CLAUDE_KEY"],
            Self::OpenAi => &["OPENAI_API_KEY"],
            Self::Groq => &["GROQ_API_KEY"],
            Self::Gemini => &["GEMINI_API_KEY", "GOOGLE_API_KEY"],
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Claude => "claude-sonnet-4-20250514",
            Self::OpenAi => "gpt-4o-mini",
            Self::Groq => "llama-3.1-70b-versatile",
            Self::Gemini => "gemini-2.5-flash",
        }
    }

    fn api_key(&self, explicit: Option<String>) -> Result<String, Error> {
        explicit
            .filter(|k| !k.trim().is_empty())
            .or_else(|| {
                self.key_vars()
                    .iter()
                    .find_map(|var| std::env::var(var).ok().filter(|k| !k.trim().is_empty()))
            })
            .ok_or(Error::MissingApiKey(*self))
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Claude => "claude",
            Self::OpenAi => "openai",
            Self::Groq => "groq",
            Self::Gemini => "gemini",
        })
    }
}

/// A single prompt in, raw text out.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, Error>;
}

pub struct Ai {
    backend: Box<dyn Backend>,
}

impl Ai {
    pub fn new(
        provider: Provider,
        api_key: Option<String>,
        model: Option<String>,
    ) -> Result<Self, Error> {
        let api_key = provider.api_key(api_key)?;
        let model = model.unwrap_or_else(|| provider.default_model().to_string());
        let client = reqwest::Client::new();

        let backend: Box<dyn Backend> = match provider {
            Provider::Claude => Box::new(Claude {
                client,
                api_key,
                model,
            }),
            Provider::OpenAi => Box::new(OpenAi {
                client,
                api_key,
                model,
                provider,
                url: "https://api.openai.com/v1/chat/completions",
            }),
            // groq speaks the openai chat completions protocol
            Provider::Groq => Box::new(OpenAi {
                client,
                api_key,
                model,
                provider,
                url: "https://api.groq.com/openai/v1/chat/completions",
            }),
            Provider::Gemini => Box::new(Gemini {
                client,
                api_key,
                model,
            }),
        };

        tracing::info!(%provider, "language model ready");
        Ok(Self { backend })
    }

    pub fn with_backend(backend: impl Backend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }
}

#[async_trait]
impl SqlGenerator for Ai {
    async fn generate_sql(
        &self,
        request: &str,
        schema: &str,
        operation: Option<&str>,
        row_limit: u32,
    ) -> Result<Generated, Error> {
        let prompt = prompt::build(request, schema, operation, row_limit);
        let reply = self.backend.complete(&prompt).await?;
        tracing::debug!(reply = %reply, "model reply");
        prompt::parse(&reply)
    }
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

async fn check_status(
    provider: Provider,
    response: reqwest::Response,
) -> Result<reqwest::Response, Error> {
    if response.status().is_success() {
        return Ok(response);
    }
    let message = response.text().await?;
    Err(Error::Provider { provider, message })
}

struct Claude {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ClaudeRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message<'a>>,
}

#[derive(Deserialize)]
struct ClaudeResponse {
    content: Vec<ClaudeContent>,
}

#[derive(Deserialize)]
struct ClaudeContent {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl Backend for Claude {
    async fn complete(&self, prompt: &str) -> Result<String, Error> {
        let request = ClaudeRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&request)
            .send()
            .await?;

        let response: ClaudeResponse = check_status(Provider::Claude, response)
            .await?
            .json()
            .await?;

        Ok(response
            .content
            .into_iter()
            .next()
            .map(|c| c.text)
            .unwrap_or_default())
    }
}

struct OpenAi {
    client: reqwest::Client,
    api_key: String,
    model: String,
    provider: Provider,
    url: &'static str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message<'a>>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl Backend for OpenAi {
    async fn complete(&self, prompt: &str) -> Result<String, Error> {
        let request = ChatRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(self.url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let response: ChatResponse = check_status(self.provider, response)
            .await?
            .json()
            .await?;

        Ok(response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}

struct Gemini {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    generation_config: GeminiConfig,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiReplyContent,
}

#[derive(Deserialize)]
struct GeminiReplyContent {
    #[serde(default)]
    parts: Vec<GeminiReplyPart>,
}

#[derive(Deserialize)]
struct GeminiReplyPart {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl Backend for Gemini {
    async fn complete(&self, prompt: &str) -> Result<String, Error> {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: prompt }],
            }],
            generation_config: GeminiConfig {
                temperature: TEMPERATURE,
                max_output_tokens: MAX_TOKENS,
            },
        };

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model.trim_start_matches("models/")
        );

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let response: GeminiResponse = check_status(Provider::Gemini, response)
            .await?
            .json()
            .await?;

        Ok(response
            .candidates
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default())
    }
}
