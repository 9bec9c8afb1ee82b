// AI Provider Service
// Streaming and one-shot calls to the OpenAI, Anthropic and Gemini APIs

use std::collections::HashMap;
use std::env;
use std::pin::Pin;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use reqwest::Client;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info};

use crate::models::{LlmProvider, WireProtocol};

const OPENAI_DEFAULT_URL: &str = "https://api.openai.com/v1/chat/completions";
const ANTHROPIC_DEFAULT_URL: &str = "https://api.anthropic.com/v1/messages";
const GEMINI_DEFAULT_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const COMPLETION_TIMEOUT: Duration = Duration::from_secs(80);

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("{message}")]
    ApiError { status: u16, message: String },
    #[error("Missing content in response")]
    MissingContent,
    #[error("JSON parse error: {0}")]
    JsonError(String),
    #[error("API key not configured")]
    MissingApiKey,
}

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, ProviderError>> + Send>>;

/// One LLM call, independent of wire protocol.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub provider: LlmProvider,
    pub model: String,
    pub api_key: String,
    pub system: Option<String>,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f64,
}

/// Transport seam between the generation controller and the network.
#[async_trait]
pub trait GenerationTransport: Send + Sync {
    /// Open a server-sent-event stream; the returned bytes are fed to a decoder.
    async fn open_stream(&self, request: &CompletionRequest) -> Result<ByteStream, ProviderError>;

    /// Single non-streaming completion.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError>;
}

pub fn wire_label(wire: WireProtocol) -> &'static str {
    match wire {
        WireProtocol::OpenAi => "OpenAI",
        WireProtocol::Anthropic => "Anthropic",
        WireProtocol::Gemini => "Gemini",
    }
}

/// Provider's own `error.message` when the body carries one, else a generic fallback.
pub fn api_error_message(body: &str, wire: WireProtocol) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("{} API error", wire_label(wire)))
}

struct HttpCall {
    url: String,
    query: Vec<(&'static str, String)>,
    headers: Vec<(&'static str, String)>,
    body: Value,
}

pub struct ProviderClient {
    client: Client,
    urls: HashMap<&'static str, String>,
}

impl Default for ProviderClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderClient {
    pub fn new() -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();

        let mut urls = HashMap::new();
        urls.insert(
            "openai",
            env::var("OPENAI_API_URL").unwrap_or_else(|_| OPENAI_DEFAULT_URL.to_string()),
        );
        urls.insert(
            "anthropic",
            env::var("ANTHROPIC_API_URL").unwrap_or_else(|_| ANTHROPIC_DEFAULT_URL.to_string()),
        );
        urls.insert(
            "gemini",
            env::var("GEMINI_API_URL").unwrap_or_else(|_| GEMINI_DEFAULT_URL.to_string()),
        );

        Self { client, urls }
    }

    /// Override the endpoint for every provider sharing `wire`'s credential.
    pub fn with_base_url(mut self, provider: LlmProvider, url: &str) -> Self {
        self.urls.insert(provider.credential_name(), url.trim_end_matches('/').to_string());
        self
    }

    pub fn base_url(&self, provider: LlmProvider) -> &str {
        self.urls
            .get(provider.credential_name())
            .map(String::as_str)
            .unwrap_or_default()
    }

    fn build_call(&self, request: &CompletionRequest, stream: bool) -> HttpCall {
        let base = self.base_url(request.provider).to_string();
        match request.provider.wire() {
            WireProtocol::OpenAi => {
                let mut messages = Vec::new();
                if let Some(system) = &request.system {
                    messages.push(json!({"role": "system", "content": system}));
                }
                messages.push(json!({"role": "user", "content": request.prompt}));
                let mut body = json!({
                    "model": request.model,
                    "messages": messages,
                    "max_tokens": request.max_tokens,
                    "temperature": request.temperature,
                });
                if stream {
                    body["stream"] = json!(true);
                }
                HttpCall {
                    url: base,
                    query: Vec::new(),
                    headers: vec![("Authorization", format!("Bearer {}", request.api_key))],
                    body,
                }
            }
            WireProtocol::Anthropic => {
                let mut body = json!({
                    "model": request.model,
                    "max_tokens": request.max_tokens,
                    "messages": [{"role": "user", "content": request.prompt}],
                });
                if let Some(system) = &request.system {
                    body["system"] = json!(system);
                }
                if stream {
                    body["stream"] = json!(true);
                }
                HttpCall {
                    url: base,
                    query: Vec::new(),
                    headers: vec![
                        ("x-api-key", request.api_key.clone()),
                        ("anthropic-version", ANTHROPIC_VERSION.to_string()),
                    ],
                    body,
                }
            }
            WireProtocol::Gemini => {
                // No system field: the persona is prepended to the prompt text
                let text = match &request.system {
                    Some(system) => format!("{}\n\n{}", system, request.prompt),
                    None => request.prompt.clone(),
                };
                let (method, mut query) = if stream {
                    ("streamGenerateContent", vec![("alt", "sse".to_string())])
                } else {
                    ("generateContent", Vec::new())
                };
                query.push(("key", request.api_key.clone()));
                HttpCall {
                    url: format!("{}/{}:{}", base, request.model, method),
                    query,
                    headers: Vec::new(),
                    body: json!({
                        "contents": [{"parts": [{"text": text}]}],
                        "generationConfig": {
                            "maxOutputTokens": request.max_tokens,
                            "temperature": request.temperature,
                        },
                    }),
                }
            }
        }
    }

    async fn send(&self, call: HttpCall, wire: WireProtocol, timeout: Option<Duration>) -> Result<reqwest::Response, ProviderError> {
        let mut builder = self
            .client
            .post(&call.url)
            .query(&call.query)
            .header("Content-Type", "application/json")
            .json(&call.body);
        for (name, value) in &call.headers {
            builder = builder.header(*name, value);
        }
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message: api_error_message(&body, wire),
            });
        }
        Ok(response)
    }
}

pub fn extract_completion_text(data: &Value, wire: WireProtocol) -> Option<String> {
    let text = match wire {
        WireProtocol::OpenAi => data["choices"][0]["message"]["content"].as_str(),
        WireProtocol::Anthropic => data["content"][0]["text"].as_str(),
        WireProtocol::Gemini => data["candidates"][0]["content"]["parts"][0]["text"].as_str(),
    };
    text.filter(|t| !t.is_empty()).map(str::to_string)
}

#[async_trait]
impl GenerationTransport for ProviderClient {
    async fn open_stream(&self, request: &CompletionRequest) -> Result<ByteStream, ProviderError> {
        if request.api_key.trim().is_empty() {
            return Err(ProviderError::MissingApiKey);
        }
        let wire = request.provider.wire();
        let call = self.build_call(request, true);
        info!(
            provider = %request.provider,
            model = %request.model,
            prompt_chars = request.prompt.len(),
            "[PROVIDER] Opening stream"
        );

        let response = self.send(call, wire, None).await?;
        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()).map_err(ProviderError::from));
        Ok(Box::pin(stream))
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        if request.api_key.trim().is_empty() {
            return Err(ProviderError::MissingApiKey);
        }
        let wire = request.provider.wire();
        let call = self.build_call(request, false);
        let start = Instant::now();

        let response = self.send(call, wire, Some(COMPLETION_TIMEOUT)).await?;
        let data: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::JsonError(e.to_string()))?;
        debug!(
            provider = %request.provider,
            latency_ms = start.elapsed().as_millis() as u64,
            "[PROVIDER] Completion received"
        );

        extract_completion_text(&data, wire).ok_or(ProviderError::MissingContent)
    }
}
