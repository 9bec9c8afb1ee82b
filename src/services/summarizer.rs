// Summarizer Service
// One-shot academic text summaries through the configured LLM provider

use std::sync::Arc;

use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::SummaryMode;
use crate::services::analytics::{events, AnalyticsSink};
use crate::services::generation::ModelTarget;
use crate::services::prompt::build_summary_prompt;
use crate::services::providers::{CompletionRequest, GenerationTransport, ProviderError};

const MIN_SUMMARY_CHARS: usize = 50;
const SUMMARY_MAX_TOKENS: u32 = 1024;
const SUMMARY_TEMPERATURE: f64 = 0.3;

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("Please enter some text to summarize")]
    EmptyText,
    #[error("Please enter at least 50 characters")]
    TooShort,
    #[error("Please set your API key in the Writer tab first")]
    MissingApiKey,
    #[error("No summary generated")]
    Empty,
    #[error("{0}")]
    Provider(ProviderError),
}

pub struct Summarizer {
    transport: Arc<dyn GenerationTransport>,
    analytics: Arc<dyn AnalyticsSink>,
}

impl Summarizer {
    pub fn new(transport: Arc<dyn GenerationTransport>, analytics: Arc<dyn AnalyticsSink>) -> Self {
        Self { transport, analytics }
    }

    pub async fn summarize(&self, text: &str, mode: SummaryMode, target: &ModelTarget) -> Result<String, SummaryError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SummaryError::EmptyText);
        }
        if text.chars().count() < MIN_SUMMARY_CHARS {
            return Err(SummaryError::TooShort);
        }
        if target.api_key.trim().is_empty() {
            return Err(SummaryError::MissingApiKey);
        }

        self.analytics.track(
            events::SUMMARY_CREATED,
            json!({ "mode": mode, "charCount": text.len() }),
        );
        info!(provider = %target.provider, mode = ?mode, chars = text.len(), "[SUMMARIZER] Requesting summary");

        let request = CompletionRequest {
            provider: target.provider,
            model: target.model.clone(),
            api_key: target.api_key.trim().to_string(),
            system: None,
            prompt: build_summary_prompt(text, mode),
            max_tokens: SUMMARY_MAX_TOKENS,
            temperature: SUMMARY_TEMPERATURE,
        };

        match self.transport.complete(&request).await {
            Ok(summary) if summary.trim().is_empty() => Err(SummaryError::Empty),
            Ok(summary) => Ok(summary),
            Err(ProviderError::MissingContent) => Err(SummaryError::Empty),
            Err(e) => {
                warn!(error = %e, "[SUMMARIZER] Provider call failed");
                Err(SummaryError::Provider(e))
            }
        }
    }
}
