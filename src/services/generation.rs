// Generation Session Controller
// One cancellable streaming LLM session at a time, re-rendered on every delta

use std::sync::{Arc, Mutex, MutexGuard};

use futures_util::StreamExt;
use serde_json::json;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::models::{EssayOptions, GenerationStatus, LlmProvider, PaperRecord};
use crate::services::analytics::{events, AnalyticsSink};
use crate::services::markdown::{error_html, markdown_to_html};
use crate::services::prompt::{build_essay_prompt, build_refine_prompt, ESSAY_PERSONA};
use crate::services::providers::{CompletionRequest, GenerationTransport};
use crate::services::stream_decoder::StreamDecoder;

pub const STOP_MARKER: &str = "\n\n---\n*Generation was stopped by user*";
const ESSAY_TEMPERATURE: f64 = 0.7;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Please enter your API key")]
    MissingApiKey,
    #[error("Please enter an essay topic")]
    MissingTopic,
    #[error("Please select at least one source")]
    NoSources,
    #[error("No essay to refine. Generate one first!")]
    NothingToRefine,
    #[error("Please wait for current generation to finish")]
    Busy,
}

/// Which provider/model/key a session talks to.
#[derive(Debug, Clone)]
pub struct ModelTarget {
    pub provider: LlmProvider,
    pub model: String,
    pub api_key: String,
}

impl ModelTarget {
    pub fn new(provider: LlmProvider, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            model: provider.default_model().to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn completion(&self, prompt: String) -> CompletionRequest {
        CompletionRequest {
            provider: self.provider,
            model: self.model.clone(),
            api_key: self.api_key.trim().to_string(),
            system: Some(ESSAY_PERSONA.to_string()),
            prompt,
            max_tokens: self.provider.max_tokens(),
            temperature: ESSAY_TEMPERATURE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EssayRequest {
    pub topic: String,
    pub sources: Vec<PaperRecord>,
    pub options: EssayOptions,
    pub target: ModelTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Essay,
    Refine,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    Completed { text: String, html: String },
    /// `text` is the partial output followed by the stop marker.
    Cancelled { text: String, html: String },
    /// `html` is the error panel, or the restored original essay for a refine.
    Failed { message: String, html: String },
}

impl SessionOutcome {
    pub fn status(&self) -> GenerationStatus {
        match self {
            Self::Completed { .. } => GenerationStatus::Completed,
            Self::Cancelled { .. } => GenerationStatus::Cancelled,
            Self::Failed { .. } => GenerationStatus::Errored,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Started { kind: SessionKind, provider: LlmProvider },
    /// `html` renders the whole buffer so far, not just `delta`.
    Delta { delta: String, html: String, scroll_to_end: bool },
    Finished(SessionOutcome),
}

enum Ended {
    Completed,
    Cancelled,
    Failed(String),
}

#[derive(Default)]
struct SessionState {
    status: GenerationStatus,
    cancel: Option<CancellationToken>,
    buffer: String,
    /// Last essay text shown to the user, the input for a refine.
    document: Option<String>,
}

pub struct GenerationController {
    transport: Arc<dyn GenerationTransport>,
    analytics: Arc<dyn AnalyticsSink>,
    state: Mutex<SessionState>,
}

impl GenerationController {
    pub fn new(transport: Arc<dyn GenerationTransport>, analytics: Arc<dyn AnalyticsSink>) -> Self {
        Self { transport, analytics, state: Mutex::new(SessionState::default()) }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn status(&self) -> GenerationStatus {
        self.state().status
    }

    pub fn current_text(&self) -> Option<String> {
        self.state().document.clone()
    }

    /// Request cancellation of the running session. Returns false when nothing is running.
    pub fn stop(&self) -> bool {
        let state = self.state();
        match (&state.status, &state.cancel) {
            (GenerationStatus::Running, Some(token)) => {
                info!("[GENERATION] Stop requested");
                token.cancel();
                true
            }
            _ => false,
        }
    }

    fn begin(&self) -> Result<CancellationToken, GenerationError> {
        let mut state = self.state();
        if state.status == GenerationStatus::Running {
            return Err(GenerationError::Busy);
        }
        let token = CancellationToken::new();
        state.status = GenerationStatus::Running;
        state.cancel = Some(token.clone());
        state.buffer.clear();
        Ok(token)
    }

    /// Draft an essay. Validation failures return before any state change or network call.
    pub async fn generate<F>(&self, request: EssayRequest, on_event: F) -> Result<SessionOutcome, GenerationError>
    where
        F: Fn(SessionEvent) + Send + Sync,
    {
        if request.target.api_key.trim().is_empty() {
            return Err(GenerationError::MissingApiKey);
        }
        if request.topic.trim().is_empty() {
            return Err(GenerationError::MissingTopic);
        }
        if request.sources.is_empty() {
            return Err(GenerationError::NoSources);
        }
        let token = self.begin()?;

        self.analytics.track(
            events::ESSAY_GENERATED,
            json!({
                "length": request.options.length,
                "style": request.options.style,
                "sources": request.sources.len(),
            }),
        );

        let prompt = build_essay_prompt(request.topic.trim(), &request.sources, &request.options);
        info!(
            provider = %request.target.provider,
            sources = request.sources.len(),
            target_words = request.options.length.target_words(),
            "[GENERATION] Starting essay"
        );

        let completion = request.target.completion(prompt);
        Ok(self.run(token, completion, SessionKind::Essay, None, &on_event).await)
    }

    /// Rewrite an existing essay. On failure the original essay is restored.
    pub async fn refine<F>(&self, essay: &str, target: ModelTarget, on_event: F) -> Result<SessionOutcome, GenerationError>
    where
        F: Fn(SessionEvent) + Send + Sync,
    {
        if essay.trim().is_empty() {
            return Err(GenerationError::NothingToRefine);
        }
        if target.api_key.trim().is_empty() {
            return Err(GenerationError::MissingApiKey);
        }
        let token = self.begin()?;

        self.analytics.track(events::ESSAY_REFINED, json!({ "chars": essay.len() }));
        info!(provider = %target.provider, chars = essay.len(), "[GENERATION] Starting refine");

        let completion = target.completion(build_refine_prompt(essay));
        Ok(self
            .run(token, completion, SessionKind::Refine, Some(essay.to_string()), &on_event)
            .await)
    }

    async fn run(
        &self,
        token: CancellationToken,
        request: CompletionRequest,
        kind: SessionKind,
        restore_on_error: Option<String>,
        on_event: &(dyn Fn(SessionEvent) + Send + Sync),
    ) -> SessionOutcome {
        on_event(SessionEvent::Started { kind, provider: request.provider });

        let opened = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            result = self.transport.open_stream(&request) => Some(result),
        };
        let mut stream = match opened {
            None => return self.finish(Ended::Cancelled, kind, restore_on_error, on_event),
            Some(Err(e)) => return self.finish(Ended::Failed(e.to_string()), kind, restore_on_error, on_event),
            Some(Ok(stream)) => stream,
        };

        let mut decoder = StreamDecoder::new(request.provider.wire());
        let ended = loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => None,
                chunk = stream.next() => Some(chunk),
            };
            match next {
                None => break Ended::Cancelled,
                Some(Some(Ok(bytes))) => {
                    for delta in decoder.feed(&bytes) {
                        self.append(delta, on_event);
                    }
                }
                Some(Some(Err(e))) => break Ended::Failed(e.to_string()),
                Some(None) => {
                    for delta in decoder.finish() {
                        self.append(delta, on_event);
                    }
                    break Ended::Completed;
                }
            }
        };

        self.finish(ended, kind, restore_on_error, on_event)
    }

    fn append(&self, delta: String, on_event: &(dyn Fn(SessionEvent) + Send + Sync)) {
        let html = {
            let mut state = self.state();
            state.buffer.push_str(&delta);
            markdown_to_html(&state.buffer)
        };
        on_event(SessionEvent::Delta { delta, html, scroll_to_end: true });
    }

    fn finish(
        &self,
        ended: Ended,
        kind: SessionKind,
        restore_on_error: Option<String>,
        on_event: &(dyn Fn(SessionEvent) + Send + Sync),
    ) -> SessionOutcome {
        let outcome = {
            let mut state = self.state();
            state.cancel = None;
            match ended {
                Ended::Completed => {
                    state.status = GenerationStatus::Completed;
                    let text = std::mem::take(&mut state.buffer);
                    state.document = Some(text.clone());
                    SessionOutcome::Completed { html: markdown_to_html(&text), text }
                }
                Ended::Cancelled => {
                    state.status = GenerationStatus::Cancelled;
                    let mut text = std::mem::take(&mut state.buffer);
                    text.push_str(STOP_MARKER);
                    state.document = Some(text.clone());
                    SessionOutcome::Cancelled { html: markdown_to_html(&text), text }
                }
                Ended::Failed(message) => {
                    state.status = GenerationStatus::Errored;
                    state.buffer.clear();
                    let html = match restore_on_error {
                        Some(original) => {
                            let html = markdown_to_html(&original);
                            state.document = Some(original);
                            html
                        }
                        None => {
                            state.document = None;
                            error_html(&message)
                        }
                    };
                    SessionOutcome::Failed { message, html }
                }
            }
        };

        match &outcome {
            SessionOutcome::Completed { text, .. } => {
                info!(kind = ?kind, chars = text.len(), "[GENERATION] Completed")
            }
            SessionOutcome::Cancelled { text, .. } => {
                info!(kind = ?kind, chars = text.len(), "[GENERATION] Cancelled by user")
            }
            SessionOutcome::Failed { message, .. } => {
                warn!(kind = ?kind, error = %message, "[GENERATION] Failed")
            }
        }

        on_event(SessionEvent::Finished(outcome.clone()));
        outcome
    }
}
