// Application State
// The command surface shared by every front end: search, curation, writing, detection

use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::json;
use tracing::info;

use crate::models::{
    DetectionReport, EssayOptions, ExternalDetector, GenerationStatus, LlmProvider, PaperRecord,
    SearchFilters, SortOrder, SummaryMode,
};
use crate::services::analytics::{events, AnalyticsSink, StoredAnalytics};
use crate::services::detection::{run_all_detectors, DetectorClient, DetectorKeys};
use crate::services::sources::{default_sources, PaperSource};
use crate::services::{
    filter_and_sort, AddOutcome, Aggregator, ConfigStore, DocumentStore, EssayRequest, FileStore,
    GenerationController, GenerationTransport, ModelTarget, ProviderClient, SelectedSources,
    SessionEvent, SessionOutcome, Summarizer,
};

const TRACKED_QUERY_CHARS: usize = 50;

/// Latest aggregated results plus the view settings applied to them.
#[derive(Default)]
struct SearchView {
    results: Vec<PaperRecord>,
    filters: SearchFilters,
    sort: SortOrder,
}

pub struct AppState {
    config: ConfigStore,
    analytics: Arc<dyn AnalyticsSink>,
    aggregator: Aggregator,
    selection: Mutex<SelectedSources>,
    view: Mutex<SearchView>,
    generation: GenerationController,
    summarizer: Summarizer,
    detectors: DetectorClient,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl AppState {
    pub fn new(
        config: ConfigStore,
        store: Arc<dyn DocumentStore>,
        sources: Vec<Arc<dyn PaperSource>>,
        transport: Arc<dyn GenerationTransport>,
        detectors: DetectorClient,
    ) -> Self {
        let analytics: Arc<dyn AnalyticsSink> = Arc::new(StoredAnalytics::new(Arc::clone(&store)));
        let selection = SelectedSources::load(Arc::clone(&store), Arc::clone(&analytics));
        Self {
            config,
            aggregator: Aggregator::new(sources, store),
            selection: Mutex::new(selection),
            view: Mutex::new(SearchView::default()),
            generation: GenerationController::new(Arc::clone(&transport), Arc::clone(&analytics)),
            summarizer: Summarizer::new(transport, Arc::clone(&analytics)),
            detectors,
            analytics,
        }
    }

    /// Wire up the real HTTP sources, providers and on-disk stores.
    pub fn open_default() -> Result<Self, String> {
        let config_dir = ConfigStore::default_config_dir().ok_or("Cannot determine config directory")?;
        let state_dir = FileStore::default_state_dir().ok_or("Cannot determine state directory")?;
        let config = ConfigStore::new(config_dir);
        let app_config = config.load()?;

        let mut client = ProviderClient::new();
        for provider in LlmProvider::ALL {
            if let Some(url) = config.get_provider_url(provider.credential_name())? {
                client = client.with_base_url(provider, &url);
            }
        }

        info!(
            config_dir = %config.config_dir().display(),
            state_dir = %state_dir.display(),
            "[APP] State opened"
        );

        Ok(Self::new(
            config,
            Arc::new(FileStore::new(state_dir)),
            default_sources(&app_config.search),
            Arc::new(client),
            DetectorClient::new(),
        ))
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    // ============ Search ============

    pub async fn search(&self, query: &str) -> Result<Vec<PaperRecord>, String> {
        let query = query.trim();
        if !query.is_empty() {
            let tracked: String = query.chars().take(TRACKED_QUERY_CHARS).collect();
            self.analytics.track(events::SEARCH, json!({ "query": tracked }));
        }
        let results = self.aggregator.aggregate(query).await.map_err(|e| e.to_string())?;
        lock(&self.view).results = results;
        Ok(self.visible_results())
    }

    pub fn set_filters(&self, filters: SearchFilters) -> Vec<PaperRecord> {
        lock(&self.view).filters = filters;
        self.visible_results()
    }

    pub fn set_sort(&self, sort: SortOrder) -> Vec<PaperRecord> {
        lock(&self.view).sort = sort;
        self.visible_results()
    }

    /// Current results with filters and sort applied; re-derived on every call.
    pub fn visible_results(&self) -> Vec<PaperRecord> {
        let view = lock(&self.view);
        filter_and_sort(&view.results, &view.filters, view.sort)
    }

    // ============ Selected sources ============

    pub fn selected_sources(&self) -> Vec<PaperRecord> {
        lock(&self.selection).items().to_vec()
    }

    pub fn add_source(&self, paper: PaperRecord) -> AddOutcome {
        lock(&self.selection).add(paper)
    }

    /// Add the result at `index` of the visible (filtered and sorted) list.
    pub fn add_visible_result(&self, index: usize) -> Result<AddOutcome, String> {
        let paper = self
            .visible_results()
            .into_iter()
            .nth(index)
            .ok_or_else(|| format!("No result at position {}", index))?;
        Ok(self.add_source(paper))
    }

    pub fn add_manual_source(&self, title: &str, authors: &str, year: &str) -> Result<PaperRecord, String> {
        lock(&self.selection)
            .add_manual(title, authors, year)
            .map_err(|e| e.to_string())
    }

    pub fn remove_source(&self, index: usize) -> Result<PaperRecord, String> {
        lock(&self.selection).remove(index).map_err(|e| e.to_string())
    }

    pub fn clear_sources(&self) -> usize {
        lock(&self.selection).clear()
    }

    // ============ Writing ============

    /// Provider, model and key for a call; a missing key yields an empty one so the
    /// caller's own validation reports it.
    pub fn model_target(&self, provider: Option<LlmProvider>) -> Result<ModelTarget, String> {
        let provider = match provider {
            Some(p) => p,
            None => self.config.load()?.default_provider.unwrap_or_default(),
        };
        let key = self
            .config
            .resolve_api_key(provider.credential_name())?
            .unwrap_or_default();
        Ok(ModelTarget::new(provider, key).with_model(self.config.model_for(provider)))
    }

    pub async fn generate<F>(
        &self,
        topic: &str,
        options: EssayOptions,
        provider: Option<LlmProvider>,
        on_event: F,
    ) -> Result<SessionOutcome, String>
    where
        F: Fn(SessionEvent) + Send + Sync,
    {
        let request = EssayRequest {
            topic: topic.to_string(),
            sources: self.selected_sources(),
            options,
            target: self.model_target(provider)?,
        };
        self.generation
            .generate(request, on_event)
            .await
            .map_err(|e| e.to_string())
    }

    /// Refine `essay`, or the last essay this session produced when `None`.
    pub async fn refine<F>(&self, essay: Option<&str>, provider: Option<LlmProvider>, on_event: F) -> Result<SessionOutcome, String>
    where
        F: Fn(SessionEvent) + Send + Sync,
    {
        let essay = match essay {
            Some(text) => text.to_string(),
            None => self.generation.current_text().unwrap_or_default(),
        };
        let target = self.model_target(provider)?;
        self.generation
            .refine(&essay, target, on_event)
            .await
            .map_err(|e| e.to_string())
    }

    pub fn stop_generation(&self) -> bool {
        self.generation.stop()
    }

    pub fn generation_status(&self) -> GenerationStatus {
        self.generation.status()
    }

    pub async fn summarize(&self, text: &str, mode: SummaryMode, provider: Option<LlmProvider>) -> Result<String, String> {
        let target = self.model_target(provider)?;
        self.summarizer
            .summarize(text, mode, &target)
            .await
            .map_err(|e| e.to_string())
    }

    // ============ Detection ============

    pub fn detector_keys(&self) -> Result<DetectorKeys, String> {
        let key = |d: ExternalDetector| self.config.resolve_api_key(d.key());
        Ok(DetectorKeys {
            zerogpt: key(ExternalDetector::ZeroGpt)?,
            gptzero: key(ExternalDetector::GptZero)?,
            sapling: key(ExternalDetector::Sapling)?,
        })
    }

    pub async fn detect(&self, text: &str) -> Result<DetectionReport, String> {
        let keys = self.detector_keys()?;
        run_all_detectors(&self.detectors, &keys, text, self.analytics.as_ref())
            .await
            .map_err(|e| e.to_string())
    }
}
