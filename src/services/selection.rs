// Selected Sources
// The user's curated source list, persisted as one document

use std::sync::Arc;

use serde_json::json;
use thiserror::Error;
use tracing::info;

use crate::models::{synthetic_paper_id, PaperRecord, SourceProvider, NO_ABSTRACT, UNKNOWN};
use crate::services::analytics::{events, AnalyticsSink};
use crate::services::state_store::{load_json, save_with_retry, DocumentStore};

pub const SELECTED_SOURCES_KEY: &str = "selectedSources";

#[derive(Debug, Error, PartialEq)]
pub enum SelectionError {
    #[error("Title is required")]
    TitleRequired,
    #[error("Year must be a number, got '{0}'")]
    InvalidYear(String),
    #[error("No source at position {0}")]
    NoSuchIndex(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyPresent,
}

/// Ordered by selection, unique by id.
pub struct SelectedSources {
    items: Vec<PaperRecord>,
    store: Arc<dyn DocumentStore>,
    analytics: Arc<dyn AnalyticsSink>,
}

impl SelectedSources {
    /// Restore the persisted list; an absent or unparseable document starts empty.
    pub fn load(store: Arc<dyn DocumentStore>, analytics: Arc<dyn AnalyticsSink>) -> Self {
        let items = load_json(store.as_ref(), SELECTED_SOURCES_KEY).unwrap_or_default();
        Self { items, store, analytics }
    }

    pub fn items(&self) -> &[PaperRecord] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.iter().any(|p| p.id == id)
    }

    pub fn add(&mut self, paper: PaperRecord) -> AddOutcome {
        if self.contains(&paper.id) {
            return AddOutcome::AlreadyPresent;
        }
        let provider = paper.source_provider;
        self.items.push(paper);
        self.persist();
        self.analytics
            .track(events::SOURCE_ADDED, json!({ "source": provider.label() }));
        AddOutcome::Added
    }

    pub fn add_manual(&mut self, title: &str, authors: &str, year: &str) -> Result<PaperRecord, SelectionError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(SelectionError::TitleRequired);
        }
        let year = year.trim();
        let year = if year.is_empty() {
            None
        } else {
            Some(year.parse::<i32>().map_err(|_| SelectionError::InvalidYear(year.to_string()))?)
        };
        let authors = authors.trim();

        let record = PaperRecord {
            id: synthetic_paper_id(),
            title: title.to_string(),
            authors: if authors.is_empty() { UNKNOWN.to_string() } else { authors.to_string() },
            abstract_text: NO_ABSTRACT.to_string(),
            year,
            citation_count: 0,
            venue: UNKNOWN.to_string(),
            source_provider: SourceProvider::Manual,
            url: String::new(),
            pdf_url: None,
            doi: None,
            is_open_access: false,
        };
        self.items.push(record.clone());
        self.persist();
        info!(title = %record.title, "[SOURCES] Manual source added");
        Ok(record)
    }

    pub fn remove(&mut self, index: usize) -> Result<PaperRecord, SelectionError> {
        if index >= self.items.len() {
            return Err(SelectionError::NoSuchIndex(index));
        }
        let removed = self.items.remove(index);
        self.persist();
        Ok(removed)
    }

    /// Returns how many sources were dropped.
    pub fn clear(&mut self) -> usize {
        let count = self.items.len();
        if count > 0 {
            self.items.clear();
            self.persist();
        }
        count
    }

    // User data is never trimmed; a failed write is retried as-is.
    fn persist(&mut self) {
        save_with_retry(self.store.as_ref(), SELECTED_SOURCES_KEY, &mut self.items, |_| {});
    }
}
