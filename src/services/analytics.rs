// Usage Analytics
// Fire-and-forget event sink; a failed write never reaches the caller

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::services::state_store::{load_json, save_with_retry, DocumentStore};

pub const ANALYTICS_KEY: &str = "analytics";
const MAX_EVENTS: usize = 1000;
const EVENTS_KEPT_ON_RETRY: usize = 200;

pub mod events {
    pub const SEARCH: &str = "search";
    pub const ESSAY_GENERATED: &str = "essay_generated";
    pub const ESSAY_REFINED: &str = "essay_refined";
    pub const SUMMARY_CREATED: &str = "summary_created";
    pub const AI_DETECTION: &str = "ai_detection";
    pub const SOURCE_ADDED: &str = "source_added";
}

pub trait AnalyticsSink: Send + Sync {
    fn track(&self, event: &str, data: Value);
}

/// Discards every event.
pub struct NoopAnalytics;

impl AnalyticsSink for NoopAnalytics {
    fn track(&self, _event: &str, _data: Value) {}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: String,
    pub session_id: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureCounters {
    pub searches: u64,
    pub essays: u64,
    pub summaries: u64,
    pub detections: u64,
    pub sources: u64,
}

impl FeatureCounters {
    fn bump(&mut self, event: &str) {
        match event {
            events::SEARCH => self.searches += 1,
            events::ESSAY_GENERATED => self.essays += 1,
            events::SUMMARY_CREATED => self.summaries += 1,
            events::AI_DETECTION => self.detections += 1,
            events::SOURCE_ADDED => self.sources += 1,
            _ => {}
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsDocument {
    #[serde(default)]
    pub features: FeatureCounters,
    /// Newest first.
    #[serde(default)]
    pub events: Vec<AnalyticsEvent>,
}

/// Persists an event log and per-feature counters through a [`DocumentStore`].
pub struct StoredAnalytics {
    store: Arc<dyn DocumentStore>,
    session_id: String,
    max_events: usize,
    write_lock: Mutex<()>,
}

impl StoredAnalytics {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_max_events(store, MAX_EVENTS)
    }

    pub fn with_max_events(store: Arc<dyn DocumentStore>, max_events: usize) -> Self {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let session_id = format!("s_{}_{}", chrono::Utc::now().timestamp_millis(), &suffix[..9]);
        Self { store, session_id, max_events, write_lock: Mutex::new(()) }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn snapshot(&self) -> AnalyticsDocument {
        load_json(self.store.as_ref(), ANALYTICS_KEY).unwrap_or_default()
    }
}

impl AnalyticsSink for StoredAnalytics {
    fn track(&self, event: &str, data: Value) {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut doc = self.snapshot();
        doc.events.insert(
            0,
            AnalyticsEvent {
                kind: event.to_string(),
                timestamp: chrono::Utc::now().to_rfc3339(),
                session_id: self.session_id.clone(),
                data,
            },
        );
        doc.events.truncate(self.max_events);
        doc.features.bump(event);

        save_with_retry(self.store.as_ref(), ANALYTICS_KEY, &mut doc, |d| {
            d.events.truncate(EVENTS_KEPT_ON_RETRY)
        });
        debug!(event = event, "[ANALYTICS] Tracked event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::state_store::MemoryStore;
    use serde_json::json;

    #[test]
    fn test_counters_and_newest_first() {
        let analytics = StoredAnalytics::new(Arc::new(MemoryStore::new()));
        analytics.track(events::SEARCH, json!({"query": "a"}));
        analytics.track(events::SOURCE_ADDED, json!({}));
        analytics.track("page_view", Value::Null);

        let doc = analytics.snapshot();
        assert_eq!(doc.features.searches, 1);
        assert_eq!(doc.features.sources, 1);
        assert_eq!(doc.events.len(), 3);
        assert_eq!(doc.events[0].kind, "page_view");
        assert_eq!(doc.events[2].data["query"], "a");
        assert_eq!(doc.events[0].session_id, analytics.session_id());
    }

    #[test]
    fn test_event_log_is_capped() {
        let analytics = StoredAnalytics::with_max_events(Arc::new(MemoryStore::new()), 10);
        for _ in 0..15 {
            analytics.track(events::AI_DETECTION, Value::Null);
        }
        let doc = analytics.snapshot();
        assert_eq!(doc.events.len(), 10);
        assert_eq!(doc.features.detections, 15);
    }

    #[test]
    fn test_quota_failure_is_swallowed() {
        let analytics = StoredAnalytics::new(Arc::new(MemoryStore::with_quota(8)));
        analytics.track(events::SEARCH, Value::Null);
        assert_eq!(analytics.snapshot().events.len(), 0);
    }
}
