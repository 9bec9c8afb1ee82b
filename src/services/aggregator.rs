// Result Aggregation Service
// Concurrent provider fan-out, title-similarity deduplication and the per-query result cache

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::{CachedResults, PaperRecord};
use crate::services::sources::PaperSource;
use crate::services::state_store::{load_json, save_with_retry, DocumentStore};

pub const CACHE_KEY: &str = "resultsCache";
pub const CACHE_TTL_MS: i64 = 3_600_000;
pub const CACHE_CAPACITY: usize = 10;
pub const DUPLICATE_THRESHOLD: f64 = 0.85;
const CACHE_KEEP_ON_RETRY: usize = 3;

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("Please enter a search query")]
    EmptyQuery,
    #[error("Failed to fetch results. Please try again.")]
    Aborted,
}

// ============ Deduplication ============

/// Lowercase, drop everything but ASCII word characters and whitespace, collapse runs of
/// whitespace, trim.
pub fn normalize_title(title: &str) -> String {
    let kept: String = title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Jaccard similarity of the single-space-split token sets of two normalized titles.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    let words_a: HashSet<&str> = a.split(' ').collect();
    let words_b: HashSet<&str> = b.split(' ').collect();
    let intersection = words_a.intersection(&words_b).count();
    let union = words_a.union(&words_b).count();
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}

/// Order-preserving single-pass dedupe by DOI and fuzzy title.
/// Each retained record is keyed by its DOI, or its id when it has none; a later DOI
/// equal to any retained key is a duplicate.
/// Empty or punctuation-only titles all normalize to "" and collapse into the first one.
pub fn dedupe_papers(papers: Vec<PaperRecord>) -> Vec<PaperRecord> {
    let mut seen_keys: HashSet<String> = HashSet::new();
    let mut seen_titles: Vec<String> = Vec::new();
    let mut kept = Vec::with_capacity(papers.len());

    for paper in papers {
        if let Some(doi) = &paper.doi {
            if seen_keys.contains(doi) {
                continue;
            }
        }

        let normalized = normalize_title(&paper.title);
        if seen_titles
            .iter()
            .any(|t| title_similarity(&normalized, t) > DUPLICATE_THRESHOLD)
        {
            continue;
        }

        seen_keys.insert(paper.doi.clone().unwrap_or_else(|| paper.id.clone()));
        seen_titles.push(normalized);
        kept.push(paper);
    }

    kept
}

// ============ Result Cache ============

type CacheDocument = BTreeMap<String, CachedResults>;

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Query-keyed cache with a one-hour TTL and oldest-timestamp eviction past 10 keys.
/// The whole document is read and written on every access.
pub struct ResultCache {
    store: Arc<dyn DocumentStore>,
}

impl ResultCache {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn lookup(&self, query: &str) -> Option<Vec<PaperRecord>> {
        self.lookup_at(query, now_ms())
    }

    pub fn lookup_at(&self, query: &str, now: i64) -> Option<Vec<PaperRecord>> {
        let cache: CacheDocument = load_json(self.store.as_ref(), CACHE_KEY)?;
        let entry = cache.get(query)?;
        if now - entry.timestamp > CACHE_TTL_MS {
            debug!(query = query, "[CACHE] Entry expired");
            return None;
        }
        Some(entry.results.clone())
    }

    pub fn insert(&self, query: &str, results: &[PaperRecord]) {
        self.insert_at(query, results, now_ms())
    }

    pub fn insert_at(&self, query: &str, results: &[PaperRecord], now: i64) {
        let mut cache: CacheDocument = load_json(self.store.as_ref(), CACHE_KEY).unwrap_or_default();
        cache.insert(
            query.to_string(),
            CachedResults { results: results.to_vec(), timestamp: now },
        );

        if cache.len() > CACHE_CAPACITY {
            let oldest = cache
                .iter()
                .filter(|(k, _)| k.as_str() != query)
                .min_by_key(|(_, v)| v.timestamp)
                .map(|(k, _)| k.clone());
            if let Some(key) = oldest {
                debug!(evicted = %key, "[CACHE] Evicting oldest entry");
                cache.remove(&key);
            }
        }

        save_with_retry(self.store.as_ref(), CACHE_KEY, &mut cache, |c| {
            keep_newest(c, CACHE_KEEP_ON_RETRY)
        });
    }

    pub fn keys(&self) -> Vec<String> {
        load_json::<CacheDocument>(self.store.as_ref(), CACHE_KEY)
            .map(|c| c.into_keys().collect())
            .unwrap_or_default()
    }
}

fn keep_newest(cache: &mut CacheDocument, keep: usize) {
    let mut stamps: Vec<(i64, String)> = cache.iter().map(|(k, v)| (v.timestamp, k.clone())).collect();
    stamps.sort_by(|a, b| b.0.cmp(&a.0));
    for (_, key) in stamps.into_iter().skip(keep) {
        cache.remove(&key);
    }
}

// ============ Aggregator ============

pub struct Aggregator {
    sources: Vec<Arc<dyn PaperSource>>,
    cache: ResultCache,
}

impl Aggregator {
    /// `sources` must be in provider-group order; results are concatenated in that order.
    pub fn new(sources: Vec<Arc<dyn PaperSource>>, store: Arc<dyn DocumentStore>) -> Self {
        Self { sources, cache: ResultCache::new(store) }
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub async fn aggregate(&self, query: &str) -> Result<Vec<PaperRecord>, AggregateError> {
        if query.trim().is_empty() {
            return Err(AggregateError::EmptyQuery);
        }

        if let Some(cached) = self.cache.lookup(query) {
            info!(query = query, count = cached.len(), "[AGGREGATOR] Cache hit");
            return Ok(cached);
        }

        let handles: Vec<_> = self
            .sources
            .iter()
            .map(|source| {
                let source = Arc::clone(source);
                let query = query.to_string();
                tokio::spawn(async move { source.search(&query).await })
            })
            .collect();

        let outcomes = futures_util::future::join_all(handles).await;

        let mut all = Vec::new();
        for (source, outcome) in self.sources.iter().zip(outcomes) {
            let provider = source.provider();
            match outcome {
                Ok(Ok(papers)) => {
                    debug!(provider = %provider, count = papers.len(), "[AGGREGATOR] Provider returned");
                    all.extend(papers);
                }
                Ok(Err(e)) => {
                    warn!(provider = %provider, error = %e, "[AGGREGATOR] Provider failed, using empty list");
                }
                Err(e) if e.is_cancelled() => {
                    warn!(provider = %provider, "[AGGREGATOR] Fetch task cancelled");
                    return Err(AggregateError::Aborted);
                }
                Err(e) => {
                    warn!(provider = %provider, error = %e, "[AGGREGATOR] Fetch task panicked, using empty list");
                }
            }
        }

        let fetched = all.len();
        let results = dedupe_papers(all);
        info!(
            query = query,
            fetched = fetched,
            kept = results.len(),
            "[AGGREGATOR] Aggregated results"
        );

        self.cache.insert(query, &results);
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceProvider;
    use crate::services::sources::SourceError;
    use crate::services::state_store::MemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn paper(id: &str, title: &str, doi: Option<&str>) -> PaperRecord {
        PaperRecord {
            id: id.to_string(),
            title: title.to_string(),
            authors: "Unknown".to_string(),
            abstract_text: "No abstract available".to_string(),
            year: None,
            citation_count: 0,
            venue: "Unknown".to_string(),
            source_provider: SourceProvider::SemanticScholar,
            url: String::new(),
            pdf_url: None,
            doi: doi.map(str::to_string),
            is_open_access: false,
        }
    }

    struct FakeSource {
        provider: SourceProvider,
        papers: Vec<PaperRecord>,
        fail: bool,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl PaperSource for FakeSource {
        fn provider(&self) -> SourceProvider {
            self.provider
        }

        async fn search(&self, _query: &str) -> Result<Vec<PaperRecord>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(SourceError::Status { provider: self.provider, status: 503 });
            }
            Ok(self.papers.clone())
        }
    }

    fn fake(provider: SourceProvider, papers: Vec<PaperRecord>, fail: bool, calls: &Arc<AtomicUsize>) -> Arc<dyn PaperSource> {
        Arc::new(FakeSource { provider, papers, fail, calls: Arc::clone(calls) })
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("  Deep   Learning: A Survey! "), "deep learning a survey");
        assert_eq!(normalize_title("snake_case kept"), "snake_case kept");
        assert_eq!(normalize_title("?!"), "");
    }

    #[test]
    fn test_title_similarity() {
        assert_eq!(title_similarity("a b c", "a b c"), 1.0);
        assert!((title_similarity("a b", "b c") - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(title_similarity("", ""), 1.0);
    }

    #[test]
    fn test_dedupe_by_doi_and_title() {
        let papers = vec![
            paper("1", "Quantum Computing: An Overview", Some("10.1/a")),
            paper("2", "A different paper entirely", Some("10.1/a")),
            paper("3", "quantum computing an overview", None),
            paper("4", "Something else", None),
        ];
        let kept = dedupe_papers(papers);
        let ids: Vec<_> = kept.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "4"]);
    }

    #[test]
    fn test_doi_matching_retained_id_collapses() {
        let papers = vec![
            paper("10.1/x", "Graph neural networks for chemistry", None),
            paper("2", "Unrelated survey of compilers", Some("10.1/x")),
            paper("3", "Yet another topic", Some("4")),
            paper("4", "Fourth distinct title here", None),
        ];
        let kept = dedupe_papers(papers);
        let ids: Vec<_> = kept.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["10.1/x", "3", "4"]);
    }

    #[test]
    fn test_empty_titles_collide() {
        let kept = dedupe_papers(vec![paper("1", "", None), paper("2", "...", None)]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "1");
    }

    #[test]
    fn test_cache_ttl() {
        let cache = ResultCache::new(Arc::new(MemoryStore::new()));
        let results = vec![paper("1", "T", None)];
        cache.insert_at("q", &results, 1_000);
        assert_eq!(cache.lookup_at("q", 1_000 + CACHE_TTL_MS).map(|r| r.len()), Some(1));
        assert!(cache.lookup_at("q", 1_001 + CACHE_TTL_MS).is_none());
        assert!(cache.lookup_at("other", 1_000).is_none());
    }

    #[test]
    fn test_cache_evicts_oldest_on_eleventh_insert() {
        let cache = ResultCache::new(Arc::new(MemoryStore::new()));
        for i in 0..10 {
            cache.insert_at(&format!("q{}", i), &[], 100 + i as i64);
        }
        assert_eq!(cache.keys().len(), 10);
        cache.insert_at("q10", &[], 500);
        let keys = cache.keys();
        assert_eq!(keys.len(), 10);
        assert!(!keys.contains(&"q0".to_string()));
        assert!(keys.contains(&"q10".to_string()));
    }

    #[test]
    fn test_cache_write_failure_keeps_newest() {
        let store = Arc::new(MemoryStore::with_quota(200));
        let cache = ResultCache::new(store);
        for i in 0..8 {
            cache.insert_at(&format!("query-{}", i), &[], 100 + i as i64);
        }
        let keys = cache.keys();
        assert!(keys.len() <= 5);
        assert!(keys.contains(&"query-7".to_string()));
    }

    #[tokio::test]
    async fn test_aggregate_isolates_failures_and_orders_groups() {
        let calls = Arc::new(AtomicUsize::new(0));
        let aggregator = Aggregator::new(
            vec![
                fake(SourceProvider::SemanticScholar, vec![paper("s1", "Alpha", None)], false, &calls),
                fake(SourceProvider::CrossRef, vec![], true, &calls),
                fake(SourceProvider::ArXiv, vec![paper("a1", "Beta", None)], false, &calls),
            ],
            Arc::new(MemoryStore::new()),
        );

        let results = aggregator.aggregate("topic").await.unwrap();
        let ids: Vec<_> = results.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "a1"]);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_second_lookup_is_served_from_cache() {
        let calls = Arc::new(AtomicUsize::new(0));
        let aggregator = Aggregator::new(
            vec![fake(SourceProvider::SemanticScholar, vec![paper("s1", "Alpha", None)], false, &calls)],
            Arc::new(MemoryStore::new()),
        );

        aggregator.aggregate("topic").await.unwrap();
        let again = aggregator.aggregate("topic").await.unwrap();
        assert_eq!(again.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_quantum_computing_scenario() {
        let calls = Arc::new(AtomicUsize::new(0));
        let s2 = vec![
            paper("s1", "Quantum Computing in the NISQ Era and Beyond", None),
            paper("s2", "Quantum supremacy using a programmable superconducting processor", Some("10.1038/s41586-019-1666-5")),
        ];
        let crossref = vec![
            paper("10.1038/s41586-019-1666-5", "Quantum supremacy: programmable superconducting processors", Some("10.1038/s41586-019-1666-5")),
            paper("10.1/x", "Topological quantum codes", Some("10.1/x")),
        ];
        let arxiv = vec![
            paper("1801.00862", "Quantum computing in the NISQ era and beyond.", None),
            paper("2001.00001", "Variational quantum eigensolvers", None),
        ];
        let aggregator = Aggregator::new(
            vec![
                fake(SourceProvider::SemanticScholar, s2, false, &calls),
                fake(SourceProvider::CrossRef, crossref, false, &calls),
                fake(SourceProvider::ArXiv, arxiv, false, &calls),
            ],
            Arc::new(MemoryStore::new()),
        );

        let results = aggregator.aggregate("quantum computing").await.unwrap();
        assert_eq!(results.len(), 6 - 2);
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let aggregator = Aggregator::new(vec![], Arc::new(MemoryStore::new()));
        assert!(matches!(aggregator.aggregate("   ").await, Err(AggregateError::EmptyQuery)));
    }
}
