// Paper Search Sources
// One HTTP client + normalizer per academic search provider

pub mod arxiv;
pub mod crossref;
pub mod semantic_scholar;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

use crate::models::{PaperRecord, SourceProvider};
use crate::services::config_store::SearchConfig;

pub use arxiv::ArxivSource;
pub use crossref::CrossRefSource;
pub use semantic_scholar::SemanticScholarSource;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{provider} returned status {status}")]
    Status { provider: SourceProvider, status: u16 },
}

/// A searchable academic index.
#[async_trait]
pub trait PaperSource: Send + Sync {
    fn provider(&self) -> SourceProvider;

    /// Fetch and normalize results. Malformed payloads yield `Ok(vec![])`;
    /// only transport and status failures are errors.
    async fn search(&self, query: &str) -> Result<Vec<PaperRecord>, SourceError>;
}

pub(crate) fn http_client() -> Client {
    Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .user_agent(concat!("scholarpen/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_default()
}

/// Issue a GET and return the body text, mapping non-success statuses to errors.
pub(crate) async fn get_text(
    client: &Client,
    provider: SourceProvider,
    url: &str,
    query: &[(&str, String)],
) -> Result<String, SourceError> {
    let response = client.get(url).query(query).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::Status { provider, status: status.as_u16() });
    }
    Ok(response.text().await?)
}

/// The three public sources in provider-group order.
pub fn default_sources(config: &SearchConfig) -> Vec<std::sync::Arc<dyn PaperSource>> {
    let client = http_client();
    vec![
        std::sync::Arc::new(SemanticScholarSource::new(client.clone(), config.semantic_scholar_limit)),
        std::sync::Arc::new(CrossRefSource::new(
            client.clone(),
            config.crossref_rows,
            config.crossref_mailto.clone(),
        )),
        std::sync::Arc::new(ArxivSource::new(client, config.arxiv_max_results)),
    ]
}

/// First four characters of a date string, parsed as a year.
pub(crate) fn year_prefix(date: &str) -> Option<i32> {
    date.get(..4).and_then(|y| y.parse().ok())
}

pub(crate) fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}
