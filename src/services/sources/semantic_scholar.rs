// Semantic Scholar Source
// Graph API paper search and JSON normalization

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::warn;

use super::{get_text, non_empty, year_prefix, PaperSource, SourceError};
use crate::models::{synthetic_paper_id, PaperRecord, SourceProvider, NO_ABSTRACT, UNKNOWN, UNTITLED};

const SEARCH_URL: &str = "https://api.semanticscholar.org/graph/v1/paper/search";
const FIELDS: &str = "paperId,title,abstract,authors,year,citationCount,openAccessPdf,url,venue,publicationDate";

pub struct SemanticScholarSource {
    client: Client,
    url: String,
    limit: u32,
}

impl SemanticScholarSource {
    pub fn new(client: Client, limit: u32) -> Self {
        let url = std::env::var("SEMANTIC_SCHOLAR_API_URL").unwrap_or_else(|_| SEARCH_URL.to_string());
        Self { client, url, limit }
    }
}

#[async_trait]
impl PaperSource for SemanticScholarSource {
    fn provider(&self) -> SourceProvider {
        SourceProvider::SemanticScholar
    }

    async fn search(&self, query: &str) -> Result<Vec<PaperRecord>, SourceError> {
        let params = [
            ("query", query.to_string()),
            ("limit", self.limit.to_string()),
            ("fields", FIELDS.to_string()),
        ];
        let body = get_text(&self.client, self.provider(), &self.url, &params).await?;
        Ok(normalize(&body))
    }
}

/// Normalize a `/paper/search` response body.
pub fn normalize(raw: &str) -> Vec<PaperRecord> {
    let data: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "[SEMANTIC_SCHOLAR] Unparseable response");
            return Vec::new();
        }
    };

    let Some(items) = data["data"].as_array() else {
        warn!("[SEMANTIC_SCHOLAR] Response has no data array");
        return Vec::new();
    };

    items.iter().map(normalize_paper).collect()
}

fn normalize_paper(paper: &Value) -> PaperRecord {
    let id = non_empty(paper["paperId"].as_str()).unwrap_or_else(synthetic_paper_id);

    let authors = paper["authors"]
        .as_array()
        .map(|list| {
            list.iter()
                .filter_map(|a| a["name"].as_str())
                .collect::<Vec<_>>()
                .join(", ")
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string());

    let year = paper["year"]
        .as_i64()
        .filter(|y| *y != 0)
        .map(|y| y as i32)
        .or_else(|| paper["publicationDate"].as_str().and_then(year_prefix));

    let pdf_url = non_empty(paper["openAccessPdf"]["url"].as_str());
    let is_open_access = paper["openAccessPdf"].is_object();

    PaperRecord {
        title: non_empty(paper["title"].as_str()).unwrap_or_else(|| UNTITLED.to_string()),
        authors,
        abstract_text: non_empty(paper["abstract"].as_str()).unwrap_or_else(|| NO_ABSTRACT.to_string()),
        year,
        citation_count: paper["citationCount"].as_u64().unwrap_or(0) as u32,
        venue: non_empty(paper["venue"].as_str()).unwrap_or_else(|| UNKNOWN.to_string()),
        source_provider: SourceProvider::SemanticScholar,
        url: non_empty(paper["url"].as_str())
            .unwrap_or_else(|| format!("https://www.semanticscholar.org/paper/{}", id)),
        pdf_url,
        doi: None,
        is_open_access,
        id,
    }
}
