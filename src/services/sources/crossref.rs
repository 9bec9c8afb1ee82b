// CrossRef Source
// Works API search and JSON normalization

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::warn;

use super::{get_text, non_empty, PaperSource, SourceError};
use crate::models::{synthetic_paper_id, PaperRecord, SourceProvider, NO_ABSTRACT, UNKNOWN, UNTITLED};

const WORKS_URL: &str = "https://api.crossref.org/works";
const PDF_CONTENT_TYPE: &str = "application/pdf";

pub struct CrossRefSource {
    client: Client,
    url: String,
    rows: u32,
    mailto: String,
}

impl CrossRefSource {
    pub fn new(client: Client, rows: u32, mailto: String) -> Self {
        let url = std::env::var("CROSSREF_API_URL").unwrap_or_else(|_| WORKS_URL.to_string());
        Self { client, url, rows, mailto }
    }
}

#[async_trait]
impl PaperSource for CrossRefSource {
    fn provider(&self) -> SourceProvider {
        SourceProvider::CrossRef
    }

    async fn search(&self, query: &str) -> Result<Vec<PaperRecord>, SourceError> {
        let params = [
            ("query", query.to_string()),
            ("rows", self.rows.to_string()),
            ("mailto", self.mailto.clone()),
        ];
        let body = get_text(&self.client, self.provider(), &self.url, &params).await?;
        Ok(normalize(&body))
    }
}

fn jats_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"</?jats:[^>]*>").unwrap())
}

/// Normalize a `/works` response body.
pub fn normalize(raw: &str) -> Vec<PaperRecord> {
    let data: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "[CROSSREF] Unparseable response");
            return Vec::new();
        }
    };

    let Some(items) = data["message"]["items"].as_array() else {
        warn!("[CROSSREF] Response has no message.items array");
        return Vec::new();
    };

    items.iter().map(normalize_item).collect()
}

fn first_date_part(item: &Value, field: &str) -> Option<i32> {
    item[field]["date-parts"][0][0].as_i64().map(|y| y as i32)
}

fn normalize_item(item: &Value) -> PaperRecord {
    let doi = non_empty(item["DOI"].as_str());
    let id = doi.clone().unwrap_or_else(synthetic_paper_id);

    let authors = item["author"]
        .as_array()
        .map(|list| {
            list.iter()
                .map(|a| {
                    format!(
                        "{} {}",
                        a["given"].as_str().unwrap_or(""),
                        a["family"].as_str().unwrap_or("")
                    )
                    .trim()
                    .to_string()
                })
                .filter(|name| !name.is_empty())
                .collect::<Vec<_>>()
                .join(", ")
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string());

    let abstract_text = non_empty(item["abstract"].as_str())
        .map(|a| jats_tag_re().replace_all(&a, "").trim().to_string())
        .filter(|a| !a.is_empty())
        .unwrap_or_else(|| NO_ABSTRACT.to_string());

    let pdf_url = item["link"].as_array().and_then(|links| {
        links
            .iter()
            .find(|l| l["content-type"].as_str() == Some(PDF_CONTENT_TYPE))
            .and_then(|l| non_empty(l["URL"].as_str()))
    });
    let is_open_access = item["link"]
        .as_array()
        .map_or(false, |links| links.iter().any(|l| l["content-type"].as_str() == Some(PDF_CONTENT_TYPE)));

    let url = non_empty(item["URL"].as_str()).unwrap_or_else(|| match &doi {
        Some(d) => format!("https://doi.org/{}", d),
        None => String::new(),
    });

    PaperRecord {
        title: non_empty(item["title"][0].as_str()).unwrap_or_else(|| UNTITLED.to_string()),
        authors,
        abstract_text,
        year: first_date_part(item, "published").or_else(|| first_date_part(item, "created")),
        citation_count: item["is-referenced-by-count"].as_u64().unwrap_or(0) as u32,
        venue: non_empty(item["container-title"][0].as_str())
            .or_else(|| non_empty(item["publisher"].as_str()))
            .unwrap_or_else(|| UNKNOWN.to_string()),
        source_provider: SourceProvider::CrossRef,
        url,
        pdf_url,
        doi,
        is_open_access,
        id,
    }
}
