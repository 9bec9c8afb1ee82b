// arXiv Source
// Atom feed query and XML normalization

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client;
use tracing::warn;

use super::{get_text, year_prefix, PaperSource, SourceError};
use crate::models::{synthetic_paper_id, PaperRecord, SourceProvider, NO_ABSTRACT, UNKNOWN, UNTITLED};

const QUERY_URL: &str = "http://export.arxiv.org/api/query";

pub struct ArxivSource {
    client: Client,
    url: String,
    max_results: u32,
}

impl ArxivSource {
    pub fn new(client: Client, max_results: u32) -> Self {
        let url = std::env::var("ARXIV_API_URL").unwrap_or_else(|_| QUERY_URL.to_string());
        Self { client, url, max_results }
    }
}

#[async_trait]
impl PaperSource for ArxivSource {
    fn provider(&self) -> SourceProvider {
        SourceProvider::ArXiv
    }

    async fn search(&self, query: &str) -> Result<Vec<PaperRecord>, SourceError> {
        let params = [
            ("search_query", format!("all:{}", query)),
            ("start", "0".to_string()),
            ("max_results", self.max_results.to_string()),
        ];
        let body = get_text(&self.client, self.provider(), &self.url, &params).await?;
        Ok(normalize(&body))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Field {
    Id,
    Title,
    Summary,
    Published,
    AuthorName,
}

#[derive(Debug, Default)]
struct EntryDraft {
    id: String,
    title: String,
    summary: String,
    published: String,
    authors: Vec<String>,
}

impl EntryDraft {
    fn push_text(&mut self, field: Field, text: &str, author_name: &mut String) {
        match field {
            Field::Id => self.id.push_str(text),
            Field::Title => self.title.push_str(text),
            Field::Summary => self.summary.push_str(text),
            Field::Published => self.published.push_str(text),
            Field::AuthorName => author_name.push_str(text),
        }
    }

    fn into_record(self) -> PaperRecord {
        let entry_url = self.id.trim().to_string();
        let id = entry_url
            .split("/abs/")
            .nth(1)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(synthetic_paper_id);

        let title = self.title.trim();
        let summary = self.summary.trim();
        let authors = self.authors.join(", ");

        PaperRecord {
            id,
            title: if title.is_empty() { UNTITLED.to_string() } else { title.to_string() },
            authors: if authors.is_empty() { UNKNOWN.to_string() } else { authors },
            abstract_text: if summary.is_empty() { NO_ABSTRACT.to_string() } else { summary.to_string() },
            year: year_prefix(self.published.trim()),
            citation_count: 0,
            venue: "arXiv".to_string(),
            source_provider: SourceProvider::ArXiv,
            pdf_url: (!entry_url.is_empty()).then(|| format!("{}.pdf", entry_url.replace("/abs/", "/pdf/"))),
            url: entry_url,
            doi: None,
            is_open_access: true,
        }
    }
}

/// Normalize an Atom feed body.
pub fn normalize(raw: &str) -> Vec<PaperRecord> {
    match parse_feed(raw) {
        Ok(entries) => entries.into_iter().map(EntryDraft::into_record).collect(),
        Err(e) => {
            warn!(error = %e, "[ARXIV] Unparseable Atom feed");
            Vec::new()
        }
    }
}

fn parse_feed(xml: &str) -> Result<Vec<EntryDraft>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut current: Option<EntryDraft> = None;
    let mut field: Option<Field> = None;
    let mut in_author = false;
    let mut author_name = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let in_entry = current.is_some();
                field = match e.local_name().as_ref() {
                    b"entry" => {
                        current = Some(EntryDraft::default());
                        None
                    }
                    b"author" if in_entry => {
                        in_author = true;
                        None
                    }
                    b"name" if in_author => {
                        author_name.clear();
                        Some(Field::AuthorName)
                    }
                    b"id" if in_entry => Some(Field::Id),
                    b"title" if in_entry => Some(Field::Title),
                    b"summary" if in_entry => Some(Field::Summary),
                    b"published" if in_entry => Some(Field::Published),
                    _ => None,
                };
            }
            Event::Text(t) => {
                if let (Some(f), Some(entry)) = (field, current.as_mut()) {
                    let text = t.unescape()?;
                    entry.push_text(f, &text, &mut author_name);
                }
            }
            Event::CData(c) => {
                if let (Some(f), Some(entry)) = (field, current.as_mut()) {
                    let bytes = c.into_inner();
                    entry.push_text(f, &String::from_utf8_lossy(&bytes), &mut author_name);
                }
            }
            Event::End(e) => {
                match e.local_name().as_ref() {
                    b"entry" => {
                        if let Some(entry) = current.take() {
                            entries.push(entry);
                        }
                        in_author = false;
                    }
                    b"author" => in_author = false,
                    b"name" if field == Some(Field::AuthorName) => {
                        if let Some(entry) = current.as_mut() {
                            let name = author_name.trim();
                            if !name.is_empty() {
                                entry.authors.push(name.to_string());
                            }
                        }
                    }
                    _ => {}
                }
                field = None;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <title type="html">ArXiv Query: search_query=all:quantum</title>
  <id>http://arxiv.org/api/abc</id>
  <entry>
    <id>http://arxiv.org/abs/2101.00001v1</id>
    <published>2021-01-01T00:00:00Z</published>
    <title>
      Quantum Error Correction &amp; You
    </title>
    <summary>  We study codes.  </summary>
    <author><name>Alice Smith</name></author>
    <author><name>Bob Jones</name><arxiv:affiliation>MIT</arxiv:affiliation></author>
    <link href="http://arxiv.org/abs/2101.00001v1" rel="alternate" type="text/html"/>
    <arxiv:primary_category term="quant-ph"/>
  </entry>
  <entry>
    <id></id>
    <published>bad</published>
  </entry>
</feed>"#;

    #[test]
    fn test_normalize_entries() {
        let papers = normalize(FEED);
        assert_eq!(papers.len(), 2);

        let p = &papers[0];
        assert_eq!(p.id, "2101.00001v1");
        assert_eq!(p.title, "Quantum Error Correction & You");
        assert_eq!(p.authors, "Alice Smith, Bob Jones");
        assert_eq!(p.abstract_text, "We study codes.");
        assert_eq!(p.year, Some(2021));
        assert_eq!(p.url, "http://arxiv.org/abs/2101.00001v1");
        assert_eq!(p.pdf_url.as_deref(), Some("http://arxiv.org/pdf/2101.00001v1.pdf"));
        assert_eq!(p.venue, "arXiv");
        assert!(p.is_open_access);
        assert_eq!(p.citation_count, 0);
    }

    #[test]
    fn test_feed_title_not_taken_as_entry_title() {
        let papers = normalize(FEED);
        assert!(papers.iter().all(|p| !p.title.contains("ArXiv Query")));
    }

    #[test]
    fn test_empty_entry_fallbacks() {
        let p = &normalize(FEED)[1];
        assert!(p.id.starts_with("paper_"));
        assert_eq!(p.title, "Untitled");
        assert_eq!(p.authors, "Unknown");
        assert!(p.year.is_none());
        assert!(p.pdf_url.is_none());
    }

    #[test]
    fn test_broken_xml_yields_empty() {
        assert!(normalize("<feed><entry><id>x</entry></feed>").is_empty());
    }
}
