// Result Filtering & Sorting
// Pure predicates and stable orderings over a result set

use crate::models::{PaperRecord, SearchFilters, SortOrder, SourceFilter};

/// A record without a year is never excluded by the year bounds.
pub fn matches(paper: &PaperRecord, filters: &SearchFilters) -> bool {
    if let (Some(min), Some(year)) = (filters.year_min, paper.year) {
        if year < min {
            return false;
        }
    }
    if let (Some(max), Some(year)) = (filters.year_max, paper.year) {
        if year > max {
            return false;
        }
    }
    if paper.citation_count < filters.min_citations {
        return false;
    }
    if filters.open_access_only && !paper.is_open_access {
        return false;
    }
    match filters.source {
        SourceFilter::All => true,
        SourceFilter::Only(provider) => paper.source_provider == provider,
    }
}

pub fn apply_filters(papers: &[PaperRecord], filters: &SearchFilters) -> Vec<PaperRecord> {
    papers.iter().filter(|p| matches(p, filters)).cloned().collect()
}

pub fn sort_results(mut papers: Vec<PaperRecord>, order: SortOrder) -> Vec<PaperRecord> {
    match order {
        SortOrder::Relevance => {}
        SortOrder::Citations => papers.sort_by(|a, b| b.citation_count.cmp(&a.citation_count)),
        SortOrder::Year => papers.sort_by(|a, b| b.year.unwrap_or(0).cmp(&a.year.unwrap_or(0))),
    }
    papers
}

/// Filter then sort, the order the result view applies them in.
pub fn filter_and_sort(papers: &[PaperRecord], filters: &SearchFilters, order: SortOrder) -> Vec<PaperRecord> {
    sort_results(apply_filters(papers, filters), order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceProvider;

    fn paper(id: &str, year: Option<i32>, citations: u32, provider: SourceProvider, open: bool) -> PaperRecord {
        PaperRecord {
            id: id.to_string(),
            title: format!("Paper {}", id),
            authors: "Unknown".to_string(),
            abstract_text: "No abstract available".to_string(),
            year,
            citation_count: citations,
            venue: "Unknown".to_string(),
            source_provider: provider,
            url: String::new(),
            pdf_url: None,
            doi: None,
            is_open_access: open,
        }
    }

    fn sample() -> Vec<PaperRecord> {
        vec![
            paper("a", Some(2015), 10, SourceProvider::SemanticScholar, false),
            paper("b", None, 50, SourceProvider::CrossRef, true),
            paper("c", Some(2022), 10, SourceProvider::ArXiv, true),
            paper("d", Some(2019), 0, SourceProvider::CrossRef, false),
        ]
    }

    fn ids(papers: &[PaperRecord]) -> Vec<&str> {
        papers.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn test_year_bounds_keep_yearless() {
        let filters = SearchFilters { year_min: Some(2018), year_max: Some(2020), ..Default::default() };
        assert_eq!(ids(&apply_filters(&sample(), &filters)), vec!["b", "d"]);
    }

    #[test]
    fn test_citation_open_access_and_source_filters() {
        let filters = SearchFilters { min_citations: 10, ..Default::default() };
        assert_eq!(ids(&apply_filters(&sample(), &filters)), vec!["a", "b", "c"]);

        let filters = SearchFilters { open_access_only: true, ..Default::default() };
        assert_eq!(ids(&apply_filters(&sample(), &filters)), vec!["b", "c"]);

        let filters = SearchFilters {
            source: SourceFilter::Only(SourceProvider::CrossRef),
            ..Default::default()
        };
        assert_eq!(ids(&apply_filters(&sample(), &filters)), vec!["b", "d"]);
    }

    #[test]
    fn test_sorts_are_stable() {
        assert_eq!(ids(&sort_results(sample(), SortOrder::Relevance)), vec!["a", "b", "c", "d"]);
        assert_eq!(ids(&sort_results(sample(), SortOrder::Citations)), vec!["b", "a", "c", "d"]);
        assert_eq!(ids(&sort_results(sample(), SortOrder::Year)), vec!["c", "d", "a", "b"]);
    }

    #[test]
    fn test_filter_and_sort() {
        let filters = SearchFilters { open_access_only: true, ..Default::default() };
        assert_eq!(ids(&filter_and_sort(&sample(), &filters, SortOrder::Year)), vec!["c", "b"]);
    }
}
