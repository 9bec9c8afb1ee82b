use proptest::prelude::*;
use proptest::sample::Index;
use serde_json::json;

use scholarpen_lib::models::{
    PaperRecord, SearchFilters, SortOrder, SourceFilter, SourceProvider, Verdict, WireProtocol,
};
use scholarpen_lib::services::aggregator::dedupe_papers;
use scholarpen_lib::services::detection::heuristic::score;
use scholarpen_lib::services::filters::{apply_filters, filter_and_sort};
use scholarpen_lib::services::stream_decoder::{decode_all, StreamDecoder};

const PROVIDERS: [SourceProvider; 3] = [
    SourceProvider::SemanticScholar,
    SourceProvider::CrossRef,
    SourceProvider::ArXiv,
];

fn paper(id: usize, title: String, doi: Option<String>, year: Option<i32>, citations: u32, provider: usize, oa: bool) -> PaperRecord {
    PaperRecord {
        id: format!("p{}", id),
        title,
        authors: "Unknown".to_string(),
        abstract_text: "No abstract available".to_string(),
        year,
        citation_count: citations,
        venue: "Unknown".to_string(),
        source_provider: PROVIDERS[provider % 3],
        url: String::new(),
        pdf_url: None,
        doi,
        is_open_access: oa,
    }
}

fn papers_strategy() -> impl Strategy<Value = Vec<PaperRecord>> {
    prop::collection::vec(
        (
            prop::sample::select(vec!["deep learning", "graph networks", "protein folding", "quantum error correction"]),
            prop::option::of(0u8..4),
            prop::option::of(1990i32..2025),
            0u32..500,
            0usize..3,
            any::<bool>(),
            "[a-z ]{0,12}",
        ),
        0..24,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (base, doi, year, citations, provider, oa, suffix))| {
                let title = format!("{} {}", base, suffix);
                let doi = doi.map(|d| format!("10.1000/{}", d));
                paper(i, title, doi, year, citations, provider, oa)
            })
            .collect()
    })
}

fn filters_strategy() -> impl Strategy<Value = SearchFilters> {
    (
        prop::option::of(1990i32..2025),
        prop::option::of(1990i32..2025),
        0u32..300,
        any::<bool>(),
        prop::option::of(0usize..3),
    )
        .prop_map(|(year_min, year_max, min_citations, open_access_only, source)| SearchFilters {
            year_min,
            year_max,
            min_citations,
            open_access_only,
            source: source.map_or(SourceFilter::All, |i| SourceFilter::Only(PROVIDERS[i])),
        })
}

fn framed_body(wire: WireProtocol, deltas: &[String]) -> String {
    let mut body = String::new();
    for delta in deltas {
        let event = match wire {
            WireProtocol::OpenAi => json!({"choices": [{"delta": {"content": delta}}]}),
            WireProtocol::Anthropic => json!({"type": "content_block_delta", "delta": {"type": "text_delta", "text": delta}}),
            WireProtocol::Gemini => json!({"candidates": [{"content": {"parts": [{"text": delta}]}}]}),
        };
        body.push_str(&format!("data: {}\r\n\r\n", event));
    }
    if wire == WireProtocol::OpenAi {
        body.push_str("data: [DONE]\n\n");
    }
    body
}

fn decode_in_chunks(wire: WireProtocol, body: &[u8], cuts: &[Index]) -> Vec<String> {
    let mut points: Vec<usize> = cuts.iter().map(|c| c.index(body.len() + 1)).collect();
    points.sort_unstable();
    let mut decoder = StreamDecoder::new(wire);
    let mut deltas = Vec::new();
    let mut start = 0;
    for point in points {
        deltas.extend(decoder.feed(&body[start..point]));
        start = point;
    }
    deltas.extend(decoder.feed(&body[start..]));
    deltas.extend(decoder.finish());
    deltas
}

proptest! {
    #[test]
    fn dedupe_is_idempotent_and_never_grows(papers in papers_strategy()) {
        let once = dedupe_papers(papers.clone());
        prop_assert!(once.len() <= papers.len());
        let twice = dedupe_papers(once.clone());
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn shared_doi_always_collapses(papers in papers_strategy()) {
        let kept = dedupe_papers(papers);
        let mut dois: Vec<&String> = kept.iter().filter_map(|p| p.doi.as_ref()).collect();
        let total = dois.len();
        dois.sort();
        dois.dedup();
        prop_assert_eq!(dois.len(), total);
    }

    #[test]
    fn dissimilar_titles_without_doi_are_kept(n in 0usize..30) {
        let papers: Vec<PaperRecord> = (0..n)
            .map(|i| paper(i, format!("topic{} study{}", i, i), None, None, 0, i, false))
            .collect();
        prop_assert_eq!(dedupe_papers(papers.clone()).len(), n);
    }

    #[test]
    fn relevance_order_is_filtered_input_order(papers in papers_strategy(), filters in filters_strategy()) {
        let view = filter_and_sort(&papers, &filters, SortOrder::Relevance);
        prop_assert_eq!(view, apply_filters(&papers, &filters));
    }

    #[test]
    fn citation_sort_is_non_increasing(papers in papers_strategy(), filters in filters_strategy()) {
        let view = filter_and_sort(&papers, &filters, SortOrder::Citations);
        prop_assert!(view.windows(2).all(|w| w[0].citation_count >= w[1].citation_count));
    }

    #[test]
    fn year_sort_treats_missing_year_as_zero(papers in papers_strategy()) {
        let view = filter_and_sort(&papers, &SearchFilters::default(), SortOrder::Year);
        prop_assert_eq!(view.len(), papers.len());
        prop_assert!(view.windows(2).all(|w| w[0].year.unwrap_or(0) >= w[1].year.unwrap_or(0)));
    }

    #[test]
    fn detector_score_is_bounded(words in prop::collection::vec("[A-Za-z']{1,10}[.,!?]?", 0..120)) {
        let text = words.join(" ");
        let result = score(&text);
        prop_assert!(result.ai_score <= 100);
        prop_assert_eq!(u32::from(result.ai_score) + u32::from(result.human_score), 100);
    }

    #[test]
    fn detector_ignores_surrounding_whitespace(
        words in prop::collection::vec("[A-Za-z]{1,10}[.?]?", 40..90),
        pad in "[ \t\n]{0,6}",
    ) {
        let text = words.join(" ");
        prop_assert_eq!(score(&format!("{}{}{}", pad, text, pad)), score(&text));
    }

    #[test]
    fn short_text_needs_more(words in prop::collection::vec("[A-Za-z]{1,10}", 0..50)) {
        let result = score(&words.join(" "));
        prop_assert_eq!(result.ai_score, 50);
        prop_assert_eq!(result.verdict, Verdict::NeedMoreText);
    }

    #[test]
    fn chunk_splits_do_not_change_deltas(
        deltas in prop::collection::vec("[a-zA-Z0-9 .,é✓\"\\\\]{1,12}", 0..10),
        cuts in prop::collection::vec(any::<Index>(), 0..12),
    ) {
        for wire in [WireProtocol::OpenAi, WireProtocol::Anthropic, WireProtocol::Gemini] {
            let body = framed_body(wire, &deltas);
            let whole = decode_all(wire, body.as_bytes());
            prop_assert_eq!(&whole, &deltas);
            prop_assert_eq!(decode_in_chunks(wire, body.as_bytes(), &cuts), whole);
        }
    }
}
