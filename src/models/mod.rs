// ScholarPen Data Models
// Shared shapes for search results, essay options and detection output

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============ Papers ============

/// Where a paper record came from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceProvider {
    #[serde(rename = "Semantic Scholar")]
    SemanticScholar,
    #[serde(rename = "CrossRef")]
    CrossRef,
    #[serde(rename = "arXiv")]
    ArXiv,
    #[serde(rename = "Manual Entry")]
    Manual,
}

impl SourceProvider {
    pub fn label(&self) -> &'static str {
        match self {
            Self::SemanticScholar => "Semantic Scholar",
            Self::CrossRef => "CrossRef",
            Self::ArXiv => "arXiv",
            Self::Manual => "Manual Entry",
        }
    }
}

impl fmt::Display for SourceProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SourceProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "semantic scholar" | "semantic-scholar" | "semanticscholar" | "s2" => Ok(Self::SemanticScholar),
            "crossref" => Ok(Self::CrossRef),
            "arxiv" => Ok(Self::ArXiv),
            "manual" | "manual entry" => Ok(Self::Manual),
            other => Err(format!("unknown source provider: {}", other)),
        }
    }
}

/// Canonical representation of one academic work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperRecord {
    pub id: String,
    pub title: String,
    pub authors: String,
    #[serde(rename = "abstract", default = "default_abstract")]
    pub abstract_text: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub citation_count: u32,
    #[serde(default = "default_unknown")]
    pub venue: String,
    pub source_provider: SourceProvider,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub pdf_url: Option<String>,
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub is_open_access: bool,
}

pub const UNTITLED: &str = "Untitled";
pub const UNKNOWN: &str = "Unknown";
pub const NO_ABSTRACT: &str = "No abstract available";

fn default_abstract() -> String {
    NO_ABSTRACT.to_string()
}

fn default_unknown() -> String {
    UNKNOWN.to_string()
}

/// Synthetic id for records without a natural identifier. Not stable across sessions.
pub fn synthetic_paper_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("paper_{}_{}", millis, &suffix[..9])
}

/// One cached result set, keyed externally by its query string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedResults {
    pub results: Vec<PaperRecord>,
    /// Unix epoch milliseconds at insertion.
    pub timestamp: i64,
}

// ============ Filter & Sort ============

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceFilter {
    #[default]
    All,
    Only(SourceProvider),
}

impl FromStr for SourceFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        s.parse::<SourceProvider>().map(Self::Only)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    #[serde(default)]
    pub year_min: Option<i32>,
    #[serde(default)]
    pub year_max: Option<i32>,
    #[serde(default)]
    pub min_citations: u32,
    #[serde(default)]
    pub open_access_only: bool,
    #[serde(default)]
    pub source: SourceFilter,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Relevance,
    Citations,
    Year,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "relevance" => Ok(Self::Relevance),
            "citations" => Ok(Self::Citations),
            "year" => Ok(Self::Year),
            other => Err(format!("unknown sort order: {}", other)),
        }
    }
}

// ============ Essay Options ============

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EssayLength {
    Short,
    #[default]
    Medium,
    Long,
}

impl EssayLength {
    pub fn target_words(&self) -> u32 {
        match self {
            Self::Short => 500,
            Self::Medium => 1500,
            Self::Long => 3000,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EssayStyle {
    #[default]
    Academic,
    Argumentative,
    Analytical,
    Expository,
    Narrative,
}

impl EssayStyle {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Academic => "academic",
            Self::Argumentative => "argumentative",
            Self::Analytical => "analytical",
            Self::Expository => "expository",
            Self::Narrative => "narrative",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CitationFormat {
    #[default]
    Apa7,
    Mla9,
    Chicago,
    Harvard,
    Ieee,
    Ama,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EssayOptions {
    #[serde(default)]
    pub length: EssayLength,
    #[serde(default)]
    pub style: EssayStyle,
    #[serde(default)]
    pub citation_format: CitationFormat,
    #[serde(default = "default_true")]
    pub humanize: bool,
}

impl Default for EssayOptions {
    fn default() -> Self {
        Self {
            length: EssayLength::default(),
            style: EssayStyle::default(),
            citation_format: CitationFormat::default(),
            humanize: true,
        }
    }
}

fn default_true() -> bool { true }

macro_rules! impl_from_str_lowercase {
    ($ty:ty, $what:literal, { $($name:literal => $variant:expr),+ $(,)? }) => {
        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($name => Ok($variant),)+
                    other => Err(format!(concat!("unknown ", $what, ": {}"), other)),
                }
            }
        }
    };
}

impl_from_str_lowercase!(EssayLength, "essay length", {
    "short" => EssayLength::Short,
    "medium" => EssayLength::Medium,
    "long" => EssayLength::Long,
});

impl_from_str_lowercase!(EssayStyle, "essay style", {
    "academic" => EssayStyle::Academic,
    "argumentative" => EssayStyle::Argumentative,
    "analytical" => EssayStyle::Analytical,
    "expository" => EssayStyle::Expository,
    "narrative" => EssayStyle::Narrative,
});

impl_from_str_lowercase!(CitationFormat, "citation format", {
    "apa7" => CitationFormat::Apa7,
    "mla9" => CitationFormat::Mla9,
    "chicago" => CitationFormat::Chicago,
    "harvard" => CitationFormat::Harvard,
    "ieee" => CitationFormat::Ieee,
    "ama" => CitationFormat::Ama,
});

// ============ LLM Providers ============

/// Streaming wire protocol spoken by an LLM provider.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WireProtocol {
    OpenAi,
    Anthropic,
    Gemini,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LlmProvider {
    #[default]
    #[serde(rename = "gemini")]
    Gemini,
    #[serde(rename = "gemini-pro")]
    GeminiPro,
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "openai-mini")]
    OpenAiMini,
    #[serde(rename = "anthropic")]
    Anthropic,
}

impl LlmProvider {
    pub const ALL: [LlmProvider; 5] = [
        Self::Gemini,
        Self::GeminiPro,
        Self::OpenAi,
        Self::OpenAiMini,
        Self::Anthropic,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::GeminiPro => "gemini-pro",
            Self::OpenAi => "openai",
            Self::OpenAiMini => "openai-mini",
            Self::Anthropic => "anthropic",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Gemini => "Google Gemini 2.0 Flash",
            Self::GeminiPro => "Google Gemini 1.5 Pro",
            Self::OpenAi => "OpenAI GPT-4o",
            Self::OpenAiMini => "OpenAI GPT-4o-mini",
            Self::Anthropic => "Anthropic Claude",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini-2.0-flash",
            Self::GeminiPro => "gemini-1.5-pro",
            Self::OpenAi => "gpt-4o",
            Self::OpenAiMini => "gpt-4o-mini",
            Self::Anthropic => "claude-sonnet-4-20250514",
        }
    }

    pub fn max_tokens(&self) -> u32 {
        match self {
            Self::Gemini | Self::GeminiPro => 8192,
            Self::OpenAi | Self::OpenAiMini => 16000,
            Self::Anthropic => 8000,
        }
    }

    pub fn wire(&self) -> WireProtocol {
        match self {
            Self::Gemini | Self::GeminiPro => WireProtocol::Gemini,
            Self::OpenAi | Self::OpenAiMini => WireProtocol::OpenAi,
            Self::Anthropic => WireProtocol::Anthropic,
        }
    }

    /// Name under which the API key is stored; model variants share one key.
    pub fn credential_name(&self) -> &'static str {
        match self.wire() {
            WireProtocol::Gemini => "gemini",
            WireProtocol::OpenAi => "openai",
            WireProtocol::Anthropic => "anthropic",
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.key() == needle)
            .ok_or_else(|| format!("unknown AI provider: {}", s))
    }
}

// ============ Generation Session ============

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Cancelled,
    Errored,
}

impl GenerationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Errored)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryMode {
    #[default]
    Bullets,
    Paragraph,
    Eli5,
}

impl_from_str_lowercase!(SummaryMode, "summary mode", {
    "bullets" => SummaryMode::Bullets,
    "paragraph" => SummaryMode::Paragraph,
    "eli5" => SummaryMode::Eli5,
});

// ============ Detection ============

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "Need more text (50+ words)")]
    NeedMoreText,
    #[serde(rename = "Highly Likely AI")]
    HighlyLikelyAi,
    #[serde(rename = "Likely AI")]
    LikelyAi,
    #[serde(rename = "Mixed / Uncertain")]
    Mixed,
    #[serde(rename = "Likely Human")]
    LikelyHuman,
    #[serde(rename = "Highly Likely Human")]
    HighlyLikelyHuman,
}

impl Verdict {
    pub fn from_ai_score(score: u8) -> Self {
        match score {
            70..=u8::MAX => Self::HighlyLikelyAi,
            50..=69 => Self::LikelyAi,
            35..=49 => Self::Mixed,
            15..=34 => Self::LikelyHuman,
            _ => Self::HighlyLikelyHuman,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::NeedMoreText => "Need more text (50+ words)",
            Self::HighlyLikelyAi => "Highly Likely AI",
            Self::LikelyAi => "Likely AI",
            Self::Mixed => "Mixed / Uncertain",
            Self::LikelyHuman => "Likely Human",
            Self::HighlyLikelyHuman => "Highly Likely Human",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub phrase_score: u32,
    pub transition_score: u32,
    pub vocab_score: u32,
    pub uniformity_score: u32,
    pub paragraph_score: u32,
    pub starter_score: u32,
    pub human_bonus: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStats {
    pub word_count: usize,
    pub sentence_count: usize,
    pub paragraph_count: usize,
    pub avg_sentence_length: f64,
    /// Unique / total cleaned tokens, in [0, 1].
    pub lexical_diversity: f64,
    pub sentence_length_std_dev: f64,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoundPhrase {
    pub phrase: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionIssues {
    pub ai_phrases: Vec<FoundPhrase>,
    pub ai_vocabulary: Vec<String>,
    pub phrase_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionScore {
    pub ai_score: u8,
    pub human_score: u8,
    pub verdict: Verdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<ScoreBreakdown>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<TextStats>,
    #[serde(default)]
    pub issues: DetectionIssues,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

impl DetectionScore {
    pub fn need_more_text() -> Self {
        Self {
            ai_score: 50,
            human_score: 50,
            verdict: Verdict::NeedMoreText,
            breakdown: None,
            stats: None,
            issues: DetectionIssues::default(),
            suggestions: Vec::new(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExternalDetector {
    ZeroGpt,
    GptZero,
    Sapling,
}

impl ExternalDetector {
    pub const ALL: [ExternalDetector; 3] = [Self::ZeroGpt, Self::GptZero, Self::Sapling];

    pub fn key(&self) -> &'static str {
        match self {
            Self::ZeroGpt => "zerogpt",
            Self::GptZero => "gptzero",
            Self::Sapling => "sapling",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::ZeroGpt => "ZeroGPT",
            Self::GptZero => "GPTZero",
            Self::Sapling => "Sapling AI",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum DetectorOutcome {
    /// No key configured; the service was not called.
    Skipped,
    Failed { message: String },
    #[serde(rename_all = "camelCase")]
    Scored {
        ai_score: u8,
        human_score: u8,
        verdict: String,
        details: serde_json::Value,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalDetection {
    pub detector: ExternalDetector,
    pub name: String,
    pub outcome: DetectorOutcome,
}

impl ExternalDetection {
    pub fn ai_score(&self) -> Option<u8> {
        match &self.outcome {
            DetectorOutcome::Scored { ai_score, .. } => Some(*ai_score),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionReport {
    pub local: DetectionScore,
    pub services: Vec<ExternalDetection>,
    /// Rounded mean over the local score and every successful service.
    pub average_ai_score: Option<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paper_record_camel_case_round_trip() {
        let json = r#"{
            "id": "10.1000/xyz",
            "title": "A Paper",
            "authors": "Ada Lovelace",
            "abstract": "Text",
            "year": 2020,
            "citationCount": 12,
            "venue": "Nature",
            "sourceProvider": "CrossRef",
            "url": "https://doi.org/10.1000/xyz",
            "doi": "10.1000/xyz",
            "isOpenAccess": true
        }"#;
        let paper: PaperRecord = serde_json::from_str(json).unwrap();
        assert_eq!(paper.citation_count, 12);
        assert_eq!(paper.source_provider, SourceProvider::CrossRef);
        assert!(paper.pdf_url.is_none());
        let back = serde_json::to_value(&paper).unwrap();
        assert_eq!(back["abstract"], "Text");
        assert_eq!(back["sourceProvider"], "CrossRef");
    }

    #[test]
    fn test_synthetic_ids_are_distinct() {
        let a = synthetic_paper_id();
        let b = synthetic_paper_id();
        assert!(a.starts_with("paper_"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_verdict_bands() {
        assert_eq!(Verdict::from_ai_score(100), Verdict::HighlyLikelyAi);
        assert_eq!(Verdict::from_ai_score(70), Verdict::HighlyLikelyAi);
        assert_eq!(Verdict::from_ai_score(69), Verdict::LikelyAi);
        assert_eq!(Verdict::from_ai_score(50), Verdict::LikelyAi);
        assert_eq!(Verdict::from_ai_score(35), Verdict::Mixed);
        assert_eq!(Verdict::from_ai_score(15), Verdict::LikelyHuman);
        assert_eq!(Verdict::from_ai_score(14), Verdict::HighlyLikelyHuman);
    }

    #[test]
    fn test_provider_catalogue() {
        assert_eq!("gemini-pro".parse::<LlmProvider>().unwrap(), LlmProvider::GeminiPro);
        assert_eq!(LlmProvider::OpenAiMini.credential_name(), "openai");
        assert_eq!(LlmProvider::Anthropic.wire(), WireProtocol::Anthropic);
        assert_eq!(EssayLength::Medium.target_words(), 1500);
        assert!("nope".parse::<LlmProvider>().is_err());
    }

    #[test]
    fn test_source_filter_parse() {
        assert_eq!("all".parse::<SourceFilter>().unwrap(), SourceFilter::All);
        assert_eq!(
            "arXiv".parse::<SourceFilter>().unwrap(),
            SourceFilter::Only(SourceProvider::ArXiv)
        );
    }
}
