// Detection Lexicon
// Word lists and compiled patterns used by the local heuristic scorer

use regex::Regex;
use std::sync::OnceLock;

/// Stock phrases that show up far more often in LLM output than in human prose.
pub const AI_PHRASES: &[&str] = &[
    "it is important to note",
    "it is worth noting",
    "it should be noted",
    "it is essential to",
    "it is crucial to",
    "it is vital to",
    "in today's world",
    "in the modern era",
    "in contemporary society",
    "plays a crucial role",
    "plays an important role",
    "plays a significant role",
    "delve into",
    "dive deep into",
    "explore the intricacies",
    "comprehensive overview",
    "holistic approach",
    "nuanced understanding",
    "a testament to",
    "serves as a reminder",
    "stands as a beacon",
    "the realm of",
    "navigating the",
    "in the landscape of",
    "it's worth mentioning",
    "it bears mentioning",
    "one cannot overstate",
    "at the heart of",
    "the crux of the matter",
    "sheds light on",
    "pave the way",
    "the cornerstone of",
    "a myriad of",
    "foster a sense of",
    "cultivate an environment",
    "harness the power",
];

pub const FORMAL_TRANSITIONS: &[&str] = &[
    "furthermore",
    "moreover",
    "additionally",
    "consequently",
    "nevertheless",
    "henceforth",
    "thereby",
    "whereby",
    "wherein",
    "therein",
    "notwithstanding",
    "nonetheless",
    "in lieu of",
    "vis-à-vis",
    "in light of this",
    "with this in mind",
    "given this context",
    "it follows that",
    "by extension",
    "in tandem with",
];

pub const AI_VOCABULARY: &[&str] = &[
    "multifaceted",
    "paramount",
    "myriad",
    "plethora",
    "pivotal",
    "intricate",
    "nuanced",
    "comprehensive",
    "robust",
    "seamless",
    "innovative",
    "transformative",
    "groundbreaking",
    "cutting-edge",
    "meticulous",
    "rigorous",
    "holistic",
    "synergy",
    "synergistic",
    "leverage",
    "utilize",
    "facilitate",
    "optimize",
    "streamline",
    "paradigm",
    "ecosystem",
    "landscape",
    "framework",
    "methodology",
    "imperative",
    "indispensable",
    "instrumental",
    "quintessential",
    "ubiquitous",
    "unprecedented",
    "unparalleled",
    "undeniable",
];

const STARTER_PATTERNS: &[&str] = &[
    r"(?i)^This (is|was|has|demonstrates|shows|highlights|indicates|suggests|illustrates|reveals|represents|provides)",
    r"(?i)^It (is|was|has been|should be|can be|must be) (important|essential|crucial|vital|worth|clear|evident|noted|mentioned)",
    r"(?i)^(Furthermore|Moreover|Additionally|Consequently|Nevertheless|However|Therefore|Thus|Hence),?\s",
    r"(?i)^In (conclusion|summary|addition|contrast|order to|light of|terms of|the context of|this regard)",
    r"(?i)^The (importance|significance|role|impact|concept|notion|idea|purpose|goal|aim) of",
    r"(?i)^(One|Another|A key|An important|A significant|A crucial) (aspect|factor|element|point|consideration)",
    r"(?i)^There (is|are|has been|have been|exists?) (a|an|no|some|many|several|numerous|significant|growing)",
    r"(?i)^(Overall|Ultimately|Essentially|Fundamentally|Basically),?\s",
];

/// Whole-word, case-insensitive matcher for a list entry.
fn word_matcher(word: &str) -> Regex {
    Regex::new(&format!(r"(?i)\b{}\b", regex::escape(word))).unwrap()
}

pub fn transition_res() -> &'static [(&'static str, Regex)] {
    static RES: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    RES.get_or_init(|| FORMAL_TRANSITIONS.iter().map(|w| (*w, word_matcher(w))).collect())
}

pub fn vocabulary_res() -> &'static [(&'static str, Regex)] {
    static RES: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    RES.get_or_init(|| AI_VOCABULARY.iter().map(|w| (*w, word_matcher(w))).collect())
}

pub fn starter_res() -> &'static [Regex] {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| STARTER_PATTERNS.iter().map(|p| Regex::new(p).unwrap()).collect())
}

// ============ Human indicators ============

pub fn contraction_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(don't|won't|can't|isn't|aren't|wasn't|weren't|hasn't|haven't|couldn't|wouldn't|shouldn't|didn't|doesn't|I'm|I've|I'll|I'd|we're|we've|we'll|they're|they've|you're|you've|it's|that's|there's|here's|what's|who's|let's)\b",
        )
        .unwrap()
    })
}

pub fn personal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(I think|I believe|I feel|in my opinion|personally|honestly|frankly|actually|basically|literally)\b")
            .unwrap()
    })
}

pub fn casual_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(pretty|really|very|quite|kind of|sort of|a bit|stuff|things|gonna|wanna|gotta|yeah|ok|okay|cool|awesome|great|nice|bad|good)\b",
        )
        .unwrap()
    })
}

pub fn stylistic_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"—|\.{3}|–").unwrap())
}

pub fn parenthetical_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\([^)]+\)").unwrap())
}

// ============ Segmentation ============

pub fn sentence_split_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?]+").unwrap())
}

pub fn paragraph_split_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n\s*\n").unwrap())
}
