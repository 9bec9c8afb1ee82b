// Local Heuristic Detector
// Offline AI-likelihood score from phrase, vocabulary, rhythm and human-marker signals

use std::collections::HashSet;

use tracing::debug;

use crate::models::{
    DetectionIssues, DetectionScore, FoundPhrase, ScoreBreakdown, Severity, TextStats, Verdict,
};

use super::lexicon::{
    casual_re, contraction_re, paragraph_split_re, parenthetical_re, personal_re, sentence_split_re,
    starter_res, stylistic_re, transition_res, vocabulary_res, AI_PHRASES,
};

pub const MIN_WORDS: usize = 50;

const MAX_LISTED_PHRASES: usize = 12;
const MAX_REPORTED_PHRASES: usize = 8;
const MAX_REPORTED_VOCAB: usize = 6;
const MAX_SUGGESTIONS: usize = 4;

fn capped(count: usize, weight: f64, cap: f64) -> f64 {
    (count as f64 * weight).min(cap)
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn std_dev(values: &[f64], avg: f64) -> f64 {
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Score `text` for AI-likeness. Pure; leading and trailing whitespace never changes the result.
pub fn score(text: &str) -> DetectionScore {
    let text = text.trim();
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() < MIN_WORDS {
        return DetectionScore::need_more_text();
    }

    let lower = text.to_lowercase();
    let sentences: Vec<&str> = sentence_split_re()
        .split(text)
        .filter(|s| s.trim().chars().count() > 5)
        .collect();

    // Stock phrases, counted once each
    let mut found_phrases: Vec<FoundPhrase> = AI_PHRASES
        .iter()
        .filter(|phrase| lower.contains(*phrase))
        .map(|phrase| FoundPhrase { phrase: phrase.to_string(), severity: Severity::High })
        .collect();
    let phrase_count = found_phrases.len();
    let phrase_score = capped(phrase_count, 6.0, 42.0);

    // Formal transitions, counted per occurrence
    let mut transition_count = 0;
    for (word, re) in transition_res() {
        let n = re.find_iter(&lower).count();
        if n > 0 {
            transition_count += n;
            if found_phrases.len() < MAX_LISTED_PHRASES {
                found_phrases.push(FoundPhrase { phrase: word.to_string(), severity: Severity::Medium });
            }
        }
    }
    let transition_score = capped(transition_count, 2.0, 16.0);

    let mut vocab_count = 0;
    let mut found_vocab = Vec::new();
    for (word, re) in vocabulary_res() {
        let n = re.find_iter(text).count();
        if n > 0 {
            vocab_count += n;
            found_vocab.push((*word, n));
        }
    }
    let vocab_score = (vocab_count as f64 * 1.5).round().min(15.0);

    // Sentence rhythm
    let sentence_lengths: Vec<f64> = sentences
        .iter()
        .map(|s| s.split_whitespace().count() as f64)
        .collect();
    let (avg_sentence_len, sentence_std_dev) = if sentence_lengths.is_empty() {
        (15.0, None)
    } else {
        let avg = mean(&sentence_lengths);
        (avg, Some(std_dev(&sentence_lengths, avg)))
    };
    let uniformity_score = match sentence_std_dev {
        Some(sd) if sd < 4.0 => 15.0,
        Some(sd) if sd < 6.0 => 10.0,
        Some(sd) if sd < 8.0 => 5.0,
        _ => 0.0,
    };

    let paragraphs: Vec<&str> = paragraph_split_re()
        .split(text)
        .filter(|p| p.trim().chars().count() > 20)
        .collect();
    let mut paragraph_score = 0.0;
    if paragraphs.len() >= 3 {
        let lengths: Vec<f64> = paragraphs
            .iter()
            .map(|p| p.split_whitespace().count() as f64)
            .collect();
        let avg = mean(&lengths);
        let cv = if avg > 0.0 { std_dev(&lengths, avg) / avg } else { 0.0 };
        if cv < 0.2 {
            paragraph_score = 8.0;
        } else if cv < 0.35 {
            paragraph_score = 4.0;
        }
    }

    let starter_count: usize = sentences
        .iter()
        .map(|s| {
            let trimmed = s.trim();
            starter_res().iter().filter(|re| re.is_match(trimmed)).count()
        })
        .sum();
    let starter_ratio = if sentences.is_empty() {
        0.0
    } else {
        starter_count as f64 / sentences.len() as f64
    };
    let starter_score = (starter_ratio * 40.0).round().min(12.0);

    // Human markers pull the score down
    let human_bonus = capped(contraction_re().find_iter(text).count(), 2.0, 12.0)
        + capped(text.matches('?').count(), 3.0, 8.0)
        + capped(text.matches('!').count(), 2.0, 5.0)
        + capped(personal_re().find_iter(text).count(), 3.0, 10.0)
        + capped(casual_re().find_iter(text).count(), 1.5, 8.0)
        + capped(stylistic_re().find_iter(text).count(), 2.0, 5.0)
        + capped(parenthetical_re().find_iter(text).count(), 2.0, 4.0);

    let raw = phrase_score
        + transition_score
        + vocab_score
        + uniformity_score
        + paragraph_score
        + starter_score;
    let ai_score = (raw - human_bonus).max(0.0).round().min(100.0) as u8;

    debug!(
        words = words.len(),
        sentences = sentences.len(),
        raw,
        human_bonus,
        ai_score,
        "[HEURISTIC] Scored text"
    );

    let clean_words: Vec<String> = words
        .iter()
        .map(|w| {
            w.to_lowercase()
                .chars()
                .filter(|c| c.is_ascii_lowercase() || *c == '\'')
                .collect::<String>()
        })
        .filter(|w| w.len() > 1)
        .collect();
    let lexical_diversity = if clean_words.is_empty() {
        0.0
    } else {
        clean_words.iter().collect::<HashSet<_>>().len() as f64 / clean_words.len() as f64
    };

    let suggestions = suggestions(ai_score, &found_phrases, &found_vocab, uniformity_score, human_bonus);

    DetectionScore {
        ai_score,
        human_score: 100 - ai_score,
        verdict: Verdict::from_ai_score(ai_score),
        breakdown: Some(ScoreBreakdown {
            phrase_score: phrase_score as u32,
            transition_score: transition_score as u32,
            vocab_score: vocab_score as u32,
            uniformity_score: uniformity_score as u32,
            paragraph_score: paragraph_score as u32,
            starter_score: starter_score as u32,
            human_bonus: human_bonus.round() as u32,
        }),
        stats: Some(TextStats {
            word_count: words.len(),
            sentence_count: sentences.len(),
            paragraph_count: paragraphs.len(),
            avg_sentence_length: avg_sentence_len,
            lexical_diversity,
            sentence_length_std_dev: sentence_std_dev.unwrap_or(0.0),
        }),
        issues: DetectionIssues {
            ai_phrases: found_phrases.into_iter().take(MAX_REPORTED_PHRASES).collect(),
            ai_vocabulary: found_vocab
                .iter()
                .take(MAX_REPORTED_VOCAB)
                .map(|(word, n)| format!("{} ({}x)", word, n))
                .collect(),
            phrase_count: phrase_count + transition_count,
        },
        suggestions,
    }
}

fn suggestions(
    ai_score: u8,
    found_phrases: &[FoundPhrase],
    found_vocab: &[(&str, usize)],
    uniformity_score: f64,
    human_bonus: f64,
) -> Vec<String> {
    if ai_score < 30 {
        return vec!["Your text shows strong human writing characteristics!".to_string()];
    }

    let mut out = Vec::new();

    let high: Vec<&str> = found_phrases
        .iter()
        .filter(|p| p.severity == Severity::High)
        .take(2)
        .map(|p| p.phrase.as_str())
        .collect();
    if !high.is_empty() {
        out.push(format!("Remove AI phrases: \"{}\"", high.join("\", \"")));
    }

    // Uniformity tops out at 15, so 10 is the highest band reachable.
    if uniformity_score >= 10.0 {
        out.push("Vary your sentence lengths more - mix short punchy sentences with longer ones".to_string());
    }

    if found_vocab.len() > 3 {
        let words: Vec<&str> = found_vocab.iter().take(2).map(|(w, _)| *w).collect();
        out.push(format!("Replace formal words like \"{}\"", words.join("\", \"")));
    }

    if human_bonus < 3.0 {
        out.push("Add personal touches: contractions (don't, isn't), questions, or opinions".to_string());
    }

    if out.is_empty() && ai_score > 40 {
        out.push("Try rewriting some sentences in a more casual, conversational tone".to_string());
    }

    out.truncate(MAX_SUGGESTIONS);
    out
}
