// External Detection Services
// Optional keyed calls to ZeroGPT, GPTZero and Sapling, combined with the local score

use std::env;
use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info, warn};

use crate::models::{DetectionReport, DetectorOutcome, ExternalDetection, ExternalDetector};
use crate::services::analytics::{events, AnalyticsSink};

use super::heuristic::{self, MIN_WORDS};

const ZEROGPT_DEFAULT_URL: &str = "https://api.zerogpt.com/api/detect/detectText";
const GPTZERO_DEFAULT_URL: &str = "https://api.gptzero.me/v2/predict/text";
const SAPLING_DEFAULT_URL: &str = "https://api.sapling.ai/api/v1/aidetect";
const DETECTOR_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("Please enter some text to analyze")]
    EmptyText,
    #[error("Please enter at least 50 words for accurate detection")]
    TooShort,
    #[error("{0}")]
    Http(#[from] reqwest::Error),
    #[error("{0}")]
    Api(String),
}

/// Per-service keys; a missing key skips that service.
#[derive(Debug, Clone, Default)]
pub struct DetectorKeys {
    pub zerogpt: Option<String>,
    pub gptzero: Option<String>,
    pub sapling: Option<String>,
}

impl DetectorKeys {
    pub fn get(&self, detector: ExternalDetector) -> Option<&str> {
        let key = match detector {
            ExternalDetector::ZeroGpt => &self.zerogpt,
            ExternalDetector::GptZero => &self.gptzero,
            ExternalDetector::Sapling => &self.sapling,
        };
        key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }
}

fn rounded_percent(value: f64) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}

/// Pull the service's own message out of an error body, falling back to the status code.
pub fn error_message(detector: ExternalDetector, body: &str, status: u16) -> String {
    let field: &[&str] = match detector {
        ExternalDetector::ZeroGpt => &["message", "error"],
        ExternalDetector::GptZero => &["error"],
        ExternalDetector::Sapling => &["msg"],
    };
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            field
                .iter()
                .find_map(|f| v[*f].as_str().filter(|s| !s.is_empty()).map(str::to_string))
        })
        .unwrap_or_else(|| format!("HTTP {}", status))
}

pub fn parse_zerogpt(data: &Value) -> Result<DetectorOutcome, DetectorError> {
    if data["success"].as_bool() == Some(false) {
        let message = data["message"].as_str().unwrap_or("Detection failed");
        return Err(DetectorError::Api(message.to_string()));
    }
    // The payload sits under `data` in current responses and at the top level in older ones
    let field = |name: &str| -> Value {
        match &data["data"][name] {
            Value::Null => data[name].clone(),
            v => v.clone(),
        }
    };

    let ai_score = rounded_percent(field("fakePercentage").as_f64().unwrap_or(0.0));
    let is_human = field("isHuman").as_bool().unwrap_or(ai_score < 50);
    let verdict = if is_human {
        "Human"
    } else if ai_score > 70 {
        "AI"
    } else {
        "Mixed"
    };

    Ok(DetectorOutcome::Scored {
        ai_score,
        human_score: 100 - ai_score,
        verdict: verdict.to_string(),
        details: json!({
            "textWords": field("textWords"),
            "aiWords": field("aiWords"),
            "feedback": field("feedback"),
            "sentences": field("sentences"),
        }),
    })
}

pub fn parse_gptzero(data: &Value) -> DetectorOutcome {
    let doc = &data["documents"][0];
    let prob = doc["completely_generated_prob"].as_f64().unwrap_or(0.0);
    let ai_score = rounded_percent(prob * 100.0);
    let verdict = if prob > 0.5 {
        "AI"
    } else if prob > 0.3 {
        "Mixed"
    } else {
        "Human"
    };

    DetectorOutcome::Scored {
        ai_score,
        human_score: 100 - ai_score,
        verdict: verdict.to_string(),
        details: json!({
            "avgGeneratedProb": doc["average_generated_prob"],
            "sentences": doc["sentences"].as_array().map(Vec::len).unwrap_or(0),
            "perplexity": doc["overall_burstiness"],
        }),
    }
}

pub fn parse_sapling(data: &Value) -> DetectorOutcome {
    let score = data["score"].as_f64().unwrap_or(0.0);
    let ai_score = rounded_percent(score * 100.0);
    let verdict = if ai_score > 50 {
        "AI"
    } else if ai_score > 30 {
        "Mixed"
    } else {
        "Human"
    };

    DetectorOutcome::Scored {
        ai_score,
        human_score: 100 - ai_score,
        verdict: verdict.to_string(),
        details: json!({
            "confidence": data["score"],
            "sentenceScores": data["sentence_scores"].as_array().map(Vec::len).unwrap_or(0),
        }),
    }
}

pub struct DetectorClient {
    client: Client,
    zerogpt_url: String,
    gptzero_url: String,
    sapling_url: String,
}

impl Default for DetectorClient {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorClient {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(DETECTOR_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            zerogpt_url: env::var("ZEROGPT_API_URL").unwrap_or_else(|_| ZEROGPT_DEFAULT_URL.to_string()),
            gptzero_url: env::var("GPTZERO_API_URL").unwrap_or_else(|_| GPTZERO_DEFAULT_URL.to_string()),
            sapling_url: env::var("SAPLING_API_URL").unwrap_or_else(|_| SAPLING_DEFAULT_URL.to_string()),
        }
    }

    pub fn url(&self, detector: ExternalDetector) -> &str {
        match detector {
            ExternalDetector::ZeroGpt => &self.zerogpt_url,
            ExternalDetector::GptZero => &self.gptzero_url,
            ExternalDetector::Sapling => &self.sapling_url,
        }
    }

    pub fn with_url(mut self, detector: ExternalDetector, url: &str) -> Self {
        let url = url.to_string();
        match detector {
            ExternalDetector::ZeroGpt => self.zerogpt_url = url,
            ExternalDetector::GptZero => self.gptzero_url = url,
            ExternalDetector::Sapling => self.sapling_url = url,
        }
        self
    }

    async fn call(&self, detector: ExternalDetector, key: &str, text: &str) -> Result<DetectorOutcome, DetectorError> {
        let builder = self.client.post(self.url(detector));
        let builder = match detector {
            ExternalDetector::ZeroGpt => builder
                .header("Accept", "application/json, text/plain, */*")
                .header("ApiKey", key)
                .json(&json!({ "input_text": text })),
            ExternalDetector::GptZero => builder
                .header("x-api-key", key)
                .json(&json!({ "document": text })),
            ExternalDetector::Sapling => builder.json(&json!({ "key": key, "text": text })),
        };

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DetectorError::Api(error_message(detector, &body, status.as_u16())));
        }

        let data: Value = response.json().await?;
        match detector {
            ExternalDetector::ZeroGpt => parse_zerogpt(&data),
            ExternalDetector::GptZero => Ok(parse_gptzero(&data)),
            ExternalDetector::Sapling => Ok(parse_sapling(&data)),
        }
    }

    /// Run one service. Never fails: a missing key is `Skipped`, any error is `Failed`.
    pub async fn detect(&self, detector: ExternalDetector, key: Option<&str>, text: &str) -> ExternalDetection {
        let outcome = match key {
            None => DetectorOutcome::Skipped,
            Some(key) => match self.call(detector, key, text).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(detector = detector.key(), error = %e, "[DETECTORS] Service call failed");
                    DetectorOutcome::Failed { message: e.to_string() }
                }
            },
        };
        ExternalDetection {
            detector,
            name: detector.display_name().to_string(),
            outcome,
        }
    }
}

/// Rounded mean of the local score and every service that produced a score.
pub fn average_ai_score(local: Option<u8>, services: &[ExternalDetection]) -> Option<u8> {
    let scores: Vec<u32> = local
        .into_iter()
        .chain(services.iter().filter_map(ExternalDetection::ai_score))
        .map(u32::from)
        .collect();
    if scores.is_empty() {
        return None;
    }
    let sum: u32 = scores.iter().sum();
    Some((sum as f64 / scores.len() as f64).round() as u8)
}

/// Local heuristic plus every keyed service, queried concurrently.
pub async fn run_all_detectors(
    client: &DetectorClient,
    keys: &DetectorKeys,
    text: &str,
    analytics: &dyn AnalyticsSink,
) -> Result<DetectionReport, DetectorError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(DetectorError::EmptyText);
    }
    let word_count = text.split_whitespace().count();
    if word_count < MIN_WORDS {
        return Err(DetectorError::TooShort);
    }

    analytics.track(events::AI_DETECTION, json!({ "wordCount": word_count }));
    info!(words = word_count, "[DETECTORS] Running all detectors");

    let local = heuristic::score(text);
    let (zerogpt, gptzero, sapling) = tokio::join!(
        client.detect(ExternalDetector::ZeroGpt, keys.get(ExternalDetector::ZeroGpt), text),
        client.detect(ExternalDetector::GptZero, keys.get(ExternalDetector::GptZero), text),
        client.detect(ExternalDetector::Sapling, keys.get(ExternalDetector::Sapling), text),
    );
    let services = vec![zerogpt, gptzero, sapling];
    let average_ai_score = average_ai_score(Some(local.ai_score), &services);

    info!(
        local = local.ai_score,
        scored = services.iter().filter(|s| s.ai_score().is_some()).count(),
        average = ?average_ai_score,
        "[DETECTORS] Done"
    );

    Ok(DetectionReport { local, services, average_ai_score })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::analytics::{NoopAnalytics, StoredAnalytics};
    use crate::services::state_store::MemoryStore;
    use std::sync::Arc;

    fn scored(detector: ExternalDetector, ai_score: u8) -> ExternalDetection {
        ExternalDetection {
            detector,
            name: detector.display_name().to_string(),
            outcome: DetectorOutcome::Scored {
                ai_score,
                human_score: 100 - ai_score,
                verdict: "AI".to_string(),
                details: Value::Null,
            },
        }
    }

    #[test]
    fn test_parse_zerogpt_nested_and_flat() {
        let nested = json!({"success": true, "data": {"fakePercentage": 82.6, "isHuman": 0, "textWords": 120}});
        match parse_zerogpt(&nested).unwrap() {
            DetectorOutcome::Scored { ai_score, human_score, verdict, details } => {
                assert_eq!(ai_score, 83);
                assert_eq!(human_score, 17);
                // non-boolean isHuman falls back to the score threshold
                assert_eq!(verdict, "AI");
                assert_eq!(details["textWords"], 120);
            }
            other => panic!("unexpected {:?}", other),
        }

        let flat = json!({"fakePercentage": 40, "isHuman": true});
        match parse_zerogpt(&flat).unwrap() {
            DetectorOutcome::Scored { ai_score, verdict, .. } => {
                assert_eq!(ai_score, 40);
                assert_eq!(verdict, "Human");
            }
            other => panic!("unexpected {:?}", other),
        }

        let failed = json!({"success": false, "message": "Invalid API key"});
        assert_eq!(parse_zerogpt(&failed).unwrap_err().to_string(), "Invalid API key");
    }

    #[test]
    fn test_parse_gptzero_thresholds() {
        let data = json!({"documents": [{"completely_generated_prob": 0.42, "sentences": [{}, {}]}]});
        match parse_gptzero(&data) {
            DetectorOutcome::Scored { ai_score, verdict, details, .. } => {
                assert_eq!(ai_score, 42);
                assert_eq!(verdict, "Mixed");
                assert_eq!(details["sentences"], 2);
            }
            other => panic!("unexpected {:?}", other),
        }
        match parse_gptzero(&json!({})) {
            DetectorOutcome::Scored { ai_score, verdict, .. } => {
                assert_eq!(ai_score, 0);
                assert_eq!(verdict, "Human");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_sapling() {
        match parse_sapling(&json!({"score": 0.97, "sentence_scores": [1, 2, 3]})) {
            DetectorOutcome::Scored { ai_score, verdict, details, .. } => {
                assert_eq!(ai_score, 97);
                assert_eq!(verdict, "AI");
                assert_eq!(details["sentenceScores"], 3);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_error_message() {
        assert_eq!(error_message(ExternalDetector::Sapling, r#"{"msg": "Key expired"}"#, 401), "Key expired");
        assert_eq!(error_message(ExternalDetector::ZeroGpt, r#"{"error": "Quota"}"#, 429), "Quota");
        assert_eq!(error_message(ExternalDetector::GptZero, "not json", 502), "HTTP 502");
    }

    #[test]
    fn test_average_over_successful_only() {
        let services = vec![
            scored(ExternalDetector::ZeroGpt, 80),
            ExternalDetection {
                detector: ExternalDetector::GptZero,
                name: "GPTZero".to_string(),
                outcome: DetectorOutcome::Failed { message: "HTTP 500".to_string() },
            },
            scored(ExternalDetector::Sapling, 61),
        ];
        assert_eq!(average_ai_score(Some(30), &services), Some(57));
        assert_eq!(average_ai_score(None, &[]), None);
    }

    #[test]
    fn test_keys_blank_treated_as_missing() {
        let keys = DetectorKeys { zerogpt: Some("  ".to_string()), gptzero: Some("k".to_string()), sapling: None };
        assert_eq!(keys.get(ExternalDetector::ZeroGpt), None);
        assert_eq!(keys.get(ExternalDetector::GptZero), Some("k"));
    }

    #[tokio::test]
    async fn test_run_all_without_keys_uses_local_only() {
        let text = "word ".repeat(60);
        let store = Arc::new(MemoryStore::new());
        let analytics = StoredAnalytics::new(store);
        let report = run_all_detectors(&DetectorClient::new(), &DetectorKeys::default(), &text, &analytics)
            .await
            .unwrap();

        assert_eq!(report.services.len(), 3);
        assert!(report.services.iter().all(|s| s.outcome == DetectorOutcome::Skipped));
        assert_eq!(report.average_ai_score, Some(report.local.ai_score));
        assert_eq!(analytics.snapshot().features.detections, 1);
        assert_eq!(analytics.snapshot().events[0].data["wordCount"], 60);
    }

    #[tokio::test]
    async fn test_run_all_validation() {
        let client = DetectorClient::new();
        let keys = DetectorKeys::default();
        assert!(matches!(
            run_all_detectors(&client, &keys, "   ", &NoopAnalytics).await,
            Err(DetectorError::EmptyText)
        ));
        assert!(matches!(
            run_all_detectors(&client, &keys, "only a handful of words", &NoopAnalytics).await,
            Err(DetectorError::TooShort)
        ));
    }
}
