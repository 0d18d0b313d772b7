use serde::Deserialize;
use serde_json::Value;
use std::time::Instant;
use tracing::{info, warn};

use super::Assistant;
use crate::crisis::find_crisis_keyword;
use crate::models::{EmotionAnalysis, HighlightedPhrase, Sentiment};
use crate::openai::{CompletionRequest, PromptMessage};

const ANALYSIS_PROMPT: &str = "You are an expert in college student mental health and academic stress. \
Analyze the journal entry you are given and return a detailed emotional analysis as JSON.

Look for:
- academic stress signals (exam anxiety, study pressure, worry about grades)
- general emotional state (anxiety, depression, stress, determination)
- specific phrases that reveal how the student feels
- crisis signals (self-harm, suicidal ideation, hopelessness)
- concrete, actionable advice a college student can follow

Respond with exactly this JSON structure:
{
  \"anxiety\": number (0-1),
  \"stress\": number (0-1),
  \"depression\": number (0-1),
  \"determination\": number (0-1),
  \"overall_sentiment\": \"positive\" | \"negative\" | \"neutral\",
  \"confidence\": number (0-1),
  \"highlighted_phrases\": [
    { \"text\": \"phrase quoted from the entry\", \"emotion\": \"emotion detected\", \"intensity\": number (0-1) }
  ],
  \"crisis_indicators\": boolean,
  \"recommendations\": [\"actionable advice for a college student\"]
}";

const ANALYSIS_TEMPERATURE: f32 = 0.3;

pub const DEFAULT_RECOMMENDATIONS: [&str; 3] = [
    "Consider taking regular study breaks",
    "Practice deep breathing exercises",
    "Reach out to campus counseling services if needed",
];

pub const FALLBACK_RECOMMENDATIONS: [&str; 3] = [
    "I'm having trouble analyzing your entry right now, but I'm here to help",
    "Consider speaking with a counselor about your feelings",
    "Remember that seeking help is a sign of strength",
];

/// Model output before validation. Every field is optional so a partial
/// answer still yields an analysis.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawAnalysis {
    anxiety: Option<f64>,
    stress: Option<f64>,
    depression: Option<f64>,
    determination: Option<f64>,
    overall_sentiment: Option<String>,
    confidence: Option<f64>,
    /// Kept loose so one bad element doesn't sink the whole analysis.
    highlighted_phrases: Option<Vec<Value>>,
    crisis_indicators: Option<bool>,
    recommendations: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPhrase {
    text: String,
    emotion: String,
    intensity: Option<f64>,
}

impl Assistant {
    /// Scores a journal entry. Never fails: any model or parse error yields
    /// [`fallback_analysis`], which still honours local crisis detection.
    pub async fn analyze_emotion(&self, journal_text: &str) -> EmotionAnalysis {
        let keyword = find_crisis_keyword(journal_text);
        if let Some(keyword) = keyword {
            warn!("Crisis keyword '{}' found in journal entry", keyword);
        }
        let local_crisis = keyword.is_some();

        let request = CompletionRequest {
            messages: vec![
                PromptMessage::system(ANALYSIS_PROMPT),
                PromptMessage::user(format!(
                    "Analyze this journal entry from a college student: \"{}\"",
                    journal_text
                )),
            ],
            temperature: ANALYSIS_TEMPERATURE,
            max_tokens: None,
            json_output: true,
        };

        let started = Instant::now();
        let outcome = self.model.complete(&request).await;
        crate::metrics::record_model_latency("emotion", started.elapsed().as_secs_f64());

        let parsed = outcome
            .map_err(|e| e.to_string())
            .and_then(|text| parse_analysis(&text));

        match parsed {
            Ok(raw) => {
                let analysis = normalize(raw, local_crisis);
                info!(
                    "Emotion analysis complete: sentiment={:?}, crisis={}",
                    analysis.overall_sentiment, analysis.crisis_indicators
                );
                analysis
            }
            Err(e) => {
                warn!("Emotion analysis failed, using fallback: {}", e);
                crate::metrics::increment_ai_fallbacks("emotion");
                fallback_analysis(local_crisis)
            }
        }
    }
}

fn parse_analysis(text: &str) -> Result<RawAnalysis, String> {
    // Models occasionally wrap JSON in a Markdown fence despite JSON mode.
    let clean_text = text
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let value: Value = serde_json::from_str(clean_text)
        .map_err(|e| format!("Failed to parse analysis JSON: {} - Text: {}", e, clean_text))?;
    if !value.is_object() {
        return Err(format!("Analysis is not a JSON object: {}", clean_text));
    }
    serde_json::from_value(value).map_err(|e| format!("Unexpected analysis shape: {}", e))
}

fn unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn normalize(raw: RawAnalysis, local_crisis: bool) -> EmotionAnalysis {
    let recommendations = match raw.recommendations {
        Some(list) if !list.is_empty() => list,
        _ => DEFAULT_RECOMMENDATIONS.iter().map(|s| s.to_string()).collect(),
    };

    EmotionAnalysis {
        anxiety: unit(raw.anxiety.unwrap_or(0.0)),
        stress: unit(raw.stress.unwrap_or(0.0)),
        depression: unit(raw.depression.unwrap_or(0.0)),
        determination: unit(raw.determination.unwrap_or(0.0)),
        overall_sentiment: raw
            .overall_sentiment
            .as_deref()
            .map(Sentiment::from_label)
            .unwrap_or(Sentiment::Neutral),
        confidence: unit(raw.confidence.unwrap_or(0.5)),
        highlighted_phrases: raw
            .highlighted_phrases
            .unwrap_or_default()
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<RawPhrase>(value) {
                Ok(phrase) => Some(phrase),
                Err(e) => {
                    warn!("Dropping malformed highlighted phrase: {}", e);
                    None
                }
            })
            .map(|p| HighlightedPhrase {
                text: p.text,
                emotion: p.emotion,
                intensity: unit(p.intensity.unwrap_or(0.0)),
            })
            .collect(),
        // Local detection is a floor; the model can raise the flag but never clear it.
        crisis_indicators: raw.crisis_indicators.unwrap_or(false) || local_crisis,
        recommendations,
    }
}

/// Mid-range analysis returned when the model cannot be used.
pub fn fallback_analysis(local_crisis: bool) -> EmotionAnalysis {
    EmotionAnalysis {
        anxiety: 0.5,
        stress: 0.5,
        depression: 0.3,
        determination: 0.4,
        overall_sentiment: Sentiment::Neutral,
        confidence: 0.3,
        highlighted_phrases: vec![HighlightedPhrase {
            text: "Unable to analyze specific phrases".to_string(),
            emotion: "unknown".to_string(),
            intensity: 0.3,
        }],
        crisis_indicators: local_crisis,
        recommendations: FALLBACK_RECOMMENDATIONS.iter().map(|s| s.to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::testing::StubModel;
    use std::sync::Arc;

    fn assistant_with(model: StubModel) -> (Assistant, Arc<StubModel>) {
        let model = Arc::new(model);
        (Assistant::new(model.clone()), model)
    }

    fn assert_in_unit_range(analysis: &EmotionAnalysis) {
        for score in [
            analysis.anxiety,
            analysis.stress,
            analysis.depression,
            analysis.determination,
            analysis.confidence,
        ] {
            assert!((0.0..=1.0).contains(&score), "score {} out of range", score);
        }
    }

    #[tokio::test]
    async fn test_well_formed_response_is_used() {
        let (assistant, model) = assistant_with(StubModel::replying(
            r#"{
                "anxiety": 0.8, "stress": 0.7, "depression": 0.2, "determination": 0.6,
                "overall_sentiment": "negative", "confidence": 0.9,
                "highlighted_phrases": [{"text": "finals next week", "emotion": "anxiety", "intensity": 0.8}],
                "crisis_indicators": false,
                "recommendations": ["Break revision into 25 minute blocks"]
            }"#,
        ));

        let analysis = assistant.analyze_emotion("finals next week and I'm behind").await;
        assert_eq!(analysis.anxiety, 0.8);
        assert_eq!(analysis.overall_sentiment, Sentiment::Negative);
        assert_eq!(analysis.highlighted_phrases.len(), 1);
        assert!(!analysis.crisis_indicators);
        assert_eq!(analysis.recommendations, vec!["Break revision into 25 minute blocks"]);

        let request = model.last_request.lock().unwrap().clone().unwrap();
        assert!(request.json_output);
        assert_eq!(request.temperature, ANALYSIS_TEMPERATURE);
        assert!(request.messages[1].content.contains("finals next week and I'm behind"));
    }

    #[tokio::test]
    async fn test_scores_are_clamped() {
        let (assistant, _) = assistant_with(StubModel::replying(
            r#"{"anxiety": 5, "stress": -3, "depression": 1.5, "determination": -0.1,
                "confidence": 42, "overall_sentiment": "neutral",
                "highlighted_phrases": [{"text": "ugh", "emotion": "stress", "intensity": 9}]}"#,
        ));

        let analysis = assistant.analyze_emotion("so much reading").await;
        assert_in_unit_range(&analysis);
        assert_eq!(analysis.anxiety, 1.0);
        assert_eq!(analysis.stress, 0.0);
        assert_eq!(analysis.confidence, 1.0);
        assert_eq!(analysis.highlighted_phrases[0].intensity, 1.0);
    }

    #[tokio::test]
    async fn test_local_detection_overrides_model_false() {
        let (assistant, _) = assistant_with(StubModel::replying(
            r#"{"anxiety": 0.1, "crisis_indicators": false, "recommendations": ["Rest"]}"#,
        ));
        let analysis = assistant.analyze_emotion("I feel worthless and hopeless").await;
        assert!(analysis.crisis_indicators);
    }

    #[tokio::test]
    async fn test_model_can_raise_crisis_without_keywords() {
        let (assistant, _) = assistant_with(StubModel::replying(r#"{"crisis_indicators": true}"#));
        let analysis = assistant.analyze_emotion("I don't see the point in anything").await;
        assert!(analysis.crisis_indicators);
    }

    #[tokio::test]
    async fn test_missing_fields_get_defaults() {
        let (assistant, _) = assistant_with(StubModel::replying(r#"{"recommendations": []}"#));
        let analysis = assistant.analyze_emotion("").await;
        assert_eq!(analysis.anxiety, 0.0);
        assert_eq!(analysis.confidence, 0.5);
        assert_eq!(analysis.overall_sentiment, Sentiment::Neutral);
        assert!(analysis.highlighted_phrases.is_empty());
        assert_eq!(analysis.recommendations, DEFAULT_RECOMMENDATIONS.to_vec());
    }

    #[tokio::test]
    async fn test_bad_phrase_is_dropped_without_losing_scores() {
        let (assistant, _) = assistant_with(StubModel::replying(
            r#"{"anxiety": 0.7, "crisis_indicators": true,
                "highlighted_phrases": [
                    {"text": "can't sleep", "emotion": "anxiety", "intensity": "high"},
                    {"text": "behind on labs", "emotion": "stress", "intensity": 0.6},
                    "just a string"
                ]}"#,
        ));

        let analysis = assistant.analyze_emotion("can't sleep, behind on labs").await;
        assert_ne!(analysis, fallback_analysis(false));
        assert_eq!(analysis.anxiety, 0.7);
        assert!(analysis.crisis_indicators);
        assert_eq!(analysis.highlighted_phrases.len(), 1);
        assert_eq!(analysis.highlighted_phrases[0].text, "behind on labs");
        assert_eq!(analysis.highlighted_phrases[0].intensity, 0.6);
    }

    #[tokio::test]
    async fn test_fenced_json_is_accepted() {
        let (assistant, _) =
            assistant_with(StubModel::replying("```json\n{\"stress\": 0.4}\n```"));
        let analysis = assistant.analyze_emotion("busy week").await;
        assert_eq!(analysis.stress, 0.4);
        assert_eq!(analysis.confidence, 0.5);
    }

    #[tokio::test]
    async fn test_unreachable_model_falls_back_and_keeps_crisis() {
        let (assistant, _) = assistant_with(StubModel::failing());
        let analysis = assistant.analyze_emotion("I want to kill myself").await;
        assert!(analysis.crisis_indicators);
        assert_eq!(analysis, fallback_analysis(true));
        assert_in_unit_range(&analysis);
    }

    #[tokio::test]
    async fn test_malformed_json_falls_back() {
        for reply in ["not json at all", "[0.5, 0.5]", "{\"anxiety\": \"high\"}"] {
            let (assistant, _) = assistant_with(StubModel::replying(reply));
            let analysis = assistant.analyze_emotion("rough day").await;
            assert_eq!(analysis, fallback_analysis(false), "reply {:?}", reply);
            assert!(!analysis.recommendations.is_empty());
        }
    }
}
