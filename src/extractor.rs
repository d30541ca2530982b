//! Completeness extraction
//!
//! Decides which of the four required startup facts the conversation has
//! supplied so far. Pluggable seam: the production path asks the LLM for
//! a semantic judgment over the free-text transcript; a deterministic
//! rule-based implementation backs tests and offline use without
//! changing the orchestrator.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::generation::TextGenerator;
use crate::models::{ConversationState, ProfileField, StartupProfile};
use crate::Result;

/// Trait for field extraction (semantic judgment, not pattern matching)
#[async_trait]
pub trait FieldExtractor: Send + Sync {
    /// Inspect the conversation plus the latest user message and return
    /// the profile fields it supplies. Fields the message does not touch
    /// come back unset; the orchestrator merges the update and computes
    /// the missing set itself.
    async fn extract(
        &self,
        state: &ConversationState,
        latest_message: &str,
    ) -> Result<StartupProfile>;
}

//
// ================= LLM-backed extractor =================
//

/// Extractor backed by the text-generation capability. Tolerates
/// synonyms and paraphrase by delegating the judgment to the model.
pub struct GeminiExtractor {
    generator: Arc<dyn TextGenerator>,
}

const EXTRACTOR_PERSONA: &str = "You extract structured facts about a startup \
from conversation. You respond with strict JSON only, no prose, no markdown \
fences.";

impl GeminiExtractor {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    fn build_prompt(state: &ConversationState, latest_message: &str) -> String {
        format!(
            r#"From the conversation below, identify any of these four startup facts the USER has supplied:
- name: the startup's name
- problem: what the startup does / the problem it solves
- target_market: who will use it
- key_features: core capabilities of the product

Already known:
{}

Recent conversation:
{}

Latest user message:
{}

Return ONLY a JSON object with exactly the keys "name", "problem", "target_market", "key_features".
Use null for any fact the user has not supplied. If the latest message answers the
agent's last question without naming the fact explicitly, attribute it to the asked-for fact.
If the user corrects an earlier fact, return the corrected value.
No explanation text."#,
            serde_json::to_string(&state.profile).unwrap_or_else(|_| "{}".to_string()),
            state.formatted_context(8),
            latest_message,
        )
    }
}

#[async_trait]
impl FieldExtractor for GeminiExtractor {
    async fn extract(
        &self,
        state: &ConversationState,
        latest_message: &str,
    ) -> Result<StartupProfile> {
        let prompt = Self::build_prompt(state, latest_message);
        let response = self.generator.complete(&prompt, EXTRACTOR_PERSONA).await?;

        let update = parse_profile_response(&response)?;
        debug!(?update, "Extracted profile fields");
        Ok(update)
    }
}

/// Parse the extraction response from the model, stripping markdown
/// fences the model sometimes adds despite instructions.
fn parse_profile_response(response: &str) -> Result<StartupProfile> {
    let cleaned = response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let json: serde_json::Value = serde_json::from_str(cleaned).map_err(|e| {
        crate::error::OrchestrationError::ExtractionError(format!(
            "Failed to parse extraction response: {} | raw={}",
            e, response
        ))
    })?;

    let field = |key: &str| {
        json.get(key)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("null"))
            .map(str::to_string)
    };

    Ok(StartupProfile {
        name: field("name"),
        problem: field("problem"),
        target_market: field("target_market"),
        key_features: field("key_features"),
    })
}

//
// ================= Rule-based extractor =================
//

/// Deterministic extractor for tests and offline operation.
///
/// Understands labeled lines ("name: Acme", "target market - SMBs") and
/// attributes an unlabeled message to the field the agent just asked
/// for, when exactly one is pending per the conversation state.
pub struct KeywordExtractor;

const NAME_LABELS: &[&str] = &["name", "startup name", "company", "called"];
const PROBLEM_LABELS: &[&str] = &["problem", "idea", "does", "solves"];
const MARKET_LABELS: &[&str] = &["target market", "market", "customers", "audience"];
const FEATURES_LABELS: &[&str] = &["key features", "features", "capabilities"];

fn match_label(label: &str, candidates: &[&str]) -> bool {
    let label = label.trim().to_lowercase();
    candidates.iter().any(|c| label == *c)
}

#[async_trait]
impl FieldExtractor for KeywordExtractor {
    async fn extract(
        &self,
        state: &ConversationState,
        latest_message: &str,
    ) -> Result<StartupProfile> {
        let mut update = StartupProfile::default();
        let mut labeled = false;

        for segment in latest_message.split(['\n', ',', ';']) {
            let Some((label, value)) = segment.split_once([':', '-', '=']) else {
                continue;
            };
            let value = value.trim();
            if value.is_empty() {
                continue;
            }

            if match_label(label, NAME_LABELS) {
                update.name = Some(value.to_string());
                labeled = true;
            } else if match_label(label, PROBLEM_LABELS) {
                update.problem = Some(value.to_string());
                labeled = true;
            } else if match_label(label, MARKET_LABELS) {
                update.target_market = Some(value.to_string());
                labeled = true;
            } else if match_label(label, FEATURES_LABELS) {
                update.key_features = Some(value.to_string());
                labeled = true;
            }
        }

        // Unlabeled reply: treat it as the answer to the field the agent
        // last asked about.
        if !labeled && !latest_message.trim().is_empty() {
            if let Some(pending) = state.profile.missing_fields().first() {
                let value = Some(latest_message.trim().to_string());
                match pending {
                    ProfileField::Name => update.name = value,
                    ProfileField::Problem => update.problem = value,
                    ProfileField::TargetMarket => update.target_market = value,
                    ProfileField::KeyFeatures => update.key_features = value,
                }
            }
        }

        Ok(update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_keyword_extractor_labeled_fields() {
        let state = ConversationState::new(Uuid::new_v4());
        let update = KeywordExtractor
            .extract(&state, "name: Acme, problem: scheduling chaos")
            .await
            .unwrap();

        assert_eq!(update.name.as_deref(), Some("Acme"));
        assert_eq!(update.problem.as_deref(), Some("scheduling chaos"));
        assert!(update.target_market.is_none());
    }

    #[tokio::test]
    async fn test_keyword_extractor_unlabeled_answer_goes_to_pending_field() {
        let mut state = ConversationState::new(Uuid::new_v4());
        state.profile.name = Some("Acme".into());
        state.profile.problem = Some("scheduling".into());
        // target_market is the next missing field

        let update = KeywordExtractor.extract(&state, "SMBs").await.unwrap();
        assert_eq!(update.target_market.as_deref(), Some("SMBs"));
        assert!(update.name.is_none());
    }

    #[test]
    fn test_parse_profile_response_plain_json() {
        let update = parse_profile_response(
            r#"{"name": "Acme", "problem": null, "target_market": "SMBs", "key_features": null}"#,
        )
        .unwrap();

        assert_eq!(update.name.as_deref(), Some("Acme"));
        assert!(update.problem.is_none());
        assert_eq!(update.target_market.as_deref(), Some("SMBs"));
    }

    #[test]
    fn test_parse_profile_response_fenced_json() {
        let response = "```json\n{\"name\": \"Acme\", \"problem\": null, \"target_market\": null, \"key_features\": null}\n```";
        let update = parse_profile_response(response).unwrap();
        assert_eq!(update.name.as_deref(), Some("Acme"));
    }

    #[test]
    fn test_parse_profile_response_rejects_prose() {
        assert!(parse_profile_response("The startup is called Acme").is_err());
    }
}
