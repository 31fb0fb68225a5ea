//! Recommendation generator seam.
//!
//! `AppState` carries an `Arc<dyn RecommendationGenerator>`. Production wires
//! `LlmRecommendationGenerator`; tests swap in deterministic fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::errors::AppError;
use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::LlmClient;
use crate::models::checkin::{CheckIn, JourneyStage};
use crate::models::recommendation::Recommendation;
use crate::models::resource::Resource;
use crate::recommendations::prompts::{RECOMMENDATION_PERSONA, RECOMMENDATION_PROMPT_TEMPLATE};

/// Who the recommendations are for.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserProfile {
    pub role: String,
    /// Stage reported in the most recent check-in.
    pub journey_stage: Option<JourneyStage>,
}

#[async_trait]
pub trait RecommendationGenerator: Send + Sync {
    /// Proposes recommendations drawn from `candidates`. The output is
    /// untrusted and validated by the caller.
    async fn generate(
        &self,
        profile: &UserProfile,
        recent: &[CheckIn],
        candidates: &[Resource],
    ) -> Result<Vec<Recommendation>, AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// LlmRecommendationGenerator
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct GeneratedRecommendations {
    recommendations: Vec<Recommendation>,
}

pub struct LlmRecommendationGenerator {
    llm: LlmClient,
}

impl LlmRecommendationGenerator {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

fn build_prompt(profile: &UserProfile, recent: &[CheckIn], candidates: &[Resource]) -> String {
    let user_data = json!({
        "role": profile.role,
        "journey_stage": profile.journey_stage,
        "check_ins": recent
            .iter()
            .map(|c| json!({
                "week": c.week_number,
                "confidence": c.responses.confidence,
                "emotional_wellbeing": c.responses.emotional_wellbeing,
                "work_readiness": c.responses.work_readiness,
                "support_needs": c.responses.support_needs,
                "biggest_challenge": c.responses.biggest_challenge,
            }))
            .collect::<Vec<_>>(),
    });
    let available: Vec<_> = candidates
        .iter()
        .map(|r| json!({ "id": r.id, "title": r.title, "type": r.resource_type, "tags": r.tags }))
        .collect();

    RECOMMENDATION_PROMPT_TEMPLATE
        .replace("{user_data}", &user_data.to_string())
        .replace("{available_resources}", &json!(available).to_string())
}

#[async_trait]
impl RecommendationGenerator for LlmRecommendationGenerator {
    async fn generate(
        &self,
        profile: &UserProfile,
        recent: &[CheckIn],
        candidates: &[Resource],
    ) -> Result<Vec<Recommendation>, AppError> {
        let prompt = build_prompt(profile, recent, candidates);
        let system = format!("{RECOMMENDATION_PERSONA} {JSON_ONLY_SYSTEM}");

        let generated: GeneratedRecommendations = self
            .llm
            .call_json(&prompt, &system)
            .await
            .map_err(|e| AppError::ExternalService(format!("Recommendation generation failed: {e}")))?;

        info!(
            "LLM proposed {} recommendation(s) from {} candidate resource(s)",
            generated.recommendations.len(),
            candidates.len()
        );
        Ok(generated.recommendations)
    }
}
