// Prompt constants for recommendation generation.
// Reuses the JSON-only fragment from llm_client::prompts.

/// Advisor persona. Sent together with `JSON_ONLY_SYSTEM`.
pub const RECOMMENDATION_PERSONA: &str =
    "You are a maternity leave support advisor helping parents before, during and after leave.";

/// Recommendation prompt template.
/// Replace `{user_data}` and `{available_resources}` before sending.
pub const RECOMMENDATION_PROMPT_TEMPLATE: &str = r#"Based on this user's check-in data, recommend exactly 4 resources,
one for each priority in this order: most_urgent, secondary, preventive, community.

User data:
{user_data}

Available resources (you may ONLY use these ids):
{available_resources}

Return a JSON object with this EXACT schema (no extra fields):
{
  "recommendations": [
    {
      "priority": "most_urgent",
      "resource_id": "uuid of one of the available resources",
      "why_this_helps": "One or two sentences tied to the user's answers.",
      "tags": ["short", "labels"]
    }
  ]
}

Rules:
- Exactly 4 recommendations, each priority used once.
- "most_urgent" addresses the lowest recent score or the stated biggest challenge.
- "preventive" addresses something that is fine now but trending down.
- "community" must point at a peer or group oriented resource when one exists.
- Never invent a resource_id."#;
