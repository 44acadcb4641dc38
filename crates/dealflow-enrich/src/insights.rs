//! Enrichment results and the JSON Schemas their raw responses must satisfy.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Advice generated for one deal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealInsights {
    pub summary: String,
    pub next_steps: Vec<String>,
    pub risk_level: RiskLevel,
    /// Suggested win probability, 0 to 100.
    pub suggested_probability: f64,
}

/// Background generated for one contact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactProfile {
    pub summary: String,
    #[serde(default)]
    pub interests: Vec<String>,
    pub communication_style: String,
    #[serde(default)]
    pub talking_points: Vec<String>,
}

pub fn deal_insights_schema() -> Value {
    json!({
        "type": "object",
        "required": ["summary", "nextSteps", "riskLevel", "suggestedProbability"],
        "properties": {
            "summary": { "type": "string", "minLength": 1 },
            "nextSteps": {
                "type": "array",
                "items": { "type": "string" },
                "minItems": 1,
                "maxItems": 5
            },
            "riskLevel": { "enum": ["low", "medium", "high"] },
            "suggestedProbability": { "type": "number", "minimum": 0, "maximum": 100 }
        }
    })
}

pub fn contact_profile_schema() -> Value {
    json!({
        "type": "object",
        "required": ["summary", "communicationStyle"],
        "properties": {
            "summary": { "type": "string", "minLength": 1 },
            "interests": { "type": "array", "items": { "type": "string" } },
            "communicationStyle": { "type": "string", "minLength": 1 },
            "talkingPoints": { "type": "array", "items": { "type": "string" } }
        }
    })
}
