//! Simulated CRM data for the DEALFLOW reference runtime.
//!
//! Everything here is fictional. The scripted model stands in for a real
//! LLM endpoint.

use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{Duration, NaiveDate, Utc};
use serde_json::json;

use dealflow_contracts::{
    deal::{Deal, DealStage, Priority},
    error::{DealflowError, DealflowResult},
    records::Contact,
};
use dealflow_enrich::EnrichmentProvider;

// ── Pipeline ──────────────────────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
fn deal(
    id: &str,
    title: &str,
    company: &str,
    contact: &str,
    value: f64,
    stage: DealStage,
    priority: Priority,
    probability: f64,
) -> Deal {
    Deal {
        id: id.to_string(),
        title: title.to_string(),
        company: company.to_string(),
        contact: contact.to_string(),
        value,
        stage,
        priority,
        probability,
        owner: Some("jordan".to_string()),
        expected_close_date: None,
        created_at: Some(Utc::now() - Duration::days(21)),
        updated_at: None,
    }
}

/// A small pipeline covering the interesting template conditions:
///
/// - `deal-acme`     75 000, qualification → high-value acceleration applies
/// - `deal-initech`  10 000, qualification → high-value acceleration does not
/// - `deal-globex`   negotiation at 70 %   → negotiation support
/// - `deal-hooli`    annual renewal         → renewal reminder
/// - `deal-soylent`  4 500, new lead        → personalized outreach
pub fn sample_deals() -> Vec<Deal> {
    let mut globex = deal(
        "deal-globex",
        "Logistics suite",
        "Globex",
        "Hank Scorpio",
        48_000.0,
        DealStage::Negotiation,
        Priority::High,
        70.0,
    );
    globex.expected_close_date = NaiveDate::from_ymd_opt(2026, 12, 15);

    vec![
        deal(
            "deal-acme",
            "Fleet telematics rollout",
            "Acme Logistics",
            "Wile Coyote",
            75_000.0,
            DealStage::Qualification,
            Priority::Medium,
            35.0,
        ),
        deal(
            "deal-initech",
            "TPS reporting add-on",
            "Initech",
            "Peter Gibbons",
            10_000.0,
            DealStage::Qualification,
            Priority::Low,
            25.0,
        ),
        globex,
        deal(
            "deal-hooli",
            "Annual renewal 2027",
            "Hooli",
            "Gavin Belson",
            32_000.0,
            DealStage::Proposal,
            Priority::Medium,
            60.0,
        ),
        deal(
            "deal-soylent",
            "Pilot subscription",
            "Soylent",
            "Sol Roth",
            4_500.0,
            DealStage::Lead,
            Priority::Low,
            10.0,
        ),
    ]
}

pub fn find_deal(id: &str) -> DealflowResult<Deal> {
    sample_deals()
        .into_iter()
        .find(|d| d.id == id)
        .ok_or_else(|| DealflowError::NotFound { kind: "deal".to_string(), id: id.to_string() })
}

pub fn sample_contacts() -> Vec<Contact> {
    vec![
        Contact {
            id: "contact-wile".to_string(),
            name: "Wile Coyote".to_string(),
            email: "wile@acme.test".to_string(),
            company: "Acme Logistics".to_string(),
            title: "Head of Operations".to_string(),
            phone: Some("+1 555 0100".to_string()),
            created_at: None,
        },
        Contact {
            id: "contact-peter".to_string(),
            name: "Peter Gibbons".to_string(),
            email: "peter@initech.test".to_string(),
            company: "Initech".to_string(),
            title: "Software Engineer".to_string(),
            phone: None,
            created_at: None,
        },
    ]
}

// ── Scripted model ────────────────────────────────────────────────────────────

/// A deterministic stand-in for an LLM.
///
/// The first `fail_first` calls fail with a transient error, which exercises
/// the retry policy. After that, deal prompts get insights derived from the
/// probability in the prompt and contact prompts get a fixed profile.
pub struct ScriptedModel {
    fail_first: u32,
    calls: AtomicU32,
}

impl ScriptedModel {
    pub fn new(fail_first: u32) -> Self {
        Self { fail_first, calls: AtomicU32::new(0) }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EnrichmentProvider for ScriptedModel {
    fn complete(&self, prompt: &str) -> DealflowResult<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.fail_first {
            return Err(DealflowError::external("model endpoint returned 503"));
        }

        if prompt.starts_with("Profile this business contact") {
            return Ok(json!({
                "summary": "Operations leader who values predictable delivery.",
                "interests": ["fleet efficiency", "cost control"],
                "communicationStyle": "brief and data-driven",
                "talkingPoints": ["pilot results", "rollout timeline"]
            })
            .to_string());
        }

        let probability = prompt
            .lines()
            .find_map(|l| l.strip_prefix("Probability: "))
            .and_then(|p| p.trim_end_matches('%').parse::<f64>().ok())
            .unwrap_or(50.0);

        let (risk, suggested) = if probability < 30.0 {
            ("high", probability)
        } else if probability < 60.0 {
            ("medium", probability + 5.0)
        } else {
            ("low", (probability + 10.0).min(95.0))
        };

        Ok(format!(
            "```json\n{}\n```",
            json!({
                "summary": format!("Deal at {probability}% with {risk} risk."),
                "nextSteps": ["Confirm decision makers", "Share a mutual close plan"],
                "riskLevel": risk,
                "suggestedProbability": suggested
            })
        ))
    }
}

/// A model that answers with something that is not valid insights.
pub struct OffScriptModel;

impl EnrichmentProvider for OffScriptModel {
    fn complete(&self, _prompt: &str) -> DealflowResult<String> {
        Ok(json!({ "summary": "Looks fine!", "riskLevel": "unclear" }).to_string())
    }
}
