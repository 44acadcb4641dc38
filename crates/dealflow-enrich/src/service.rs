//! The enrichment service.
//!
//! A request goes through four stages:
//!
//! 1. **Cache**   — a fresh cached result for the record id is returned as is.
//! 2. **Provider** — the prompt is sent to the `EnrichmentProvider` under the
//!    retry policy.
//! 3. **Verify**  — the response must parse as JSON, satisfy the result's
//!    JSON Schema, and pass the business rules. Every failure is collected
//!    into one `Verification` error.
//! 4. **Store**   — the typed result is cached and returned.
//!
//! Rejected responses are never cached.

use std::sync::{Mutex, MutexGuard};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use dealflow_contracts::{
    deal::Deal,
    error::{DealflowError, DealflowResult},
    records::Contact,
};

use crate::{
    cache::TtlCache,
    insights::{contact_profile_schema, deal_insights_schema, ContactProfile, DealInsights},
    retry::RetryPolicy,
};

/// The model behind enrichment. Returns the raw completion text.
pub trait EnrichmentProvider: Send + Sync {
    fn complete(&self, prompt: &str) -> DealflowResult<String>;
}

/// A caller-supplied rule run after schema validation.
///
/// Returns `Some(message)` when the payload is rejected.
pub type BusinessRule = Box<dyn Fn(&Value) -> Option<String> + Send + Sync>;

pub struct EnrichmentService {
    provider: Box<dyn EnrichmentProvider>,
    retry: RetryPolicy,
    deal_cache: Mutex<TtlCache<DealInsights>>,
    contact_cache: Mutex<TtlCache<ContactProfile>>,
    deal_rules: Vec<BusinessRule>,
}

impl EnrichmentService {
    pub fn new(
        provider: Box<dyn EnrichmentProvider>,
        retry: RetryPolicy,
        deal_cache: TtlCache<DealInsights>,
        contact_cache: TtlCache<ContactProfile>,
    ) -> Self {
        Self {
            provider,
            retry,
            deal_cache: Mutex::new(deal_cache),
            contact_cache: Mutex::new(contact_cache),
            deal_rules: vec![Box::new(next_steps_are_actionable)],
        }
    }

    /// Add a rule applied to every deal insights payload.
    pub fn add_deal_rule(&mut self, rule: BusinessRule) {
        self.deal_rules.push(rule);
    }

    pub fn enrich_deal(&self, deal: &Deal) -> DealflowResult<DealInsights> {
        if let Some(hit) = lock(&self.deal_cache)?.get(&deal.id) {
            debug!(deal_id = %deal.id, "deal insights served from cache");
            return Ok(hit);
        }

        let raw = self.call_provider(&deal_prompt(deal))?;
        let insights: DealInsights = verify(&raw, &deal_insights_schema(), &self.deal_rules)?;

        lock(&self.deal_cache)?.insert(deal.id.clone(), insights.clone());
        info!(deal_id = %deal.id, risk = ?insights.risk_level, "deal enriched");
        Ok(insights)
    }

    pub fn enrich_contact(&self, contact: &Contact) -> DealflowResult<ContactProfile> {
        if let Some(hit) = lock(&self.contact_cache)?.get(&contact.id) {
            debug!(contact_id = %contact.id, "contact profile served from cache");
            return Ok(hit);
        }

        let raw = self.call_provider(&contact_prompt(contact))?;
        let profile: ContactProfile = verify(&raw, &contact_profile_schema(), &[])?;

        lock(&self.contact_cache)?.insert(contact.id.clone(), profile.clone());
        info!(contact_id = %contact.id, "contact enriched");
        Ok(profile)
    }

    /// Forget any cached insights for `deal_id`, e.g. after the deal changes.
    pub fn invalidate_deal(&self, deal_id: &str) -> DealflowResult<()> {
        lock(&self.deal_cache)?.invalidate(deal_id);
        Ok(())
    }

    fn call_provider(&self, prompt: &str) -> DealflowResult<String> {
        self.retry.run(|attempt| {
            debug!(attempt, prompt_len = prompt.len(), "calling enrichment provider");
            self.provider.complete(prompt)
        })
    }
}

fn lock<V>(cache: &Mutex<TtlCache<V>>) -> DealflowResult<MutexGuard<'_, TtlCache<V>>> {
    cache
        .lock()
        .map_err(|e| DealflowError::external(format!("enrichment cache lock poisoned: {}", e)))
}

// ── Prompts ───────────────────────────────────────────────────────────────────

pub fn deal_prompt(deal: &Deal) -> String {
    format!(
        "Analyze this sales deal and reply with JSON only, using the keys \
         summary, nextSteps (up to 5 strings), riskLevel (low|medium|high) and \
         suggestedProbability (0-100).\n\n\
         Title: {}\nCompany: {}\nContact: {}\nValue: {}\nStage: {}\nPriority: {:?}\nProbability: {}%\n",
        deal.title,
        deal.company,
        deal.contact,
        deal.value,
        deal.stage.as_str(),
        deal.priority,
        deal.probability,
    )
}

pub fn contact_prompt(contact: &Contact) -> String {
    format!(
        "Profile this business contact and reply with JSON only, using the keys \
         summary, interests, communicationStyle and talkingPoints.\n\n\
         Name: {}\nTitle: {}\nCompany: {}\nEmail: {}\n",
        contact.name, contact.title, contact.company, contact.email,
    )
}

// ── Verification ──────────────────────────────────────────────────────────────

/// Parse, schema-check, rule-check, and deserialize a provider response.
fn verify<T: DeserializeOwned>(raw: &str, schema: &Value, rules: &[BusinessRule]) -> DealflowResult<T> {
    let payload: Value = serde_json::from_str(extract_json(raw)).map_err(|e| DealflowError::Verification {
        reason: format!("response is not valid JSON: {e}"),
    })?;

    let mut failures = Vec::new();

    let validator = jsonschema::validator_for(schema).map_err(|e| DealflowError::ConfigError {
        reason: format!("invalid enrichment schema: {e}"),
    })?;
    for error in validator.iter_errors(&payload) {
        failures.push(format!("schema violation at {}: {}", error.instance_path, error));
    }

    // Rules assume a structurally valid payload.
    if failures.is_empty() {
        failures.extend(rules.iter().filter_map(|rule| rule(&payload)));
    }

    if !failures.is_empty() {
        let reason = failures.join("; ");
        warn!(failures = failures.len(), %reason, "enrichment response rejected");
        return Err(DealflowError::Verification { reason });
    }

    serde_json::from_value(payload).map_err(|e| DealflowError::Verification {
        reason: format!("response does not match the result type: {e}"),
    })
}

/// Models often wrap JSON in prose or code fences; keep the outermost object.
fn extract_json(raw: &str) -> &str {
    match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if start < end => &raw[start..=end],
        _ => raw,
    }
}

fn next_steps_are_actionable(payload: &Value) -> Option<String> {
    let steps = payload.get("nextSteps")?.as_array()?;
    if steps.iter().any(|s| s.as_str().is_some_and(|s| s.trim().is_empty())) {
        return Some("nextSteps contains a blank entry".to_string());
    }
    let mut seen = std::collections::HashSet::new();
    if !steps.iter().filter_map(Value::as_str).all(|s| seen.insert(s.trim().to_lowercase())) {
        return Some("nextSteps contains duplicate entries".to_string());
    }
    None
}
