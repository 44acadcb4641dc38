//! Scenario 3: Deal Enrichment
//!
//! Sub-case A — flaky model, retried until it answers      → insights
//! Sub-case B — same deal again                            → cache hit
//! Sub-case C — model answers off-script                   → Verification
//! Sub-case D — contact profile                            → profile

use std::sync::Arc;
use std::time::Duration;

use dealflow_contracts::error::{DealflowError, DealflowResult};
use dealflow_enrich::{EnrichmentProvider, EnrichmentService, RetryPolicy, TtlCache};
use dealflow_store::InMemoryStore;

use crate::mock_data::{find_deal, sample_contacts, OffScriptModel, ScriptedModel};

/// Lets the scenario keep a handle on the model after the service takes
/// ownership of its `Box<dyn EnrichmentProvider>`.
struct SharedModel(Arc<ScriptedModel>);

impl EnrichmentProvider for SharedModel {
    fn complete(&self, prompt: &str) -> DealflowResult<String> {
        self.0.complete(prompt)
    }
}

fn caches() -> (TtlCache<dealflow_enrich::DealInsights>, TtlCache<dealflow_enrich::ContactProfile>) {
    (TtlCache::new(Duration::from_secs(300)), TtlCache::new(Duration::from_secs(300)))
}

pub fn run_scenario() -> DealflowResult<()> {
    println!("=== Scenario 3: Deal Enrichment ===");
    println!();

    let model = Arc::new(ScriptedModel::new(2));
    let (deal_cache, contact_cache) = caches();
    let service = EnrichmentService::new(
        Box::new(SharedModel(Arc::clone(&model))),
        RetryPolicy::immediate(3),
        deal_cache,
        contact_cache,
    );

    // ── Sub-case A ────────────────────────────────────────────────────────────

    let deal = find_deal("deal-acme")?;
    let insights = service.enrich_deal(&deal)?;
    println!("  A. {} after {} model call(s)", deal.title, model.calls());
    println!("     summary:     {}", insights.summary);
    println!("     risk:        {:?}", insights.risk_level);
    println!("     probability: {:.0}% (was {:.0}%)", insights.suggested_probability, deal.probability);
    for step in &insights.next_steps {
        println!("     - {step}");
    }

    // ── Sub-case B ────────────────────────────────────────────────────────────

    let before = model.calls();
    service.enrich_deal(&deal)?;
    println!();
    println!("  B. repeated request: {} new model call(s)", model.calls() - before);

    // ── Sub-case C ────────────────────────────────────────────────────────────

    let (deal_cache, contact_cache) = caches();
    let strict = EnrichmentService::new(Box::new(OffScriptModel), RetryPolicy::immediate(1), deal_cache, contact_cache);
    println!();
    match strict.enrich_deal(&deal) {
        Err(DealflowError::Verification { reason }) => println!("  C. rejected: {reason}"),
        Err(other) => return Err(other),
        Ok(_) => {
            return Err(DealflowError::Validation {
                reason: "off-script response was accepted".to_string(),
            })
        }
    }

    // ── Sub-case D ────────────────────────────────────────────────────────────

    let store = InMemoryStore::new();
    for contact in sample_contacts() {
        store.insert_contact(contact)?;
    }
    let contact = store.contact("contact-wile")?;
    let profile = service.enrich_contact(&contact)?;
    println!();
    println!("  D. {}: {} ({})", contact.name, profile.summary, profile.communication_style);

    println!();
    println!("  Result: PASS — only verified responses reach the CRM");
    println!();
    Ok(())
}
