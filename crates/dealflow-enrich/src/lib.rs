//! # dealflow-enrich
//!
//! Model-generated insights for deals and contacts.
//!
//! ## Overview
//!
//! `EnrichmentService` wraps an external `EnrichmentProvider` with an
//! explicit `TtlCache`, a `RetryPolicy` for transient failures, and
//! JSON Schema plus business-rule verification of every response. The
//! automation runtime does not depend on this crate; it is a sibling of the
//! executor in the same CRM.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use dealflow_enrich::{EnrichmentService, RetryPolicy, TtlCache};
//!
//! let service = EnrichmentService::new(
//!     Box::new(provider),
//!     RetryPolicy::default(),
//!     TtlCache::new(Duration::from_secs(300)),
//!     TtlCache::new(Duration::from_secs(300)),
//! );
//! let insights = service.enrich_deal(&deal)?;
//! ```

pub mod cache;
pub mod insights;
pub mod retry;
pub mod service;

pub use cache::TtlCache;
pub use insights::{ContactProfile, DealInsights, RiskLevel};
pub use retry::RetryPolicy;
pub use service::{BusinessRule, EnrichmentProvider, EnrichmentService};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    use serde_json::json;

    use dealflow_contracts::{
        deal::{Deal, DealStage, Priority},
        error::{DealflowError, DealflowResult},
        records::Contact,
    };

    use super::*;

    // ── Mock helpers ──────────────────────────────────────────────────────────

    /// Replays scripted responses and counts calls. Once the script runs out
    /// the last response repeats.
    #[derive(Clone)]
    struct ScriptedProvider {
        script: Arc<Mutex<VecDeque<DealflowResult<String>>>>,
        last: Arc<Mutex<Option<String>>>,
        calls: Arc<Mutex<u32>>,
        prompts: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedProvider {
        fn new(script: Vec<DealflowResult<String>>) -> Self {
            Self {
                script: Arc::new(Mutex::new(script.into())),
                last: Arc::new(Mutex::new(None)),
                calls: Arc::new(Mutex::new(0)),
                prompts: Arc::new(Mutex::new(vec![])),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    impl EnrichmentProvider for ScriptedProvider {
        fn complete(&self, prompt: &str) -> DealflowResult<String> {
            *self.calls.lock().unwrap() += 1;
            self.prompts.lock().unwrap().push(prompt.to_string());
            match self.script.lock().unwrap().pop_front() {
                Some(Ok(text)) => {
                    *self.last.lock().unwrap() = Some(text.clone());
                    Ok(text)
                }
                Some(Err(e)) => Err(e),
                None => self
                    .last
                    .lock()
                    .unwrap()
                    .clone()
                    .ok_or_else(|| DealflowError::external("script exhausted")),
            }
        }
    }

    fn make_deal() -> Deal {
        Deal {
            id: "deal-9".to_string(),
            title: "Data platform".to_string(),
            company: "Umbrella".to_string(),
            contact: "Alice".to_string(),
            value: 90_000.0,
            stage: DealStage::Negotiation,
            priority: Priority::High,
            probability: 55.0,
            owner: None,
            expected_close_date: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn make_contact() -> Contact {
        Contact {
            id: "contact-1".to_string(),
            name: "Alice Abernathy".to_string(),
            email: "alice@umbrella.test".to_string(),
            company: "Umbrella".to_string(),
            title: "VP Engineering".to_string(),
            phone: None,
            created_at: None,
        }
    }

    fn good_insights() -> String {
        json!({
            "summary": "Strong fit, legal review pending.",
            "nextSteps": ["Send redlines", "Book exec sponsor call"],
            "riskLevel": "medium",
            "suggestedProbability": 65
        })
        .to_string()
    }

    fn service(provider: &ScriptedProvider) -> EnrichmentService {
        EnrichmentService::new(
            Box::new(provider.clone()),
            RetryPolicy::immediate(3),
            TtlCache::new(Duration::from_secs(60)),
            TtlCache::new(Duration::from_secs(60)),
        )
    }

    // ── 1. TtlCache ───────────────────────────────────────────────────────────

    #[test]
    fn test_cache_hit_then_expiry() {
        let mut cache = TtlCache::new(Duration::from_secs(10));
        let t0 = Instant::now();
        cache.insert_at("a", 1, t0);

        assert_eq!(cache.get_at("a", t0 + Duration::from_secs(9)), Some(1));
        assert_eq!(cache.get_at("a", t0 + Duration::from_secs(10)), None);
        assert!(cache.is_empty(), "expired entry is evicted on access");
    }

    #[test]
    fn test_purge_expired() {
        let mut cache = TtlCache::new(Duration::from_secs(10));
        let t0 = Instant::now();
        cache.insert_at("old", "x", t0);
        cache.insert_at("new", "y", t0 + Duration::from_secs(8));

        assert_eq!(cache.purge_expired(t0 + Duration::from_secs(12)), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get_at("new", t0 + Duration::from_secs(12)), Some("y"));
    }

    // ── 2. RetryPolicy ────────────────────────────────────────────────────────

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1000),
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(800));
        assert_eq!(policy.delay_for(4), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(40), Duration::from_millis(1000));
    }

    #[test]
    fn test_only_transient_errors_are_retried() {
        let mut calls = 0;
        let result: DealflowResult<()> = RetryPolicy::immediate(5).run(|_| {
            calls += 1;
            Err(DealflowError::Validation { reason: "bad request".to_string() })
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);

        let mut calls = 0;
        let result: DealflowResult<()> = RetryPolicy::immediate(4).run(|_| {
            calls += 1;
            Err(DealflowError::external("timeout"))
        });
        assert!(result.unwrap_err().is_transient());
        assert_eq!(calls, 4);
    }

    // ── 3. EnrichmentService ──────────────────────────────────────────────────

    #[test]
    fn test_enrich_deal_and_cache() {
        let provider = ScriptedProvider::new(vec![Ok(good_insights())]);
        let svc = service(&provider);

        let insights = svc.enrich_deal(&make_deal()).unwrap();
        assert_eq!(insights.risk_level, RiskLevel::Medium);
        assert_eq!(insights.next_steps.len(), 2);
        assert!(provider.prompts.lock().unwrap()[0].contains("Umbrella"));

        let again = svc.enrich_deal(&make_deal()).unwrap();
        assert_eq!(again, insights);
        assert_eq!(provider.calls(), 1, "second call is served from cache");

        svc.invalidate_deal("deal-9").unwrap();
        svc.enrich_deal(&make_deal()).unwrap();
        assert_eq!(provider.calls(), 2);
    }

    #[test]
    fn test_transient_provider_failure_is_retried() {
        let provider = ScriptedProvider::new(vec![
            Err(DealflowError::external("429 too many requests")),
            Err(DealflowError::external("503")),
            Ok(format!("Here you go:\n```json\n{}\n```", good_insights())),
        ]);
        let svc = service(&provider);

        let insights = svc.enrich_deal(&make_deal()).unwrap();
        assert_eq!(insights.suggested_probability, 65.0);
        assert_eq!(provider.calls(), 3);
    }

    #[test]
    fn test_schema_violation_is_verification_error_and_not_cached() {
        let bad = json!({
            "summary": "",
            "nextSteps": [],
            "riskLevel": "extreme",
            "suggestedProbability": 140
        })
        .to_string();
        let provider = ScriptedProvider::new(vec![Ok(bad), Ok(good_insights())]);
        let svc = service(&provider);

        match svc.enrich_deal(&make_deal()) {
            Err(DealflowError::Verification { reason }) => {
                assert!(reason.contains("schema violation"), "unexpected: {reason}");
            }
            other => panic!("expected Verification, got {:?}", other),
        }

        assert!(svc.enrich_deal(&make_deal()).is_ok());
        assert_eq!(provider.calls(), 2, "rejected response was not cached");
    }

    #[test]
    fn test_non_json_response_rejected() {
        let provider = ScriptedProvider::new(vec![Ok("I cannot help with that.".to_string())]);
        let err = service(&provider).enrich_deal(&make_deal()).unwrap_err();
        assert!(matches!(err, DealflowError::Verification { .. }));
        assert_eq!(provider.calls(), 1, "verification failures are not retried");
    }

    #[test]
    fn test_business_rules() {
        let dupes = json!({
            "summary": "ok",
            "nextSteps": ["Call", "call "],
            "riskLevel": "low",
            "suggestedProbability": 10
        })
        .to_string();
        let provider = ScriptedProvider::new(vec![Ok(dupes)]);
        match service(&provider).enrich_deal(&make_deal()) {
            Err(DealflowError::Verification { reason }) => assert!(reason.contains("duplicate")),
            other => panic!("expected Verification, got {:?}", other),
        }

        let provider = ScriptedProvider::new(vec![Ok(good_insights())]);
        let mut svc = service(&provider);
        svc.add_deal_rule(Box::new(|payload: &serde_json::Value| {
            (payload["riskLevel"] != "high" && payload["suggestedProbability"].as_f64() > Some(60.0))
                .then(|| "probability too optimistic".to_string())
        }));
        let err = svc.enrich_deal(&make_deal()).unwrap_err();
        assert!(err.to_string().contains("too optimistic"));
    }

    #[test]
    fn test_enrich_contact() {
        let profile = json!({
            "summary": "Engineering leader focused on reliability.",
            "interests": ["observability"],
            "communicationStyle": "direct"
        })
        .to_string();
        let provider = ScriptedProvider::new(vec![Ok(profile)]);
        let svc = service(&provider);

        let p = svc.enrich_contact(&make_contact()).unwrap();
        assert_eq!(p.communication_style, "direct");
        assert!(p.talking_points.is_empty());
        svc.enrich_contact(&make_contact()).unwrap();
        assert_eq!(provider.calls(), 1);
    }
}
