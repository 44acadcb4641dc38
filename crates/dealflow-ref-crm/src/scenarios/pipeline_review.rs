//! Scenario 1: Pipeline Review
//!
//! Evaluates every catalog template against every sample deal and prints
//! which templates would be offered. The high-value acceleration template is
//! the one to watch: its `value > 50000` condition enables it for the Acme
//! deal (75 000) and disables it for Initech (10 000), even though both
//! deals sit in the same stage.

use dealflow_contracts::{
    error::{DealflowError, DealflowResult},
    template::TemplateType,
};
use dealflow_templates::{evaluate, TemplateCatalog};

use crate::mock_data::{find_deal, sample_deals};

const HIGH_VALUE: &str = "high-value-acceleration";

pub fn run_scenario(catalog: &TemplateCatalog) -> DealflowResult<()> {
    println!("=== Scenario 1: Pipeline Review ===");
    println!();
    println!("  Catalog: {} templates", catalog.len());
    for kind in [TemplateType::Drip, TemplateType::Event, TemplateType::Date, TemplateType::Ai] {
        println!("    {:<6} {}", format!("{:?}", kind).to_lowercase(), catalog.filter_by_type(kind).count());
    }
    println!();

    for deal in sample_deals() {
        let eligible = catalog.eligible(&deal);
        println!(
            "  {} — {} ({}, {:.0}, {})",
            deal.id,
            deal.title,
            deal.company,
            deal.value,
            deal.stage.as_str()
        );
        println!("    {} of {} templates enabled", eligible.len(), catalog.len());

        for (template, report) in catalog.evaluate_all(&deal) {
            if template.condition.is_none() {
                continue;
            }
            let mark = if report.is_eligible() { "enabled " } else { "disabled" };
            println!(
                "      [{mark}] {:<28} condition={} trigger={}",
                template.id, report.is_condition_valid, report.is_trigger_valid
            );
        }
        println!();
    }

    // ── The high-value check ──────────────────────────────────────────────────

    let template = catalog.get(HIGH_VALUE).ok_or_else(|| DealflowError::NotFound {
        kind: "template".to_string(),
        id: HIGH_VALUE.to_string(),
    })?;

    let acme = find_deal("deal-acme")?;
    let initech = find_deal("deal-initech")?;
    let for_acme = evaluate(template, &acme);
    let for_initech = evaluate(template, &initech);

    println!("  {} for {:.0}: condition valid = {}", HIGH_VALUE, acme.value, for_acme.is_condition_valid);
    println!(
        "  {} for {:.0}: condition valid = {}",
        HIGH_VALUE, initech.value, for_initech.is_condition_valid
    );

    if !for_acme.is_eligible() || for_initech.is_eligible() {
        return Err(DealflowError::Validation {
            reason: format!("{HIGH_VALUE} eligibility does not follow the deal value"),
        });
    }

    println!();
    println!("  Result: PASS — conditions gate the catalog per deal");
    println!();
    Ok(())
}
