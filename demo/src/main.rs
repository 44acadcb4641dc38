//! DEALFLOW CRM Reference Runtime — Demo CLI
//!
//! Runs one or all of the three CRM demo scenarios. Each scenario uses real
//! DEALFLOW components (template catalog, in-memory store, step executor,
//! enrichment service) wired together with mock pipeline data.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- catalog
//!   cargo run -p demo -- sequence --config executor.toml
//!   cargo run -p demo -- enrichment
//!   cargo run -p demo -- --catalog my-templates.toml catalog

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use dealflow_contracts::error::DealflowResult;
use dealflow_core::ExecutorConfig;
use dealflow_ref_crm::scenarios::{deal_enrichment, follow_up_sequence, pipeline_review};
use dealflow_templates::TemplateCatalog;

// ── CLI definition ────────────────────────────────────────────────────────────

/// DEALFLOW — deal automation runtime CRM demo.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "DEALFLOW CRM reference runtime demo",
    long_about = "Runs DEALFLOW demo scenarios showing template eligibility,\n\
                  automation execution across delays, and verified enrichment."
)]
struct Cli {
    /// Executor configuration TOML (durable_scheduling, day_length_secs).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Template catalog TOML to use instead of the built-in one.
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run all three CRM scenarios in sequence.
    RunAll,
    /// Scenario 1: Pipeline Review (template eligibility per deal).
    Catalog,
    /// Scenario 2: Follow-up Sequence (materialize, run, delay, resume).
    Sequence,
    /// Scenario 3: Deal Enrichment (retry, cache, schema verification).
    Enrichment,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Initialize structured logging. Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    print_banner();

    let result = load(&cli).and_then(|(catalog, config)| match cli.command {
        Command::RunAll => run_all(&catalog, &config),
        Command::Catalog => pipeline_review::run_scenario(&catalog),
        Command::Sequence => follow_up_sequence::run_scenario(&catalog, &config),
        Command::Enrichment => deal_enrichment::run_scenario(),
    });

    match result {
        Ok(()) => {
            println!("All selected scenarios completed successfully.");
        }
        Err(e) => {
            eprintln!("Demo error: {}", e);
            std::process::exit(1);
        }
    }
}

// ── Setup ─────────────────────────────────────────────────────────────────────

fn load(cli: &Cli) -> DealflowResult<(TemplateCatalog, ExecutorConfig)> {
    let catalog = match &cli.catalog {
        Some(path) => TemplateCatalog::from_file(path)?,
        None => TemplateCatalog::builtin()?,
    };
    let config = match &cli.config {
        Some(path) => ExecutorConfig::from_file(path)?,
        None => ExecutorConfig::default(),
    };
    info!(
        templates = catalog.len(),
        durable = config.durable_scheduling,
        day_length_secs = config.day_length_secs,
        "demo configured"
    );
    Ok((catalog, config))
}

// ── Scenario dispatch ─────────────────────────────────────────────────────────

fn run_all(catalog: &TemplateCatalog, config: &ExecutorConfig) -> DealflowResult<()> {
    pipeline_review::run_scenario(catalog)?;
    follow_up_sequence::run_scenario(catalog, config)?;
    deal_enrichment::run_scenario()?;
    Ok(())
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("DEALFLOW — Deal Automation Runtime");
    println!("CRM Reference Demo");
    println!("==================================");
    println!();
    println!("Automation lifecycle:");
    println!("  [1] Evaluator checks each template's condition and trigger against the deal");
    println!("  [2] Materializer copies an eligible template into a draft automation");
    println!("  [3] User activates the automation");
    println!("  [4] Executor runs steps in order: email, task, communication, call, ai");
    println!("  [5] Delay steps hand the next step to the scheduler and resume later");
    println!();
}
