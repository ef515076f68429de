use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use pdlc_core::blocker::detect_blockers;
use pdlc_core::decision::{self, DecisionInputs, DecisionRecommendation};
use pdlc_core::gate::evaluate_decision_gate;
use pdlc_core::hooks::HookRunner;
use pdlc_core::record::FeatureRecord;
use pdlc_core::store::FeatureStore;
use pdlc_core::types::{DecisionVerdict, Recommendation};
use std::path::Path;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum DecideSubcommand {
    /// Compute the go/no-go recommendation
    Recommend { slug: String },

    /// Approve at the decision gate (moves the feature to output generation)
    Approve {
        slug: String,

        /// Who is deciding
        #[arg(long)]
        by: String,

        /// Why
        #[arg(long)]
        rationale: String,
    },

    /// Reject at the decision gate (returns the feature to the tracks)
    Reject {
        slug: String,

        /// Who is deciding
        #[arg(long)]
        by: String,

        /// Why
        #[arg(long)]
        rationale: String,
    },
}

pub fn run(root: &Path, subcmd: DecideSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        DecideSubcommand::Recommend { slug } => recommend(root, &slug, json),
        DecideSubcommand::Approve { slug, by, rationale } => {
            decide(root, &slug, DecisionVerdict::Approve, &by, &rationale, json)
        }
        DecideSubcommand::Reject { slug, by, rationale } => {
            decide(root, &slug, DecisionVerdict::Reject, &by, &rationale, json)
        }
    }
}

// ---------------------------------------------------------------------------
// Shared evidence assembly
// ---------------------------------------------------------------------------

/// Run hooks (through the ledger), evaluate the decision gate, sweep for
/// blockers, and fold everything into a recommendation.
fn assemble(
    store: &FeatureStore,
    record: &FeatureRecord,
    slug: &str,
) -> anyhow::Result<DecisionRecommendation> {
    let config = store.config()?;
    let mut ledger = store.load_hook_ledger(slug)?;
    let hooks = HookRunner::default().run(record, &config, &mut ledger, false);
    store
        .save_hook_ledger(slug, &ledger)
        .context("failed to save hook ledger")?;

    let gate = evaluate_decision_gate(record, &config.gates);
    let blockers = detect_blockers(record, &hooks, &config);
    Ok(decision::recommend(&DecisionInputs {
        hooks: &hooks,
        gate: &gate,
        blockers: &blockers,
    }))
}

// ---------------------------------------------------------------------------
// recommend
// ---------------------------------------------------------------------------

fn recommend(root: &Path, slug: &str, json: bool) -> anyhow::Result<()> {
    let store = FeatureStore::open(root)?;
    let record = store.load(slug)?;
    let recommendation = assemble(&store, &record, slug)?;

    if json {
        print_json(&recommendation)?;
    } else {
        println!("Recommendation for '{slug}': {}", recommendation.verdict);
        println!("  {}", recommendation.summary);
        for item in &recommendation.evidence {
            println!("  - {item}");
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// approve / reject
// ---------------------------------------------------------------------------

fn decide(
    root: &Path,
    slug: &str,
    verdict: DecisionVerdict,
    by: &str,
    rationale: &str,
    json: bool,
) -> anyhow::Result<()> {
    let store = FeatureStore::open(root)?;
    let mut record = store.load(slug)?;
    let recommendation = assemble(&store, &record, slug)?;

    let contradicts = matches!(
        (verdict, recommendation.verdict),
        (DecisionVerdict::Approve, Recommendation::NoGo)
            | (DecisionVerdict::Reject, Recommendation::Go)
    );
    if contradicts {
        tracing::warn!(
            "recorded {verdict} contradicts the {} recommendation: {}",
            recommendation.verdict,
            recommendation.summary
        );
    }

    let to = decision::confirm_decision(&store, &mut record, verdict, rationale, by, &recommendation)
        .context("decision rejected")?;

    if json {
        let value = serde_json::json!({
            "slug": slug,
            "verdict": verdict,
            "phase": to,
            "recommendation": recommendation,
        });
        print_json(&value)?;
    } else {
        let action = match verdict {
            DecisionVerdict::Approve => "approved",
            DecisionVerdict::Reject => "rejected",
        };
        println!("'{slug}' {action}: now in {to}.");
    }
    Ok(())
}
