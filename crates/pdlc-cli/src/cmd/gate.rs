use crate::output::{print_json, print_table};
use clap::Subcommand;
use pdlc_core::config::EngineConfig;
use pdlc_core::gate::{self, GatePhase, PhaseValidation};
use pdlc_core::record::FeatureRecord;
use pdlc_core::store::FeatureStore;
use pdlc_core::types::GateStatus;
use std::path::Path;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum GateSubcommand {
    /// Evaluate gates for a feature
    Eval {
        slug: String,

        /// Single scope (context, design, business_case, engineering, decision_gate)
        #[arg(long)]
        phase: Option<String>,
    },
}

pub fn run(root: &Path, subcmd: GateSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        GateSubcommand::Eval { slug, phase } => eval(root, &slug, phase.as_deref(), json),
    }
}

// ---------------------------------------------------------------------------
// eval
// ---------------------------------------------------------------------------

/// The decision_gate scope uses the meta evaluation so the per-track
/// roll-up is visible; every other scope is evaluated directly.
fn validation_for(
    record: &FeatureRecord,
    phase: GatePhase,
    config: &EngineConfig,
) -> PhaseValidation {
    match phase {
        GatePhase::DecisionGate => gate::evaluate_decision_gate(record, &config.gates),
        other => gate::evaluate_phase(record, other, &config.gates),
    }
}

fn eval(root: &Path, slug: &str, phase: Option<&str>, json: bool) -> anyhow::Result<()> {
    let store = FeatureStore::open(root)?;
    let record = store.load(slug)?;
    let config = store.config()?;

    if let Some(phase) = phase {
        let phase = GatePhase::from_str(phase)?;
        let validation = validation_for(&record, phase, &config);
        if json {
            print_json(&validation)?;
        } else {
            print_validation(&validation);
        }
        return Ok(());
    }

    let validations: Vec<PhaseValidation> = GatePhase::all()
        .iter()
        .map(|&p| validation_for(&record, p, &config))
        .collect();

    if json {
        print_json(&validations)?;
        return Ok(());
    }

    let rows = validations
        .iter()
        .map(|v| {
            vec![
                v.phase.to_string(),
                v.status.to_string(),
                v.blockers.len().to_string(),
                v.warnings.len().to_string(),
            ]
        })
        .collect();
    print_table(&["SCOPE", "STATUS", "BLOCKERS", "WARNINGS"], rows);
    Ok(())
}

fn print_validation(validation: &PhaseValidation) {
    println!("{}: {}", validation.phase, validation.status);
    if validation.gates.is_empty() {
        println!("(no gates evaluated)");
        return;
    }
    println!();

    let rows = validation
        .gates
        .iter()
        .map(|g| {
            vec![
                g.name.clone(),
                g.status.to_string(),
                if g.blocking { "yes" } else { "no" }.to_string(),
                g.message.clone(),
            ]
        })
        .collect();
    print_table(&["GATE", "STATUS", "BLOCKING", "MESSAGE"], rows);

    let hints: Vec<(&str, &str)> = validation
        .gates
        .iter()
        .filter(|g| g.status != GateStatus::Pass)
        .filter_map(|g| g.remediation.as_deref().map(|r| (g.name.as_str(), r)))
        .collect();
    if !hints.is_empty() {
        println!();
        for (name, hint) in hints {
            println!("hint ({name}): {hint}");
        }
    }
}
