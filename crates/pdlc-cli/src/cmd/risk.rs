use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use pdlc_core::store::FeatureStore;
use pdlc_core::types::RiskImpact;
use std::path::Path;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum RiskSubcommand {
    /// Record a risk
    Add {
        slug: String,

        /// What could go wrong
        description: String,

        /// Impact: high, medium, or low
        #[arg(long, default_value = "medium")]
        impact: String,

        /// Mitigation, if one already exists
        #[arg(long)]
        mitigation: Option<String>,
    },

    /// Attach a mitigation to a risk by index
    Mitigate {
        slug: String,
        index: usize,

        /// How the risk is being addressed
        #[arg(long)]
        note: String,
    },

    /// List risks on a feature
    List { slug: String },
}

pub fn run(root: &Path, subcmd: RiskSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        RiskSubcommand::Add {
            slug,
            description,
            impact,
            mitigation,
        } => add(root, &slug, &description, &impact, mitigation, json),
        RiskSubcommand::Mitigate { slug, index, note } => mitigate(root, &slug, index, &note, json),
        RiskSubcommand::List { slug } => list(root, &slug, json),
    }
}

// ---------------------------------------------------------------------------
// add / mitigate
// ---------------------------------------------------------------------------

fn add(
    root: &Path,
    slug: &str,
    description: &str,
    impact: &str,
    mitigation: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let store = FeatureStore::open(root)?;
    let mut record = store.load(slug)?;
    let impact = RiskImpact::from_str(impact)?;

    record.add_risk(description, impact, mitigation);
    store.save(&mut record).context("failed to save feature")?;

    if json {
        print_json(&record.risks)?;
    } else {
        println!(
            "Risk #{} recorded on '{slug}' ({impact} impact).",
            record.risks.len() - 1
        );
    }
    Ok(())
}

fn mitigate(root: &Path, slug: &str, index: usize, note: &str, json: bool) -> anyhow::Result<()> {
    let store = FeatureStore::open(root)?;
    let mut record = store.load(slug)?;

    record.mitigate_risk(index, note)?;
    store.save(&mut record).context("failed to save feature")?;

    if json {
        print_json(&record.risks)?;
    } else {
        println!("Risk #{index} on '{slug}' mitigated.");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

fn list(root: &Path, slug: &str, json: bool) -> anyhow::Result<()> {
    let store = FeatureStore::open(root)?;
    let record = store.load(slug)?;

    if json {
        print_json(&record.risks)?;
        return Ok(());
    }
    if record.risks.is_empty() {
        println!("No risks recorded on '{slug}'.");
        return Ok(());
    }

    let rows = record
        .risks
        .iter()
        .enumerate()
        .map(|(i, risk)| {
            vec![
                i.to_string(),
                risk.impact.to_string(),
                risk.mitigation.clone().unwrap_or_else(|| "-".to_string()),
                risk.description.clone(),
            ]
        })
        .collect();
    print_table(&["#", "IMPACT", "MITIGATION", "DESCRIPTION"], rows);
    Ok(())
}
